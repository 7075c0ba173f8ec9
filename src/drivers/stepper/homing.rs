// SPDX-License-Identifier: GPL-3.0-or-later

use embedded_hal::blocking::delay::DelayUs;

use crate::consts::{
    homing::*,
    motion_control::POLL_INTERVAL_US,
    rack::DEFAULT_SPEED_RPM,
};
use crate::error::HomingFailed;

use super::{
    hardware::{MotorHardware, MotorId},
    motion_control_async::{Event, MotionControlAsync},
    position::{prelude::*, RackPosition},
    sensor::HomeStatus,
};

// We turn the rack at most a bit more than a full turn, looking for the
// magnet. When the first sensor goes low we slow down so we don't overshoot
// the home position. If we drift away from it, we speed back up. Once both
// sensors are low, we move by the calibration offset to reach the mechanical
// zero, and the rack angle becomes 0.
pub fn home_rack<H: MotorHardware>(
    motors: &MotionControlAsync<H>,
    position: &mut RackPosition,
    calibration_offset: Microsteps,
    delay: &mut impl DelayUs<u32>,
) -> Result<(), HomingFailed> {
    const RACK: MotorId = MotorId::Rack;

    if motors.rack_home_status() == HomeStatus::Home {
        debug!("Rack is already home");
        position.reset();
        motors.set_speed(RACK, DEFAULT_SPEED_RPM);
        return Ok(());
    }

    debug!("Searching for the home position");
    motors.command_motor(RACK, SEARCH_BUDGET_DEGREES.rack_degrees(), SEARCH_SPEED_RPM);

    let mut slowed_down = false;
    let found = loop {
        let (home_status, idle) = motors.with(|mc| (mc.rack_home_status(), mc.is_idle(RACK)));

        match (home_status, slowed_down) {
            (HomeStatus::Home, _) => break true,
            _ if idle => break false,
            (HomeStatus::NearHome, false) => {
                trace!("Near home, slowing down");
                motors.set_speed(RACK, APPROACH_SPEED_RPM);
                slowed_down = true;
            }
            (HomeStatus::NotHome, true) => {
                trace!("Left the home area, speeding up");
                motors.set_speed(RACK, SEARCH_SPEED_RPM);
                slowed_down = false;
            }
            _ => {}
        }

        delay.delay_us(POLL_INTERVAL_US);
    };

    if !found {
        warn!("Home position not found after {} degrees", SEARCH_BUDGET_DEGREES);
        motors.fail_motor(RACK);
        return Err(HomingFailed);
    }

    motors.command_motor(RACK, calibration_offset, CALIBRATION_SPEED_RPM);
    motors.block_until(Event::Idle(RACK), delay);

    position.reset();
    motors.set_speed(RACK, DEFAULT_SPEED_RPM);
    debug!("Rack homed");
    Ok(())
}
