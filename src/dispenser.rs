// SPDX-License-Identifier: GPL-3.0-or-later

// The dispenser: a rack holding the spice jars, turned by one stepper, and
// an auger that pushes the spice out of the jar sitting at the dispensing
// spot. The auger motor only reaches the jar when the clutch servo is
// engaged.

use embedded_hal::blocking::delay::DelayUs;

use crate::consts::{
    auger::DISPENSE_SPEED_RPM,
    clutch::{DISENGAGED_ANGLE, ENGAGED_ANGLE},
    homing::HOME_OFFSET_MICROSTEPS,
    motion_control::SETTLE_DELAY_US,
    rack::{MOVE_SPEED_RPM, SLOTS, SLOT_SPACING_DEGREES},
};
use crate::drivers::stepper::{
    home_rack, prelude::*, Event, HomeStatus, MotionControlAsync, MotorHardware, MotorId,
    RackPosition, RunStatus,
};
use crate::error::{Error, HomingFailed, Result};

pub trait ServoClutch {
    fn set_angle(&mut self, degrees: u16);
}

/// Per-unit values measured at assembly time.
#[derive(Clone, Copy, Debug)]
pub struct Calibration {
    /// Motion from where both hall sensors trip to the mechanical zero.
    pub home_offset: Microsteps,
    pub clutch_engaged_angle: u16,
    pub clutch_disengaged_angle: u16,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            home_offset: Microsteps(HOME_OFFSET_MICROSTEPS),
            clutch_engaged_angle: ENGAGED_ANGLE,
            clutch_disengaged_angle: DISENGAGED_ANGLE,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Portion {
    pub slot: u16,
    /// Auger rotations. A portion of 0 ends the recipe.
    pub rotations: u16,
}

pub type Recipe = heapless::Vec<Portion, { SLOTS as usize }>;

pub struct SpiceDispenser<'a, H, D, C> {
    motors: &'a MotionControlAsync<H>,
    delay: D,
    clutch: C,
    rack: RackPosition,
    homed: bool,
    calibration: Calibration,
}

impl<'a, H, D, C> SpiceDispenser<'a, H, D, C>
where
    H: MotorHardware,
    D: DelayUs<u32>,
    C: ServoClutch,
{
    pub fn new(motors: &'a MotionControlAsync<H>, delay: D, mut clutch: C, calibration: Calibration) -> Self {
        clutch.set_angle(calibration.clutch_disengaged_angle);
        Self { motors, delay, clutch, rack: RackPosition::new(), homed: false, calibration }
    }

    /// Blocks until the rack is at its mechanical zero. The rack can't be
    /// moved until this succeeds.
    pub fn home(&mut self) -> core::result::Result<(), HomingFailed> {
        let result = home_rack(self.motors, &mut self.rack, self.calibration.home_offset, &mut self.delay);
        self.homed = result.is_ok();
        result
    }

    pub fn is_homed(&self) -> bool {
        self.homed
    }

    //--------------------------
    //  Rack
    //--------------------------

    pub fn start_rack_angle(&mut self, degrees: u16) -> Result<()> {
        if degrees >= 360 {
            warn!("Rejected rack angle {}", degrees);
            return Err(Error::InvalidAngle(degrees));
        }

        if !self.homed {
            warn!("Rack not homed, refusing to move to {} degrees", degrees);
            return Err(Error::NotHomed);
        }

        let steps = self.rack.move_to(degrees);
        debug!("Rack to {} degrees", degrees);
        self.motors.command_motor(MotorId::Rack, steps, MOVE_SPEED_RPM);
        Ok(())
    }

    pub fn start_rack_slot(&mut self, slot: u16) -> Result<()> {
        self.start_rack_angle(slot_angle(slot)?)
    }

    pub fn set_rack_angle(&mut self, degrees: u16) -> Result<()> {
        self.start_rack_angle(degrees)?;
        self.wait_idle(MotorId::Rack);
        Ok(())
    }

    pub fn set_rack_slot(&mut self, slot: u16) -> Result<()> {
        self.set_rack_angle(slot_angle(slot)?)
    }

    /// Logical rack angle. Only meaningful while is_homed().
    pub fn rack_angle(&self) -> u16 {
        self.rack.angle()
    }

    //--------------------------
    //  Auger
    //--------------------------

    pub fn start_dispense(&mut self, rotations: u16) {
        debug!("Dispensing {} rotations", rotations);
        self.motors.command_motor(MotorId::Auger, (rotations as i32).rotations(), DISPENSE_SPEED_RPM);
    }

    pub fn dispense(&mut self, rotations: u16) {
        self.start_dispense(rotations);
        self.wait_idle(MotorId::Auger);
        self.motors.release_motor(MotorId::Auger);
    }

    /// Brings `slot` under the auger and runs it with the clutch engaged.
    pub fn dispense_spice(&mut self, slot: u16, rotations: u16) -> Result<()> {
        self.set_rack_slot(slot)?;
        self.clutch.set_angle(self.calibration.clutch_engaged_angle);
        self.dispense(rotations);
        self.clutch.set_angle(self.calibration.clutch_disengaged_angle);
        Ok(())
    }

    /// Nothing moves if any portion refers to an invalid slot.
    pub fn dispense_recipe(&mut self, recipe: &Recipe) -> Result<()> {
        let portions = || recipe.iter().take_while(|p| p.rotations > 0);

        if let Some(p) = portions().find(|p| p.slot >= SLOTS) {
            warn!("Rejected recipe, invalid slot {}", p.slot);
            return Err(Error::InvalidSlot(p.slot));
        }

        for p in portions() {
            self.dispense_spice(p.slot, p.rotations)?;
        }
        Ok(())
    }

    //--------------------------
    //  Status and control
    //--------------------------

    /// Abrupt stop of both motors. The rack must be homed again afterwards.
    pub fn stop_all(&mut self) {
        for motor in MotorId::ALL {
            self.motors.stop_motor(motor);
        }
        self.homed = false;
        warn!("All motors stopped");
    }

    pub fn is_idle(&self) -> bool {
        MotorId::ALL.iter().all(|m| self.motors.is_idle(*m))
    }

    pub fn run_status(&self, motor: MotorId) -> RunStatus {
        self.motors.run_status(motor)
    }

    pub fn home_status(&self, motor: MotorId) -> Option<HomeStatus> {
        self.motors.home_status(motor)
    }

    pub fn motors(&self) -> &'a MotionControlAsync<H> {
        self.motors
    }

    pub fn clutch(&self) -> &C {
        &self.clutch
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    fn wait_idle(&mut self, motor: MotorId) {
        self.motors.block_until(Event::Idle(motor), &mut self.delay);
        self.delay.delay_us(SETTLE_DELAY_US);
    }
}

fn slot_angle(slot: u16) -> Result<u16> {
    if slot >= SLOTS {
        warn!("Rejected rack slot {}", slot);
        return Err(Error::InvalidSlot(slot));
    }
    Ok(slot * SLOT_SPACING_DEGREES)
}
