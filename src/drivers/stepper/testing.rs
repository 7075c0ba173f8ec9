// SPDX-License-Identifier: GPL-3.0-or-later

// Stand-ins for the hardware, so that the motion control can be driven
// deterministically from the tests.

use std::vec::Vec;

use embedded_hal::blocking::delay::DelayUs;

use super::{
    hardware::{CoilPolarity, Direction, MotorHardware, MotorId},
    motion_control_async::MotionControlAsync,
    sensor::HallSensors,
};

#[derive(Clone, Copy, Debug)]
pub struct ChannelRecord {
    pub duty: (u16, u16),
    pub polarity: CoilPolarity,
    pub direction: Option<Direction>,
    pub enabled: bool,
    pub period: u16,
    pub tick_enabled: bool,
    pub coil_writes: u32,
}

impl Default for ChannelRecord {
    fn default() -> Self {
        Self {
            duty: (0, 0),
            polarity: CoilPolarity::empty(),
            direction: None,
            enabled: false,
            period: 0,
            tick_enabled: false,
            coil_writes: 0,
        }
    }
}

/// Keeps the last value written to each register.
#[derive(Default)]
pub struct RecordingHardware {
    channels: [ChannelRecord; 2],
}

impl RecordingHardware {
    pub fn motor(&self, motor: MotorId) -> &ChannelRecord {
        &self.channels[motor.index()]
    }
}

impl MotorHardware for RecordingHardware {
    fn set_coil_pwm(&mut self, motor: MotorId, duty_a: u16, duty_b: u16) {
        let ch = &mut self.channels[motor.index()];
        ch.duty = (duty_a, duty_b);
        ch.coil_writes += 1;
    }

    fn set_coil_polarity(&mut self, motor: MotorId, polarity: CoilPolarity) {
        self.channels[motor.index()].polarity = polarity;
    }

    fn set_direction(&mut self, motor: MotorId, direction: Direction) {
        self.channels[motor.index()].direction = Some(direction);
    }

    fn enable_motor(&mut self, motor: MotorId, enabled: bool) {
        self.channels[motor.index()].enabled = enabled;
    }

    fn set_step_period(&mut self, motor: MotorId, period: u16) {
        self.channels[motor.index()].period = period;
    }

    fn enable_tick(&mut self, motor: MotorId, enabled: bool) {
        self.channels[motor.index()].tick_enabled = enabled;
    }
}

/// Busy-wait stand-in. Each call lets time pass by firing the tick
/// interrupts of both motors, and the hall sensor edges scheduled at a given
/// number of rack ticks.
pub struct SimDelay<'a> {
    mc: &'a MotionControlAsync<RecordingHardware>,
    ticks_per_call: u32,
    rack_ticks: u32,
    // (rack ticks, sensor levels), sorted by rack ticks
    sensor_script: Vec<(u32, HallSensors)>,
    /// Target speed of the rack seen at each call.
    pub rack_speeds: Vec<f32>,
}

impl<'a> SimDelay<'a> {
    pub fn new(mc: &'a MotionControlAsync<RecordingHardware>, ticks_per_call: u32) -> Self {
        Self {
            mc,
            ticks_per_call,
            rack_ticks: 0,
            sensor_script: Vec::new(),
            rack_speeds: Vec::new(),
        }
    }

    pub fn with_sensor_script(mut self, mut script: Vec<(u32, HallSensors)>) -> Self {
        script.sort_by_key(|(at, _)| *at);
        script.reverse();
        self.sensor_script = script;
        self
    }

    /// Rack ticks fired while the rack was moving.
    pub fn rack_ticks(&self) -> u32 {
        self.rack_ticks
    }

    /// Number of times the rack target speed changed, counting only
    /// changes to `speed`.
    pub fn rack_speed_changes_to(&self, speed: f32) -> usize {
        self.rack_speeds.windows(2)
            .filter(|w| w[0] != w[1] && w[1] == speed)
            .count()
    }
}

impl<'a> DelayUs<u32> for SimDelay<'a> {
    fn delay_us(&mut self, _us: u32) {
        self.rack_speeds.push(self.mc.target_speed(MotorId::Rack));

        for _ in 0..self.ticks_per_call {
            if !self.mc.is_idle(MotorId::Rack) {
                self.rack_ticks += 1;
            }

            unsafe {
                self.mc.on_tick_interrupt(MotorId::Rack);
                self.mc.on_tick_interrupt(MotorId::Auger);
            }

            while let Some(&(at, levels)) = self.sensor_script.last() {
                if at > self.rack_ticks {
                    break;
                }
                self.sensor_script.pop();
                unsafe { self.mc.on_hall_interrupt(levels) };
            }
        }
    }
}
