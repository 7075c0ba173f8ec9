// SPDX-License-Identifier: GPL-3.0-or-later

// Trapezoidal speed profile. The move is split in two halves. During the
// first half we gain a fixed amount of speed per step until we reach the
// requested speed. Each time we accelerate, we also compute how much speed
// to shed per step so that the second half ends at the minimum speed.
// The speed is in RPM. It's converted into a tick period for the hardware
// with speed_to_period().

use crate::consts::{
    motion_control::*,
    stepper::*,
};

/// Brings any requested speed into [MIN_SPEED_RPM, MAX_SPEED_RPM]. NaN goes
/// to the minimum speed.
pub fn clamp_speed(speed: f32) -> f32 {
    if speed >= MAX_SPEED_RPM {
        MAX_SPEED_RPM
    } else if speed >= MIN_SPEED_RPM {
        speed
    } else {
        MIN_SPEED_RPM
    }
}

/// Tick period, in PWM clock counts, that makes a motor turn at `speed`
/// when each phase is held for `hold_period` ticks.
pub fn speed_to_period(speed: f32, hold_period: u16) -> u16 {
    // The speed is clamped before the division, it can never be 0.
    let ticks_per_rpm = clamp_speed(speed) * (hold_period.max(1) as f32);
    let period = STEP_CLOCK_RPM / ticks_per_rpm;

    // We never go faster than what MAX_SPEED_RPM allows, whatever rounding
    // happened above.
    let floor = STEP_CLOCK_RPM / (MAX_SPEED_RPM * (hold_period.max(1) as f32));

    let period = max(period, floor);
    if period >= MAX_STEP_PERIOD as f32 {
        MAX_STEP_PERIOD
    } else {
        // f+0.5 is to round the value to the nearest integer
        (period + 0.5) as u16
    }
}

#[derive(Clone, Copy, Debug)]
pub struct VelocityRamp {
    speed: f32,        // current speed
    accel_steps: u32,  // steps left in the acceleration half
    decel_steps: u32,  // steps left in the deceleration half
    decel_factor: f32, // speed lost per step when decelerating
}

impl VelocityRamp {
    pub const fn new() -> Self {
        Self {
            speed: MIN_SPEED_RPM,
            accel_steps: 0,
            decel_steps: 0,
            decel_factor: 0.0,
        }
    }

    /// Prepares the profile of a new move of `total_steps`.
    pub fn start(&mut self, total_steps: u32) {
        // The odd step goes in the deceleration half, so that we always
        // finish the move at low speed.
        self.accel_steps = total_steps / 2;
        self.decel_steps = total_steps - self.accel_steps;
        self.speed = MIN_SPEED_RPM;
        self.decel_factor = 0.0;
    }

    /// Splits a new move of `total_steps` while already moving. The current
    /// speed is kept, and the deceleration half is sized to bring it down to
    /// the minimum by the end of the move.
    pub fn replan(&mut self, total_steps: u32) {
        self.accel_steps = total_steps / 2;
        self.decel_steps = total_steps - self.accel_steps;
        self.decel_factor = if self.decel_steps > 0 {
            self.speed / (self.decel_steps as f32)
        } else {
            0.0
        };
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Speed for the next step. `remaining_steps` includes the step about to
    /// be taken. `max_speed` may change between two steps.
    pub fn next(&mut self, remaining_steps: u32, max_speed: f32) -> f32 {
        let max_speed = clamp_speed(max_speed);

        if self.accel_steps > 0 && remaining_steps > RAMP_RESERVED_TAIL_STEPS {
            self.accel_steps -= 1;
            self.speed = min(self.speed + ACCELERATION_INCREMENT_RPM, max_speed);
            // decel_steps >= accel_steps+1 here, no division by 0.
            self.decel_factor = self.speed / (self.decel_steps as f32);
        } else if self.decel_steps > 0 {
            self.decel_steps -= 1;
            self.speed = max(self.speed - self.decel_factor, MIN_SPEED_RPM);
        }

        // The max speed may have been lowered while we were cruising.
        self.speed = clamp_speed(min(self.speed, max_speed));
        self.speed
    }
}

impl Default for VelocityRamp {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
fn min(a: f32, b: f32) -> f32 {
    if a <= b { a } else { b }
}

#[inline(always)]
fn max(a: f32, b: f32) -> f32 {
    if a >= b { a } else { b }
}
