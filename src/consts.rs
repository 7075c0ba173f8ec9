// SPDX-License-Identifier: GPL-3.0-or-later

pub mod system {
    pub const CLOCK_SPEED_MHZ: u32 = 40;
}

pub mod hardware {
    // The coil PWM generators run from the system clock divided by 2.
    pub const PWM_CLOCK_HZ: u32 = super::system::CLOCK_SPEED_MHZ * 1_000_000 / 2;
    // Duty values sent to the coils are in [0, PWM_MAX-1].
    pub const PWM_MAX: u16 = 1000;

    pub const FULL_STEPS_PER_REVOLUTION: u32 = 200;
    // One electrical revolution spans 4 full steps and the 128 entries of
    // the waveform table.
    pub const WAVEFORM_POINTS: usize = 128;
    pub const MICROSTEPS_PER_FULL_STEP: u32 = WAVEFORM_POINTS as u32 / 4;
    pub const MICROSTEPS_PER_REVOLUTION: u32 = FULL_STEPS_PER_REVOLUTION * MICROSTEPS_PER_FULL_STEP;
}

pub mod stepper {
    use super::hardware::*;

    // Number of tick events each phase is held for before advancing.
    pub const RACK_HOLD_PERIOD_TICKS: u16 = 1;
    pub const AUGER_HOLD_PERIOD_TICKS: u16 = 2;

    // period = STEP_CLOCK_RPM / (speed * hold_period) gives the tick period
    // in PWM clock counts for a speed in RPM.
    pub const STEP_CLOCK_RPM: f32 =
        (PWM_CLOCK_HZ as f32) * 60.0 / (MICROSTEPS_PER_REVOLUTION as f32);

    // The tick source is a 16 bit load register. MIN_SPEED_RPM is chosen so
    // that the slowest speed still fits.
    pub const MAX_STEP_PERIOD: u16 = u16::MAX;
}

pub mod motion_control {
    pub const MIN_SPEED_RPM: f32 = 3.0;
    pub const MAX_SPEED_RPM: f32 = 40.0;
    // Speed gained on each step while accelerating.
    pub const ACCELERATION_INCREMENT_RPM: f32 = 0.03125;
    // Steps held back from the acceleration phase so that there is always
    // room left to slow down.
    pub const RAMP_RESERVED_TAIL_STEPS: u32 = 600;

    // Busy-wait granularity when blocking on a motion to complete.
    pub const POLL_INTERVAL_US: u32 = 100;
    // Time given to the mechanics to come to a full stop after a move.
    pub const SETTLE_DELAY_US: u32 = 500_000;
}

pub mod rack {
    pub const SLOTS: u16 = 8;
    pub const SLOT_SPACING_DEGREES: u16 = 360 / SLOTS;
    // Motor revolutions per rack revolution.
    pub const GEAR_RATIO: f32 = 3.0;

    pub const MOVE_SPEED_RPM: f32 = 30.0;
    pub const DEFAULT_SPEED_RPM: f32 = 20.0;
}

pub mod auger {
    pub const DISPENSE_SPEED_RPM: f32 = 35.0;
}

pub mod homing {
    // Phase 1: we rotate until we see the sensors. The budget covers more
    // than a full rack revolution so that the magnets are always crossed,
    // whatever the starting position.
    pub const SEARCH_BUDGET_DEGREES: f32 = 400.0;
    pub const SEARCH_SPEED_RPM: f32 = 15.0;
    // Phase 2: one of the two sensors sees the magnet, we slow down so that
    // we don't run past the home position.
    pub const APPROACH_SPEED_RPM: f32 = 6.0;
    // Phase 3: short move from where both sensors trip to the mechanical zero.
    pub const CALIBRATION_SPEED_RPM: f32 = 10.0;
    pub const HOME_OFFSET_MICROSTEPS: i32 = 0;
}

pub mod clutch {
    // Servo angles, in degrees.
    pub const ENGAGED_ANGLE: u16 = 90;
    pub const DISENGAGED_ANGLE: u16 = 180;
}
