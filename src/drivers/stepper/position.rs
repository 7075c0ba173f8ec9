// SPDX-License-Identifier: GPL-3.0-or-later

use crate::consts::{
    hardware::MICROSTEPS_PER_REVOLUTION,
    rack::GEAR_RATIO,
};

// We describe motions as integers, in number of microsteps, to not loose
// accuracy with floating points.

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Default)]
pub struct Microsteps(pub i32);

const RACK_MICROSTEPS_PER_REVOLUTION: f32 = MICROSTEPS_PER_REVOLUTION as f32 * GEAR_RATIO;

impl Microsteps {
    pub const ZERO: Self = Self(0);

    pub fn unsigned_abs(self) -> u32 {
        self.0.unsigned_abs()
    }
}

impl core::ops::Sub for Microsteps {
    type Output = Microsteps;
    fn sub(self, rhs: Self) -> Self::Output {
        Microsteps(self.0 - rhs.0)
    }
}

pub mod prelude {
    use super::*;
    pub use super::Microsteps;

    pub trait StepsExt {
        /// Rack rotation, in degrees of the rack itself (gear ratio included).
        fn rack_degrees(self) -> Microsteps;
        /// Full revolutions of the motor shaft.
        fn rotations(self) -> Microsteps;
    }

    impl StepsExt for f32 {
        fn rack_degrees(self) -> Microsteps {
            Microsteps(round(self * RACK_MICROSTEPS_PER_REVOLUTION / 360.0))
        }

        fn rotations(self) -> Microsteps {
            Microsteps((self * MICROSTEPS_PER_REVOLUTION as f32) as i32)
        }
    }

    impl StepsExt for i32 {
        fn rack_degrees(self) -> Microsteps {
            (self as f32).rack_degrees()
        }

        fn rotations(self) -> Microsteps {
            Microsteps(self * MICROSTEPS_PER_REVOLUTION as i32)
        }
    }
}

use prelude::*;

// Nearest integer, halves away from zero.
#[inline(always)]
fn round(v: f32) -> i32 {
    if v < 0.0 { (v - 0.5) as i32 } else { (v + 0.5) as i32 }
}

/// Signed angle from `previous` to `target`, both in [0, 360), going the
/// short way around. Positive is clockwise.
pub fn shortest_arc(previous: u16, target: u16) -> i16 {
    let delta = target as i16 - previous as i16;
    if delta > 180 {
        delta - 360
    } else if delta < -180 {
        delta + 360
    } else {
        delta
    }
}

/// Logical angle of the rack. It's only meaningful after homing.
#[derive(Clone, Copy, Debug, Default)]
pub struct RackPosition {
    angle: u16,
}

impl RackPosition {
    pub const fn new() -> Self {
        Self { angle: 0 }
    }

    pub fn angle(&self) -> u16 {
        self.angle
    }

    /// Records `target` (in [0, 360)) as the new rack angle and returns the
    /// motion that gets us there from the previous angle.
    pub fn move_to(&mut self, target: u16) -> Microsteps {
        let previous = self.angle;
        self.angle = target;

        // Both ends are rounded from absolute angles, so that the rounding
        // errors of consecutive moves cancel out.
        let from = previous as i32;
        let to = from + shortest_arc(previous, target) as i32;
        to.rack_degrees() - from.rack_degrees()
    }

    pub fn reset(&mut self) {
        self.angle = 0;
    }
}
