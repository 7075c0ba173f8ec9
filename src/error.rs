// SPDX-License-Identifier: GPL-3.0-or-later

use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// The rack went through its whole homing budget without both hall sensors
/// tripping.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct HomingFailed;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Error {
    HomingFailed,
    InvalidSlot(u16),
    InvalidAngle(u16),
    InvalidMotor(u8),
    /// The rack angle is unknown until the next successful homing.
    NotHomed,
}

impl From<HomingFailed> for Error {
    fn from(_: HomingFailed) -> Self {
        Error::HomingFailed
    }
}

impl fmt::Display for HomingFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("home position not found")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::HomingFailed => HomingFailed.fmt(f),
            Error::InvalidSlot(slot) => write!(f, "invalid rack slot {}", slot),
            Error::InvalidAngle(angle) => write!(f, "invalid rack angle {}", angle),
            Error::InvalidMotor(id) => write!(f, "invalid motor id {}", id),
            Error::NotHomed => f.write_str("rack not homed"),
        }
    }
}
