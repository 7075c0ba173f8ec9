// SPDX-License-Identifier: GPL-3.0-or-later

// Motion control core of the spice dispenser: the rack and auger steppers,
// the hall sensor homing and the dispensing sequences built on top of them.
// The firmware binary provides the MotorHardware implementation, routes the
// tick and GPIO interrupts to MotionControlAsync and installs the logger.

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

pub mod consts;
pub mod error;
pub mod util;
pub mod drivers;
pub mod dispenser;

pub use error::{Error, HomingFailed, Result};
