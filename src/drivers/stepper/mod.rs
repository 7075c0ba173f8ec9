// SPDX-License-Identifier: GPL-3.0-or-later

mod waveform;
pub use waveform::*;

mod hardware;
pub use hardware::*;

mod ramp;
pub use ramp::*;

mod sensor;
pub use sensor::*;

mod position;
pub use position::*;
pub use position::prelude;

mod motion_control;
pub use motion_control::*;

mod motion_control_async;
pub use motion_control_async::*;

mod homing;
pub use homing::*;

#[cfg(test)]
pub(crate) mod testing;
