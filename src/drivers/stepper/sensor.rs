// SPDX-License-Identifier: GPL-3.0-or-later

// Two hall sensors sit next to each other at the home position of the rack.
// A magnet on the rack pulls their (pulled-up) outputs low. When a single
// sensor is low, we are about to reach home. When both are low, we are home.

use bitflags::bitflags;

bitflags! {
    /// Raw level of the hall sensor inputs, as read from the GPIO port.
    pub struct HallSensors: u8 {
        const SENSOR_A = 0b01;
        const SENSOR_B = 0b10;
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum HomeStatus {
    NotHome,
    NearHome,
    Home,
}

impl HallSensors {
    /// Builds the sensor state from the raw port bits. Bits other than the
    /// two sensor inputs are ignored.
    pub fn from_port(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl From<HallSensors> for HomeStatus {
    fn from(levels: HallSensors) -> Self {
        // The sensors are active low.
        let a = !levels.contains(HallSensors::SENSOR_A);
        let b = !levels.contains(HallSensors::SENSOR_B);
        match (a, b) {
            (true, true) => HomeStatus::Home,
            (true, false) | (false, true) => HomeStatus::NearHome,
            (false, false) => HomeStatus::NotHome,
        }
    }
}
