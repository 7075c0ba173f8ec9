// SPDX-License-Identifier: GPL-3.0-or-later

use bitflags::bitflags;

use crate::error::Error;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum MotorId {
    Rack = 0,
    Auger = 1,
}

impl MotorId {
    pub const ALL: [MotorId; 2] = [MotorId::Rack, MotorId::Auger];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for MotorId {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(MotorId::Rack),
            1 => Ok(MotorId::Auger),
            _ => Err(Error::InvalidMotor(id)),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Direction {
    Cw,
    Ccw,
}

bitflags! {
    /// H-bridge polarity of the two coils. A cleared bit drives the coil
    /// current in the negative direction.
    pub struct CoilPolarity: u8 {
        const A_POSITIVE = 0b01;
        const B_POSITIVE = 0b10;
    }
}

/// The registers that drive the two stepper channels. The firmware binds
/// this to the PWM generators and GPIO ports, tests bind it to a recorder.
pub trait MotorHardware {
    /// Duty cycles of the two coils, in [0, PWM_MAX-1].
    fn set_coil_pwm(&mut self, motor: MotorId, duty_a: u16, duty_b: u16);

    fn set_coil_polarity(&mut self, motor: MotorId, polarity: CoilPolarity);

    fn set_direction(&mut self, motor: MotorId, direction: Direction);

    /// Energizes (or releases) the H-bridges of a motor.
    fn enable_motor(&mut self, motor: MotorId, enabled: bool);

    /// Period of the tick source, in PWM clock counts.
    fn set_step_period(&mut self, motor: MotorId, period: u16);

    /// Starts or stops the periodic tick events of a motor.
    fn enable_tick(&mut self, motor: MotorId, enabled: bool);
}
