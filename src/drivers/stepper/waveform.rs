// SPDX-License-Identifier: GPL-3.0-or-later

// Coil current profile of a full electrical revolution. Coil A follows the
// sine, coil B the cosine. The samples were measured on the first prototype
// and are kept as-is, including the slightly off values around 45° and 135°.

use crate::consts::hardware::{PWM_MAX, WAVEFORM_POINTS};

use super::hardware::{CoilPolarity, Direction};

pub static SIN_TABLE: [f32; WAVEFORM_POINTS] = [
     0.0000,  0.0491,  0.0980,  0.1467,  0.1951,  0.2430,  0.2903,  0.3369,  0.3827,  0.4276,
     0.4714,  0.5141,  0.5556,  0.5957,  0.6344,  0.6716,  0.7071,  0.7410,  0.7730,  0.8032,
     0.8315,  0.8577,  0.8819,  0.9040,  0.9239,  0.9415,  0.9569,  0.9700,  0.9808,  0.9892,
     0.9952,  0.9988,  1.0000,  0.9988,  0.9952,  0.9892,  0.9808,  0.9700,  0.9569,  0.9415,
     0.9236,  0.9040,  0.8816,  0.8577,  0.8315,  0.8032,  0.7730,  0.7410,  0.7071,  0.6716,
     0.6344,  0.5957,  0.5556,  0.5141,  0.4714,  0.4276,  0.3827,  0.3369,  0.2903,  0.2430,
     0.1951,  0.1467,  0.0980,  0.0491,  0.0000, -0.0491, -0.0980, -0.1467, -0.1951, -0.2430,
    -0.2903, -0.3369, -0.3827, -0.4276, -0.4714, -0.5141, -0.5556, -0.5957, -0.6344, -0.6716,
    -0.7071, -0.7410, -0.7730, -0.8032, -0.8315, -0.8577, -0.8819, -0.9040, -0.9239, -0.9415,
    -0.9569, -0.9700, -0.9808, -0.9892, -0.9952, -0.9988, -1.0000, -0.9988, -0.9952, -0.9892,
    -0.9808, -0.9700, -0.9569, -0.9415, -0.9236, -0.9040, -0.8816, -0.8577, -0.8315, -0.8032,
    -0.7730, -0.7410, -0.7071, -0.6716, -0.6344, -0.5957, -0.5556, -0.5141, -0.4714, -0.4276,
    -0.3827, -0.3369, -0.2903, -0.2430, -0.1951, -0.1467, -0.0980, -0.0491,
];

pub static COS_TABLE: [f32; WAVEFORM_POINTS] = [
     1.0000,  0.9988,  0.9952,  0.9892,  0.9808,  0.9700,  0.9569,  0.9415,  0.9236,  0.9040,
     0.8816,  0.8577,  0.8315,  0.8032,  0.7730,  0.7410,  0.7071,  0.6716,  0.6344,  0.5957,
     0.5556,  0.5141,  0.4714,  0.4276,  0.3827,  0.3369,  0.2903,  0.2430,  0.1951,  0.1467,
     0.0980,  0.0491,  0.0000, -0.0491, -0.0980, -0.1467, -0.1951, -0.2430, -0.2903, -0.3369,
    -0.3827, -0.4276, -0.4714, -0.5141, -0.5556, -0.5957, -0.6344, -0.6716, -0.7071, -0.7410,
    -0.7730, -0.8032, -0.8315, -0.8577, -0.8819, -0.9040, -0.9239, -0.9415, -0.9569, -0.9700,
    -0.9808, -0.9892, -0.9952, -0.9988, -1.0000, -0.9988, -0.9952, -0.9892, -0.9808, -0.9700,
    -0.9569, -0.9415, -0.9236, -0.9040, -0.8816, -0.8577, -0.8315, -0.8032, -0.7730, -0.7410,
    -0.7071, -0.6716, -0.6344, -0.5957, -0.5556, -0.5141, -0.4714, -0.4276, -0.3827, -0.3369,
    -0.2903, -0.2430, -0.1951, -0.1467, -0.0980, -0.0491,  0.0000,  0.0491,  0.0980,  0.1467,
     0.1951,  0.2430,  0.2903,  0.3369,  0.3827,  0.4276,  0.4714,  0.5141,  0.5556,  0.5957,
     0.6344,  0.6716,  0.7071,  0.7410,  0.7730,  0.8032,  0.8315,  0.8577,  0.8819,  0.9040,
     0.9239,  0.9415,  0.9569,  0.9700,  0.9808,  0.9892,  0.9952,  0.9988,
];

/// Index into the waveform table. Always in [0, 127].
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct Phase(u8);

impl Phase {
    const MASK: u8 = (WAVEFORM_POINTS - 1) as u8;

    pub fn new(index: u8) -> Self {
        Self(index & Self::MASK)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Next microstep in the direction of travel, wrapping around the table.
    pub fn advance(self, direction: Direction) -> Self {
        match direction {
            Direction::Cw  => Self(self.0.wrapping_add(1) & Self::MASK),
            Direction::Ccw => Self(self.0.wrapping_sub(1) & Self::MASK),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct CoilOutputs {
    pub duty_a: u16,
    pub duty_b: u16,
    pub polarity: CoilPolarity,
}

pub fn coil_outputs(phase: Phase) -> CoilOutputs {
    let sin = SIN_TABLE[phase.index()];
    let cos = COS_TABLE[phase.index()];

    let mut polarity = CoilPolarity::empty();
    polarity.set(CoilPolarity::A_POSITIVE, sin > 0.0);
    polarity.set(CoilPolarity::B_POSITIVE, cos > 0.0);

    CoilOutputs {
        duty_a: magnitude_to_duty(sin),
        duty_b: magnitude_to_duty(cos),
        polarity,
    }
}

#[inline(always)]
fn magnitude_to_duty(sample: f32) -> u16 {
    let top = (PWM_MAX - 1) as f32;
    // +0.5 rounds to the nearest integer. |sample| <= 1.0, so we never go
    // above PWM_MAX-1.
    let duty = abs(sample) * top + 0.5;
    if duty >= top { PWM_MAX - 1 } else { duty as u16 }
}

#[inline(always)]
fn abs(v: f32) -> f32 {
    if v < 0.0 { -v } else { v }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coil_outputs_stay_in_pwm_range_and_follow_the_sign() {
        for p in 0..WAVEFORM_POINTS as u8 {
            let out = coil_outputs(Phase::new(p));
            assert!(out.duty_a <= PWM_MAX - 1);
            assert!(out.duty_b <= PWM_MAX - 1);
            assert_eq!(out.polarity.contains(CoilPolarity::A_POSITIVE), SIN_TABLE[p as usize] > 0.0);
            assert_eq!(out.polarity.contains(CoilPolarity::B_POSITIVE), COS_TABLE[p as usize] > 0.0);
        }
    }

    #[test]
    fn quadrature_points() {
        let start = coil_outputs(Phase::new(0));
        assert_eq!((start.duty_a, start.duty_b), (0, PWM_MAX - 1));
        assert_eq!(start.polarity, CoilPolarity::B_POSITIVE);

        let quarter = coil_outputs(Phase::new(32));
        assert_eq!((quarter.duty_a, quarter.duty_b), (PWM_MAX - 1, 0));
        assert_eq!(quarter.polarity, CoilPolarity::A_POSITIVE);

        let half = coil_outputs(Phase::new(64));
        assert_eq!((half.duty_a, half.duty_b), (0, PWM_MAX - 1));
        assert!(half.polarity.is_empty());
    }

    #[test]
    fn phase_wraps_in_both_directions() {
        assert_eq!(Phase::new(127).advance(Direction::Cw), Phase::new(0));
        assert_eq!(Phase::new(0).advance(Direction::Ccw), Phase::new(127));
        assert_eq!(Phase::new(5).advance(Direction::Ccw).index(), 4);
        assert_eq!(Phase::new(200).index(), 200 & 127);
    }
}
