// SPDX-License-Identifier: GPL-3.0-or-later

// Motion control of the rack and auger steppers.
//
// Both motors are driven in microsteps by feeding the two coils with a
// sine/cosine current profile. Each motor has a tick source (the load event
// of its PWM generator) that calls on_tick(). A phase is held for a few
// ticks, then we move to the next one. The tick period sets the speed, and
// it follows a trapezoidal profile.
//
// Ownership of the motor state:
// * The tick handler owns the run status, the phase, the remaining steps,
//   the hold counter and the ramp. The hall sensor handler owns the home
//   status.
// * The foreground owns the command: direction, requested steps, target
//   speed. It fully writes the command before arming the tick source, and the
//   handler picks it up on its next tick. A new command replaces the one in
//   flight.
// * stop_motor() and the homing failure path are the only foreground writes
//   of the run status. They disable the tick source first.
//
// All foreground calls are made with interrupts masked (see
// MotionControlAsync), so each of them is seen atomically by the handlers.

use crate::consts::stepper::{AUGER_HOLD_PERIOD_TICKS, RACK_HOLD_PERIOD_TICKS};

use super::{
    hardware::{Direction, MotorHardware, MotorId},
    position::Microsteps,
    ramp::{clamp_speed, speed_to_period, VelocityRamp},
    sensor::{HallSensors, HomeStatus},
    waveform::{coil_outputs, Phase},
};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum RunStatus {
    Off,
    Halted,
    Running,
    Failed,
}

pub struct MotorState {
    // Tick handler side
    run_status: RunStatus,
    phase: Phase,
    remaining_steps: u32,
    hold_counter: u16,
    ramp: VelocityRamp,

    // Foreground side
    direction: Direction,
    requested_steps: u32,
    target_speed: f32,
    new_command: bool,

    // Whether the tick source is running. Set by the foreground when
    // issuing a command, cleared by whoever stops the motor.
    armed: bool,

    hold_period: u16,
}

impl MotorState {
    fn new(hold_period: u16) -> Self {
        Self {
            run_status: RunStatus::Off,
            phase: Phase::default(),
            remaining_steps: 0,
            hold_counter: 0,
            ramp: VelocityRamp::new(),
            direction: Direction::Cw,
            requested_steps: 0,
            target_speed: clamp_speed(0.0),
            new_command: false,
            armed: false,
            hold_period: hold_period.max(1),
        }
    }
}

pub struct MotionControl<H> {
    hardware: H,
    motors: [MotorState; 2],
    rack_home: HomeStatus,
}

impl<H: MotorHardware> MotionControl<H> {
    /// `sensors` is the level of the hall sensors at power up.
    pub fn new(hardware: H, sensors: HallSensors) -> Self {
        Self::with_hold_periods(hardware, sensors, [RACK_HOLD_PERIOD_TICKS, AUGER_HOLD_PERIOD_TICKS])
    }

    pub fn with_hold_periods(mut hardware: H, sensors: HallSensors, hold_periods: [u16; 2]) -> Self {
        for motor in MotorId::ALL {
            hardware.enable_tick(motor, false);
            hardware.enable_motor(motor, false);
        }

        let motors = [
            MotorState::new(hold_periods[MotorId::Rack.index()]),
            MotorState::new(hold_periods[MotorId::Auger.index()]),
        ];

        Self { hardware, motors, rack_home: HomeStatus::from(sensors) }
    }

    //--------------------------
    //  Interrupt handlers
    //--------------------------

    /// Tick event of `motor`.
    pub fn on_tick(&mut self, motor: MotorId) {
        let hw = &mut self.hardware;
        let state = &mut self.motors[motor.index()];

        if !state.armed {
            return;
        }

        if state.new_command {
            state.new_command = false;
            state.remaining_steps = state.requested_steps;
            if state.run_status == RunStatus::Running {
                // Retargeted on the fly. We keep going at the current speed.
                state.ramp.replan(state.remaining_steps);
            } else {
                state.hold_counter = 0;
                state.ramp.start(state.remaining_steps);
                hw.set_step_period(motor, speed_to_period(state.ramp.speed(), state.hold_period));
            }
        }

        if state.remaining_steps == 0 {
            halt(hw, motor, state);
            return;
        }

        state.run_status = RunStatus::Running;

        state.hold_counter += 1;
        if state.hold_counter < state.hold_period {
            // Still holding the phase. We refresh the coils in case the
            // driver was re-enabled in between.
            apply_phase(hw, motor, state.phase);
            return;
        }
        state.hold_counter = 0;

        let speed = state.ramp.next(state.remaining_steps, state.target_speed);
        state.remaining_steps -= 1;
        state.phase = state.phase.advance(state.direction);

        apply_phase(hw, motor, state.phase);
        hw.set_step_period(motor, speed_to_period(speed, state.hold_period));

        if state.remaining_steps == 0 {
            halt(hw, motor, state);
        }
    }

    /// Edge on either hall sensor.
    pub fn on_hall_edge(&mut self, sensors: HallSensors) {
        self.rack_home = HomeStatus::from(sensors);
        trace!("Hall sensors {:02b}: {:?}", sensors.bits(), self.rack_home);
    }

    //--------------------------
    //  Commands
    //--------------------------

    /// Starts moving `motor` by `steps` microsteps. The sign gives the
    /// direction. The speed is in RPM and gets clamped into the supported
    /// range. Returns immediately.
    pub fn command_motor(&mut self, motor: MotorId, steps: Microsteps, speed: f32) {
        let (direction, count) = if steps.0 < 0 {
            (Direction::Ccw, steps.unsigned_abs())
        } else {
            (Direction::Cw, steps.unsigned_abs())
        };

        let hw = &mut self.hardware;
        let state = &mut self.motors[motor.index()];

        state.target_speed = clamp_speed(speed);
        state.direction = direction;
        state.requested_steps = count;
        state.new_command = true;

        hw.set_direction(motor, direction);
        hw.enable_motor(motor, true);

        state.armed = true;
        hw.enable_tick(motor, true);

        debug!("{:?}: {} steps {:?} at {} RPM", motor, count, direction, state.target_speed);
    }

    /// Changes the speed of the current motion. It is picked up on the next
    /// step.
    pub fn set_speed(&mut self, motor: MotorId, speed: f32) {
        self.motors[motor.index()].target_speed = clamp_speed(speed);
    }

    /// Abrupt stop. The coils are released right away, the steps that were
    /// not done are dropped.
    pub fn stop_motor(&mut self, motor: MotorId) {
        let hw = &mut self.hardware;
        let state = &mut self.motors[motor.index()];

        hw.enable_tick(motor, false);
        state.armed = false;
        state.new_command = false;
        hw.enable_motor(motor, false);
        state.run_status = RunStatus::Halted;
    }

    /// De-energizes an idle motor. Its status is left as is.
    pub fn release_motor(&mut self, motor: MotorId) {
        self.hardware.enable_motor(motor, false);
    }

    /// Stops the motor and flags it as failed. The status stays Failed until
    /// the next command.
    pub(crate) fn fail_motor(&mut self, motor: MotorId) {
        self.stop_motor(motor);
        self.motors[motor.index()].run_status = RunStatus::Failed;
    }

    //--------------------------
    //  Status
    //--------------------------

    pub fn run_status(&self, motor: MotorId) -> RunStatus {
        self.motors[motor.index()].run_status
    }

    /// Only the rack has home sensors.
    pub fn home_status(&self, motor: MotorId) -> Option<HomeStatus> {
        match motor {
            MotorId::Rack => Some(self.rack_home),
            MotorId::Auger => None,
        }
    }

    pub fn rack_home_status(&self) -> HomeStatus {
        self.rack_home
    }

    /// True when no motion is in progress or pending.
    pub fn is_idle(&self, motor: MotorId) -> bool {
        !self.motors[motor.index()].armed
    }

    pub fn remaining_steps(&self, motor: MotorId) -> u32 {
        self.motors[motor.index()].remaining_steps
    }

    pub fn target_speed(&self, motor: MotorId) -> f32 {
        self.motors[motor.index()].target_speed
    }

    pub fn current_speed(&self, motor: MotorId) -> f32 {
        self.motors[motor.index()].ramp.speed()
    }

    pub fn phase(&self, motor: MotorId) -> Phase {
        self.motors[motor.index()].phase
    }

    pub fn direction(&self, motor: MotorId) -> Direction {
        self.motors[motor.index()].direction
    }

    pub fn hold_period(&self, motor: MotorId) -> u16 {
        self.motors[motor.index()].hold_period
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }
}

fn apply_phase<H: MotorHardware>(hw: &mut H, motor: MotorId, phase: Phase) {
    let out = coil_outputs(phase);
    hw.set_coil_polarity(motor, out.polarity);
    hw.set_coil_pwm(motor, out.duty_a, out.duty_b);
}

// The coils keep their last outputs, it's up to the caller to release the
// motor if it doesn't need to hold its position.
fn halt<H: MotorHardware>(hw: &mut H, motor: MotorId, state: &mut MotorState) {
    hw.enable_tick(motor, false);
    state.armed = false;
    state.run_status = RunStatus::Halted;
    trace!("{:?}: motion done", motor);
}
