// SPDX-License-Identifier: GPL-3.0-or-later

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embedded_hal::blocking::delay::DelayUs;

use crate::consts::motion_control::POLL_INTERVAL_US;
use crate::util::SharedWithInterrupt;

use super::{
    hardware::{MotorHardware, MotorId},
    motion_control::{MotionControl, RunStatus},
    position::Microsteps,
    sensor::{HallSensors, HomeStatus},
};

struct Shared<H> {
    mc: MotionControl<H>,
    signal_on_event: Option<Event>,
}

/// The motion control as seen from both sides: the interrupt handlers call
/// the on_*_interrupt() functions, the foreground calls everything else.
pub struct MotionControlAsync<H> {
    inner: SharedWithInterrupt<Shared<H>>,
    signal: Signal<CriticalSectionRawMutex, ()>,
}

impl<H: MotorHardware> MotionControlAsync<H> {
    pub fn new(motion_control: MotionControl<H>) -> Self {
        Self {
            inner: SharedWithInterrupt::new(Shared { mc: motion_control, signal_on_event: None }),
            signal: Signal::new(),
        }
    }

    // The tick and hall interrupts are independent sources, and may be set
    // at different priorities. Each handler takes the lock for itself.

    /// # Safety
    /// Must be called from the tick interrupt handler of `motor`, never
    /// from within a with() closure.
    pub unsafe fn on_tick_interrupt(&self, motor: MotorId) {
        self.inner.lock(|shared| {
            shared.mc.on_tick(motor);
            self.check_event(shared);
        })
    }

    /// # Safety
    /// Must be called from the hall sensor GPIO interrupt handler, never
    /// from within a with() closure.
    pub unsafe fn on_hall_interrupt(&self, sensors: HallSensors) {
        self.inner.lock(|shared| {
            shared.mc.on_hall_edge(sensors);
            self.check_event(shared);
        })
    }

    fn check_event(&self, shared: &mut Shared<H>) {
        if let Some(event) = shared.signal_on_event {
            if event.reached(&shared.mc) {
                shared.signal_on_event = None;
                self.signal.signal(());
            }
        }
    }

    /// Waits for `event` without spinning. Only one waiter at a time.
    pub async fn wait(&self, event: Event) {
        let should_wait = self.inner.lock(|shared| {
            // We use the lock here because we need to atomically check for the
            // condition, and set the signal condition for the interrupt handler.
            if event.reached(&shared.mc) {
                false
            } else {
                shared.signal_on_event = Some(event);
                self.signal.reset();
                true
            }
        });

        if should_wait {
            self.signal.wait().await;
        }
    }

    /// Busy-waits for `event`, polling every POLL_INTERVAL_US.
    pub fn block_until(&self, event: Event, delay: &mut impl DelayUs<u32>) {
        while !self.with(|mc| event.reached(mc)) {
            delay.delay_us(POLL_INTERVAL_US);
        }
    }

    /// Runs `f` with the tick and sensor interrupts masked.
    pub fn with<R>(&self, f: impl FnOnce(&mut MotionControl<H>) -> R) -> R {
        self.inner.lock(|shared| f(&mut shared.mc))
    }

    // The following are pass-through methods

    pub fn command_motor(&self, motor: MotorId, steps: Microsteps, speed: f32) {
        self.with(|mc| mc.command_motor(motor, steps, speed))
    }

    pub fn set_speed(&self, motor: MotorId, speed: f32) {
        self.with(|mc| mc.set_speed(motor, speed))
    }

    pub fn stop_motor(&self, motor: MotorId) {
        self.with(|mc| mc.stop_motor(motor))
    }

    pub fn release_motor(&self, motor: MotorId) {
        self.with(|mc| mc.release_motor(motor))
    }

    pub(crate) fn fail_motor(&self, motor: MotorId) {
        self.with(|mc| mc.fail_motor(motor))
    }

    pub fn run_status(&self, motor: MotorId) -> RunStatus {
        self.with(|mc| mc.run_status(motor))
    }

    pub fn home_status(&self, motor: MotorId) -> Option<HomeStatus> {
        self.with(|mc| mc.home_status(motor))
    }

    pub fn rack_home_status(&self) -> HomeStatus {
        self.with(|mc| mc.rack_home_status())
    }

    pub fn is_idle(&self, motor: MotorId) -> bool {
        self.with(|mc| mc.is_idle(motor))
    }

    pub fn target_speed(&self, motor: MotorId) -> f32 {
        self.with(|mc| mc.target_speed(motor))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
    Idle(MotorId),
    HomeStatus(HomeStatus),
}

impl Event {
    pub fn reached<H: MotorHardware>(&self, mc: &MotionControl<H>) -> bool {
        match self {
            Event::Idle(motor) => mc.is_idle(*motor),
            Event::HomeStatus(status) => mc.rack_home_status() == *status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::stepper::testing::{RecordingHardware, SimDelay};
    use futures::{executor::block_on, future::join};

    fn new_mca() -> MotionControlAsync<RecordingHardware> {
        MotionControlAsync::new(MotionControl::new(RecordingHardware::default(), HallSensors::all()))
    }

    #[test]
    fn wait_returns_when_the_motion_completes() {
        let mca = new_mca();
        mca.command_motor(MotorId::Rack, Microsteps(50), 20.0);

        let ticker = async {
            for _ in 0..50 {
                unsafe { mca.on_tick_interrupt(MotorId::Rack) };
            }
        };
        block_on(join(mca.wait(Event::Idle(MotorId::Rack)), ticker));

        assert!(mca.is_idle(MotorId::Rack));
        assert_eq!(mca.run_status(MotorId::Rack), RunStatus::Halted);
    }

    #[test]
    fn wait_returns_right_away_when_already_reached() {
        let mca = new_mca();
        block_on(mca.wait(Event::Idle(MotorId::Auger)));
        block_on(mca.wait(Event::HomeStatus(HomeStatus::NotHome)));
    }

    #[test]
    fn wait_for_a_hall_sensor_edge() {
        let mca = new_mca();
        let edge = async {
            unsafe { mca.on_hall_interrupt(HallSensors::SENSOR_A) };
            unsafe { mca.on_hall_interrupt(HallSensors::empty()) };
        };
        block_on(join(mca.wait(Event::HomeStatus(HomeStatus::Home)), edge));
        assert_eq!(mca.home_status(MotorId::Rack), Some(HomeStatus::Home));
    }

    #[test]
    fn hall_interrupt_waits_for_the_tick_handler() {
        let mca = new_mca();
        mca.command_motor(MotorId::Rack, Microsteps(10), 20.0);

        // A hall edge firing while the motion control is locked, from
        // another context, is only applied once the lock is released.
        std::thread::scope(|s| {
            mca.with(|mc| {
                s.spawn(|| unsafe { mca.on_hall_interrupt(HallSensors::empty()) });
                std::thread::sleep(std::time::Duration::from_millis(20));
                mc.on_tick(MotorId::Rack);
                assert_eq!(mc.rack_home_status(), HomeStatus::NotHome);
            });
        });

        assert_eq!(mca.home_status(MotorId::Rack), Some(HomeStatus::Home));
        assert_eq!(mca.with(|mc| mc.remaining_steps(MotorId::Rack)), 9);
    }

    #[test]
    fn block_until_spins_on_the_delay() {
        let mca = new_mca();
        mca.command_motor(MotorId::Auger, Microsteps(-40), 10.0);
        let mut delay = SimDelay::new(&mca, 10);
        mca.block_until(Event::Idle(MotorId::Auger), &mut delay);
        assert_eq!(mca.run_status(MotorId::Auger), RunStatus::Halted);
        // 40 steps held 2 ticks each.
        assert_eq!(delay.rack_speeds.len(), 8);
    }
}
