/*++

Licensed under the Apache-2.0 license.

File Name:

    clock.rs

Abstract:

    File contains Clock and Timer types. The clock is the single synchronous
    tick that drives every peripheral; timers let a peripheral defer work to
    a later tick.

--*/
use std::{cell::Cell, rc::Rc};

use crate::Bus;

/// Peripherals that want deferred execution store a Timer inside themselves
/// and check it from [`Bus::poll`], which the owner of the clock calls on
/// every tick.
///
/// # Example
///
/// ```
/// use secsoc_emu_bus::{ActionHandle, Bus, BusError, Clock, Timer};
/// use secsoc_emu_types::{RvAddr, RvData, RvSize};
/// struct MyPeriph {
///     timer: Timer,
///     action0: Option<ActionHandle>,
///     fired: bool,
/// }
/// impl Bus for MyPeriph {
///     fn read(&mut self, _size: RvSize, _addr: RvAddr) -> Result<RvData, BusError> {
///         Ok(0)
///     }
///     fn write(&mut self, _size: RvSize, _addr: RvAddr, _val: RvData) -> Result<(), BusError> {
///         self.action0 = Some(self.timer.schedule_poll_in(2));
///         Ok(())
///     }
///     fn poll(&mut self) {
///         if self.timer.fired(&mut self.action0) {
///             self.fired = true;
///         }
///     }
/// }
/// let clock = Clock::new();
/// let mut periph = MyPeriph { timer: clock.timer(), action0: None, fired: false };
/// periph.write(RvSize::Word, 0, 0).unwrap();
/// clock.increment_and_poll(1, &mut periph);
/// assert!(!periph.fired);
/// clock.increment_and_poll(1, &mut periph);
/// assert!(periph.fired);
/// ```
#[derive(Clone)]
pub struct Timer {
    now: Rc<Cell<u64>>,
}

impl Timer {
    /// Constructs a new timer bound to the specified clock.
    pub fn new(clock: &Clock) -> Self {
        Self {
            now: Rc::clone(&clock.now),
        }
    }

    /// Returns the number of clock cycles elapsed since power-on.
    #[inline]
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Schedules an action `ticks_from_now` cycles in the future. The action
    /// is observed by passing the handle to [`Timer::fired`] from `poll()`.
    pub fn schedule_poll_in(&self, ticks_from_now: u64) -> ActionHandle {
        ActionHandle {
            time: self.now().wrapping_add(ticks_from_now),
        }
    }

    /// If the scheduled time for `action` has come, `action` is set to None
    /// and the function returns true. Otherwise (or if action is None), the
    /// function returns false.
    pub fn fired(&self, action: &mut Option<ActionHandle>) -> bool {
        let has_fired = match action {
            Some(handle) => self.now().wrapping_sub(handle.time) < (u64::MAX >> 1),
            None => false,
        };
        if has_fired {
            *action = None;
        }
        has_fired
    }

    /// Cancels a previously scheduled action.
    pub fn cancel(&self, action: &mut Option<ActionHandle>) {
        *action = None;
    }
}

/// Represents an action scheduled with a `Timer`.
#[derive(Debug, Eq, PartialEq)]
pub struct ActionHandle {
    /// The time the action is supposed to fire.
    time: u64,
}

impl ActionHandle {
    /// Cycle at which the action fires.
    pub fn time(&self) -> u64 {
        self.time
    }
}

pub struct Clock {
    now: Rc<Cell<u64>>,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Constructs a new Clock with the cycle counter set to 0.
    pub fn new() -> Clock {
        Self {
            now: Rc::new(Cell::new(0)),
        }
    }

    /// Constructs a `Timer` associated with this clock.
    pub fn timer(&self) -> Timer {
        Timer::new(self)
    }

    /// Returns the number of simulated clock cycles that have elapsed since
    /// power-on.
    #[inline]
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Advances the clock by `delta` cycles without notifying any device.
    #[inline]
    pub fn increment(&self, delta: u64) {
        self.now.set(self.now.get().wrapping_add(delta));
    }

    /// Advances the clock one cycle at a time, polling `bus` after each
    /// cycle.
    pub fn increment_and_poll(&self, delta: u64, bus: &mut impl Bus) {
        for _ in 0..delta {
            self.increment(1);
            bus.poll();
        }
    }
}
