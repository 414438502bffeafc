// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::time::{Duration, Instant};

/// A source of monotonic time. The emulator only ever compares two readings,
/// so the origin is arbitrary.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time backed by `Instant`, which never goes backwards when the
/// system time is adjusted.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> MonotonicClock {
        MonotonicClock { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> MonotonicClock {
        MonotonicClock::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Raises the timer interrupt once a fixed interval has passed since the
/// timer was last reset.
pub struct Timer {
    clock: Box<dyn Clock>,
    interval: Duration,
    last_reset: Duration,
}

impl Timer {
    pub fn new(clock: Box<dyn Clock>, interval: Duration) -> Timer {
        let now = clock.now();
        Timer {
            clock: clock,
            interval: interval,
            last_reset: now,
        }
    }

    pub fn reset(&mut self) {
        self.last_reset = self.clock.now();
    }

    /// True when strictly more than one interval has elapsed since the last
    /// reset.
    pub fn expired(&self) -> bool {
        self.clock.now().saturating_sub(self.last_reset) > self.interval
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
pub use self::manual::ManualClock;

#[cfg(test)]
mod manual {
    use super::Clock;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    /// A clock that only moves when told to. Clones share the same time so a
    /// test can keep a handle while the CPU owns another.
    #[derive(Clone, Default)]
    pub struct ManualClock {
        now: Rc<Cell<Duration>>,
    }

    impl ManualClock {
        pub fn new() -> ManualClock {
            ManualClock::default()
        }

        pub fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            self.now.get()
        }
    }
}
