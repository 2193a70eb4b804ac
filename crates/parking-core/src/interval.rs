//! Fixed-period tick helper used by every loop that must run at a steady, `time_factor`-scaled
//! rate: car orchestrators, gate actuators, the temperature generator, and the level monitor.

use log::warn;
use std::cmp::Ordering;
use std::thread;
use std::time::{Duration, Instant};

pub struct Loop {
    next_iter: Instant,
    interval: Duration,
    t: Instant,
}

#[negative_impl::negative_impl]
impl !Send for Loop {}

impl Loop {
    pub fn prepare(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            next_iter: now + interval,
            interval,
            t: now,
        }
    }

    /// Sleeps until the next scheduled tick (or returns immediately, logging, if the previous
    /// tick overran) and reports jitter for `name` into [`crate::tasks`]'s thread stats.
    pub fn tick(&mut self, name: &str) -> bool {
        let t = Instant::now();
        let on_time = match t.cmp(&self.next_iter) {
            Ordering::Greater => false,
            Ordering::Equal => true,
            Ordering::Less => {
                thread::sleep(self.next_iter - t);
                true
            }
        };
        if on_time {
            self.next_iter += self.interval;
        } else {
            self.next_iter = Instant::now() + self.interval;
            warn!("{name} loop overran its {:?} interval", self.interval);
        }
        let now = Instant::now();
        let jitter = now
            .duration_since(self.t)
            .as_micros()
            .abs_diff(self.interval.as_micros());
        crate::tasks::report_tick(name, u32::try_from(jitter).unwrap_or(u32::MAX));
        self.t = now;
        on_time
    }
}
