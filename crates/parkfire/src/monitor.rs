//! Per-level temperature monitor: a 5-wide raw ring buffer feeding a 30-wide median-smoothed
//! ring buffer, and the fixed-temperature/rate-of-rise fire decision computed from it.

use parking_lot::Mutex;
use std::collections::VecDeque;

const RAW_LEN: usize = 5;
const SMOOTHED_LEN: usize = 30;
const FIXED_TEMP_THRESHOLD: i16 = 58;
const FIXED_TEMP_COUNT: usize = 27; // ceil(0.9 * 30)
const RATE_OF_RISE_DELTA: i16 = 8;

struct Buffers {
    raw: VecDeque<i16>,
    smoothed: VecDeque<i16>,
}

pub struct TemperatureMonitor {
    buffers: Mutex<Buffers>,
}

impl Default for TemperatureMonitor {
    fn default() -> Self {
        Self {
            buffers: Mutex::new(Buffers {
                raw: VecDeque::with_capacity(RAW_LEN),
                smoothed: VecDeque::with_capacity(SMOOTHED_LEN),
            }),
        }
    }
}

fn median_of_five(raw: &VecDeque<i16>) -> i16 {
    let mut sorted: Vec<i16> = raw.iter().copied().collect();
    sorted.sort_unstable();
    sorted[RAW_LEN / 2]
}

impl TemperatureMonitor {
    /// Feeds one new raw sample and recomputes the fire decision from the current smoothed
    /// window. Returns whether this level is currently reporting a fire, fresh every tick (not
    /// edge-triggered).
    pub fn tick(&self, temperature: i16) -> bool {
        let mut buffers = self.buffers.lock();

        if buffers.raw.len() == RAW_LEN {
            buffers.raw.pop_front();
        }
        buffers.raw.push_back(temperature);

        if buffers.raw.len() == RAW_LEN {
            let median = median_of_five(&buffers.raw);
            if buffers.smoothed.len() == SMOOTHED_LEN {
                buffers.smoothed.pop_front();
            }
            buffers.smoothed.push_back(median);
        }

        if buffers.smoothed.len() < SMOOTHED_LEN {
            return false;
        }

        let fixed_temp_fire = buffers
            .smoothed
            .iter()
            .filter(|&&t| t >= FIXED_TEMP_THRESHOLD)
            .count()
            >= FIXED_TEMP_COUNT;
        let rate_of_rise_fire =
            buffers.smoothed.back().unwrap() - buffers.smoothed.front().unwrap() >= RATE_OF_RISE_DELTA;

        fixed_temp_fire || rate_of_rise_fire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_quiet_before_the_smoothed_window_fills() {
        let monitor = TemperatureMonitor::default();
        for _ in 0..29 {
            assert!(!monitor.tick(90));
        }
    }

    #[test]
    fn fixed_temp_fire_trips_once_enough_smoothed_samples_are_hot() {
        let monitor = TemperatureMonitor::default();
        // 30 * 5 = 150 raw samples all at 60C fills the smoothed window entirely above
        // threshold, well past the 27-of-30 bar.
        let mut tripped = false;
        for _ in 0..150 {
            tripped = monitor.tick(60);
        }
        assert!(tripped);
    }

    #[test]
    fn ambient_temperatures_never_trip_the_alarm() {
        let monitor = TemperatureMonitor::default();
        let mut tripped = false;
        for _ in 0..200 {
            tripped |= monitor.tick(28);
        }
        assert!(!tripped);
    }

    #[test]
    fn rate_of_rise_trips_once_the_jump_outvotes_the_raw_median() {
        let monitor = TemperatureMonitor::default();
        // Fill the smoothed window at a stable baseline first; the oldest smoothed sample
        // (25C) stays at the window's front until 30 more ticks push it out.
        for _ in 0..34 {
            monitor.tick(25);
        }
        // A single elevated sample is outvoted 4-to-1 by the still-25C raw window, so the
        // median (and thus the smoothed sample) doesn't move yet.
        assert!(!monitor.tick(40));
        assert!(!monitor.tick(40));
        // Once 3 of the 5 raw slots are at 40C, the median itself jumps, carrying the
        // smoothed sample past the front's 25C baseline by more than the 8C bar.
        assert!(monitor.tick(40));
    }

    #[test]
    fn median_of_five_ignores_a_single_spike() {
        let mut raw = VecDeque::new();
        raw.extend([25, 25, 99, 26, 25]);
        assert_eq!(median_of_five(&raw), 25);
    }
}
