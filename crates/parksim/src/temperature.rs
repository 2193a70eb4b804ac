//! Per-level temperature generation, driven by a debug fire-mode knob the keypress handler
//! flips between `Off`, `Fixed` and `RateOfRise`.

use parking_core::shm::Level;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};

const MAX_TEMP: i16 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FireMode {
    Off = 0,
    Fixed = 1,
    RateOfRise = 2,
}

impl FireMode {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Fixed,
            2 => Self::RateOfRise,
            _ => Self::Off,
        }
    }
}

/// Shared, atomically-updated fire mode; written by the keypress handler, read by the
/// temperature generator's tick.
pub struct FireControl(AtomicU8);

impl Default for FireControl {
    fn default() -> Self {
        Self(AtomicU8::new(FireMode::Off as u8))
    }
}

impl FireControl {
    pub fn set(&self, mode: FireMode) {
        self.0.store(mode as u8, Ordering::SeqCst);
    }

    pub fn get(&self) -> FireMode {
        FireMode::from_u8(self.0.load(Ordering::SeqCst))
    }
}

/// Generates one tick of temperatures for every level, writing them directly into shared
/// memory. `prev_mode` tracks whether the previous tick was already in rate-of-rise mode, so
/// the generator knows whether this tick is the "+20" onset or an ongoing drift.
pub struct TemperatureSim {
    prev_mode: Mutex<FireMode>,
}

impl Default for TemperatureSim {
    fn default() -> Self {
        Self {
            prev_mode: Mutex::new(FireMode::Off),
        }
    }
}

impl TemperatureSim {
    pub fn tick(&self, levels: &[Level], fire: &FireControl) {
        let mode = fire.get();
        let mut prev_mode = self.prev_mode.lock();
        let ror_onset = mode == FireMode::RateOfRise && *prev_mode != FireMode::RateOfRise;
        for level in levels {
            let next = Self::next_temperature(mode, ror_onset, level.temperature());
            level.set_temperature(next.min(MAX_TEMP));
        }
        *prev_mode = mode;
    }

    fn next_temperature(mode: FireMode, ror_onset: bool, current: i16) -> i16 {
        match mode {
            FireMode::Off => parking_core::rng::range(25, 32) as i16,
            FireMode::Fixed => parking_core::rng::range(60, 67) as i16,
            FireMode::RateOfRise => {
                if ror_onset {
                    current + 20
                } else {
                    let delta = parking_core::rng::range(0, 3) as i16 - 1;
                    current + delta
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_mode_stays_in_ambient_band() {
        for _ in 0..50 {
            let t = TemperatureSim::next_temperature(FireMode::Off, false, 25);
            assert!((25..=32).contains(&t));
        }
    }

    #[test]
    fn fixed_mode_stays_in_fire_band() {
        for _ in 0..50 {
            let t = TemperatureSim::next_temperature(FireMode::Fixed, false, 25);
            assert!((60..=67).contains(&t));
        }
    }

    #[test]
    fn rate_of_rise_onset_jumps_by_twenty() {
        let t = TemperatureSim::next_temperature(FireMode::RateOfRise, true, 30);
        assert_eq!(t, 50);
    }

    #[test]
    fn rate_of_rise_drift_stays_within_bounds() {
        for _ in 0..50 {
            let t = TemperatureSim::next_temperature(FireMode::RateOfRise, false, 50);
            assert!((49..=52).contains(&t));
        }
    }

    #[test]
    fn temperature_is_capped_at_max() {
        let sim = TemperatureSim::default();
        let fire = FireControl::default();
        fire.set(FireMode::RateOfRise);
        let level = Box::new(unsafe { std::mem::zeroed::<Level>() });
        unsafe { level.init().unwrap() };
        level.set_temperature(95);
        for _ in 0..5 {
            sim.tick(std::slice::from_ref(&*level), &fire);
        }
        assert!(level.temperature() <= MAX_TEMP);
    }
}
