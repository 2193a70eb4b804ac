//! The alarm arbiter: aggregates every level monitor's fire decision into the single global
//! `alarm_active` state, and drives evacuation takeover while it holds.

use log::info;
use parking_core::shm::{Entrance, Exit, Level, GATE_OPEN};
use parking_core::tasks::running;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const EVACUATE_LETTERS: &[u8] = b"EVACUATE ";

/// Whether any level currently reports a fire; level monitor threads OR their own decision into
/// this, the arbiter only reads it.
#[derive(Default)]
pub struct AlarmState {
    per_level: Vec<AtomicBool>,
}

impl AlarmState {
    pub fn new(n_lvl: usize) -> Self {
        Self {
            per_level: (0..n_lvl).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    pub fn set_level(&self, index: usize, fire: bool) {
        self.per_level[index].store(fire, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.per_level.iter().any(|f| f.load(Ordering::Relaxed))
    }
}

/// Runs until shutdown, mirroring [`AlarmState::is_active`] into every `Level.alarm_flag` and,
/// while active, forcing every gate open and cycling "EVACUATE " across every entrance sign.
pub fn run(
    levels: &[Level],
    entrances: &[Entrance],
    exits: &[Exit],
    alarm: &AlarmState,
    letter_interval: Duration,
    poll_interval: Duration,
) {
    let mut active = false;
    let mut letter_index = 0usize;

    while running() {
        let now_active = alarm.is_active();
        if now_active && !active {
            info!("fire alarm activated: forcing gates open, evacuation signs on");
            for level in levels {
                level.set_alarm_flag(true);
            }
            for entrance in entrances {
                entrance.gate.request(GATE_OPEN);
            }
            for exit in exits {
                exit.gate.request(GATE_OPEN);
            }
        } else if !now_active && active {
            info!("fire alarm cleared");
            for level in levels {
                level.set_alarm_flag(false);
            }
            for entrance in entrances {
                entrance.sign.clear();
            }
        }
        active = now_active;

        if active {
            let letter = EVACUATE_LETTERS[letter_index % EVACUATE_LETTERS.len()];
            for entrance in entrances {
                entrance.sign.write(letter);
            }
            letter_index += 1;
            std::thread::sleep(letter_interval);
        } else {
            std::thread::sleep(poll_interval);
        }
    }
}
