//! The full life-cycle of one car, executed on a thread-pool worker: queue for entrance, post
//! to the entrance LPR, read the admission sign, cross the gate, drive to a level, dwell,
//! leave the level, cross an exit gate, and return the plate to the bag.

use crate::entry_queue::EntryQueue;
use parking_core::shm::{Entrance, Exit, Level, GATE_OPEN, PLATE_LEN};
use parking_core::tasks::running;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct CarWorld<'a> {
    pub entrances: &'a [Entrance],
    pub levels: &'a [Level],
    pub exits: &'a [Exit],
    pub entry_queues: &'a [EntryQueue],
    pub active_cars: &'static AtomicUsize,
    pub time_factor: u64,
    pub allow_misbehavior: bool,
}

fn to_plate_bytes(plate: &str) -> [u8; PLATE_LEN] {
    let mut bytes = [0u8; PLATE_LEN];
    for (dst, src) in bytes.iter_mut().zip(plate.bytes()) {
        *dst = src;
    }
    bytes
}

fn is_evacuation_letter(b: u8) -> bool {
    matches!(b, b'E' | b'V' | b'A' | b'C' | b'U' | b'T' | b' ')
}

impl CarWorld<'_> {
    fn scaled(&self, base_ms: u64) -> Duration {
        Duration::from_millis(base_ms.saturating_mul(self.time_factor))
    }

    /// Runs one car's complete journey for `plate` through `entrance_index`. Returns the plate
    /// to the caller so it can be given back to the [`PlateBag`].
    pub fn drive(&self, plate: String, entrance_index: usize) -> String {
        self.active_cars.fetch_add(1, Ordering::SeqCst);
        let result = self.drive_inner(&plate, entrance_index);
        self.active_cars.fetch_sub(1, Ordering::SeqCst);
        let _ = result;
        plate
    }

    fn drive_inner(&self, plate: &str, entrance_index: usize) -> Option<()> {
        let queue = &self.entry_queues[entrance_index];
        let entrance = &self.entrances[entrance_index];

        if !queue.wait_for_turn(plate, &running) {
            return None;
        }

        std::thread::sleep(self.scaled(2));
        entrance.lpr.post(&to_plate_bytes(plate), &running);

        let display = entrance.sign.wait_nonzero(&running);
        if display == 0 {
            // Woken by shutdown, not by the sign being written: abandon the journey rather
            // than trip the debug_assert below on a value that was never actually displayed.
            queue.leave(plate);
            return None;
        }
        debug_assert!(
            display == b'X'
                || display == b'F'
                || is_evacuation_letter(display)
                || (b'1'..=b'9').contains(&display),
            "unexpected sign display {display}"
        );
        let assigned_level = match display {
            b'1'..=b'9' => usize::from(display - b'1'),
            _ => {
                queue.leave(plate);
                return None;
            }
        };

        entrance.gate.wait_for(&[GATE_OPEN], &running);
        queue.leave(plate);

        std::thread::sleep(self.scaled(10));
        let level_index = if self.allow_misbehavior && parking_core::rng::range(0, 1) == 1 {
            parking_core::rng::index(self.levels.len())
        } else {
            assigned_level
        };
        let level = &self.levels[level_index];
        level.lpr.post(&to_plate_bytes(plate), &running);

        let dwell_ms = parking_core::rng::range(100, 10_000);
        std::thread::sleep(self.scaled(dwell_ms));

        level.lpr.post(&to_plate_bytes(plate), &running);

        std::thread::sleep(self.scaled(10));
        let exit_index = parking_core::rng::index(self.exits.len());
        let exit = &self.exits[exit_index];
        exit.lpr.post(&to_plate_bytes(plate), &running);
        exit.gate.wait_for(&[GATE_OPEN], &running);

        Some(())
    }
}
