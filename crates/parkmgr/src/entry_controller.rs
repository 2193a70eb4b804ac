//! Per-entrance admission state machine: Idle -> Received -> Decided -> Gated -> Cleared.

use crate::billing_table::{now_ms, BillingTable};
use crate::occupancy::LevelOccupancy;
use crate::registry::{Admission, PlateRegistry};
use log::info;
use parking_core::shm::{Entrance, Level, PLATE_LEN};
use parking_core::tasks::running;
use std::time::Duration;

pub struct EntryController<'a> {
    pub index: usize,
    pub entrance: &'a Entrance,
    pub levels: &'a [Level],
    pub registry: &'a PlateRegistry,
    pub occupancy: &'a LevelOccupancy,
    pub billing: &'a BillingTable,
    pub gate_hold: Duration,
    pub clear_delay: Duration,
}

fn plate_str(bytes: &[u8; PLATE_LEN]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_owned()
}

impl EntryController<'_> {
    pub fn run(&self) {
        while running() {
            let Some(plate_bytes) = self.entrance.lpr.consume(&running) else {
                break;
            };
            let plate = plate_str(&plate_bytes);

            if self.levels.iter().any(Level::alarm_flag) {
                self.entrance.lpr.clear();
                continue;
            }

            self.decide(&plate);
        }
    }

    fn decide(&self, plate: &str) {
        match self.registry.admission(plate) {
            Admission::Unknown | Admission::AlreadyInside => {
                self.entrance.sign.write(b'X');
            }
            Admission::Free => {
                let available = self.occupancy.available_levels();
                if available.is_empty() {
                    self.entrance.sign.write(b'F');
                } else {
                    let level = available[parking_core::rng::index(available.len())];
                    self.registry.assign(plate, level);
                    self.entrance
                        .sign
                        .write(b'1' + u8::try_from(level).unwrap_or(0));
                    self.gated(plate);
                }
            }
        }

        std::thread::sleep(self.clear_delay);
        self.entrance.sign.clear();
        self.entrance.lpr.clear();
        info!("entrance {} cleared for {plate}", self.index);
    }

    fn gated(&self, plate: &str) {
        self.entrance.gate.request(b'R');
        self.billing.record_entry(plate, now_ms());
        std::thread::sleep(self.gate_hold);
        self.entrance.gate.request(b'L');
    }
}
