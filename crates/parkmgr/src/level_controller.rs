//! Per-level arrival/departure/re-assignment state machine.

use crate::occupancy::LevelOccupancy;
use crate::registry::PlateRegistry;
use log::warn;
use parking_core::shm::{Level, PLATE_LEN};
use parking_core::tasks::running;

pub struct LevelController<'a> {
    pub index: usize,
    pub level: &'a Level,
    pub registry: &'a PlateRegistry,
    pub occupancy: &'a LevelOccupancy,
}

fn plate_str(bytes: &[u8; PLATE_LEN]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_owned()
}

impl LevelController<'_> {
    pub fn run(&self) {
        while running() {
            let Some(plate_bytes) = self.level.lpr.consume(&running) else {
                break;
            };
            let plate = plate_str(&plate_bytes);
            self.handle(&plate);
            self.level.lpr.clear();
        }
    }

    fn handle(&self, plate: &str) {
        let current = self.registry.current_level(plate);
        let assigned = self.registry.assigned_level(plate);

        match (current, assigned) {
            (Some(cur), _) if cur == self.index => {
                self.registry.set_current_level(plate, None);
                self.occupancy.decrement(self.index);
            }
            (Some(cur), _) if cur != self.index => {
                let err = parking_core::error::protocol_violation(format!(
                    "level {}: plate {plate} reported here but registry shows it on level {cur}; resynchronizing",
                    self.index
                ));
                warn!("{err}");
            }
            (None, Some(lvl)) if lvl == self.index => {
                self.registry.set_current_level(plate, Some(self.index));
                self.occupancy.increment(self.index);
            }
            (None, Some(_)) => {
                if self.occupancy.has_space(self.index) {
                    let previous = self.registry.assigned_level(plate);
                    self.registry.reassign(plate, self.index);
                    self.occupancy.increment(self.index);
                    if let Some(previous) = previous {
                        self.occupancy.decrement(previous);
                    }
                }
            }
            (None, None) => {
                warn!("level {}: plate {plate} has no assignment on arrival", self.index);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::zeroed;

    fn make_level() -> Box<Level> {
        let level = Box::new(unsafe { zeroed::<Level>() });
        unsafe { level.init().unwrap() };
        level
    }

    #[test]
    fn arrival_on_assigned_level_increments_occupancy() {
        let registry = PlateRegistry::new(&["ABC123".to_owned()]);
        let occupancy = LevelOccupancy::new(1, 5);
        registry.assign("ABC123", 0);
        let level = make_level();
        let controller = LevelController {
            index: 0,
            level: &level,
            registry: &registry,
            occupancy: &occupancy,
        };
        controller.handle("ABC123");
        assert_eq!(registry.current_level("ABC123"), Some(0));
        assert_eq!(occupancy.count(0), 1);
    }

    #[test]
    fn departure_decrements_occupancy() {
        let registry = PlateRegistry::new(&["ABC123".to_owned()]);
        let occupancy = LevelOccupancy::new(1, 5);
        registry.assign("ABC123", 0);
        registry.set_current_level("ABC123", Some(0));
        occupancy.increment(0);
        let level = make_level();
        let controller = LevelController {
            index: 0,
            level: &level,
            registry: &registry,
            occupancy: &occupancy,
        };
        controller.handle("ABC123");
        assert_eq!(registry.current_level("ABC123"), None);
        assert_eq!(occupancy.count(0), 0);
    }

    #[test]
    fn misbehaving_reassignment_moves_occupancy_when_space_allows() {
        let registry = PlateRegistry::new(&["ABC123".to_owned()]);
        let occupancy = LevelOccupancy::new(2, 5);
        registry.assign("ABC123", 0);
        let level1 = make_level();
        let controller1 = LevelController {
            index: 1,
            level: &level1,
            registry: &registry,
            occupancy: &occupancy,
        };
        controller1.handle("ABC123");
        assert_eq!(registry.assigned_level("ABC123"), Some(1));
        assert_eq!(registry.current_level("ABC123"), Some(1));
        assert_eq!(occupancy.count(1), 1);
        assert_eq!(occupancy.count(0), 0);
    }
}
