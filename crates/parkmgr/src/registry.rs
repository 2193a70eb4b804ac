//! The Manager's record of every allow-listed plate's admission/location state, independent of
//! (and never locked jointly with) [`crate::occupancy::LevelOccupancy`] or
//! [`crate::billing_table::BillingTable`].

use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
struct PlateState {
    assigned: Option<usize>,
    current: Option<usize>,
}

/// What the entry controller should do with a plate it just read off the entrance LPR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Not on the allow list.
    Unknown,
    /// On the allow list but already assigned or currently parked: no re-entry while inside.
    AlreadyInside,
    /// Free to admit.
    Free,
}

pub struct PlateRegistry {
    table: Mutex<HashMap<String, PlateState>>,
}

impl PlateRegistry {
    /// Seeds the registry with every plate from the allow list, all initially free.
    pub fn new(plates: &[String]) -> Self {
        let table = plates
            .iter()
            .map(|p| (p.clone(), PlateState::default()))
            .collect();
        Self {
            table: Mutex::new(table),
        }
    }

    pub fn admission(&self, plate: &str) -> Admission {
        match self.table.lock().get(plate) {
            None => Admission::Unknown,
            Some(state) if state.assigned.is_some() || state.current.is_some() => {
                Admission::AlreadyInside
            }
            Some(_) => Admission::Free,
        }
    }

    /// Admits a free plate onto `level`, leaving it not-yet-arrived (`current = None`).
    pub fn assign(&self, plate: &str, level: usize) {
        if let Some(state) = self.table.lock().get_mut(plate) {
            state.assigned = Some(level);
            state.current = None;
        }
    }

    pub fn assigned_level(&self, plate: &str) -> Option<usize> {
        self.table.lock().get(plate).and_then(|s| s.assigned)
    }

    pub fn current_level(&self, plate: &str) -> Option<usize> {
        self.table.lock().get(plate).and_then(|s| s.current)
    }

    pub fn set_current_level(&self, plate: &str, level: Option<usize>) {
        if let Some(state) = self.table.lock().get_mut(plate) {
            state.current = level;
        }
    }

    pub fn reassign(&self, plate: &str, level: usize) {
        if let Some(state) = self.table.lock().get_mut(plate) {
            state.assigned = Some(level);
            state.current = Some(level);
        }
    }

    /// Releases a plate back to the free state on exit.
    pub fn clear(&self, plate: &str) {
        if let Some(state) = self.table.lock().get_mut(plate) {
            state.assigned = None;
            state.current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_plate_is_unknown() {
        let registry = PlateRegistry::new(&["ABC123".to_owned()]);
        assert_eq!(registry.admission("ZZZ999"), Admission::Unknown);
    }

    #[test]
    fn known_plate_starts_free() {
        let registry = PlateRegistry::new(&["ABC123".to_owned()]);
        assert_eq!(registry.admission("ABC123"), Admission::Free);
    }

    #[test]
    fn assigned_plate_is_already_inside() {
        let registry = PlateRegistry::new(&["ABC123".to_owned()]);
        registry.assign("ABC123", 2);
        assert_eq!(registry.admission("ABC123"), Admission::AlreadyInside);
        assert_eq!(registry.assigned_level("ABC123"), Some(2));
        assert_eq!(registry.current_level("ABC123"), None);
    }

    #[test]
    fn clear_returns_plate_to_free() {
        let registry = PlateRegistry::new(&["ABC123".to_owned()]);
        registry.assign("ABC123", 2);
        registry.set_current_level("ABC123", Some(2));
        registry.clear("ABC123");
        assert_eq!(registry.admission("ABC123"), Admission::Free);
    }

    #[test]
    fn reassign_updates_both_fields() {
        let registry = PlateRegistry::new(&["ABC123".to_owned()]);
        registry.assign("ABC123", 1);
        registry.reassign("ABC123", 3);
        assert_eq!(registry.assigned_level("ABC123"), Some(3));
        assert_eq!(registry.current_level("ABC123"), Some(3));
    }
}
