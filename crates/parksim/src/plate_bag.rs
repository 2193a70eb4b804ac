//! The pool of allow-listed plates not currently in use by a car. A plate leaves the bag when
//! the dispatcher starts a new car with it and returns once that car exits successfully.

use parking_lot::Mutex;

pub struct PlateBag {
    available: Mutex<Vec<String>>,
}

impl PlateBag {
    pub fn new(plates: &[String]) -> Self {
        Self {
            available: Mutex::new(plates.to_vec()),
        }
    }

    /// Removes and returns a uniformly random plate, or `None` if every allow-listed plate is
    /// already in use.
    pub fn take(&self) -> Option<String> {
        let mut available = self.available.lock();
        if available.is_empty() {
            return None;
        }
        let index = parking_core::rng::index(available.len());
        Some(available.swap_remove(index))
    }

    /// Returns a plate to the bag once its car has exited.
    pub fn give_back(&self, plate: String) {
        self.available.lock().push(plate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_and_give_back_round_trips() {
        let bag = PlateBag::new(&["ABC123".to_owned(), "DEF456".to_owned()]);
        let a = bag.take().unwrap();
        let b = bag.take().unwrap();
        assert!(bag.take().is_none());
        bag.give_back(a);
        bag.give_back(b);
        assert!(bag.take().is_some());
        assert!(bag.take().is_some());
    }
}
