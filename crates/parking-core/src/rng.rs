//! A single shared RNG behind a dedicated lock, since `rand`'s thread-local generator is not
//! safe to re-enter from a signal handler or across the kind of blocking waits the car workers
//! perform while holding other locks.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

static RNG: Mutex<Option<StdRng>> = Mutex::new(None);

fn with_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    let mut guard = RNG.lock();
    let rng = guard.get_or_insert_with(StdRng::from_os_rng);
    f(rng)
}

/// A uniformly random integer in `low..=high`.
pub fn range(low: u64, high: u64) -> u64 {
    with_rng(|rng| rng.random_range(low..=high))
}

/// A uniformly random index in `0..len`. Panics if `len` is zero.
pub fn index(len: usize) -> usize {
    with_rng(|rng| rng.random_range(0..len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_stays_within_bounds() {
        for _ in 0..1000 {
            let v = range(100, 10_000);
            assert!((100..=10_000).contains(&v));
        }
    }

    #[test]
    fn index_stays_within_len() {
        for _ in 0..1000 {
            assert!(index(5) < 5);
        }
    }
}
