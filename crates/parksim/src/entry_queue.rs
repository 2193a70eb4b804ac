//! Per-entrance FIFO of plate strings: a car must be at the head of its entrance's queue
//! before it is allowed to touch that entrance's LPR, giving the Manager strict head-of-line
//! delivery with no cross-car interleaving on a single channel.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

pub struct EntryQueue {
    queue: Mutex<VecDeque<String>>,
    cond: Condvar,
}

impl Default for EntryQueue {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
        }
    }
}

impl EntryQueue {
    /// Joins the back of the queue and blocks until `plate` is at the head, or the process is
    /// stopping. Returns `false` if it gave up due to shutdown rather than reaching the head.
    pub fn wait_for_turn(&self, plate: &str, running: &dyn Fn() -> bool) -> bool {
        let mut queue = self.queue.lock();
        queue.push_back(plate.to_owned());
        while queue.front().map(String::as_str) != Some(plate) && running() {
            self.cond.wait_for(&mut queue, std::time::Duration::from_millis(200));
        }
        queue.front().map(String::as_str) == Some(plate)
    }

    /// Removes `plate` from the head of the queue (it must be there) and wakes the next car.
    pub fn leave(&self, plate: &str) {
        let mut queue = self.queue.lock();
        if queue.front().map(String::as_str) == Some(plate) {
            queue.pop_front();
        }
        self.cond.notify_all();
    }

    pub fn wake_all(&self) {
        self.cond.notify_all();
    }
}
