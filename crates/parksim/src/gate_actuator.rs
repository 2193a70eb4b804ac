//! Drives one boomgate through its physical `R -> O` and `L -> C` transitions. The Manager (or,
//! during evacuation, the Fire Alarm Unit) only ever requests `R`/`L`; this worker is what turns
//! a request into the timed, observable status change every waiter on the gate actually sees.

use parking_core::shm::{Gate, GATE_CLOSED, GATE_LOWERING, GATE_OPEN, GATE_RAISING};
use parking_core::tasks::running;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Runs until the process is stopping *and* no car remains that might still be waiting on this
/// gate — joining order requires actuators to outlive every car worker (see the shutdown
/// coordinator in `main`).
pub fn run(gate: &Gate, hold: Duration, active_cars: &'static AtomicUsize) {
    let keep_going = || running() || active_cars.load(Ordering::Relaxed) > 0;
    loop {
        let status = gate.wait_for(&[GATE_RAISING, GATE_LOWERING], &keep_going);
        match status {
            GATE_RAISING => {
                std::thread::sleep(hold);
                gate.request(GATE_OPEN);
            }
            GATE_LOWERING => {
                std::thread::sleep(hold);
                gate.request(GATE_CLOSED);
            }
            _ => {
                if !keep_going() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::zeroed;
    use std::thread;

    fn make_gate() -> Box<Gate> {
        let gate = Box::new(unsafe { zeroed::<Gate>() });
        unsafe { gate.init().unwrap() };
        gate
    }

    #[test]
    fn raise_request_cycles_to_open() {
        static ACTIVE: AtomicUsize = AtomicUsize::new(1);
        let gate: &'static Gate = Box::leak(make_gate());
        let handle = thread::spawn(move || run(gate, Duration::from_millis(5), &ACTIVE));
        gate.request(GATE_RAISING);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(gate.status(), GATE_OPEN);
        ACTIVE.store(0, Ordering::SeqCst);
        gate.wake_all();
        handle.join().unwrap();
    }

    #[test]
    fn lower_request_cycles_to_closed() {
        static ACTIVE: AtomicUsize = AtomicUsize::new(1);
        let gate: &'static Gate = Box::leak(make_gate());
        gate.request(GATE_OPEN);
        let handle = thread::spawn(move || run(gate, Duration::from_millis(5), &ACTIVE));
        gate.request(GATE_LOWERING);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(gate.status(), GATE_CLOSED);
        ACTIVE.store(0, Ordering::SeqCst);
        gate.wake_all();
        handle.join().unwrap();
    }
}
