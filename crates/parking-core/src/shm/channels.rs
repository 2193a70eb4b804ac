//! Bit-exact layout of the shared region: one contiguous, `#[repr(C)]` block containing every
//! entrance, exit and level channel in the order the spec fixes, so all three processes that map
//! the same named segment agree on every byte offset.

use super::sync::{ProcessCondvar, ProcessMutex};
use crate::error::Result;
use std::cell::UnsafeCell;

pub const PLATE_LEN: usize = 6;

/// A one-slot plate mailbox shared between the Simulator (poster) and the Manager (consumer).
#[repr(C)]
pub struct PlateReader {
    mutex: ProcessMutex,
    cond: ProcessCondvar,
    plate: UnsafeCell<[u8; PLATE_LEN]>,
    _pad: [u8; 2],
}

unsafe impl Send for PlateReader {}
unsafe impl Sync for PlateReader {}

impl PlateReader {
    /// # Safety
    ///
    /// Must be called exactly once per channel, by the creating process, before any other
    /// process touches it.
    pub(crate) unsafe fn init(&self) -> Result<()> {
        self.mutex.init()?;
        self.cond.init()?;
        *self.plate.get() = [0; PLATE_LEN];
        Ok(())
    }

    /// # Safety
    ///
    /// Must only be called once, by the process that destroys the shared region.
    pub(crate) unsafe fn destroy(&self) {
        self.mutex.destroy();
        self.cond.destroy();
    }

    /// Blocks until the slot is empty, writes `plate`, then broadcasts. Used by the Simulator
    /// when a car arrives at an entrance, level or exit LPR.
    pub fn post(&self, plate: &[u8; PLATE_LEN], running: &dyn Fn() -> bool) {
        let mut guard = self.mutex.lock();
        while unsafe { (*self.plate.get())[0] } != 0 && running() {
            guard = self.cond.wait_timeout(guard, std::time::Duration::from_millis(200));
        }
        if !running() {
            return;
        }
        unsafe {
            *self.plate.get() = *plate;
        }
        self.cond.broadcast();
        drop(guard);
    }

    /// Blocks until a plate is present and returns a copy of it, leaving the slot populated
    /// (the caller must [`clear`](Self::clear) once it has consumed the value). Used by the
    /// Manager's controllers.
    pub fn consume(&self, running: &dyn Fn() -> bool) -> Option<[u8; PLATE_LEN]> {
        let mut guard = self.mutex.lock();
        while unsafe { (*self.plate.get())[0] } == 0 && running() {
            guard = self.cond.wait_timeout(guard, std::time::Duration::from_millis(200));
        }
        let plate = unsafe { *self.plate.get() };
        drop(guard);
        if plate[0] == 0 {
            None
        } else {
            Some(plate)
        }
    }

    /// Zeroes the slot and broadcasts, freeing it for the next poster.
    pub fn clear(&self) {
        let _guard = self.mutex.lock();
        unsafe {
            *self.plate.get() = [0; PLATE_LEN];
        }
        self.cond.broadcast();
    }

    /// Wakes every waiter without touching the payload; used by the shutdown coordinator.
    pub fn wake_all(&self) {
        let _guard = self.mutex.lock();
        self.cond.broadcast();
    }
}

/// The four-state boomgate: `C`losed, `R`aising, `O`pen, `L`owering.
pub type GateStatus = u8;
pub const GATE_CLOSED: GateStatus = b'C';
pub const GATE_RAISING: GateStatus = b'R';
pub const GATE_OPEN: GateStatus = b'O';
pub const GATE_LOWERING: GateStatus = b'L';

#[repr(C)]
pub struct Gate {
    mutex: ProcessMutex,
    cond: ProcessCondvar,
    status: UnsafeCell<GateStatus>,
    _pad: [u8; 7],
}

unsafe impl Send for Gate {}
unsafe impl Sync for Gate {}

impl Gate {
    pub(crate) unsafe fn init(&self) -> Result<()> {
        self.mutex.init()?;
        self.cond.init()?;
        *self.status.get() = GATE_CLOSED;
        Ok(())
    }

    pub(crate) unsafe fn destroy(&self) {
        self.mutex.destroy();
        self.cond.destroy();
    }

    pub fn status(&self) -> GateStatus {
        let _guard = self.mutex.lock();
        unsafe { *self.status.get() }
    }

    /// Writes a request (`R` or `L`) for the gate actuator to carry out, or forces a status
    /// directly (used only by evacuation takeover, which bypasses the normal actuator timing).
    pub fn request(&self, status: GateStatus) {
        let _guard = self.mutex.lock();
        unsafe {
            *self.status.get() = status;
        }
        self.cond.broadcast();
    }

    /// Blocks until the gate actuator reports one of `wanted`, used by the actuator's own wait
    /// loop to pick up a pending `R`/`L` request.
    pub fn wait_for(&self, wanted: &[GateStatus], running: &dyn Fn() -> bool) -> GateStatus {
        let mut guard = self.mutex.lock();
        while !wanted.contains(&unsafe { *self.status.get() }) && running() {
            guard = self.cond.wait_timeout(guard, std::time::Duration::from_millis(200));
        }
        let status = unsafe { *self.status.get() };
        drop(guard);
        status
    }

    pub fn wake_all(&self) {
        let _guard = self.mutex.lock();
        self.cond.broadcast();
    }
}

/// An entrance information sign: `0` is "blank", `'1'..'9'` a level assignment, `'X'` rejected,
/// `'F'` full, or one letter of the "EVACUATE " cycle during an alarm.
#[repr(C)]
pub struct Sign {
    mutex: ProcessMutex,
    cond: ProcessCondvar,
    display: UnsafeCell<u8>,
    _pad: [u8; 7],
}

unsafe impl Send for Sign {}
unsafe impl Sync for Sign {}

impl Sign {
    pub(crate) unsafe fn init(&self) -> Result<()> {
        self.mutex.init()?;
        self.cond.init()?;
        *self.display.get() = 0;
        Ok(())
    }

    pub(crate) unsafe fn destroy(&self) {
        self.mutex.destroy();
        self.cond.destroy();
    }

    /// Written by the Manager (admission decision) or the Fire Alarm (evacuation letters).
    pub fn write(&self, display: u8) {
        let _guard = self.mutex.lock();
        unsafe {
            *self.display.get() = display;
        }
        self.cond.broadcast();
    }

    pub fn clear(&self) {
        self.write(0);
    }

    /// Blocks until the display is non-zero, returning it. Used by the Simulator's car
    /// orchestrator reading the admission decision.
    pub fn wait_nonzero(&self, running: &dyn Fn() -> bool) -> u8 {
        let mut guard = self.mutex.lock();
        while unsafe { *self.display.get() } == 0 && running() {
            guard = self.cond.wait_timeout(guard, std::time::Duration::from_millis(200));
        }
        let display = unsafe { *self.display.get() };
        drop(guard);
        display
    }
}

#[repr(C)]
pub struct Entrance {
    pub lpr: PlateReader,
    pub gate: Gate,
    pub sign: Sign,
}

#[repr(C)]
pub struct Exit {
    pub lpr: PlateReader,
    pub gate: Gate,
}

#[repr(C)]
pub struct Level {
    pub lpr: PlateReader,
    temperature: UnsafeCell<i16>,
    alarm_flag: UnsafeCell<i8>,
    _pad: [u8; 5],
}

unsafe impl Send for Level {}
unsafe impl Sync for Level {}

impl Level {
    pub(crate) unsafe fn init(&self) -> Result<()> {
        self.lpr.init()?;
        *self.temperature.get() = 25;
        *self.alarm_flag.get() = 0;
        Ok(())
    }

    pub(crate) unsafe fn destroy(&self) {
        self.lpr.destroy();
    }

    pub fn temperature(&self) -> i16 {
        unsafe { *self.temperature.get() }
    }

    /// Written only by the Simulator's temperature generator; reads are racy by design (the
    /// same way the Fire Alarm's monitor samples it every tick) but the write itself is a
    /// single aligned store, matching the `volatile` field in the original layout.
    pub fn set_temperature(&self, value: i16) {
        unsafe {
            *self.temperature.get() = value;
        }
    }

    pub fn alarm_flag(&self) -> bool {
        unsafe { *self.alarm_flag.get() != 0 }
    }

    pub fn set_alarm_flag(&self, active: bool) {
        unsafe {
            *self.alarm_flag.get() = i8::from(active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_true() -> bool {
        true
    }

    #[test]
    fn gate_cycles_through_regular_language() {
        // Exercises the C -> R -> O -> L -> C cycle on a heap-allocated, single-process Gate;
        // the process-shared attribute makes no behavioral difference in-process.
        let gate = Box::new(unsafe { std::mem::zeroed::<Gate>() });
        unsafe { gate.init().unwrap() };
        assert_eq!(gate.status(), GATE_CLOSED);
        gate.request(GATE_RAISING);
        assert_eq!(gate.status(), GATE_RAISING);
        gate.request(GATE_OPEN);
        assert_eq!(gate.status(), GATE_OPEN);
        gate.request(GATE_LOWERING);
        assert_eq!(gate.status(), GATE_LOWERING);
        gate.request(GATE_CLOSED);
        assert_eq!(gate.status(), GATE_CLOSED);
        unsafe { gate.destroy() };
    }

    #[test]
    fn plate_reader_post_then_consume_then_clear() {
        let lpr = Box::new(unsafe { std::mem::zeroed::<PlateReader>() });
        unsafe { lpr.init().unwrap() };
        let plate = *b"ABC123";
        lpr.post(&plate, &running_true);
        let got = lpr.consume(&running_true).unwrap();
        assert_eq!(&got, &plate);
        // slot still occupied until explicitly cleared
        assert_eq!(unsafe { (*lpr.plate.get())[0] }, b'A');
        lpr.clear();
        assert_eq!(unsafe { (*lpr.plate.get())[0] }, 0);
        unsafe { lpr.destroy() };
    }

    #[test]
    fn sign_defaults_blank_and_round_trips() {
        let sign = Box::new(unsafe { std::mem::zeroed::<Sign>() });
        unsafe { sign.init().unwrap() };
        sign.write(b'3');
        assert_eq!(sign.wait_nonzero(&running_true), b'3');
        sign.clear();
        unsafe { sign.destroy() };
    }

    #[test]
    fn level_temperature_and_alarm_flag() {
        let level = Box::new(unsafe { std::mem::zeroed::<Level>() });
        unsafe { level.init().unwrap() };
        assert_eq!(level.temperature(), 25);
        assert!(!level.alarm_flag());
        level.set_temperature(61);
        level.set_alarm_flag(true);
        assert_eq!(level.temperature(), 61);
        assert!(level.alarm_flag());
        unsafe { level.destroy() };
    }
}
