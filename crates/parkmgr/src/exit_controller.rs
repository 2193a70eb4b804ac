//! Per-exit state machine: release the car, compute its bill, drive the gate.

use crate::billing_table::{now_ms, BillingTable};
use crate::registry::PlateRegistry;
use log::{info, warn};
use parking_core::shm::{Exit, Level, PLATE_LEN};
use parking_core::tasks::running;
use std::time::Duration;

pub struct ExitController<'a> {
    pub index: usize,
    pub exit: &'a Exit,
    pub levels: &'a [Level],
    pub registry: &'a PlateRegistry,
    pub billing: &'a BillingTable,
    pub time_factor: u64,
    pub cost_per_ms: f64,
    pub gate_hold: Duration,
}

fn plate_str(bytes: &[u8; PLATE_LEN]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_owned()
}

impl ExitController<'_> {
    pub fn run(&self) {
        while running() {
            let Some(plate_bytes) = self.exit.lpr.consume(&running) else {
                break;
            };
            let plate = plate_str(&plate_bytes);
            self.handle(&plate);
            self.exit.lpr.clear();
        }
    }

    fn handle(&self, plate: &str) {
        self.exit.gate.request(b'R');

        match self.billing.take_entry(plate) {
            Some(entry_ms) => {
                let elapsed = now_ms().saturating_sub(entry_ms);
                let amount = parking_core::billing::charge(elapsed, self.time_factor, self.cost_per_ms);
                if let Err(e) = self.billing.append(plate, amount) {
                    warn!("exit {}: failed writing billing log for {plate}: {e}", self.index);
                }
                info!("exit {}: {plate} charged ${amount:.2}", self.index);
            }
            None => {
                let err = parking_core::error::missing_billing_entry(plate);
                warn!("exit {}: {err}", self.index);
            }
        }

        self.registry.clear(plate);

        let alarm_active = self.levels.iter().any(Level::alarm_flag);
        if !alarm_active {
            std::thread::sleep(self.gate_hold);
            self.exit.gate.request(b'L');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::zeroed;

    fn make_exit() -> Box<Exit> {
        let exit = Box::new(unsafe { zeroed::<Exit>() });
        unsafe {
            exit.lpr.init().unwrap();
            exit.gate.init().unwrap();
        }
        exit
    }

    fn make_level() -> Box<Level> {
        let level = Box::new(unsafe { zeroed::<Level>() });
        unsafe { level.init().unwrap() };
        level
    }

    #[test]
    fn charges_and_clears_registry_on_exit() {
        let registry = PlateRegistry::new(&["ABC123".to_owned()]);
        registry.assign("ABC123", 0);
        registry.set_current_level("ABC123", Some(0));
        let billing = BillingTable::new(
            std::env::temp_dir().join("parkmgr-test-exit-billing.txt"),
        );
        billing.record_entry("ABC123", now_ms().saturating_sub(1000));
        let exit = make_exit();
        let level = make_level();
        let levels = vec![*level];
        let controller = ExitController {
            index: 0,
            exit: &exit,
            levels: &levels,
            registry: &registry,
            billing: &billing,
            time_factor: 1,
            cost_per_ms: 0.05,
            gate_hold: Duration::from_millis(0),
        };
        controller.handle("ABC123");
        assert_eq!(registry.assigned_level("ABC123"), None);
        assert_eq!(registry.current_level("ABC123"), None);
        assert!(billing.running_total() > 0.0);
        assert_eq!(exit.gate.status(), b'L');
    }

    #[test]
    fn missing_billing_entry_does_not_panic_or_charge() {
        let registry = PlateRegistry::new(&["ZZZ999".to_owned()]);
        let billing = BillingTable::new(
            std::env::temp_dir().join("parkmgr-test-exit-missing.txt"),
        );
        let exit = make_exit();
        let level = make_level();
        let levels = vec![*level];
        let controller = ExitController {
            index: 0,
            exit: &exit,
            levels: &levels,
            registry: &registry,
            billing: &billing,
            time_factor: 1,
            cost_per_ms: 0.05,
            gate_hold: Duration::from_millis(0),
        };
        controller.handle("ZZZ999");
        assert!((billing.running_total() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn alarm_active_leaves_gate_open() {
        let registry = PlateRegistry::new(&["ABC123".to_owned()]);
        registry.assign("ABC123", 0);
        let billing = BillingTable::new(
            std::env::temp_dir().join("parkmgr-test-exit-alarm.txt"),
        );
        billing.record_entry("ABC123", now_ms());
        let exit = make_exit();
        let level = make_level();
        level.set_alarm_flag(true);
        let levels = vec![*level];
        let controller = ExitController {
            index: 0,
            exit: &exit,
            levels: &levels,
            registry: &registry,
            billing: &billing,
            time_factor: 1,
            cost_per_ms: 0.05,
            gate_hold: Duration::from_millis(0),
        };
        controller.handle("ABC123");
        assert_eq!(exit.gate.status(), b'R');
    }
}
