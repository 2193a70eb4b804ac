//! Plate -> entry-timestamp map consulted by the exit controller, independently locked from
//! [`crate::registry::PlateRegistry`] and [`crate::occupancy::LevelOccupancy`].

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub struct BillingTable {
    entries: Mutex<HashMap<String, u64>>,
    total: Mutex<f64>,
    billing_file: PathBuf,
}

impl BillingTable {
    pub fn new<P: AsRef<Path>>(billing_file: P) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            total: Mutex::new(0.0),
            billing_file: billing_file.as_ref().to_owned(),
        }
    }

    pub fn record_entry(&self, plate: &str, timestamp_ms: u64) {
        self.entries.lock().insert(plate.to_owned(), timestamp_ms);
    }

    /// Removes and returns the stored entry timestamp for `plate`, if any.
    pub fn take_entry(&self, plate: &str) -> Option<u64> {
        self.entries.lock().remove(plate)
    }

    /// Appends a formatted billing line to the billing log and folds `amount` into the running
    /// total. Errors writing the log are logged by the caller; this never panics on I/O failure.
    pub fn append(&self, plate: &str, amount: f64) -> std::io::Result<()> {
        *self.total.lock() += amount;
        let line = parking_core::billing::format_line(plate, amount);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.billing_file)?;
        file.write_all(line.as_bytes())
    }

    pub fn running_total(&self) -> f64 {
        *self.total.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_takes_entry_timestamp() {
        let dir = std::env::temp_dir().join("parkmgr-test-billing");
        std::fs::create_dir_all(&dir).unwrap();
        let table = BillingTable::new(dir.join("billing.txt"));
        table.record_entry("ABC123", 1000);
        assert_eq!(table.take_entry("ABC123"), Some(1000));
        assert_eq!(table.take_entry("ABC123"), None);
    }

    #[test]
    fn append_accumulates_running_total_and_writes_file() {
        let dir = std::env::temp_dir().join("parkmgr-test-billing-append");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("billing.txt");
        let _ = std::fs::remove_file(&path);
        let table = BillingTable::new(&path);
        table.append("ABC123", 5.0).unwrap();
        table.append("DEF456", 2.5).unwrap();
        assert!((table.running_total() - 7.5).abs() < 1e-9);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "ABC123 $5.00\nDEF456 $2.50\n");
    }
}
