//! Billing line formatting shared by the Manager's exit controller and its tests. The math
//! itself (duration since entry, divided by `time_factor`, multiplied by `cost_per_ms`) lives
//! with the exit controller; this module only owns the on-disk text format.

/// Computes the charge for a stay of `elapsed_ms` wall-clock milliseconds, given the config's
/// `time_factor` (the simulated-to-real time ratio) and `cost_per_ms` (simulated-time rate).
pub fn charge(elapsed_ms: u64, time_factor: u64, cost_per_ms: f64) -> f64 {
    let simulated_ms = if time_factor == 0 {
        elapsed_ms as f64
    } else {
        elapsed_ms as f64 / time_factor as f64
    };
    simulated_ms * cost_per_ms
}

/// Formats one `billing.txt` line: `"<PLATE> $<AMOUNT>\n"` with amount to 2 decimals.
pub fn format_line(plate: &str, amount: f64) -> String {
    format!("{plate} ${amount:.2}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_scales_by_time_factor_and_rate() {
        // 5000ms wall-clock at time_factor 50 is 100ms simulated, at $0.05/ms = $5.00
        let amount = charge(5000, 50, 0.05);
        assert!((amount - 5.0).abs() < 1e-9);
    }

    #[test]
    fn charge_handles_zero_elapsed() {
        assert!((charge(0, 50, 0.05) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn format_line_rounds_to_two_decimals() {
        assert_eq!(format_line("ABC123", 5.0), "ABC123 $5.00\n");
        assert_eq!(format_line("ABC123", 5.006), "ABC123 $5.01\n");
        assert_eq!(format_line("ABC123", 0.0), "ABC123 $0.00\n");
    }
}
