//! Loading the allow-listed plate file shared read-only by the Simulator and the Manager.
//!
//! Deliberately thin: there is no schema beyond "one six-character plate per line", no
//! validation of plate content, and no hot-reload.

use crate::error::{init_failure, Result};
use std::fs;
use std::path::Path;

/// Reads `path`, returning one entry per non-empty line with surrounding whitespace trimmed.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let text = fs::read_to_string(&path)
        .map_err(|e| init_failure(format!("reading {}: {e}", path.as_ref().display())))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_one_plate_per_line() {
        let dir = std::env::temp_dir().join("parking-core-test-plates");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("plates.txt");
        std::fs::write(&path, "ABC123\nDEF456\n\nGHI789").unwrap();
        let plates = load(&path).unwrap();
        assert_eq!(plates, vec!["ABC123", "DEF456", "GHI789"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load("/nonexistent/plates.txt").is_err());
    }
}
