use crate::error::Result;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Name of the shared memory object used when none is configured.
pub const DEFAULT_SHM_NAME: &str = "PARKING";

fn default_n_ent() -> usize {
    5
}
fn default_n_exit() -> usize {
    5
}
fn default_n_lvl() -> usize {
    5
}
fn default_level_capacity() -> usize {
    20
}
fn default_time_factor() -> u64 {
    50
}
fn default_cost_per_ms() -> f64 {
    0.05
}
fn default_shm_name() -> String {
    DEFAULT_SHM_NAME.to_owned()
}
fn default_plates_file() -> String {
    "plates.txt".to_owned()
}
fn default_billing_file() -> String {
    "billing.txt".to_owned()
}

/// Layered configuration: compiled-in defaults, overridden by an optional `parking.yml`,
/// overridden in turn by `PARKING_*` environment variables.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub n_ent: usize,
    pub n_exit: usize,
    pub n_lvl: usize,
    pub level_capacity: usize,
    pub time_factor: u64,
    pub cost_per_ms: f64,
    pub shm_name: String,
    pub plates_file: String,
    pub billing_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            n_ent: default_n_ent(),
            n_exit: default_n_exit(),
            n_lvl: default_n_lvl(),
            level_capacity: default_level_capacity(),
            time_factor: default_time_factor(),
            cost_per_ms: default_cost_per_ms(),
            shm_name: default_shm_name(),
            plates_file: default_plates_file(),
            billing_file: default_billing_file(),
        }
    }
}

macro_rules! override_from_env {
    ($cfg: expr, $field: ident, $var: literal) => {
        if let Ok(v) = env::var($var) {
            $cfg.$field = v
                .parse()
                .map_err(|e| crate::error::init_failure(format!("invalid {}: {}", $var, e)))?;
        }
    };
}

impl Config {
    /// Loads `path` (if it exists) over the compiled-in defaults, then applies `PARKING_*`
    /// environment variable overrides. A missing file is not an error; a malformed one is.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            let text = fs::read_to_string(&path)
                .map_err(|e| crate::error::init_failure(format!("reading config: {e}")))?;
            serde_yaml::from_str(&text)
                .map_err(|e| crate::error::init_failure(format!("parsing config: {e}")))?
        } else {
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Convenience for binaries that just want `parking.yml` next to the current directory.
    pub fn load_default() -> Result<Self> {
        Self::load("parking.yml")
    }

    fn apply_env(&mut self) -> Result<()> {
        override_from_env!(self, n_ent, "PARKING_N_ENT");
        override_from_env!(self, n_exit, "PARKING_N_EXIT");
        override_from_env!(self, n_lvl, "PARKING_N_LVL");
        override_from_env!(self, level_capacity, "PARKING_LEVEL_CAPACITY");
        override_from_env!(self, time_factor, "PARKING_TIME_FACTOR");
        override_from_env!(self, cost_per_ms, "PARKING_COST_PER_MS");
        if let Ok(v) = env::var("PARKING_SHM_NAME") {
            self.shm_name = v;
        }
        Ok(())
    }

    /// Scales a base millisecond duration by `time_factor`, as every sleep in the protocol does.
    #[inline]
    pub fn scaled(&self, base_ms: u64) -> Duration {
        Duration::from_millis(base_ms.saturating_mul(self.time_factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.n_ent, 5);
        assert_eq!(config.n_exit, 5);
        assert_eq!(config.n_lvl, 5);
        assert_eq!(config.level_capacity, 20);
        assert_eq!(config.time_factor, 50);
        assert!((config.cost_per_ms - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.shm_name, "PARKING");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load("/nonexistent/parking.yml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn yaml_overrides_subset_of_fields() {
        let dir = std::env::temp_dir().join("parking-core-test-config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("parking.yml");
        std::fs::write(&path, "n_lvl: 1\nlevel_capacity: 2\ntime_factor: 1\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.n_lvl, 1);
        assert_eq!(config.level_capacity, 2);
        assert_eq!(config.time_factor, 1);
        assert_eq!(config.n_ent, 5);

        // Environment overrides the file in turn. Exercised in the same test (rather than a
        // separate #[test]) so the PARKING_N_LVL mutation can never race another test's reading
        // of the real process environment.
        env::set_var("PARKING_N_LVL", "9");
        let config = Config::load(&path);
        env::remove_var("PARKING_N_LVL");
        assert_eq!(config.unwrap().n_lvl, 9);
    }

    #[test]
    fn scaled_multiplies_by_time_factor() {
        let mut config = Config::default();
        config.time_factor = 3;
        assert_eq!(config.scaled(10), Duration::from_millis(30));
    }
}
