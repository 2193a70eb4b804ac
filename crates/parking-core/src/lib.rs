use log::{debug, info};
use once_cell::sync::OnceCell;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{self, AtomicBool};
use std::sync::Arc;
use std::time::Instant;

pub mod billing;
pub mod config;
pub mod error;
pub mod input;
pub mod interval;
pub mod plates;
pub mod rng;
pub mod shm;
pub mod tasks;

pub use config::Config;

static NAME: OnceCell<String> = OnceCell::new();
static HOSTNAME: OnceCell<String> = OnceCell::new();
static STARTUP_TIME: OnceCell<Instant> = OnceCell::new();
static CPUS: OnceCell<usize> = OnceCell::new();

static TERM_FLAG: once_cell::sync::Lazy<Arc<AtomicBool>> =
    once_cell::sync::Lazy::new(|| Arc::new(AtomicBool::new(false)));

/// True once SIGTERM/SIGINT has been received by [`register_signals`].
pub fn sigterm_received() -> bool {
    TERM_FLAG.load(atomic::Ordering::SeqCst)
}

/// # Panics
///
/// Will panic if this process has already been initialized.
#[inline]
pub fn hostname() -> &'static str {
    HOSTNAME.get().expect("parking_core::init not called").as_str()
}

/// # Panics
///
/// Will panic if this process has already been initialized.
#[inline]
pub fn uptime() -> std::time::Duration {
    STARTUP_TIME.get().expect("parking_core::init not called").elapsed()
}

pub fn cpus() -> usize {
    if let Some(cpus) = CPUS.get() {
        return *cpus;
    }
    let cpus = std::fs::read_to_string("/proc/cpuinfo")
        .map(|s| s.lines().filter(|l| l.starts_with("processor\t")).count())
        .unwrap_or(0);
    let _ = CPUS.set(cpus);
    cpus
}

/// Directory for PID files and other run-time state, overridable for tests/containers.
pub fn var_dir() -> PathBuf {
    env::var("PARKING_VAR_DIR").map_or_else(|_| env::temp_dir(), |p| Path::new(&p).to_owned())
}

/// Process-wide one-time setup: panic hook, hostname/uptime bookkeeping, and the logger
/// (`env_logger` to stdout by default, `syslog` when `SYSLOG=1`; `VERBOSE=1` raises both to
/// trace level). Every binary calls this before touching shared memory.
///
/// # Panics
///
/// Will panic if called twice, or if `SYSLOG=1` is set but the local syslog socket cannot be
/// reached.
pub fn init(name: &str) {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        std::process::exit(1);
    }));
    HOSTNAME
        .set(hostname::get().unwrap().to_string_lossy().into_owned())
        .expect("parking_core::init called twice");
    STARTUP_TIME.set(Instant::now()).unwrap();
    NAME.set(name.to_owned()).unwrap();

    let verbose = env::var("VERBOSE").ok().as_deref() == Some("1");
    let use_syslog = env::var("SYSLOG").ok().as_deref() == Some("1");
    let level = if verbose {
        log::LevelFilter::Trace
    } else {
        log::LevelFilter::Info
    };
    if use_syslog {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_USER,
            hostname: None,
            process: name.to_owned(),
            pid: std::process::id(),
        };
        log::set_boxed_logger(Box::new(syslog::BasicLogger::new(
            syslog::unix(formatter).expect("unable to connect to syslog"),
        )))
        .unwrap();
        log::set_max_level(level);
    } else {
        env_logger::Builder::new()
            .target(env_logger::Target::Stdout)
            .filter_level(level)
            .init();
    }
    debug!("log initialization completed");
    info!(
        "{name} starting, host {}, cpus {}",
        HOSTNAME.get().unwrap(),
        cpus()
    );
}

/// Registers the SIGTERM/SIGINT flag used by each binary's outer wait loop.
///
/// # Panics
///
/// Will panic if the signal handler cannot be registered.
pub fn register_signals() {
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&TERM_FLAG)).unwrap();
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&TERM_FLAG)).unwrap();
}
