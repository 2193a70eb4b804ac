//! Named worker threads, process lifecycle, and the shutdown-join idiom shared by all three
//! binaries.
//!
//! Simplified from the teacher's input/program/output staged controller: this system has no
//! sync/prepare phases, only a flat `Starting -> Running -> Stopping -> Stopped` lifecycle that
//! every loop (car orchestrator, gate actuator, temperature generator, level monitor, ...)
//! checks once per tick.

use crate::interval::Loop;
use bmart_derive::EnumStr;
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

static WAIT_HANDLES: Lazy<Mutex<Vec<thread::JoinHandle<()>>>> = Lazy::new(<_>::default);
static THREAD_STATS: Lazy<Mutex<BTreeMap<String, ThreadStats>>> = Lazy::new(<_>::default);

/// Flipped false by the shutdown coordinator; every loop's `tick()` checks this before and
/// after sleeping.
pub static RUNNING: AtomicBool = AtomicBool::new(true);

#[derive(Debug, Copy, Clone, Eq, PartialEq, EnumStr)]
#[enumstr(rename_all = "UPPERCASE")]
pub enum ProcessStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
}

static STATUS: Mutex<ProcessStatus> = Mutex::new(ProcessStatus::Starting);

pub fn status() -> ProcessStatus {
    *STATUS.lock()
}

pub fn set_status(status: ProcessStatus) {
    *STATUS.lock() = status;
    info!("process status: {status}");
}

#[inline]
pub fn running() -> bool {
    RUNNING.load(Ordering::Relaxed)
}

/// Requests every worker to stop, joins them in registration order, and marks the process
/// stopped. Registration order is arrange-by-caller: spawn car workers first, then gate
/// actuators, then input/display/temperature workers, so shutdown unwinds in the reverse of
/// the order the spec requires (car orchestrators first, ambient loops last).
pub fn shutdown() {
    set_status(ProcessStatus::Stopping);
    RUNNING.store(false, Ordering::SeqCst);
    let handles = std::mem::take(&mut *WAIT_HANDLES.lock());
    for handle in handles {
        let _ = handle.join();
    }
    set_status(ProcessStatus::Stopped);
}

/// Spawns a named, optionally CPU/priority-pinned worker thread and registers it for
/// [`shutdown`] to join.
///
/// # Panics
///
/// Panics if `name` is 15 characters or longer, if an affinity environment variable is set but
/// malformed, or if the OS refuses to spawn the thread.
pub fn spawn<F>(name: &str, f: F)
where
    F: FnOnce() + Send + 'static,
{
    assert!(
        name.len() < 15,
        "task name MUST be LESS than 15 characters ({name})"
    );
    let var = format!("PARKING_THREAD_AFFINITY_{}", name.to_uppercase());
    let affinity = env::var(var).ok().map(|aff| {
        aff.parse::<Affinity>()
            .unwrap_or_else(|e| panic!("unable to set thread {name} affinity: {e}"))
    });
    THREAD_STATS
        .lock()
        .insert(name.to_owned(), ThreadStats::default());
    let handle = thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            if let Some(affinity) = affinity {
                info!(
                    "setting {} affinity to CPU {}, priority {}",
                    name, affinity.cpu_id, affinity.sched_priority
                );
                core_affinity::set_for_current(core_affinity::CoreId { id: affinity.cpu_id });
                let rc = unsafe {
                    libc::sched_setscheduler(
                        0,
                        libc::SCHED_RR,
                        &libc::sched_param {
                            sched_priority: affinity.sched_priority,
                        },
                    )
                };
                assert!(rc == 0, "unable to set thread {name} affinity: rc {rc}");
            }
            f();
        })
        .unwrap();
    WAIT_HANDLES.lock().push(handle);
}

/// Spawns a worker that runs `f` once per [`Loop`] tick until [`running`] goes false,
/// reporting jitter into [`ThreadStats`] under its own name.
pub fn spawn_loop<F>(name: &str, interval: Duration, mut f: F)
where
    F: FnMut() + Send + 'static,
{
    let loop_name = name.to_owned();
    spawn(name, move || {
        let mut int = Loop::prepare(interval);
        while running() {
            f();
            if !running() {
                break;
            }
            int.tick(&loop_name);
        }
        debug!("loop {} finished", thread_name());
    });
}

pub fn thread_name() -> String {
    thread::current()
        .name()
        .map_or_else(|| format!("{:?}", thread::current().id()), str::to_owned)
}

pub struct Affinity {
    pub cpu_id: usize,
    pub sched_priority: libc::c_int,
}

impl FromStr for Affinity {
    type Err = eva_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let cpu_id: usize = parts
            .next()
            .unwrap()
            .parse()
            .map_err(|e| eva_common::Error::invalid_params(format!("invalid cpu id: {e}")))?;
        let sched_priority: libc::c_int = parts
            .next()
            .ok_or_else(|| eva_common::Error::invalid_params("no priority specified"))?
            .parse()
            .map_err(|e| eva_common::Error::invalid_params(format!("invalid priority: {e}")))?;
        if parts.next().is_some() {
            return Err(eva_common::Error::invalid_params(
                "extra affinity params not supported",
            ));
        }
        if !(1..=99).contains(&sched_priority) {
            return Err(eva_common::Error::invalid_params(format!(
                "invalid scheduler priority: {sched_priority}"
            )));
        }
        Ok(Self {
            cpu_id,
            sched_priority,
        })
    }
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct ThreadStats {
    pub iters: u32,
    pub jitter_last_us: u32,
}

pub(crate) fn report_tick(name: &str, jitter_us: u32) {
    if let Some(stats) = THREAD_STATS.lock().get_mut(name) {
        stats.iters = stats.iters.wrapping_add(1);
        stats.jitter_last_us = jitter_us;
    } else {
        warn!("tick reported for unregistered thread {name}");
    }
}

pub fn thread_stats(name: &str) -> Option<ThreadStats> {
    THREAD_STATS.lock().get(name).cloned()
}

pub fn all_thread_stats() -> BTreeMap<String, ThreadStats> {
    THREAD_STATS.lock().clone()
}
