//! Manager binary: admission policy, level tracking, billing. Opens a shared region created
//! by the Simulator; never creates one itself.

use clap::Parser;
use log::{error, info};
use parking_core::shm::ShmHandle;
use parking_core::tasks::{self, ProcessStatus};
use parking_core::Config;
use std::time::Duration;

#[derive(Parser)]
struct Args {
    /// Suppress the once-per-second status line.
    #[clap(long)]
    nodisp: bool,
}

fn main() {
    let args = Args::parse();
    parking_core::init("parkmgr");
    parking_core::register_signals();

    let config = Config::load_default().unwrap_or_else(|e| {
        error!("config load failed: {e}");
        std::process::exit(1);
    });

    let plates = parking_core::plates::load(&config.plates_file).unwrap_or_else(|e| {
        error!("unable to load plates file: {e}");
        std::process::exit(1);
    });

    let shm: &'static ShmHandle = match ShmHandle::open(
        &config.shm_name,
        config.n_ent,
        config.n_exit,
        config.n_lvl,
    ) {
        Ok(shm) => Box::leak(Box::new(shm)),
        Err(e) => {
            error!("unable to open shared region {}: {e}", config.shm_name);
            std::process::exit(1);
        }
    };

    let tables = parkmgr::Tables::new(&config, &plates);
    tasks::set_status(ProcessStatus::Running);
    parkmgr::spawn_controllers(&config, shm, tables);

    if !args.nodisp {
        tasks::spawn_loop("display", Duration::from_secs(1), move || {
            info!(
                "status={:?} uptime={:?} billed=${:.2}",
                tasks::status(),
                parking_core::uptime(),
                tables.billing.running_total()
            );
        });
    }

    tasks::spawn("keys", || {
        parking_core::input::read_keys(tasks::running, |key| {
            if key == b'q' {
                info!("quit requested");
                tasks::RUNNING.store(false, std::sync::atomic::Ordering::SeqCst);
            }
        });
    });

    while tasks::running() {
        if parking_core::sigterm_received() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    tasks::shutdown();
    info!("manager stopped cleanly");
}
