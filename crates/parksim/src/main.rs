//! Simulator binary: creates the shared region, drives car arrivals, actuates gates, and
//! generates level temperatures. The only one of the three processes that creates (rather than
//! opens) the shared memory segment, and the only one that destroys it on shutdown.

use clap::Parser;
use log::{error, info};
use parking_core::shm::ShmHandle;
use parking_core::tasks::{self, ProcessStatus};
use parking_core::Config;
use parksim::temperature::FireMode;
use parksim::SimState;
use std::time::Duration;

#[derive(Parser)]
struct Args {
    /// Suppress the once-per-second status line.
    #[clap(long)]
    nodisp: bool,
}

fn main() {
    let args = Args::parse();
    parking_core::init("parksim");
    parking_core::register_signals();

    let config = Config::load_default().unwrap_or_else(|e| {
        error!("config load failed: {e}");
        std::process::exit(1);
    });

    let plates = parking_core::plates::load(&config.plates_file).unwrap_or_else(|e| {
        error!("unable to load plates file: {e}");
        std::process::exit(1);
    });

    let shm: &'static ShmHandle = match ShmHandle::create(
        &config.shm_name,
        config.n_ent,
        config.n_exit,
        config.n_lvl,
    ) {
        Ok(shm) => Box::leak(Box::new(shm)),
        Err(e) => {
            error!("unable to create shared region {}: {e}", config.shm_name);
            std::process::exit(1);
        }
    };

    let state = SimState::new(&config, &plates);
    tasks::set_status(ProcessStatus::Running);

    parksim::spawn_gate_actuators(&config, shm, state);
    parksim::spawn_temperature(&config, shm, state);
    parksim::spawn_dispatcher(&config, shm, state);

    if !args.nodisp {
        tasks::spawn_loop("display", Duration::from_secs(1), || {
            info!(
                "status={:?} uptime={:?} active_cars={}",
                tasks::status(),
                parking_core::uptime(),
                state.active_cars.load(std::sync::atomic::Ordering::Relaxed)
            );
        });
    }

    tasks::spawn("keys", || {
        parking_core::input::read_keys(tasks::running, |key| match key {
            b'q' => {
                info!("quit requested");
                tasks::RUNNING.store(false, std::sync::atomic::Ordering::SeqCst);
            }
            b'f' => {
                info!("debug: fixed-temperature fire");
                state.fire.set(FireMode::Fixed);
            }
            b'r' => {
                info!("debug: rate-of-rise fire");
                state.fire.set(FireMode::RateOfRise);
            }
            b's' => {
                info!("debug: fire stopped");
                state.fire.set(FireMode::Off);
            }
            _ => {}
        });
    });

    while tasks::running() {
        if parking_core::sigterm_received() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    tasks::RUNNING.store(false, std::sync::atomic::Ordering::SeqCst);
    parksim::wake_all_waiters(&config, shm, state);
    tasks::shutdown();

    shm.destroy(config.n_ent, config.n_exit, config.n_lvl);
    info!("simulator stopped cleanly");
}
