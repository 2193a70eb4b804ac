//! Fire Alarm Unit binary: opens the shared region created by the Simulator, monitors every
//! level's temperature, and arbitrates the global alarm state. Takes no command-line flags.

use log::{error, info};
use parking_core::shm::ShmHandle;
use parking_core::tasks::{self, ProcessStatus};
use parking_core::Config;
use std::time::Duration;

fn main() {
    parking_core::init("parkfire");
    parking_core::register_signals();

    let config = Config::load_default().unwrap_or_else(|e| {
        error!("config load failed: {e}");
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

    let state = parkfire::FireState::new(&config);
    tasks::set_status(ProcessStatus::Running);

    parkfire::spawn_monitors(&config, shm, state);
    parkfire::spawn_arbiter(&config, shm, state);

    tasks::spawn_loop("display", Duration::from_secs(1), || {
        info!(
            "status={:?} uptime={:?} alarm_active={}",
            tasks::status(),
            parking_core::uptime(),
            state.alarm.is_active()
        );
    });

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
    info!("fire alarm unit stopped cleanly");
}
