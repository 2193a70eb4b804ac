//! The Manager process: admits or rejects cars at each entrance, tracks which level every car
//! is on, and bills it on the way out. Everything here runs against an already-opened shared
//! region ([`parking_core::shm::ShmHandle`]) and a set of manager-local tables that never share
//! a lock with each other or with any shared-memory channel.

pub mod billing_table;
pub mod entry_controller;
pub mod exit_controller;
pub mod level_controller;
pub mod occupancy;
pub mod registry;

use billing_table::BillingTable;
use entry_controller::EntryController;
use exit_controller::ExitController;
use level_controller::LevelController;
use occupancy::LevelOccupancy;
use parking_core::shm::ShmHandle;
use parking_core::Config;
use registry::PlateRegistry;

/// Manager-local tables, allocated once for the life of the process and handed out as
/// `'static` references so each controller can be spawned as a named, independently joined
/// worker thread ([`parking_core::tasks::spawn`] requires `'static` bodies).
pub struct Tables {
    pub registry: PlateRegistry,
    pub occupancy: LevelOccupancy,
    pub billing: BillingTable,
}

impl Tables {
    pub fn new(config: &Config, plates: &[String]) -> &'static Self {
        Box::leak(Box::new(Self {
            registry: PlateRegistry::new(plates),
            occupancy: LevelOccupancy::new(config.n_lvl, config.level_capacity),
            billing: BillingTable::new(&config.billing_file),
        }))
    }
}

/// Spawns one named, registered thread per entrance, level and exit controller. Returns once
/// every thread has been spawned; [`parking_core::tasks::shutdown`] joins them all once the
/// process is told to stop.
pub fn spawn_controllers(config: &Config, shm: &'static ShmHandle, tables: &'static Tables) {
    let levels = shm.levels(config.n_lvl);

    for (index, entrance) in shm.entrances(config.n_ent).iter().enumerate() {
        let controller = EntryController {
            index,
            entrance,
            levels,
            registry: &tables.registry,
            occupancy: &tables.occupancy,
            billing: &tables.billing,
            gate_hold: config.scaled(20),
            clear_delay: config.scaled(20),
        };
        parking_core::tasks::spawn(&format!("entry-{index}"), move || controller.run());
    }
    for (index, level) in levels.iter().enumerate() {
        let controller = LevelController {
            index,
            level,
            registry: &tables.registry,
            occupancy: &tables.occupancy,
        };
        parking_core::tasks::spawn(&format!("level-{index}"), move || controller.run());
    }
    for (index, exit) in shm.exits(config.n_exit).iter().enumerate() {
        let controller = ExitController {
            index,
            exit,
            levels,
            registry: &tables.registry,
            billing: &tables.billing,
            time_factor: config.time_factor,
            cost_per_ms: config.cost_per_ms,
            gate_hold: config.scaled(20),
        };
        parking_core::tasks::spawn(&format!("exit-{index}"), move || controller.run());
    }
}
