//! The Simulator process: owns the shared region, drives car arrivals and departures, actuates
//! every gate, and generates level temperatures.

pub mod car;
pub mod entry_queue;
pub mod gate_actuator;
pub mod plate_bag;
pub mod temperature;

use car::CarWorld;
use entry_queue::EntryQueue;
use parking_core::shm::ShmHandle;
use parking_core::tasks::{self, running};
use parking_core::Config;
use plate_bag::PlateBag;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use temperature::{FireControl, TemperatureSim};
use threadpool::ThreadPool;

/// Process-lifetime state the dispatcher, gate actuators and temperature generator all need
/// `'static` access to, so every worker thread ([`parking_core::tasks::spawn`]) can capture it
/// by plain reference.
pub struct SimState {
    pub plate_bag: PlateBag,
    pub entry_queues: Vec<EntryQueue>,
    pub active_cars: AtomicUsize,
    pub fire: FireControl,
    pub temperature: TemperatureSim,
}

impl SimState {
    pub fn new(config: &Config, plates: &[String]) -> &'static Self {
        Box::leak(Box::new(Self {
            plate_bag: PlateBag::new(plates),
            entry_queues: (0..config.n_ent).map(|_| EntryQueue::default()).collect(),
            active_cars: AtomicUsize::new(0),
            fire: FireControl::default(),
            temperature: TemperatureSim::default(),
        }))
    }

    pub fn wake_all_queues(&self) {
        for queue in &self.entry_queues {
            queue.wake_all();
        }
    }
}

/// Spawns the car-arrival dispatcher: on a fixed tick, takes an available plate from the bag
/// and hands it to the bounded car-worker pool, picking a uniformly random entrance.
///
/// The pool's size (`2 * n_lvl * level_capacity`) bounds peak concurrent cars without spawning
/// an unbounded number of OS threads; a full pool simply makes the next dispatch tick wait.
pub fn spawn_dispatcher(config: &Config, shm: &'static ShmHandle, state: &'static SimState) {
    let pool_size = (2 * config.n_lvl * config.level_capacity).max(1);
    let pool = ThreadPool::new(pool_size);
    let n_ent = config.n_ent;
    let n_exit = config.n_exit;
    let n_lvl = config.n_lvl;
    let time_factor = config.time_factor;

    tasks::spawn("dispatcher", move || {
        while running() {
            if let Some(plate) = state.plate_bag.take() {
                let entrance_index = parking_core::rng::index(n_ent);
                let world = CarWorld {
                    entrances: shm.entrances(n_ent),
                    levels: shm.levels(n_lvl),
                    exits: shm.exits(n_exit),
                    entry_queues: &state.entry_queues,
                    active_cars: &state.active_cars,
                    time_factor,
                    allow_misbehavior: true,
                };
                pool.execute(move || {
                    let plate = world.drive(plate, entrance_index);
                    state.plate_bag.give_back(plate);
                });
            } else {
                std::thread::sleep(Duration::from_millis(50));
            }
        }
        pool.join();
    });
}

/// Spawns one named gate actuator thread per entrance and exit gate.
pub fn spawn_gate_actuators(config: &Config, shm: &'static ShmHandle, state: &'static SimState) {
    let hold = config.scaled(10);
    for (index, entrance) in shm.entrances(config.n_ent).iter().enumerate() {
        let gate = &entrance.gate;
        parking_core::tasks::spawn(&format!("gate-ent-{index}"), move || {
            gate_actuator::run(gate, hold, &state.active_cars);
        });
    }
    for (index, exit) in shm.exits(config.n_exit).iter().enumerate() {
        let gate = &exit.gate;
        parking_core::tasks::spawn(&format!("gate-ext-{index}"), move || {
            gate_actuator::run(gate, hold, &state.active_cars);
        });
    }
}

/// Spawns the temperature generator, ticking every 2ms (scaled) for every level.
pub fn spawn_temperature(config: &Config, shm: &'static ShmHandle, state: &'static SimState) {
    let levels = shm.levels(config.n_lvl);
    tasks::spawn_loop("temperature", config.scaled(2), move || {
        state.temperature.tick(levels, &state.fire);
    });
}

/// Releases every blocked waiter across entry queues, entrance/level/exit LPRs and gates so the
/// shutdown coordinator's join of registered workers can complete. Order matches the spec: cars
/// first (entry queues, then channels), gates last.
pub fn wake_all_waiters(config: &Config, shm: &'static ShmHandle, state: &'static SimState) {
    state.wake_all_queues();
    for entrance in shm.entrances(config.n_ent) {
        entrance.lpr.wake_all();
    }
    for level in shm.levels(config.n_lvl) {
        level.lpr.wake_all();
    }
    for exit in shm.exits(config.n_exit) {
        exit.lpr.wake_all();
    }
    for entrance in shm.entrances(config.n_ent) {
        entrance.gate.wake_all();
    }
    for exit in shm.exits(config.n_exit) {
        exit.gate.wake_all();
    }
}
