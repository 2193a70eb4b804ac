//! The Fire Alarm Unit: one temperature monitor per level feeding a single alarm arbiter that
//! mirrors the alarm state into shared memory and drives evacuation takeover.

pub mod alarm;
pub mod monitor;

use alarm::AlarmState;
use monitor::TemperatureMonitor;
use parking_core::shm::ShmHandle;
use parking_core::tasks;
use parking_core::Config;

/// Process-lifetime state every monitor and the arbiter thread need `'static` access to.
pub struct FireState {
    pub alarm: AlarmState,
    pub monitors: Vec<TemperatureMonitor>,
}

impl FireState {
    pub fn new(config: &Config) -> &'static Self {
        Box::leak(Box::new(Self {
            alarm: AlarmState::new(config.n_lvl),
            monitors: (0..config.n_lvl).map(|_| TemperatureMonitor::default()).collect(),
        }))
    }
}

/// Spawns one named, registered monitor thread per level, ticking every 2ms (scaled) in lockstep
/// with the Simulator's temperature generator.
pub fn spawn_monitors(config: &Config, shm: &'static ShmHandle, state: &'static FireState) {
    let levels = shm.levels(config.n_lvl);
    for (index, level) in levels.iter().enumerate() {
        tasks::spawn_loop(&format!("monitor-{index}"), config.scaled(2), move || {
            let fire = state.monitors[index].tick(level.temperature());
            state.alarm.set_level(index, fire);
        });
    }
}

/// Spawns the alarm arbiter as its own registered thread (not a fixed-interval loop, since it
/// alternates between a fast 20ms evacuation-letter cadence while active and a slower poll while
/// idle).
pub fn spawn_arbiter(config: &Config, shm: &'static ShmHandle, state: &'static FireState) {
    let levels = shm.levels(config.n_lvl);
    let entrances = shm.entrances(config.n_ent);
    let exits = shm.exits(config.n_exit);
    let letter_interval = config.scaled(20);
    let poll_interval = config.scaled(2);
    tasks::spawn("arbiter", move || {
        alarm::run(levels, entrances, exits, &state.alarm, letter_interval, poll_interval);
    });
}
