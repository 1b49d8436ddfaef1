//=========================================================================
// Stratum Demo
//
// Runs the main menu over a scripted world.
//
// Usage:
//   stratum [config.json]
//
// Logging follows RUST_LOG, defaulting to `info`.
//
//=========================================================================

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use env_logger::Env;
use log::{error, info};

use stratum_engine::prelude::*;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), EngineError> {
    let config = match std::env::args().nth(1) {
        Some(path) => SchedulerConfig::load(path)?,
        None => SchedulerConfig::default(),
    };

    let world = ScriptedWorld::new(["meadow", "canyon", "summit"])
        .with_replays(["meadow-best"])
        .with_finish_after(3000);
    let world: WorldHandle = Arc::new(Mutex::new(world));
    let profiles: ProfileHandle = Arc::new(Mutex::new(MemoryProfileStore::with_profiles(["player"])));
    let session = Session::new(world, profiles).with_ghost_downloads(true);

    info!("Starting demo");
    EngineBuilder::new()
        .with_config(config)
        .with_title("Stratum demo")
        .build()
        .init(|states| {
            states.push_state(Box::new(MainMenuState::new(session)));
        })
        .run()
}
