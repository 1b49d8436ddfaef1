//=========================================================================
// Stratum Engine: Library Root
//
// A cooperative game-state stack scheduler: screens are states on a
// stack, overlays compose over the screens below them, and every state
// runs at its own update/render cadence.
//
// Responsibilities:
// - Expose the engine facade (`Engine`, `EngineBuilder`)
// - Expose the state stack (`core::state`) and the shipped screens
//   (`states`)
// - Keep the windowing layer (`platform`) hidden from end users
//
// Typical usage:
// ```no_run
// use std::sync::{Arc, Mutex};
// use stratum_engine::prelude::*;
//
// let world: WorldHandle = Arc::new(Mutex::new(ScriptedWorld::new(["intro"])));
// let profiles: ProfileHandle = Arc::new(Mutex::new(MemoryProfileStore::new()));
// let session = Session::new(world, profiles);
//
// EngineBuilder::new()
//     .build()
//     .init(|states| {
//         states.push_state(Box::new(MainMenuState::new(session)));
//     })
//     .run()?;
// # Ok::<(), stratum_engine::core::error::EngineError>(())
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the scheduler and its vocabulary (states, messages, input,
// rendering, world collaborators). `states` holds the game screens built
// on top of it.
//
pub mod core;
pub mod prelude;
pub mod states;

//--- Internal Modules ----------------------------------------------------
//
// `platform` contains the Winit window and event loop; `engine` wires it
// to the scheduler thread.
//
mod engine;
mod platform;

//--- Public Exports ------------------------------------------------------
pub use engine::{Engine, EngineBuilder};
