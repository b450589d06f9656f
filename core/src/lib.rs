//! Governopoly core: the session engine behind the CDO decision game.
//!
//! Everything a session does happens through `engine::SessionEngine`.
//! The presentation layer reads snapshots and reports, and talks back
//! through `command::PlayerCommand`.

pub mod arrival;
pub mod catalog;
pub mod clock;
pub mod command;
pub mod config;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod event;
pub mod inbox;
pub mod observer;
pub mod pool;
pub mod report;
pub mod resources;
pub mod rng;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod termination;
pub mod types;
