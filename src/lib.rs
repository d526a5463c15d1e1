//! Arena Sim Server - tick-based authoritative arena simulation
//!
//! Clients join arenas, submit intents over HTTP and poll snapshots while a
//! background task per arena advances rounds, respawns and objective timers.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod session;
pub mod util;
