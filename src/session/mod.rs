//! Session handling: which participant sits in which arena

pub mod registry;

pub use registry::{JoinResult, SessionError, SessionRegistry, DEFAULT_ARENA_ID};
