//! Session re-exports.
//!
//! The implementation lives in the separate `modelhooks-session` crate. This
//! module exists so the `modelhooks` facade can expose the orchestrator without
//! forcing users to depend on sub-crates directly.

pub use modelhooks_session::{
    MemoryConnection, Session, SessionConfig, Statement, StatementKind, memory,
};
