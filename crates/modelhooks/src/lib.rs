//! Lifecycle hooks for Rust persistence layers.
//!
//! `modelhooks` fires application-defined hooks (`BeforeSave`, `AfterFind`,
//! ...) around create, update, destroy and find operations, for single values
//! and slices alike, including hooks promoted from embedded fields.
//!
//! ```ignore
//! use modelhooks::prelude::*;
//!
//! #[derive(Hooks, Serialize, Deserialize)]
//! #[hooks(before_save)]
//! struct User {
//!     id: Option<i64>,
//!     name: String,
//! }
//!
//! impl<S: ?Sized> BeforeSave<S> for User {
//!     fn before_save(&mut self, _session: &S) -> Result<()> {
//!         if self.name.is_empty() {
//!             return Err(Error::custom("name can't be blank"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let session = Session::new(MemoryConnection::new());
//! session.create(&cx, &mut user).await;
//! ```
//!
//! The pieces live in separate crates; this one re-exports them so
//! applications depend on a single crate:
//!
//! - `modelhooks-core`: capabilities, hook traits, the dispatcher
//! - `modelhooks-macros`: `#[derive(Hooks)]`
//! - `modelhooks-session`: the [`Session`] orchestrator and [`MemoryConnection`]

pub mod session;

pub use modelhooks_core::*;
pub use modelhooks_macros::Hooks;
pub use session::{MemoryConnection, Session, SessionConfig, Statement, StatementKind};

/// Everything an application usually needs.
pub mod prelude {
    pub use crate::session::{MemoryConnection, Session, SessionConfig};
    pub use modelhooks_core::{
        AfterCreate, AfterDestroy, AfterFind, AfterSave, AfterUpdate, BeforeCreate,
        BeforeDestroy, BeforeSave, BeforeUpdate, BeforeValidate, Capability, CapabilitySet,
        Connection, Cx, Entity, Error, Hooks, Outcome, Record, Result, Validate,
        ValidationErrors, Wrapped,
    };
    pub use modelhooks_macros::Hooks;
}
