//! Core types and traits for modelhooks.
//!
//! `modelhooks-core` decides *whether* and *in what order* lifecycle hooks fire
//! on application entities. It never builds SQL and never touches a database
//! itself.
//!
//! # Role In The Architecture
//!
//! - **Capability set**: [`Capability`] names the ten lifecycle points and
//!   [`CapabilitySet`] is the bitset a type reports through [`Hooks`].
//! - **Hook traits**: one trait per capability ([`BeforeSave`], [`AfterFind`],
//!   ...). `modelhooks-macros` generates the [`Hooks`] impl that exposes them.
//! - **Entity wrapper**: [`Wrapped`] is the single-or-sequence view handed to
//!   the dispatcher.
//! - **Dispatcher**: [`dispatch`] detects and invokes hooks, stopping at the
//!   first failure.
//! - **Boundaries**: [`Record`], [`Connection`] and [`Validate`] are the
//!   contracts the session drives; their implementations live elsewhere.
//!
//! # Who Uses This Crate
//!
//! - `modelhooks-session` calls the dispatcher around every persistence verb.
//! - Connection implementations implement [`Connection`].
//! - Applications implement the hook traits on their entity types.
//!
//! Most applications should use the `modelhooks` facade.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod capability;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod hooks;
pub mod record;
pub mod validate;
pub mod wrapped;

pub use capability::{Capability, CapabilitySet};
pub use connection::Connection;
pub use dispatch::{dispatch, provides};
pub use error::{Error, HookFailure, Result};
pub use hooks::{
    AfterCreate, AfterDestroy, AfterFind, AfterSave, AfterUpdate, BeforeCreate, BeforeDestroy,
    BeforeSave, BeforeUpdate, BeforeValidate, Entity, Hooks,
};
pub use record::Record;
pub use validate::{Validate, ValidationErrors};
pub use wrapped::{IntoWrapped, Wrapped};
