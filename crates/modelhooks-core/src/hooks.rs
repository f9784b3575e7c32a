//! Hook traits.
//!
//! Each capability has its own trait with a single method. An entity type
//! implements the ones it cares about and advertises them through [`Hooks`],
//! which is what the dispatcher actually talks to. `#[derive(Hooks)]` writes
//! the [`Hooks`] impl from a `#[hooks(...)]` list; a hand-written impl works
//! just as well.
//!
//! Every hook receives the session handle `S` untouched. Hooks that don't care
//! about the session can be written generically:
//!
//! ```
//! use modelhooks_core::{BeforeSave, Result};
//!
//! struct User {
//!     name: String,
//! }
//!
//! impl<S: ?Sized> BeforeSave<S> for User {
//!     fn before_save(&mut self, _session: &S) -> Result<()> {
//!         self.name = self.name.trim().to_string();
//!         Ok(())
//!     }
//! }
//! ```

use crate::capability::{Capability, CapabilitySet};
use crate::error::Result;

/// Runs before validation in the `validate_and_*` operations.
pub trait BeforeValidate<S: ?Sized> {
    fn before_validate(&mut self, session: &S) -> Result<()>;
}

/// Runs before both inserts and updates.
pub trait BeforeSave<S: ?Sized> {
    fn before_save(&mut self, session: &S) -> Result<()>;
}

/// Runs before an insert, after [`BeforeSave`].
pub trait BeforeCreate<S: ?Sized> {
    fn before_create(&mut self, session: &S) -> Result<()>;
}

/// Runs before an update, after [`BeforeSave`].
pub trait BeforeUpdate<S: ?Sized> {
    fn before_update(&mut self, session: &S) -> Result<()>;
}

/// Runs before a delete.
pub trait BeforeDestroy<S: ?Sized> {
    fn before_destroy(&mut self, session: &S) -> Result<()>;
}

/// Runs after both inserts and updates.
pub trait AfterSave<S: ?Sized> {
    fn after_save(&mut self, session: &S) -> Result<()>;
}

/// Runs after an insert, before [`AfterSave`].
pub trait AfterCreate<S: ?Sized> {
    fn after_create(&mut self, session: &S) -> Result<()>;
}

/// Runs after an update, before [`AfterSave`].
pub trait AfterUpdate<S: ?Sized> {
    fn after_update(&mut self, session: &S) -> Result<()>;
}

/// Runs after a delete.
pub trait AfterDestroy<S: ?Sized> {
    fn after_destroy(&mut self, session: &S) -> Result<()>;
}

/// Runs after a record has been loaded.
pub trait AfterFind<S: ?Sized> {
    fn after_find(&mut self, session: &S) -> Result<()>;
}

/// Marker for types that can be handed to [`crate::Wrapped::new`].
///
/// Implemented by `#[derive(Hooks)]`.
pub trait Entity {}

/// Capability detection surface used by the dispatcher.
///
/// All methods have defaults, so `impl<S: ?Sized> Hooks<S> for Plain {}`
/// declares a type with no hooks.
pub trait Hooks<S: ?Sized>: Entity {
    /// Capabilities this type implements itself.
    ///
    /// Evaluated on every dispatch; implementations should be a constant or a
    /// cheap computation.
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::EMPTY
    }

    /// Invoke a capability listed in [`Hooks::capabilities`].
    ///
    /// The dispatcher only calls this for capabilities the type reported.
    fn call_hook(&mut self, capability: Capability, session: &S) -> Result<()> {
        let _ = (capability, session);
        Ok(())
    }

    /// The embedded value that provides `capability`, if any.
    ///
    /// Only the returned value's own [`Hooks::capabilities`] are consulted;
    /// its embedded values are not searched. Return `None` when no embedded
    /// value provides the capability or when more than one does.
    fn embedded(&mut self, capability: Capability) -> Option<&mut dyn Hooks<S>> {
        let _ = capability;
        None
    }
}
