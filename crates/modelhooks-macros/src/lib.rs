//! Derive macros for modelhooks.
//!
//! `#[derive(Hooks)]` implements `modelhooks::Entity` and `modelhooks::Hooks`
//! for a struct, wiring the capabilities it lists to the matching hook traits.
//!
//! ```ignore
//! use modelhooks::prelude::*;
//!
//! #[derive(Hooks)]
//! #[hooks(before_save, after_find)]
//! struct User {
//!     #[hooks(embed)]
//!     audit: Audit,
//!     name: String,
//! }
//!
//! impl<S: ?Sized> BeforeSave<S> for User {
//!     fn before_save(&mut self, _session: &S) -> Result<()> {
//!         self.name = self.name.trim().to_string();
//!         Ok(())
//!     }
//! }
//!
//! impl<S: ?Sized> AfterFind<S> for User {
//!     fn after_find(&mut self, _session: &S) -> Result<()> {
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Capabilities may be spelled as the hook method (`before_save`) or the
//! capability name (`BeforeSave`). Capabilities of `#[hooks(embed)]` fields are
//! promoted one level; a capability offered by two embedded fields is not
//! promoted at all.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod hooks_derive;

/// Derive `Entity` and `Hooks` for a struct.
#[proc_macro_derive(Hooks, attributes(hooks))]
pub fn derive_hooks(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match hooks_derive::parse_hooks(&input) {
        Ok(def) => hooks_derive::generate_hooks_impl(&def).into(),
        Err(err) => err.to_compile_error().into(),
    }
}
