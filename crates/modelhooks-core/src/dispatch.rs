//! Capability detection and hook invocation.
//!
//! Detection for one element is a bitset test on the element itself and, when
//! that misses, on the single embedded value it names for the capability. A
//! sequence is walked in order and the walk stops at the first failing hook.

use crate::capability::Capability;
use crate::error::{HookFailure, Result};
use crate::hooks::Hooks;
use crate::wrapped::Wrapped;

/// Fire `capability` on every wrapped entity.
///
/// Entities that don't implement the capability are skipped silently. The
/// first failing hook stops the dispatch; its error comes back wrapped in a
/// [`HookFailure`] naming the capability and, for sequences, the element
/// index. Elements after the failing one are not visited.
#[allow(clippy::missing_errors_doc)]
pub fn dispatch<S, T>(
    wrapped: &mut Wrapped<'_, T>,
    capability: Capability,
    session: &S,
) -> Result<()>
where
    S: ?Sized,
    T: Hooks<S>,
{
    tracing::trace!(
        capability = capability.name(),
        count = wrapped.len(),
        "Dispatching hook"
    );

    match wrapped {
        Wrapped::Single(item) => fire(&mut **item, capability, session).map_err(|e| {
            tracing::debug!(capability = capability.name(), error = %e, "Hook failed");
            HookFailure::new(capability, None, e).into()
        }),
        Wrapped::Sequence(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                if let Err(e) = fire(item, capability, session) {
                    tracing::debug!(
                        capability = capability.name(),
                        index,
                        error = %e,
                        "Hook failed, skipping remaining elements"
                    );
                    return Err(HookFailure::new(capability, Some(index), e).into());
                }
            }
            Ok(())
        }
    }
}

/// Whether `entity` provides `capability`, itself or through one embedded value.
pub fn provides<S, T>(entity: &mut T, capability: Capability) -> bool
where
    S: ?Sized,
    T: Hooks<S> + ?Sized,
{
    entity.capabilities().contains(capability)
        || entity
            .embedded(capability)
            .is_some_and(|inner| inner.capabilities().contains(capability))
}

/// Detect and invoke on one element. Absence is `Ok(())`.
fn fire<S, T>(entity: &mut T, capability: Capability, session: &S) -> Result<()>
where
    S: ?Sized,
    T: Hooks<S> + ?Sized,
{
    if entity.capabilities().contains(capability) {
        return entity.call_hook(capability, session);
    }
    match entity.embedded(capability) {
        Some(inner) if inner.capabilities().contains(capability) => {
            inner.call_hook(capability, session)
        }
        _ => Ok(()),
    }
}

impl<T> Wrapped<'_, T> {
    /// Fire `capability` on the wrapped entities. See [`dispatch`].
    #[allow(clippy::missing_errors_doc)]
    pub fn dispatch<S>(&mut self, capability: Capability, session: &S) -> Result<()>
    where
        S: ?Sized,
        T: Hooks<S>,
    {
        dispatch(self, capability, session)
    }

    /// Fire several capabilities in order, stopping at the first failure.
    #[allow(clippy::missing_errors_doc)]
    pub fn dispatch_all<S>(&mut self, capabilities: &[Capability], session: &S) -> Result<()>
    where
        S: ?Sized,
        T: Hooks<S>,
    {
        for &capability in capabilities {
            dispatch(self, capability, session)?;
        }
        Ok(())
    }
}
