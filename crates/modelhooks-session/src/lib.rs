//! Session orchestrator for modelhooks.
//!
//! The [`Session`] owns a [`Connection`] and runs every persistence verb as
//! *before hooks, I/O, after hooks*. Hooks receive `&Session<C>` as their
//! session handle, so a hook can issue further reads through the same
//! connection.
//!
//! # Ordering
//!
//! | Verb | Before | I/O | After |
//! |---|---|---|---|
//! | `create` | BeforeSave, BeforeCreate | insert | AfterCreate, AfterSave |
//! | `update` | BeforeSave, BeforeUpdate | update | AfterUpdate, AfterSave |
//! | `save` | BeforeSave, then BeforeCreate or BeforeUpdate per element | insert, update | AfterCreate or AfterUpdate per element, then AfterSave |
//! | `destroy` | BeforeDestroy | delete | AfterDestroy |
//! | `find`, `reload`, `all` | | select | AfterFind |
//!
//! A failing before-hook aborts the verb and nothing is written. A failing
//! after-hook is reported once the write has already reached the connection.
//!
//! # Example
//!
//! ```ignore
//! let session = Session::new(MemoryConnection::new());
//!
//! // One entity
//! session.create(&cx, &mut user).await;
//!
//! // A slice; hooks run per element, in order
//! session.update(&cx, users.as_mut_slice()).await;
//!
//! // Validation first, write only when clean
//! let errors = session.validate_and_save(&cx, &mut user).await;
//! ```

use asupersync::{Cx, Outcome};
use modelhooks_core::{
    Capability, Connection, Error, HookFailure, Hooks, IntoWrapped, Record, Result, Validate,
    ValidationErrors, Wrapped,
};

pub mod memory;

pub use memory::{MemoryConnection, Statement, StatementKind};

// ============================================================================
// Session Configuration
// ============================================================================

/// Configuration for Session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Whether lifecycle hooks fire at all. Turn off for bulk imports.
    pub run_hooks: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { run_hooks: true }
    }
}

const CREATE_BEFORE: [Capability; 2] = [Capability::BeforeSave, Capability::BeforeCreate];
const CREATE_AFTER: [Capability; 2] = [Capability::AfterCreate, Capability::AfterSave];
const UPDATE_BEFORE: [Capability; 2] = [Capability::BeforeSave, Capability::BeforeUpdate];
const UPDATE_AFTER: [Capability; 2] = [Capability::AfterUpdate, Capability::AfterSave];

/// Consecutive elements of a `save` that take the same write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    start: usize,
    end: usize,
    creating: bool,
}

fn plan_runs<T: Record>(items: &[T]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let creating = item.is_new();
        match runs.last_mut() {
            Some(run) if run.creating == creating => run.end = index + 1,
            _ => runs.push(Run {
                start: index,
                end: index + 1,
                creating,
            }),
        }
    }
    runs
}

/// Re-base a hook failure raised inside a run onto the caller's element index.
fn reindex(err: Error, offset: usize, sequence: bool) -> Error {
    match err {
        Error::Hook(failure) => {
            let index = failure
                .index()
                .filter(|_| sequence)
                .map(|index| index + offset);
            HookFailure::new(failure.capability(), index, failure.into_inner()).into()
        }
        other => other,
    }
}

pub(crate) fn lift<T>(result: Result<T>) -> Outcome<T, Error> {
    match result {
        Ok(value) => Outcome::Ok(value),
        Err(e) => Outcome::Err(e),
    }
}

// ============================================================================
// Session
// ============================================================================

/// Runs persistence verbs with their lifecycle hooks.
pub struct Session<C: Connection> {
    /// The connection every verb goes through.
    connection: C,
    /// Configuration.
    config: SessionConfig,
}

impl<C: Connection> Session<C> {
    /// Create a new session from an existing connection.
    pub fn new(connection: C) -> Self {
        Self::with_config(connection, SessionConfig::default())
    }

    /// Create a new session with custom configuration.
    pub fn with_config(connection: C, config: SessionConfig) -> Self {
        tracing::debug!(run_hooks = config.run_hooks, "Creating session");
        Self { connection, config }
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Give the connection back.
    pub fn into_connection(self) -> C {
        self.connection
    }

    fn fire<T: Hooks<Self>>(
        &self,
        wrapped: &mut Wrapped<'_, T>,
        capabilities: &[Capability],
    ) -> Result<()> {
        if !self.config.run_hooks {
            return Ok(());
        }
        wrapped.dispatch_all(capabilities, self)
    }

    /// Fire `on_create` on the creating runs and `on_update` on the rest,
    /// walking the elements in order.
    fn fire_runs<T: Hooks<Self>>(
        &self,
        wrapped: &mut Wrapped<'_, T>,
        runs: &[Run],
        on_create: Capability,
        on_update: Capability,
    ) -> Result<()> {
        let sequence = wrapped.is_sequence();
        let items = wrapped.as_mut_slice();
        for run in runs {
            let capability = if run.creating { on_create } else { on_update };
            let mut part = Wrapped::sequence(&mut items[run.start..run.end]);
            self.fire(&mut part, &[capability])
                .map_err(|e| reindex(e, run.start, sequence))?;
        }
        Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert one entity or a slice, assigning ids.
    ///
    /// Returns the number of rows inserted.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE_NAME))]
    pub async fn create<'e, T, W>(&self, cx: &Cx, value: W) -> Outcome<u64, Error>
    where
        T: Record + Hooks<Self> + 'e,
        W: IntoWrapped<'e, Item = T>,
    {
        let mut wrapped = value.into_wrapped();
        self.create_wrapped(cx, &mut wrapped).await
    }

    /// Write back one entity or a slice that already has ids.
    ///
    /// Returns the number of rows updated.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE_NAME))]
    pub async fn update<'e, T, W>(&self, cx: &Cx, value: W) -> Outcome<u64, Error>
    where
        T: Record + Hooks<Self> + 'e,
        W: IntoWrapped<'e, Item = T>,
    {
        let mut wrapped = value.into_wrapped();
        self.update_wrapped(cx, &mut wrapped).await
    }

    /// Create records without an id and update the rest.
    ///
    /// Whether an element is created or updated is decided before any hook
    /// runs. Every before-hook runs across the whole slice before anything is
    /// written, so a failing hook at any index leaves storage untouched and
    /// reports that index. Consecutive elements of the same kind share one
    /// connection call.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE_NAME))]
    pub async fn save<'e, T, W>(&self, cx: &Cx, value: W) -> Outcome<u64, Error>
    where
        T: Record + Hooks<Self> + 'e,
        W: IntoWrapped<'e, Item = T>,
    {
        let mut wrapped = value.into_wrapped();
        self.save_wrapped(cx, &mut wrapped).await
    }

    /// Delete one entity or a slice.
    ///
    /// Returns the number of rows deleted.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE_NAME))]
    pub async fn destroy<'e, T, W>(&self, cx: &Cx, value: W) -> Outcome<u64, Error>
    where
        T: Record + Hooks<Self> + 'e,
        W: IntoWrapped<'e, Item = T>,
    {
        let mut wrapped = value.into_wrapped();
        if let Err(e) = self.fire(&mut wrapped, &[Capability::BeforeDestroy]) {
            return Outcome::Err(e);
        }
        if wrapped.is_empty() {
            return Outcome::Ok(0);
        }

        tracing::info!(
            table = T::TABLE_NAME,
            count = wrapped.len(),
            "Deleting records"
        );

        let deleted = match self.connection.delete(cx, wrapped.as_slice()).await {
            Outcome::Ok(n) => n,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        lift(
            self.fire(&mut wrapped, &[Capability::AfterDestroy])
                .map(|()| deleted),
        )
    }

    // ========================================================================
    // Validated Writes
    // ========================================================================

    /// Run BeforeValidate and [`Validate`], then [`save`](Self::save) when clean.
    ///
    /// Validation problems come back as the `Ok` value and nothing is written;
    /// an empty [`ValidationErrors`] means the write went through.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE_NAME))]
    pub async fn validate_and_save<'e, T, W>(
        &self,
        cx: &Cx,
        value: W,
    ) -> Outcome<ValidationErrors, Error>
    where
        T: Record + Validate + Hooks<Self> + 'e,
        W: IntoWrapped<'e, Item = T>,
    {
        let mut wrapped = value.into_wrapped();
        match self.check(&mut wrapped) {
            Ok(errors) if errors.has_any() => return Outcome::Ok(errors),
            Ok(_) => {}
            Err(e) => return Outcome::Err(e),
        }
        match self.save_wrapped(cx, &mut wrapped).await {
            Outcome::Ok(_) => Outcome::Ok(ValidationErrors::new()),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Validated [`create`](Self::create). See [`validate_and_save`](Self::validate_and_save).
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE_NAME))]
    pub async fn validate_and_create<'e, T, W>(
        &self,
        cx: &Cx,
        value: W,
    ) -> Outcome<ValidationErrors, Error>
    where
        T: Record + Validate + Hooks<Self> + 'e,
        W: IntoWrapped<'e, Item = T>,
    {
        let mut wrapped = value.into_wrapped();
        match self.check(&mut wrapped) {
            Ok(errors) if errors.has_any() => return Outcome::Ok(errors),
            Ok(_) => {}
            Err(e) => return Outcome::Err(e),
        }
        match self.create_wrapped(cx, &mut wrapped).await {
            Outcome::Ok(_) => Outcome::Ok(ValidationErrors::new()),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Validated [`update`](Self::update). See [`validate_and_save`](Self::validate_and_save).
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE_NAME))]
    pub async fn validate_and_update<'e, T, W>(
        &self,
        cx: &Cx,
        value: W,
    ) -> Outcome<ValidationErrors, Error>
    where
        T: Record + Validate + Hooks<Self> + 'e,
        W: IntoWrapped<'e, Item = T>,
    {
        let mut wrapped = value.into_wrapped();
        match self.check(&mut wrapped) {
            Ok(errors) if errors.has_any() => return Outcome::Ok(errors),
            Ok(_) => {}
            Err(e) => return Outcome::Err(e),
        }
        match self.update_wrapped(cx, &mut wrapped).await {
            Outcome::Ok(_) => Outcome::Ok(ValidationErrors::new()),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Load the record with primary key `id` into `target`, then fire AfterFind.
    #[tracing::instrument(level = "debug", skip(self, cx, target), fields(table = T::TABLE_NAME))]
    pub async fn find<T>(&self, cx: &Cx, target: &mut T, id: i64) -> Outcome<(), Error>
    where
        T: Record + Hooks<Self>,
    {
        let row = match self.connection.select_by_id::<T>(cx, id).await {
            Outcome::Ok(row) => row,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        let Some(row) = row else {
            tracing::debug!(table = T::TABLE_NAME, id, "Record not found");
            return Outcome::Err(Error::NotFound {
                table: T::TABLE_NAME,
                id,
            });
        };

        *target = row;
        lift(self.fire(&mut Wrapped::single(target), &[Capability::AfterFind]))
    }

    /// Re-read `target` by its own primary key, then fire AfterFind.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE_NAME))]
    pub async fn reload<T>(&self, cx: &Cx, target: &mut T) -> Outcome<(), Error>
    where
        T: Record + Hooks<Self>,
    {
        let Some(id) = target.id() else {
            return Outcome::Err(Error::MissingId {
                table: T::TABLE_NAME,
            });
        };
        self.find(cx, target, id).await
    }

    /// Replace the contents of `out` with every stored record, then fire
    /// AfterFind on each in order.
    ///
    /// Returns the number of records loaded.
    #[tracing::instrument(level = "debug", skip_all, fields(table = T::TABLE_NAME))]
    pub async fn all<T>(&self, cx: &Cx, out: &mut Vec<T>) -> Outcome<usize, Error>
    where
        T: Record + Hooks<Self>,
    {
        let rows = match self.connection.select_all::<T>(cx).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        tracing::debug!(table = T::TABLE_NAME, count = rows.len(), "Loaded records");

        *out = rows;
        let count = out.len();
        lift(
            self.fire(
                &mut Wrapped::sequence(out.as_mut_slice()),
                &[Capability::AfterFind],
            )
            .map(|()| count),
        )
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn create_wrapped<T>(&self, cx: &Cx, wrapped: &mut Wrapped<'_, T>) -> Outcome<u64, Error>
    where
        T: Record + Hooks<Self>,
    {
        if let Err(e) = self.fire(wrapped, &CREATE_BEFORE) {
            return Outcome::Err(e);
        }
        if wrapped.is_empty() {
            return Outcome::Ok(0);
        }

        tracing::info!(
            table = T::TABLE_NAME,
            count = wrapped.len(),
            "Inserting records"
        );

        let inserted = match self.connection.insert(cx, wrapped.as_mut_slice()).await {
            Outcome::Ok(n) => n,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        lift(self.fire(wrapped, &CREATE_AFTER).map(|()| inserted))
    }

    async fn update_wrapped<T>(&self, cx: &Cx, wrapped: &mut Wrapped<'_, T>) -> Outcome<u64, Error>
    where
        T: Record + Hooks<Self>,
    {
        if let Err(e) = self.fire(wrapped, &UPDATE_BEFORE) {
            return Outcome::Err(e);
        }
        if wrapped.is_empty() {
            return Outcome::Ok(0);
        }

        tracing::info!(
            table = T::TABLE_NAME,
            count = wrapped.len(),
            "Updating records"
        );

        let updated = match self.connection.update(cx, wrapped.as_slice()).await {
            Outcome::Ok(n) => n,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        lift(self.fire(wrapped, &UPDATE_AFTER).map(|()| updated))
    }

    async fn save_wrapped<T>(&self, cx: &Cx, wrapped: &mut Wrapped<'_, T>) -> Outcome<u64, Error>
    where
        T: Record + Hooks<Self>,
    {
        let runs = plan_runs(wrapped.as_slice());

        if let Err(e) = self.fire(wrapped, &[Capability::BeforeSave]) {
            return Outcome::Err(e);
        }
        if let Err(e) = self.fire_runs(
            wrapped,
            &runs,
            Capability::BeforeCreate,
            Capability::BeforeUpdate,
        ) {
            return Outcome::Err(e);
        }
        if wrapped.is_empty() {
            return Outcome::Ok(0);
        }

        tracing::info!(
            table = T::TABLE_NAME,
            count = wrapped.len(),
            runs = runs.len(),
            "Saving records"
        );

        let mut written = 0;
        for run in &runs {
            let part = &mut wrapped.as_mut_slice()[run.start..run.end];
            let outcome = if run.creating {
                self.connection.insert(cx, part).await
            } else {
                self.connection.update(cx, &*part).await
            };
            match outcome {
                Outcome::Ok(n) => written += n,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        lift(
            self.fire_runs(
                wrapped,
                &runs,
                Capability::AfterCreate,
                Capability::AfterUpdate,
            )
            .and_then(|()| self.fire(wrapped, &[Capability::AfterSave]))
            .map(|()| written),
        )
    }

    /// Fire BeforeValidate, then collect [`Validate`] output for every element.
    ///
    /// Messages for a sequence are keyed `"<index>.<field>"`.
    fn check<T>(&self, wrapped: &mut Wrapped<'_, T>) -> Result<ValidationErrors>
    where
        T: Record + Validate + Hooks<Self>,
    {
        self.fire(wrapped, &[Capability::BeforeValidate])?;

        let mut errors = ValidationErrors::new();
        match wrapped {
            Wrapped::Single(item) => item.validate(&mut errors),
            Wrapped::Sequence(items) => {
                for (index, item) in items.iter().enumerate() {
                    let mut own = ValidationErrors::new();
                    item.validate(&mut own);
                    for (field, messages) in own.iter() {
                        for message in messages {
                            errors.add(format!("{index}.{field}"), message.clone());
                        }
                    }
                }
            }
        }

        if errors.has_any() {
            tracing::debug!(
                table = T::TABLE_NAME,
                fields = errors.len(),
                "Validation failed, skipping write"
            );
        }
        Ok(errors)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
