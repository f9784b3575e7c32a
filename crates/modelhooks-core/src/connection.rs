//! The I/O boundary the session drives.
//!
//! A `Connection` performs the actual persistence effect for a batch of
//! records. Statement construction, transactions and pooling live behind it.

use asupersync::{Cx, Outcome};

use crate::error::Error;
use crate::record::Record;

/// Entity-level persistence operations.
///
/// Every operation takes the whole batch at once; a single entity arrives as a
/// one-element slice.
pub trait Connection: Send + Sync {
    /// Insert new records, assigning ids through [`Record::set_id`].
    ///
    /// Returns the number of rows written.
    fn insert<T: Record>(
        &self,
        cx: &Cx,
        records: &mut [T],
    ) -> impl std::future::Future<Output = Outcome<u64, Error>> + Send;

    /// Write existing records back. Returns the number of rows affected.
    fn update<T: Record>(
        &self,
        cx: &Cx,
        records: &[T],
    ) -> impl std::future::Future<Output = Outcome<u64, Error>> + Send;

    /// Delete records by primary key. Returns the number of rows affected.
    fn delete<T: Record>(
        &self,
        cx: &Cx,
        records: &[T],
    ) -> impl std::future::Future<Output = Outcome<u64, Error>> + Send;

    /// Load one record by primary key.
    fn select_by_id<T: Record>(
        &self,
        cx: &Cx,
        id: i64,
    ) -> impl std::future::Future<Output = Outcome<Option<T>, Error>> + Send;

    /// Load every record of a table, ordered by primary key.
    fn select_all<T: Record>(
        &self,
        cx: &Cx,
    ) -> impl std::future::Future<Output = Outcome<Vec<T>, Error>> + Send;
}
