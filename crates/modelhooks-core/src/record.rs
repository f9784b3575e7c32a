//! The marshalling boundary.
//!
//! How a record maps to columns is the connection's business; the session
//! only needs a table name and a primary key to tell inserts from updates.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A persistable entity.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Table the record lives in.
    const TABLE_NAME: &'static str;

    /// Primary key, or `None` for a record that has never been inserted.
    fn id(&self) -> Option<i64>;

    /// Store the primary key assigned on insert.
    fn set_id(&mut self, id: i64);

    /// Whether the record has not been inserted yet.
    fn is_new(&self) -> bool {
        self.id().is_none()
    }
}
