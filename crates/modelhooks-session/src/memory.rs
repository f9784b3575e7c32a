//! In-memory connection.
//!
//! Records are stored as JSON per table, keyed by primary key. Every operation
//! appends a [`Statement`] to a journal so callers can see which writes reached
//! storage and in what order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use asupersync::{Cx, Outcome};
use modelhooks_core::{Connection, Error, Record, Result};

use crate::lift;

/// Kind of operation recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    Select,
}

/// One journaled operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// What ran.
    pub kind: StatementKind,
    /// Table it ran against.
    pub table: &'static str,
    /// Primary keys it touched.
    pub ids: Vec<i64>,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<&'static str, BTreeMap<i64, serde_json::Value>>,
    last_ids: HashMap<&'static str, i64>,
    journal: Vec<Statement>,
}

impl MemoryState {
    fn record(&mut self, kind: StatementKind, table: &'static str, ids: Vec<i64>) {
        tracing::trace!(?kind, table, rows = ids.len(), "Memory statement");
        self.journal.push(Statement { kind, table, ids });
    }
}

/// A [`Connection`] backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryConnection {
    state: Mutex<MemoryState>,
}

impl MemoryConnection {
    /// Create an empty connection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements run so far, oldest first.
    pub fn journal(&self) -> Result<Vec<Statement>> {
        Ok(self.lock()?.journal.clone())
    }

    /// Forget the journal, keeping the data.
    pub fn clear_journal(&self) -> Result<()> {
        self.lock()?.journal.clear();
        Ok(())
    }

    /// Number of rows stored in `table`.
    pub fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.lock()?.tables.get(table).map_or(0, BTreeMap::len))
    }

    /// Read a stored record without journaling, e.g. to inspect what was
    /// written before after-hooks ran.
    pub fn stored<T: Record>(&self, id: i64) -> Result<Option<T>> {
        let state = self.lock()?;
        state
            .tables
            .get(T::TABLE_NAME)
            .and_then(|rows| rows.get(&id))
            .map(|value| decode(value.clone()))
            .transpose()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Connection("memory connection lock poisoned".to_string()))
    }

    fn insert_now<T: Record>(&self, records: &mut [T]) -> Result<u64> {
        let mut state = self.lock()?;
        let table = T::TABLE_NAME;
        let mut last_id = state.last_ids.get(table).copied().unwrap_or(0);

        // Records are not touched until every key is known to be free and
        // every record serializes.
        let mut planned: Vec<(i64, bool)> = Vec::with_capacity(records.len());
        for record in records.iter() {
            let (id, assigned) = match record.id() {
                Some(id) => (id, false),
                None => {
                    last_id += 1;
                    (last_id, true)
                }
            };
            let exists = state
                .tables
                .get(table)
                .is_some_and(|rows| rows.contains_key(&id));
            if exists || planned.iter().any(|(planned_id, _)| *planned_id == id) {
                return Err(Error::Connection(format!(
                    "duplicate primary key {} in {}",
                    id, table
                )));
            }
            encode(record)?;
            last_id = last_id.max(id);
            planned.push((id, assigned));
        }

        let mut staged = Vec::with_capacity(planned.len());
        for (record, (id, assigned)) in records.iter_mut().zip(&planned) {
            if *assigned {
                record.set_id(*id);
            }
            staged.push((*id, encode(&*record)?));
        }

        let ids: Vec<i64> = staged.iter().map(|(id, _)| *id).collect();
        state.tables.entry(table).or_default().extend(staged);
        state.last_ids.insert(table, last_id);
        state.record(StatementKind::Insert, table, ids.clone());
        Ok(ids.len() as u64)
    }

    fn update_now<T: Record>(&self, records: &[T]) -> Result<u64> {
        let mut state = self.lock()?;
        let table = T::TABLE_NAME;

        let mut staged = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id().ok_or(Error::MissingId { table })?;
            staged.push((id, encode(record)?));
        }

        let rows = state.tables.entry(table).or_default();
        let mut ids = Vec::new();
        for (id, value) in staged {
            if let Some(slot) = rows.get_mut(&id) {
                *slot = value;
                ids.push(id);
            }
        }
        let affected = ids.len() as u64;
        state.record(StatementKind::Update, table, ids);
        Ok(affected)
    }

    fn delete_now<T: Record>(&self, records: &[T]) -> Result<u64> {
        let mut state = self.lock()?;
        let table = T::TABLE_NAME;

        let mut wanted = Vec::with_capacity(records.len());
        for record in records {
            wanted.push(record.id().ok_or(Error::MissingId { table })?);
        }

        let rows = state.tables.entry(table).or_default();
        let ids: Vec<i64> = wanted
            .into_iter()
            .filter(|id| rows.remove(id).is_some())
            .collect();
        let affected = ids.len() as u64;
        state.record(StatementKind::Delete, table, ids);
        Ok(affected)
    }

    fn select_by_id_now<T: Record>(&self, id: i64) -> Result<Option<T>> {
        let mut state = self.lock()?;
        let table = T::TABLE_NAME;
        let value = state
            .tables
            .get(table)
            .and_then(|rows| rows.get(&id))
            .cloned();
        let ids = if value.is_some() { vec![id] } else { Vec::new() };
        state.record(StatementKind::Select, table, ids);
        value.map(decode).transpose()
    }

    fn select_all_now<T: Record>(&self) -> Result<Vec<T>> {
        let mut state = self.lock()?;
        let table = T::TABLE_NAME;
        let rows: Vec<(i64, serde_json::Value)> = state
            .tables
            .get(table)
            .map(|rows| rows.iter().map(|(id, v)| (*id, v.clone())).collect())
            .unwrap_or_default();
        state.record(
            StatementKind::Select,
            table,
            rows.iter().map(|(id, _)| *id).collect(),
        );
        rows.into_iter().map(|(_, value)| decode(value)).collect()
    }
}

fn encode<T: Record>(record: &T) -> Result<serde_json::Value> {
    serde_json::to_value(record).map_err(|e| Error::Serialization(e.to_string()))
}

fn decode<T: Record>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Serialization(e.to_string()))
}

impl Connection for MemoryConnection {
    fn insert<T: Record>(
        &self,
        _cx: &Cx,
        records: &mut [T],
    ) -> impl std::future::Future<Output = Outcome<u64, Error>> + Send {
        let outcome = lift(self.insert_now(records));
        async move { outcome }
    }

    fn update<T: Record>(
        &self,
        _cx: &Cx,
        records: &[T],
    ) -> impl std::future::Future<Output = Outcome<u64, Error>> + Send {
        let outcome = lift(self.update_now(records));
        async move { outcome }
    }

    fn delete<T: Record>(
        &self,
        _cx: &Cx,
        records: &[T],
    ) -> impl std::future::Future<Output = Outcome<u64, Error>> + Send {
        let outcome = lift(self.delete_now(records));
        async move { outcome }
    }

    fn select_by_id<T: Record>(
        &self,
        _cx: &Cx,
        id: i64,
    ) -> impl std::future::Future<Output = Outcome<Option<T>, Error>> + Send {
        let outcome = lift(self.select_by_id_now(id));
        async move { outcome }
    }

    fn select_all<T: Record>(
        &self,
        _cx: &Cx,
    ) -> impl std::future::Future<Output = Outcome<Vec<T>, Error>> + Send {
        let outcome = lift(self.select_all_now());
        async move { outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: Option<i64>,
        body: String,
    }

    impl Record for Note {
        const TABLE_NAME: &'static str = "notes";

        fn id(&self) -> Option<i64> {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }
    }

    fn note(body: &str) -> Note {
        Note {
            id: None,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let conn = MemoryConnection::new();
        let mut notes = vec![note("a"), note("b")];
        assert_eq!(conn.insert_now(&mut notes).unwrap(), 2);
        assert_eq!(notes[0].id, Some(1));
        assert_eq!(notes[1].id, Some(2));

        let mut more = vec![note("c")];
        conn.insert_now(&mut more).unwrap();
        assert_eq!(more[0].id, Some(3));
        assert_eq!(conn.row_count("notes").unwrap(), 3);
    }

    #[test]
    fn test_insert_rejects_duplicate_key() {
        let conn = MemoryConnection::new();
        let mut first = vec![Note {
            id: Some(5),
            body: "x".into(),
        }];
        conn.insert_now(&mut first).unwrap();

        let mut again = vec![Note {
            id: Some(5),
            body: "y".into(),
        }];
        let err = conn.insert_now(&mut again).unwrap_err();
        assert!(err.to_string().contains("duplicate primary key 5"));
        assert_eq!(conn.stored::<Note>(5).unwrap().unwrap().body, "x");

        // Explicit ids move the sequence forward.
        let mut next = vec![note("z")];
        conn.insert_now(&mut next).unwrap();
        assert_eq!(next[0].id, Some(6));
    }

    #[test]
    fn test_failed_insert_leaves_ids_unassigned() {
        let conn = MemoryConnection::new();
        let mut seed = vec![Note {
            id: Some(2),
            body: "kept".into(),
        }];
        conn.insert_now(&mut seed).unwrap();

        let mut batch = vec![
            note("fresh"),
            Note {
                id: Some(2),
                body: "clash".into(),
            },
        ];
        let err = conn.insert_now(&mut batch).unwrap_err();
        assert!(err.to_string().contains("duplicate primary key 2"));
        assert_eq!(batch[0].id, None);
        assert_eq!(batch[1].id, Some(2));
        assert_eq!(conn.row_count("notes").unwrap(), 1);

        // The failed batch did not consume any ids.
        let mut next = vec![note("later")];
        conn.insert_now(&mut next).unwrap();
        assert_eq!(next[0].id, Some(3));
    }

    #[test]
    fn test_update_and_delete_count_existing_rows() {
        let conn = MemoryConnection::new();
        let mut notes = vec![note("a"), note("b")];
        conn.insert_now(&mut notes).unwrap();

        notes[0].body = "changed".into();
        let ghost = Note {
            id: Some(99),
            body: "ghost".into(),
        };
        assert_eq!(conn.update_now(&[notes[0].clone(), ghost.clone()]).unwrap(), 1);
        assert_eq!(conn.stored::<Note>(1).unwrap().unwrap().body, "changed");

        assert_eq!(conn.delete_now(&[notes[1].clone(), ghost]).unwrap(), 1);
        assert!(conn.stored::<Note>(2).unwrap().is_none());
    }

    #[test]
    fn test_update_requires_id() {
        let conn = MemoryConnection::new();
        let err = conn.update_now(&[note("new")]).unwrap_err();
        assert!(matches!(err, Error::MissingId { table: "notes" }));
    }

    #[test]
    fn test_select_all_in_key_order_and_journal() {
        let conn = MemoryConnection::new();
        let mut notes = vec![note("a"), note("b"), note("c")];
        conn.insert_now(&mut notes).unwrap();
        conn.clear_journal().unwrap();

        let all: Vec<Note> = conn.select_all_now().unwrap();
        let bodies: Vec<&str> = all.iter().map(|n| n.body.as_str()).collect();
        assert_eq!(bodies, vec!["a", "b", "c"]);

        let missing: Option<Note> = conn.select_by_id_now(42).unwrap();
        assert!(missing.is_none());

        assert_eq!(
            conn.journal().unwrap(),
            vec![
                Statement {
                    kind: StatementKind::Select,
                    table: "notes",
                    ids: vec![1, 2, 3],
                },
                Statement {
                    kind: StatementKind::Select,
                    table: "notes",
                    ids: vec![],
                },
            ]
        );
    }
}
