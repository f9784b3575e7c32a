use asupersync::runtime::RuntimeBuilder;
use serde::{Deserialize, Serialize};

use modelhooks::prelude::*;
use modelhooks::{StatementKind, dispatch};

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

// ============================================================================
// Every capability, one marker field each
// ============================================================================

#[derive(Hooks, Debug, Clone, Default, Serialize, Deserialize)]
#[hooks(
    before_validate,
    before_save,
    before_create,
    before_update,
    before_destroy,
    after_save,
    after_create,
    after_update,
    after_destroy,
    after_find
)]
struct CallbacksUser {
    id: Option<i64>,
    before_s: String,
    before_c: String,
    before_u: String,
    before_d: String,
    before_v: String,
    after_s: String,
    after_c: String,
    after_u: String,
    after_d: String,
    after_f: String,
}

impl Record for CallbacksUser {
    const TABLE_NAME: &'static str = "callbacks_users";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl Validate for CallbacksUser {}

impl<S: ?Sized> BeforeValidate<S> for CallbacksUser {
    fn before_validate(&mut self, _session: &S) -> Result<()> {
        self.before_v = "BeforeValidate".to_string();
        Ok(())
    }
}

impl<S: ?Sized> BeforeSave<S> for CallbacksUser {
    fn before_save(&mut self, _session: &S) -> Result<()> {
        self.before_s = "BeforeSave".to_string();
        Ok(())
    }
}

impl<S: ?Sized> BeforeCreate<S> for CallbacksUser {
    fn before_create(&mut self, _session: &S) -> Result<()> {
        self.before_c = "BeforeCreate".to_string();
        Ok(())
    }
}

impl<S: ?Sized> BeforeUpdate<S> for CallbacksUser {
    fn before_update(&mut self, _session: &S) -> Result<()> {
        self.before_u = "BeforeUpdate".to_string();
        Ok(())
    }
}

impl<S: ?Sized> BeforeDestroy<S> for CallbacksUser {
    fn before_destroy(&mut self, _session: &S) -> Result<()> {
        self.before_d = "BeforeDestroy".to_string();
        Ok(())
    }
}

impl<S: ?Sized> AfterSave<S> for CallbacksUser {
    fn after_save(&mut self, _session: &S) -> Result<()> {
        self.after_s = "AfterSave".to_string();
        Ok(())
    }
}

impl<S: ?Sized> AfterCreate<S> for CallbacksUser {
    fn after_create(&mut self, _session: &S) -> Result<()> {
        self.after_c = "AfterCreate".to_string();
        Ok(())
    }
}

impl<S: ?Sized> AfterUpdate<S> for CallbacksUser {
    fn after_update(&mut self, _session: &S) -> Result<()> {
        self.after_u = "AfterUpdate".to_string();
        Ok(())
    }
}

impl<S: ?Sized> AfterDestroy<S> for CallbacksUser {
    fn after_destroy(&mut self, _session: &S) -> Result<()> {
        self.after_d = "AfterDestroy".to_string();
        Ok(())
    }
}

impl<S: ?Sized> AfterFind<S> for CallbacksUser {
    fn after_find(&mut self, _session: &S) -> Result<()> {
        self.after_f = "AfterFind".to_string();
        Ok(())
    }
}

fn marked_user() -> CallbacksUser {
    CallbacksUser {
        id: None,
        before_s: "BS".into(),
        before_c: "BC".into(),
        before_u: "BU".into(),
        before_d: "BD".into(),
        before_v: "BV".into(),
        after_s: "AS".into(),
        after_c: "AC".into(),
        after_u: "AU".into(),
        after_d: "AD".into(),
        after_f: "AF".into(),
    }
}

#[test]
fn callbacks_fire_through_the_lifecycle() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let session = Session::new(MemoryConnection::new());
    let mut user = marked_user();

    rt.block_on(async {
        unwrap_outcome(session.save(&cx, &mut user).await);

        assert_eq!(user.before_s, "BeforeSave");
        assert_eq!(user.before_c, "BeforeCreate");
        assert_eq!(user.after_s, "AfterSave");
        assert_eq!(user.after_c, "AfterCreate");
        assert_eq!(user.before_u, "BU");
        assert_eq!(user.after_u, "AU");

        unwrap_outcome(session.update(&cx, &mut user).await);

        assert_eq!(user.before_u, "BeforeUpdate");
        assert_eq!(user.after_u, "AfterUpdate");
        assert_eq!(user.before_d, "BD");
        assert_eq!(user.after_d, "AD");

        assert_eq!(user.after_f, "AF");
        let id = user.id.expect("id assigned on create");
        unwrap_outcome(session.find(&cx, &mut user, id).await);
        assert_eq!(user.after_f, "AfterFind");

        unwrap_outcome(session.destroy(&cx, &mut user).await);

        assert_eq!(user.before_d, "BeforeDestroy");
        assert_eq!(user.after_d, "AfterDestroy");

        let errors = unwrap_outcome(session.validate_and_save(&cx, &mut user).await);
        assert!(!errors.has_any());
        assert_eq!(user.before_v, "BeforeValidate");
    });
}

#[test]
fn before_hooks_run_before_the_insert() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let session = Session::new(MemoryConnection::new());
    let mut user = marked_user();

    rt.block_on(async {
        unwrap_outcome(session.create(&cx, &mut user).await);
    });

    // The stored row carries the before-hook markers but not the after-hook
    // ones: after hooks only touch the in-memory value.
    let stored: CallbacksUser = session
        .connection()
        .stored(1)
        .expect("read stored row")
        .expect("row exists");
    assert_eq!(stored.before_s, "BeforeSave");
    assert_eq!(stored.before_c, "BeforeCreate");
    assert_eq!(stored.after_c, "AC");
    assert_eq!(stored.after_s, "AS");

    let journal = session.connection().journal().expect("journal");
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].kind, StatementKind::Insert);
}

#[test]
fn callbacks_on_slice() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let session = Session::new(MemoryConnection::new());

    rt.block_on(async {
        for _ in 0..2 {
            unwrap_outcome(session.create(&cx, &mut CallbacksUser::default()).await);
        }

        let mut users: Vec<CallbacksUser> = Vec::new();
        unwrap_outcome(session.all(&cx, &mut users).await);

        assert_eq!(users.len(), 2);
        for user in &users {
            assert_eq!(user.after_f, "AfterFind");
        }
    });
}

// ============================================================================
// AfterFind on plain and composite sequences
// ============================================================================

#[derive(Hooks, Debug, Clone, Default)]
struct UnAfterFindableModel {
    id: i64,
    after: String,
}

#[derive(Hooks, Debug, Clone, Default)]
#[hooks(after_find)]
struct AfterFindableModel {
    base: UnAfterFindableModel,
}

impl<S: ?Sized> AfterFind<S> for AfterFindableModel {
    fn after_find(&mut self, _session: &S) -> Result<()> {
        self.base.after = make_after_string(self.base.id);
        Ok(())
    }
}

fn make_after_string(id: i64) -> String {
    format!("after {id}")
}

/// Stand-in session handle; the dispatcher never looks inside it.
struct FakeConn;

#[test]
fn after_find_sets_marker_only_on_findable_models() {
    let mut list: Vec<AfterFindableModel> = (1113..=1116)
        .map(|id| AfterFindableModel {
            base: UnAfterFindableModel {
                id,
                after: String::new(),
            },
        })
        .collect();
    dispatch(
        &mut Wrapped::new(list.as_mut_slice()),
        Capability::AfterFind,
        &FakeConn,
    )
    .expect("after_find succeeds");
    for item in &list {
        assert_eq!(item.base.after, make_after_string(item.base.id));
    }

    let mut plain: Vec<UnAfterFindableModel> = (1113..=1116)
        .map(|id| UnAfterFindableModel {
            id,
            after: String::new(),
        })
        .collect();
    dispatch(
        &mut Wrapped::new(plain.as_mut_slice()),
        Capability::AfterFind,
        &FakeConn,
    )
    .expect("absent hooks are not an error");
    for item in &plain {
        assert_eq!(item.after, "");
    }
}

#[derive(Hooks, Debug, Clone, Default)]
#[hooks(after_find)]
struct FindableBase {
    id: i64,
    after: String,
}

impl<S: ?Sized> AfterFind<S> for FindableBase {
    fn after_find(&mut self, _session: &S) -> Result<()> {
        self.after = make_after_string(self.id);
        Ok(())
    }
}

#[derive(Hooks, Debug, Clone, Default)]
struct Promoted {
    #[hooks(embed)]
    base: FindableBase,
}

#[test]
fn after_find_promoted_from_embedded_field() {
    let mut list: Vec<Promoted> = (1113..=1116)
        .map(|id| Promoted {
            base: FindableBase {
                id,
                after: String::new(),
            },
        })
        .collect();
    dispatch(
        &mut Wrapped::new(list.as_mut_slice()),
        Capability::AfterFind,
        &FakeConn,
    )
    .expect("after_find succeeds");
    for item in &list {
        assert_eq!(item.base.after, format!("after {}", item.base.id));
    }
}

// ============================================================================
// Hooks reading through the session handle
// ============================================================================

#[derive(Hooks, Debug, Clone, Default, Serialize, Deserialize)]
#[hooks(before_create)]
struct Ticket {
    id: Option<i64>,
    number: usize,
}

impl Record for Ticket {
    const TABLE_NAME: &'static str = "tickets";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl BeforeCreate<Session<MemoryConnection>> for Ticket {
    fn before_create(&mut self, session: &Session<MemoryConnection>) -> Result<()> {
        self.number = session.connection().row_count(Self::TABLE_NAME)? + 100;
        Ok(())
    }
}

#[test]
fn hooks_receive_the_session() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let session = Session::new(MemoryConnection::new());

    rt.block_on(async {
        let mut first = Ticket::default();
        unwrap_outcome(session.create(&cx, &mut first).await);
        let mut second = Ticket::default();
        unwrap_outcome(session.create(&cx, &mut second).await);

        assert_eq!(first.number, 100);
        assert_eq!(second.number, 101);
    });
}

// ============================================================================
// Destroy and failure paths
// ============================================================================

#[derive(Hooks, Debug, Clone, Default, Serialize, Deserialize)]
#[hooks(before_destroy, after_update)]
struct Locked {
    id: Option<i64>,
    locked: bool,
}

impl Record for Locked {
    const TABLE_NAME: &'static str = "locked";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl<S: ?Sized> BeforeDestroy<S> for Locked {
    fn before_destroy(&mut self, _session: &S) -> Result<()> {
        if self.locked {
            return Err(Error::custom("record is locked"));
        }
        Ok(())
    }
}

impl<S: ?Sized> AfterUpdate<S> for Locked {
    fn after_update(&mut self, _session: &S) -> Result<()> {
        Err(Error::custom("audit log unavailable"))
    }
}

#[test]
fn failing_before_destroy_keeps_the_row() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let session = Session::new(MemoryConnection::new());
    let mut rows = vec![
        Locked::default(),
        Locked {
            id: None,
            locked: true,
        },
    ];

    rt.block_on(async {
        unwrap_outcome(session.create(&cx, rows.as_mut_slice()).await);

        match session.destroy(&cx, rows.as_mut_slice()).await {
            Outcome::Err(e) => {
                let failure = e.as_hook_failure().expect("hook failure");
                assert_eq!(failure.capability(), Capability::BeforeDestroy);
                assert_eq!(failure.index(), Some(1));
                assert_eq!(failure.inner().to_string(), "record is locked");
            }
            _ => panic!("destroy should fail"),
        }
    });

    assert_eq!(
        session.connection().row_count(Locked::TABLE_NAME).expect("count"),
        2
    );
}

#[test]
fn failing_after_update_reports_after_commit() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let session = Session::new(MemoryConnection::new());
    let mut row = Locked::default();

    rt.block_on(async {
        unwrap_outcome(session.create(&cx, &mut row).await);
        row.locked = true;

        match session.update(&cx, &mut row).await {
            Outcome::Err(e) => {
                assert_eq!(e.to_string(), "AfterUpdate hook failed: audit log unavailable");
            }
            _ => panic!("update should report the after hook"),
        }
    });

    let stored: Locked = session
        .connection()
        .stored(1)
        .expect("read stored row")
        .expect("row exists");
    assert!(stored.locked);
}
