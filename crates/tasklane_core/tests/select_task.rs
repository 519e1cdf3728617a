use rusqlite::{params, Connection};
use std::cell::RefCell;
use std::time::Duration;
use tasklane_core::db::{open_db, open_db_in_memory};
use tasklane_core::{
    AssignmentError, AssignmentRepository, AssignmentService, ClientHub, ClientMessage,
    ForbiddenReason, MessageKind, NotificationChannel, NotifyError, NotifyResult,
    SqliteAssignmentRepository, UserId,
};

const OWNER: i64 = 1;
const WORKER: i64 = 7;
const TASK_A: i64 = 10;
const TASK_B: i64 = 11;
const TASK_C: i64 = 12;

/// Seeds user 7 with an active assignment on task 10 and an inactive one on
/// task 11; task 12 exists but is not assigned to user 7.
fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    conn
}

fn seed(conn: &Connection) {
    conn.execute_batch(
        "INSERT INTO users (id, name, email) VALUES
            (1, 'Owner', 'owner@example.com'),
            (7, 'Grace', 'grace@example.com');
         INSERT INTO tasks (id, description, owner) VALUES
            (10, 'Fix login page', 1),
            (11, 'Write release notes', 1),
            (12, 'Plan offsite', 1);
         INSERT INTO assignments (task, user, active) VALUES
            (10, 7, 1),
            (11, 7, 0);",
    )
    .unwrap();
}

fn is_active(conn: &Connection, user: i64, task: i64) -> bool {
    let active: i64 = conn
        .query_row(
            "SELECT active FROM assignments WHERE user = ?1 AND task = ?2;",
            params![user, task],
            |row| row.get(0),
        )
        .unwrap();
    active == 1
}

#[derive(Default)]
struct RecordingChannel {
    broadcasts: RefCell<Vec<ClientMessage>>,
    logged: RefCell<Vec<(UserId, ClientMessage)>>,
}

impl NotificationChannel for RecordingChannel {
    fn broadcast(&self, message: &ClientMessage) -> NotifyResult<()> {
        self.broadcasts.borrow_mut().push(message.clone());
        Ok(())
    }

    fn append_log(&self, user_id: UserId, message: &ClientMessage) -> NotifyResult<()> {
        self.logged.borrow_mut().push((user_id, message.clone()));
        Ok(())
    }
}

struct FailingChannel;

impl NotificationChannel for FailingChannel {
    fn broadcast(&self, _message: &ClientMessage) -> NotifyResult<()> {
        Err(NotifyError::Codec(
            serde_json::from_str::<ClientMessage>("{").unwrap_err(),
        ))
    }

    fn append_log(&self, _user_id: UserId, _message: &ClientMessage) -> NotifyResult<()> {
        Err(NotifyError::Codec(
            serde_json::from_str::<ClientMessage>("{").unwrap_err(),
        ))
    }
}

#[test]
fn selecting_switches_the_active_assignment_and_notifies_once() {
    let conn = setup();
    let channel = RecordingChannel::default();
    let service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), &channel);

    service.select_task(WORKER, TASK_B).unwrap();

    assert!(!is_active(&conn, WORKER, TASK_A));
    assert!(is_active(&conn, WORKER, TASK_B));
    assert_eq!(service.active_task(WORKER).unwrap(), Some(TASK_B));

    let broadcasts = channel.broadcasts.borrow();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].kind, MessageKind::Update);
    assert_eq!(broadcasts[0].user_id, WORKER);
    assert_eq!(broadcasts[0].user_name, "Grace");
    assert_eq!(broadcasts[0].task_id, TASK_B);
    assert_eq!(broadcasts[0].task_description, "Write release notes");

    let logged = channel.logged.borrow();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].0, WORKER);
    assert_eq!(logged[0].1.kind, MessageKind::Login);
    assert_eq!(logged[0].1.task_id, TASK_B);
}

#[test]
fn selecting_unassigned_task_is_forbidden_and_rolls_back() {
    let conn = setup();
    let channel = RecordingChannel::default();
    let service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), &channel);

    let err = service.select_task(WORKER, TASK_C).unwrap_err();
    assert!(matches!(
        err,
        AssignmentError::Forbidden {
            task_id: TASK_C,
            reason: ForbiddenReason::NotAssigned,
        }
    ));

    assert!(is_active(&conn, WORKER, TASK_A));
    assert!(!is_active(&conn, WORKER, TASK_B));
    assert!(channel.broadcasts.borrow().is_empty());
    assert!(channel.logged.borrow().is_empty());
}

#[test]
fn selecting_missing_task_is_not_found() {
    let conn = setup();
    let channel = RecordingChannel::default();
    let service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), &channel);

    let err = service.select_task(WORKER, 404).unwrap_err();
    assert!(matches!(err, AssignmentError::NotFound(404)));
    assert!(is_active(&conn, WORKER, TASK_A));
    assert!(channel.broadcasts.borrow().is_empty());
}

#[test]
fn reselecting_the_active_task_keeps_a_single_active_row() {
    let conn = setup();
    let channel = RecordingChannel::default();
    let service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), &channel);

    service.select_task(WORKER, TASK_A).unwrap();
    service.select_task(WORKER, TASK_B).unwrap();
    service.select_task(WORKER, TASK_A).unwrap();

    let active_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM assignments WHERE user = ?1 AND active = 1;",
            [WORKER],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(active_rows, 1);
    assert_eq!(service.active_task(WORKER).unwrap(), Some(TASK_A));
    assert_eq!(channel.broadcasts.borrow().len(), 3);
}

#[test]
fn selection_only_touches_the_selecting_users_rows() {
    let conn = setup();
    conn.execute_batch(
        "INSERT INTO users (id, name, email) VALUES (8, 'Linus', 'linus@example.com');
         INSERT INTO assignments (task, user, active) VALUES (10, 8, 1), (11, 8, 0);",
    )
    .unwrap();
    let channel = RecordingChannel::default();
    let service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), &channel);

    service.select_task(WORKER, TASK_B).unwrap();

    assert!(is_active(&conn, 8, TASK_A));
    assert!(!is_active(&conn, 8, TASK_B));
}

#[test]
fn notification_failure_does_not_undo_a_committed_selection() {
    let conn = setup();
    let service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), FailingChannel);

    service.select_task(WORKER, TASK_B).unwrap();
    assert!(is_active(&conn, WORKER, TASK_B));
}

#[test]
fn selection_waits_out_a_competing_writer_instead_of_interleaving() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasklane.db");
    let holder = open_db(&path).unwrap();
    seed(&holder);

    let conn = open_db(&path).unwrap();
    conn.busy_timeout(Duration::from_millis(50)).unwrap();
    let channel = RecordingChannel::default();
    let service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), &channel);

    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();
    let err = service.select_task(WORKER, TASK_B).unwrap_err();
    assert!(matches!(err, AssignmentError::Persistence(_)));
    assert!(channel.broadcasts.borrow().is_empty());
    assert!(channel.logged.borrow().is_empty());
    assert!(is_active(&holder, WORKER, TASK_A));
    assert!(!is_active(&holder, WORKER, TASK_B));
    holder.execute_batch("COMMIT;").unwrap();

    service.select_task(WORKER, TASK_B).unwrap();
    assert!(!is_active(&holder, WORKER, TASK_A));
    assert!(is_active(&holder, WORKER, TASK_B));
    assert_eq!(channel.broadcasts.borrow().len(), 1);
}

#[test]
fn failure_after_deactivation_rolls_back_the_whole_selection() {
    let conn = setup();
    conn.execute_batch(
        "CREATE TRIGGER reject_activation
         BEFORE UPDATE OF active ON assignments
         WHEN NEW.active = 1
         BEGIN
             SELECT RAISE(ABORT, 'activation rejected');
         END;",
    )
    .unwrap();
    let channel = RecordingChannel::default();
    let service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), &channel);

    let err = service.select_task(WORKER, TASK_B).unwrap_err();
    assert!(matches!(err, AssignmentError::ConstraintViolation(_)));

    assert!(is_active(&conn, WORKER, TASK_A));
    assert!(!is_active(&conn, WORKER, TASK_B));
    assert!(channel.broadcasts.borrow().is_empty());
    assert!(channel.logged.borrow().is_empty());
}

#[test]
fn hub_delivers_update_to_subscribers_and_logs_login() {
    let conn = setup();
    let hub = ClientHub::with_default_capacity(&conn).unwrap();
    let mut receiver = hub.subscribe();
    let service = AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), &hub);

    service.select_task(WORKER, TASK_B).unwrap();

    let delivered = receiver.try_recv().unwrap();
    assert_eq!(delivered.kind, MessageKind::Update);
    assert_eq!(delivered.task_id, TASK_B);
    assert!(receiver.try_recv().is_err());

    let logged = hub.logged_messages(WORKER).unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].kind, MessageKind::Login);
    assert_eq!(logged[0].task_description, "Write release notes");
}

#[test]
fn activation_outcomes_are_reported_by_the_repository() {
    let conn = setup();
    let repo = SqliteAssignmentRepository::try_new(&conn).unwrap();

    assert_eq!(
        repo.activate_assignment(WORKER, 404).unwrap(),
        tasklane_core::Activation::TaskMissing
    );
    assert_eq!(
        repo.activate_assignment(WORKER, TASK_C).unwrap(),
        tasklane_core::Activation::NotAssigned
    );
    assert!(matches!(
        repo.activate_assignment(WORKER, TASK_B).unwrap(),
        tasklane_core::Activation::Activated(summary) if summary.task_id == TASK_B
    ));

    let rows = repo.user_assignments(WORKER).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(!rows[0].active);
    assert!(rows[1].active);
}
