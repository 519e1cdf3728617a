use rusqlite::Connection;
use tasklane_core::db::open_db_in_memory;
use tasklane_core::{
    AssignmentError, AssignmentRepository, AssignmentService, BalancedAssignment, ClientHub,
    SqliteAssignmentRepository,
};

fn count_for(conn: &Connection, user: i64) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM assignments WHERE user = ?1;",
        [user],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn unassigned_tasks_go_to_least_loaded_users_lowest_id_first() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO users (id, name, email) VALUES
            (1, 'Owner', 'owner@example.com'),
            (2, 'Busy', 'busy@example.com'),
            (3, 'Idle', 'idle@example.com');
         INSERT INTO tasks (id, description, owner) VALUES
            (10, 'already assigned', 1),
            (11, 'first free', 1),
            (12, 'second free', 1),
            (13, 'third free', 1),
            (20, 'someone else''s task', 2);
         INSERT INTO assignments (task, user) VALUES (10, 2), (10, 1);",
    )
    .unwrap();
    let hub = ClientHub::with_default_capacity(&conn).unwrap();
    let service = AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), &hub);

    let report = service.assign_balanced(1).unwrap();

    // Loads before the run: owner=1, busy=1, idle=0.
    assert_eq!(
        report.assigned,
        vec![
            BalancedAssignment {
                task_id: 11,
                user_id: 3
            },
            BalancedAssignment {
                task_id: 12,
                user_id: 1
            },
            BalancedAssignment {
                task_id: 13,
                user_id: 2
            },
        ]
    );
    assert!(report.failed.is_empty());
    assert_eq!(report.attempted(), 3);

    assert_eq!(count_for(&conn, 1), 2);
    assert_eq!(count_for(&conn, 2), 2);
    assert_eq!(count_for(&conn, 3), 1);

    let untouched: i64 = conn
        .query_row("SELECT COUNT(*) FROM assignments WHERE task = 20;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(untouched, 0);
}

#[test]
fn second_run_has_nothing_left_to_assign() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO users (id, name, email) VALUES (1, 'Owner', 'owner@example.com');
         INSERT INTO tasks (id, description, owner) VALUES (10, 'solo', 1);",
    )
    .unwrap();
    let hub = ClientHub::with_default_capacity(&conn).unwrap();
    let service = AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), &hub);

    assert_eq!(service.assign_balanced(1).unwrap().assigned.len(), 1);
    let again = service.assign_balanced(1).unwrap();
    assert_eq!(again.attempted(), 0);
}

#[test]
fn owner_without_tasks_gets_an_empty_report() {
    let conn = open_db_in_memory().unwrap();
    let hub = ClientHub::with_default_capacity(&conn).unwrap();
    let service = AssignmentService::new(SqliteAssignmentRepository::try_new(&conn).unwrap(), &hub);

    let report = service.assign_balanced(42).unwrap();
    assert!(report.assigned.is_empty());
    assert!(report.failed.is_empty());
}

#[test]
fn least_assigned_user_counts_users_without_assignments() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAssignmentRepository::try_new(&conn).unwrap();
    assert_eq!(repo.least_assigned_user().unwrap(), None);

    conn.execute_batch(
        "INSERT INTO users (id, name, email) VALUES
            (4, 'Four', 'four@example.com'),
            (9, 'Nine', 'nine@example.com');
         INSERT INTO tasks (id, description, owner) VALUES (1, 'one', 4);
         INSERT INTO assignments (task, user) VALUES (1, 4);",
    )
    .unwrap();
    assert_eq!(repo.least_assigned_user().unwrap(), Some(9));
}

/// Repository double that reports unassigned tasks but has no users, so every
/// per-task attempt fails and the run must still visit each task.
struct NoUsersRepository;

impl AssignmentRepository for NoUsersRepository {
    fn task_owner(&self, _task_id: i64) -> tasklane_core::RepoResult<Option<i64>> {
        Ok(Some(1))
    }
    fn insert_assignment(&self, _task_id: i64, _user_id: i64) -> tasklane_core::RepoResult<()> {
        unreachable!("no user is ever picked")
    }
    fn list_assignees(&self, _task_id: i64) -> tasklane_core::RepoResult<Vec<tasklane_core::User>> {
        Ok(Vec::new())
    }
    fn delete_assignment(&self, _task_id: i64, _user_id: i64) -> tasklane_core::RepoResult<usize> {
        Ok(0)
    }
    fn unassigned_tasks(&self, _owner: i64) -> tasklane_core::RepoResult<Vec<i64>> {
        Ok(vec![3, 4])
    }
    fn least_assigned_user(&self) -> tasklane_core::RepoResult<Option<i64>> {
        Ok(None)
    }
    fn activate_assignment(
        &self,
        _user_id: i64,
        _task_id: i64,
    ) -> tasklane_core::RepoResult<tasklane_core::Activation> {
        Ok(tasklane_core::Activation::TaskMissing)
    }
    fn active_task(&self, _user_id: i64) -> tasklane_core::RepoResult<Option<i64>> {
        Ok(None)
    }
    fn user_assignments(
        &self,
        _user_id: i64,
    ) -> tasklane_core::RepoResult<Vec<tasklane_core::Assignment>> {
        Ok(Vec::new())
    }
}

#[test]
fn per_task_failures_are_reported_and_do_not_stop_the_run() {
    let conn = open_db_in_memory().unwrap();
    let hub = ClientHub::with_default_capacity(&conn).unwrap();
    let service = AssignmentService::new(NoUsersRepository, &hub);

    let report = service.assign_balanced(1).unwrap();
    assert!(report.assigned.is_empty());
    let failed: Vec<i64> = report.failed.iter().map(|failure| failure.task_id).collect();
    assert_eq!(failed, vec![3, 4]);
    assert!(report
        .failed
        .iter()
        .all(|failure| matches!(failure.error, AssignmentError::NoCandidateUser(_))));
}
