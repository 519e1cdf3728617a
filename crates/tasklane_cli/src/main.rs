//! Command-line driver for local smoke runs against a tasklane database.
//!
//! # Responsibility
//! - Map subcommands onto `tasklane_core` repositories and services.
//! - Print deterministic, line-oriented output.

use clap::{Parser, Subcommand};
use log::error;
use rusqlite::Connection;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tasklane_core::db::open_db;
use tasklane_core::{
    init_logging_from_config, AssignmentResult, AssignmentService, ClientHub, CoreConfig,
    SqliteAssignmentRepository, SqliteTaskRepository, SqliteUserRepository, TaskRepository,
    UserRepository,
};

#[derive(Parser, Debug)]
#[command(name = "tasklane")]
#[command(version, about = "Task assignment workflow", long_about = None)]
struct Cli {
    /// SQLite database file (overrides TASKLANE_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user
    AddUser { name: String, email: String },
    /// Create a task owned by a user
    AddTask { owner: i64, description: String },
    /// Assign a user to a task
    Assign {
        user: i64,
        task: i64,
        #[arg(long)]
        owner: i64,
    },
    /// List users assigned to a task
    List {
        task: i64,
        #[arg(long)]
        owner: i64,
    },
    /// Remove a user from a task
    Remove {
        task: i64,
        user: i64,
        #[arg(long)]
        owner: i64,
    },
    /// Assign every unassigned task of an owner to the least loaded users
    Balance { owner: i64 },
    /// Mark a task as the user's active task
    Select { user: i64, task: i64 },
    /// Show a user's active task
    Active { user: i64 },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = CoreConfig::from_env();
    if let Some(db) = cli.db.clone() {
        config.db_path = db;
    }

    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }

    match run(&config, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &CoreConfig, command: Command) -> Result<(), Box<dyn Error>> {
    let conn = open_db(&config.db_path)?;

    match command {
        Command::AddUser { name, email } => {
            let user = SqliteUserRepository::try_new(&conn)?.create_user(&name, &email, None)?;
            println!("user id={} name={} email={}", user.id, user.name, user.email);
        }
        Command::AddTask { owner, description } => {
            let task = SqliteTaskRepository::try_new(&conn)?.create_task(&description, owner)?;
            println!(
                "task id={} owner={} description={}",
                task.id, task.owner, task.description
            );
        }
        Command::Assign { user, task, owner } => {
            with_service(&conn, |service| service.assign_task_to_user(user, task, owner))?;
            println!("assigned user={user} task={task}");
        }
        Command::List { task, owner } => {
            let users = with_service(&conn, |service| service.get_users_assigned(task, owner))?;
            for user in users {
                println!("user id={} name={} email={}", user.id, user.name, user.email);
            }
        }
        Command::Remove { task, user, owner } => {
            with_service(&conn, |service| service.remove_user(task, user, owner))?;
            println!("removed user={user} task={task}");
        }
        Command::Balance { owner } => {
            let report = with_service(&conn, |service| service.assign_balanced(owner))?;
            for assigned in &report.assigned {
                println!("assigned user={} task={}", assigned.user_id, assigned.task_id);
            }
            for failure in &report.failed {
                println!("failed task={} error={}", failure.task_id, failure.error);
            }
        }
        Command::Select { user, task } => {
            with_service(&conn, |service| service.select_task(user, task))?;
            println!("selected user={user} task={task}");
        }
        Command::Active { user } => {
            match with_service(&conn, |service| service.active_task(user))? {
                Some(task) => println!("active user={user} task={task}"),
                None => println!("active user={user} task=none"),
            }
        }
    }

    Ok(())
}

fn with_service<T>(
    conn: &Connection,
    f: impl FnOnce(
        &AssignmentService<SqliteAssignmentRepository<'_>, &ClientHub<'_>>,
    ) -> AssignmentResult<T>,
) -> Result<T, Box<dyn Error>> {
    let hub = ClientHub::with_default_capacity(conn)?;
    let service = AssignmentService::new(SqliteAssignmentRepository::try_new(conn)?, &hub);
    Ok(f(&service)?)
}
