//! Command-line driver for the roster core.
//!
//! # Responsibility
//! - Open the roster database and run one service call per invocation.
//! - Read aggregates as JSON input and print results as JSON.

use clap::{Args, Parser, Subcommand};
use log::info;
use roster_core::db::open_db;
use roster_core::{
    default_log_level, init_logging, SqliteStudentRepository, StudentDetail, StudentId,
    StudentSearchCondition, StudentService,
};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "roster", about = "Manage students, courses and application statuses", version)]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "ROSTER_DB", default_value = "roster.sqlite3")]
    db: PathBuf,
    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, env = "ROSTER_LOG_DIR")]
    log_dir: Option<String>,
    /// Log level (trace|debug|info|warn|error)
    #[arg(long, env = "ROSTER_LOG_LEVEL")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every active student with courses and statuses
    List,
    /// Show one student with courses and statuses
    Profile {
        /// Student id (UUID)
        id: StudentId,
    },
    /// Register a student from a JSON detail file
    Register {
        /// Path to a JSON `StudentDetail`
        file: PathBuf,
    },
    /// Update a student from a JSON detail file
    Update {
        /// Path to a JSON `StudentDetail` with existing ids
        file: PathBuf,
    },
    /// Search students by optional filters
    Search(SearchArgs),
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    area: Option<String>,
    /// Match only deleted (true) or only active (false) students
    #[arg(long)]
    deleted: Option<bool>,
    #[arg(long)]
    min_age: Option<u32>,
    #[arg(long)]
    max_age: Option<u32>,
    #[arg(long)]
    sex: Option<String>,
    #[arg(long)]
    course_name: Option<String>,
    /// Application status label
    #[arg(long)]
    status: Option<String>,
}

impl From<SearchArgs> for StudentSearchCondition {
    fn from(args: SearchArgs) -> Self {
        Self {
            name: args.name,
            email: args.email,
            area: args.area,
            deleted: args.deleted,
            min_age: args.min_age,
            max_age: args.max_age,
            sex: args.sex,
            course_name: args.course_name,
            status: args.status,
        }
    }
}

fn main() {
    if let Err(err) = run(Cli::parse()) {
        eprintln!("roster error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    let conn = open_db(&cli.db)?;
    let service = StudentService::new(SqliteStudentRepository::try_new(&conn)?);
    info!(
        "event=cli_command module=cli status=start command={}",
        command_name(&cli.command)
    );

    let output = match cli.command {
        Command::List => serde_json::to_string_pretty(&service.list_details()?)?,
        Command::Profile { id } => serde_json::to_string_pretty(&service.get_profile(id)?)?,
        Command::Register { file } => {
            let detail = read_detail(&file)?;
            serde_json::to_string_pretty(&service.register(detail)?)?
        }
        Command::Update { file } => {
            let detail = read_detail(&file)?;
            service.update(&detail)?;
            serde_json::to_string_pretty(&detail)?
        }
        Command::Search(args) => {
            let condition = StudentSearchCondition::from(args);
            serde_json::to_string_pretty(&service.search(&condition)?)?
        }
    };

    println!("{output}");
    Ok(())
}

fn read_detail(path: &Path) -> Result<StudentDetail, Box<dyn Error>> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed to read `{}`: {err}", path.display()))?;
    Ok(serde_json::from_str(&raw)?)
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::List => "list",
        Command::Profile { .. } => "profile",
        Command::Register { .. } => "register",
        Command::Update { .. } => "update",
        Command::Search(_) => "search",
    }
}
