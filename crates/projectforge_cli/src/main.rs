//! `projectforge` admin CLI.
//!
//! # Responsibility
//! - Create/migrate the store and print dashboard views from the terminal.
//! - Resolve configuration from flags, environment, then platform defaults.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use log::info;
use projectforge_core::{
    core_version, default_log_level, init_logging, open_db, ping, ActivityLogger, Connection,
    EntityId, ReportService, SqliteActivityLog, SqliteReportRepository, TaskFilter, TaskStatus,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "projectforge")]
#[command(about = "Project and task tracking store administration")]
#[command(version)]
struct Cli {
    /// SQLite store file
    #[arg(long, global = true, env = "PROJECTFORGE_DB")]
    db: Option<PathBuf>,

    /// Directory for rolling log files
    #[arg(long, global = true, env = "PROJECTFORGE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// trace, debug, info, warn or error
    #[arg(long, global = true, env = "PROJECTFORGE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check core linkage
    Ping,
    /// Create or migrate the store
    Init,
    /// Timeline window, member progress, reminders and recent activity
    Dashboard,
    /// Recent activity, optionally for one project
    Activity {
        #[arg(long)]
        project: Option<EntityId>,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Tasks filtered by status and/or assignee
    Tasks {
        #[arg(long = "status")]
        statuses: Vec<TaskStatus>,
        #[arg(long = "assignee")]
        assignees: Vec<EntityId>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    start_logging(&cli);

    match cli.command {
        Commands::Ping => {
            println!("projectforge_core ping={}", ping());
            println!("projectforge_core version={}", core_version());
        }
        Commands::Init => {
            let path = resolve_db_path(cli.db)?;
            open_store(&path)?;
            println!("store ready at {}", path.display());
        }
        Commands::Dashboard => {
            let conn = open_store(&resolve_db_path(cli.db)?)?;
            print_dashboard(&conn)?;
        }
        Commands::Activity { project, limit } => {
            let conn = open_store(&resolve_db_path(cli.db)?)?;
            let feed = SqliteActivityLog::try_new(&conn)?;
            let entries = match project {
                Some(project_id) => feed.for_project(project_id, limit)?,
                None => feed.recent(limit)?,
            };
            for entry in entries {
                println!(
                    "{}  {:<28}  {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.project_name.as_deref().unwrap_or("-"),
                    entry.description
                );
            }
        }
        Commands::Tasks {
            statuses,
            assignees,
        } => {
            let conn = open_store(&resolve_db_path(cli.db)?)?;
            let reports = ReportService::new(SqliteReportRepository::try_new(&conn)?);
            let tasks = reports.filter_tasks(&TaskFilter {
                statuses,
                assignees,
            })?;
            for task in tasks {
                println!(
                    "#{:<5} {:<12} {}",
                    task.id.unwrap_or_default(),
                    task.status.as_str(),
                    task.name
                );
            }
        }
    }

    Ok(())
}

fn print_dashboard(conn: &Connection) -> Result<()> {
    let today = Local::now().date_naive();
    let reports = ReportService::new(SqliteReportRepository::try_new(conn)?);

    let window = reports.display_window(today)?;
    println!("Timeline {} .. {}", window.start, window.end);
    for item in reports.timeline(window)? {
        println!(
            "  {} .. {}  {:<32} {}",
            item.start_date,
            item.end_date,
            item.name,
            item.assignee_label()
        );
    }

    println!("\nProgress");
    for bucket in reports.member_progress()? {
        println!(
            "  {:<28} {:>3}/{:<3} {:>5.1}%",
            bucket.name,
            bucket.completed,
            bucket.total,
            bucket.percent_completed()
        );
    }

    println!("\nReminders");
    for reminder in reports.triaged_reminders(today)? {
        let marker = if reminder.followed_up { "x" } else { " " };
        println!(
            "  [{marker}] {}  {}: {}",
            reminder.reminder_date, reminder.task_name, reminder.note
        );
    }

    println!("\nRecent activity");
    for entry in SqliteActivityLog::try_new(conn)?.recent(10)? {
        println!(
            "  {}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.description
        );
    }
    Ok(())
}

fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let conn = open_db(path).with_context(|| format!("failed to open {}", path.display()))?;
    info!("event=cli_store_ready module=cli status=ok");
    Ok(conn)
}

fn resolve_db_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    let dirs = project_dirs()?;
    Ok(dirs.data_dir().join("projectforge.db"))
}

/// Logging is optional for the CLI; failures are reported and ignored.
fn start_logging(cli: &Cli) {
    let log_dir = match cli.log_dir.clone() {
        Some(dir) => dir,
        None => match project_dirs() {
            Ok(dirs) => dirs.data_local_dir().join("logs"),
            Err(_) => return,
        },
    };
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(err) = init_logging(level, &log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "projectforge").context("no home directory to place the store in")
}
