//! Weft CLI — inspect and manage persisted dependent-value job records.
//!
//! Usage:
//!   weft jobs list [--workspace id] [--change-set id] [--db path]
//!   weft jobs show <root> [--workspace id] [--change-set id] [--db path]
//!   weft jobs create <root> ...
//!   weft jobs delete <root> ...

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use weft::{
    AttributeValueId, ChangeSetId, JobStore, OpenStore, SqliteStore, Visibility, WorkspaceId,
};

#[derive(Parser)]
#[command(
    name = "weft",
    version,
    about = "Change-graph coordination engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and manage dependent-value job records
    Jobs {
        #[command(subcommand)]
        action: JobsAction,
        /// Workspace scope
        #[arg(long, global = true, default_value = "default")]
        workspace: String,
        /// Change set scope
        #[arg(long = "change-set", global = true, default_value = "default")]
        change_set: String,
        /// Path to SQLite database file
        #[arg(long, global = true)]
        db: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum JobsAction {
    /// List job records in the scope
    List,
    /// Show one job record as JSON
    Show {
        /// Root attribute value id
        root: String,
    },
    /// Create an empty job record for a root
    Create {
        /// Root attribute value id
        root: String,
    },
    /// Delete a job record
    Delete {
        /// Root attribute value id
        root: String,
    },
}

/// Get the default database path (~/.local/share/weft/weft.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    let weft_dir = data_dir.join("weft");
    std::fs::create_dir_all(&weft_dir).ok();
    weft_dir.join("weft.db")
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteStore, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))
}

fn cmd_jobs_list(store: &SqliteStore, tenancy: &Visibility) -> i32 {
    let jobs = match store.list_jobs(tenancy) {
        Ok(jobs) => jobs,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if jobs.is_empty() {
        println!("No job records in scope {}.", tenancy);
        return 0;
    }
    println!(
        "{:<36}  {:>7}  {:>7}  {:>9}",
        "ROOT", "QUEUED", "RUNNING", "COMPLETED"
    );
    println!("{}", "-".repeat(66));
    for job in jobs {
        println!(
            "{:<36}  {:>7}  {:>7}  {:>9}",
            job.attribute_value_id,
            job.queued_dependent_value_ids.len(),
            job.running_dependent_value_ids.len(),
            job.completed_dependent_value_ids.len()
        );
    }
    0
}

fn cmd_jobs_show(store: &SqliteStore, tenancy: &Visibility, root: &str) -> i32 {
    let root = AttributeValueId::from_string(root);
    match store.load_job(tenancy, &root) {
        Ok(Some(record)) => match serde_json::to_string_pretty(&record) {
            Ok(json) => {
                println!("{}", json);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Ok(None) => {
            eprintln!("Error: no job record for root '{}'", root);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_jobs_create(store: &SqliteStore, tenancy: &Visibility, root: &str) -> i32 {
    let root = AttributeValueId::from_string(root);
    match store.create_job(tenancy, &root) {
        Ok(()) => {
            println!("Created job record for root '{}'", root);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_jobs_delete(store: &SqliteStore, tenancy: &Visibility, root: &str) -> i32 {
    let root = AttributeValueId::from_string(root);
    match store.delete_job(tenancy, &root) {
        Ok(true) => {
            println!("Deleted job record for root '{}'", root);
            0
        }
        Ok(false) => {
            eprintln!("Error: no job record for root '{}'", root);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Jobs {
            action,
            workspace,
            change_set,
            db,
        } => {
            let store = match open_store(db) {
                Ok(store) => store,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let tenancy = Visibility::new(
                WorkspaceId::from_string(workspace),
                ChangeSetId::from_string(change_set),
            );
            let code = match action {
                JobsAction::List => cmd_jobs_list(&store, &tenancy),
                JobsAction::Show { root } => cmd_jobs_show(&store, &tenancy, &root),
                JobsAction::Create { root } => cmd_jobs_create(&store, &tenancy, &root),
                JobsAction::Delete { root } => cmd_jobs_delete(&store, &tenancy, &root),
            };
            std::process::exit(code);
        }
    }
}
