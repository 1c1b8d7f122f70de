use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::task::Priority;
use crate::ops::view::Filter;

#[derive(Parser)]
#[command(name = "tasky", about = concat!("tasky v", env!("CARGO_PKG_VERSION"), " - organize your work efficiently"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding the task store (default: $TASKY_DIR or ./.tasky)
    #[arg(short = 'C', long = "store-dir", global = true)]
    pub store_dir: Option<PathBuf>,

    /// Config file (default: <store-dir>/tasky.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a task
    Add(AddArgs),
    /// Edit a task's fields
    Edit(EditArgs),
    /// Mark a task completed, or active again
    Toggle(IdArg),
    /// Permanently delete a task
    Rm(IdArg),
    /// List tasks, highest priority and nearest deadline first
    List(ListArgs),
    /// Show task details
    Show(IdArg),
    /// Show task counts by status
    Counts,
    /// Live list that refreshes countdowns and follows changes
    Watch(WatchArgs),
}

#[derive(Args)]
pub struct IdArg {
    /// Task ID (any unique prefix)
    pub id: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Longer description
    #[arg(short, long)]
    pub description: Option<String>,
    /// high, medium or low
    #[arg(short, long)]
    pub priority: Option<Priority>,
    /// Deadline: RFC 3339 timestamp or YYYY-MM-DD
    #[arg(long)]
    pub deadline: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID (any unique prefix)
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New description
    #[arg(short, long, conflicts_with = "clear_description")]
    pub description: Option<String>,
    /// Remove the description
    #[arg(long)]
    pub clear_description: bool,
    /// high, medium or low
    #[arg(short, long)]
    pub priority: Option<Priority>,
    /// Deadline: RFC 3339 timestamp or YYYY-MM-DD
    #[arg(long, conflicts_with = "clear_deadline")]
    pub deadline: Option<String>,
    /// Remove the deadline
    #[arg(long)]
    pub clear_deadline: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// all, active or completed
    #[arg(short, long, default_value = "all")]
    pub filter: Filter,
}

#[derive(Args)]
pub struct WatchArgs {
    /// all, active or completed
    #[arg(short, long, default_value = "all")]
    pub filter: Filter,
    /// Render once and exit
    #[arg(long)]
    pub once: bool,
}
