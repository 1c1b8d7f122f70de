mod watch;
pub use watch::cmd_watch;

use std::path::PathBuf;
use std::rc::Rc;

use chrono::{DateTime, Local, Utc};

use crate::board::Board;
use crate::cli::commands::*;
use crate::cli::input::{IdMatch, match_id, parse_deadline};
use crate::cli::output::*;
use crate::io::config_io::{self, STORE_DIR_ENV};
use crate::io::storage::{FileStorage, Storage};
use crate::model::config::TaskyConfig;
use crate::notice::{Notifier, NullNotifier, StderrNotifier};
use crate::ops::countdown::task_countdown;
use crate::ops::task_ops::{SystemClock, TaskInput, TaskPatch, UuidSource};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Everything one invocation works against
pub struct Session {
    pub board: Board,
    pub config: TaskyConfig,
    pub store_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let mut session = open_session(&cli)?;

    match cli.command {
        // Read commands
        Commands::List(args) => cmd_list(&mut session, args, json),
        Commands::Show(args) => cmd_show(&session, args, json),
        Commands::Counts => cmd_counts(&session, json),
        Commands::Watch(args) => cmd_watch(&mut session, args, json),

        // Write commands
        Commands::Add(args) => cmd_add(&mut session, args, json),
        Commands::Edit(args) => cmd_edit(&mut session, args, json),
        Commands::Toggle(args) => cmd_toggle(&mut session, args, json),
        Commands::Rm(args) => cmd_rm(&mut session, args, json),
    }
}

fn open_session(cli: &Cli) -> Result<Session, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let env_dir = std::env::var_os(STORE_DIR_ENV).map(PathBuf::from);
    let resolved = config_io::resolve(
        cli.store_dir.as_deref(),
        env_dir.as_deref(),
        cli.config.as_deref(),
        &cwd,
    )?;
    tracing::debug!(store = %resolved.store_dir.display(), "store resolved");

    let storage: Rc<dyn Storage> = Rc::new(FileStorage::new(&resolved.store_dir));
    // JSON output is for scripts; notices would only be noise
    let notifier: Box<dyn Notifier> = if resolved.config.ui.notifications && !cli.json {
        Box::new(StderrNotifier::stderr())
    } else {
        Box::new(NullNotifier)
    };
    let mut board = Board::open(storage, Box::new(SystemClock), Box::new(UuidSource), notifier);

    if resolved.config.ui.welcome && !cli.json && board.take_first_visit() {
        for line in welcome_lines() {
            eprintln!("{}", line);
        }
    }

    Ok(Session {
        board,
        config: resolved.config,
        store_dir: resolved.store_dir,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve a user-typed id (exact or unique prefix) to a full task id
fn resolve_id(board: &Board, arg: &str) -> Result<String, Box<dyn std::error::Error>> {
    match match_id(board.tasks(), arg) {
        IdMatch::Found(id) => Ok(id),
        IdMatch::NotFound => Err(format!("no task matching '{}'", arg).into()),
        IdMatch::Ambiguous(n) => Err(format!("ambiguous id '{}' matches {} tasks", arg, n).into()),
    }
}

fn deadline_arg(board: &Board, raw: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    parse_deadline(raw, board.now(), &Local).map_err(Box::<dyn std::error::Error>::from)
}

fn print_task(board: &Board, id: &str, json: bool) -> CmdResult {
    let Some(task) = board.get(id) else {
        return Ok(());
    };
    let countdown = task_countdown(task, board.now());
    if json {
        println!("{}", serde_json::to_string_pretty(&task_to_json(task, countdown))?);
    } else {
        println!("{}", format_task_line(task, countdown.as_ref()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(session: &mut Session, args: ListArgs, json: bool) -> CmdResult {
    let board = &mut session.board;
    board.set_filter(args.filter);
    let now = board.now();
    let view = board.view();
    let counts = board.counts();
    let empty = board.empty_state();

    if json {
        let out = ListJson {
            filter: board.filter(),
            counts,
            tasks: view
                .iter()
                .map(|t| task_to_json(t, task_countdown(t, now)))
                .collect(),
            empty,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let lines = format_listing(&view, &counts, board.filter(), empty.as_ref(), &|t| {
            task_countdown(t, now)
        });
        for line in lines {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_show(session: &Session, args: IdArg, json: bool) -> CmdResult {
    let board = &session.board;
    let id = resolve_id(board, &args.id)?;
    let Some(task) = board.get(&id) else {
        return Err(format!("no task matching '{}'", args.id).into());
    };
    let now = board.now();

    if json {
        let tj = task_to_json(task, task_countdown(task, now));
        println!("{}", serde_json::to_string_pretty(&tj)?);
    } else {
        for line in format_task_detail(task, now, &Local) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_counts(session: &Session, json: bool) -> CmdResult {
    let counts = session.board.counts();
    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
    } else {
        println!("all: {}", counts.all);
        println!("active: {}", counts.active);
        println!("completed: {}", counts.completed);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(session: &mut Session, args: AddArgs, json: bool) -> CmdResult {
    let board = &mut session.board;
    let deadline = args
        .deadline
        .as_deref()
        .map(|raw| deadline_arg(board, raw))
        .transpose()?;

    let task = board.create(TaskInput {
        title: args.title,
        description: args.description.filter(|d| !d.is_empty()),
        priority: args.priority,
        deadline,
    })?;

    if json {
        print_task(board, &task.id, true)
    } else {
        println!("{}", task.id);
        Ok(())
    }
}

fn cmd_edit(session: &mut Session, args: EditArgs, json: bool) -> CmdResult {
    let board = &mut session.board;
    let id = resolve_id(board, &args.id)?;

    let description = if args.clear_description {
        Some(None)
    } else {
        args.description.map(|d| if d.is_empty() { None } else { Some(d) })
    };
    let deadline = if args.clear_deadline {
        Some(None)
    } else {
        args.deadline
            .as_deref()
            .map(|raw| deadline_arg(board, raw).map(Some))
            .transpose()?
    };
    let patch = TaskPatch {
        title: args.title,
        description,
        priority: args.priority,
        deadline,
        completed: None,
    };
    if patch.is_empty() {
        return Err("nothing to change (see `tasky edit --help`)".into());
    }

    match board.update(&id, patch)? {
        Some(task) => print_task(board, &task.id, json),
        None => Err(format!("no task matching '{}'", args.id).into()),
    }
}

fn cmd_toggle(session: &mut Session, args: IdArg, json: bool) -> CmdResult {
    let board = &mut session.board;
    let id = resolve_id(board, &args.id)?;
    match board.toggle_complete(&id) {
        Some(task) => print_task(board, &task.id, json),
        None => Err(format!("no task matching '{}'", args.id).into()),
    }
}

fn cmd_rm(session: &mut Session, args: IdArg, json: bool) -> CmdResult {
    let board = &mut session.board;
    let id = resolve_id(board, &args.id)?;
    let Some(task) = board.delete(&id) else {
        return Err(format!("no task matching '{}'", args.id).into());
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&task_to_json(&task, None))?);
    } else {
        println!("{}", task.id);
    }
    Ok(())
}
