use std::io::{IsTerminal, Write};

use chrono::{Duration, Local};

use super::{CmdResult, Session};
use crate::cli::commands::WatchArgs;
use crate::cli::output::{ListJson, format_listing, format_timestamp, task_to_json};
use crate::io::storage::TASKS_KEY;
use crate::io::watcher::{StorageEvent, StorageWatcher};
use crate::ops::countdown::CountdownScheduler;

/// Live listing: countdowns refresh on the configured cadence and the list
/// reloads whenever another process rewrites the task store.
pub fn cmd_watch(session: &mut Session, args: WatchArgs, json: bool) -> CmdResult {
    let cadence = Duration::seconds(session.config.countdown.refresh_secs() as i64);
    let board = &mut session.board;
    board.set_filter(args.filter);
    let mut scheduler = CountdownScheduler::new(cadence);

    let watcher = if args.once {
        None
    } else {
        std::fs::create_dir_all(&session.store_dir)?;
        let tasks_file = format!("{}.json", TASKS_KEY);
        match StorageWatcher::start(&session.store_dir, &[tasks_file.as_str()]) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "not watching the store; external changes will not show"
                );
                None
            }
        }
    };
    let clear = !json && std::io::stdout().is_terminal();

    loop {
        let now = board.now();
        {
            let view = board.view();
            scheduler.sync(&view, now);
            let counts = board.counts();
            let empty = board.empty_state();
            let mut out = std::io::stdout().lock();

            if json {
                let listing = ListJson {
                    filter: board.filter(),
                    counts,
                    tasks: view
                        .iter()
                        .map(|t| task_to_json(t, scheduler.get(&t.id).cloned()))
                        .collect(),
                    empty,
                };
                writeln!(out, "{}", serde_json::to_string(&listing)?)?;
            } else {
                if clear {
                    write!(out, "\x1b[2J\x1b[H")?;
                }
                writeln!(out, "Updated {}", format_timestamp(now, &Local))?;
                let lines = format_listing(&view, &counts, board.filter(), empty.as_ref(), &|t| {
                    scheduler.get(&t.id).cloned()
                });
                for line in lines {
                    writeln!(out, "{}", line)?;
                }
            }
            out.flush()?;
        }

        if args.once {
            break;
        }

        // Sleep until the next countdown is due or the store changes
        let wait = scheduler
            .next_due()
            .map(|due| due - now)
            .unwrap_or(cadence)
            .max(Duration::zero())
            .to_std()
            .unwrap_or_default();

        match &watcher {
            Some(w) => {
                let events = w.wait(wait);
                let changed = events
                    .iter()
                    .any(|StorageEvent::Changed(paths)| !paths.is_empty());
                if changed {
                    board.reload();
                }
            }
            None => std::thread::sleep(wait),
        }

        scheduler.tick(board.now());
    }

    scheduler.cancel_all();
    Ok(())
}
