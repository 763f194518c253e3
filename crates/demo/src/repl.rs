//! Line-oriented terminal front end over [`SearchService`].

use std::fmt::Write as _;
use std::io::Write;

use sift_search::{SearchService, Status};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const HELP: &str = "Type a query and press Enter to search. Include \"fail\" to simulate an error; repeat a query to hit the cache.
Commands: :cancel  :reset  :retry  :status  :help  :quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	Search(String),
	Cancel,
	Reset,
	Retry,
	Status,
	Help,
	Quit,
	Unknown(String),
}

impl Command {
	/// Parses one input line. Blank lines yield `None`.
	pub fn parse(line: &str) -> Option<Self> {
		let line = line.trim();
		if line.is_empty() {
			return None;
		}
		let Some(name) = line.strip_prefix(':') else {
			return Some(Self::Search(line.to_string()));
		};
		Some(match name.trim() {
			"cancel" | "c" => Self::Cancel,
			"reset" => Self::Reset,
			"retry" | "r" => Self::Retry,
			"status" | "s" => Self::Status,
			"help" | "h" | "?" => Self::Help,
			"quit" | "q" | "exit" => Self::Quit,
			other => Self::Unknown(other.to_string()),
		})
	}
}

/// Renders the observable service state.
pub fn render(service: &SearchService) -> String {
	let state = service.snapshot();
	let mut out = format!("Status: {}", state.status);
	if let Some(duration_ms) = state.last_duration_ms {
		let _ = write!(out, " • Duration: {duration_ms}ms");
	}
	if state.last_from_cache == Some(true) {
		out.push_str(" • Cache: hit");
	}
	if state.aborted {
		out.push_str(" • Aborted");
	}

	match state.status {
		Status::Loading => out.push_str("\nLoading…"),
		Status::Error => {
			let _ = write!(out, "\nError: {}  (:retry to try again)", state.error.as_deref().unwrap_or_default());
		}
		Status::Success => match service.current_results() {
			Some(rows) if !rows.is_empty() => {
				for row in rows.iter() {
					let _ = write!(out, "\n  - {}", row.title);
				}
			}
			_ => out.push_str("\nNo results."),
		},
		Status::Idle => {}
	}
	out
}

/// Applies one command. Returns false when the loop should stop.
pub fn apply(service: &SearchService, command: Command, out: &mut impl Write) -> std::io::Result<bool> {
	match command {
		Command::Search(text) => {
			service.set_query(text.clone());
			service.start(&text);
		}
		Command::Cancel => {
			if !service.cancel() {
				writeln!(out, "Nothing to cancel.")?;
			}
		}
		Command::Reset => service.reset(),
		Command::Retry => {
			if service.start(&service.current_query()).is_none() {
				writeln!(out, "Nothing to retry.")?;
			}
		}
		Command::Status => writeln!(out, "{}", render(service))?,
		Command::Help => writeln!(out, "{HELP}")?,
		Command::Quit => return Ok(false),
		Command::Unknown(name) => writeln!(out, "Unknown command :{name}. Try :help.")?,
	}
	Ok(true)
}

/// Reads commands from `input` until EOF or `:quit`, re-rendering on every state change.
pub async fn run<R, W>(service: SearchService, input: R, out: &mut W) -> anyhow::Result<()>
where
	R: AsyncBufRead + Unpin,
	W: Write,
{
	let mut lines = input.lines();
	let mut revisions = service.changed();
	writeln!(out, "{HELP}")?;

	loop {
		tokio::select! {
			line = lines.next_line() => {
				let Some(line) = line? else {
					break;
				};
				if let Some(command) = Command::parse(&line)
					&& !apply(&service, command, out)?
				{
					break;
				}
			}
			changed = revisions.changed() => {
				if changed.is_err() {
					break;
				}
				let _ = revisions.borrow_and_update();
				if service.take_changed() {
					writeln!(out, "{}", render(&service))?;
				}
			}
		}
		out.flush()?;
	}
	tracing::debug!(stale_drops = service.stale_drops(), cached = service.cached_queries().len(), "demo loop finished");
	Ok(())
}
