//! Rustyline helper: slash-command and persona completion, history hints

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;

use crate::persona::Persona;

/// Slash commands for tab completion
pub const SLASH_COMMANDS: &[&str] = &[
    "/help",
    "/persona",
    "/location",
    "/reset",
    "/history",
    "/status",
    "/quit",
    "/exit",
];

pub struct ZestyHelper {
    hinter: HistoryHinter,
}

impl ZestyHelper {
    pub fn new() -> Self {
        Self {
            hinter: HistoryHinter::new(),
        }
    }
}

impl Default for ZestyHelper {
    fn default() -> Self {
        Self::new()
    }
}

/// Candidates for the text before the cursor
fn candidates(line: &str) -> (usize, Vec<String>) {
    if !line.starts_with('/') {
        return (line.len(), vec![]);
    }

    // "/persona <partial>" completes persona names
    if let Some(partial) = line.strip_prefix("/persona ") {
        let partial = partial.to_lowercase();
        let names = Persona::ALL
            .iter()
            .map(|p| p.label().to_lowercase())
            .filter(|name| name.starts_with(&partial))
            .collect();
        return ("/persona ".len(), names);
    }

    if line.contains(' ') {
        return (line.len(), vec![]);
    }

    let names = SLASH_COMMANDS
        .iter()
        .filter(|cmd| cmd.starts_with(line))
        .map(|cmd| cmd.to_string())
        .collect();
    (0, names)
}

impl Completer for ZestyHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, names) = candidates(&line[..pos]);
        let pairs = names
            .into_iter()
            .map(|name| Pair {
                display: name.clone(),
                replacement: name,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ZestyHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        if line.starts_with('/') {
            None
        } else {
            self.hinter.hint(line, pos, ctx)
        }
    }
}

impl Highlighter for ZestyHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[2m{}\x1b[0m", hint))
    }
}

impl Validator for ZestyHelper {}

impl Helper for ZestyHelper {}
