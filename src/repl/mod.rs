//! Interactive REPL
//!
//! One session per process. Replies stream to stdout as they arrive; logs go
//! to stderr. Ctrl+C during a reply stops the stream and keeps what arrived.

mod colors;
mod commands;
mod helper;

use anyhow::Result;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatEngine, ChatEvent, STREAM_EVENT_BUFFER, TurnStatus};
use crate::config::{Config, config_dir};
use crate::grounding::FetchOutcome;
use crate::session::{Role, Session};

pub use commands::{Command, HELP};
use helper::ZestyHelper;

pub struct Repl {
    editor: Editor<ZestyHelper, DefaultHistory>,
    engine: ChatEngine,
    session: Session,
    history_path: PathBuf,
    search_enabled: bool,
}

impl Repl {
    pub fn new(engine: ChatEngine, config: &Config) -> Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(ZestyHelper::new()));

        Ok(Self {
            editor,
            engine,
            session: Session::new(config.persona, config.home_location.clone(), config.history_limit),
            history_path: config_dir().join("history"),
            search_enabled: config.search_enabled(),
        })
    }

    fn load_history(&mut self) {
        if self.history_path.exists() {
            let _ = self.editor.load_history(&self.history_path);
        }
    }

    fn save_history(&mut self) {
        if let Some(parent) = self.history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = self.editor.save_history(&self.history_path);
    }

    /// Run the REPL loop until /quit or Ctrl+D
    pub async fn run(&mut self) -> Result<()> {
        self.load_history();

        println!("{} is here. /help for commands, Ctrl+D to exit.", colors::persona(self.session.persona.label()));
        if self.session.home_location.is_empty() {
            println!("{}", colors::status("Tip: /location <place> to get local time and weather."));
        }
        println!();

        loop {
            let line = match self.editor.readline(">>> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("{}", colors::error(&format!("Input error: {}", err)));
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.editor.add_history_entry(trimmed)?;

            if trimmed.starts_with('/') {
                match Command::parse(trimmed) {
                    Ok(Command::Quit) => break,
                    Ok(command) => self.handle_command(command),
                    Err(msg) => println!("{}", colors::warning(&msg)),
                }
                continue;
            }

            self.process_input(trimmed).await;
        }

        println!("Goodbye!");
        self.save_history();
        Ok(())
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Help => println!("{}", HELP),
            Command::Persona(None) => {
                println!("Persona: {}", colors::persona(self.session.persona.label()));
            }
            Command::Persona(Some(persona)) => {
                self.session.persona = persona;
                println!("{}", colors::success(&format!("Persona switched to {}", persona)));
            }
            Command::Location(None) => {
                if self.session.home_location.is_empty() {
                    println!("Location: (not set)");
                } else {
                    println!("Location: {}", self.session.home_location);
                }
            }
            Command::Location(Some(location)) => {
                if location.is_empty() {
                    println!("{}", colors::success("Location cleared"));
                } else {
                    println!("{}", colors::success(&format!("Location set to {}", location)));
                }
                self.session.home_location = location;
            }
            Command::Reset => {
                self.session.reset();
                println!("{}", colors::success("Conversation cleared."));
            }
            Command::History => {
                if self.session.conversation.is_empty() {
                    println!("{}", colors::status("(no messages)"));
                }
                for turn in self.session.conversation.turns() {
                    let who = match turn.role() {
                        Role::User => "you".to_string(),
                        Role::Assistant => colors::persona(self.session.persona.label()),
                    };
                    println!("{}: {}", who, turn.content());
                }
            }
            Command::Status => {
                let settings = self.engine.settings();
                println!("Model:     {} (temperature {})", settings.model, settings.temperature);
                println!("Persona:   {}", self.session.persona);
                println!(
                    "Location:  {}",
                    if self.session.home_location.is_empty() {
                        "(not set)"
                    } else {
                        self.session.home_location.as_str()
                    }
                );
                println!("Mentions:  {}", settings.mention_policy);
                println!("Search:    {}", if self.search_enabled { "on" } else { "off (no TAVILY_API_KEY)" });
                println!(
                    "History:   {}/{} messages",
                    self.session.conversation.len(),
                    self.session.conversation.limit()
                );
            }
            Command::Quit => {}
        }
    }

    /// Run a turn, rendering events as they arrive
    async fn process_input(&mut self, input: &str) {
        let (tx, mut rx) = mpsc::channel(STREAM_EVENT_BUFFER);

        // Ctrl+C while streaming cancels the turn, not the process
        let cancel = CancellationToken::new();
        let ctrl_c = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let label = self.session.persona.label();
        let has_location = !self.session.home_location.is_empty();
        let render = async move {
            let mut started = false;
            while let Some(event) = rx.recv().await {
                match event {
                    ChatEvent::Grounding { grounding, .. } => {
                        if let (true, FetchOutcome::Fallback { reason, .. }) = (has_location, &grounding.location) {
                            eprintln!("{}", colors::status(&format!("(location: {})", reason)));
                        }
                    }
                    ChatEvent::TextDelta { delta } => {
                        if !started {
                            print!("{}: ", colors::persona(label));
                            started = true;
                        }
                        print!("{}", delta);
                        let _ = io::stdout().flush();
                    }
                    ChatEvent::Error { message } => {
                        if started {
                            println!();
                        }
                        println!("{}", colors::error(&message));
                        started = false;
                    }
                    ChatEvent::Done { status } => {
                        if started {
                            println!();
                        }
                        if status == TurnStatus::Cancelled {
                            println!("{}", colors::dim("(stopped)"));
                        }
                    }
                }
            }
        };

        let (result, ()) = tokio::join!(
            self.engine.run_turn(&mut self.session, input, tx, Some(cancel)),
            render
        );
        ctrl_c.abort();

        match result {
            Ok(_) => println!(),
            Err(e) => println!("{}", colors::warning(&e.to_string())),
        }
    }
}
