//! Slash command parsing

use crate::persona::Persona;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    /// No argument shows the current persona
    Persona(Option<Persona>),
    /// No argument shows the current location; `-` clears it
    Location(Option<String>),
    Reset,
    History,
    Status,
    Quit,
}

impl Command {
    /// Parse a line starting with `/`
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };

        match command.to_lowercase().as_str() {
            "/help" | "/?" => Ok(Command::Help),
            "/persona" if arg.is_empty() => Ok(Command::Persona(None)),
            "/persona" => arg
                .parse::<Persona>()
                .map(|p| Command::Persona(Some(p)))
                .map_err(|e| format!("{} (choose sassy, zesty or professional)", e)),
            "/location" if arg.is_empty() => Ok(Command::Location(None)),
            "/location" if arg == "-" => Ok(Command::Location(Some(String::new()))),
            "/location" => Ok(Command::Location(Some(arg.to_string()))),
            "/reset" | "/clear" => Ok(Command::Reset),
            "/history" => Ok(Command::History),
            "/status" => Ok(Command::Status),
            "/quit" | "/exit" => Ok(Command::Quit),
            other => Err(format!("Unknown command: {} (try /help)", other)),
        }
    }
}

pub const HELP: &str = "\
Commands:
  /persona [name]    - Show or switch persona (sassy, zesty, professional)
  /location [place]  - Show or set your location (- to clear)
  /reset             - Hard reset: forget the conversation
  /history           - Show retained messages
  /status            - Show model, persona, location and lookups
  /help              - Show this help
  /quit              - Exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_persona() {
        assert_eq!(
            Command::parse("/persona Zesty"),
            Ok(Command::Persona(Some(Persona::Zesty)))
        );
        assert_eq!(Command::parse("/persona"), Ok(Command::Persona(None)));
        assert!(Command::parse("/persona grumpy").unwrap_err().contains("grumpy"));
    }

    #[test]
    fn test_parse_location_keeps_spaces() {
        assert_eq!(
            Command::parse("/location  New York City "),
            Ok(Command::Location(Some("New York City".into())))
        );
        assert_eq!(Command::parse("/location -"), Ok(Command::Location(Some(String::new()))));
        assert_eq!(Command::parse("/location"), Ok(Command::Location(None)));
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Command::parse("/clear"), Ok(Command::Reset));
        assert_eq!(Command::parse("/EXIT"), Ok(Command::Quit));
        assert!(Command::parse("/dance").is_err());
    }
}
