//! Composer Slash Commands
//!
//! Input starting with `/` is a command rather than a message. Every command
//! also has a key binding; see [`HELP_TEXT`].

use std::path::PathBuf;

/// Help overlay contents
pub const HELP_TEXT: &str = "\
Enter            send message (with the attached image)
/attach <path>   attach an image        Ctrl+A  attach prompt
/detach          remove the attachment  Ctrl+X
/clear           new conversation       Ctrl+L
/recenter        reload the map         Ctrl+R
/pick <n>        show suggestion n      Alt+1..9
/help            toggle this help       F1
PgUp/PgDn        scroll the conversation
Esc / Ctrl+C     quit";

/// A parsed composer command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Attach an image to the next message
    Attach(PathBuf),
    /// Drop the pending attachment
    Detach,
    /// Start a fresh conversation
    Clear,
    /// Reload the map view
    Recenter,
    /// Show the n-th suggestion (1-based) on the map
    Pick(usize),
    /// Toggle the help overlay
    Help,
    /// Leave the application
    Quit,
}

/// Why a command could not be parsed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandError(pub String);

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse composer input
///
/// Returns `None` when the input is a plain message.
pub fn parse_command(input: &str) -> Option<Result<Command, CommandError>> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "attach" if arg.is_empty() => Err(CommandError("usage: /attach <path>".to_string())),
        "attach" => Ok(Command::Attach(expand_home(arg))),
        "detach" => Ok(Command::Detach),
        "clear" => Ok(Command::Clear),
        "recenter" => Ok(Command::Recenter),
        "pick" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Command::Pick(n)),
            _ => Err(CommandError("usage: /pick <n>, n starting at 1".to_string())),
        },
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError(format!("unknown command /{other}, try /help"))),
    };
    Some(command)
}

/// Expand a leading `~/`
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(parse_command("Eiffel Tower"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            parse_command("/attach /tmp/photo.jpg"),
            Some(Ok(Command::Attach(PathBuf::from("/tmp/photo.jpg"))))
        );
        assert_eq!(parse_command("  /clear  "), Some(Ok(Command::Clear)));
        assert_eq!(parse_command("/detach"), Some(Ok(Command::Detach)));
        assert_eq!(parse_command("/recenter"), Some(Ok(Command::Recenter)));
        assert_eq!(parse_command("/pick 2"), Some(Ok(Command::Pick(2))));
        assert_eq!(parse_command("/help"), Some(Ok(Command::Help)));
        assert_eq!(parse_command("/quit"), Some(Ok(Command::Quit)));
    }

    #[test]
    fn test_attach_path_keeps_spaces() {
        assert_eq!(
            parse_command("/attach /tmp/my photo.png"),
            Some(Ok(Command::Attach(PathBuf::from("/tmp/my photo.png"))))
        );
    }

    #[test]
    fn test_bad_arguments() {
        assert!(matches!(parse_command("/attach"), Some(Err(_))));
        assert!(matches!(parse_command("/pick 0"), Some(Err(_))));
        assert!(matches!(parse_command("/pick two"), Some(Err(_))));
        assert_eq!(
            parse_command("/teleport"),
            Some(Err(CommandError("unknown command /teleport, try /help".to_string())))
        );
    }
}
