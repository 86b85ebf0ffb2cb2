//! Slash command parsing.
//!
//! Tokens are matched exactly. A trailing `@botname` on the command token
//! (as Telegram appends in groups) is ignored.

/// A recognised (or unrecognised) slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Config,
    Status,
    Test,
    ManualIn,
    ManualOut,
    CheckStatus,
    /// `/exit` or `/reset`.
    Exit,
    /// Admin: list registered users.
    Users,
    /// Admin: `/remove <login>`. `None` when the argument is missing.
    Remove(Option<String>),
    /// Any other `/token`, without the `@botname` suffix.
    Unknown(String),
}

impl Command {
    /// Parse `text`. Returns `None` for text that is not a command.
    pub fn parse(text: &str) -> Option<Command> {
        let trimmed = text.trim();
        if !trimmed.starts_with('/') {
            return None;
        }

        let (token, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim()),
            None => (trimmed, ""),
        };
        let token = token.split_once('@').map_or(token, |(name, _)| name);

        let cmd = match token {
            "/start" => Command::Start,
            "/help" => Command::Help,
            "/config" => Command::Config,
            "/status" => Command::Status,
            "/test" => Command::Test,
            "/manual_in" => Command::ManualIn,
            "/manual_out" => Command::ManualOut,
            "/check_status" => Command::CheckStatus,
            "/exit" | "/reset" => Command::Exit,
            "/users" => Command::Users,
            "/remove" => {
                let login = rest.split_whitespace().next().map(String::from);
                Command::Remove(login)
            }
            other => Command::Unknown(other.to_string()),
        };
        Some(cmd)
    }

    pub fn is_admin_only(&self) -> bool {
        matches!(self, Command::Users | Command::Remove(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("https://hr.example.com"), None);
    }

    #[test]
    fn known_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("  /manual_in  "), Some(Command::ManualIn));
        assert_eq!(Command::parse("/check_status"), Some(Command::CheckStatus));
        assert_eq!(Command::parse("/reset"), Some(Command::Exit));
    }

    #[test]
    fn bot_suffix_is_ignored() {
        assert_eq!(Command::parse("/status@punchclock_bot"), Some(Command::Status));
    }

    #[test]
    fn matching_is_exact() {
        assert_eq!(Command::parse("/Start"), Some(Command::Unknown("/Start".into())));
        assert_eq!(Command::parse("/started"), Some(Command::Unknown("/started".into())));
    }

    #[test]
    fn remove_takes_a_login() {
        assert_eq!(Command::parse("/remove alice"), Some(Command::Remove(Some("alice".into()))));
        assert_eq!(Command::parse("/remove"), Some(Command::Remove(None)));
        assert!(Command::Remove(None).is_admin_only());
    }
}
