//! Prefix + command + argument parsing.

/// A message body parsed as a command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lower-cased command name.
    pub command: String,
    /// Whitespace-split arguments after the command name.
    pub args: Vec<String>,
}

/// Parse `text` as a command under `prefix`.
///
/// Returns `None` when the trimmed text does not start with the prefix
/// or carries nothing after it - that message is not a command.
pub fn parse_command(text: &str, prefix: &str) -> Option<ParsedCommand> {
    let trimmed = text.trim();
    if trimmed.is_empty() || prefix.is_empty() || !trimmed.starts_with(prefix) {
        return None;
    }

    let body = trimmed[prefix.len()..].trim();
    if body.is_empty() {
        return None;
    }

    let mut parts = body.split_whitespace();
    let command = parts.next()?.to_lowercase();
    let args = parts.map(str::to_string).collect();

    Some(ParsedCommand { command, args })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_parse() {
        let parsed = parse_command(".roulette 100k rojo", ".").expect("command");
        assert_eq!(parsed.command, "roulette");
        assert_eq!(parsed.args, vec!["100k", "rojo"]);
    }

    #[test]
    fn test_command_is_lowercased() {
        let parsed = parse_command(".PING", ".").expect("command");
        assert_eq!(parsed.command, "ping");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn test_no_prefix_is_not_a_command() {
        assert_eq!(parse_command("hello world", "."), None);
    }

    #[test]
    fn test_prefix_alone_is_not_a_command() {
        assert_eq!(parse_command(".", "."), None);
        assert_eq!(parse_command(".   ", "."), None);
    }

    #[test]
    fn test_multichar_prefix() {
        let parsed = parse_command("!!menu full", "!!").expect("command");
        assert_eq!(parsed.command, "menu");
        assert_eq!(parsed.args, vec!["full"]);
    }

    #[test]
    fn test_surrounding_whitespace() {
        let parsed = parse_command("  .ping  ", ".").expect("command");
        assert_eq!(parsed.command, "ping");
    }

    #[test]
    fn test_empty_prefix_never_matches() {
        assert_eq!(parse_command("ping", ""), None);
    }
}
