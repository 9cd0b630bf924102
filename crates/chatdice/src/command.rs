// ABOUTME: Tokenizer for "target:operator:value" parameter operations embedded in chat text.
// ABOUTME: A two-state character scanner with quoting and backslash escapes.

use serde::Serialize;

use crate::width::{half_width_char, is_dash_variant, is_escape_char, to_half_width};

/// One parameter operation, e.g. `HP-3`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperateCommand {
    pub target_name: Option<String>,
    pub operator: Option<String>,
    pub value: Option<String>,
    /// The value was escaped with a leading `\` and must not be rolled.
    pub is_escape_roll: bool,
    /// The input ended (or a separator came) before an operator was seen.
    pub is_incomplete: bool,
}

/// The commands found at the start of a line plus the text around them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperateCommandsInfo {
    pub commands: Vec<OperateCommand>,
    /// The consumed prefix.
    pub command_string: String,
    /// The rest of the line after the terminating whitespace.
    pub end_string: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Target,
    Value,
}

fn is_separator(c: char) -> bool {
    matches!(c, ':' | '：')
}

fn is_operator(c: char) -> bool {
    matches!(
        c,
        '＋' | '＝' | '+' | '-' | '=' | '―' | '—' | '‐' | '－' | '>' | '＞'
    )
}

fn is_space(c: char) -> bool {
    c.is_whitespace()
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

impl State {
    /// Characters that may precede an opening quote.
    fn opens_quote_after(self, c: char) -> bool {
        match self {
            State::Target => is_separator(c),
            State::Value => is_operator(c),
        }
    }

    /// Characters that may follow a closing quote.
    fn closes_quote_before(self, c: char) -> bool {
        match self {
            State::Target => is_operator(c),
            State::Value => is_separator(c) || is_space(c),
        }
    }

    fn ends_with(self, c: char) -> bool {
        match self {
            State::Target => is_operator(c),
            State::Value => is_separator(c),
        }
    }
}

fn normalize_operator(c: char) -> String {
    let c = if is_dash_variant(c) { '-' } else { c };
    half_width_char(c).to_string()
}

fn finish_value(command: &mut OperateCommand, value: String) {
    let trimmed = to_half_width(value.trim_start());
    let mut chars = trimmed.chars();
    let escaped = matches!(
        (chars.next(), chars.next()),
        (Some('\\'), Some(c)) if c != '\\' && !c.is_whitespace()
    );
    if escaped {
        command.is_escape_roll = true;
        command.value = Some(value.replacen(is_escape_char, "", 1));
    } else {
        command.value = Some(value);
    }
}

/// Split the leading run of parameter operations out of `input`.
///
/// Scanning stops at the first whitespace that is not inside a quoted span.
/// Quotes are only honored when `quote` is set.
pub fn parse_commands(input: &str, quote: bool) -> OperateCommandsInfo {
    let chars: Vec<char> = input.chars().collect();

    let mut commands = Vec::new();
    let mut command_string = String::new();
    let mut command = OperateCommand::default();
    let mut state = State::Target;
    let mut part = String::new();
    let mut pending = String::new();
    let mut quote_char: Option<char> = None;
    let mut escape: Option<char> = None;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if (!quote || quote_char.is_none()) && is_space(c) {
            break;
        }

        if let Some(e) = escape.take() {
            let literal = is_separator(c) || is_operator(c) || (quote && Some(c) == quote_char);
            if !literal {
                part.push(e);
            }
            part.push(c);
            pending.push(c);
            i += 1;
            continue;
        }

        if is_escape_char(c) {
            escape = Some(c);
            pending.push(c);
            i += 1;
            continue;
        }

        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();

        if quote && quote_char.is_some() {
            if Some(c) == quote_char && next.map_or(true, |n| state.closes_quote_before(n)) {
                quote_char = None;
            } else {
                part.push(c);
            }
            pending.push(c);
        } else if quote && is_quote(c) && prev.map_or(true, |p| state.opens_quote_after(p)) {
            quote_char = Some(c);
            pending.push(c);
        } else if state == State::Target && is_separator(c) {
            pending.push(c);
            if !part.is_empty() {
                commands.push(OperateCommand {
                    target_name: Some(std::mem::take(&mut part)),
                    is_incomplete: true,
                    ..OperateCommand::default()
                });
            }
            command_string.push_str(&pending);
            pending.clear();
        } else if state.ends_with(c) {
            pending.push(c);
            let mut text = String::new();
            text.extend(quote_char);
            text.push_str(&part);
            match state {
                State::Target => {
                    command.target_name = Some(text);
                    command.operator = Some(normalize_operator(c));
                    state = State::Value;
                }
                State::Value => {
                    finish_value(&mut command, text);
                    commands.push(std::mem::take(&mut command));
                    state = State::Target;
                }
            }
            command_string.push_str(&pending);
            pending.clear();
            part.clear();
            quote_char = None;
        } else {
            part.push(c);
            pending.push(c);
        }
        i += 1;
    }

    let mut fragment = String::new();
    fragment.extend(quote_char);
    fragment.push_str(&part);
    fragment.extend(escape);
    // The consumed prefix keeps the raw text, escapes included.
    command_string.push_str(&pending);

    match state {
        State::Target => {
            if !fragment.is_empty() {
                command.target_name = Some(fragment);
                command.is_incomplete = true;
                commands.push(command);
            }
        }
        State::Value => {
            finish_value(&mut command, fragment);
            commands.push(command);
        }
    }

    let skip = usize::from(chars.get(i).is_some_and(|&c| is_space(c)));
    let end_string: String = chars[i..].iter().skip(skip).collect();

    OperateCommandsInfo {
        commands,
        command_string,
        end_string,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn command(target: &str, operator: &str, value: &str) -> OperateCommand {
        OperateCommand {
            target_name: Some(target.to_string()),
            operator: Some(operator.to_string()),
            value: Some(value.to_string()),
            ..OperateCommand::default()
        }
    }

    #[test]
    fn test_single_command() {
        let info = parse_commands("HP+2d6", false);
        assert_eq!(info.commands, vec![command("HP", "+", "2d6")]);
        assert_eq!(info.command_string, "HP+2d6");
        assert_eq!(info.end_string, "");
    }

    #[test]
    fn test_separator_and_trailing_text() {
        let info = parse_commands("HP:MP-4 hello", false);
        assert_eq!(info.commands.len(), 2);
        assert_eq!(info.commands[0].target_name.as_deref(), Some("HP"));
        assert!(info.commands[0].is_incomplete);
        assert_eq!(info.commands[1], command("MP", "-", "4"));
        assert_eq!(info.command_string, "HP:MP-4");
        assert_eq!(info.end_string, "hello");
    }

    #[test]
    fn test_chained_commands() {
        let info = parse_commands(":HP-1:MP＋3", false);
        assert_eq!(
            info.commands,
            vec![command("HP", "-", "1"), command("MP", "+", "3")]
        );
    }

    #[test]
    fn test_full_width_operator_is_normalized() {
        let info = parse_commands("HP―2", false);
        assert_eq!(info.commands, vec![command("HP", "-", "2")]);
    }

    #[test]
    fn test_incomplete_target() {
        let info = parse_commands("HP", false);
        assert_eq!(info.commands.len(), 1);
        assert!(info.commands[0].is_incomplete);
        assert_eq!(info.commands[0].operator, None);
    }

    #[test]
    fn test_value_at_end_is_complete() {
        let info = parse_commands("HP=", false);
        assert_eq!(info.commands, vec![command("HP", "=", "")]);
        assert!(!info.commands[0].is_incomplete);
    }

    #[test]
    fn test_empty_and_blank_input() {
        let info = parse_commands("", true);
        assert!(info.commands.is_empty());
        assert_eq!(info.command_string, "");
        assert_eq!(info.end_string, "");

        let info = parse_commands("   ", true);
        assert!(info.commands.is_empty());
        assert_eq!(info.end_string, "  ");
    }

    #[test]
    fn test_escaped_operator_is_literal() {
        let info = parse_commands(r"A\+B+1", false);
        assert_eq!(info.commands, vec![command("A+B", "+", "1")]);
    }

    #[test]
    fn test_escaped_plain_character_keeps_backslash() {
        let info = parse_commands(r"A\xB+1", false);
        assert_eq!(info.commands[0].target_name.as_deref(), Some(r"A\xB"));
    }

    #[test]
    fn test_trailing_escape() {
        let info = parse_commands(r"HP\", false);
        assert_eq!(info.commands[0].target_name.as_deref(), Some(r"HP\"));
        assert!(info.commands[0].is_incomplete);
    }

    #[test]
    fn test_command_string_keeps_escapes() {
        let info = parse_commands(r"A\+B", false);
        assert_eq!(info.commands[0].target_name.as_deref(), Some("A+B"));
        assert_eq!(info.command_string, r"A\+B");

        let info = parse_commands(r"HP-1:MP=\2d6 rest", false);
        assert_eq!(info.command_string, r"HP-1:MP=\2d6");
        assert_eq!(info.end_string, "rest");

        let info = parse_commands("HP￥", false);
        assert_eq!(info.command_string, "HP￥");
    }

    #[test]
    fn test_escape_roll_value() {
        let info = parse_commands(r"memo=\2d6", false);
        assert!(info.commands[0].is_escape_roll);
        assert_eq!(info.commands[0].value.as_deref(), Some("2d6"));
    }

    #[test]
    fn test_quoted_target_with_space_and_operator() {
        let info = parse_commands(r#""Max HP"+5 rest"#, true);
        assert_eq!(info.commands, vec![command("Max HP", "+", "5")]);
        assert_eq!(info.end_string, "rest");
    }

    #[test]
    fn test_quotes_ignored_without_flag() {
        let info = parse_commands(r#""Max HP"+5"#, false);
        assert_eq!(info.commands[0].target_name.as_deref(), Some("\"Max"));
        assert_eq!(info.end_string, r#"HP"+5"#);
    }

    #[test]
    fn test_quoted_value_with_operators() {
        let info = parse_commands(r#"memo="a+b c":HP-1"#, true);
        assert_eq!(
            info.commands,
            vec![command("memo", "=", "a+b c"), command("HP", "-", "1")]
        );
    }

    #[test]
    fn test_unterminated_quote() {
        let info = parse_commands(r#"memo="abc def"#, true);
        assert_eq!(info.commands.len(), 1);
        assert_eq!(info.commands[0].value.as_deref(), Some("\"abc def"));
        assert_eq!(info.end_string, "");
    }

    proptest! {
        #[test]
        fn command_string_and_end_string_rebuild_input(input in "[^\\s\"']*") {
            let info = parse_commands(&input, false);
            prop_assert_eq!(format!("{}{}", info.command_string, info.end_string), input);
        }

        #[test]
        fn command_string_is_prefix(input in "[^\"']*") {
            let info = parse_commands(&input, false);
            prop_assert!(input.starts_with(&info.command_string));
        }
    }
}
