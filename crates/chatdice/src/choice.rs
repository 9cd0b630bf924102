// ABOUTME: Canonicalizes the three CHOICE syntaxes before they reach a dice engine.
// ABOUTME: Anything that is not a choice is cut down to its first token with symbols normalized.

use std::sync::LazyLock;

use regex::Regex;

use crate::width::{normalize_dashes, normalize_dice_symbols, to_half_width, unescape};

static SPACED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^([sＳｓ]?[cＣｃ][hＨｈ][oＯｏ][iＩｉ][cＣｃ][eＥｅ][\d０-９]*)([ 　]+|[\\￥][sｓ])([^\n]*)",
    )
    .expect("valid regex")
});

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^([sＳｓ]?[cＣｃ][hＨｈ][oＯｏ][iＩｉ][cＣｃ][eＥｅ][\d０-９]*[\[［])([^\]］]+)([\]］])",
    )
    .expect("valid regex")
});

static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^([sＳｓ]?[cＣｃ][hＨｈ][oＯｏ][iＩｉ][cＣｃ][eＥｅ][\d０-９]*[\(（])([^\)）]+)([\)）])",
    )
    .expect("valid regex")
});

static RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:\d+-\d+|[a-z]-[a-z])$").expect("valid regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A roll expression ready for a dice engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    pub text: String,
    /// Choice commands skip the remote engine's ASCII check.
    pub is_choice: bool,
}

/// Canonicalize the expression part of a chat line.
pub fn prepare_command(expression: &str) -> PreparedCommand {
    match normalize_choice(expression) {
        Some(text) => PreparedCommand {
            text,
            is_choice: true,
        },
        None => PreparedCommand {
            text: normalize_expression(expression),
            is_choice: false,
        },
    }
}

/// Rewrite a CHOICE command into its canonical half-width form, or `None`
/// when the text is not a choice.
pub fn normalize_choice(expression: &str) -> Option<String> {
    let trimmed = expression.trim();

    if let Some(caps) = SPACED.captures(trimmed) {
        let mut text = to_half_width(&format!("{}{}", &caps[1], unescape(&caps[2])));
        let options = &caps[3];
        match as_range(options) {
            Some(range) => text.push_str(&range),
            None => {
                let expanded = if to_half_width(options).trim().is_empty() {
                    options.to_string()
                } else {
                    unescape(options)
                };
                text.push_str(&WHITESPACE_RUN.replace_all(expanded.trim(), " "));
            }
        }
        return Some(text);
    }

    let caps = BRACKETED
        .captures(trimmed)
        .or_else(|| PARENTHESIZED.captures(trimmed))?;
    let options = match as_range(&caps[2]) {
        Some(range) => range,
        None => caps[2].replace('，', ","),
    };
    Some(format!(
        "{}{}{}",
        to_half_width(&caps[1]),
        options,
        to_half_width(&caps[3])
    ))
}

/// The normalized option text if it is exactly a numeric or letter range.
fn as_range(options: &str) -> Option<String> {
    let normalized = to_half_width(&normalize_dashes(options)).trim().to_string();
    RANGE.is_match(&normalized).then_some(normalized)
}

/// Non-choice fallback: half-width, first whitespace-delimited token, dice
/// symbols normalized.
pub fn normalize_expression(expression: &str) -> String {
    let half = to_half_width(expression);
    let token = half.split_whitespace().next().unwrap_or_default();
    normalize_dice_symbols(token)
}
