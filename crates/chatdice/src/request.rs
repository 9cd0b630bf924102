// ABOUTME: Splits a chat line into a repeat count, a secret flag, and the roll expression.
// ABOUTME: Accepts "3 1d100", "x3 1d100", "SREP2 CC<=50" and their full-width spellings.

use std::sync::LazyLock;

use regex::Regex;

use crate::width::to_half_width;

/// Most iterations a single chat line may request.
pub const MAX_REPEAT: u32 = 32;

static REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(([sＳｓ][rＲｒ][eＥｅ][pＰｐ][eＥｅ][aＡａ][tＴｔ]|[rＲｒ][eＥｅ][pＰｐ][eＥｅ][aＡａ][tＴｔ]|[sＳｓ][rＲｒ][eＥｅ][pＰｐ]|[rＲｒ][eＥｅ][pＰｐ]|[sＳｓ][xＸｘ]|[xＸｘ])?([\d０-９]+)?[ 　]+)?([^\n]*)",
    )
    .expect("valid regex")
});

/// A chat line broken into its repeat prefix and expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollRequest {
    pub repeat: u32,
    /// Set by an `S`-prefixed repeat keyword.
    pub is_secret: bool,
    /// The rest of the first line, untouched.
    pub expression: String,
}

impl RollRequest {
    /// Whether there is anything to roll.
    pub fn is_rollable(&self) -> bool {
        self.repeat > 0 && !self.expression.is_empty()
    }

    /// The repeat count clamped to [`MAX_REPEAT`].
    pub fn iterations(&self) -> u32 {
        self.repeat.min(MAX_REPEAT)
    }
}

/// Parse the repeat/secret prefix of a chat line.
pub fn parse_request(text: &str) -> RollRequest {
    let text = text.replace('\u{200b}', "");

    let Some(caps) = REQUEST.captures(&text) else {
        return RollRequest {
            repeat: 1,
            is_secret: false,
            expression: text,
        };
    };

    let is_secret = caps
        .get(2)
        .is_some_and(|m| to_half_width(m.as_str()).to_uppercase().starts_with('S'));
    let repeat = caps
        .get(3)
        .map(|m| to_half_width(m.as_str()).parse().unwrap_or(u32::MAX))
        .unwrap_or(1);
    let expression = caps
        .get(4)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    RollRequest {
        repeat,
        is_secret,
        expression,
    }
}
