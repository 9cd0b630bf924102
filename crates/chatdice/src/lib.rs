// ABOUTME: Core library for interpreting chat dice commands and annotating roll results.
// ABOUTME: Wires request parsing, roll tables, local/remote dice engines, and result formatting.

//! # Chatdice
//!
//! Turns chat lines like `3 2d6>=7`, `SX2 CC<=50` or `choice[a,b]` into roll
//! results, and decorates result traces with dice markup for display.
//!
//! ## Quick Start
//!
//! ```
//! use chatdice::{format_roll_result, roll};
//!
//! // Roll with the embedded engine
//! let result = roll("2d6+1").unwrap();
//! assert!(result.text.starts_with("(2D6+1) ＞ "));
//! assert!((3..=13).contains(&result.total));
//!
//! // Annotate a trace for display
//! assert_eq!(format_roll_result("(1D100) ＞ 42", "DiceBot"), "🎲1D100 → 42");
//! ```
//!
//! ## Chat Bot
//!
//! [`DiceBot`] is the full pipeline: repeat prefixes, roll tables, CHOICE
//! normalization, then a [`DiceEngine`] ([`LocalEngine`] in-process or
//! [`RemoteEngine`] against a dice API).
//!
//! ```
//! use std::sync::Arc;
//! use chatdice::{DiceBot, LocalEngine};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let bot = DiceBot::new(Arc::new(LocalEngine::with_seed(7)));
//! let outcome = bot.roll_command("2 1d6", "DiceBot").await.unwrap();
//! assert!(outcome.text.ends_with("#2"));
//! # });
//! ```

pub mod ast;
pub mod bot;
pub mod catalog;
pub mod choice;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod lexer;
pub mod parser;
pub mod repeat;
pub mod request;
pub mod roller;
pub mod system;
pub mod table;
pub mod width;

pub use ast::{Command, Compare, Condition, Dice, Expr, Modifier, Op, Roll};
pub use bot::{DiceBot, ResultMessage};
pub use catalog::{build_catalog, group_catalog, CatalogEntry, GameSystemGroup, GameSystemInfo};
pub use command::{parse_commands, OperateCommand, OperateCommandsInfo};
pub use config::Config;
pub use engine::{ApiVersion, DiceEngine, LocalEngine, RemoteEngine, RollOutcome, SystemRegistry};
pub use error::{Error, Result};
pub use format::format_roll_result;
pub use request::{parse_request, RollRequest};
pub use roller::{CommandResult, FastRng, Rng, RollResult};
pub use system::{EvalResult, GameSystem, DEFAULT_SYSTEM};
pub use table::{RollDescriptor, RollRow};

/// Parse and roll a generic dice command in one step.
///
/// # Examples
///
/// ```
/// let result = chatdice::roll("2d6>=7").unwrap();
/// println!("{}", result.text);
/// assert!(result.success.is_some());
/// ```
pub fn roll(command: &str) -> Result<CommandResult> {
    roll_with_rng(command, &mut FastRng::new())
}

/// Parse and roll with a custom RNG.
///
/// # Examples
///
/// ```
/// use chatdice::{roll_with_rng, FastRng};
///
/// let mut rng = FastRng::with_seed(42);
/// let result = roll_with_rng("3b6>=4", &mut rng).unwrap();
/// assert_eq!(result.rands.len(), 3);
/// ```
pub fn roll_with_rng(command: &str, rng: &mut impl Rng) -> Result<CommandResult> {
    let parsed = parser::parse_command(command)?;
    roller::roll_command(&parsed, rng)
}

/// Parse a dice command without rolling.
pub fn parse(input: &str) -> Result<Command> {
    parser::parse_command(input)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_roll_basic() {
        let result = roll("2d6").unwrap();
        assert!(result.total >= 2 && result.total <= 12);
        assert_eq!(result.rands.len(), 2);
    }

    #[test]
    fn test_roll_seeded() {
        let mut rng = FastRng::with_seed(42);
        let result1 = roll_with_rng("2d6+1", &mut rng).unwrap();

        let mut rng = FastRng::with_seed(42);
        let result2 = roll_with_rng("2d6+1", &mut rng).unwrap();

        assert_eq!(result1, result2);
    }

    #[test]
    fn test_parse() {
        let command = parse("2B6>=4").unwrap();
        match command {
            Command::Count { groups, target } => {
                assert_eq!(groups.len(), 1);
                assert_eq!(groups[0].count, 2);
                assert_eq!(groups[0].sides, 6);
                assert_eq!(target.map(|t| t.value), Some(4));
            }
            _ => panic!("Expected a counting roll"),
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse("2d6+"), Err(Error::UnexpectedEof)));
    }

    #[tokio::test]
    async fn test_bot_with_local_engine() {
        let config = Config {
            seed: Some(1),
            ..Config::default()
        };
        let bot = DiceBot::new(config.build_engine().unwrap());

        let outcome = bot.roll_command("1d6>=1", DEFAULT_SYSTEM).await.unwrap();
        assert!(outcome.is_success);

        let message = bot.message(&outcome, "Alice");
        assert_eq!(message.from, "System-Dice");
        assert!(message.text.starts_with("🎲1D6>=1"));
        assert!(message.tag.contains("success"));

        assert_eq!(bot.roll_command("hello", DEFAULT_SYSTEM).await, None);
    }

    #[tokio::test]
    async fn test_bot_ignores_deeply_nested_line() {
        let bot = DiceBot::new(Arc::new(LocalEngine::with_seed(1)));
        for text in [
            format!("{}1", "-".repeat(5_000)),
            format!("{}2d6", "(".repeat(5_000)),
            format!("2d6{}", "*2".repeat(5_000)),
        ] {
            assert_eq!(bot.roll_command(&text, DEFAULT_SYSTEM).await, None);
        }
    }
}
