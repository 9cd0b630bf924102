// ABOUTME: Dice engine abstraction shared by the embedded and remote backends.
// ABOUTME: Defines the roll outcome, its reduction rules, and the DiceEngine trait.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use serde::Serialize;

use crate::catalog::GameSystemInfo;
use crate::system::EvalResult;

pub use local::{LocalEngine, SystemLoader, SystemRegistry};
pub use remote::{ApiVersion, RemoteEngine};

/// Shown in place of a system's help when it has none.
pub const NO_HELP: &str = "ダイスボット情報がありません。";

/// The resolved result of one roll command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollOutcome {
    /// The rule system that produced the text.
    pub engine_id: String,
    pub text: String,
    pub is_secret: bool,
    /// No dice were drawn (calculations, failures, fixed table lookups).
    pub is_empty_dice: bool,
    pub is_success: bool,
    pub is_failure: bool,
    pub is_critical: bool,
    pub is_fumble: bool,
    pub is_dice_roll_table: bool,
    pub table_name: Option<String>,
}

impl RollOutcome {
    /// The outcome of a roll that produced nothing. Also the seed of a reduction.
    pub fn empty(engine_id: impl Into<String>) -> Self {
        Self {
            engine_id: engine_id.into(),
            text: String::new(),
            is_secret: false,
            is_empty_dice: true,
            is_success: false,
            is_failure: true,
            is_critical: false,
            is_fumble: false,
            is_dice_roll_table: false,
            table_name: None,
        }
    }

    pub fn from_eval(engine_id: impl Into<String>, result: EvalResult) -> Self {
        Self {
            engine_id: engine_id.into(),
            text: result.text,
            is_secret: result.secret,
            is_empty_dice: result.rands.is_empty(),
            is_success: result.success,
            is_failure: result.failure,
            is_critical: result.critical,
            is_fumble: result.fumble,
            is_dice_roll_table: false,
            table_name: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Fold another iteration into this one: text appends, flags OR except
    /// failure and empty-dice which AND. The latest engine id wins.
    pub fn combine(mut self, other: RollOutcome) -> Self {
        self.engine_id = other.engine_id;
        self.text.push_str(&other.text);
        self.is_secret |= other.is_secret;
        self.is_empty_dice &= other.is_empty_dice;
        self.is_success |= other.is_success;
        self.is_failure &= other.is_failure;
        self.is_critical |= other.is_critical;
        self.is_fumble |= other.is_fumble;
        self
    }
}

/// A backend that evaluates roll commands for a rule system.
///
/// Engines never fail outward: transport and evaluation errors are logged
/// and come back as [`RollOutcome::empty`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiceEngine: Send + Sync {
    /// Evaluate one command once.
    async fn evaluate(&self, command: &str, system_id: &str) -> RollOutcome;

    /// Whether `command` is worth sending to this engine at all.
    async fn accepts(&self, command: &str, system_id: &str) -> bool;

    /// The generic help text followed by the system's own.
    async fn help_messages(&self, system_id: &str) -> Vec<String>;

    /// Every rule system the engine knows about.
    async fn game_systems(&self) -> Vec<GameSystemInfo>;

    /// Whether repeated iterations may be dispatched at once.
    fn is_concurrent(&self) -> bool;

    /// Sender label for result messages.
    fn label(&self) -> String;
}

/// Point system help at where users pick a system in a chat client.
pub(crate) fn adapt_help(text: &str) -> String {
    text.replace("部屋のシステム名", "チャットパレットなどのシステム名")
}
