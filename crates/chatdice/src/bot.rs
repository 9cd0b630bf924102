// ABOUTME: Top-level dice bot: turns one chat line into a roll outcome and a display message.
// ABOUTME: Tries the roll tables first, then normalizes the command and hands it to the dice engine.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::catalog::{build_catalog, group_catalog, GameSystemGroup};
use crate::choice::prepare_command;
use crate::engine::{DiceEngine, RollOutcome};
use crate::format::format_roll_result;
use crate::repeat::roll_repeated;
use crate::request::parse_request;
use crate::system::DEFAULT_SYSTEM;
use crate::table::{roll_table, RollDescriptor};

/// Sender label for roll table results.
pub const TABLE_LABEL: &str = "Dice-Roll Table";

/// Rolls chat commands against a dice engine and a set of roll tables.
pub struct DiceBot {
    engine: Arc<dyn DiceEngine>,
    tables: Vec<RollDescriptor>,
}

impl DiceBot {
    pub fn new(engine: Arc<dyn DiceEngine>) -> Self {
        Self {
            engine,
            tables: Vec::new(),
        }
    }

    pub fn with_tables(mut self, tables: Vec<RollDescriptor>) -> Self {
        self.tables = tables;
        self
    }

    /// Replace the roll tables. Order decides which table wins.
    pub fn set_tables(&mut self, tables: Vec<RollDescriptor>) {
        self.tables = tables;
    }

    pub fn tables(&self) -> &[RollDescriptor] {
        &self.tables
    }

    pub fn engine(&self) -> &dyn DiceEngine {
        self.engine.as_ref()
    }

    /// Interpret one chat line. `None` means the line was not a roll.
    pub async fn roll_command(&self, text: &str, system_id: &str) -> Option<RollOutcome> {
        let system_id = if system_id.is_empty() {
            DEFAULT_SYSTEM
        } else {
            system_id
        };

        let request = parse_request(text);
        if !request.is_rollable() {
            return None;
        }

        if let Some(outcome) = roll_table(self.engine(), &self.tables, &request).await {
            return Some(outcome);
        }

        let command = prepare_command(&request.expression);
        // The local patterns accept every canonical choice form, so choices
        // only bypass the remote ASCII check here.
        if !command.is_choice && !self.engine.accepts(&command.text, system_id).await {
            debug!(command = %command.text, system = system_id, "not a dice command");
            return None;
        }
        debug!(command = %command.text, system = system_id, repeat = request.repeat, "rolling");

        let mut outcome = roll_repeated(self.engine(), &command.text, system_id, request.repeat).await;
        outcome.is_secret |= request.is_secret;
        (!outcome.is_empty()).then_some(outcome)
    }

    pub async fn help_messages(&self, system_id: &str) -> Vec<String> {
        self.engine.help_messages(system_id).await
    }

    /// The engine's rule systems, ordered and grouped for a picker.
    pub async fn catalog(&self) -> Vec<GameSystemGroup> {
        group_catalog(build_catalog(&self.engine.game_systems().await))
    }

    /// The chat message announcing `outcome` on behalf of `sender`.
    pub fn message(&self, outcome: &RollOutcome, sender: &str) -> ResultMessage {
        ResultMessage::new(outcome, sender, &self.engine.label())
    }
}

/// A roll result ready for the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultMessage {
    pub from: String,
    pub name: String,
    /// Space-separated flags, e.g. `system secret success`.
    pub tag: String,
    pub text: String,
}

impl ResultMessage {
    pub fn new(outcome: &RollOutcome, sender: &str, label: &str) -> Self {
        let id = outcome.engine_id.split(':').next().unwrap_or_default();

        let mut tag = String::from("system");
        let flags = [
            (outcome.is_secret, " secret"),
            (outcome.is_empty_dice, " empty"),
            (outcome.is_success, " success"),
            (outcome.is_failure, " failure"),
            (outcome.is_critical, " critical"),
            (outcome.is_fumble, " fumble"),
        ];
        for (set, flag) in flags {
            if set {
                tag.push_str(flag);
            }
        }

        let (from, source, text) = match (&outcome.table_name, outcome.is_dice_roll_table) {
            (Some(table), true) => (TABLE_LABEL, table.as_str(), outcome.text.clone()),
            _ => (label, id, format_roll_result(&outcome.text, id)),
        };

        Self {
            from: from.to_string(),
            name: format!(
                "{} : {}{}",
                source,
                sender,
                if outcome.is_secret { " (Secret)" } else { "" }
            ),
            tag,
            text,
        }
    }
}
