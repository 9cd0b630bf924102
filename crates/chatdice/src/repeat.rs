// ABOUTME: Runs one command several times against a dice engine and folds the iterations.
// ABOUTME: Concurrent engines get every iteration at once; sequential ones stop at the first blank.

use futures_util::future::join_all;

use crate::engine::{DiceEngine, RollOutcome};
use crate::request::MAX_REPEAT;

/// Roll `command` up to `repeat` times (capped at 32) and reduce the results.
///
/// With more than one iteration each result is tagged ` #i` on its own
/// line. The combined text is right-trimmed.
pub async fn roll_repeated(
    engine: &dyn DiceEngine,
    command: &str,
    system_id: &str,
    repeat: u32,
) -> RollOutcome {
    let iterations = repeat.min(MAX_REPEAT);
    let tag = |mut outcome: RollOutcome, i: u32| {
        if repeat > 1 && !outcome.is_empty() {
            outcome.text.push_str(&format!(" #{}\n", i));
        }
        outcome
    };

    let mut combined = RollOutcome::empty(system_id);
    if engine.is_concurrent() {
        let outcomes = join_all((1..=iterations).map(|_| engine.evaluate(command, system_id))).await;
        for (i, outcome) in (1..).zip(outcomes) {
            combined = combined.combine(tag(outcome, i));
        }
    } else {
        for i in 1..=iterations {
            let outcome = engine.evaluate(command, system_id).await;
            if outcome.is_empty() {
                break;
            }
            combined = combined.combine(tag(outcome, i));
        }
    }

    combined.text.truncate(combined.text.trim_end().len());
    combined
}
