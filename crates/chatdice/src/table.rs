// ABOUTME: User-defined roll tables: a command prefix, a dice expression, and result rows by range.
// ABOUTME: Matches chat input against the tables and renders one lookup per repeat iteration.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::{DiceEngine, RollOutcome};
use crate::format::format_roll_result;
use crate::request::RollRequest;
use crate::system::DEFAULT_SYSTEM;
use crate::width::{normalize_dashes, normalize_dice_symbols, to_half_width, unescape};

const UNNAMED: &str = "(無名のダイスボット表)";
const NO_RESULT: &str = "(結果なし)";
const NO_NUMBER: &str = "（エラー：ダイスロールから数字が取得できません）";

static TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s＞\s(?:成功数|計算結果)?(-?\d+)$").expect("valid regex")
});

static MODIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]\d+$").expect("valid regex"));

static FIXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=(-?\d+)$").expect("valid regex"));

static ROW_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+)?(?:([~-])(-?\d+)?)?$").expect("valid regex"));

/// One result row. A missing bound is open on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRow {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub result: String,
}

impl RollRow {
    pub fn contains(&self, value: i64) -> bool {
        self.start.is_none_or(|start| start <= value) && self.end.is_none_or(|end| value <= end)
    }
}

/// A named roll table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollDescriptor {
    pub name: String,
    /// Prefix that triggers the table. Tables without one never match.
    pub command: Option<String>,
    pub dice: String,
    pub rows: Vec<RollRow>,
    /// Editor text, one `range:result` per line. Used when `rows` is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl RollDescriptor {
    /// Rows in declared order.
    pub fn resolved_rows(&self) -> Vec<RollRow> {
        match (&self.table, self.rows.is_empty()) {
            (Some(text), true) => parse_rows(text),
            _ => self.rows.clone(),
        }
    }
}

/// Parse editor text into rows. Lines without a usable range are skipped.
///
/// Ranges are `N`, `N-M`, `N~M`, `~M`, or `N~`, full-width accepted.
pub fn parse_rows(text: &str) -> Vec<RollRow> {
    text.lines()
        .filter_map(|line| {
            let (range, result) = line.split_once([':', '：'])?;
            let (start, end) = parse_range(range)?;
            Some(RollRow {
                start,
                end,
                result: result.trim().to_string(),
            })
        })
        .collect()
}

fn parse_range(range: &str) -> Option<(Option<i64>, Option<i64>)> {
    let range: String = to_half_width(&normalize_dashes(range))
        .chars()
        .map(|c| if c == '〜' { '~' } else { c })
        .filter(|c| !c.is_whitespace())
        .collect();
    let caps = ROW_RANGE.captures(&range)?;
    let start = caps.get(1).and_then(|m| m.as_str().parse().ok());
    let end = caps.get(3).and_then(|m| m.as_str().parse().ok());
    match (start, caps.get(2), end) {
        (None, _, None) => None,
        (Some(n), None, _) => Some((Some(n), Some(n))),
        bounds => Some((bounds.0, bounds.2)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lookup {
    /// Roll the table's dice, adjusted by an optional `+N`/`-N`.
    Roll(Option<(i64, String)>),
    /// `=N`: look up `N` directly.
    Fixed(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TableMatch {
    secret: bool,
    lookup: Lookup,
}

fn fold(text: &str) -> String {
    to_half_width(&normalize_dashes(text)).trim().to_uppercase()
}

/// The text after `prefix`, when `prefix` ends at a word boundary.
fn strip_command<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(prefix)?;
    match rest.chars().next() {
        None | Some(' ' | '=' | '+' | '-') => Some(rest),
        _ => None,
    }
}

fn match_command(descriptor: &RollDescriptor, expression: &str) -> Option<TableMatch> {
    let prefix = fold(descriptor.command.as_deref()?);
    if prefix.is_empty() {
        return None;
    }
    let text = fold(expression);

    let (secret, rest) = match strip_command(&text, &format!("S{}", prefix)) {
        Some(rest) => (true, rest),
        None => (false, strip_command(&text, &prefix)?),
    };

    let suffix = rest.split(' ').next().unwrap_or_default();
    let lookup = if suffix.is_empty() {
        Lookup::Roll(None)
    } else if MODIFIER.is_match(suffix) {
        Lookup::Roll(Some((suffix.parse().ok()?, suffix.to_string())))
    } else if let Some(caps) = FIXED.captures(suffix) {
        Lookup::Fixed(caps[1].parse().ok()?)
    } else {
        return None;
    };
    Some(TableMatch { secret, lookup })
}

/// The integer total at the end of an engine trace.
fn extract_total(text: &str) -> Option<i64> {
    TOTAL.captures(text)?.get(1)?.as_str().parse().ok()
}

/// Look `request` up in the first table whose command it starts with.
///
/// Returns `None` when no table matches. The outcome text is already
/// formatted for display.
pub async fn roll_table(
    engine: &dyn DiceEngine,
    tables: &[RollDescriptor],
    request: &RollRequest,
) -> Option<RollOutcome> {
    let (descriptor, matched) = tables
        .iter()
        .find_map(|d| match_command(d, &request.expression).map(|m| (d, m)))?;
    tracing::debug!(table = %descriptor.name, "roll table matched");

    let mut outcome = RollOutcome {
        is_secret: matched.secret || request.is_secret,
        is_failure: false,
        is_dice_roll_table: true,
        table_name: Some(if descriptor.name.is_empty() {
            UNNAMED.to_string()
        } else {
            descriptor.name.clone()
        }),
        ..RollOutcome::empty(DEFAULT_SYSTEM)
    };

    let rows = descriptor.resolved_rows();
    let dice = normalize_dice_symbols(to_half_width(&descriptor.dice).trim());
    let mut lines = Vec::new();

    for i in 1..=request.iterations() {
        let (value, trace) = match &matched.lookup {
            Lookup::Fixed(n) => (Some(*n), format!("指定={}", n)),
            Lookup::Roll(modifier) => {
                let rolled = engine.evaluate(&dice, DEFAULT_SYSTEM).await;
                outcome.is_empty_dice &= rolled.is_empty_dice;
                let adjust = modifier.as_ref().map_or(0, |(n, _)| *n);
                let value = extract_total(&rolled.text).map(|total| total + adjust);

                let mut trace = format_roll_result(&rolled.text, DEFAULT_SYSTEM);
                if let (Some((_, text)), Some(value)) = (modifier, value) {
                    trace.push_str(&format!(" (修正{}) → {}", text, value));
                }
                (value, trace)
            }
        };

        let mut line = match value {
            Some(value) => {
                let body = rows
                    .iter()
                    .find(|row| row.contains(value))
                    .map_or_else(|| NO_RESULT.to_string(), |row| unescape(&row.result));
                format!("{}\n{}", trace, body)
            }
            None => {
                outcome.is_failure = true;
                format!("{}\n{}", NO_NUMBER, NO_RESULT)
            }
        };
        if request.repeat > 1 {
            line.push_str(&format!(" #{}", i));
        }
        lines.push(line);
    }

    outcome.text = lines.join("\n");
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::engine::MockDiceEngine;
    use crate::request::parse_request;

    fn table() -> RollDescriptor {
        RollDescriptor {
            name: "Weather".to_string(),
            command: Some("X".to_string()),
            dice: "1d6".to_string(),
            rows: vec![
                RollRow {
                    start: Some(1),
                    end: Some(3),
                    result: "low".to_string(),
                },
                RollRow {
                    start: Some(4),
                    end: Some(6),
                    result: "high".to_string(),
                },
            ],
            table: None,
        }
    }

    fn rolling(text: &'static str) -> MockDiceEngine {
        let mut engine = MockDiceEngine::new();
        engine
            .expect_evaluate()
            .with(eq("1d6"), eq(DEFAULT_SYSTEM))
            .returning(move |_, _| RollOutcome {
                text: text.to_string(),
                is_empty_dice: false,
                is_failure: false,
                ..RollOutcome::empty(DEFAULT_SYSTEM)
            });
        engine
    }

    fn never() -> MockDiceEngine {
        let mut engine = MockDiceEngine::new();
        engine.expect_evaluate().never();
        engine
    }

    async fn roll(engine: &MockDiceEngine, text: &str) -> Option<RollOutcome> {
        roll_table(engine, &[table()], &parse_request(text)).await
    }

    #[tokio::test]
    async fn test_rolls_the_table_dice() {
        let outcome = roll(&rolling("(1D6) ＞ 5"), "X").await.unwrap();
        assert!(outcome.text.ends_with("\nhigh"));
        assert!(outcome.is_dice_roll_table);
        assert_eq!(outcome.table_name.as_deref(), Some("Weather"));
        assert!(!outcome.is_secret && !outcome.is_failure && !outcome.is_empty_dice);
    }

    #[tokio::test]
    async fn test_fixed_reference_skips_the_engine() {
        let outcome = roll(&never(), "X=3").await.unwrap();
        assert_eq!(outcome.text, "指定=3\nlow");
        assert!(outcome.is_empty_dice);

        let outcome = roll(&never(), "x=4").await.unwrap();
        assert_eq!(outcome.text, "指定=4\nhigh");
    }

    #[tokio::test]
    async fn test_secret_prefix_and_modifier() {
        let outcome = roll(&rolling("(1D6) ＞ 2"), "SX+2 comment").await.unwrap();
        assert!(outcome.is_secret);
        assert!(outcome.text.ends_with(" (修正+2) → 4\nhigh"));
    }

    #[tokio::test]
    async fn test_full_width_and_dashes() {
        let outcome = roll(&rolling("(1D6) ＞ 5"), "Ｘー２").await.unwrap();
        assert!(outcome.text.ends_with(" (修正-2) → 3\nlow"));
    }

    #[tokio::test]
    async fn test_prefix_must_end_at_boundary() {
        assert_eq!(roll(&never(), "XY").await, None);
        assert_eq!(roll(&never(), "X*2").await, None);
        assert_eq!(roll(&never(), "X+a").await, None);
        assert!(roll(&rolling("(1D6) ＞ 1"), "X please").await.is_some());
    }

    #[tokio::test]
    async fn test_no_matching_row() {
        let outcome = roll(&never(), "X=9").await.unwrap();
        assert_eq!(outcome.text, "指定=9\n(結果なし)");
        assert!(!outcome.is_failure);
    }

    #[tokio::test]
    async fn test_no_number_in_trace() {
        let outcome = roll(&rolling(""), "X").await.unwrap();
        assert_eq!(
            outcome.text,
            "（エラー：ダイスロールから数字が取得できません）\n(結果なし)"
        );
        assert!(outcome.is_failure);
    }

    #[tokio::test]
    async fn test_repeat_iterations() {
        let outcome = roll(&never(), "2 X=1").await.unwrap();
        assert_eq!(outcome.text, "指定=1\nlow #1\n指定=1\nlow #2");
    }

    #[tokio::test]
    async fn test_secret_repeat_keyword() {
        let outcome = roll(&never(), "SX2 X=5").await.unwrap();
        assert!(outcome.is_secret);
    }

    #[tokio::test]
    async fn test_first_matching_table_wins() {
        let mut second = table();
        second.name = String::new();
        let mut first = table();
        first.command = Some("Y".to_string());
        let outcome = roll_table(&never(), &[first, second], &parse_request("X=1"))
            .await
            .unwrap();
        assert_eq!(outcome.table_name.as_deref(), Some("(無名のダイスボット表)"));
    }

    #[test]
    fn test_overlapping_rows_first_declared_wins() {
        let rows = parse_rows("1-4:first\n3-6:second");
        assert_eq!(rows.iter().find(|r| r.contains(3)).unwrap().result, "first");
        assert_eq!(rows.iter().find(|r| r.contains(5)).unwrap().result, "second");
    }

    #[test]
    fn test_parse_rows() {
        let rows = parse_rows("1:one\n２～３：two\n~0:low\n10~:high\nnot a row\n4-5:a:b");
        assert_eq!(
            rows,
            vec![
                RollRow { start: Some(1), end: Some(1), result: "one".to_string() },
                RollRow { start: Some(2), end: Some(3), result: "two".to_string() },
                RollRow { start: None, end: Some(0), result: "low".to_string() },
                RollRow { start: Some(10), end: None, result: "high".to_string() },
                RollRow { start: Some(4), end: Some(5), result: "a:b".to_string() },
            ]
        );
    }

    #[test]
    fn test_descriptor_from_editor_text() {
        let descriptor: RollDescriptor = serde_json::from_str(
            r#"{"name":"Loot","command":"LOOT","dice":"1d3","table":"1:coin\n2-3:gem"}"#,
        )
        .unwrap();
        assert_eq!(descriptor.resolved_rows().len(), 2);
    }

    #[test]
    fn test_extract_total() {
        assert_eq!(extract_total("(2D6) ＞ 7[3,4] ＞ 7"), Some(7));
        assert_eq!(extract_total("(3B6>=4) ＞ 2,5,6 ＞ 成功数2"), Some(2));
        assert_eq!(extract_total("C(1-5) ＞ 計算結果-4"), Some(-4));
        assert_eq!(extract_total("(2D6) ＞ 7 ＞ 成功"), None);
    }
}
