// ABOUTME: Annotates raw roll traces for display: die icons, arrows, struck and highlighted dice.
// ABOUTME: A generic pass handles sum/counting/reroll/upper dice; a few rule systems add their own passes.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::ast::{Compare, Condition};
use crate::roller::STAGE;

/// Marks a dice expression.
pub const DIE: &str = "🎲";

fn struck(value: impl std::fmt::Display) -> String {
    format!("~~~{}~~~", value)
}

fn emphasized(value: impl std::fmt::Display) -> String {
    format!("###{}###", value)
}

macro_rules! regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($pattern).expect("valid regex"));
    };
}

regex!(FRAGMENT, r"\s＞\s");
regex!(ARROW, r"(\s|^)＞\s");
regex!(TRUNCATED_DICE, r"(?i)\((\d+)(D)(\d+)＞(\d)");

regex!(FAR_LINE, r"^\d+(?::?回目|次|번째): ＞");
regex!(BONUS_DICE, r"(?:ボーナス・ペナルティダイス|獎勵.懲罰骰.|보너스, 패널티 주사위)\[(-?\d+)\]");
regex!(BONUS_HEAD, r"\d\) (?:ボーナス・ペナルティダイス|獎勵.懲罰骰.|보너스, 패널티 주사위)\[-?\d+\]");
regex!(FAULT_HEAD, r"\d\) (?:故障ナンバー|故障率|고장넘버)\[-?\d+\]");
regex!(PERCENTILE_HEAD, r"(?i)\((1D100<=\d+)\) ");

regex!(DICE_HEAD, r"(?i)^(?:: )?\(([A-Z\d+\-*/=(),\[\]<>@#$?]+)\)$");
regex!(CHOICE_HEAD, r"(?i)^(?:: )?\((CHOICE(?:\d+)?[\[( ].+)\)$");

regex!(ADD_DICE, r"(?i)(\d+)D\d+(?:([KD][HL])(\d+))?");
regex!(
    COUNTING_DICE,
    r"(?i)\d+B\d+(?:\+\d+B\d+)*(?:\[6\]Limit\[\d+\])?(<=|>=|<>|==|!=|<|>|=)(\d+)"
);
regex!(
    REROLL_DICE,
    r"(?i)\d+R\d+(?:\+\d+R\d+)*\[(<=|>=|<>|==|!=|<|>|=)?(\d+)\](?:(<=|>=|<>|==|!=|<|>|=)(\d+))?"
);
regex!(
    UPPER_DICE,
    r"(?i)\d+U\d+(?:\+\d+U\d+)*\[(\d+)\]([-+]\d+)?(?:(<=|>=|<>|==|!=|<|>|=)(\d+))?"
);

regex!(SUM_VALUES, r"(\d+)\[(\d+(?:,\d+)*)?\]");
regex!(UPPER_VALUES, r"(?:(\d+)\[(\d+(?:,\d+)*)?\])|([-+]\d+)|(\d+)");
regex!(VALUE_LIST, r"\d+(?:,\d+)*");

regex!(BLADE_HEAD, r"(?i)^\(\d+A(\d+)C(\d+)F(\d+)\)$");
regex!(NUMBER_LIST, r"(?:\d+, )*\d+");
regex!(DX_HEAD, r"(?i)\(\d+DX(\d+)");
regex!(DX_TERM, r"(\d{1,2})\[(\d{1,2}(?:,\d{1,2})*)\]");
regex!(DND_CHOSEN, r"\[(\d+(?:,\d+)*)?\]([-+]\d+)?");
regex!(DND_ATTACK, r"^(\d+)?([-+]\d+)?");
regex!(LEADING_INT, r"^[+-]?\d+");

/// Rule systems with their own annotation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSystemKind {
    Generic,
    Cthulhu,
    Cthulhu7th,
    BladeOfArcana,
    DoubleCross,
    DungeonsAndDragons5,
}

impl RuleSystemKind {
    /// Classify a system id. Language suffixes (`Cthulhu:Korean`) are ignored.
    pub fn from_id(id: &str) -> Self {
        match id.split(':').next().unwrap_or_default() {
            "Cthulhu" => Self::Cthulhu,
            "Cthulhu7th" => Self::Cthulhu7th,
            "BladeOfArcana" => Self::BladeOfArcana,
            "DoubleCross" => Self::DoubleCross,
            "DungeonsAndDragons5" => Self::DungeonsAndDragons5,
            _ => Self::Generic,
        }
    }
}

/// Dice groups recognized in a trace header.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DiceGroup {
    None,
    /// `NdM`, one entry per group in the header.
    Add(Vec<AddDice>),
    /// `NbM` with a target per die.
    Counting(Condition),
    /// `NrM[t]` with an optional overall target.
    Reroll {
        reroll: Condition,
        target: Option<Condition>,
    },
    /// `NuM[t]` with an optional modifier and target.
    Upper {
        threshold: i64,
        modifier: i64,
        target: Option<Condition>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AddDice {
    count: i64,
    keep_drop: Option<(String, i64)>,
}

fn condition(symbol: Option<regex::Match<'_>>, value: Option<regex::Match<'_>>) -> Option<Condition> {
    Some(Condition {
        compare: Compare::from_symbol(symbol?.as_str())?,
        value: value?.as_str().parse().ok()?,
    })
}

/// Annotate a roll trace for `system_id`.
pub fn format_roll_result(text: &str, system_id: &str) -> String {
    let mut formatter = Formatter {
        kind: RuleSystemKind::from_id(system_id),
        far_rolls: 0,
        bonus_dice: 0,
    };
    text.split('\n')
        .map(|line| formatter.line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-message state. Bonus/penalty tracking spans lines.
struct Formatter {
    kind: RuleSystemKind,
    far_rolls: i64,
    bonus_dice: i64,
}

impl Formatter {
    fn line(&mut self, line: &str) -> String {
        let mut line = line.to_string();
        if self.kind == RuleSystemKind::Cthulhu7th && FAR_LINE.is_match(&line) {
            self.far_rolls += 1;
            line.insert_str(0, DIE);
        }

        let fragments: Vec<&str> = FRAGMENT.split(&line).collect();
        let last = fragments.len() - 1;
        let mut group = DiceGroup::None;
        let mut rewritten = Vec::with_capacity(fragments.len());

        for (i, &fragment) in fragments.iter().enumerate() {
            if self.kind == RuleSystemKind::Cthulhu7th {
                if let Some(n) = BONUS_DICE
                    .captures(fragment)
                    .and_then(|caps| caps[1].parse::<i64>().ok())
                {
                    self.bonus_dice = n;
                }
            }

            let text = if last == 0 || (i == last && i != 0) {
                fragment.to_string()
            } else if i == 0 {
                let (text, detected) = self.head(fragment);
                group = detected;
                text
            } else if i == 1 && group != DiceGroup::None {
                rewrite_values(fragment, &group).unwrap_or_else(|| fragment.to_string())
            } else {
                self.bespoke(i, fragment, fragments[0])
            };
            rewritten.push(text);
        }

        let joined = rewritten.join(STAGE);
        let arrows = ARROW.replace_all(&joined, "${1}→ ");
        TRUNCATED_DICE
            .replace_all(&arrows, format!("({}${{1}}${{2}}${{3}}→${{4}}", DIE).as_str())
            .into_owned()
    }

    fn head(&self, fragment: &str) -> (String, DiceGroup) {
        if (self.kind == RuleSystemKind::Cthulhu && FAULT_HEAD.is_match(fragment))
            || (self.kind == RuleSystemKind::Cthulhu7th && BONUS_HEAD.is_match(fragment))
        {
            let stripped = PERCENTILE_HEAD.replace(fragment, "${1} ");
            return (format!("{}{}", DIE, stripped), DiceGroup::None);
        }

        let inner = DICE_HEAD
            .captures(fragment)
            .or_else(|| CHOICE_HEAD.captures(fragment))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str());
        let Some(inner) = inner else {
            return (fragment.to_string(), DiceGroup::None);
        };

        let group = if inner.to_uppercase().starts_with("CHOICE") {
            DiceGroup::None
        } else {
            detect_group(fragment)
        };
        (format!("{}{}", DIE, inner), group)
    }

    fn bespoke(&self, i: usize, fragment: &str, head: &str) -> String {
        let rewritten = match self.kind {
            RuleSystemKind::BladeOfArcana if i == 1 || i == 2 => blade_of_arcana(fragment, head),
            RuleSystemKind::Cthulhu7th if i == 1 || i == 2 => Some(self.bonus_penalty(fragment)),
            RuleSystemKind::DoubleCross if i == 1 => double_cross(fragment, head),
            RuleSystemKind::DungeonsAndDragons5
                if i == 1 && (head.starts_with("(AT") || head.starts_with("(AR")) =>
            {
                dungeons_and_dragons(fragment, head)
            }
            _ => None,
        };
        rewritten.unwrap_or_else(|| fragment.to_string())
    }

    /// Keep the best (bonus) or worst (penalty) tens die and strike the rest.
    fn bonus_penalty(&self, fragment: &str) -> String {
        let previous_rolls = (self.far_rolls - 1).max(0);
        let bonus = self.bonus_dice - previous_rolls >= 0;

        NUMBER_LIST
            .replace(fragment, |caps: &Captures<'_>| {
                let numbers: Vec<i64> = caps[0]
                    .split(',')
                    .filter_map(|n| n.trim().parse().ok())
                    .collect();
                let chosen = if bonus {
                    numbers.iter().min()
                } else {
                    numbers.iter().max()
                }
                .copied();

                let mut kept = false;
                numbers
                    .iter()
                    .map(|&n| {
                        let text = if n == 1 { emphasized(n) } else { n.to_string() };
                        if numbers.len() == 1 || (!kept && Some(n) == chosen) {
                            kept = true;
                            text
                        } else {
                            struck(text)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .into_owned()
    }
}

fn detect_group(fragment: &str) -> DiceGroup {
    let adds: Vec<AddDice> = ADD_DICE
        .captures_iter(fragment)
        .map(|caps| AddDice {
            count: caps[1].parse().unwrap_or(0),
            keep_drop: caps.get(2).map(|kind| {
                let n = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
                (kind.as_str().to_uppercase(), n)
            }),
        })
        .collect();
    if !adds.is_empty() {
        return DiceGroup::Add(adds);
    }

    if let Some(target) = COUNTING_DICE
        .captures(fragment)
        .and_then(|caps| condition(caps.get(1), caps.get(2)))
    {
        return DiceGroup::Counting(target);
    }

    if let Some(caps) = REROLL_DICE.captures(fragment) {
        let target = condition(caps.get(3), caps.get(4));
        let compare = caps
            .get(1)
            .and_then(|m| Compare::from_symbol(m.as_str()))
            .or(target.map(|t| t.compare))
            .unwrap_or(Compare::GreaterOrEqual);
        let value = caps[2].parse().unwrap_or(0);
        return DiceGroup::Reroll {
            reroll: Condition { compare, value },
            target,
        };
    }

    if let Some(caps) = UPPER_DICE.captures(fragment) {
        return DiceGroup::Upper {
            threshold: caps[1].parse().unwrap_or(0),
            modifier: caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0),
            target: condition(caps.get(3), caps.get(4)),
        };
    }

    DiceGroup::None
}

/// Replace each match of `pattern` in turn, searching forward from the last
/// replacement. `None` from `place` abandons the whole rewrite.
fn splice(
    fragment: &str,
    pattern: &Regex,
    mut place: impl FnMut(usize, &Captures<'_>) -> Option<String>,
) -> Option<String> {
    let mut out = fragment.to_string();
    let mut offset = 0;
    for (j, caps) in pattern.captures_iter(fragment).enumerate() {
        let matched = caps.get(0)?.as_str();
        let replacement = place(j, &caps)?;
        let at = offset + out.get(offset..)?.find(matched)?;
        if replacement != matched {
            out.replace_range(at..at + matched.len(), &replacement);
        }
        offset = at + replacement.len();
    }
    Some(out)
}

fn parse_list(list: &str) -> Option<Vec<i64>> {
    list.split(',').map(|n| n.trim().parse().ok()).collect()
}

fn rewrite_values(fragment: &str, group: &DiceGroup) -> Option<String> {
    match group {
        DiceGroup::None => Some(fragment.to_string()),
        DiceGroup::Add(adds) => splice(fragment, &SUM_VALUES, |j, caps| {
            let add = adds.get(j)?;
            let Some((kind, n)) = &add.keep_drop else {
                return Some(caps[0].to_string());
            };
            let mut dice: Vec<&str> = caps
                .get(2)
                .map_or_else(Vec::new, |m| m.as_str().split(',').collect());
            dice.sort_by_key(|d| d.parse::<i64>().unwrap_or(0));

            let keep = if kind.starts_with('K') { *n } else { add.count - n };
            let descending = kind == "KH" || kind == "DL";
            if descending {
                dice.reverse();
            }
            let mut marked: Vec<String> = (1..)
                .zip(&dice)
                .map(|(k, d)| if k <= keep { d.to_string() } else { struck(d) })
                .collect();
            if kind.starts_with('D') {
                marked.reverse();
            }
            Some(format!("{}[{}]", &caps[1], marked.join(",")))
        }),
        DiceGroup::Counting(target) => splice(fragment, &VALUE_LIST, |_, caps| {
            let dice = parse_list(&caps[0])?;
            Some(
                dice.iter()
                    .map(|&d| if target.check(d) { d.to_string() } else { struck(d) })
                    .collect::<Vec<_>>()
                    .join(","),
            )
        }),
        DiceGroup::Reroll { reroll, target } => splice(fragment, &VALUE_LIST, |_, caps| {
            let dice = parse_list(&caps[0])?;
            Some(
                dice.iter()
                    .map(|&d| {
                        let text = if reroll.check(d) { emphasized(d) } else { d.to_string() };
                        if target.is_some_and(|t| !t.check(d)) {
                            struck(text)
                        } else {
                            text
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(","),
            )
        }),
        DiceGroup::Upper {
            threshold,
            modifier,
            target,
        } => splice(fragment, &UPPER_VALUES, |_, caps| {
            let mark = |d: i64| {
                if d >= *threshold {
                    emphasized(d)
                } else {
                    d.to_string()
                }
            };
            let fails = |total: i64| target.is_some_and(|t| !t.check(total + modifier));

            if let Some(m) = caps.get(3) {
                return Some(format!(" ({})", m.as_str()));
            }
            let (total, text) = match caps.get(1) {
                Some(total) => {
                    let dice = parse_list(caps.get(2)?.as_str())?;
                    let marked: Vec<String> = dice.into_iter().map(mark).collect();
                    let total: i64 = total.as_str().parse().ok()?;
                    (total, format!("{}[{}]", total, marked.join(",")))
                }
                None => {
                    let die: i64 = caps.get(4)?.as_str().parse().ok()?;
                    (die, mark(die))
                }
            };
            Some(if fails(total) { struck(text) } else { text })
        }),
    }
}

fn leading_int(text: &str) -> Option<i64> {
    LEADING_INT.find(text.trim())?.as_str().parse().ok()
}

/// Highlight ones and fumbles, strike dice over the difficulty.
fn blade_of_arcana(fragment: &str, head: &str) -> Option<String> {
    let caps = BLADE_HEAD.captures(head)?;
    let difficulty: i64 = caps[1].parse().ok()?;
    let critical: i64 = caps[2].parse().ok()?;
    let fumble: i64 = caps[3].parse().ok()?;

    Some(
        fragment
            .split(',')
            .map(|die| match leading_int(die) {
                Some(1) => emphasized(1),
                Some(n) if n >= fumble => struck(emphasized(n)),
                Some(n) if n <= critical => emphasized(n),
                Some(n) if n > difficulty => struck(n),
                _ => die.to_string(),
            })
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Mark dice at or over the critical value in each `+`-joined term.
fn double_cross(fragment: &str, head: &str) -> Option<String> {
    let critical: i64 = DX_HEAD.captures(head)?[1].parse().ok()?;

    let terms: Vec<String> = fragment
        .split('+')
        .map(|term| {
            let Some(caps) = DX_TERM.captures(term) else {
                return term.to_string();
            };
            let dice: Vec<&str> = caps[2].split(',').collect();
            let mut is_critical = false;
            let marked: Vec<String> = dice
                .iter()
                .enumerate()
                .map(|(k, &d)| {
                    if d.parse::<i64>().is_ok_and(|n| n >= critical) {
                        is_critical = true;
                        emphasized(d)
                    } else if k == dice.len() - 1 {
                        d.to_string()
                    } else {
                        struck(d)
                    }
                })
                .collect();
            let result = if is_critical {
                emphasized(&caps[1])
            } else {
                caps[1].to_string()
            };
            format!("{}[{}]", result, marked.join(","))
        })
        .collect();
    Some(terms.join("+"))
}

/// Strike the unused d20 of an advantage roll and highlight natural 20s and 1s on attacks.
fn dungeons_and_dragons(fragment: &str, head: &str) -> Option<String> {
    let attack = head.starts_with("(AT");
    let advantage = head.ends_with("A)");
    let disadvantage = head.ends_with("D)");
    let natural = |n: i64| attack && (n == 20 || n == 1);

    if advantage || disadvantage {
        let caps = DND_CHOSEN.captures(fragment)?;
        let dice = parse_list(caps.get(1)?.as_str())?;
        let chosen = if advantage {
            dice.iter().max()
        } else {
            dice.iter().min()
        }
        .copied();

        let mut kept = false;
        let marked: Vec<String> = dice
            .iter()
            .map(|&n| {
                let text = if natural(n) { emphasized(n) } else { n.to_string() };
                if !kept && Some(n) == chosen {
                    kept = true;
                    text
                } else {
                    struck(text)
                }
            })
            .collect();
        let modifier = caps.get(2).map_or("", |m| m.as_str());
        return Some(format!("[{}]{}", marked.join(","), modifier));
    }

    if attack {
        let caps = DND_ATTACK.captures(fragment)?;
        let die = caps.get(1)?;
        if die.as_str().parse::<i64>().is_ok_and(natural) {
            let modifier = caps.get(2).map_or("", |m| m.as_str());
            return Some(format!("{}{}", emphasized(die.as_str()), modifier));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generic(text: &str) -> String {
        format_roll_result(text, "DiceBot")
    }

    #[test]
    fn test_kind_from_id() {
        assert_eq!(RuleSystemKind::from_id("Cthulhu7th"), RuleSystemKind::Cthulhu7th);
        assert_eq!(RuleSystemKind::from_id("Cthulhu:Korean"), RuleSystemKind::Cthulhu);
        assert_eq!(RuleSystemKind::from_id("SwordWorld2.5"), RuleSystemKind::Generic);
    }

    #[test]
    fn test_sum_dice() {
        assert_eq!(
            generic("(2D6+1) ＞ 7[3,4]+1 ＞ 8"),
            "🎲2D6+1 → 7[3,4]+1 → 8"
        );
        assert_eq!(generic("(1D100) ＞ 42"), "🎲1D100 → 42");
    }

    #[test]
    fn test_keep_highest() {
        assert_eq!(
            generic("(3D6KH2) ＞ 11[6,2,5] ＞ 11"),
            "🎲3D6KH2 → 11[6,5,~~~2~~~] → 11"
        );
    }

    #[test]
    fn test_drop_lowest() {
        assert_eq!(
            generic("(4D6DL1) ＞ 14[1,5,3,6] ＞ 14"),
            "🎲4D6DL1 → 14[~~~1~~~,3,5,6] → 14"
        );
    }

    #[test]
    fn test_counting_dice() {
        assert_eq!(
            generic("(3B6>=4) ＞ 2,5,6 ＞ 成功数2"),
            "🎲3B6>=4 → ~~~2~~~,5,6 → 成功数2"
        );
    }

    #[test]
    fn test_reroll_dice() {
        assert_eq!(
            generic("(3R6[5]>=4) ＞ 2,5,6 + 5 ＞ 成功数3"),
            "🎲3R6[5]>=4 → ~~~2~~~,###5###,###6### + ###5### → 成功数3"
        );
    }

    #[test]
    fn test_reroll_without_target_strikes_nothing() {
        assert_eq!(
            generic("(2R6[6]) ＞ 6,2 + 3 ＞ 11"),
            "🎲2R6[6] → ###6###,2 + 3 → 11"
        );
    }

    #[test]
    fn test_upper_dice() {
        assert_eq!(
            generic("(2U6[6]+1>=8) ＞ 9[6,3],4+1 ＞ 10"),
            "🎲2U6[6]+1>=8 → 9[###6###,3],~~~4~~~ (+1) → 10"
        );
    }

    #[test]
    fn test_choice_head_keeps_values() {
        assert_eq!(
            generic("(CHOICE[a,b,c]) ＞ b"),
            "🎲CHOICE[a,b,c] → b"
        );
    }

    #[test]
    fn test_v1_prefix() {
        assert_eq!(generic(": (2D6) ＞ 7[3,4] ＞ 7"), "🎲2D6 → 7[3,4] → 7");
    }

    #[test]
    fn test_plain_lines_untouched() {
        assert_eq!(generic("指定=3\nlow"), "指定=3\nlow");
        assert_eq!(generic(""), "");
    }

    #[test]
    fn test_truncated_dice() {
        assert_eq!(generic("roll (2D6＞7)"), "roll (🎲2D6→7)");
    }

    #[test]
    fn test_multiple_lines() {
        assert_eq!(
            generic("(1D6) ＞ 4 #1\n(1D6) ＞ 2 #2"),
            "🎲1D6 → 4 #1\n🎲1D6 → 2 #2"
        );
    }

    #[test]
    fn test_cthulhu_fault_number() {
        assert_eq!(
            format_roll_result("(1D100<=50) 故障ナンバー[40] ＞ 45 ＞ 成功／故障", "Cthulhu"),
            "🎲1D100<=50 故障ナンバー[40] → 45 → 成功／故障"
        );
    }

    #[test]
    fn test_cthulhu7th_bonus_and_penalty() {
        assert_eq!(
            format_roll_result(
                "(1D100<=50) ボーナス・ペナルティダイス[1] ＞ 45, 85 ＞ 45 ＞ 成功",
                "Cthulhu7th"
            ),
            "🎲1D100<=50 ボーナス・ペナルティダイス[1] → 45, ~~~85~~~ → 45 → 成功"
        );
        assert_eq!(
            format_roll_result(
                "(1D100<=50) ボーナス・ペナルティダイス[-1] ＞ 45, 85 ＞ 85 ＞ 失敗",
                "Cthulhu7th"
            ),
            "🎲1D100<=50 ボーナス・ペナルティダイス[-1] → ~~~45~~~, 85 → 85 → 失敗"
        );
    }

    #[test]
    fn test_blade_of_arcana() {
        assert_eq!(
            format_roll_result("(4A5C2F18) ＞ 1,7,3,19 ＞ 4 ＞ 成功", "BladeOfArcana"),
            "🎲4A5C2F18 → ###1###,~~~7~~~,3,~~~###19###~~~ → 4 → 成功"
        );
    }

    #[test]
    fn test_double_cross() {
        assert_eq!(
            format_roll_result("(2DX7) ＞ 10[3,7]+5[5] ＞ 15", "DoubleCross"),
            "🎲2DX7 → ###10###[~~~3~~~,###7###]+5[5] → 15"
        );
    }

    #[test]
    fn test_dnd_advantage() {
        assert_eq!(
            format_roll_result("(AT+5A) ＞ [17,4]+5 ＞ 22", "DungeonsAndDragons5"),
            "🎲AT+5A → [17,~~~4~~~]+5 → 22"
        );
        assert_eq!(
            format_roll_result("(ATD) ＞ [20,1] ＞ 1 ＞ ファンブル", "DungeonsAndDragons5"),
            "🎲ATD → [~~~###20###~~~,###1###] → 1 → ファンブル"
        );
    }

    #[test]
    fn test_dnd_natural_twenty() {
        assert_eq!(
            format_roll_result("(AT+5) ＞ 20+5 ＞ 25 ＞ クリティカル", "DungeonsAndDragons5"),
            "🎲AT+5 → ###20###+5 → 25 → クリティカル"
        );
        assert_eq!(
            format_roll_result("(AR+5) ＞ 20+5 ＞ 25", "DungeonsAndDragons5"),
            "🎲AR+5 → 20+5 → 25"
        );
    }

    #[test]
    fn test_bespoke_passes_ignore_other_systems() {
        assert_eq!(
            generic("(AT+5) ＞ 20+5 ＞ 25"),
            "🎲AT+5 → 20+5 → 25"
        );
    }
}
