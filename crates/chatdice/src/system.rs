// ABOUTME: Embedded rule systems: a capability trait plus the generic, Cthulhu, and D&D 5e systems.
// ABOUTME: Each system matches its command pattern and evaluates a command to a text trace.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ast::{Command, Compare, Condition};
use crate::error::Result;
use crate::parser::{parse, parse_command};
use crate::roller::{evaluate_with_rng, roll_command, Rng, FAILURE, STAGE, SUCCESS};

/// Identifier of the generic fallback system.
pub const DEFAULT_SYSTEM: &str = "DiceBot";

/// What a rule system produces for one evaluated command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    pub text: String,
    pub secret: bool,
    /// Every die drawn, as (value, sides).
    pub rands: Vec<(i64, u32)>,
    pub success: bool,
    pub failure: bool,
    pub critical: bool,
    pub fumble: bool,
}

/// A rule system that can evaluate dice commands.
pub trait GameSystem: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    /// Sort key as a reading in hiragana, used to order the catalog.
    fn sort_key(&self) -> &str;
    /// Matches command text this system is willing to evaluate.
    fn command_pattern(&self) -> &Regex;
    fn help_message(&self) -> &str;
    /// Evaluate one command. `Ok(None)` means the text was not a command.
    fn eval(&self, command: &str, rng: &mut dyn Rng) -> Result<Option<EvalResult>>;
}

/// Builds a fresh instance of a rule system.
pub type SystemFactory = Arc<dyn Fn() -> Arc<dyn GameSystem> + Send + Sync>;

/// Every embedded system, as (id, factory).
pub fn builtin_systems() -> Vec<(&'static str, SystemFactory)> {
    vec![
        (DEFAULT_SYSTEM, factory::<Generic>()),
        ("Cthulhu", factory::<Cthulhu>()),
        ("DungeonsAndDragons5", factory::<DungeonsAndDragons5>()),
    ]
}

fn factory<S: GameSystem + Default + 'static>() -> SystemFactory {
    Arc::new(|| Arc::new(S::default()) as Arc<dyn GameSystem>)
}

static SECRET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^S(.+)$").expect("valid regex"));

static CALC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^C\((.+)\)$").expect("valid regex"));

static CHOICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^CHOICE(\d*)(?:\[(.*)\]|\((.*)\)|\s+(.*))$").expect("valid regex")
});

static NUMBER_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("valid regex"));

static LETTER_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z])-([a-zA-Z])$").expect("valid regex"));

static GENERIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^S?(?:[+\-(]*\d|D\d|C\(|CHOICE)").expect("valid regex")
});

static CTHULHU_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^S?(?:[+\-(]*\d|D\d|C\(|CHOICE|CC)").expect("valid regex")
});

static DND5_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^S?(?:[+\-(]*\d|D\d|C\(|CHOICE|AT|AR)").expect("valid regex")
});

const GENERIC_HELP: &str = "\
【ダイスボット】チャットにダイス用の文字を入力するとダイスロールが可能
入力例）２ｄ６＋１　攻撃！
出力例）(2D6+1) → 7[3,4]+1 → 8
上記のようにダイス文字の後ろに空白を入れて発言する事も可能。
以下、使用例
　3D6+1>=9 ：3d6+1で目標値9以上かの判定
　1D100<=50 ：D100で50％目標の下方ロールの例
　4D6KH3 ：4d6の大きい方から3個を合計（KL:小さい方、DH/DL:除外）
　3B6 ：3d6のダイス目をバラバラのまま出力する（合計しない）
　10B6>=4 ：10d6を振り4以上のダイス目の個数を数える
　C(10-4*3/2+2)：C(計算式）で計算だけの実行も可能
　choice[a,b,c]：列挙した要素から一つを選択表示。ランダム攻撃対象決定などに
　choice2[a,b,c]：列挙した要素から2つを選択表示。choice[1-6] のような範囲指定も可能
　S3d6 ： 各コマンドの先頭に「S」を付けると他人結果の見えないシークレットロール
　3 1d100 ： 先頭に回数を付けると繰り返しロール（最大32回、x3 や rep3 も可）";

/// The generic system every other system delegates to.
#[derive(Debug, Default)]
pub struct Generic;

impl Generic {
    fn eval_body(&self, body: &str, rng: &mut dyn Rng) -> Result<Option<EvalResult>> {
        if let Some(caps) = CHOICE.captures(body) {
            return Ok(eval_choice(body, &caps, rng));
        }

        let token = body.split_whitespace().next().unwrap_or_default();
        if let Some(caps) = CALC.captures(token) {
            let Ok(expr) = parse(&caps[1]) else {
                return Ok(None);
            };
            if expr.has_dice() {
                return Ok(None);
            }
            let result = evaluate_with_rng(&expr, rng)?;
            return Ok(Some(EvalResult {
                text: format!("C({}){}{}", expr, STAGE, result.total),
                ..EvalResult::default()
            }));
        }

        let command = match parse_command(token) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(command = token, error = %e, "not a dice command");
                return Ok(None);
            }
        };
        if matches!(&command, Command::Sum { expr, .. } if !expr.has_dice()) {
            return Ok(None);
        }

        let result = roll_command(&command, rng)?;
        Ok(Some(EvalResult {
            text: result.text,
            rands: result.rands,
            success: result.success == Some(true),
            failure: result.success == Some(false),
            ..EvalResult::default()
        }))
    }
}

impl GameSystem for Generic {
    fn id(&self) -> &str {
        DEFAULT_SYSTEM
    }

    fn name(&self) -> &str {
        "DiceBot"
    }

    fn sort_key(&self) -> &str {
        "*たいすほつと"
    }

    fn command_pattern(&self) -> &Regex {
        &GENERIC_PATTERN
    }

    fn help_message(&self) -> &str {
        GENERIC_HELP
    }

    fn eval(&self, command: &str, rng: &mut dyn Rng) -> Result<Option<EvalResult>> {
        with_secret(command, |body| self.eval_body(body, rng))
    }
}

/// Try `command` with a leading `S` as a secret roll, then as typed.
fn with_secret(
    command: &str,
    mut eval: impl FnMut(&str) -> Result<Option<EvalResult>>,
) -> Result<Option<EvalResult>> {
    let command = command.trim();
    if let Some(caps) = SECRET.captures(command) {
        if let Some(mut result) = eval(&caps[1])? {
            result.secret = true;
            return Ok(Some(result));
        }
    }
    eval(command)
}

fn eval_choice(body: &str, caps: &regex::Captures<'_>, rng: &mut dyn Rng) -> Option<EvalResult> {
    let picks: usize = match &caps[1] {
        "" => 1,
        n => n.parse().ok()?,
    };

    let mut items: Vec<String> = if let Some(list) = caps.get(2).or_else(|| caps.get(3)) {
        list.as_str()
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    } else {
        caps.get(4)?
            .as_str()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    };
    if let [only] = items.as_slice() {
        if let Some(expanded) = expand_range(only) {
            items = expanded;
        }
    }
    if picks == 0 || picks > items.len() {
        return None;
    }

    let mut rands = Vec::with_capacity(picks);
    let mut chosen = Vec::with_capacity(picks);
    for _ in 0..picks {
        let sides = items.len() as u32;
        let index = rng.roll(sides);
        rands.push((i64::from(index), sides));
        chosen.push(items.remove(index as usize - 1));
    }

    let keyword_len = "CHOICE".len();
    let text = format!(
        "(CHOICE{}){}{}",
        &body[keyword_len..],
        STAGE,
        chosen.join(", ")
    );
    Some(EvalResult {
        text,
        rands,
        ..EvalResult::default()
    })
}

/// Expand "1-5" or "a-e" into its members; `None` if not an ascending range.
fn expand_range(item: &str) -> Option<Vec<String>> {
    if let Some(caps) = NUMBER_RANGE.captures(item) {
        let start: u32 = caps[1].parse().ok()?;
        let end: u32 = caps[2].parse().ok()?;
        if start >= end || end - start >= 1000 {
            return None;
        }
        return Some((start..=end).map(|n| n.to_string()).collect());
    }
    if let Some(caps) = LETTER_RANGE.captures(item) {
        let start = caps[1].chars().next()?;
        let end = caps[2].chars().next()?;
        if start >= end || start.is_ascii_lowercase() != end.is_ascii_lowercase() {
            return None;
        }
        return Some((start..=end).map(String::from).collect());
    }
    None
}

static CTHULHU_CHECK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^CC(?:\((\d+)\))?(?:<=(\d+))?$").expect("valid regex"));

const CTHULHU_HELP: &str = "\
c=クリティカル値 ／ f=ファンブル値 ／ s=スペシャル

1d100<=n    c・f・s全てなし（求めた値がクリティカル、ファンブル、スペシャル判定なし）
・cfs判定付き判定コマンド
CC\t 1d100ロールを行う c=1、f=100
CC<=n\t 1d100ロールを行う c=5、f=96、s=n/5
CC(x)<=n\t 1d100ロールを行う 故障ナンバーxを指定。出目がx以上なら故障";

/// Call of Cthulhu 6th edition percentile checks.
#[derive(Debug, Default)]
pub struct Cthulhu;

impl Cthulhu {
    fn check(&self, body: &str, rng: &mut dyn Rng) -> Result<Option<EvalResult>> {
        let Some(caps) = CTHULHU_CHECK.captures(body) else {
            return Generic.eval_body(body, rng);
        };
        let fault: Option<i64> = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let target: Option<i64> = caps.get(2).and_then(|m| m.as_str().parse().ok());

        let total = i64::from(rng.roll(100));
        let mut result = EvalResult {
            rands: vec![(total, 100)],
            ..EvalResult::default()
        };

        let Some(target) = target else {
            result.text = format!("(1D100){}{}", STAGE, total);
            return Ok(Some(result));
        };

        let level = if total <= target {
            result.success = true;
            if total <= 5 {
                result.critical = true;
                "決定的成功"
            } else if total <= target / 5 {
                "スペシャル"
            } else {
                SUCCESS
            }
        } else {
            result.failure = true;
            if total >= 96 {
                result.fumble = true;
                "致命的失敗"
            } else {
                FAILURE
            }
        };

        let mut header = format!("(1D100<={})", target);
        let mut outcome = level.to_string();
        if let Some(fault) = fault {
            header.push_str(&format!(" 故障ナンバー[{}]", fault));
            if total >= fault {
                outcome.push_str("／故障");
            }
        }
        result.text = [header, total.to_string(), outcome].join(STAGE);
        Ok(Some(result))
    }
}

impl GameSystem for Cthulhu {
    fn id(&self) -> &str {
        "Cthulhu"
    }

    fn name(&self) -> &str {
        "クトゥルフ神話TRPG"
    }

    fn sort_key(&self) -> &str {
        "くとうるふしんわTRPG"
    }

    fn command_pattern(&self) -> &Regex {
        &CTHULHU_PATTERN
    }

    fn help_message(&self) -> &str {
        CTHULHU_HELP
    }

    fn eval(&self, command: &str, rng: &mut dyn Rng) -> Result<Option<EvalResult>> {
        with_secret(command, |body| self.check(body, rng))
    }
}

static DND5_ROLL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(AT|AR)([+-]\d+)?(?:>=(\d+))?([AD])?$").expect("valid regex")
});

const DND5_HELP: &str = "\
・攻撃ロール　AT[x][>=t][y]
　x：+-修正。省略可。
　t：敵のアーマークラス。>=を含めて省略可。
　y：有利(A), 不利(D)。省略可。
　ファンブル／失敗／成功／クリティカル を自動判定。
　例）AT AT>=10 AT+5>=18 AT-3>=16 ATA AT>=10A AT+5>=18A AT-3>=16 ATD AT>=10D AT+5>=18D AT-3>=16D
・能力値判定　AR[x][>=t][y]
　攻撃ロールと同様。失敗／成功を自動判定。
　例）AR AR>=10 AR+5>=18 AR-3>=16 ARA AR>=10A AR+5>=18A AR-3>=16 ARD AR>=10D AR+5>=18D AR-3>=16D";

/// Dungeons & Dragons 5th edition attack and ability rolls.
#[derive(Debug, Default)]
pub struct DungeonsAndDragons5;

impl DungeonsAndDragons5 {
    fn roll(&self, body: &str, rng: &mut dyn Rng) -> Result<Option<EvalResult>> {
        let Some(caps) = DND5_ROLL.captures(body) else {
            return Generic.eval_body(body, rng);
        };
        let kind = caps[1].to_uppercase();
        let attack = kind == "AT";
        let modifier: i64 = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        let target: Option<Condition> = caps
            .get(3)
            .and_then(|m| m.as_str().parse().ok())
            .map(|value| Condition {
                compare: Compare::GreaterOrEqual,
                value,
            });
        let advantage = caps.get(4).map(|m| m.as_str().to_uppercase());

        let first = i64::from(rng.roll(20));
        let mut rands = vec![(first, 20)];
        let (natural, dice_text) = match advantage.as_deref() {
            Some(ad) => {
                let second = i64::from(rng.roll(20));
                rands.push((second, 20));
                let natural = if ad == "A" {
                    first.max(second)
                } else {
                    first.min(second)
                };
                (natural, format!("[{},{}]", first, second))
            }
            None => (first, first.to_string()),
        };
        let total = natural + modifier;

        let mut header = kind;
        if let Some(m) = caps.get(2) {
            header.push_str(m.as_str());
        }
        if let Some(t) = &target {
            header.push_str(&t.to_string());
        }
        if let Some(ad) = &advantage {
            header.push_str(ad);
        }

        let modifier_text = match modifier {
            0 => String::new(),
            m => format!("{:+}", m),
        };
        let mut stages = vec![
            format!("({})", header),
            format!("{}{}", dice_text, modifier_text),
            total.to_string(),
        ];

        let mut result = EvalResult {
            rands,
            ..EvalResult::default()
        };
        if attack && natural == 20 {
            result.critical = true;
            result.success = true;
            stages.push("クリティカル".to_string());
        } else if attack && natural == 1 {
            result.fumble = true;
            result.failure = true;
            stages.push("ファンブル".to_string());
        } else if let Some(t) = target {
            let success = t.check(total);
            result.success = success;
            result.failure = !success;
            stages.push(if success { SUCCESS } else { FAILURE }.to_string());
        }
        result.text = stages.join(STAGE);
        Ok(Some(result))
    }
}

impl GameSystem for DungeonsAndDragons5 {
    fn id(&self) -> &str {
        "DungeonsAndDragons5"
    }

    fn name(&self) -> &str {
        "ダンジョンズ＆ドラゴンズ第5版"
    }

    fn sort_key(&self) -> &str {
        "たんしよんすあんとときらこんす5"
    }

    fn command_pattern(&self) -> &Regex {
        &DND5_PATTERN
    }

    fn help_message(&self) -> &str {
        DND5_HELP
    }

    fn eval(&self, command: &str, rng: &mut dyn Rng) -> Result<Option<EvalResult>> {
        with_secret(command, |body| self.roll(body, rng))
    }
}
