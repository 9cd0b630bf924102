// ABOUTME: Dice rolling and command evaluation for the embedded engine.
// ABOUTME: Produces the "(2D6+1) ＞ 7[3,4]+1 ＞ 8" style trace that the formatter annotates.

use crate::ast::{Command, Dice, Expr, Modifier, Op, Roll};
use crate::error::{Error, Result};
use std::fmt;

/// Separator between the stages of a roll trace.
pub const STAGE: &str = " ＞ ";

pub const SUCCESS: &str = "成功";
pub const FAILURE: &str = "失敗";
pub const SUCCESS_COUNT: &str = "成功数";

/// Trait for random number generation, allowing for testing with fixed values.
pub trait Rng {
    /// Generate a random number in the range [1, max].
    fn roll(&mut self, max: u32) -> u32;
}

/// Default RNG using fastrand.
pub struct FastRng(fastrand::Rng);

impl FastRng {
    pub fn new() -> Self {
        Self(fastrand::Rng::new())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self(fastrand::Rng::with_seed(seed))
    }
}

impl Default for FastRng {
    fn default() -> Self {
        Self::new()
    }
}

impl Rng for FastRng {
    fn roll(&mut self, max: u32) -> u32 {
        self.0.u32(1..=max)
    }
}

/// Result of evaluating an arithmetic expression.
#[derive(Debug, Clone, PartialEq)]
pub struct RollResult {
    /// The total value of the expression.
    pub total: i64,
    /// The expression with each roll replaced by "sum[d1,d2,...]".
    pub interim: String,
    /// Every die drawn, as (value, sides).
    pub rands: Vec<(i64, u32)>,
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.interim, self.total)
    }
}

/// Result of a full dice command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    /// The full trace, e.g. "(2D6>=7) ＞ 9[4,5] ＞ 9 ＞ 成功".
    pub text: String,
    pub total: i64,
    pub rands: Vec<(i64, u32)>,
    /// Set when the command had a target; for sums, whether it was met.
    pub success: Option<bool>,
}

/// Evaluate an expression with a custom RNG.
pub fn evaluate_with_rng<R: Rng + ?Sized>(expr: &Expr, rng: &mut R) -> Result<RollResult> {
    let mut evaluator = Evaluator {
        rng,
        rands: Vec::new(),
    };
    let (total, interim) = evaluator.evaluate(expr)?;
    Ok(RollResult {
        total,
        interim,
        rands: evaluator.rands,
    })
}

/// Roll a parsed command and build its trace.
pub fn roll_command<R: Rng + ?Sized>(command: &Command, rng: &mut R) -> Result<CommandResult> {
    let mut stages = vec![format!("({})", command)];

    match command {
        Command::Sum { expr, target } => {
            let result = evaluate_with_rng(expr, rng)?;
            let single_die = matches!(
                expr,
                Expr::Roll(Roll { dice: Dice { count: 1, .. }, modifier: None })
            );
            if !single_die && result.interim != result.total.to_string() {
                stages.push(result.interim);
            }
            stages.push(result.total.to_string());

            let success = target.map(|t| t.check(result.total));
            if let Some(success) = success {
                stages.push(if success { SUCCESS } else { FAILURE }.to_string());
            }
            Ok(CommandResult {
                text: stages.join(STAGE),
                total: result.total,
                rands: result.rands,
                success,
            })
        }
        Command::Count { groups, target } => {
            let mut rands = Vec::new();
            for group in groups {
                for _ in 0..group.count {
                    rands.push((i64::from(rng.roll(group.sides)), group.sides));
                }
            }
            let values: Vec<String> = rands.iter().map(|(v, _)| v.to_string()).collect();
            stages.push(values.join(","));

            let total: i64 = match target {
                Some(t) => {
                    let count = rands.iter().filter(|(v, _)| t.check(*v)).count() as i64;
                    stages.push(format!("{}{}", SUCCESS_COUNT, count));
                    count
                }
                None => rands.iter().map(|(v, _)| v).sum(),
            };
            Ok(CommandResult {
                text: stages.join(STAGE),
                total,
                rands,
                success: None,
            })
        }
    }
}

struct Evaluator<'a, R: Rng + ?Sized> {
    rng: &'a mut R,
    rands: Vec<(i64, u32)>,
}

impl<R: Rng + ?Sized> Evaluator<'_, R> {
    fn evaluate(&mut self, expr: &Expr) -> Result<(i64, String)> {
        match expr {
            Expr::Number(n) => Ok((*n, n.to_string())),
            Expr::Roll(roll) => Ok(self.evaluate_roll(roll)),
            Expr::BinOp { op, left, right } => {
                let (l, left_text) = self.evaluate(left)?;
                let (r, right_text) = self.evaluate(right)?;
                let total = match op {
                    Op::Add => l.saturating_add(r),
                    Op::Sub => l.saturating_sub(r),
                    Op::Mul => l.saturating_mul(r),
                    Op::Div => floor_div(l, r)?,
                };
                Ok((total, format!("{}{}{}", left_text, op, right_text)))
            }
            Expr::Neg(inner) => {
                let (value, text) = self.evaluate(inner)?;
                Ok((value.saturating_neg(), format!("-{}", text)))
            }
            Expr::Group(inner) => {
                let (value, text) = self.evaluate(inner)?;
                Ok((value, format!("({})", text)))
            }
        }
    }

    fn evaluate_roll(&mut self, roll: &Roll) -> (i64, String) {
        let Dice { count, sides } = roll.dice;
        let values: Vec<i64> = (0..count)
            .map(|_| i64::from(self.rng.roll(sides)))
            .collect();
        self.rands.extend(values.iter().map(|&v| (v, sides)));

        let kept = kept_mask(&values, roll.modifier);
        let total: i64 = values
            .iter()
            .zip(&kept)
            .filter(|(_, &keep)| keep)
            .map(|(v, _)| v)
            .sum();

        let list: Vec<String> = values.iter().map(i64::to_string).collect();
        (total, format!("{}[{}]", total, list.join(",")))
    }
}

/// Which dice survive a keep/drop modifier, in roll order.
fn kept_mask(values: &[i64], modifier: Option<Modifier>) -> Vec<bool> {
    let mut kept = vec![true; values.len()];
    let Some(modifier) = modifier else {
        return kept;
    };

    // Ascending by value; ties keep roll order.
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by_key(|&i| values[i]);

    let len = values.len();
    let dropped: Vec<usize> = match modifier {
        Modifier::KeepHighest(n) => order[..len.saturating_sub(n as usize)].to_vec(),
        Modifier::KeepLowest(n) => order[(n as usize).min(len)..].to_vec(),
        Modifier::DropHighest(n) => order[len.saturating_sub(n as usize)..].to_vec(),
        Modifier::DropLowest(n) => order[..(n as usize).min(len)].to_vec(),
    };
    for i in dropped {
        kept[i] = false;
    }
    kept
}

fn floor_div(l: i64, r: i64) -> Result<i64> {
    if r == 0 {
        return Err(Error::DivisionByZero);
    }
    let q = l.wrapping_div(r);
    if l.wrapping_rem(r) != 0 && ((l < 0) != (r < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}
