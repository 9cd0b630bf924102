// ABOUTME: Abstract Syntax Tree types for the embedded dice command language.
// ABOUTME: Represents sum rolls like "3D6KH2+1>=10" and counting rolls like "2B6+1B10>=4".

use std::fmt;

/// A complete dice command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Dice are summed through an arithmetic expression.
    Sum {
        expr: Expr,
        target: Option<Condition>,
    },
    /// Each die is compared individually and successes are counted.
    Count {
        groups: Vec<Dice>,
        target: Option<Condition>,
    },
}

impl Command {
    pub fn target(&self) -> Option<&Condition> {
        match self {
            Command::Sum { target, .. } | Command::Count { target, .. } => target.as_ref(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Sum { expr, .. } => write!(f, "{}", expr)?,
            Command::Count { groups, .. } => {
                for (i, group) in groups.iter().enumerate() {
                    if i > 0 {
                        write!(f, "+")?;
                    }
                    write!(f, "{}B{}", group.count, group.sides)?;
                }
            }
        }
        if let Some(target) = self.target() {
            write!(f, "{}", target)?;
        }
        Ok(())
    }
}

/// An arithmetic expression over dice and numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal number.
    Number(i64),
    /// A dice roll with an optional keep/drop modifier.
    Roll(Roll),
    /// A binary operation (e.g., addition, subtraction).
    BinOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary minus.
    Neg(Box<Expr>),
    /// A parenthesized group.
    Group(Box<Expr>),
}

impl Expr {
    /// Whether any dice are rolled when evaluating this expression.
    pub fn has_dice(&self) -> bool {
        match self {
            Expr::Number(_) => false,
            Expr::Roll(_) => true,
            Expr::BinOp { left, right, .. } => left.has_dice() || right.has_dice(),
            Expr::Neg(inner) | Expr::Group(inner) => inner.has_dice(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Roll(roll) => write!(f, "{}", roll),
            Expr::BinOp { op, left, right } => write!(f, "{}{}{}", left, op, right),
            Expr::Neg(inner) => write!(f, "-{}", inner),
            Expr::Group(inner) => write!(f, "({})", inner),
        }
    }
}

/// A group of identical dice (e.g., "2B6" or the dice part of "4D6").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dice {
    pub count: u32,
    pub sides: u32,
}

/// A sum roll expression (e.g., "4D6KH3").
#[derive(Debug, Clone, PartialEq)]
pub struct Roll {
    pub dice: Dice,
    pub modifier: Option<Modifier>,
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}D{}", self.dice.count, self.dice.sides)?;
        if let Some(modifier) = &self.modifier {
            write!(f, "{}", modifier)?;
        }
        Ok(())
    }
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Add => write!(f, "+"),
            Op::Sub => write!(f, "-"),
            Op::Mul => write!(f, "*"),
            Op::Div => write!(f, "/"),
        }
    }
}

/// A keep/drop modifier applied to a sum roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// Keep the highest N dice.
    KeepHighest(u32),
    /// Keep the lowest N dice.
    KeepLowest(u32),
    /// Drop the highest N dice.
    DropHighest(u32),
    /// Drop the lowest N dice.
    DropLowest(u32),
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::KeepHighest(n) => write!(f, "KH{}", n),
            Modifier::KeepLowest(n) => write!(f, "KL{}", n),
            Modifier::DropHighest(n) => write!(f, "DH{}", n),
            Modifier::DropLowest(n) => write!(f, "DL{}", n),
        }
    }
}

/// A comparison against a target number (e.g., ">=10").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub compare: Compare,
    pub value: i64,
}

impl Condition {
    pub fn check(&self, value: i64) -> bool {
        self.compare.check(value, self.value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.compare, self.value)
    }
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compare {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl Compare {
    /// Check if the given value satisfies this comparison.
    pub fn check(&self, roll: i64, target: i64) -> bool {
        match self {
            Compare::Equal => roll == target,
            Compare::NotEqual => roll != target,
            Compare::LessThan => roll < target,
            Compare::LessOrEqual => roll <= target,
            Compare::GreaterThan => roll > target,
            Compare::GreaterOrEqual => roll >= target,
        }
    }

    /// Parse a comparison symbol as it appears in roll traces.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" | "==" => Some(Compare::Equal),
            "<>" | "!=" => Some(Compare::NotEqual),
            "<" => Some(Compare::LessThan),
            "<=" => Some(Compare::LessOrEqual),
            ">" => Some(Compare::GreaterThan),
            ">=" => Some(Compare::GreaterOrEqual),
            _ => None,
        }
    }
}

impl fmt::Display for Compare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compare::Equal => write!(f, "="),
            Compare::NotEqual => write!(f, "<>"),
            Compare::LessThan => write!(f, "<"),
            Compare::LessOrEqual => write!(f, "<="),
            Compare::GreaterThan => write!(f, ">"),
            Compare::GreaterOrEqual => write!(f, ">="),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_symbols() {
        assert_eq!(Compare::from_symbol("=="), Some(Compare::Equal));
        assert_eq!(Compare::from_symbol("!="), Some(Compare::NotEqual));
        assert_eq!(Compare::from_symbol(">="), Some(Compare::GreaterOrEqual));
        assert_eq!(Compare::from_symbol("=>"), None);
        assert!(Compare::LessOrEqual.check(3, 3));
        assert!(!Compare::LessThan.check(3, 3));
    }

    #[test]
    fn test_display_canonical_form() {
        let command = Command::Sum {
            expr: Expr::BinOp {
                op: Op::Add,
                left: Box::new(Expr::Roll(Roll {
                    dice: Dice { count: 3, sides: 6 },
                    modifier: Some(Modifier::KeepHighest(2)),
                })),
                right: Box::new(Expr::Number(1)),
            },
            target: Some(Condition {
                compare: Compare::GreaterOrEqual,
                value: 10,
            }),
        };
        assert_eq!(command.to_string(), "3D6KH2+1>=10");
    }
}
