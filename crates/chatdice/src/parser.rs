// ABOUTME: Recursive descent parser for the embedded dice command language.
// ABOUTME: Converts token streams into sum or counting commands.

use crate::ast::{Command, Compare, Condition, Dice, Expr, Modifier, Op, Roll};
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};

/// Most dice a single group may roll.
pub const MAX_DICE: u32 = 1000;
/// Largest die size.
pub const MAX_SIDES: u32 = 10000;
/// Deepest run of nested parentheses and negations.
pub const MAX_DEPTH: usize = 64;
/// Most arithmetic operators or dice groups in one command.
pub const MAX_OPERATORS: usize = 128;

/// Parser for dice commands.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    depth: usize,
    operators: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input.
    pub fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            depth: 0,
            operators: 0,
        })
    }

    /// Parse a full command: a sum or counting roll with an optional target.
    pub fn command(&mut self) -> Result<Command> {
        let counting = matches!(self.current, Token::Number(_)) && self.lexer.peek()? == Token::B;
        let command = if counting {
            let groups = self.counting_groups()?;
            let target = self.optional_condition()?;
            Command::Count { groups, target }
        } else {
            let expr = self.expression()?;
            let target = self.optional_condition()?;
            Command::Sum { expr, target }
        };
        self.end()?;
        Ok(command)
    }

    /// Parse the input as a bare arithmetic expression.
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.expression()?;
        self.end()?;
        Ok(expr)
    }

    fn end(&self) -> Result<()> {
        if self.current != Token::Eof {
            return Err(Error::Expected {
                expected: "end of input".to_string(),
                found: format!("{:?}", self.current),
            });
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<Token> {
        let prev = std::mem::replace(&mut self.current, self.lexer.next_token()?);
        Ok(prev)
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn count_operator(&mut self) -> Result<()> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(Error::TooManyOperators(MAX_OPERATORS));
        }
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(Error::Expected {
                expected: format!("{:?}", expected),
                found: format!("{:?}", self.current),
            })
        }
    }

    /// Parse counting groups ("2B6+1B10").
    fn counting_groups(&mut self) -> Result<Vec<Dice>> {
        let mut groups = vec![self.counting_group()?];
        while self.current == Token::Plus {
            self.count_operator()?;
            self.advance()?;
            groups.push(self.counting_group()?);
        }
        Ok(groups)
    }

    fn counting_group(&mut self) -> Result<Dice> {
        let count = self.number("dice count")?;
        self.expect(Token::B)?;
        let sides = self.number("dice sides")?;
        dice(count, sides)
    }

    /// Parse an expression (handles + and -).
    fn expression(&mut self) -> Result<Expr> {
        let mut left = self.term()?;

        loop {
            let op = match self.current {
                Token::Plus => Op::Add,
                Token::Minus => Op::Sub,
                _ => break,
            };
            self.count_operator()?;
            self.advance()?;
            let right = self.term()?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse a term (handles * and /).
    fn term(&mut self) -> Result<Expr> {
        let mut left = self.factor()?;

        loop {
            let op = match self.current {
                Token::Star => Op::Mul,
                Token::Slash => Op::Div,
                _ => break,
            };
            self.count_operator()?;
            self.advance()?;
            let right = self.factor()?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse a factor (number, roll, or parenthesized expression).
    fn factor(&mut self) -> Result<Expr> {
        match &self.current {
            Token::Number(_) | Token::D => self.roll_or_number(),
            Token::LParen => {
                self.enter()?;
                self.advance()?;
                let expr = self.expression()?;
                self.depth -= 1;
                self.expect(Token::RParen)?;
                Ok(Expr::Group(Box::new(expr)))
            }
            Token::Minus => {
                self.enter()?;
                self.advance()?;
                let expr = self.factor()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(expr)))
            }
            Token::Eof => Err(Error::UnexpectedEof),
            _ => Err(Error::Expected {
                expected: "number, dice roll, or '('".to_string(),
                found: format!("{:?}", self.current),
            }),
        }
    }

    /// Parse a dice roll or plain number.
    fn roll_or_number(&mut self) -> Result<Expr> {
        let count = if let Token::Number(n) = self.current {
            self.advance()?;
            n
        } else {
            1
        };

        if self.current != Token::D {
            return Ok(Expr::Number(i64::from(count)));
        }
        self.advance()?;

        let sides = self.number("dice sides")?;
        let dice = dice(count, sides)?;
        let modifier = self.modifier()?;

        Ok(Expr::Roll(Roll { dice, modifier }))
    }

    /// Parse an optional keep/drop modifier (KH3, KL1, DH1, DL1, K2).
    fn modifier(&mut self) -> Result<Option<Modifier>> {
        match self.current {
            Token::K => {
                self.advance()?;
                let high = self.high_or_low(true)?;
                let n = self.optional_number(1)?;
                Ok(Some(if high {
                    Modifier::KeepHighest(n)
                } else {
                    Modifier::KeepLowest(n)
                }))
            }
            Token::D if matches!(self.lexer.peek()?, Token::H | Token::L) => {
                self.advance()?;
                let high = self.high_or_low(false)?;
                let n = self.optional_number(1)?;
                Ok(Some(if high {
                    Modifier::DropHighest(n)
                } else {
                    Modifier::DropLowest(n)
                }))
            }
            _ => Ok(None),
        }
    }

    fn high_or_low(&mut self, default_high: bool) -> Result<bool> {
        match self.current {
            Token::H => {
                self.advance()?;
                Ok(true)
            }
            Token::L => {
                self.advance()?;
                Ok(false)
            }
            _ => Ok(default_high),
        }
    }

    fn number(&mut self, what: &str) -> Result<u32> {
        match self.current {
            Token::Number(n) => {
                self.advance()?;
                Ok(n)
            }
            Token::Eof => Err(Error::UnexpectedEof),
            _ => Err(Error::Expected {
                expected: what.to_string(),
                found: format!("{:?}", self.current),
            }),
        }
    }

    /// Parse an optional number, returning default if not present.
    fn optional_number(&mut self, default: u32) -> Result<u32> {
        if let Token::Number(n) = self.current {
            self.advance()?;
            Ok(n)
        } else {
            Ok(default)
        }
    }

    /// Parse an optional target (=5, <>3, >=10, <=-2, etc.).
    fn optional_condition(&mut self) -> Result<Option<Condition>> {
        let compare = match self.current {
            Token::Eq => {
                self.advance()?;
                if self.current == Token::Eq {
                    self.advance()?;
                }
                Compare::Equal
            }
            Token::Bang => {
                self.advance()?;
                self.expect(Token::Eq)?;
                Compare::NotEqual
            }
            Token::Lt => {
                self.advance()?;
                match self.current {
                    Token::Eq => {
                        self.advance()?;
                        Compare::LessOrEqual
                    }
                    Token::Gt => {
                        self.advance()?;
                        Compare::NotEqual
                    }
                    _ => Compare::LessThan,
                }
            }
            Token::Gt => {
                self.advance()?;
                if self.current == Token::Eq {
                    self.advance()?;
                    Compare::GreaterOrEqual
                } else {
                    Compare::GreaterThan
                }
            }
            _ => return Ok(None),
        };

        let negative = self.current == Token::Minus;
        if negative {
            self.advance()?;
        }
        let value = i64::from(self.number("number after comparison")?);
        Ok(Some(Condition {
            compare,
            value: if negative { -value } else { value },
        }))
    }
}

fn dice(count: u32, sides: u32) -> Result<Dice> {
    if count == 0 || count > MAX_DICE {
        return Err(Error::InvalidDiceCount(count));
    }
    if sides == 0 || sides > MAX_SIDES {
        return Err(Error::InvalidDiceSides(sides));
    }
    Ok(Dice { count, sides })
}

/// Parse a dice command string.
pub fn parse_command(input: &str) -> Result<Command> {
    Parser::new(input)?.command()
}

/// Parse an arithmetic expression string.
pub fn parse(input: &str) -> Result<Expr> {
    Parser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roll(count: u32, sides: u32, modifier: Option<Modifier>) -> Expr {
        Expr::Roll(Roll {
            dice: Dice { count, sides },
            modifier,
        })
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse("42").unwrap(), Expr::Number(42));
    }

    #[test]
    fn test_parse_basic_roll() {
        assert_eq!(parse("2d6").unwrap(), roll(2, 6, None));
        assert_eq!(parse("D20").unwrap(), roll(1, 20, None));
    }

    #[test]
    fn test_parse_keep_and_drop() {
        assert_eq!(
            parse("4d6kh3").unwrap(),
            roll(4, 6, Some(Modifier::KeepHighest(3)))
        );
        assert_eq!(
            parse("2d20kl").unwrap(),
            roll(2, 20, Some(Modifier::KeepLowest(1)))
        );
        assert_eq!(
            parse("4D6DL1").unwrap(),
            roll(4, 6, Some(Modifier::DropLowest(1)))
        );
    }

    #[test]
    fn test_parse_expression() {
        let expr = parse("2d6 + 5").unwrap();
        match expr {
            Expr::BinOp { op, left, right } => {
                assert_eq!(op, Op::Add);
                assert!(matches!(*left, Expr::Roll(_)));
                assert_eq!(*right, Expr::Number(5));
            }
            _ => panic!("Expected BinOp"),
        }
    }

    #[test]
    fn test_parse_sum_command_with_target() {
        let command = parse_command("2D6+1>=8").unwrap();
        assert_eq!(
            command.target(),
            Some(&Condition {
                compare: Compare::GreaterOrEqual,
                value: 8,
            })
        );
        assert_eq!(command.to_string(), "2D6+1>=8");
    }

    #[test]
    fn test_parse_not_equal_forms() {
        for input in ["1D6<>3", "1D6!=3"] {
            let command = parse_command(input).unwrap();
            assert_eq!(command.target().map(|c| c.compare), Some(Compare::NotEqual));
        }
    }

    #[test]
    fn test_parse_negative_target() {
        let command = parse_command("1D6-5<=-2").unwrap();
        assert_eq!(command.target().map(|c| c.value), Some(-2));
    }

    #[test]
    fn test_parse_counting_command() {
        let command = parse_command("2B6+1B10>4").unwrap();
        match command {
            Command::Count { groups, target } => {
                assert_eq!(
                    groups,
                    vec![Dice { count: 2, sides: 6 }, Dice { count: 1, sides: 10 }]
                );
                assert_eq!(target.map(|c| c.compare), Some(Compare::GreaterThan));
            }
            _ => panic!("Expected counting command"),
        }
    }

    #[test]
    fn test_dice_limits() {
        assert!(matches!(parse("1001d6"), Err(Error::InvalidDiceCount(1001))));
        assert!(matches!(parse("0d6"), Err(Error::InvalidDiceCount(0))));
        assert!(matches!(parse("1d0"), Err(Error::InvalidDiceSides(0))));
        assert!(matches!(parse("1d10001"), Err(Error::InvalidDiceSides(10001))));
        assert!(parse("1000d10000").is_ok());
    }

    #[test]
    fn test_nesting_limit() {
        let negations = |n: usize| format!("{}1", "-".repeat(n));
        assert!(parse(&negations(MAX_DEPTH)).is_ok());
        assert!(matches!(parse(&negations(MAX_DEPTH + 1)), Err(Error::TooDeep(_))));
        assert!(matches!(parse_command(&negations(5_000)), Err(Error::TooDeep(_))));

        let groups = |n: usize| format!("{}1d6{}", "(".repeat(n), ")".repeat(n));
        assert!(parse(&groups(MAX_DEPTH)).is_ok());
        assert!(matches!(parse(&groups(MAX_DEPTH + 1)), Err(Error::TooDeep(_))));

        // Siblings do not accumulate depth.
        let siblings = vec!["(-1)"; MAX_DEPTH + 1].join("+");
        assert!(parse(&siblings).is_ok());
    }

    #[test]
    fn test_operator_limit() {
        let chain = |n: usize| format!("1d6{}", "+1".repeat(n));
        assert!(parse_command(&chain(MAX_OPERATORS)).is_ok());
        assert!(matches!(
            parse_command(&chain(MAX_OPERATORS + 1)),
            Err(Error::TooManyOperators(_))
        ));
        assert!(matches!(
            parse_command(&"1d6*".repeat(5_000)),
            Err(Error::TooManyOperators(_))
        ));

        let counting = vec!["1B6"; MAX_OPERATORS + 2].join("+");
        assert!(matches!(parse_command(&counting), Err(Error::TooManyOperators(_))));
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(parse_command("2d6)").is_err());
        assert!(matches!(parse_command("2d6+"), Err(Error::UnexpectedEof)));
        assert!(parse_command("2d6>=").is_err());
    }
}
