// ABOUTME: Lexer for the embedded dice command language.
// ABOUTME: Tokenizes strings like "4D6KH3+5>=10" or "3B6>=4" into a stream of tokens.

use crate::error::{Error, Result};

/// A token in the dice command language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A numeric literal.
    Number(u32),
    /// The 'd' or 'D' dice separator, also the drop modifier.
    D,
    /// The 'b' or 'B' counting dice separator.
    B,
    /// Addition operator.
    Plus,
    /// Subtraction operator.
    Minus,
    /// Multiplication operator.
    Star,
    /// Division operator.
    Slash,
    /// Left parenthesis.
    LParen,
    /// Right parenthesis.
    RParen,
    /// Keep modifier: 'k'.
    K,
    /// High modifier: 'h'.
    H,
    /// Low modifier: 'l'.
    L,
    /// Equal comparison: '='.
    Eq,
    /// Less than: '<'.
    Lt,
    /// Greater than: '>'.
    Gt,
    /// '!' as in "!=".
    Bang,
    /// End of input.
    Eof,
}

/// A lexer for dice commands.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            pos: 0,
        }
    }

    /// Get the current position in the input.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Result<Token> {
        let saved_chars = self.chars.clone();
        let saved_pos = self.pos;
        let token = self.next_token()?;
        self.chars = saved_chars;
        self.pos = saved_pos;
        Ok(token)
    }

    /// Get the next token from the input.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let Some(&(pos, ch)) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        self.pos = pos;

        let token = match ch {
            '0'..='9' => return self.number(),
            'd' | 'D' => Token::D,
            'b' | 'B' => Token::B,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            'k' | 'K' => Token::K,
            'h' | 'H' => Token::H,
            'l' | 'L' => Token::L,
            '=' => Token::Eq,
            '<' => Token::Lt,
            '>' => Token::Gt,
            '!' => Token::Bang,
            _ => return Err(Error::UnexpectedChar(ch, pos)),
        };
        self.chars.next();
        Ok(token)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn number(&mut self) -> Result<Token> {
        let mut value: u32 = 0;

        while let Some(&(_, ch)) = self.chars.peek() {
            if let Some(digit) = ch.to_digit(10) {
                self.chars.next();
                value = value.saturating_mul(10).saturating_add(digit);
            } else {
                break;
            }
        }

        Ok(Token::Number(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::Eof {
                return out;
            }
            out.push(token);
        }
    }

    #[test]
    fn test_basic_roll() {
        assert_eq!(
            tokens("2d6"),
            vec![Token::Number(2), Token::D, Token::Number(6)]
        );
    }

    #[test]
    fn test_roll_with_modifier() {
        assert_eq!(
            tokens("4D6KH3"),
            vec![
                Token::Number(4),
                Token::D,
                Token::Number(6),
                Token::K,
                Token::H,
                Token::Number(3)
            ]
        );
    }

    #[test]
    fn test_counting_with_target() {
        assert_eq!(
            tokens("3b6 >= 4"),
            vec![
                Token::Number(3),
                Token::B,
                Token::Number(6),
                Token::Gt,
                Token::Eq,
                Token::Number(4)
            ]
        );
    }

    #[test]
    fn test_not_equal() {
        assert_eq!(
            tokens("1d6!=3"),
            vec![
                Token::Number(1),
                Token::D,
                Token::Number(6),
                Token::Bang,
                Token::Eq,
                Token::Number(3)
            ]
        );
    }

    #[test]
    fn test_unexpected_char() {
        let mut lexer = Lexer::new("2d6x");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert!(matches!(
            lexer.next_token(),
            Err(Error::UnexpectedChar('x', 3))
        ));
        assert_eq!(lexer.pos(), 3);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut lexer = Lexer::new("d6");
        assert_eq!(lexer.peek().unwrap(), Token::D);
        assert_eq!(lexer.next_token().unwrap(), Token::D);
    }
}
