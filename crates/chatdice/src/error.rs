// ABOUTME: Error types for the chatdice library.
// ABOUTME: Covers dice expression lexing/parsing/evaluation, remote API, and configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Expected {expected}, found {found}")]
    Expected { expected: String, found: String },

    #[error("Invalid dice count: {0}")]
    InvalidDiceCount(u32),

    #[error("Invalid dice sides: {0}")]
    InvalidDiceSides(u32),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Expression nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("Expression has more than {0} operators")]
    TooManyOperators(usize),

    #[error("Unsupported dice API version: {0}")]
    InvalidApiVersion(String),

    #[error("Dice API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Dice API returned status {0}")]
    HttpStatus(u16),

    #[error("Invalid dice API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Dice API URL cannot take a path: {0}")]
    CannotBeABase(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
