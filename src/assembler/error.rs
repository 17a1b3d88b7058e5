//! Errors raised by every stage of the assembler.
//!
//! Assembly is all-or-nothing: the first error aborts the run and is
//! returned to the caller with the source position it was found at.
use std::fmt;
use thiserror::Error;

/// A location in the source text.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
    /// 0-based byte offset into the source.
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Position { line, column, offset }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{position}: no token matches the input here")]
    Lex { position: Position },

    #[error("{position}: unexpected `{found}`")]
    Syntax { position: Position, found: String },

    #[error("{position}: label `{name}` is never declared")]
    UnresolvedLabel { name: String, position: Position },

    #[error("{position}: `{mnemonic}` has no `{mode}` addressing mode")]
    UnknownOpcode { mnemonic: String, mode: &'static str, position: Position },

    #[error("{position}: unknown directive `{name}`")]
    UnknownDirective { name: String, position: Position },

    #[error("{position}: {name}: {message}")]
    Directive { name: String, position: Position, message: String },

    #[error("{position}: label `{name}` is already declared")]
    DuplicateLabel { name: String, position: Position },

    #[error("{position}: branch target ${target:04X} is out of range from ${pc:04X}")]
    BranchOutOfRange { target: u16, pc: u16, position: Position },

    #[error("{position}: operand ${value:04X} does not fit in a single byte")]
    OperandOverflow { value: u16, position: Position },

    #[error("{position}: program runs past $FFFF")]
    AddressOverflow { position: Position },

    #[error("{position}: bank {bank} does not fit in 8 KiB")]
    BankOverflow { bank: u8, position: Position },

    #[error("{position}: literal `{text}` is out of range")]
    Literal { text: String, position: Position },

    #[error("invalid token pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
