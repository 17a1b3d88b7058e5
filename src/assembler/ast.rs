//! Statements produced by the parser.
//!
//! A program is a flat sequence of statements, each either a directive
//! (`.org $C000`, `.db $01, $02`) or a CPU instruction in one of the
//! addressing modes of the grammar table:
//!
//! ```nasm
//! .org $C000
//! reset:            ; a label names the address of the next instruction
//!     LDA #$01      ; immediate
//!     STA $2000     ; absolute
//!     LDX $10,Y     ; zero page, Y
//!     BNE reset     ; relative
//!     JMP ($FFFC)   ; indirect
//!     RTS           ; implied
//! ```
use std::fmt;
use super::error::Position;
use super::grammar::AddressingMode;
use super::lexer::Token;

/// The argument following a directive name.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Argument {
    Decimal(Token),
    Address(Token),
    Marker(Token),
    Str(Token),
    /// The address tokens of a comma separated list, separators dropped.
    List(Vec<Token>),
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Argument::Decimal(tok) |
            Argument::Address(tok) |
            Argument::Marker(tok)  |
            Argument::Str(tok)     => write!(f, "{}", tok.text),
            Argument::List(toks)   => {
                let items: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
                write!(f, "{}", items.join(", "))
            }
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Instruction {
    pub mode: AddressingMode,
    /// Every token the addressing-mode pattern consumed, mnemonic first.
    pub tokens: Vec<Token>,
    /// `name:` label tokens declared immediately before this instruction.
    pub labels: Vec<Token>,
}

impl Instruction {
    pub fn mnemonic(&self) -> &str {
        &self.tokens[0].text
    }

    pub fn operand(&self) -> Option<&Token> {
        self.mode.operand_index().and_then(|i| self.tokens.get(i))
    }

    pub fn position(&self) -> Position {
        self.tokens[0].position
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())?;
        let mut rest = self.tokens[1..].iter();
        if let Some(first) = rest.next() {
            write!(f, " {}", first.text)?;
        }
        for tok in rest {
            write!(f, "{}", tok.text)?;
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Statement {
    Directive { name: Token, argument: Argument },
    Instruction(Instruction),
}

impl Statement {
    pub fn position(&self) -> Position {
        match self {
            Statement::Directive { name, .. } => name.position,
            Statement::Instruction(ins) => ins.position(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Statement::Directive { name, argument } => write!(f, "{} {}", name.text, argument),
            Statement::Instruction(ins) => write!(f, "{}", ins),
        }
    }
}

/// A parsed source file.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
    /// Labels declared after the last instruction. They name the address
    /// just past the end of the program.
    pub trailing_labels: Vec<Token>,
}
