//! Grammar predicates and the addressing-mode table.
//!
//! A predicate looks at the token sequence at a position and returns how
//! many tokens the construct it recognizes spans there, or 0 if it does
//! not start at that position. Addressing modes are sequences of
//! predicates, tried in table order.
use std::fmt;
use super::lexer::{Token, TokenKind};

pub type Predicate = fn(&[Token], usize) -> usize;

const BRANCHES: [&str; 8] = ["BCC", "BCS", "BEQ", "BNE", "BMI", "BPL", "BVC", "BVS"];

fn look_ahead(tokens: &[Token], index: usize, kind: TokenKind) -> usize {
    match tokens.get(index) {
        Some(tok) if tok.kind == kind => 1,
        _ => 0,
    }
}

fn look_ahead_text(tokens: &[Token], index: usize, kind: TokenKind, text: &str) -> usize {
    match tokens.get(index) {
        Some(tok) if tok.kind == kind && tok.text.eq_ignore_ascii_case(text) => 1,
        _ => 0,
    }
}

/// Returns the match of the first predicate in `predicates` that matches.
pub fn any_of(predicates: &[Predicate], tokens: &[Token], index: usize) -> usize {
    predicates
        .iter()
        .map(|p| p(tokens, index))
        .find(|&n| n > 0)
        .unwrap_or(0)
}

pub fn end_line(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::EndLine)
}

pub fn directive(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::Directive)
}

pub fn directive_argument(tokens: &[Token], index: usize) -> usize {
    any_of(&[decimal, address, marker, string], tokens, index)
}

pub fn decimal(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::Decimal)
}

pub fn instruction(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::Instruction)
}

/// A conditional branch mnemonic, which always takes a relative operand.
pub fn relative(tokens: &[Token], index: usize) -> usize {
    match tokens.get(index) {
        Some(tok) if tok.kind == TokenKind::Instruction && BRANCHES.contains(&tok.text.as_str()) => 1,
        _ => 0,
    }
}

/// An address literal written with exactly two hex digits (`$nn`).
pub fn zeropage(tokens: &[Token], index: usize) -> usize {
    match tokens.get(index) {
        Some(tok) if tok.kind == TokenKind::Address && tok.text.len() == 3 => 1,
        _ => 0,
    }
}

pub fn label(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::Label)
}

pub fn marker(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::Marker)
}

pub fn address(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::Address)
}

pub fn string(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::Str)
}

pub fn address_or_marker(tokens: &[Token], index: usize) -> usize {
    any_of(&[address, marker], tokens, index)
}

pub fn hex_number(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::HexNumber)
}

pub fn binary_number(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::BinaryNumber)
}

pub fn number(tokens: &[Token], index: usize) -> usize {
    any_of(&[hex_number, binary_number], tokens, index)
}

pub fn separator(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::Separator)
}

pub fn register_x(tokens: &[Token], index: usize) -> usize {
    look_ahead_text(tokens, index, TokenKind::Register, "X")
}

pub fn register_y(tokens: &[Token], index: usize) -> usize {
    look_ahead_text(tokens, index, TokenKind::Register, "Y")
}

pub fn open(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::Open)
}

pub fn close(tokens: &[Token], index: usize) -> usize {
    look_ahead(tokens, index, TokenKind::Close)
}

/// A list of at least two addresses strictly alternating with separators:
/// `$01, $02[, $03...]`. The list ends at the first address that is not
/// followed by a separator *and* another address, so a dangling separator
/// is left behind for the parser to reject.
pub fn list(tokens: &[Token], index: usize) -> usize {
    if address(tokens, index) == 0 {
        return 0;
    }
    let mut len = 1;
    while separator(tokens, index + len) > 0 && address(tokens, index + len + 1) > 0 {
        len += 2;
    }
    if len > 1 { len } else { 0 }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum AddressingMode {
    Relative,
    Immediate,
    ZeroPageX,
    ZeroPageY,
    ZeroPage,
    AbsoluteX,
    AbsoluteY,
    Absolute,
    IndirectX,
    IndirectY,
    Indirect,
    Implied,
}

impl AddressingMode {
    /// The short name the opcode table is keyed by.
    pub fn short_name(self) -> &'static str {
        use AddressingMode::*;
        match self {
            Relative  => "rel",
            Immediate => "imm",
            ZeroPageX => "zpx",
            ZeroPageY => "zpy",
            ZeroPage  => "zp",
            AbsoluteX => "absx",
            AbsoluteY => "absy",
            Absolute  => "abs",
            IndirectX => "indx",
            IndirectY => "indy",
            Indirect  => "ind",
            Implied   => "sngl",
        }
    }

    /// Total encoded size in bytes, opcode included.
    pub fn size(self) -> u8 {
        use AddressingMode::*;
        match self {
            Implied => 1,
            Relative | Immediate | ZeroPageX | ZeroPageY | ZeroPage | IndirectX | IndirectY => 2,
            AbsoluteX | AbsoluteY | Absolute | Indirect => 3,
        }
    }

    /// Index of the operand token among the instruction's tokens.
    pub fn operand_index(self) -> Option<usize> {
        use AddressingMode::*;
        match self {
            Implied => None,
            IndirectX | IndirectY | Indirect => Some(2),
            _ => Some(1),
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

pub struct ModePattern {
    pub mode: AddressingMode,
    pub predicates: &'static [Predicate],
}

impl ModePattern {
    /// The number of tokens consumed when every predicate matches in sequence.
    pub fn matches(&self, tokens: &[Token], index: usize) -> Option<usize> {
        let mut consumed = 0;
        for predicate in self.predicates {
            match predicate(tokens, index + consumed) {
                0 => return None,
                n => consumed += n,
            }
        }
        Some(consumed)
    }
}

/// Addressing modes in priority order. Zero-page forms come before the
/// absolute forms that would also accept a two-digit address, and
/// implied comes last because it accepts any bare mnemonic.
pub static GRAMMAR: [ModePattern; 12] = [
    ModePattern { mode: AddressingMode::Relative,  predicates: &[relative, address_or_marker] },
    ModePattern { mode: AddressingMode::Immediate, predicates: &[instruction, number] },
    ModePattern { mode: AddressingMode::ZeroPageX, predicates: &[instruction, zeropage, separator, register_x] },
    ModePattern { mode: AddressingMode::ZeroPageY, predicates: &[instruction, zeropage, separator, register_y] },
    ModePattern { mode: AddressingMode::ZeroPage,  predicates: &[instruction, zeropage] },
    ModePattern { mode: AddressingMode::AbsoluteX, predicates: &[instruction, address_or_marker, separator, register_x] },
    ModePattern { mode: AddressingMode::AbsoluteY, predicates: &[instruction, address_or_marker, separator, register_y] },
    ModePattern { mode: AddressingMode::Absolute,  predicates: &[instruction, address_or_marker] },
    ModePattern { mode: AddressingMode::IndirectX, predicates: &[instruction, open, address_or_marker, separator, register_x, close] },
    ModePattern { mode: AddressingMode::IndirectY, predicates: &[instruction, open, address_or_marker, close, separator, register_y] },
    ModePattern { mode: AddressingMode::Indirect,  predicates: &[instruction, open, address_or_marker, close] },
    ModePattern { mode: AddressingMode::Implied,   predicates: &[instruction] },
];

/// The first addressing mode whose pattern matches at `index`, with the
/// number of tokens it consumes.
pub fn match_mode(tokens: &[Token], index: usize) -> Option<(AddressingMode, usize)> {
    GRAMMAR
        .iter()
        .find_map(|pattern| pattern.matches(tokens, index).map(|n| (pattern.mode, n)))
}
