//! This lexer tokenizes 6502 assembly source.
//!
//! At every offset the token patterns are tried in a fixed priority
//! order and the first one matching a prefix of the remaining text
//! wins. There is no backtracking: the order of `TokenKind::PRIORITY`
//! is what keeps `LDA` from lexing as a marker and `$10` from lexing
//! as something shorter.
use regex::Regex;
use super::error::{Error, Position, Result};

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum TokenKind {
    Instruction,
    Address,
    HexNumber,
    BinaryNumber,
    Str,
    Separator,
    Register,
    Open,
    Close,
    Label,
    Marker,
    Directive,
    Decimal,
    EndLine,
    Whitespace,
    Comment,
}

impl TokenKind {
    /// Every kind, in the order its pattern is tried.
    pub const PRIORITY: [TokenKind; 16] = [
        TokenKind::Instruction,
        TokenKind::Address,
        TokenKind::HexNumber,
        TokenKind::BinaryNumber,
        TokenKind::Str,
        TokenKind::Separator,
        TokenKind::Register,
        TokenKind::Open,
        TokenKind::Close,
        TokenKind::Label,
        TokenKind::Marker,
        TokenKind::Directive,
        TokenKind::Decimal,
        TokenKind::EndLine,
        TokenKind::Whitespace,
        TokenKind::Comment,
    ];

    /// The regular expression matched against the start of the remaining input.
    pub fn pattern(self) -> &'static str {
        use TokenKind::*;
        match self {
            Instruction  => r"(ADC|AND|ASL|BCC|BCS|BEQ|BIT|BMI|BNE|BPL|BRK|BVC|BVS|CLC|CLD|CLI|CLV|CMP|CPX|CPY|DEC|DEX|DEY|EOR|INC|INX|INY|JMP|JSR|LDA|LDX|LDY|LSR|NOP|ORA|PHA|PHP|PLA|PLP|ROL|ROR|RTI|RTS|SBC|SEC|SED|SEI|STA|STX|STY|TAX|TAY|TSX|TXA|TXS|TYA)\b",
            Address      => r"\$[0-9A-F]{2,4}",
            HexNumber    => r"#\$?[0-9A-F]{2}",
            BinaryNumber => r"#%[01]{8}",
            Str          => r#""[^"]*""#,
            Separator    => r",",
            Register     => r"[XxYy]\b",
            Open         => r"\(",
            Close        => r"\)",
            Label        => r"[a-zA-Z][a-zA-Z0-9]*:",
            Marker       => r"[a-zA-Z][a-zA-Z0-9]*",
            Directive    => r"\.[a-z]+",
            Decimal      => r"[0-9]+",
            EndLine      => r"\n",
            Whitespace   => r"[ \t\r]+",
            Comment      => r";[^\n]*",
        }
    }

    /// Whitespace and comments are consumed but never emitted.
    pub fn is_stored(self) -> bool {
        !matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new<S: Into<String>>(kind: TokenKind, text: S, position: Position) -> Self {
        Token { kind, text: text.into(), position }
    }

    /// The numeric value of a literal token, or `None` for anything else
    /// (and for decimals too large for a `u32`).
    pub fn literal(&self) -> Option<u32> {
        let (digits, radix) = match self.kind {
            TokenKind::Address      => (&self.text[1..], 16),
            TokenKind::HexNumber    => (self.text.trim_start_matches('#').trim_start_matches('$'), 16),
            TokenKind::BinaryNumber => (&self.text[2..], 2),
            TokenKind::Decimal      => (self.text.as_str(), 10),
            _ => return None,
        };
        u32::from_str_radix(digits, radix).ok()
    }

    /// The declared name of a `name:` label token.
    pub fn label_name(&self) -> &str {
        self.text.trim_end_matches(':')
    }

    /// The contents of a string token without its quotes.
    pub fn string_contents(&self) -> &str {
        self.text.trim_start_matches('"').trim_end_matches('"')
    }
}

/// The compiled pattern list.
pub struct Lexer {
    patterns: Vec<(TokenKind, Regex)>,
}

impl Lexer {
    pub fn new() -> Result<Self> {
        let mut patterns = Vec::with_capacity(TokenKind::PRIORITY.len());
        for kind in TokenKind::PRIORITY.iter() {
            let re = Regex::new(&format!("^(?:{})", kind.pattern()))?;
            patterns.push((*kind, re));
        }
        Ok(Lexer { patterns })
    }

    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::with_capacity(source.len() / 3);
        let mut position = Position::new(1, 1, 0);

        while position.offset < source.len() {
            let rest = &source[position.offset..];
            let (kind, len) = self
                .first_match(rest)
                .ok_or(Error::Lex { position })?;
            let text = &rest[..len];

            if kind.is_stored() {
                trace!("{}: {:?} {:?}", position, kind, text);
                tokens.push(Token::new(kind, text, position));
            }

            for c in text.chars() {
                if c == '\n' {
                    position.line += 1;
                    position.column = 1;
                } else {
                    position.column += 1;
                }
            }
            position.offset += len;
        }

        debug!("Tokenized {} lines into {} tokens.", position.line, tokens.len());
        Ok(tokens)
    }

    /// The first pattern, in priority order, matching a non-empty prefix.
    fn first_match(&self, rest: &str) -> Option<(TokenKind, usize)> {
        self.patterns.iter().find_map(|(kind, re)| match re.find(rest) {
            Some(m) if m.end() > 0 => Some((*kind, m.end())),
            _ => None,
        })
    }
}

/// Tokenizes `source` with a freshly compiled pattern list. Callers
/// tokenizing repeatedly should keep a `Lexer` instead.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new()?.tokenize(source)
}
