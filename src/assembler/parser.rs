//! The Parser module takes a token stream from the lexer and converts it
//! into a `Program`.
//!
//! Every accepted construct moves the position strictly forward; when
//! nothing matches at the current position the parser stops with a
//! syntax error pointing at the offending token.
use super::ast::*;
use super::error::{Error, Result};
use super::grammar::*;
use super::lexer::{Token, TokenKind};

pub struct Parser {
    tokens:  Vec<Token>,
    pos:     usize,
    pending: Vec<Token>,
    program: Program,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let capacity = tokens.len() / 2;
        Parser {
            tokens,
            pos: 0,
            pending: Vec::new(),
            program: Program { statements: Vec::with_capacity(capacity), trailing_labels: Vec::new() },
        }
    }

    /// Run the parser, consuming itself and returning the parsed program.
    pub fn run(mut self) -> Result<Program> {
        while self.pos < self.tokens.len() {
            let next = self.step()?;
            debug_assert!(next > self.pos, "parser did not advance at token {}", self.pos);
            self.pos = next;
        }

        self.program.trailing_labels = self.pending;
        info!("Parsed {} statements.", self.program.statements.len());
        Ok(self.program)
    }

    /// Parses the construct at the current position and returns the
    /// position just past it.
    fn step(&mut self) -> Result<usize> {
        let t = &self.tokens;
        let x = self.pos;

        if directive(t, x) > 0 {
            let len = list(t, x + 1);
            if len > 0 {
                let elements = t[x + 1..x + 1 + len]
                    .iter()
                    .filter(|tok| tok.kind == TokenKind::Address)
                    .cloned()
                    .collect();
                let statement = Statement::Directive { name: t[x].clone(), argument: Argument::List(elements) };
                self.push(statement);
                return Ok(x + 1 + len);
            }
            if directive_argument(t, x + 1) > 0 {
                let arg = t[x + 1].clone();
                let argument = match arg.kind {
                    TokenKind::Decimal => Argument::Decimal(arg),
                    TokenKind::Address => Argument::Address(arg),
                    TokenKind::Marker  => Argument::Marker(arg),
                    _                  => Argument::Str(arg),
                };
                let statement = Statement::Directive { name: t[x].clone(), argument };
                self.push(statement);
                return Ok(x + 2);
            }
        }

        if label(t, x) > 0 {
            self.pending.push(t[x].clone());
            return Ok(x + 1);
        }

        if end_line(t, x) > 0 {
            return Ok(x + 1);
        }

        if let Some((mode, len)) = match_mode(t, x) {
            let tokens = t[x..x + len].to_vec();
            let labels = std::mem::take(&mut self.pending);
            self.push(Statement::Instruction(Instruction { mode, tokens, labels }));
            return Ok(x + len);
        }

        let tok = &t[x];
        Err(Error::Syntax { position: tok.position, found: tok.text.clone() })
    }

    fn push(&mut self, statement: Statement) {
        debug!("{}: {}", statement.position(), statement);
        self.program.statements.push(statement);
    }
}

/// Parses a token stream into a program.
pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    Parser::new(tokens).run()
}
