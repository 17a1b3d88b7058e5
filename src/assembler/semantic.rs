//! Symbol resolution and code generation.
//!
//! Pass 1 walks the program once to assign every label an address and
//! returns the finished symbol table. Pass 2 reads that table, never
//! writes it, and encodes each statement into the cartridge.
use std::collections::HashMap;
use std::convert::TryFrom;
use super::Platform;
use super::ast::*;
use super::cartridge::{Cartridge, Overflow};
use super::directives::{Directives, DirectiveValue, ORIGIN};
use super::error::{Error, Result};
use super::grammar::AddressingMode;
use super::lexer::{Token, TokenKind};
use super::opcodes;

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, u16>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// A table holding the platform's reserved symbols.
    pub fn seeded(platform: &Platform) -> Self {
        let symbols = platform
            .reserved
            .iter()
            .map(|(name, addr)| (name.clone(), *addr))
            .collect();
        SymbolTable { symbols }
    }

    /// Binds the label declared by `label` to `address`.
    pub fn declare(&mut self, label: &Token, address: u16) -> Result<()> {
        let name = label.label_name();
        if self.symbols.contains_key(name) {
            return Err(Error::DuplicateLabel { name: name.to_owned(), position: label.position });
        }
        debug!("{} = ${:04X}", name, address);
        self.symbols.insert(name.to_owned(), address);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<u16> {
        self.symbols.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Every symbol, ordered by address and then by name.
    pub fn sorted(&self) -> Vec<(&str, u16)> {
        let mut all: Vec<(&str, u16)> = self.symbols.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        all.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)));
        all
    }
}

/// One line of the assembly listing.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ListingEntry {
    pub address: u16,
    pub bytes: Vec<u8>,
    pub statement: String,
}

/// The value of a literal token as a 16-bit quantity.
fn literal(tok: &Token) -> Result<u16> {
    tok.literal()
        .and_then(|v| u16::try_from(v).ok())
        .ok_or_else(|| Error::Literal { text: tok.text.clone(), position: tok.position })
}

fn lookup(tok: &Token, symbols: &SymbolTable) -> Result<u16> {
    symbols
        .get(&tok.text)
        .ok_or_else(|| Error::UnresolvedLabel { name: tok.text.clone(), position: tok.position })
}

/// Resolves an instruction operand, either a literal or a label.
fn operand_value(tok: &Token, symbols: &SymbolTable) -> Result<u16> {
    match tok.kind {
        TokenKind::Marker => lookup(tok, symbols),
        _ => literal(tok),
    }
}

fn directive_value<'a>(argument: &'a Argument, symbols: &SymbolTable) -> Result<DirectiveValue<'a>> {
    Ok(match argument {
        Argument::Decimal(tok) => DirectiveValue::Number(
            tok.literal()
                .ok_or_else(|| Error::Literal { text: tok.text.clone(), position: tok.position })?,
        ),
        Argument::Address(tok) => DirectiveValue::Address(literal(tok)?),
        Argument::Marker(tok)  => DirectiveValue::Address(lookup(tok, symbols)?),
        Argument::Str(tok)     => DirectiveValue::Text(tok.string_contents()),
        Argument::List(toks)   => DirectiveValue::List(
            toks.iter().map(literal).collect::<Result<Vec<u16>>>()?,
        ),
    })
}

/// Pass 1: assigns every label the address of the instruction it
/// precedes. Only `.org` and instructions move the address counter.
pub fn resolve_symbols(program: &Program, platform: &Platform) -> Result<SymbolTable> {
    let mut symbols = SymbolTable::seeded(platform);
    let mut address: u32 = 0;

    for statement in &program.statements {
        match statement {
            Statement::Directive { name, argument } if name.text == ORIGIN => {
                address = match argument {
                    Argument::Address(tok) => u32::from(literal(tok)?),
                    other => {
                        return Err(Error::Directive {
                            name: name.text.clone(),
                            position: name.position,
                            message: format!("origin must be an address literal, got `{}`", other),
                        })
                    }
                };
            }
            Statement::Directive { .. } => {}
            Statement::Instruction(ins) => {
                let here = u16::try_from(address)
                    .map_err(|_| Error::AddressOverflow { position: ins.position() })?;
                for label in &ins.labels {
                    symbols.declare(label, here)?;
                }
                address += u32::from(ins.mode.size());
                if address > 0x1_0000 {
                    return Err(Error::AddressOverflow { position: ins.position() });
                }
            }
        }
    }

    for label in &program.trailing_labels {
        let here = u16::try_from(address)
            .map_err(|_| Error::AddressOverflow { position: label.position })?;
        symbols.declare(label, here)?;
    }

    info!("Resolved {} symbols.", symbols.len());
    Ok(symbols)
}

/// The biased relative encoding of a branch at `pc` to `target`, or `None`
/// when the distance does not fit in a signed byte.
pub fn relative_offset(target: u16, pc: u16) -> Option<u8> {
    let raw = 126 + i32::from(target) - i32::from(pc);
    if !(0..=255).contains(&raw) {
        return None;
    }
    let raw = raw as u8;
    Some(if raw == 128 {
        0
    } else if raw < 128 {
        raw | 0b1000_0000
    } else {
        raw & 0b0111_1111
    })
}

/// Encodes one instruction placed at `pc`.
pub fn encode(ins: &Instruction, pc: u16, symbols: &SymbolTable) -> Result<Vec<u8>> {
    let position = ins.position();
    let opcode = opcodes::opcode(ins.mnemonic(), ins.mode).ok_or_else(|| Error::UnknownOpcode {
        mnemonic: ins.mnemonic().to_owned(),
        mode: ins.mode.short_name(),
        position,
    })?;

    let operand = match ins.operand() {
        None => return Ok(vec![opcode]),
        Some(tok) => operand_value(tok, symbols)?,
    };

    if ins.mode == AddressingMode::Relative {
        let offset = relative_offset(operand, pc)
            .ok_or(Error::BranchOutOfRange { target: operand, pc, position })?;
        return Ok(vec![opcode, offset]);
    }

    match ins.mode.size() {
        2 => {
            let byte = u8::try_from(operand)
                .map_err(|_| Error::OperandOverflow { value: operand, position })?;
            Ok(vec![opcode, byte])
        }
        _ => {
            let [lo, hi] = operand.to_le_bytes();
            Ok(vec![opcode, lo, hi])
        }
    }
}

/// Pass 2: encodes every statement into a fresh cartridge.
pub fn generate(
    program: &Program,
    symbols: &SymbolTable,
    directives: &Directives,
) -> Result<(Cartridge, Vec<ListingEntry>)> {
    let mut cart = Cartridge::new();
    let mut listing = Vec::with_capacity(program.statements.len());

    for statement in &program.statements {
        let address = cart.pc();
        let bytes = match statement {
            Statement::Instruction(ins) => {
                let bytes = encode(ins, address, symbols)?;
                let position = ins.position();
                cart.append(&bytes).map_err(|overflow| match overflow {
                    Overflow::Bank(bank) => Error::BankOverflow { bank, position },
                    Overflow::Address    => Error::AddressOverflow { position },
                })?;
                bytes
            }
            Statement::Directive { name, argument } => {
                let handler = directives.get(&name.text).ok_or_else(|| Error::UnknownDirective {
                    name: name.text.clone(),
                    position: name.position,
                })?;
                let value = directive_value(argument, symbols)?;

                let bank = cart.bank_id();
                let before = cart.banks().get(&bank).map_or(0, |b| b.code.len());
                handler(&value, &mut cart).map_err(|message| Error::Directive {
                    name: name.text.clone(),
                    position: name.position,
                    message,
                })?;
                match cart.banks().get(&bank) {
                    Some(b) if cart.bank_id() == bank && b.code.len() > before => b.code[before..].to_vec(),
                    _ => Vec::new(),
                }
            }
        };
        debug!("${:04X}: {} => {:02X?}", address, statement, bytes);
        listing.push(ListingEntry { address, bytes, statement: statement.to_string() });
    }

    info!("Generated {} bytes.", cart.code().len());
    Ok((cart, listing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::cartridge::BANK_SIZE;
    use super::super::error::Position;
    use super::super::lexer::tokenize;
    use super::super::opcodes::OPCODES;
    use super::super::parser::parse;

    fn program(source: &str) -> Program {
        parse(tokenize(source).unwrap()).unwrap()
    }

    fn build(source: &str) -> Result<Vec<u8>> {
        let program = program(source);
        let symbols = resolve_symbols(&program, &Platform::default())?;
        let (cart, _) = generate(&program, &symbols, &Directives::default())?;
        Ok(cart.code())
    }

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token::new(kind, text, Position::default())
    }

    #[test]
    fn test_end_to_end() {
        assert_eq!(build("LDA #$01\nSTA $2000\nRTS\n").unwrap(), vec![0xA9, 0x01, 0x8D, 0x00, 0x20, 0x60]);
        assert_eq!(build("LDX #%10000001\nSTX $10,Y\nLDA ($20),Y\n").unwrap(), vec![0xA2, 0x81, 0x96, 0x10, 0xB1, 0x20]);
        assert_eq!(build("ASL\nJMP ($FFFC)\n").unwrap(), vec![0x0A, 0x6C, 0xFC, 0xFF]);
    }

    #[test]
    fn test_label_resolution() {
        let program = program("loop:\nNOP\nJMP loop\n");
        let symbols = resolve_symbols(&program, &Platform::default()).unwrap();
        assert_eq!(symbols.get("loop"), Some(0));
        let (cart, _) = generate(&program, &symbols, &Directives::default()).unwrap();
        assert_eq!(cart.code(), vec![0xEA, 0x4C, 0x00, 0x00]);
    }

    #[test]
    fn test_pass_one() {
        let program = program("
            .org $C000
            .db $01, $02
            start: NOP
            LDA $2002
            loop: BPL loop
            .org $FFFA
            vectors:
            JMP start
            end:
        ");
        let symbols = resolve_symbols(&program, &Platform::bare()).unwrap();
        // Data directives do not move the counter in this pass.
        assert_eq!(symbols.get("start"), Some(0xC000));
        assert_eq!(symbols.get("loop"), Some(0xC004));
        assert_eq!(symbols.get("vectors"), Some(0xFFFA));
        assert_eq!(symbols.get("end"), Some(0xFFFD));
        assert_eq!(symbols.len(), 4);
    }

    #[test]
    fn test_pass_one_is_idempotent() {
        let program = program("a: NOP\nb: LDA $1000\n.org $8000\nc: RTS\n");
        let copy = program.clone();
        let first = resolve_symbols(&program, &Platform::default()).unwrap();
        let second = resolve_symbols(&copy, &Platform::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.sorted(), vec![("a", 0), ("b", 1), ("c", 0x8000), ("palette", 0xE000), ("sprites", 0xE020)]);
    }

    #[test]
    fn test_reserved_symbols() {
        assert_eq!(build("LDA palette,X\nSTA sprites\n").unwrap(), vec![0xBD, 0x00, 0xE0, 0x8D, 0x20, 0xE0]);

        let program = program("LDA palette\n");
        let symbols = resolve_symbols(&program, &Platform::bare()).unwrap();
        assert!(symbols.is_empty());
        assert!(matches!(
            generate(&program, &symbols, &Directives::default()),
            Err(Error::UnresolvedLabel { ref name, .. }) if name == "palette"
        ));
    }

    #[test]
    fn test_relative_offset() {
        assert_eq!(relative_offset(0x10, 0x10), Some(0xFE));
        assert_eq!(relative_offset(0x12, 0x10), Some(0x00));
        assert_eq!(relative_offset(0x13, 0x10), Some(0x01));
        assert_eq!(relative_offset(0x05, 0x10), Some(0xF3));
        // The extremes of a signed byte, measured from the next instruction.
        assert_eq!(relative_offset(0x1000 + 2 + 127, 0x1000), Some(0x7F));
        assert_eq!(relative_offset(0x1000 + 2 - 128, 0x1000), Some(0x80));
        assert_eq!(relative_offset(0x1000 + 2 + 128, 0x1000), None);
        assert_eq!(relative_offset(0x1000 + 2 - 129, 0x1000), None);
    }

    #[test]
    fn test_branches() {
        assert_eq!(build("loop: NOP\nBNE loop\n").unwrap(), vec![0xEA, 0xD0, 0xFD]);
        assert_eq!(build("BEQ done\nNOP\ndone: RTS\n").unwrap(), vec![0xF0, 0x01, 0xEA, 0x60]);
        assert_eq!(build(".org $C000\nhere: BCS here\n").unwrap(), vec![0xB0, 0xFE]);

        match build(".org $8000\nBNE $9000\n") {
            Err(Error::BranchOutOfRange { target, pc, position }) => {
                assert_eq!((target, pc), (0x9000, 0x8000));
                assert_eq!(position.line, 2);
            }
            other => panic!("expected an out of range branch, got {:?}", other),
        }
    }

    #[test]
    fn test_every_opcode_encodes_to_its_size() {
        use TokenKind::*;
        let symbols = SymbolTable::new();
        for &(mnemonic, mode, op) in OPCODES.iter() {
            let operand: Vec<Token> = match mode {
                AddressingMode::Implied   => vec![],
                AddressingMode::Relative  => vec![tok(Address, "$12")],
                AddressingMode::Immediate => vec![tok(HexNumber, "#$01")],
                AddressingMode::ZeroPage  => vec![tok(Address, "$10")],
                AddressingMode::ZeroPageX => vec![tok(Address, "$10"), tok(Separator, ","), tok(Register, "X")],
                AddressingMode::ZeroPageY => vec![tok(Address, "$10"), tok(Separator, ","), tok(Register, "Y")],
                AddressingMode::Absolute  => vec![tok(Address, "$1234")],
                AddressingMode::AbsoluteX => vec![tok(Address, "$1234"), tok(Separator, ","), tok(Register, "X")],
                AddressingMode::AbsoluteY => vec![tok(Address, "$1234"), tok(Separator, ","), tok(Register, "Y")],
                AddressingMode::IndirectX => vec![tok(Open, "("), tok(Address, "$20"), tok(Separator, ","), tok(Register, "X"), tok(Close, ")")],
                AddressingMode::IndirectY => vec![tok(Open, "("), tok(Address, "$20"), tok(Close, ")"), tok(Separator, ","), tok(Register, "Y")],
                AddressingMode::Indirect  => vec![tok(Open, "("), tok(Address, "$1234"), tok(Close, ")")],
            };
            let mut tokens = vec![tok(Instruction, mnemonic)];
            tokens.extend(operand);
            let ins = super::super::ast::Instruction { mode, tokens, labels: vec![] };

            let bytes = encode(&ins, 0x10, &symbols).unwrap();
            assert_eq!(bytes.len(), usize::from(mode.size()), "{} {}", mnemonic, mode);
            assert_eq!(bytes[0], op);
        }
    }

    #[test]
    fn test_unknown_opcode() {
        match build("NOP\nJMP $10\n") {
            Err(Error::UnknownOpcode { mnemonic, mode, position }) => {
                assert_eq!(mnemonic, "JMP");
                assert_eq!(mode, "zp");
                assert_eq!(position, Position::new(2, 1, 4));
            }
            other => panic!("expected an unknown opcode, got {:?}", other),
        }
        assert!(matches!(build("STA #$01\n"), Err(Error::UnknownOpcode { mode: "imm", .. })));
    }

    #[test]
    fn test_unresolved_label() {
        match build("NOP\n  JMP nowhere\n") {
            Err(Error::UnresolvedLabel { name, position }) => {
                assert_eq!(name, "nowhere");
                assert_eq!(position, Position::new(2, 7, 10));
            }
            other => panic!("expected an unresolved label, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_label() {
        assert!(matches!(
            build("a: NOP\na: NOP\n"),
            Err(Error::DuplicateLabel { ref name, position }) if name == "a" && position.line == 2
        ));
        assert!(matches!(build("palette: NOP\n"), Err(Error::DuplicateLabel { .. })));
    }

    #[test]
    fn test_operand_overflow() {
        assert!(matches!(
            build(".org $C000\nptr: NOP\nLDA (ptr),Y\n"),
            Err(Error::OperandOverflow { value: 0xC000, .. })
        ));
    }

    #[test]
    fn test_address_overflow() {
        assert!(matches!(build(".org $FFFF\nNOP\nNOP\n"), Err(Error::AddressOverflow { .. })));
        assert_eq!(build(".org $FFFF\nNOP\n").unwrap(), vec![0xEA]);

        // The last instruction itself must end inside the address space.
        match build(".org $FFFF\nLDA $1234\n") {
            Err(Error::AddressOverflow { position }) => assert_eq!(position, Position::new(2, 1, 11)),
            other => panic!("expected an address overflow, got {:?}", other),
        }

        // Data is not counted in pass 1, so pass 2 has to catch it.
        assert!(matches!(build(".org $FFFE\n.db $01, $02\nNOP\n"), Err(Error::AddressOverflow { .. })));
    }

    #[test]
    fn test_bank_overflow() {
        match build(".org $C000\nreset: NOP\n.org $FFFA\n.dw reset\n") {
            Err(Error::Directive { name, message, position }) => {
                assert_eq!(name, ".org");
                assert_eq!(message, "bank 0 does not fit in 8192 bytes");
                assert_eq!(position.line, 3);
            }
            other => panic!("expected the origin to overflow the bank, got {:?}", other),
        }

        // A bank filled to the last byte is fine; one more instruction is not.
        let full = format!(".org $C000\n.db {}\nNOP\n", vec!["$00"; BANK_SIZE - 1].join(", "));
        assert_eq!(build(&full).unwrap().len(), BANK_SIZE);
        match build(&format!("{}RTS\n", full)) {
            Err(Error::BankOverflow { bank, position }) => {
                assert_eq!(bank, 0);
                assert_eq!(position.line, 4);
            }
            other => panic!("expected the bank to overflow, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_out_of_range() {
        match build(".inesprg 4294967296\n") {
            Err(Error::Literal { text, position }) => {
                assert_eq!(text, "4294967296");
                assert_eq!(position, Position::new(1, 10, 9));
            }
            other => panic!("expected an out of range literal, got {:?}", other),
        }
    }

    #[test]
    fn test_directives() {
        assert_eq!(build("start: NOP\n.dw start\n.db $01, $02\n.db \"AB\"\n").unwrap(), vec![
            0xEA, 0x00, 0x00, 0x01, 0x02, b'A', b'B',
        ]);
        assert_eq!(build(".org $C000\nNOP\n.org $C003\nRTS\n").unwrap(), vec![0xEA, 0xFF, 0xFF, 0x60]);

        match build("NOP\n.incbin \"tiles.chr\"\n") {
            Err(Error::UnknownDirective { name, position }) => {
                assert_eq!(name, ".incbin");
                assert_eq!(position.line, 2);
            }
            other => panic!("expected an unknown directive, got {:?}", other),
        }
        match build(".db 300\n") {
            Err(Error::Directive { name, message, .. }) => {
                assert_eq!(name, ".db");
                assert_eq!(message, "300 does not fit in a byte");
            }
            other => panic!("expected a directive error, got {:?}", other),
        }
        assert!(matches!(build(".org start\nstart: NOP\n"), Err(Error::Directive { .. })));
    }

    #[test]
    fn test_listing() {
        let program = program(".org $C000\nLDA #$01\n.db $02, $03\nRTS\n");
        let symbols = resolve_symbols(&program, &Platform::default()).unwrap();
        let (_, listing) = generate(&program, &symbols, &Directives::default()).unwrap();
        let summary: Vec<(u16, Vec<u8>, &str)> = listing
            .iter()
            .map(|e| (e.address, e.bytes.clone(), e.statement.as_str()))
            .collect();
        assert_eq!(summary, vec![
            (0x0000, vec![], ".org $C000"),
            (0xC000, vec![0xA9, 0x01], "LDA #$01"),
            (0xC002, vec![0x02, 0x03], ".db $02, $03"),
            (0xC004, vec![0x60], "RTS"),
        ]);
    }
}
