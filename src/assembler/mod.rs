//! The Assembler module is in charge of taking 6502 source text and
//! producing a machine-code image, raw or wrapped as an iNES ROM.
//!
//! It does this in four stages: a regex-driven tokenizer, a parser
//! matching an ordered table of addressing-mode patterns, a first pass
//! assigning label addresses and a second pass encoding opcodes and
//! running directives against the cartridge.

pub mod ast;
pub mod cartridge;
pub mod directives;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod opcodes;
pub mod parser;
pub mod semantic;

use self::cartridge::Cartridge;
use self::directives::Directives;
use self::error::Result;
use self::lexer::Lexer;
use self::ast::Program;
use self::semantic::{ListingEntry, SymbolTable};

/// Target platform settings seeded into every assembly.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Platform {
    /// Symbols defined before pass 1 starts.
    pub reserved: Vec<(String, u16)>,
}

impl Platform {
    /// The NES: palette and sprite buffers at the top of PRG space.
    pub fn nes() -> Self {
        Platform::bare()
            .with_symbol("palette", 0xE000)
            .with_symbol("sprites", 0xE000 + 32)
    }

    /// No reserved symbols.
    pub fn bare() -> Self {
        Platform { reserved: Vec::new() }
    }

    pub fn with_symbol(mut self, name: &str, address: u16) -> Self {
        self.reserved.push((name.to_owned(), address));
        self
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::nes()
    }
}

/// Everything one assembly run produced.
#[derive(Clone, Debug)]
pub struct Assembly {
    pub cartridge: Cartridge,
    pub symbols: SymbolTable,
    pub listing: Vec<ListingEntry>,
}

impl Assembly {
    /// The output bytes, wrapped in the iNES container if `ines` is set.
    pub fn bytes(&self, ines: bool) -> Vec<u8> {
        self.cartridge.finish(ines)
    }
}

/// A compiled tokenizer together with the platform and directive set,
/// reusable across any number of sources.
pub struct Assembler {
    lexer: Lexer,
    platform: Platform,
    directives: Directives,
}

impl Assembler {
    pub fn new(platform: Platform, directives: Directives) -> Result<Self> {
        Ok(Assembler { lexer: Lexer::new()?, platform, directives })
    }

    /// Tokenizes and parses `source` without assembling it.
    pub fn parse(&self, source: &str) -> Result<Program> {
        parser::parse(self.lexer.tokenize(source)?)
    }

    pub fn assemble(&self, source: &str) -> Result<Assembly> {
        let program = self.parse(source)?;
        let symbols = semantic::resolve_symbols(&program, &self.platform)?;
        let (cartridge, listing) = semantic::generate(&program, &symbols, &self.directives)?;
        Ok(Assembly { cartridge, symbols, listing })
    }
}

/// Assembles `source` for `platform` with the given directive set.
pub fn assemble(source: &str, platform: &Platform, directives: &Directives) -> Result<Assembly> {
    Assembler::new(platform.clone(), directives.clone())?.assemble(source)
}

/// Assembles `source` for the NES with the built-in directives.
pub fn compile(source: &str, wrap_in_container: bool) -> Result<Vec<u8>> {
    let assembly = assemble(source, &Platform::default(), &Directives::default())?;
    Ok(assembly.bytes(wrap_in_container))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::cartridge::BANK_SIZE;
    use super::error::Error;

    #[test]
    fn test_compile_raw() {
        assert_eq!(compile("LDA #$01\nSTA $2000\nRTS\n", false).unwrap(), vec![0xA9, 0x01, 0x8D, 0x00, 0x20, 0x60]);
        assert_eq!(compile("loop:\nNOP\nJMP loop\n", false).unwrap(), vec![0xEA, 0x4C, 0x00, 0x00]);
        assert!(compile("", false).unwrap().is_empty());
    }

    #[test]
    fn test_compile_ines() {
        let source = "
            .inesprg 1
            .ineschr 1
            .inesmap 0
            .inesmir 1

            .bank 0
            .org $C000
        reset:
            SEI
            CLD
            LDX #$FF
            TXS
        vblank:
            BIT $2002
            BPL vblank
            JMP reset

            .bank 1
            .org $E000
            .dw reset
        ";
        let rom = compile(source, true).unwrap();
        assert_eq!(rom.len(), 16 + 2 * BANK_SIZE);
        assert_eq!(&rom[..8], &[0x4E, 0x45, 0x53, 0x1A, 0x01, 0x01, 0x01, 0x00]);
        assert_eq!(&rom[16..30], &[
            0x78, 0xD8, 0xA2, 0xFF, 0x9A,
            0x2C, 0x02, 0x20, 0x10, 0xFB,
            0x4C, 0x00, 0xC0, 0xFF,
        ]);
        assert_eq!(&rom[16 + BANK_SIZE..16 + BANK_SIZE + 3], &[0x00, 0xC0, 0xFF]);

        // Without the container only the code itself remains.
        assert_eq!(compile(source, false).unwrap().len(), 13 + 2);
    }

    #[test]
    fn test_assemble_with_platform() {
        let platform = Platform::bare().with_symbol("PPUCTRL", 0x2000);
        let assembly = assemble("STA PPUCTRL\n", &platform, &Directives::default()).unwrap();
        assert_eq!(assembly.bytes(false), vec![0x8D, 0x00, 0x20]);
        assert_eq!(assembly.symbols.get("PPUCTRL"), Some(0x2000));
        assert_eq!(assembly.symbols.get("palette"), None);
        assert_eq!(assembly.listing.len(), 1);

        assert!(matches!(
            assemble(".org $C000\n", &platform, &Directives::empty()),
            Err(Error::UnknownDirective { .. })
        ));
    }

    #[test]
    fn test_assembler_reuse() {
        let assembler = Assembler::new(Platform::bare(), Directives::default()).unwrap();
        assert_eq!(assembler.assemble("NOP\n").unwrap().bytes(false), vec![0xEA]);
        assert_eq!(assembler.assemble("a: JMP a\n").unwrap().bytes(false), vec![0x4C, 0x00, 0x00]);
        assert!(matches!(assembler.assemble("JMP b\n"), Err(Error::UnresolvedLabel { .. })));

        let program = assembler.parse("LDA #$01\n.db $02, $03\n").unwrap();
        assert_eq!(program.statements.len(), 2);
        assert_eq!(program.statements[1].to_string(), ".db $02, $03");
    }

    #[test]
    fn test_errors_abort() {
        assert!(matches!(compile("LDA @1\n", false), Err(Error::Lex { .. })));
        assert!(matches!(compile("LDA #$01 #$02\n", false), Err(Error::Syntax { .. })));
        assert!(matches!(compile("JMP away\n", false), Err(Error::UnresolvedLabel { .. })));
        assert!(matches!(compile("LDX $1000,X\n", false), Err(Error::UnknownOpcode { .. })));
        assert!(matches!(compile(".word $1000\n", false), Err(Error::UnknownDirective { .. })));
        assert!(matches!(compile(".inesprg 4294967296\n", false), Err(Error::Literal { .. })));
        assert!(matches!(compile(".org $FFFF\nLDA $1234\n", false), Err(Error::AddressOverflow { .. })));
        assert!(matches!(
            compile(".org $C000\nreset: NOP\n.org $FFFA\n.dw reset\n", true),
            Err(Error::Directive { .. })
        ));
    }

    #[test]
    fn test_platform() {
        assert_eq!(Platform::default().reserved, vec![
            ("palette".to_owned(), 0xE000),
            ("sprites".to_owned(), 0xE020),
        ]);
        assert!(Platform::bare().reserved.is_empty());
    }
}
