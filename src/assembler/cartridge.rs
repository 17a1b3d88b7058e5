//! The output image: emitted bytes grouped into banks, the running
//! program counter and the iNES header fields.
use std::collections::BTreeMap;
use std::fmt;

/// Size of a bank in the iNES image. Banks are padded to this with `$FF`.
pub const BANK_SIZE: usize = 0x2000;

const INES_MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];

/// One past the last addressable byte.
const ADDRESS_SPACE: u32 = 0x1_0000;

/// Why bytes could not be placed in the cartridge.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Overflow {
    /// The bank would grow past `BANK_SIZE`.
    Bank(u8),
    /// The program counter would run past `$FFFF`.
    Address,
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Overflow::Bank(id) => write!(f, "bank {} does not fit in {} bytes", id, BANK_SIZE),
            Overflow::Address  => write!(f, "program runs past $FFFF"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Bank {
    /// The origin of the first byte, once one has been set.
    pub start: Option<u16>,
    pub code: Vec<u8>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct InesHeader {
    /// PRG-ROM size in 16 KiB units.
    pub prg: u8,
    /// CHR-ROM size in 8 KiB units.
    pub chr: u8,
    pub mapper: u8,
    /// 0 horizontal, 1 vertical.
    pub mirroring: u8,
}

impl Default for InesHeader {
    fn default() -> Self {
        InesHeader { prg: 1, chr: 1, mapper: 0, mirroring: 1 }
    }
}

impl InesHeader {
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut header = [0u8; 16];
        header[..4].copy_from_slice(&INES_MAGIC);
        header[4] = self.prg;
        header[5] = self.chr;
        header[6] = ((self.mapper & 0x0F) << 4) | (self.mirroring & 0x01);
        header[7] = self.mapper & 0xF0;
        header
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Cartridge {
    banks:   BTreeMap<u8, Bank>,
    bank_id: u8,
    /// Kept wide so the counter can sit just past `$FFFF` after the last byte.
    pc:      u32,
    pub header: InesHeader,
}

impl Cartridge {
    pub fn new() -> Self {
        Cartridge::default()
    }

    pub fn pc(&self) -> u16 {
        self.pc as u16
    }

    pub fn bank_id(&self) -> u8 {
        self.bank_id
    }

    pub fn banks(&self) -> &BTreeMap<u8, Bank> {
        &self.banks
    }

    fn bank_mut(&mut self) -> &mut Bank {
        self.banks.entry(self.bank_id).or_default()
    }

    /// Appends bytes to the current bank and advances the program counter.
    /// Nothing is written when the bytes would overflow the bank or the
    /// address space.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), Overflow> {
        let end = self.pc + bytes.len() as u32;
        if end > ADDRESS_SPACE {
            return Err(Overflow::Address);
        }
        let id = self.bank_id;
        let bank = self.banks.entry(id).or_default();
        if bank.code.len() + bytes.len() > BANK_SIZE {
            return Err(Overflow::Bank(id));
        }
        bank.code.extend_from_slice(bytes);
        self.pc = end;
        Ok(())
    }

    /// Moves the program counter to `org`. A bank with no code yet starts
    /// there; otherwise the gap up to `org` is filled with `$FF`.
    pub fn set_org(&mut self, org: u16) -> Result<(), Overflow> {
        let (id, pc, org) = (self.bank_id, self.pc, u32::from(org));
        let bank = self.banks.entry(id).or_default();
        if bank.code.is_empty() {
            bank.start = Some(org as u16);
        } else if org > pc {
            let padded = bank.code.len() + (org - pc) as usize;
            if padded > BANK_SIZE {
                return Err(Overflow::Bank(id));
            }
            bank.code.resize(padded, 0xFF);
        } else {
            warn!("origin ${:04X} is behind the program counter ${:04X}", org, pc);
        }
        self.pc = org;
        Ok(())
    }

    /// Switches to bank `id`, creating it if needed. The program counter is
    /// left alone; a `.org` normally follows.
    pub fn set_bank(&mut self, id: u8) {
        self.bank_id = id;
        self.bank_mut();
    }

    /// The banks' code concatenated in bank order.
    pub fn code(&self) -> Vec<u8> {
        self.banks.values().flat_map(|b| b.code.iter().copied()).collect()
    }

    /// The iNES image: header followed by every bank padded to `BANK_SIZE`.
    pub fn ines(&self) -> Vec<u8> {
        let mut image = self.header.to_bytes().to_vec();
        if self.banks.is_empty() {
            image.resize(image.len() + BANK_SIZE, 0xFF);
            return image;
        }
        for bank in self.banks.values() {
            image.extend_from_slice(&bank.code);
            image.resize(image.len() + BANK_SIZE - bank.code.len(), 0xFF);
        }
        image
    }

    /// The finished image, raw or wrapped in the iNES container.
    pub fn finish(&self, ines: bool) -> Vec<u8> {
        if ines { self.ines() } else { self.code() }
    }
}
