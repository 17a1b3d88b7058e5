//! Directive handlers.
//!
//! A handler receives its argument already resolved (labels looked up,
//! literals parsed) and acts on the cartridge. It reports a bad argument
//! as a message; the code generator attaches the source position.
use std::collections::HashMap;
use super::cartridge::Cartridge;

/// The directive that sets the program origin. Pass 1 also tracks it.
pub const ORIGIN: &str = ".org";

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DirectiveValue<'a> {
    Number(u32),
    Address(u16),
    Text(&'a str),
    List(Vec<u16>),
}

impl<'a> DirectiveValue<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            DirectiveValue::Number(_)  => "a decimal number",
            DirectiveValue::Address(_) => "an address",
            DirectiveValue::Text(_)    => "a string",
            DirectiveValue::List(_)    => "a list",
        }
    }
}

pub type Handler = fn(&DirectiveValue, &mut Cartridge) -> Result<(), String>;

/// Directive name to handler.
#[derive(Clone)]
pub struct Directives {
    handlers: HashMap<String, Handler>,
}

impl Directives {
    /// A registry with no directives at all.
    pub fn empty() -> Self {
        Directives { handlers: HashMap::new() }
    }

    /// Adds `handler` under `name`, replacing any previous one.
    pub fn register(&mut self, name: &str, handler: Handler) -> &mut Self {
        self.handlers.insert(name.to_owned(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).copied()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for Directives {
    fn default() -> Self {
        let mut directives = Directives::empty();
        directives
            .register(ORIGIN, org)
            .register(".db", db)
            .register(".dw", dw)
            .register(".bank", bank)
            .register(".inesprg", inesprg)
            .register(".ineschr", ineschr)
            .register(".inesmap", inesmap)
            .register(".inesmir", inesmir);
        directives
    }
}

fn expected(what: &str, got: &DirectiveValue) -> String {
    format!("expected {}, got {}", what, got.kind())
}

/// A value that must fit in one byte.
fn byte(value: u32) -> Result<u8, String> {
    if value > 0xFF {
        Err(format!("{} does not fit in a byte", value))
    } else {
        Ok(value as u8)
    }
}

fn number_byte(value: &DirectiveValue) -> Result<u8, String> {
    match value {
        DirectiveValue::Number(n) => byte(*n),
        other => Err(expected("a decimal number", other)),
    }
}

pub fn org(value: &DirectiveValue, cart: &mut Cartridge) -> Result<(), String> {
    match value {
        DirectiveValue::Address(addr) => cart.set_org(*addr).map_err(|e| e.to_string()),
        other => Err(expected("an address", other)),
    }
}

pub fn db(value: &DirectiveValue, cart: &mut Cartridge) -> Result<(), String> {
    let bytes = match value {
        DirectiveValue::Number(n)     => vec![byte(*n)?],
        DirectiveValue::Address(addr) => vec![byte(u32::from(*addr))?],
        DirectiveValue::Text(text)    => text.as_bytes().to_vec(),
        DirectiveValue::List(values)  => values
            .iter()
            .map(|v| byte(u32::from(*v)))
            .collect::<Result<Vec<u8>, String>>()?,
    };
    cart.append(&bytes).map_err(|e| e.to_string())
}

pub fn dw(value: &DirectiveValue, cart: &mut Cartridge) -> Result<(), String> {
    let words = match value {
        DirectiveValue::Address(addr) => vec![*addr],
        DirectiveValue::List(values)  => values.clone(),
        other => return Err(expected("an address or a list", other)),
    };
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes().to_vec()).collect();
    cart.append(&bytes).map_err(|e| e.to_string())
}

pub fn bank(value: &DirectiveValue, cart: &mut Cartridge) -> Result<(), String> {
    cart.set_bank(number_byte(value)?);
    Ok(())
}

pub fn inesprg(value: &DirectiveValue, cart: &mut Cartridge) -> Result<(), String> {
    cart.header.prg = number_byte(value)?;
    Ok(())
}

pub fn ineschr(value: &DirectiveValue, cart: &mut Cartridge) -> Result<(), String> {
    cart.header.chr = number_byte(value)?;
    Ok(())
}

pub fn inesmap(value: &DirectiveValue, cart: &mut Cartridge) -> Result<(), String> {
    cart.header.mapper = number_byte(value)?;
    Ok(())
}

pub fn inesmir(value: &DirectiveValue, cart: &mut Cartridge) -> Result<(), String> {
    match number_byte(value)? {
        m @ 0..=1 => {
            cart.header.mirroring = m;
            Ok(())
        }
        m => Err(format!("mirroring must be 0 or 1, got {}", m)),
    }
}
