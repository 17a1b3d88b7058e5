#[macro_use] extern crate log;
extern crate regex;
extern crate thiserror;

pub mod assembler;
