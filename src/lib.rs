use std::{fs::File, io::Read, path::Path};

pub mod analyzer;
pub mod ast;
pub mod codegen;
pub mod errors;
pub mod lexer;
pub mod parser;
pub mod symboltable;
pub mod token;

use errors::{Pl0Error, Pl0Result};

pub const VERSION: &str = "0.1.0";

/// Reads a PL/0 source file into memory.
pub fn read(filename: &Path) -> Pl0Result<String> {
    match filename.extension() {
        Some(ext) if ext.eq("pl0") => {}
        _ => {
            return Err(Pl0Error::FileReadError(
                "file must have a .pl0 extension".to_string(),
            ));
        }
    }
    let mut file = File::open(filename)
        .map_err(|why| Pl0Error::FileReadError(format!("couldn't open file: {why}")))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|why| Pl0Error::FileReadError(format!("couldn't read: {why}")))?;
    Ok(contents)
}
