use std::fs;
use std::path::Path;

use crate::ast::Block;
use crate::lexer::Lexer;
use crate::parser::{ParseError, Parser};

/// The file suffix is checked lexically and case-sensitively.
pub fn is_idzey_file(path: &str) -> bool {
    Path::new(path).extension().map_or(false, |ext| ext == "idzey")
}

/// Read a program file, rejecting wrong suffixes and empty files before any
/// parsing happens.
pub fn read_program(path: &str) -> Result<String, String> {
    if !is_idzey_file(path) {
        return Err(format!(
            "Invalid file format: expected a '.idzey' file, got '{}'",
            path
        ));
    }

    let source =
        fs::read_to_string(path).map_err(|e| format!("Cannot open file '{}': {}", path, e))?;

    if source.is_empty() {
        return Err(format!("Source file is empty: '{}'", path));
    }

    Ok(source)
}

pub fn parse_source(source: &str) -> Result<Block, ParseError> {
    let lexer = Lexer::new(source);
    let mut parser = Parser::new(lexer);
    parser.parse()
}
