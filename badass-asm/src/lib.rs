//! Parses and assembles 6502/65C02 source into laid-out sections.
//!
//! The pipeline: `grammar` turns source text into an [`ast::Program`],
//! [`pass::Driver`] walks it to a fixed point resolving symbols and encoding
//! instructions via [`instruction`], [`section::SectionTable`] turns the
//! result into final addresses, and `cache` memoizes the parse step across
//! runs keyed on the grammar and source hashes.

pub mod ast;
pub mod cache;
pub mod error;
pub mod eval;
pub mod grammar;
pub mod instruction;
pub mod labels;
pub mod macros;
pub mod meta;
pub mod pass;
pub mod section;
pub mod symtab;
pub mod value;

pub use error::{Error, Located};
pub use pass::{AssembleOptions, AssembleReport, Driver};

use std::path::Path;
use std::rc::Rc;

/// Assembles `source` (the contents of `file`, used for error messages) into
/// a [`Driver`] holding the final symbol table and laid-out sections.
///
/// Wires `Driver::loader`/`Driver::parser` to real filesystem access and the
/// grammar's parser, so `!include`/`!incbin` work without `pass` depending on
/// `grammar` directly.
pub fn assemble_file(path: &Path, options: &AssembleOptions) -> Result<(Driver, AssembleReport), Vec<Located>> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        vec![Located { file: path.display().to_string(), line: 0, error: Error::Io(e.to_string()) }]
    })?;
    let program = cache::parse_cached(&source, grammar::parse)
        .map_err(|e| vec![Located { file: path.display().to_string(), line: 0, error: e }])?;

    let mut driver = Driver::new(options);
    driver.loader = Some(Rc::new(|p: &str| std::fs::read(p).map_err(Error::from)));
    driver.parser = Some(Rc::new(|text: &str| cache::parse_cached(text, grammar::parse)));

    let report = driver.assemble(&path.display().to_string(), &program, options.max_passes)?;
    Ok((driver, report))
}
