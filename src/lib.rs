//! Two-pass macro processor for assembly-like source.
//!
//! Pass 1 ([`builder`]) collects `MACRO ... MEND` definitions into a
//! [`MacroTable`] and strips them from the program. Pass 2 ([`processor`])
//! rewrites every invocation into its body, binding positional and keyword
//! actuals and expanding nested invocations.

pub mod ast;
pub mod builder;
pub mod config;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod processor;
pub mod resolver;
pub mod tables;

pub use ast::{DefinitionTable, IntermediateProgram, MacroDefinition, MacroTable, TemplateLine};
pub use builder::{MacroTableBuilder, build_tables};
pub use config::{ArtifactPaths, ExpandOptions};
pub use error::{DefinitionError, MacroError, Result};
pub use normalize::normalize_line;
pub use processor::{Expander, ExpandingReader, substitute_placeholders};
pub use resolver::resolve_arguments;

/// Run both passes over `source` and return the expanded program
pub fn process(source: &str, options: &ExpandOptions) -> Result<Vec<String>> {
    let (table, program) = build_tables(source)?;
    Expander::with_options(&table, *options).expand(&program)
}
