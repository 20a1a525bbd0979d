//! Text form of the artifacts handed from Pass 1 to Pass 2.
//!
//! MNT blocks look like
//!
//! ```text
//! IDX  NAME         MDTST    PARAMS   DEFKEYS
//! 1    INCR         1        2        1
//! #PARAMS &REG,&VAL
//! #DEFAULTS &VAL=1
//! ```
//!
//! and MDT rows are `index text`, with `MEND` closing each body. Reading the
//! two back yields the same [`MacroTable`] Pass 1 built.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing::debug;

use crate::ast::{IntermediateProgram, MEND, MacroDefinition, MacroTable, TemplateLine};
use crate::config::ArtifactPaths;
use crate::error::{MacroError, Result};
use crate::normalize::normalize_line;
use crate::parser::LineParser;

const MNT: &str = "MNT";
const MDT: &str = "MDT";

pub fn render_mnt(table: &MacroTable) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        &format!(
            "{:<4} {:<12} {:<8} {:<8} {:<8}",
            "IDX", "NAME", "MDTST", "PARAMS", "DEFKEYS"
        ),
    );

    for def in table.definitions() {
        push_row(
            &mut out,
            &format!(
                "{:<4} {:<12} {:<8} {:<8} {:<8}",
                def.index,
                def.name,
                def.body_start,
                def.param_count(),
                def.default_count()
            ),
        );
        push_row(&mut out, &format!("#PARAMS {}", def.formals.join(",")));

        let defaults: Vec<String> = def
            .ordered_defaults()
            .map(|(formal, value)| format!("{formal}={value}"))
            .collect();
        push_row(&mut out, &format!("#DEFAULTS {}", defaults.join(",")));
    }
    out
}

pub fn render_mdt(table: &MacroTable) -> String {
    let mut out = String::new();
    push_row(&mut out, &format!("{:<6} {}", "INDEX", "LINE"));
    for (index, line) in table.mdt().iter() {
        push_row(&mut out, &format!("{:<6} {}", index, line.as_str()));
    }
    out
}

/// Argument list array: which placeholder stands for which formal
pub fn render_ala(table: &MacroTable) -> String {
    let mut out = String::new();
    for def in table.definitions() {
        push_row(
            &mut out,
            &format!("ALA for Macro {} {}", def.index, def.name),
        );
        if def.formals.is_empty() {
            push_row(&mut out, "(no parameters)");
        }
        for (k, formal) in def.formals.iter().enumerate() {
            push_row(&mut out, &format!("#{} -> {}", k + 1, formal));
        }
        out.push('\n');
    }
    out
}

/// One line per entry, written exactly as given
pub fn render_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}

/// Fixed-width table row; padding after the last column is dropped.
fn push_row(out: &mut String, row: &str) {
    out.push_str(row.trim_end());
    out.push('\n');
}

/// Rebuild a macro table from MNT and MDT text
pub fn parse_tables(mnt: &str, mdt: &str) -> Result<MacroTable> {
    let mut table = MacroTable::new();
    for line in parse_mdt(mdt)? {
        table.mdt_mut().push(line);
    }

    for (line, def) in parse_mnt(mnt)? {
        // A body starts at index 1 or right after another body's MEND.
        let opens_body = match def.body_start {
            0 => false,
            1 => table.mdt().get(1).is_some(),
            start => {
                table.mdt().get(start).is_some()
                    && table.mdt().get(start - 1) == Some(&TemplateLine::End)
            }
        };
        if !opens_body {
            return Err(table_error(
                MNT,
                line,
                format!(
                    "body start {} is not the start of a body in the MDT",
                    def.body_start
                ),
            ));
        }
        table.register(def);
    }
    Ok(table)
}

fn parse_mdt(text: &str) -> Result<Vec<TemplateLine>> {
    let mut lines = Vec::new();

    for (number, row) in numbered(text) {
        if starts_with_ignore_case(row, "INDEX") {
            continue;
        }

        let (index, body) = LineParser::parse_mdt_row(row)
            .map_err(|e| table_error(MDT, number, e.variant.message().into_owned()))?;
        if index != lines.len() + 1 {
            return Err(table_error(
                MDT,
                number,
                format!("expected index {}, found {index}", lines.len() + 1),
            ));
        }

        let body =
            body.ok_or_else(|| table_error(MDT, number, "missing template text".to_string()))?;
        lines.push(if body.eq_ignore_ascii_case(MEND) {
            TemplateLine::End
        } else {
            TemplateLine::Text(body.to_string())
        });
    }
    Ok(lines)
}

fn parse_mnt(text: &str) -> Result<Vec<(usize, MacroDefinition)>> {
    let mut rows = numbered(text).filter(|(_, row)| !starts_with_ignore_case(row, "IDX"));
    let mut definitions = Vec::new();

    while let Some((number, row)) = rows.next() {
        let entry = LineParser::parse_mnt_row(row)
            .map_err(|e| table_error(MNT, number, e.variant.message().into_owned()))?;
        if entry.index != definitions.len() + 1 {
            return Err(table_error(
                MNT,
                number,
                format!(
                    "expected index {}, found {}",
                    definitions.len() + 1,
                    entry.index
                ),
            ));
        }

        let (params_number, params_row) = rows
            .next()
            .ok_or_else(|| table_error(MNT, number, "missing #PARAMS row".to_string()))?;
        let formals: Vec<String> = LineParser::parse_params_row(params_row)
            .map_err(|e| table_error(MNT, params_number, e.variant.message().into_owned()))?
            .into_iter()
            .map(str::to_ascii_uppercase)
            .collect();

        let (defaults_number, defaults_row) = rows
            .next()
            .ok_or_else(|| table_error(MNT, number, "missing #DEFAULTS row".to_string()))?;
        let mut defaults = HashMap::new();
        for (formal, value) in LineParser::parse_defaults_row(defaults_row)
            .map_err(|e| table_error(MNT, defaults_number, e.variant.message().into_owned()))?
        {
            let formal = formal.to_ascii_uppercase();
            if !formals.contains(&formal) {
                return Err(table_error(
                    MNT,
                    defaults_number,
                    format!("default for undeclared formal {formal}"),
                ));
            }
            defaults.insert(formal, value.to_string());
        }

        if formals.len() != entry.param_count || defaults.len() != entry.default_count {
            return Err(table_error(
                MNT,
                number,
                format!(
                    "{} declares {} params and {} defaults, rows list {} and {}",
                    entry.name,
                    entry.param_count,
                    entry.default_count,
                    formals.len(),
                    defaults.len()
                ),
            ));
        }

        definitions.push((
            number,
            MacroDefinition {
                index: entry.index,
                name: entry.name.to_ascii_uppercase(),
                formals,
                defaults,
                body_start: entry.body_start,
            },
        ));
    }
    Ok(definitions)
}

/// Non-blank lines with their 1-based line numbers
fn numbered(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line))
}

fn starts_with_ignore_case(row: &str, prefix: &str) -> bool {
    row.trim_start()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn table_error(artifact: &'static str, line: usize, message: String) -> MacroError {
    MacroError::TableFormat {
        artifact,
        line,
        message,
    }
}

/// Read a required artifact; a file that does not exist is `MissingInput`.
pub fn read_artifact(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| missing_or_io(path, e))
}

pub fn open_artifact(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| missing_or_io(path, e))
}

fn missing_or_io(path: &Path, err: io::Error) -> MacroError {
    match err.kind() {
        io::ErrorKind::NotFound => MacroError::MissingInput {
            path: path.to_path_buf(),
        },
        _ => MacroError::Io(err),
    }
}

pub fn load_tables(paths: &ArtifactPaths) -> Result<MacroTable> {
    let mnt = read_artifact(&paths.mnt)?;
    let mdt = read_artifact(&paths.mdt)?;
    let table = parse_tables(&mnt, &mdt)?;
    debug!(
        macros = table.definitions().len(),
        mdt_lines = table.mdt().len(),
        "loaded macro tables"
    );
    Ok(table)
}

pub fn load_intermediate(paths: &ArtifactPaths) -> Result<IntermediateProgram> {
    let text = read_artifact(&paths.intermediate)?;
    Ok(text.lines().filter_map(normalize_line).collect())
}

/// Write MNT, MDT, ALA and the intermediate program
pub fn save_pass1(
    paths: &ArtifactPaths,
    table: &MacroTable,
    program: &IntermediateProgram,
) -> Result<()> {
    fs::write(&paths.mnt, render_mnt(table))?;
    fs::write(&paths.mdt, render_mdt(table))?;
    fs::write(&paths.ala, render_ala(table))?;
    fs::write(&paths.intermediate, render_lines(program.lines()))?;
    Ok(())
}

pub fn save_expanded(paths: &ArtifactPaths, expanded: &[String]) -> Result<()> {
    fs::write(&paths.expanded, render_lines(expanded))?;
    Ok(())
}
