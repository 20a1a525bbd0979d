use std::collections::HashMap;

use tracing::{debug, warn};

use crate::ast::{IntermediateProgram, MEND, MacroDefinition, MacroTable, SIGIL, TemplateLine};
use crate::error::{DefinitionError, Result};
use crate::normalize::normalize_line;
use crate::parser::LineParser;

const MACRO: &str = "MACRO";

/// Pass 1: collects `MACRO ... MEND` blocks into a [`MacroTable`] and keeps
/// every other line, in order, as the intermediate program.
#[derive(Debug, Default)]
pub struct MacroTableBuilder {
    table: MacroTable,
    intermediate: Vec<String>,
}

impl MacroTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the whole source. Any malformed definition aborts the pass and
    /// no partial table escapes.
    pub fn build<'a, I>(mut self, source: I) -> Result<(MacroTable, IntermediateProgram)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut lines = source
            .into_iter()
            .enumerate()
            .filter_map(|(i, raw)| normalize_line(raw).map(|line| (i + 1, line)));

        while let Some((number, line)) = lines.next() {
            if line.eq_ignore_ascii_case(MACRO) {
                self.define(number, &mut lines)?;
            } else {
                self.intermediate.push(line.to_string());
            }
        }

        Ok((self.table, IntermediateProgram(self.intermediate)))
    }

    fn define<'a>(
        &mut self,
        macro_line: usize,
        lines: &mut impl Iterator<Item = (usize, &'a str)>,
    ) -> Result<()> {
        let missing = DefinitionError::MissingHeader { line: macro_line };
        let (header_line, header) = match lines.next() {
            Some((_, line)) if is_keyword(line) => return Err(missing.into()),
            Some(found) => found,
            None => return Err(missing.into()),
        };

        let mut definition = parse_header(header_line, header)?;
        definition.body_start = self.table.mdt().next_index();

        let mut terminated = false;
        for (_, line) in &mut *lines {
            if line.eq_ignore_ascii_case(MEND) {
                terminated = true;
                break;
            }
            let template = replace_formals(line, &definition.formals);
            self.table.mdt_mut().push(TemplateLine::Text(template));
        }

        if !terminated {
            return Err(DefinitionError::UnterminatedBody {
                line: macro_line,
                name: definition.name,
            }
            .into());
        }
        self.table.mdt_mut().push(TemplateLine::End);

        debug!(
            name = %definition.name,
            params = definition.param_count(),
            body_start = definition.body_start,
            "registered macro"
        );

        let name = definition.name.clone();
        if self.table.register(definition) {
            warn!(name = %name, line = header_line, "macro redefined, later definition wins");
        }
        Ok(())
    }
}

/// Build the macro table and intermediate program from raw source text.
pub fn build_tables(source: &str) -> Result<(MacroTable, IntermediateProgram)> {
    MacroTableBuilder::new().build(source.lines())
}

fn parse_header(line: usize, text: &str) -> Result<MacroDefinition, DefinitionError> {
    let header = LineParser::parse_header(text).map_err(|_| DefinitionError::MalformedHeader {
        line,
        header: text.to_string(),
    })?;

    let name = header.name.to_ascii_uppercase();
    let mut formals: Vec<String> = Vec::with_capacity(header.parameters.len());
    let mut defaults = HashMap::new();

    for parameter in header.parameters {
        if !is_formal(parameter.formal) {
            return Err(DefinitionError::InvalidFormal {
                line,
                formal: parameter.formal.to_string(),
            });
        }

        let formal = parameter.formal.to_ascii_uppercase();
        if formals.contains(&formal) {
            return Err(DefinitionError::DuplicateFormal { line, name, formal });
        }

        if let Some(default) = parameter.default.filter(|d| !d.is_empty()) {
            defaults.insert(formal.clone(), default.to_string());
        }
        formals.push(formal);
    }

    Ok(MacroDefinition {
        index: 0,
        name,
        formals,
        defaults,
        body_start: 0,
    })
}

fn is_keyword(line: &str) -> bool {
    line.eq_ignore_ascii_case(MACRO) || line.eq_ignore_ascii_case(MEND)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_formal(text: &str) -> bool {
    text.strip_prefix(SIGIL)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(is_ident_char))
}

/// Replace each whole-token occurrence of a formal with `#k`.
///
/// A candidate is the sigil plus its run of identifier characters, and it only
/// counts when the character before the sigil is not an identifier character.
/// `&REG` therefore never matches inside `&REGX` or `X&REG`.
pub(crate) fn replace_formals(line: &str, formals: &[String]) -> String {
    if formals.is_empty() {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    let mut prev: Option<char> = None;

    while let Some(at) = rest.find(SIGIL) {
        let (before, from_sigil) = rest.split_at(at);
        out.push_str(before);
        if let Some(c) = before.chars().next_back() {
            prev = Some(c);
        }

        let after_sigil = &from_sigil[SIGIL.len_utf8()..];
        let ident_len = after_sigil
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(after_sigil.len());
        let token_len = SIGIL.len_utf8() + ident_len;
        let token = &from_sigil[..token_len];

        let position = (ident_len > 0 && !prev.is_some_and(is_ident_char))
            .then(|| formals.iter().position(|f| f.eq_ignore_ascii_case(token)))
            .flatten();

        match position {
            Some(k) => {
                out.push('#');
                out.push_str(&(k + 1).to_string());
            }
            None => out.push_str(token),
        }

        prev = token.chars().next_back();
        rest = &from_sigil[token_len..];
    }

    out.push_str(rest);
    out
}
