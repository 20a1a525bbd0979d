use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read};

use tracing::{debug, trace};

use crate::ast::{IntermediateProgram, MacroTable};
use crate::config::ExpandOptions;
use crate::error::{MacroError, Result};
use crate::normalize::{normalize_line, split_first_token};
use crate::resolver::resolve_arguments;
use crate::tables::render_lines;

/// Pass 2: rewrites macro invocations into their bodies.
///
/// Lines produced by an expansion go back to the front of the work queue, so an
/// invocation inside a body is expanded before anything that follows it. The
/// output order is depth-first, left to right.
pub struct Expander<'t> {
    table: &'t MacroTable,
    options: ExpandOptions,
}

impl<'t> Expander<'t> {
    pub fn new(table: &'t MacroTable) -> Self {
        Self::with_options(table, ExpandOptions::default())
    }

    pub fn with_options(table: &'t MacroTable, options: ExpandOptions) -> Self {
        Self { table, options }
    }

    /// Expand a whole intermediate program (main entry point)
    pub fn expand(&self, program: &IntermediateProgram) -> Result<Vec<String>> {
        self.expand_lines(program.lines().iter().map(String::as_str))
    }

    /// Expand raw lines. They are normalized first; blanks are dropped.
    pub fn expand_lines<'a, I>(&self, lines: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut work: VecDeque<(String, usize)> = lines
            .into_iter()
            .filter_map(normalize_line)
            .map(|line| (line.to_string(), 0))
            .collect();
        let mut output = Vec::with_capacity(work.len());

        while let Some((line, depth)) = work.pop_front() {
            match self.expand_invocation(&line, depth)? {
                Some(body) => {
                    for expanded in body.into_iter().rev() {
                        work.push_front((expanded, depth + 1));
                    }
                }
                None => output.push(line),
            }
        }

        Ok(output)
    }

    /// Expand one line by a single level.
    ///
    /// Returns `None` when the first token names no macro; the line is then
    /// ordinary program text.
    pub fn expand_invocation(&self, line: &str, depth: usize) -> Result<Option<Vec<String>>> {
        let (name, args) = split_first_token(line);
        let Some(definition) = self.table.get(name) else {
            trace!(line, "not an invocation");
            return Ok(None);
        };

        if let Some(limit) = self.options.max_depth {
            if depth > limit {
                return Err(MacroError::ExpansionDepth {
                    name: definition.name.clone(),
                    limit,
                });
            }
        }

        let actuals = resolve_arguments(definition, args);
        debug!(name = %definition.name, depth, ?actuals, "expanding invocation");

        Ok(Some(
            self.table
                .body_of(definition)
                .map(|template| substitute_placeholders(template, &actuals))
                .collect(),
        ))
    }
}

/// Replace every `#k` with the k-th actual (1-based).
///
/// The template is scanned once, so placeholder-like text inside an actual is
/// never substituted again. `#` not followed by an index in range is kept.
pub fn substitute_placeholders(template: &str, actuals: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(at) = rest.find('#') {
        out.push_str(&rest[..at]);

        let after = &rest[at + 1..];
        let digits = after
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after.len());
        let value = after[..digits]
            .parse::<usize>()
            .ok()
            .and_then(|k| k.checked_sub(1))
            .and_then(|i| actuals.get(i));

        match value {
            Some(value) => out.push_str(value),
            None => {
                out.push('#');
                out.push_str(&after[..digits]);
            }
        }
        rest = &after[digits..];
    }

    out.push_str(rest);
    out
}

/// A reader that expands an intermediate program one line at a time.
///
/// Each intermediate line expands independently of the others, so only the
/// expansion of the current line is buffered.
pub struct ExpandingReader<'t, R: Read> {
    inner: BufReader<R>,
    expander: Expander<'t>,
    buffer: Vec<u8>,
    buffer_pos: usize,
    done: bool,
}

impl<'t, R: Read> ExpandingReader<'t, R> {
    pub fn new(inner: R, table: &'t MacroTable) -> Self {
        Self::with_options(inner, table, ExpandOptions::default())
    }

    pub fn with_options(inner: R, table: &'t MacroTable, options: ExpandOptions) -> Self {
        Self {
            inner: BufReader::new(inner),
            expander: Expander::with_options(table, options),
            buffer: Vec::new(),
            buffer_pos: 0,
            done: false,
        }
    }

    fn fill_buffer(&mut self) -> io::Result<()> {
        self.buffer.clear();
        self.buffer_pos = 0;

        // Blank lines and empty bodies produce nothing; keep reading.
        while self.buffer.is_empty() {
            let mut line = String::new();
            if self.inner.read_line(&mut line)? == 0 {
                self.done = true;
                return Ok(());
            }

            let expanded = self
                .expander
                .expand_lines([line.as_str()])
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            self.buffer = render_lines(&expanded).into_bytes();
        }
        Ok(())
    }
}

impl<R: Read> Read for ExpandingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.buffer_pos >= self.buffer.len() && !self.done {
            self.fill_buffer()?;
        }

        if self.buffer_pos >= self.buffer.len() {
            return Ok(0);
        }

        let available = self.buffer.len() - self.buffer_pos;
        let to_copy = available.min(buf.len());
        buf[..to_copy].copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + to_copy]);
        self.buffer_pos += to_copy;

        Ok(to_copy)
    }
}
