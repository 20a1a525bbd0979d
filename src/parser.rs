use pest::{
    Parser, Position,
    error::{Error, ErrorVariant},
    iterators::Pair,
};
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "src/macro.pest"]
pub struct LineParser;

pub type ParseResult<T> = Result<T, Box<Error<Rule>>>;

/// A parsed `NAME &A,&B=x` header, before any validation of the formals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header<'a> {
    pub name: &'a str,
    pub parameters: Vec<Parameter<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter<'a> {
    pub formal: &'a str,
    /// Text after `=`, trimmed. `Some("")` for `&A=`.
    pub default: Option<&'a str>,
}

/// First row of an MNT block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MntRow<'a> {
    pub index: usize,
    pub name: &'a str,
    pub body_start: usize,
    pub param_count: usize,
    pub default_count: usize,
}

impl LineParser {
    pub fn parse_header(line: &str) -> ParseResult<Header<'_>> {
        let header = Self::parse_line(Rule::header, line)?;
        let mut inner = header.into_inner();

        let name = inner.next().map(|p| p.as_str()).unwrap_or_default();
        let parameters = inner
            .find(|p| p.as_rule() == Rule::parameter_list)
            .map(|list| list.into_inner().map(Self::parse_parameter).collect())
            .unwrap_or_default();

        Ok(Header { name, parameters })
    }

    fn parse_parameter(pair: Pair<'_, Rule>) -> Parameter<'_> {
        let mut inner = pair.into_inner();
        let formal = inner.next().map(|p| p.as_str()).unwrap_or_default();
        let default = inner.next().map(|p| p.as_str().trim());
        Parameter { formal, default }
    }

    pub fn parse_mnt_row(line: &str) -> ParseResult<MntRow<'_>> {
        let row = Self::parse_line(Rule::mnt_row, line)?;
        let mut fields = row.into_inner();

        let index = Self::parse_number(fields.next())?;
        let name = fields.next().map(|p| p.as_str()).unwrap_or_default();
        let body_start = Self::parse_number(fields.next())?;
        let param_count = Self::parse_number(fields.next())?;
        let default_count = Self::parse_number(fields.next())?;

        Ok(MntRow {
            index,
            name,
            body_start,
            param_count,
            default_count,
        })
    }

    pub fn parse_params_row(line: &str) -> ParseResult<Vec<&str>> {
        let row = Self::parse_line(Rule::params_row, line)?;
        Ok(row
            .into_inner()
            .filter(|p| p.as_rule() == Rule::formal)
            .map(|p| p.as_str())
            .collect())
    }

    pub fn parse_defaults_row(line: &str) -> ParseResult<Vec<(&str, &str)>> {
        let row = Self::parse_line(Rule::defaults_row, line)?;
        Ok(row
            .into_inner()
            .filter(|p| p.as_rule() == Rule::default_entry)
            .filter_map(|entry| {
                let mut inner = entry.into_inner();
                let formal = inner.next()?.as_str();
                let value = inner.next().map_or("", |p| p.as_str().trim());
                Some((formal, value))
            })
            .collect())
    }

    /// `(index, text)`; text is `None` when the row carries only an index.
    pub fn parse_mdt_row(line: &str) -> ParseResult<(usize, Option<&str>)> {
        let row = Self::parse_line(Rule::mdt_row, line)?;
        let mut fields = row.into_inner();

        let index = Self::parse_number(fields.next())?;
        let text = fields
            .find(|p| p.as_rule() == Rule::template_text)
            .map(|p| p.as_str().trim_end());
        Ok((index, text))
    }

    fn parse_line(rule: Rule, line: &str) -> ParseResult<Pair<'_, Rule>> {
        let mut pairs = LineParser::parse(rule, line).map_err(Box::new)?;
        pairs
            .next()
            .ok_or_else(|| Self::custom_error(line, format!("expected {rule:?}")))
    }

    fn parse_number(pair: Option<Pair<'_, Rule>>) -> ParseResult<usize> {
        let Some(pair) = pair else {
            return Err(Self::custom_error("", "expected a number".to_string()));
        };

        pair.as_str().parse().map_err(|e| {
            Box::new(Error::new_from_span(
                ErrorVariant::CustomError {
                    message: format!("invalid number: {e}"),
                },
                pair.as_span(),
            ))
        })
    }

    fn custom_error(line: &str, message: String) -> Box<Error<Rule>> {
        Box::new(Error::new_from_pos(
            ErrorVariant::CustomError { message },
            Position::from_start(line),
        ))
    }
}
