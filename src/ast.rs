use std::collections::HashMap;

/// Marks a formal parameter in headers and bodies.
pub const SIGIL: char = '&';

/// Text of the end-of-body sentinel, in source and in the persisted MDT.
pub const MEND: &str = "MEND";

/// One declared macro (an MNT entry)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    /// 1-based ordinal in the macro table
    pub index: usize,
    /// Upper-cased name used for lookup
    pub name: String,
    /// Upper-cased formals, sigil included, in declaration order
    pub formals: Vec<String>,
    /// Formal -> default value, only for formals that declare one
    pub defaults: HashMap<String, String>,
    /// 1-based index of the first template line in the definition table
    pub body_start: usize,
}

impl MacroDefinition {
    pub fn param_count(&self) -> usize {
        self.formals.len()
    }

    pub fn default_count(&self) -> usize {
        self.defaults.len()
    }

    /// 0-based slot of a formal. The sigil is optional and case is ignored.
    pub fn position_of(&self, formal: &str) -> Option<usize> {
        let formal = formal.trim();
        let bare = formal.strip_prefix(SIGIL).unwrap_or(formal);
        self.formals
            .iter()
            .position(|f| f[SIGIL.len_utf8()..].eq_ignore_ascii_case(bare))
    }

    pub fn default_for(&self, formal: &str) -> Option<&str> {
        self.defaults.get(formal).map(String::as_str)
    }

    /// Defaults in formal order, as `(formal, value)` pairs
    pub fn ordered_defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.formals
            .iter()
            .filter_map(|f| self.default_for(f).map(|d| (f.as_str(), d)))
    }
}

/// A single MDT entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateLine {
    /// Body text with formals replaced by `#k` placeholders
    Text(String),
    /// End of a macro body
    End,
}

impl TemplateLine {
    pub fn as_str(&self) -> &str {
        match self {
            TemplateLine::Text(text) => text,
            TemplateLine::End => MEND,
        }
    }
}

/// Template lines of every macro, addressed from 1. Index 0 is never valid.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DefinitionTable(Vec<TemplateLine>);

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line and return its 1-based index
    pub fn push(&mut self, line: TemplateLine) -> usize {
        self.0.push(line);
        self.0.len()
    }

    /// Index the next pushed line will receive
    pub fn next_index(&self) -> usize {
        self.0.len() + 1
    }

    pub fn get(&self, index: usize) -> Option<&TemplateLine> {
        index.checked_sub(1).and_then(|i| self.0.get(i))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(index, line)` pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &TemplateLine)> {
        self.0.iter().enumerate().map(|(i, line)| (i + 1, line))
    }

    /// Template text of a body starting at `start`, up to (excluding) the sentinel.
    pub fn body(&self, start: usize) -> impl Iterator<Item = &str> {
        let lines = start
            .checked_sub(1)
            .and_then(|i| self.0.get(i..))
            .unwrap_or_default();

        lines.iter().map_while(|line| match line {
            TemplateLine::Text(text) => Some(text.as_str()),
            TemplateLine::End => None,
        })
    }
}

/// MNT + MDT, built once by Pass 1 and read-only afterwards
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MacroTable {
    definitions: Vec<MacroDefinition>,
    by_name: HashMap<String, usize>,
    mdt: DefinitionTable,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under its name. A later definition with the same name
    /// shadows the earlier one for lookups; both stay in the MNT. Returns true when
    /// a previous definition was shadowed.
    pub fn register(&mut self, mut definition: MacroDefinition) -> bool {
        definition.index = self.definitions.len() + 1;
        let slot = self.definitions.len();
        let previous = self.by_name.insert(definition.name.clone(), slot);
        self.definitions.push(definition);
        previous.is_some()
    }

    /// Look up a macro by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.by_name
            .get(&name.to_ascii_uppercase())
            .map(|&slot| &self.definitions[slot])
    }

    /// Every registered definition in MNT order, shadowed ones included
    pub fn definitions(&self) -> &[MacroDefinition] {
        &self.definitions
    }

    pub fn mdt(&self) -> &DefinitionTable {
        &self.mdt
    }

    pub fn mdt_mut(&mut self) -> &mut DefinitionTable {
        &mut self.mdt
    }

    /// Template lines of a macro's body
    pub fn body_of<'a>(
        &'a self,
        definition: &MacroDefinition,
    ) -> impl Iterator<Item = &'a str> + use<'a> {
        self.mdt.body(definition.body_start)
    }
}

/// The source with every macro definition removed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IntermediateProgram(pub Vec<String>);

impl IntermediateProgram {
    pub fn lines(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for IntermediateProgram {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incr() -> MacroDefinition {
        MacroDefinition {
            index: 0,
            name: "INCR".to_string(),
            formals: vec!["&REG".to_string(), "&VAL".to_string()],
            defaults: HashMap::from([("&VAL".to_string(), "1".to_string())]),
            body_start: 1,
        }
    }

    #[test]
    fn test_position_of_ignores_sigil_and_case() {
        let def = incr();
        assert_eq!(def.position_of("&REG"), Some(0));
        assert_eq!(def.position_of("val"), Some(1));
        assert_eq!(def.position_of("&val"), Some(1));
        assert_eq!(def.position_of("&RE"), None);
    }

    #[test]
    fn test_ordered_defaults() {
        let def = incr();
        let defaults: Vec<_> = def.ordered_defaults().collect();
        assert_eq!(defaults, vec![("&VAL", "1")]);
        assert_eq!(def.default_count(), 1);
        assert_eq!(def.param_count(), 2);
    }

    #[test]
    fn test_definition_table_is_one_based() {
        let mut mdt = DefinitionTable::new();
        assert_eq!(mdt.next_index(), 1);
        assert_eq!(mdt.push(TemplateLine::Text("ADD #1,#2".into())), 1);
        assert_eq!(mdt.push(TemplateLine::End), 2);

        assert_eq!(mdt.get(0), None);
        assert_eq!(mdt.get(2), Some(&TemplateLine::End));
        assert_eq!(mdt.body(1).collect::<Vec<_>>(), vec!["ADD #1,#2"]);
        assert_eq!(mdt.body(0).count(), 0);
        assert_eq!(mdt.body(9).count(), 0);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut table = MacroTable::new();
        assert!(!table.register(incr()));

        let mut again = incr();
        again.body_start = 3;
        assert!(table.register(again));

        assert_eq!(table.definitions().len(), 2);
        assert!(table.get("DECR").is_none());
        let current = table.get("Incr").unwrap();
        assert_eq!((current.index, current.body_start), (2, 3));
    }
}
