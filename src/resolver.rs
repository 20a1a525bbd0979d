use crate::ast::MacroDefinition;

/// One comma-separated entry of an invocation's argument string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actual<'a> {
    Positional(&'a str),
    Keyword { formal: &'a str, value: &'a str },
}

impl<'a> Actual<'a> {
    fn classify(token: &'a str) -> Self {
        match token.split_once('=') {
            Some((formal, value)) => Actual::Keyword {
                formal: formal.trim(),
                value: value.trim(),
            },
            None => Actual::Positional(token),
        }
    }
}

/// Split an argument string on commas, dropping empty entries
pub fn split_actuals(args: &str) -> impl Iterator<Item = Actual<'_>> {
    args.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Actual::classify)
}

/// Bind the text after a macro name to the definition's formals.
///
/// Positionals fill slots left to right, keywords then override their slot,
/// defaults fill what is still unbound and anything left is the empty string.
/// Surplus positionals and unknown keywords are ignored.
pub fn resolve_arguments(definition: &MacroDefinition, args: &str) -> Vec<String> {
    let mut slots: Vec<Option<&str>> = vec![None; definition.param_count()];
    let mut keywords = Vec::new();

    let mut next = 0;
    for actual in split_actuals(args) {
        match actual {
            Actual::Positional(value) => {
                if let Some(slot) = slots.get_mut(next) {
                    *slot = Some(value);
                }
                next += 1;
            }
            Actual::Keyword { formal, value } => keywords.push((formal, value)),
        }
    }

    for (formal, value) in keywords {
        if let Some(k) = definition.position_of(formal) {
            slots[k] = Some(value);
        }
    }

    slots
        .into_iter()
        .zip(&definition.formals)
        .map(|(slot, formal)| {
            slot.or_else(|| definition.default_for(formal))
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn definition(formals: &[&str], defaults: &[(&str, &str)]) -> MacroDefinition {
        MacroDefinition {
            index: 1,
            name: "M".to_string(),
            formals: formals.iter().map(|f| f.to_string()).collect(),
            defaults: defaults
                .iter()
                .map(|(f, d)| (f.to_string(), d.to_string()))
                .collect::<HashMap<_, _>>(),
            body_start: 1,
        }
    }

    #[test]
    fn test_split_actuals() {
        let actuals: Vec<_> = split_actuals(" AREG , &VAL = 5,, B=").collect();
        assert_eq!(
            actuals,
            vec![
                Actual::Positional("AREG"),
                Actual::Keyword {
                    formal: "&VAL",
                    value: "5"
                },
                Actual::Keyword {
                    formal: "B",
                    value: ""
                },
            ]
        );
    }

    #[test]
    fn test_positional() {
        let def = definition(&["&REG", "&VAL"], &[("&VAL", "1")]);
        assert_eq!(resolve_arguments(&def, "AREG, 5"), vec!["AREG", "5"]);
        assert_eq!(resolve_arguments(&def, "AREG"), vec!["AREG", "1"]);
    }

    #[test]
    fn test_defaults_and_gaps() {
        let def = definition(&["&A", "&B", "&C"], &[("&B", "X")]);
        assert_eq!(resolve_arguments(&def, ""), vec!["", "X", ""]);
    }

    #[test]
    fn test_keyword_overrides_positional() {
        let def = definition(&["&A", "&B"], &[]);
        assert_eq!(resolve_arguments(&def, "1,2,&A=9"), vec!["9", "2"]);
        assert_eq!(resolve_arguments(&def, "&A=9,1"), vec!["9", ""]);
    }

    #[test]
    fn test_keyword_without_sigil_and_any_case() {
        let def = definition(&["&REG", "&VAL"], &[("&VAL", "1")]);
        let actuals = resolve_arguments(&def, "val=10, reg=CREG");
        assert_eq!(actuals, vec!["CREG", "10"]);
    }

    #[test]
    fn test_explicit_empty_keyword_beats_default() {
        let def = definition(&["&A"], &[("&A", "D")]);
        assert_eq!(resolve_arguments(&def, "&A="), vec![""]);
    }

    #[test]
    fn test_surplus_and_unknown_are_ignored() {
        let def = definition(&["&A"], &[]);
        assert_eq!(resolve_arguments(&def, "1,2,3,&Z=4"), vec!["1"]);
    }

    #[test]
    fn test_last_repeated_keyword_wins() {
        let def = definition(&["&A"], &[]);
        assert_eq!(resolve_arguments(&def, "&A=1,&A=2"), vec!["2"]);
    }

    #[test]
    fn test_no_formals() {
        let def = definition(&[], &[]);
        assert!(resolve_arguments(&def, "X,Y").is_empty());
    }
}
