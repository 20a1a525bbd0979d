//! End-to-end tests for both passes


use macropass::{
    ArtifactPaths, DefinitionError, ExpandOptions, Expander, ExpandingReader, MacroError,
    build_tables, process, tables,
};

const INCR: &str = "\
MACRO
INCR &REG,&VAL=1
  ADD &REG,&VAL
MEND
";

fn expand(source: &str) -> Vec<String> {
    process(source, &ExpandOptions::default()).unwrap()
}

// ============================================================================
// Argument binding
// ============================================================================

mod binding {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_incr_scenario() {
        let source = format!("{INCR}INCR AREG\nINCR AREG,5\nINCR &VAL=10,&REG=CREG\n");
        assert_eq!(
            expand(&source),
            vec!["ADD AREG,1", "ADD AREG,5", "ADD CREG,10"]
        );
    }

    #[test]
    fn test_all_positional_reproduces_template() {
        let source = "\
MACRO
COMPUTE &X,&Y,&Z
  MOVER &X, &Y
  ADD &X, &Z
  MOVEM &X, RESULT
MEND
COMPUTE AREG, ONE, TWO
";
        assert_eq!(
            expand(source),
            vec!["MOVER AREG, ONE", "ADD AREG, TWO", "MOVEM AREG, RESULT"]
        );
    }

    #[test]
    fn test_default_fallback_for_every_formal() {
        let source = "\
MACRO
SETUP &A=AREG,&B,&C=9
  LOAD &A,&B,&C
MEND
SETUP
";
        assert_eq!(expand(source), vec!["LOAD AREG,,9"]);
    }

    #[test]
    fn test_keyword_beats_positional() {
        let source = format!("{INCR}INCR AREG,5,&VAL=7\n");
        assert_eq!(expand(&source), vec!["ADD AREG,7"]);
    }

    #[test]
    fn test_keyword_order_does_not_matter() {
        let source = "\
MACRO
PAIR &A,&B
  P &A &B
MEND
";
        let one = expand(&format!("{source}PAIR &B=2,&A=1\n"));
        let two = expand(&format!("{source}PAIR &A=1,&B=2\n"));
        assert_eq!(one, two);
        assert_eq!(one, vec!["P 1 2"]);
    }
}

// ============================================================================
// Program structure
// ============================================================================

mod program {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_expansion_inline() {
        let source = "\
MACRO
INNER &R
  SUB &R,ONE
MEND
MACRO
OUTER &R,&V
  MOVER &R,&V
  INNER &R
  MOVEM &R,&V
MEND
START 200
OUTER BREG,X
STOP
";
        let output = expand(source);
        assert_eq!(
            output,
            vec![
                "START 200",
                "MOVER BREG,X",
                "SUB BREG,ONE",
                "MOVEM BREG,X",
                "STOP"
            ]
        );
        let leftover = |l: &String| l.starts_with("INNER") || l.starts_with("OUTER");
        assert!(!output.iter().any(leftover));
    }

    #[test]
    fn test_non_macro_lines_only_normalized() {
        let source = format!(
            "{INCR}   START 100   ; origin\n\n// whole-line comment\n\
             READ N\nDECR N ; unknown macro\nEND\n"
        );
        assert_eq!(
            expand(&source),
            vec!["START 100", "READ N", "DECR N", "END"]
        );
    }

    #[test]
    fn test_definitions_removed_from_intermediate() {
        let source = format!("START\n{INCR}INCR X\nEND\n");
        let (_, program) = build_tables(&source).unwrap();
        assert_eq!(program.lines(), ["START", "INCR X", "END"]);
    }

    #[test]
    fn test_redefinition_uses_last_body() {
        let source = "\
MACRO
GREET
  FIRST
MEND
MACRO
GREET
  SECOND
MEND
GREET
";
        assert_eq!(expand(source), vec!["SECOND"]);
    }

    #[test]
    fn test_runaway_self_invocation_is_reported() {
        let source = "MACRO\nAGAIN &X\n  AGAIN &X\nMEND\nAGAIN 1\n";
        let err = process(source, &ExpandOptions::with_max_depth(10)).unwrap_err();
        assert!(matches!(err, MacroError::ExpansionDepth { limit: 10, .. }));
    }

    #[test]
    fn test_definition_errors_abort_everything() {
        let source = format!("{INCR}MACRO\nBROKEN &A,B\nX\nMEND\nINCR AREG\n");
        let err = process(&source, &ExpandOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            MacroError::Definition(DefinitionError::InvalidFormal { line: 6, .. })
        ));
    }
}

// ============================================================================
// Artifacts on disk
// ============================================================================

mod artifacts {
    use std::io::Read;

    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "\
START 100
MACRO
INCR &REG,&VAL=1
  ADD &REG,&VAL
MEND
MACRO
TWICE &R
  INCR &R
  INCR &R,2
MEND
TWICE AREG
INCR &VAL=3,&REG=BREG
END
";

    #[test]
    fn test_pass2_from_stored_tables_matches_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());

        let (table, program) = build_tables(SOURCE).unwrap();
        tables::save_pass1(&paths, &table, &program).unwrap();
        let in_memory = Expander::new(&table).expand(&program).unwrap();

        let stored = tables::load_tables(&paths).unwrap();
        let intermediate = tables::open_artifact(&paths.intermediate).unwrap();
        let mut text = String::new();
        ExpandingReader::new(intermediate, &stored)
            .read_to_string(&mut text)
            .unwrap();

        assert_eq!(
            in_memory,
            vec!["START 100", "ADD AREG,1", "ADD AREG,2", "ADD BREG,3", "END"]
        );
        assert_eq!(text.lines().collect::<Vec<_>>(), in_memory);
    }

    #[test]
    fn test_expanded_artifact_written() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());

        let expanded = expand(SOURCE);
        tables::save_expanded(&paths, &expanded).unwrap();

        let written = std::fs::read_to_string(&paths.expanded).unwrap();
        let expected = "START 100\nADD AREG,1\nADD AREG,2\nADD BREG,3\nEND\n";
        assert_eq!(written, expected);
    }

    #[test]
    fn test_expanded_artifact_keeps_trailing_empty_actual() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let source = "\
MACRO
P &A,&B
  X &A &B
MEND
P 1
";

        let in_memory = expand(source);
        tables::save_expanded(&paths, &in_memory).unwrap();
        let written = std::fs::read_to_string(&paths.expanded).unwrap();

        assert_eq!(in_memory, vec!["X 1 "]);
        assert_eq!(written.lines().collect::<Vec<_>>(), in_memory);
    }

    #[test]
    fn test_missing_intermediate_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let err = tables::load_intermediate(&paths).unwrap_err();
        assert!(matches!(err, MacroError::MissingInput { .. }));
    }

    #[test]
    fn test_mdt_text_uses_placeholders() {
        let (table, _) = build_tables(SOURCE).unwrap();
        let mdt = tables::render_mdt(&table);
        assert!(mdt.contains("ADD #1,#2"));
        assert!(mdt.contains("INCR #1,2"));
        assert!(!mdt.contains("&REG"));
    }
}
