use std::path::PathBuf;

use thiserror::Error;

/// A malformed `MACRO ... MEND` block. Always fatal for Pass 1.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("line {line}: MACRO is not followed by a header")]
    MissingHeader { line: usize },

    #[error("line {line}: malformed macro header `{header}`")]
    MalformedHeader { line: usize, header: String },

    #[error("line {line}: formal parameter `{formal}` must be `&` followed by a name")]
    InvalidFormal { line: usize, formal: String },

    #[error("line {line}: formal parameter `{formal}` declared twice in macro {name}")]
    DuplicateFormal {
        line: usize,
        name: String,
        formal: String,
    },

    #[error("line {line}: macro {name} is not terminated by MEND")]
    UnterminatedBody { line: usize, name: String },
}

impl DefinitionError {
    /// 1-based source line the error refers to
    pub fn line(&self) -> usize {
        match self {
            DefinitionError::MissingHeader { line }
            | DefinitionError::MalformedHeader { line, .. }
            | DefinitionError::InvalidFormal { line, .. }
            | DefinitionError::DuplicateFormal { line, .. }
            | DefinitionError::UnterminatedBody { line, .. } => *line,
        }
    }
}

#[derive(Debug, Error)]
pub enum MacroError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("missing input file: {}", .path.display())]
    MissingInput { path: PathBuf },

    #[error("{artifact} line {line}: {message}")]
    TableFormat {
        artifact: &'static str,
        line: usize,
        message: String,
    },

    #[error("maximum expansion depth {limit} exceeded while expanding {name}")]
    ExpansionDepth { name: String, limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = MacroError> = std::result::Result<T, E>;
