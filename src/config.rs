use std::path::{Path, PathBuf};

/// Default bound on nested expansions
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Options for Pass 2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Deepest nesting at which an invocation may still be expanded.
    /// `None` removes the guard, so a self-invoking macro never terminates.
    pub max_depth: Option<usize>,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl ExpandOptions {
    pub fn unbounded() -> Self {
        Self { max_depth: None }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
        }
    }
}

/// File names of the artifacts exchanged between the passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub mnt: PathBuf,
    pub mdt: PathBuf,
    pub ala: PathBuf,
    pub intermediate: PathBuf,
    pub expanded: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

impl ArtifactPaths {
    /// Default file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            mnt: dir.join("MNT.txt"),
            mdt: dir.join("MDT.txt"),
            ala: dir.join("ALA.txt"),
            intermediate: dir.join("intermediate.txt"),
            expanded: dir.join("expanded.txt"),
        }
    }
}
