use crate::libs::phylo::TreeError;
use thiserror::Error;

/// Whether an error stops the whole run or only the unit that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Abort the stage and the run
    Fatal,
    /// Log, skip the orthogroup or HOG row, carry on
    Recoverable,
}

#[derive(Error, Debug)]
pub enum OrthoError {
    #[error("failed to open {filename}")]
    CannotOpen {
        source: std::io::Error,
        filename: String,
    },

    #[error("failed to write {filename}")]
    CannotWrite {
        source: std::io::Error,
        filename: String,
    },

    #[error("{filename}:{line}: malformed line `{content}`")]
    MalformedLine {
        filename: String,
        line: usize,
        content: String,
    },

    #[error("score file for species pair {0} -> {1} not found in {2}")]
    MissingScores(usize, usize, String),

    #[error("{filename}: gene index {index} out of range for species {species} ({count} genes)")]
    GeneOutOfRange {
        filename: String,
        species: usize,
        index: usize,
        count: usize,
    },

    #[error("{filename}: invalid score {score}, scores are finite and not negative")]
    InvalidScore { filename: String, score: f64 },

    #[error("`{0}` is not a gene ID of the form species_sequence")]
    BadGeneId(String),

    #[error("sequence ID {0} not found in the sequence ID map")]
    IdNotFound(String),

    #[error("species IDs must be 0..N-1 in order, found {0}")]
    SpeciesNotDense(usize),

    #[error("{filename}: cannot parse species tree: {source}")]
    SpeciesTreeParse { source: TreeError, filename: String },

    #[error("species tree contains duplicate species: {}", .0.join(", "))]
    DuplicateSpecies(Vec<String>),

    #[error("species tree is missing species: {}", .0.join(", "))]
    MissingSpecies(Vec<String>),

    #[error("species tree contains species not in the analysis: {}", .0.join(", "))]
    ExtraSpecies(Vec<String>),

    #[error("species tree is not rooted: the root has {0} children")]
    NotRooted(usize),

    #[error("species tree: {0}")]
    SpeciesTree(TreeError),

    #[error("{og}: gene tree not found at {filename}")]
    MissingGeneTree { og: String, filename: String },

    #[error("{og}: {reason}")]
    GeneTree { og: String, reason: String },

    #[error("{hog}: parent clade {clade} not found in the gene tree of {og}")]
    MissingClade {
        hog: String,
        og: String,
        clade: String,
    },

    #[error("worker failed: {0}")]
    Worker(String),
}

impl OrthoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrthoError::MissingGeneTree { .. }
            | OrthoError::GeneTree { .. }
            | OrthoError::MissingClade { .. } => ErrorKind::Recoverable,
            _ => ErrorKind::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }

    pub fn gene_tree(og: impl Into<String>, reason: impl ToString) -> Self {
        OrthoError::GeneTree {
            og: og.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrthoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_explicit() {
        let missing = OrthoError::MissingGeneTree {
            og: "OG0000003".to_string(),
            filename: "Gene_Trees/OG0000003_tree.txt".to_string(),
        };
        assert_eq!(missing.kind(), ErrorKind::Recoverable);
        assert!(missing.to_string().starts_with("OG0000003"));

        let id = OrthoError::IdNotFound("3_17".to_string());
        assert!(id.is_fatal());

        let species = OrthoError::MissingSpecies(vec!["Mus".to_string(), "Rattus".to_string()]);
        assert_eq!(
            species.to_string(),
            "species tree is missing species: Mus, Rattus"
        );
    }
}
