use super::node::NodeId;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Newick syntax error
    ParseError {
        message: String,
        /// 1-based
        line: usize,
        /// 1-based
        column: usize,
        snippet: String,
    },
    /// The node is absent or soft-deleted
    NodeNotFound(NodeId),
    /// The tree has no root
    EmptyTree,
    /// Invalid operation on an existing tree
    LogicError(String),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::ParseError {
                message,
                line,
                column,
                snippet,
            } => {
                write!(
                    f,
                    "Newick parse error at line {}, column {}: {} near \"{}\"",
                    line,
                    column,
                    message.trim_end(),
                    snippet
                )
            }
            TreeError::NodeNotFound(id) => write!(f, "node {} not found", id),
            TreeError::EmptyTree => write!(f, "tree has no root"),
            TreeError::LogicError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TreeError {}
