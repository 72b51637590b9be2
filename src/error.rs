//! Error type shared by every ring-closure component.
//!
//! Rejections of candidate pairs are not errors: a pair that is incompatible
//! or not closable simply makes the caller try the next candidate. The
//! variants below are the conditions that abort the current search.

use thiserror::Error;

use crate::graph::VertexIx;

/// Errors raised while discovering or combining ring closures.
#[derive(Debug, Error)]
pub enum Error {
    /// The assembly graph cannot be turned into rings (inconsistent chord
    /// bond types, unsupported vertex kinds, broken spanning tree).
    #[error("structural error: {0}")]
    Structural(String),

    /// The path-local and the full-molecule atom paths disagree.
    ///
    /// Usually the candidate ring goes through a ring that is internal to a
    /// building block, which is not supported.
    #[error(
        "atom paths between vertices {head:?} and {tail:?} differ in length: {local} (path) != {full} (molecule)"
    )]
    GeometryInconsistency {
        head: VertexIx,
        tail: VertexIx,
        local: usize,
        full: usize,
    },

    /// The archive index file violates the append-only, id-sequential format.
    #[error("corrupted ring-closure archive: {0}")]
    ArchiveCorruption(String),

    /// Invalid or unreadable parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A pluggable collaborator (3D assembler, pattern matcher) failed.
    #[error("collaborator failure: {0}")]
    Collaborator(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn corruption(msg: impl Into<String>) -> Self {
        Self::ArchiveCorruption(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
