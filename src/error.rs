use crate::model::{EdgeLabel, Id, RequestKind, VertexLabel, join_ids};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate id {0}")]
    DuplicateId(Id),

    #[error("no element with id {0}")]
    NotFound(Id),

    #[error("{referrer} references unknown vertex {vertex}")]
    UnknownVertex { referrer: Id, vertex: Id },

    #[error("edge {edge}: {label} does not permit {out_label} -> {in_label}")]
    LabelMismatch {
        edge: Id,
        label: EdgeLabel,
        out_label: VertexLabel,
        in_label: VertexLabel,
    },

    #[error("element {id}: {reason}")]
    SchemaViolation { id: Id, reason: String },

    #[error("edge {edge} is emitted before its endpoint {vertex}")]
    ForwardReference { edge: Id, vertex: Id },

    #[error("result chain cycle through {}", join_ids(.0))]
    CyclicResult(Vec<Id>),

    #[error("no {kind} result reachable from {start}")]
    NoResult { start: Id, kind: RequestKind },
}

impl GraphError {
    pub fn schema(id: &Id, reason: impl Into<String>) -> Self {
        GraphError::SchemaViolation {
            id: id.clone(),
            reason: reason.into(),
        }
    }

    /// Lookups that simply found nothing, as opposed to a defective graph.
    pub fn is_absent(&self) -> bool {
        matches!(self, GraphError::NotFound(_) | GraphError::NoResult { .. })
    }

    /// Ids named by the error, in the order they appear in the message.
    pub fn element_ids(&self) -> Vec<Id> {
        match self {
            GraphError::DuplicateId(id) | GraphError::NotFound(id) => vec![id.clone()],
            GraphError::UnknownVertex { referrer, vertex } => {
                vec![referrer.clone(), vertex.clone()]
            }
            GraphError::LabelMismatch { edge, .. } => vec![edge.clone()],
            GraphError::SchemaViolation { id, .. } => vec![id.clone()],
            GraphError::ForwardReference { edge, vertex } => vec![edge.clone(), vertex.clone()],
            GraphError::CyclicResult(ids) => ids.clone(),
            GraphError::NoResult { start, .. } => vec![start.clone()],
        }
    }
}
