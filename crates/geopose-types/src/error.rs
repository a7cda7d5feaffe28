//! Engine-wide error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced by the pose engine.
///
/// Queries signal "not answerable now" with an absent `Option` instead;
/// `UnknownTransform` only crosses an API boundary where a transform is
/// contractually required.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoseError {
    /// A precondition on the arguments does not hold (missing parent, name
    /// reuse under a different parent, removing a non-leaf frame).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required transform chain crosses an ungeolocated subgraph root.
    #[error("transform chain crosses an ungeolocated subgraph root")]
    UnknownTransform,
}
