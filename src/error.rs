use thiserror::Error;

use crate::selection::SelectionRect;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("Invalid region {0:?} for a {1}x{2} slice")]
    InvalidRegion(SelectionRect, usize, usize),

    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Unknown {what} `{key}`")]
    UnknownKey { what: &'static str, key: String },

    #[error("No study loaded")]
    EmptyStudy,

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Background task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
