//! Error types for roadgrid

use thiserror::Error;

use crate::grid::Point;
use crate::session::MarkerRole;

/// Rejected operations and failed inputs.
///
/// Running out of frontier during a search is not an error, see
/// [`PathFinderState::NoPathFound`](crate::find::PathFinderState::NoPathFound).
#[derive(Error, Debug)]
pub enum Error {
    #[error("no grid has been built yet")]
    NoGrid,

    #[error("marker {point} is outside the {rows}x{columns} grid")]
    MarkerOutOfBounds {
        point: Point,
        rows: usize,
        columns: usize,
    },

    #[error("the {0} marker is not set")]
    MissingMarker(MarkerRole),

    #[error("there is no path to animate")]
    NoPath,

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("invalid point '{0}', expected 'row,col'")]
    InvalidPoint(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("settings file error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
