//! Route planning over map-like images.
//!
//! An image is cut into square cells, every cell is classified as walkable or not
//! ([`grid`], [`sample`]), a shortest route between two cells is searched with A* ([`find`])
//! and the route is played back as a moving point ([`animate`]). [`session::Session`] ties
//! these together for an interactive front end.

pub mod animate;
pub mod config;
pub mod error;
pub mod find;
pub mod grid;
pub mod sample;
pub mod session;
pub mod util;

use image::RgbImage;

pub use animate::{Animator, AnimatorState, Frame, RunId};
pub use config::{AnimationSettings, Settings};
pub use error::{Error, Result};
pub use find::{PathFinder, PathFinderState, PathResult, SearchReport};
pub use grid::{Cell, GridMap, Point};
pub use session::{MarkerRole, Markers, Session};

/// Build the walkability grid of `img`, see [`GridMap::build`].
pub fn build_grid(img: &RgbImage, cell_size: u32, brightness_threshold: u8) -> GridMap {
    GridMap::build(img, cell_size, brightness_threshold)
}

/// Search the cheapest route from `start` to `goal` on `grid`.
///
/// The returned report is either a found path or "no path", together with the order in which
/// cells were expanded.
pub fn find_path(
    grid: &GridMap,
    start: Point,
    goal: Point,
    allow_diagonal: bool,
) -> SearchReport<Point> {
    PathFinder::new(grid, start, goal, allow_diagonal).finish(grid)
}
