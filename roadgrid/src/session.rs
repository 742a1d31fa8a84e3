//! The state of one interactive route-planning session.
//!
//! A [`Session`] owns the grid, the markers, the last search result and the animation. Its
//! mutating operations keep them consistent with each other:
//!
//! - rebuilding the grid stops the animation and clears the path and both markers, since the
//!   markers are expressed in the coordinates of the old grid
//! - placing or clearing a marker, or changing the move set, stops the animation and clears the path

use std::fmt::Display;

use image::RgbImage;
use log::{debug, info};
use nalgebra::Point2;

use crate::animate::{Animator, Frame, RunId};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::find::SearchReport;
use crate::grid::{GridMap, Point};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MarkerRole {
    Start,
    End,
}

impl Display for MarkerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MarkerRole::Start => "start",
                MarkerRole::End => "end",
            }
        )
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Markers {
    pub start: Option<Point>,
    pub end: Option<Point>,
}

impl Markers {
    pub fn get(&self, role: MarkerRole) -> Option<Point> {
        match role {
            MarkerRole::Start => self.start,
            MarkerRole::End => self.end,
        }
    }

    fn slot(&mut self, role: MarkerRole) -> &mut Option<Point> {
        match role {
            MarkerRole::Start => &mut self.start,
            MarkerRole::End => &mut self.end,
        }
    }
}

pub struct Session {
    settings: Settings,
    grid: Option<GridMap>,
    markers: Markers,
    route: Option<SearchReport<Point>>,
    animator: Animator,
}

impl Session {
    /// Start an empty session. Settings that [`Settings::validate`] rejects are an error.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            animator: Animator::new(settings.animation.clone())?,
            settings,
            grid: None,
            markers: Markers::default(),
            route: None,
        })
    }

    /// Drop the animation and the path, in that order
    fn invalidate_route(&mut self) {
        self.animator.stop();
        if self.route.take().is_some() {
            debug!("path invalidated");
        }
    }

    /// Rebuild the walkability grid from `img` with the current settings.
    ///
    /// The previous grid, path, markers and animation are all discarded.
    pub fn rebuild_grid(&mut self, img: &RgbImage) -> &GridMap {
        self.invalidate_route();
        self.markers = Markers::default();

        let grid = GridMap::build(
            img,
            self.settings.cell_size,
            self.settings.brightness_threshold,
        );
        info!(
            "grid rebuilt: {}x{} cells, {} walkable",
            grid.rows,
            grid.columns,
            grid.walkable_count()
        );

        self.grid.insert(grid)
    }

    /// Place a marker, replacing the previous one of the same role.
    ///
    /// The cell does not have to be walkable, a search from or to a blocked cell simply finds
    /// no path.
    pub fn set_marker(&mut self, role: MarkerRole, point: Point) -> Result<()> {
        let grid = self.grid.as_ref().ok_or(Error::NoGrid)?;
        if !grid.is_valid(point) {
            return Err(Error::MarkerOutOfBounds {
                point,
                rows: grid.rows,
                columns: grid.columns,
            });
        }

        self.invalidate_route();
        *self.markers.slot(role) = Some(point);
        debug!("{} marker set to {}", role, point);
        Ok(())
    }

    pub fn clear_markers(&mut self) {
        self.invalidate_route();
        self.markers = Markers::default();
    }

    pub fn set_allow_diagonal(&mut self, allow_diagonal: bool) {
        if self.settings.allow_diagonal != allow_diagonal {
            self.invalidate_route();
            self.settings.allow_diagonal = allow_diagonal;
        }
    }

    /// Change the cell size used by the next [`Session::rebuild_grid`]
    pub fn set_cell_size(&mut self, cell_size: u32) -> Result<()> {
        if cell_size == 0 {
            return Err(Error::Settings("cell_size must be at least 1".to_string()));
        }
        self.settings.cell_size = cell_size;
        Ok(())
    }

    /// Change the brightness threshold used by the next [`Session::rebuild_grid`]
    pub fn set_brightness_threshold(&mut self, threshold: u8) {
        self.settings.brightness_threshold = threshold;
    }

    /// Search a route between the start and end markers and keep the outcome.
    pub fn find_path(&mut self) -> Result<&SearchReport<Point>> {
        let grid = self.grid.as_ref().ok_or(Error::NoGrid)?;
        let start = self
            .markers
            .start
            .ok_or(Error::MissingMarker(MarkerRole::Start))?;
        let end = self
            .markers
            .end
            .ok_or(Error::MissingMarker(MarkerRole::End))?;

        let report = crate::find_path(grid, start, end, self.settings.allow_diagonal);
        match report.result() {
            Some(result) => info!(
                "path from {} to {}: {} cells, cost {:.2}, {} expanded",
                start,
                end,
                result.path.len(),
                result.total_cost,
                report.visited.len()
            ),
            None => info!(
                "no path from {} to {}, {} expanded",
                start,
                end,
                report.visited.len()
            ),
        }

        self.animator.stop();
        Ok(&*self.route.insert(report))
    }

    /// Start playing the current path. Any previous run is cancelled.
    pub fn start_animation(&mut self) -> Result<RunId> {
        let grid = self.grid.as_ref().ok_or(Error::NoGrid)?;
        let path = self
            .route
            .as_ref()
            .map(|route| route.path())
            .filter(|path| !path.is_empty())
            .ok_or(Error::NoPath)?;

        self.animator.start(path, |p| grid.cell_center(p))
    }

    /// Advance the animation run `run` by one frame
    pub fn tick(&mut self, run: RunId) -> Option<Frame> {
        self.animator.tick(run)
    }

    pub fn stop_animation(&mut self) {
        self.animator.stop();
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn grid(&self) -> Option<&GridMap> {
        self.grid.as_ref()
    }

    pub fn markers(&self) -> Markers {
        self.markers
    }

    /// Result of the last search, cleared whenever its inputs change
    pub fn route(&self) -> Option<&SearchReport<Point>> {
        self.route.as_ref()
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    /// Position of the moving marker, if an animation has shown one
    pub fn animation_position(&self) -> Option<Point2<f32>> {
        self.animator.position()
    }
}
