//! Playback of a path as a moving point.
//!
//! The animator is a state machine advanced by [`Animator::tick`]. Whoever drives it (a UI
//! timer, a sleeping loop, a test) calls `tick` once per [`Animator::frame_interval`] with the
//! [`RunId`] handed out by [`Animator::start`]. Ticks for a run that was stopped or replaced
//! are ignored, so a late timer callback can never resume a cancelled run.

use std::time::Duration;

use log::{debug, trace};
use nalgebra::Point2;

use crate::config::AnimationSettings;
use crate::error::{Error, Result};

/// Identifies one animation run
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(u64);

/// One interpolated position of a run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frame {
    pub run: RunId,
    /// Position in image pixels
    pub position: Point2<f32>,
    /// Index of the path segment, segment `i` goes from waypoint `i` to `i + 1`
    pub segment: usize,
    /// Increment within the segment, `0..=steps`
    pub step: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnimatorState {
    Idle,
    /// The next tick emits this segment and step
    Running { segment: usize, step: usize },
}

pub struct Animator {
    settings: AnimationSettings,
    waypoints: Vec<Point2<f32>>,
    state: AnimatorState,
    active: Option<RunId>,
    next_run: u64,
    position: Option<Point2<f32>>,
}

impl Animator {
    /// Create an idle animator. Settings that [`AnimationSettings::validate`] rejects are an error.
    pub fn new(settings: AnimationSettings) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            settings,
            waypoints: Vec::new(),
            state: AnimatorState::Idle,
            active: None,
            next_run: 0,
            position: None,
        })
    }

    /// Begin playing `path`, converting every node to a pixel position with `to_pixel`.
    ///
    /// Any run in progress is stopped first. An empty path is rejected and leaves the
    /// animator idle.
    pub fn start<P: Copy>(
        &mut self,
        path: &[P],
        to_pixel: impl Fn(P) -> Point2<f32>,
    ) -> Result<RunId> {
        self.stop();

        if path.is_empty() {
            return Err(Error::NoPath);
        }

        let run = RunId(self.next_run);
        self.next_run += 1;

        self.waypoints = path.iter().map(|p| to_pixel(*p)).collect();
        self.state = AnimatorState::Running {
            segment: 0,
            step: 0,
        };
        self.active = Some(run);

        debug!(
            "starting animation run {} over {} waypoints",
            run.0,
            self.waypoints.len()
        );

        Ok(run)
    }

    /// Cancel the active run, if any, and forget its position.
    pub fn stop(&mut self) {
        if let Some(run) = self.active.take() {
            debug!("stopping animation run {}", run.0);
        }
        self.state = AnimatorState::Idle;
        self.position = None;
    }

    /// Number of increments the segment starting at waypoint `segment` is split into.
    /// Halves round away from zero, so a 10 pixel segment at 4 pixels per frame takes 3.
    fn steps_of(&self, segment: usize) -> usize {
        let length = nalgebra::distance(&self.waypoints[segment], &self.waypoints[segment + 1]);
        ((length / self.settings.pixels_per_frame).round() as usize).max(1)
    }

    /// Advance `run` by one frame.
    ///
    /// Returns `None` when `run` is not the active run or when there is nothing left to show.
    pub fn tick(&mut self, run: RunId) -> Option<Frame> {
        if self.active != Some(run) {
            trace!("ignoring tick for inactive run {}", run.0);
            return None;
        }

        let AnimatorState::Running { segment, step } = self.state else {
            return None;
        };

        if segment + 1 >= self.waypoints.len() {
            self.finish(run);
            return None;
        }

        let steps = self.steps_of(segment);
        let (from, to) = (self.waypoints[segment], self.waypoints[segment + 1]);
        let position = from + (to - from) * (step as f32 / steps as f32);
        self.position = Some(position);

        if step < steps {
            self.state = AnimatorState::Running {
                segment,
                step: step + 1,
            };
        } else if segment + 2 < self.waypoints.len() {
            // step 0 of the next segment is the position just shown
            self.state = AnimatorState::Running {
                segment: segment + 1,
                step: 1,
            };
        } else {
            self.finish(run);
        }

        Some(Frame {
            run,
            position,
            segment,
            step,
        })
    }

    /// The run played to the end, the last position stays visible
    fn finish(&mut self, run: RunId) {
        debug!("animation run {} finished", run.0);
        self.state = AnimatorState::Idle;
        self.active = None;
    }

    pub fn state(&self) -> AnimatorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, AnimatorState::Running { .. })
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.active
    }

    /// Position of the most recent frame
    pub fn position(&self) -> Option<Point2<f32>> {
        self.position
    }

    /// Delay the driver should wait between two ticks
    pub fn frame_interval(&self) -> Duration {
        self.settings.frame_interval()
    }
}
