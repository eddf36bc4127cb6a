//! Time-parameterized motion along a polyline.
//!
//! A trajectory moves an object along its control points at constant scalar
//! speed, starting at `start_time`. It is immutable once built.

use crate::error::TrajectoryError;
use crate::units::{Length, Time, Velocity};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Relative slack when comparing a travelled distance against a pixel.
///
/// Distances are products of unit conversions, so "exactly one pixel"
/// rarely survives floating point unscathed.
pub const PIXEL_TOLERANCE: f64 = 1e-9;

/// Motion descriptor owned by exactly one graphical object.
///
/// Deserialization goes through [`Trajectory::new`], so a stored trajectory
/// is validated exactly like a freshly built one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrajectoryRecord", into = "TrajectoryRecord")]
pub struct Trajectory {
    /// Control points in metres
    control_points: Vec<Point3<f64>>,

    /// Cumulative polyline length at each control point (metres)
    cumulative: Vec<f64>,

    /// Path length used for timing; defaults to the polyline length
    length: Length,

    velocity: Velocity,

    start_time: Time,
}

/// Serialized form: everything derived from the control points is rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrajectoryRecord {
    control_points: Vec<Point3<f64>>,
    #[serde(default)]
    length: Option<Length>,
    velocity: Velocity,
    #[serde(default)]
    start_time: Time,
}

impl From<Trajectory> for TrajectoryRecord {
    fn from(t: Trajectory) -> Self {
        Self {
            control_points: t.control_points,
            length: Some(t.length),
            velocity: t.velocity,
            start_time: t.start_time,
        }
    }
}

impl TryFrom<TrajectoryRecord> for Trajectory {
    type Error = TrajectoryError;

    fn try_from(record: TrajectoryRecord) -> Result<Self, Self::Error> {
        let trajectory =
            Trajectory::new(record.control_points, record.velocity)?.with_start_time(record.start_time);
        match record.length {
            Some(length) => trajectory.with_length(length),
            None => Ok(trajectory),
        }
    }
}

impl Trajectory {
    /// Create a trajectory through `control_points` (metres) at `velocity`.
    ///
    /// Zero velocity is allowed and yields a stationary trajectory.
    pub fn new(
        control_points: Vec<Point3<f64>>,
        velocity: Velocity,
    ) -> Result<Self, TrajectoryError> {
        if control_points.is_empty() {
            return Err(TrajectoryError::EmptyPath);
        }
        if let Some(index) = control_points
            .iter()
            .position(|p| !p.coords.iter().all(|c| c.is_finite()))
        {
            return Err(TrajectoryError::NonFiniteControlPoint(index));
        }
        let raw_velocity = velocity.inner_meters_per_second();
        if !velocity.is_finite() || raw_velocity < 0.0 {
            return Err(TrajectoryError::InvalidVelocity(raw_velocity));
        }

        let mut cumulative = Vec::with_capacity(control_points.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in control_points.windows(2) {
            total += (pair[1] - pair[0]).norm();
            cumulative.push(total);
        }

        Ok(Self {
            control_points,
            cumulative,
            length: Length::meters(total),
            velocity,
            start_time: Time::ZERO,
        })
    }

    /// A trajectory that sits at `point` forever.
    pub fn stationary(point: Point3<f64>) -> Self {
        Self {
            control_points: vec![point],
            cumulative: vec![0.0],
            length: Length::ZERO,
            velocity: Velocity::ZERO,
            start_time: Time::ZERO,
        }
    }

    pub fn with_start_time(mut self, start_time: Time) -> Self {
        self.start_time = start_time;
        self
    }

    /// Override the derived path length (e.g. for a path sampled coarsely).
    pub fn with_length(mut self, length: Length) -> Result<Self, TrajectoryError> {
        if !length.is_finite() || length < Length::ZERO {
            return Err(TrajectoryError::InvalidLength(length.inner_meters()));
        }
        self.length = length;
        Ok(self)
    }

    pub fn control_points(&self) -> &[Point3<f64>] {
        &self.control_points
    }

    pub fn length(&self) -> Length {
        self.length
    }

    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// `Time::INFINITY` for stationary trajectories.
    pub fn end_time(&self) -> Time {
        if self.is_stationary() {
            Time::INFINITY
        } else {
            self.start_time + self.length / self.velocity
        }
    }

    pub fn time_bounds(&self) -> (Time, Time) {
        (self.start_time, self.end_time())
    }

    /// True iff the velocity or the path length is zero, or every control
    /// point coincides (whatever length was supplied).
    pub fn is_stationary(&self) -> bool {
        self.velocity.is_zero() || self.length == Length::ZERO || self.polyline_length() == 0.0
    }

    fn polyline_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Whether `[start_time, end_time)` overlaps `[t0, t1)`.
    pub fn is_moving_during(&self, t0: Time, t1: Time) -> bool {
        if self.is_stationary() || t1 <= t0 {
            return false;
        }
        let (start, end) = self.time_bounds();
        start < t1 && t0 < end
    }

    /// Arc length covered inside `[t0, t1)`.
    pub fn distance_travelled(&self, t0: Time, t1: Time) -> Length {
        if self.is_stationary() {
            return Length::ZERO;
        }
        let (start, end) = self.time_bounds();
        let from = t0.max(start);
        let to = t1.min(end);
        if to <= from {
            return Length::ZERO;
        }
        (self.velocity * (to - from)).min(self.length)
    }

    /// Whether the trajectory covers at least one pixel inside `[t0, t1)`.
    pub fn moved(&self, t0: Time, t1: Time, pixel_size: Length) -> bool {
        let travelled = self.distance_travelled(t0, t1);
        travelled > Length::ZERO && travelled >= pixel_size * (1.0 - PIXEL_TOLERANCE)
    }

    /// Time after `current_time` at which the travelled distance first
    /// reaches `pixel_size`.
    ///
    /// Includes any wait before `start_time`. When less than a pixel of path
    /// is left, this is the time until the path ends. `Time::INFINITY` once
    /// the trajectory is stationary or finished (a remainder within
    /// [`PIXEL_TOLERANCE`] of a pixel counts as finished).
    pub fn next_time_step(&self, current_time: Time, pixel_size: Length) -> Time {
        if self.is_stationary() {
            return Time::INFINITY;
        }
        let (start, end) = self.time_bounds();
        if current_time >= end {
            return Time::INFINITY;
        }

        let (wait, from) = if current_time < start {
            (start - current_time, start)
        } else {
            (Time::ZERO, current_time)
        };
        let travelled = (self.velocity * (from - start)).min(self.length);
        let remaining = self.length - travelled;
        if remaining <= pixel_size * PIXEL_TOLERANCE {
            return Time::INFINITY;
        }

        wait + pixel_size.min(remaining) / self.velocity
    }

    /// Position along the path at time `t`, clamped to the path's ends.
    pub fn point_at(&self, t: Time) -> Point3<f64> {
        let first = self.control_points[0];
        if self.is_stationary() || t <= self.start_time {
            return first;
        }
        let polyline_len = self.polyline_length();

        let along = (self.velocity * (t - self.start_time)).min(self.length);
        let target = along / self.length * polyline_len;

        for (i, pair) in self.control_points.windows(2).enumerate() {
            let seg_start = self.cumulative[i];
            let seg_end = self.cumulative[i + 1];
            if target <= seg_end && seg_end > seg_start {
                let frac = (target - seg_start) / (seg_end - seg_start);
                return pair[0] + (pair[1] - pair[0]) * frac;
            }
        }

        self.control_points[self.control_points.len() - 1]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Ten evenly spaced points from the origin to 1 mm along x.
    pub(crate) fn linear_mm(velocity_mm_s: f64) -> Trajectory {
        let points = (0..10)
            .map(|i| Point3::new(i as f64 / 9.0 * 1e-3, 0.0, 0.0))
            .collect();
        Trajectory::new(points, Velocity::millimeters_per_second(velocity_mm_s)).unwrap()
    }

    #[test]
    fn test_construction_validation() {
        assert_eq!(
            Trajectory::new(vec![], Velocity::ZERO),
            Err(TrajectoryError::EmptyPath)
        );
        assert_eq!(
            Trajectory::new(
                vec![Point3::origin(), Point3::new(f64::NAN, 0.0, 0.0)],
                Velocity::ZERO
            ),
            Err(TrajectoryError::NonFiniteControlPoint(1))
        );
        assert!(matches!(
            Trajectory::new(vec![Point3::origin()], Velocity::meters_per_second(-1.0)),
            Err(TrajectoryError::InvalidVelocity(_))
        ));
        assert!(Trajectory::stationary(Point3::origin())
            .with_length(Length::meters(-1.0))
            .is_err());
    }

    #[test]
    fn test_length_and_time_bounds() {
        let t = linear_mm(10.0);
        assert_relative_eq!(t.length().inner_meters(), 1e-3, epsilon = 1e-15);

        let (start, end) = t.time_bounds();
        assert_eq!(start, Time::ZERO);
        assert_relative_eq!(end.inner_seconds(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_stationary_trajectories() {
        // Zero velocity over a real path
        let still = Trajectory::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            Velocity::ZERO,
        )
        .unwrap();
        assert!(still.is_stationary());
        assert_eq!(still.end_time(), Time::INFINITY);
        assert!(!still.is_moving_during(Time::ZERO, Time::seconds(1e9)));

        // Non-zero velocity over a degenerate path
        let degenerate = Trajectory::new(
            vec![Point3::new(1.0, 1.0, 1.0); 4],
            Velocity::meters_per_second(5.0),
        )
        .unwrap();
        assert!(degenerate.is_stationary());
        assert_eq!(
            degenerate.next_time_step(Time::ZERO, Length::micrometers(1.0)),
            Time::INFINITY
        );
    }

    #[test]
    fn test_is_moving_during_overlap() {
        let t = linear_mm(10.0).with_start_time(Time::seconds(1.0));
        // Motion spans [1.0, 1.1)
        assert!(!t.is_moving_during(Time::ZERO, Time::seconds(1.0)));
        assert!(t.is_moving_during(Time::ZERO, Time::seconds(1.01)));
        assert!(t.is_moving_during(Time::seconds(1.05), Time::seconds(2.0)));
        assert!(!t.is_moving_during(Time::seconds(1.2), Time::seconds(2.0)));
        // Empty and reversed windows never overlap
        assert!(!t.is_moving_during(Time::seconds(1.05), Time::seconds(1.05)));
        assert!(!t.is_moving_during(Time::seconds(2.0), Time::seconds(0.0)));
    }

    #[test]
    fn test_moved_uses_pixel_threshold() {
        let pixel = Length::millimeters(1e-3);
        let fast = linear_mm(10.0);

        assert!(!fast.moved(Time::ZERO, Time::seconds(1e-5), pixel));
        // Exactly one pixel counts as moved
        assert!(fast.moved(Time::ZERO, Time::seconds(1e-4), pixel));
    }

    #[test]
    fn test_next_time_step() {
        let pixel = Length::millimeters(1e-3);
        let t = linear_mm(3.0);

        let dt = t.next_time_step(Time::ZERO, pixel);
        assert_relative_eq!(dt.inner_seconds(), 1e-3 / 3.0, epsilon = 1e-15);

        // Waiting for a delayed start
        let delayed = linear_mm(3.0).with_start_time(Time::seconds(2.0));
        let dt = delayed.next_time_step(Time::seconds(0.5), pixel);
        assert_relative_eq!(dt.inner_seconds(), 1.5 + 1e-3 / 3.0, epsilon = 1e-12);

        // Finished trajectories never step again
        assert_eq!(t.next_time_step(Time::seconds(10.0), pixel), Time::INFINITY);
    }

    #[test]
    fn test_next_time_step_clamps_to_path_end() {
        let pixel = Length::millimeters(0.5);
        let t = linear_mm(1.0);
        // 0.8 mm travelled, only 0.2 mm left
        let dt = t.next_time_step(Time::seconds(0.8), pixel);
        assert_relative_eq!(dt.inner_seconds(), 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_point_at() {
        let t = linear_mm(1.0);
        assert_eq!(t.point_at(Time::seconds(-1.0)), Point3::origin());

        let mid = t.point_at(Time::seconds(0.5));
        assert_relative_eq!(mid.x, 0.5e-3, epsilon = 1e-12);
        assert_relative_eq!(mid.y, 0.0);

        let end = t.point_at(Time::seconds(5.0));
        assert_relative_eq!(end.x, 1e-3, epsilon = 1e-15);
    }

    #[test]
    fn test_degenerate_path_stays_stationary_with_supplied_length() {
        let pinned = Trajectory::new(
            vec![Point3::new(1.0, 1.0, 1.0); 4],
            Velocity::meters_per_second(5.0),
        )
        .unwrap()
        .with_length(Length::millimeters(1.0))
        .unwrap();

        assert!(pinned.is_stationary());
        assert!(!pinned.is_moving_during(Time::ZERO, Time::seconds(1.0)));
        assert!(!pinned.moved(Time::ZERO, Time::seconds(1.0), Length::micrometers(1.0)));
        assert_eq!(
            pinned.next_time_step(Time::ZERO, Length::micrometers(1.0)),
            Time::INFINITY
        );
        assert_eq!(pinned.point_at(Time::seconds(0.5)), Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_serde_round_trip_keeps_timing() {
        let t = linear_mm(2.0)
            .with_start_time(Time::seconds(0.5))
            .with_length(Length::millimeters(3.0))
            .unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let back: Trajectory = serde_json::from_str(&json).unwrap();

        assert_eq!(back.control_points(), t.control_points());
        assert_eq!(back.start_time(), t.start_time());
        assert_relative_eq!(back.length().inner_meters(), 3e-3, epsilon = 1e-15);
        assert_relative_eq!(back.end_time().inner_seconds(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_deserialize_validates_like_new() {
        let empty = r#"{"control_points":[],"length":1.0,"velocity":1.0,"start_time":0.0}"#;
        assert!(serde_json::from_str::<Trajectory>(empty).is_err());

        let backwards = r#"{"control_points":[[0.0,0.0,0.0],[1.0,0.0,0.0]],"velocity":-1.0}"#;
        assert!(serde_json::from_str::<Trajectory>(backwards).is_err());

        let bad_length = r#"{"control_points":[[0.0,0.0,0.0],[1.0,0.0,0.0]],"length":-2.0,"velocity":1.0}"#;
        assert!(serde_json::from_str::<Trajectory>(bad_length).is_err());

        // Missing length falls back to the polyline length
        let derived: Trajectory =
            serde_json::from_str(r#"{"control_points":[[0.0,0.0,0.0],[0.0,2.0,0.0]],"velocity":1.0}"#)
                .unwrap();
        assert_relative_eq!(derived.length().inner_meters(), 2.0);
    }

    #[test]
    fn test_supplied_length_rescales_timing() {
        let t = linear_mm(1.0).with_length(Length::millimeters(2.0)).unwrap();
        assert_relative_eq!(t.end_time().inner_seconds(), 2.0, epsilon = 1e-12);
        // Halfway in time is halfway along the polyline
        assert_relative_eq!(t.point_at(Time::seconds(1.0)).x, 0.5e-3, epsilon = 1e-12);
    }
}
