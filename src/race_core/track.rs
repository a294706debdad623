//! Track - Closed spline circuit addressed by arc length
//!
//! The centerline is a Catmull-Rom loop through the control points, sampled
//! into a fixed polyline. Everything on the track is located by its arc
//! length `s`, which wraps modulo the loop circumference.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::race_core::error::RaceError;

/// Control points of the stock circuit (world units, +y down).
pub const DEFAULT_CIRCUIT: [(f32, f32); 13] = [
    (-560.0, -40.0),
    (-430.0, -230.0),
    (-220.0, -260.0),
    (-40.0, -120.0),
    (150.0, -260.0),
    (340.0, -220.0),
    (560.0, -20.0),
    (520.0, 200.0),
    (320.0, 330.0),
    (100.0, 260.0),
    (-110.0, 350.0),
    (-340.0, 300.0),
    (-520.0, 130.0),
];

/// Centerline frame at one arc length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub position: Vec2,
    /// Unit direction of travel
    pub tangent: Vec2,
    /// Unit lateral direction, tangent rotated a quarter turn
    pub normal: Vec2,
    /// Heading of the tangent in radians
    pub heading: f32,
}

impl TrackPoint {
    /// World position displaced `lane_offset` along the normal
    pub fn offset(&self, lane_offset: f32) -> Vec2 {
        self.position + self.normal * lane_offset
    }
}

/// Result of a local nearest-sample search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoint {
    /// Index of the closest sample
    pub index: usize,
    /// Straight-line distance to that sample
    pub distance: f32,
    /// Signed projection onto the sample's normal
    pub lateral: f32,
    /// Arc length of the closest sample
    pub s_approx: f32,
}

/// Inputs a circuit is built from; the serialized form of a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackLayout {
    /// Ordered control polygon, implicitly closed
    pub control_points: Vec<Vec2>,
    /// Spline samples per control-point span
    pub samples_per_span: usize,
    /// Full track width in world units
    pub width: f32,
}

/// Immutable sampled centerline of a closed circuit
///
/// Serializes as its `TrackLayout`; deserializing rebuilds the samples
/// through `TrackGeometry::build`, so a decoded track is always valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "TrackLayout", try_from = "TrackLayout")]
pub struct TrackGeometry {
    control_points: Vec<Vec2>,
    samples_per_span: usize,
    samples: Vec<Vec2>,
    /// Arc length up to each sample; `cumulative[0] == 0`
    cumulative: Vec<f32>,
    total_length: f32,
    /// Implicit segment from the last sample back to the first
    closing_length: f32,
    width: f32,
}

impl TrackGeometry {
    pub const MIN_CONTROL_POINTS: usize = 4;
    /// Half-width of the nearest-point search window, in samples
    pub const SEARCH_RADIUS: usize = 50;
    const MIN_SEGMENT: f32 = 0.0001;
    const MIN_LOOP_LENGTH: f32 = 1.0;
    const CURVATURE_PROBE: f32 = 20.0;

    /// Build the circuit from an ordered, implicitly closed control polygon.
    pub fn build(
        control_points: &[Vec2],
        samples_per_span: usize,
        width: f32,
    ) -> Result<Self, RaceError> {
        let n = control_points.len();
        if n < Self::MIN_CONTROL_POINTS {
            return Err(RaceError::TooFewControlPoints {
                found: n,
                min: Self::MIN_CONTROL_POINTS,
            });
        }
        if samples_per_span == 0 {
            return Err(RaceError::NoSamplesPerSpan);
        }
        if let Some(index) = control_points.iter().position(|p| !p.is_finite()) {
            return Err(RaceError::NonFiniteControlPoint { index });
        }
        if !(width.is_finite() && width > 0.0) {
            return Err(RaceError::InvalidConfig(format!(
                "track width must be positive, got {width}"
            )));
        }

        let mut samples = Vec::with_capacity(n * samples_per_span);
        for i in 0..n {
            let p0 = control_points[(i + n - 1) % n];
            let p1 = control_points[i];
            let p2 = control_points[(i + 1) % n];
            let p3 = control_points[(i + 2) % n];
            for j in 0..samples_per_span {
                let t = j as f32 / samples_per_span as f32;
                samples.push(catmull_rom(p0, p1, p2, p3, t));
            }
        }

        let mut cumulative = Vec::with_capacity(samples.len());
        let mut acc = 0.0;
        cumulative.push(acc);
        for pair in samples.windows(2) {
            acc += pair[0].distance(pair[1]);
            cumulative.push(acc);
        }

        let closing_length = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => last.distance(*first),
            _ => 0.0,
        };
        let total_length = acc + closing_length;
        if !(total_length.is_finite() && total_length >= Self::MIN_LOOP_LENGTH) {
            return Err(RaceError::DegenerateLoop {
                length: total_length,
            });
        }

        Ok(Self {
            control_points: control_points.to_vec(),
            samples_per_span,
            samples,
            cumulative,
            total_length,
            closing_length,
            width,
        })
    }

    /// Build the stock circuit
    pub fn default_circuit(samples_per_span: usize, width: f32) -> Result<Self, RaceError> {
        let points: Vec<Vec2> = DEFAULT_CIRCUIT.iter().copied().map(Vec2::from).collect();
        Self::build(&points, samples_per_span, width)
    }

    /// Get the control polygon the track was built from
    pub fn control_points(&self) -> &[Vec2] {
        &self.control_points
    }

    /// Get the spline resolution per span
    pub fn samples_per_span(&self) -> usize {
        self.samples_per_span
    }

    /// Get the sampled centerline, in driving order
    pub fn samples(&self) -> &[Vec2] {
        &self.samples
    }

    /// Get the arc length at each sample
    pub fn cumulative(&self) -> &[f32] {
        &self.cumulative
    }

    /// Get the number of centerline samples
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Get the loop circumference
    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    /// Get the length of the segment closing the loop
    pub fn closing_length(&self) -> f32 {
        self.closing_length
    }

    /// Get the full track width
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Get the lateral limit either side of the centerline
    pub fn half_width(&self) -> f32 {
        self.width * 0.5
    }

    /// Normalize any arc length into `[0, total_length)`.
    pub fn wrap(&self, s: f32) -> f32 {
        let wrapped = s.rem_euclid(self.total_length);
        // rem_euclid may round up to the modulus itself
        if wrapped.is_finite() && wrapped < self.total_length {
            wrapped
        } else {
            0.0
        }
    }

    /// Shortest signed arc-length distance from `b` to `a`, in `(-L/2, L/2]`.
    pub fn signed_gap(&self, a: f32, b: f32) -> f32 {
        let d = self.wrap(a - b);
        if d > self.total_length * 0.5 {
            d - self.total_length
        } else {
            d
        }
    }

    /// Centerline frame at arc length `s`.
    pub fn point_at(&self, s: f32) -> TrackPoint {
        let s = self.wrap(s);
        let idx = self
            .cumulative
            .partition_point(|&c| c <= s)
            .saturating_sub(1);
        let (a, b, seg_len) = self.segment(idx);

        let t = if seg_len > Self::MIN_SEGMENT {
            ((s - self.cumulative[idx]) / seg_len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let tangent = unit_direction(a, b);

        TrackPoint {
            position: a.lerp(b, t),
            tangent,
            normal: tangent.perp(),
            heading: tangent.y.atan2(tangent.x),
        }
    }

    /// Closest sample to `position`, searched in a window around `s_hint`.
    ///
    /// This is a local search: it is only correct when the hint is close to
    /// the true arc length, as it is for a vehicle moving along the track.
    pub fn nearest_point(&self, position: Vec2, s_hint: f32) -> NearestPoint {
        let count = self.samples.len();
        let hint = ((self.wrap(s_hint) / self.total_length) * count as f32).floor() as usize;
        let hint = hint.min(count - 1);

        let mut best = (hint, f32::INFINITY);
        let mut consider = |i: usize| {
            let d2 = self.samples[i].distance_squared(position);
            if d2 < best.1 {
                best = (i, d2);
            }
        };

        let window = 2 * Self::SEARCH_RADIUS + 1;
        if window >= count {
            // Window would wrap onto itself; scan every sample once.
            (0..count).for_each(&mut consider);
        } else {
            for k in 0..window {
                consider((hint + count - Self::SEARCH_RADIUS + k) % count);
            }
        }

        let (index, dist2) = best;
        let (center, next, _) = self.segment(index);
        let normal = unit_direction(center, next).perp();

        NearestPoint {
            index,
            distance: dist2.sqrt(),
            lateral: (position - center).dot(normal),
            s_approx: self.cumulative[index],
        }
    }

    /// Signed heading change per unit arc length around `s`.
    ///
    /// Positive values turn toward the normal side.
    pub fn curvature_at(&self, s: f32) -> f32 {
        let behind = self.point_at(s - Self::CURVATURE_PROBE).heading;
        let ahead = self.point_at(s + Self::CURVATURE_PROBE).heading;
        wrap_angle(ahead - behind) / (2.0 * Self::CURVATURE_PROBE)
    }

    /// Endpoints and length of the segment starting at sample `idx`.
    fn segment(&self, idx: usize) -> (Vec2, Vec2, f32) {
        let next = idx + 1;
        if next < self.samples.len() {
            (
                self.samples[idx],
                self.samples[next],
                self.cumulative[next] - self.cumulative[idx],
            )
        } else {
            (self.samples[idx], self.samples[0], self.closing_length)
        }
    }
}

impl TryFrom<TrackLayout> for TrackGeometry {
    type Error = RaceError;

    fn try_from(layout: TrackLayout) -> Result<Self, Self::Error> {
        Self::build(&layout.control_points, layout.samples_per_span, layout.width)
    }
}

impl From<TrackGeometry> for TrackLayout {
    fn from(track: TrackGeometry) -> Self {
        Self {
            control_points: track.control_points,
            samples_per_span: track.samples_per_span,
            width: track.width,
        }
    }
}

fn catmull_rom(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let t2 = t * t;
    let t3 = t2 * t;
    let blend = |a: f32, b: f32, c: f32, d: f32| {
        0.5 * ((2.0 * b)
            + (-a + c) * t
            + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2
            + (-a + 3.0 * b - 3.0 * c + d) * t3)
    };
    Vec2::new(
        blend(p0.x, p1.x, p2.x, p3.x),
        blend(p0.y, p1.y, p2.y, p3.y),
    )
}

fn unit_direction(from: Vec2, to: Vec2) -> Vec2 {
    let d = to - from;
    d * (1.0 / d.length().max(TrackGeometry::MIN_SEGMENT))
}

fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock() -> TrackGeometry {
        TrackGeometry::default_circuit(28, 110.0).unwrap()
    }

    fn square(samples_per_span: usize) -> TrackGeometry {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(100.0, 0.0),
            Vec2::new(100.0, 100.0),
            Vec2::new(0.0, 100.0),
        ];
        TrackGeometry::build(&pts, samples_per_span, 20.0).unwrap()
    }

    fn close(a: Vec2, b: Vec2, tol: f32) -> bool {
        a.distance(b) <= tol
    }

    #[test]
    fn build_rejects_bad_input() {
        let three = [Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
        assert_eq!(
            TrackGeometry::build(&three, 28, 110.0),
            Err(RaceError::TooFewControlPoints { found: 3, min: 4 })
        );

        let pts: Vec<Vec2> = DEFAULT_CIRCUIT.iter().copied().map(Vec2::from).collect();
        assert_eq!(
            TrackGeometry::build(&pts, 0, 110.0),
            Err(RaceError::NoSamplesPerSpan)
        );

        let mut bad = pts.clone();
        bad[2].x = f32::NAN;
        assert_eq!(
            TrackGeometry::build(&bad, 28, 110.0),
            Err(RaceError::NonFiniteControlPoint { index: 2 })
        );

        let same = [Vec2::new(5.0, 5.0); 6];
        assert!(matches!(
            TrackGeometry::build(&same, 28, 110.0),
            Err(RaceError::DegenerateLoop { .. })
        ));
    }

    #[test]
    fn sample_table_invariants() {
        let track = stock();
        assert_eq!(track.sample_count(), 13 * 28);
        assert_eq!(track.cumulative()[0], 0.0);

        let samples = track.samples();
        let cumulative = track.cumulative();
        for i in 0..samples.len() - 1 {
            let step = cumulative[i + 1] - cumulative[i];
            assert!(step >= 0.0);
            assert!((step - samples[i].distance(samples[i + 1])).abs() < 2e-3);
        }

        let last = cumulative[cumulative.len() - 1];
        assert!((track.total_length() - (last + track.closing_length())).abs() < 1e-3);
        assert!(track.closing_length() > 0.0);
    }

    #[test]
    fn loop_is_seamless() {
        let track = stock();
        let start = track.point_at(0.0);
        let full = track.point_at(track.total_length());
        assert!(close(start.position, full.position, 1e-3));
        assert!((start.heading - full.heading).abs() < 1e-4);

        // Approaching the origin from behind lands on the first sample.
        let almost = track.point_at(track.total_length() - 0.01);
        assert!(close(almost.position, start.position, 0.05));
    }

    #[test]
    fn wrapped_arc_lengths_resolve_to_the_same_point() {
        let track = stock();
        let len = track.total_length();
        for &s in &[0.0, 12.5, 777.7, len * 0.5, len - 3.0, -40.0] {
            let base = track.point_at(s);
            for k in -3i32..=3 {
                let p = track.point_at(s + k as f32 * len);
                assert!(close(base.position, p.position, 0.05), "s={s} k={k}");
            }
        }
    }

    #[test]
    fn chord_never_exceeds_arc() {
        let track = stock();
        let len = track.total_length();
        let steps = 40;
        for i in 0..steps {
            for j in (i + 1)..steps {
                let a = len * i as f32 / steps as f32;
                let b = len * j as f32 / steps as f32;
                let chord = track.point_at(a).position.distance(track.point_at(b).position);
                assert!(chord <= (b - a) + 1e-2, "a={a} b={b} chord={chord}");
            }
        }
    }

    #[test]
    fn extreme_arc_lengths_stay_in_range() {
        let track = stock();
        for &s in &[-1.0e7, -0.0, 1.0e7, f32::NAN, f32::INFINITY] {
            let p = track.point_at(s);
            assert!(p.position.is_finite());
            let w = track.wrap(s);
            assert!((0.0..track.total_length()).contains(&w));
        }
    }

    #[test]
    fn frame_is_orthonormal() {
        let track = stock();
        let p = track.point_at(321.0);
        assert!((p.tangent.length() - 1.0).abs() < 1e-4);
        assert!(p.tangent.dot(p.normal).abs() < 1e-4);
        assert!((p.heading - p.tangent.y.atan2(p.tangent.x)).abs() < 1e-6);
    }

    #[test]
    fn nearest_point_recovers_lateral_offset() {
        let track = stock();
        let idx = 100;
        let s = track.cumulative()[idx];
        let frame = track.point_at(s);

        let on_line = track.nearest_point(frame.position, s + 15.0);
        assert_eq!(on_line.index, idx);
        assert!(on_line.distance < 1e-3);
        assert!(on_line.lateral.abs() < 1e-3);
        assert!((on_line.s_approx - s).abs() < 1e-3);

        let beside = track.nearest_point(frame.offset(20.0), s);
        assert!((beside.lateral - 20.0).abs() < 0.5);
        let other_side = track.nearest_point(frame.offset(-20.0), s);
        assert!((other_side.lateral + 20.0).abs() < 0.5);
    }

    #[test]
    fn nearest_point_window_wraps_past_origin() {
        let track = stock();
        let last = track.sample_count() - 2;
        let target = track.samples()[last];
        let found = track.nearest_point(target, 0.0);
        assert_eq!(found.index, last);
    }

    #[test]
    fn nearest_point_on_tiny_track_scans_everything() {
        let track = square(2);
        assert!(track.sample_count() < 2 * TrackGeometry::SEARCH_RADIUS + 1);
        for (i, &p) in track.samples().iter().enumerate() {
            let found = track.nearest_point(p, track.total_length() * 0.77);
            assert_eq!(found.index, i);
        }
    }

    #[test]
    fn signed_gap_takes_short_way_round() {
        let track = stock();
        let len = track.total_length();
        assert!((track.signed_gap(10.0, 0.0) - 10.0).abs() < 1e-3);
        assert!((track.signed_gap(0.0, 10.0) + 10.0).abs() < 1e-3);
        assert!((track.signed_gap(len - 5.0, 5.0) + 10.0).abs() < 1e-2);
        assert!((track.signed_gap(5.0 + 3.0 * len, len - 5.0) - 10.0).abs() < 1e-1);
    }

    #[test]
    fn decoded_track_is_rebuilt_from_its_layout() {
        let track = square(6);
        let json = serde_json::to_string(&track).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("samples").is_none());
        assert_eq!(value["samples_per_span"], 6);

        let decoded: TrackGeometry = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, track);
        assert_eq!(decoded.sample_count(), 4 * 6);
    }

    #[test]
    fn hand_made_track_payloads_are_rejected() {
        let raw_table = r#"{"samples":[],"cumulative":[],"total_length":0.0,"closing_length":0.0,"width":110.0}"#;
        assert!(serde_json::from_str::<TrackGeometry>(raw_table).is_err());

        let too_few = r#"{"control_points":[[0.0,0.0],[10.0,0.0],[0.0,10.0]],"samples_per_span":28,"width":110.0}"#;
        let err = serde_json::from_str::<TrackGeometry>(too_few).unwrap_err();
        assert!(err.to_string().contains("at least 4 control points"));

        let collapsed = r#"{"control_points":[[5.0,5.0],[5.0,5.0],[5.0,5.0],[5.0,5.0]],"samples_per_span":28,"width":110.0}"#;
        assert!(serde_json::from_str::<TrackGeometry>(collapsed).is_err());

        let no_samples = r#"{"control_points":[[0.0,0.0],[100.0,0.0],[100.0,100.0],[0.0,100.0]],"samples_per_span":0,"width":110.0}"#;
        assert!(serde_json::from_str::<TrackGeometry>(no_samples).is_err());
    }

    #[test]
    fn curvature_follows_turn_direction() {
        let radius = 200.0;
        let pts: Vec<Vec2> = (0..16)
            .map(|i| {
                let a = i as f32 / 16.0 * TAU;
                Vec2::new(radius * a.cos(), radius * a.sin())
            })
            .collect();
        let circle = TrackGeometry::build(&pts, 28, 40.0).unwrap();
        let k = circle.curvature_at(circle.total_length() * 0.3);
        assert!((k - 1.0 / radius).abs() < 0.15 / radius, "k={k}");

        let reversed: Vec<Vec2> = pts.iter().rev().copied().collect();
        let clockwise = TrackGeometry::build(&reversed, 28, 40.0).unwrap();
        assert!(clockwise.curvature_at(100.0) < 0.0);
    }
}
