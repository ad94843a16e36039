// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cubic Bézier geometry used to draw links and hit-test them.
//!
//! All math runs in `f64`: the root solver divides by the cubic's leading
//! coefficient, and `f32` loses too much precision near the degenerate
//! thresholds.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Coefficients with an absolute value below this are treated as zero.
pub const DEGENERATE_TOLERANCE: f64 = 1e-4;

/// A point in canvas units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal component
    pub x: f64,
    /// Vertical component
    pub y: f64,
}

impl Point {
    /// The origin
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle stored as its two extreme corners
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner (smallest coordinates)
    pub min: Point,
    /// Bottom-right corner (largest coordinates)
    pub max: Point,
}

impl Rect {
    /// Build a rectangle from any two opposite corners
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Build a rectangle from its origin and size
    pub fn from_origin_size(origin: Point, width: f64, height: f64) -> Self {
        Self::from_corners(origin, Point::new(origin.x + width, origin.y + height))
    }

    /// Width of the rectangle
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the rectangle
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Midpoint of the left edge
    pub fn left_center(&self) -> Point {
        Point::new(self.min.x, (self.min.y + self.max.y) / 2.0)
    }

    /// Midpoint of the right edge
    pub fn right_center(&self) -> Point {
        Point::new(self.max.x, (self.min.y + self.max.y) / 2.0)
    }

    /// Closed containment test for a single point
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// The four edges, clockwise from the top edge
    pub fn edges(&self) -> [(Point, Point); 4] {
        let tl = self.min;
        let tr = Point::new(self.max.x, self.min.y);
        let br = self.max;
        let bl = Point::new(self.min.x, self.max.y);
        [(tl, tr), (tr, br), (br, bl), (bl, tl)]
    }

    /// Grow the rectangle to include a point
    fn include(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }
}

/// Real roots of a polynomial, at most three.
///
/// Absent roots are simply not stored; there is no sentinel value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Roots {
    values: [f64; 3],
    len: usize,
}

impl Roots {
    /// No roots
    pub const fn none() -> Self {
        Self { values: [0.0; 3], len: 0 }
    }

    fn push(&mut self, value: f64) {
        // NaN can still appear from pathological input such as infinities.
        if value.is_finite() && self.len < self.values.len() {
            self.values[self.len] = value;
            self.len += 1;
        }
    }

    /// Number of roots found
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no root was found
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The roots as a slice, in the order the solver produced them
    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.len]
    }

    /// Iterate over the roots.
    ///
    /// The iterator owns a copy of the roots and does not borrow `self`.
    pub fn iter(&self) -> impl Iterator<Item = f64> {
        self.values.into_iter().take(self.len)
    }

    /// Roots that lie on the curve segment, `t ∈ [0, 1]`
    pub fn on_segment(&self) -> impl Iterator<Item = f64> {
        self.iter().filter(|t| is_curve_parameter(*t))
    }
}

impl FromIterator<f64> for Roots {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut roots = Self::none();
        for value in iter {
            roots.push(value);
        }
        roots
    }
}

/// Four control points of a cubic Bézier curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    /// Start point
    pub p0: Point,
    /// First control point
    pub p1: Point,
    /// Second control point
    pub p2: Point,
    /// End point
    pub p3: Point,
}

impl CubicBezier {
    /// Create a curve from its control points
    pub const fn new(p0: Point, p1: Point, p2: Point, p3: Point) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// Control points as an array
    pub fn points(&self) -> [Point; 4] {
        [self.p0, self.p1, self.p2, self.p3]
    }

    /// Evaluate the curve at `t`
    pub fn evaluate(&self, t: f64) -> Point {
        evaluate(self.p0, self.p1, self.p2, self.p3, t)
    }

    /// Tight axis-aligned bounds of the curve segment
    pub fn bounding_box(&self) -> Rect {
        cubic_bounding_box(self.p0, self.p1, self.p2, self.p3)
    }

    /// Whether the curve segment crosses the line segment `l1 → l2`
    pub fn intersects_segment(&self, l1: Point, l2: Point) -> bool {
        curve_intersects_segment(l1, l2, self.p0, self.p1, self.p2, self.p3)
    }

    /// Sample `segments + 1` evenly spaced points along the curve
    pub fn sample(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.evaluate(i as f64 / segments as f64))
            .collect()
    }
}

/// Whether `t` lies on the curve segment
pub fn is_curve_parameter(t: f64) -> bool {
    (0.0..=1.0).contains(&t)
}

/// Scalar cubic Bernstein polynomial
pub fn evaluate_scalar(a: f64, b: f64, c: f64, d: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    mt * mt * mt * a + 3.0 * mt * mt * t * b + 3.0 * mt * t * t * c + t * t * t * d
}

/// Evaluate a cubic Bézier curve at `t`.
///
/// Defined for every real `t`; only `t ∈ [0, 1]` lies on the segment.
pub fn evaluate(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    Point::new(
        evaluate_scalar(p0.x, p1.x, p2.x, p3.x, t),
        evaluate_scalar(p0.y, p1.y, p2.y, p3.y, t),
    )
}

fn approx_zero(value: f64) -> bool {
    value.abs() < DEGENERATE_TOLERANCE
}

/// Solve `a·t + b = 0`
fn linear_roots(a: f64, b: f64) -> Roots {
    if approx_zero(a) {
        return Roots::none();
    }
    [-b / a].into_iter().collect()
}

/// Solve `a·t² + b·t + c = 0`, falling back to the linear case
fn quadratic_roots(a: f64, b: f64, c: f64) -> Roots {
    if approx_zero(a) {
        return linear_roots(b, c);
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Roots::none();
    }
    let q = discriminant.sqrt();
    if q == 0.0 {
        return [-b / (2.0 * a)].into_iter().collect();
    }
    [(-b + q) / (2.0 * a), (-b - q) / (2.0 * a)].into_iter().collect()
}

/// Roots of the cubic Bernstein polynomial with coefficients `a, b, c, d`.
///
/// Near-zero leading terms degrade the problem to a quadratic, then a
/// linear equation; a polynomial that is zero everywhere yields no roots.
/// `f64::cbrt` is already real-valued for negative input.
pub fn cubic_roots(a: f64, b: f64, c: f64, d: f64) -> Roots {
    // Power basis: c3·t³ + c2·t² + c1·t + c0
    let c3 = -a + 3.0 * b - 3.0 * c + d;
    let c2 = 3.0 * a - 6.0 * b + 3.0 * c;
    let c1 = -3.0 * a + 3.0 * b;
    let c0 = a;

    if approx_zero(c3) {
        return quadratic_roots(c2, c1, c0);
    }

    let a = c2 / c3;
    let b = c1 / c3;
    let c = c0 / c3;

    let p = (3.0 * b - a * a) / 3.0;
    let p3 = p / 3.0;
    let q = (2.0 * a * a * a - 9.0 * a * b + 27.0 * c) / 27.0;
    let q2 = q / 2.0;
    let discriminant = q2 * q2 + p3 * p3 * p3;
    let shift = a / 3.0;

    if discriminant < 0.0 {
        // Three distinct real roots
        let mp3 = -p / 3.0;
        let r = (mp3 * mp3 * mp3).sqrt();
        let cosphi = (-q / (2.0 * r)).clamp(-1.0, 1.0);
        let phi = cosphi.acos();
        let t1 = 2.0 * r.cbrt();
        return [
            t1 * (phi / 3.0).cos() - shift,
            t1 * ((phi + 2.0 * PI) / 3.0).cos() - shift,
            t1 * ((phi + 4.0 * PI) / 3.0).cos() - shift,
        ]
        .into_iter()
        .collect();
    }

    if discriminant == 0.0 {
        // Three real roots, two of them equal
        let u1 = if q2 < 0.0 { (-q2).cbrt() } else { -q2.cbrt() };
        return [2.0 * u1 - shift, -u1 - shift].into_iter().collect();
    }

    // One real root, two complex
    let sd = discriminant.sqrt();
    let u1 = (sd - q2).cbrt();
    let v1 = (sd + q2).cbrt();
    [u1 - v1 - shift].into_iter().collect()
}

/// Rotate and translate the control points so that `l1` becomes the origin
/// and the direction `l1 → l2` becomes the positive x axis.
pub fn align_to_line(points: [Point; 4], l1: Point, l2: Point) -> [Point; 4] {
    let angle = -(l2.y - l1.y).atan2(l2.x - l1.x);
    let (sin, cos) = angle.sin_cos();
    points.map(|p| {
        let dx = p.x - l1.x;
        let dy = p.y - l1.y;
        Point::new(dx * cos - dy * sin, dx * sin + dy * cos)
    })
}

/// Whether the curve segment `p0..p3` crosses the line segment `l1 → l2`.
///
/// The curve is aligned so the segment lies on the x axis between `0` and
/// its length; a crossing is a root of the aligned y polynomial on the curve
/// whose aligned x falls inside that span.
pub fn curve_intersects_segment(
    l1: Point,
    l2: Point,
    p0: Point,
    p1: Point,
    p2: Point,
    p3: Point,
) -> bool {
    let length = l1.distance(l2);
    let [a0, a1, a2, a3] = align_to_line([p0, p1, p2, p3], l1, l2);
    cubic_roots(a0.y, a1.y, a2.y, a3.y).on_segment().any(|t| {
        let x = evaluate_scalar(a0.x, a1.x, a2.x, a3.x, t);
        (-DEGENERATE_TOLERANCE..=length + DEGENERATE_TOLERANCE).contains(&x)
    })
}

/// Critical parameters of one axis: roots of the curve's derivative
fn axis_extrema(p0: f64, p1: f64, p2: f64, p3: f64) -> Roots {
    // B'(t) / 3 = A·t² + B·t + C
    let d0 = p1 - p0;
    let d1 = p2 - p1;
    let d2 = p3 - p2;
    quadratic_roots(d0 - 2.0 * d1 + d2, 2.0 * (d1 - d0), d0)
}

/// Tight axis-aligned bounding box of the curve segment `t ∈ [0, 1]`.
///
/// Interior control points only matter through the extrema they create, so
/// the box may be smaller than the control polygon's hull.
pub fn cubic_bounding_box(p0: Point, p1: Point, p2: Point, p3: Point) -> Rect {
    let mut bounds = Rect::from_corners(p0, p3);
    let critical = axis_extrema(p0.x, p1.x, p2.x, p3.x)
        .iter()
        .chain(axis_extrema(p0.y, p1.y, p2.y, p3.y).iter())
        .filter(|t| is_curve_parameter(*t))
        .collect::<Vec<_>>();
    for t in critical {
        bounds.include(evaluate(p0, p1, p2, p3, t));
    }
    bounds
}

/// Closed-open containment of `inner` in `outer`.
///
/// The minimum edges may coincide, the maximum edges must be strictly
/// inside, so two rectangles that share an edge flip state exactly once
/// while dragging across it.
pub fn rect_contains(outer: &Rect, inner: &Rect) -> bool {
    inner.min.x >= outer.min.x
        && inner.min.y >= outer.min.y
        && inner.max.x < outer.max.x
        && inner.max.y < outer.max.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn curve(points: [(f64, f64); 4]) -> CubicBezier {
        let [a, b, c, d] = points.map(|(x, y)| Point::new(x, y));
        CubicBezier::new(a, b, c, d)
    }

    fn coord() -> impl Strategy<Value = f64> {
        -500.0..500.0f64
    }

    fn coefficient() -> impl Strategy<Value = f64> {
        -10.0..10.0f64
    }

    fn point() -> impl Strategy<Value = Point> {
        (coord(), coord()).prop_map(|(x, y)| Point::new(x, y))
    }

    #[test]
    fn test_evaluate_midpoint_of_straight_curve() {
        let c = curve([(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let mid = c.evaluate(0.5);
        assert_abs_diff_eq!(mid.x, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(mid.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cubic_roots_three_real() {
        // y = (t - 0.2)(t - 0.5)(t - 0.8) in Bernstein form
        let f = |t: f64| (t - 0.2) * (t - 0.5) * (t - 0.8);
        // Convert power basis samples to Bernstein coefficients:
        // a = f(0), d = f(1), b and c from derivatives at the ends.
        let a = f(0.0);
        let d = f(1.0);
        let f1 = 0.66; // f'(0) = 0.1 + 0.16 + 0.4
        let g1 = 0.66; // f'(1) = 0.4 + 0.16 + 0.1
        let b = a + f1 / 3.0;
        let c = d - g1 / 3.0;

        let mut roots: Vec<f64> = cubic_roots(a, b, c, d).iter().collect();
        roots.sort_by(f64::total_cmp);
        assert_eq!(roots.len(), 3);
        assert_abs_diff_eq!(roots[0], 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(roots[1], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(roots[2], 0.8, epsilon = 1e-9);
    }

    #[test]
    fn test_cubic_roots_single_real() {
        // t³ + t - 0.5 has one real root
        let f = |t: f64| t * t * t + t - 0.5;
        let a = f(0.0);
        let d = f(1.0);
        let b = a + 1.0 / 3.0;
        let c = d - 4.0 / 3.0;

        let roots = cubic_roots(a, b, c, d);
        assert_eq!(roots.len(), 1);
        let t = roots.as_slice()[0];
        assert!(f(t).abs() < 1e-9);
        assert!(evaluate_scalar(a, b, c, d, t).abs() < 1e-9);
    }

    #[test]
    fn test_cubic_roots_double_root() {
        // (t - 0.5)² (t - 0.25), expanded: every coefficient is exact in binary
        let f = |t: f64| (t - 0.5) * (t - 0.5) * (t - 0.25);
        let a = f(0.0);
        let d = f(1.0);
        let df0 = 0.25 + 2.0 * 0.5 * 0.25; // f'(0) = 0.5
        let df1 = 0.25 + 2.0 * 0.5 * 0.75; // f'(1) = 1.0
        let b = a + df0 / 3.0;
        let c = d - df1 / 3.0;

        let roots = cubic_roots(a, b, c, d);
        assert!(!roots.is_empty());
        for t in roots.iter() {
            assert!(f(t).abs() < 1e-6, "residual too large at t = {t}");
        }
        assert!(roots.iter().any(|t| (t - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_cubic_roots_quadratic_fallback() {
        // Control values of a quadratic lifted to cubic form: y = 4t(1 - t) - 0.75
        // has roots 0.25 and 0.75 and a vanishing cubic term.
        let a = -0.75;
        let b = -0.75 + 4.0 / 3.0;
        let c = b;
        let d = -0.75;

        let mut roots: Vec<f64> = cubic_roots(a, b, c, d).iter().collect();
        roots.sort_by(f64::total_cmp);
        assert_eq!(roots.len(), 2);
        assert_abs_diff_eq!(roots[0], 0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(roots[1], 0.75, epsilon = 1e-9);
    }

    #[test]
    fn test_cubic_roots_linear_fallback() {
        // Straight ramp from -1 to 2 crosses zero at t = 1/3
        let roots = cubic_roots(-1.0, 0.0, 1.0, 2.0);
        assert_eq!(roots.len(), 1);
        assert_abs_diff_eq!(roots.as_slice()[0], 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cubic_roots_fully_degenerate() {
        assert!(cubic_roots(0.0, 0.0, 0.0, 0.0).is_empty());
        assert!(cubic_roots(3.0, 3.0, 3.0, 3.0).is_empty());
    }

    #[test]
    fn test_quadratic_without_real_roots() {
        assert!(quadratic_roots(1.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_align_to_line_maps_segment_to_axis() {
        let l1 = Point::new(10.0, 10.0);
        let l2 = Point::new(20.0, 20.0);
        let [a, b, _, _] = align_to_line([l1, l2, l1, l2], l1, l2);
        assert_abs_diff_eq!(a.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.x, 200f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(b.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_curve_crosses_vertical_segment() {
        let c = curve([(0.0, 0.0), (50.0, 0.0), (50.0, 100.0), (100.0, 100.0)]);
        assert!(c.intersects_segment(Point::new(50.0, -10.0), Point::new(50.0, 110.0)));
        // Same line, but the segment stops before the curve reaches it
        assert!(!c.intersects_segment(Point::new(50.0, -10.0), Point::new(50.0, 20.0)));
    }

    #[test]
    fn test_segment_direction_does_not_matter() {
        let c = curve([(0.0, 0.0), (50.0, 0.0), (50.0, 100.0), (100.0, 100.0)]);
        let top = Point::new(-10.0, 50.0);
        let bottom = Point::new(110.0, 50.0);
        assert!(c.intersects_segment(top, bottom));
        assert!(c.intersects_segment(bottom, top));
    }

    #[test]
    fn test_curve_misses_distant_segment() {
        let c = curve([(0.0, 0.0), (50.0, 0.0), (50.0, 100.0), (100.0, 100.0)]);
        assert!(!c.intersects_segment(Point::new(200.0, 0.0), Point::new(200.0, 100.0)));
    }

    #[test]
    fn test_zero_length_segment_is_tolerated() {
        let c = curve([(0.0, 0.0), (50.0, 0.0), (50.0, 100.0), (100.0, 100.0)]);
        let p = Point::new(300.0, 300.0);
        assert!(!c.intersects_segment(p, p));
    }

    #[test]
    fn test_bounding_box_of_bulging_curve() {
        // Symmetric arch: y peaks at 75 for t = 0.5 while the controls sit at 100
        let c = curve([(0.0, 0.0), (0.0, 100.0), (100.0, 100.0), (100.0, 0.0)]);
        let bounds = c.bounding_box();
        assert_abs_diff_eq!(bounds.min.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bounds.max.x, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bounds.min.y, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bounds.max.y, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bounding_box_linear_derivative() {
        // The x derivative has a vanishing quadratic term; its single extremum
        // at t = 0.5 must still be found.
        let c = curve([(0.0, 0.0), (60.0, 10.0), (60.0, 20.0), (0.0, 30.0)]);
        let bounds = c.bounding_box();
        assert_abs_diff_eq!(bounds.max.x, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rect_contains_is_closed_open() {
        let outer = Rect::from_corners(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let touching_min = Rect::from_corners(Point::new(0.0, 0.0), Point::new(5.0, 5.0));
        let touching_max = Rect::from_corners(Point::new(5.0, 5.0), Point::new(10.0, 10.0));
        assert!(rect_contains(&outer, &touching_min));
        assert!(!rect_contains(&outer, &touching_max));
    }

    #[test]
    fn test_roots_ignore_non_finite_values() {
        let roots: Roots = [f64::NAN, 0.5, f64::INFINITY].into_iter().collect();
        assert_eq!(roots.as_slice(), &[0.5]);
    }

    /// Residual check for polynomials whose leading terms the solver drops.
    /// The neglected terms may contribute at most `|c3|·8 + |c2|·4` for
    /// `|t| <= 2`.
    fn assert_fallback_residuals(a: f64, b: f64, c: f64, d: f64) -> Result<(), TestCaseError> {
        let c3 = -a + 3.0 * b - 3.0 * c + d;
        let c2 = 3.0 * a - 6.0 * b + 3.0 * c;
        prop_assert!(c3.abs() < DEGENERATE_TOLERANCE);

        let scale = a.abs().max(b.abs()).max(c.abs()).max(d.abs()).max(1.0);
        let mut allowed = 1e-6 * scale + 8.0 * c3.abs();
        if c2.abs() < DEGENERATE_TOLERANCE {
            allowed += 4.0 * c2.abs();
        }
        for t in cubic_roots(a, b, c, d).iter().filter(|t| t.abs() <= 2.0) {
            let residual = evaluate_scalar(a, b, c, d, t).abs();
            prop_assert!(residual < allowed, "t = {}, residual = {}", t, residual);
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_endpoints_interpolate(p0 in point(), p1 in point(), p2 in point(), p3 in point()) {
            let start = evaluate(p0, p1, p2, p3, 0.0);
            let end = evaluate(p0, p1, p2, p3, 1.0);
            prop_assert!(start.distance(p0) < 1e-9);
            prop_assert!(end.distance(p3) < 1e-9);
        }

        #[test]
        fn prop_roots_are_zeros(
            a in coefficient(), b in coefficient(), c in coefficient(), d in coefficient(),
        ) {
            let leading = -a + 3.0 * b - 3.0 * c + d;
            prop_assume!(leading.abs() > 0.5);
            let scale = a.abs().max(b.abs()).max(c.abs()).max(d.abs()).max(1.0);
            for t in cubic_roots(a, b, c, d).iter().filter(|t| t.abs() <= 2.0) {
                let residual = evaluate_scalar(a, b, c, d, t).abs();
                prop_assert!(residual < 1e-6 * scale, "t = {}, residual = {}", t, residual);
            }
        }

        #[test]
        fn prop_quadratic_fallback_roots_are_zeros(
            a in coefficient(), b in coefficient(), c in coefficient(),
            cubic in -1e-5..1e-5f64,
        ) {
            // Choose d so the cubic term is below the degeneracy tolerance
            let d = cubic + a - 3.0 * b + 3.0 * c;
            assert_fallback_residuals(a, b, c, d)?;
        }

        #[test]
        fn prop_linear_fallback_roots_are_zeros(
            a in coefficient(), b in coefficient(),
            cubic in -1e-5..1e-5f64, quadratic in -1e-5..1e-5f64,
        ) {
            // Both the cubic and the quadratic term vanish
            let c = (quadratic - 3.0 * a + 6.0 * b) / 3.0;
            let d = cubic + a - 3.0 * b + 3.0 * c;
            assert_fallback_residuals(a, b, c, d)?;
        }

        #[test]
        fn prop_alignment_is_rigid(
            p0 in point(), p1 in point(), p2 in point(), p3 in point(),
            l1 in point(), l2 in point(),
        ) {
            prop_assume!(l1.distance(l2) > 1e-3);
            let before = [p0, p1, p2, p3];
            let after = align_to_line(before, l1, l2);
            for i in 0..4 {
                for j in 0..4 {
                    let d0 = before[i].distance(before[j]);
                    let d1 = after[i].distance(after[j]);
                    prop_assert!((d0 - d1).abs() < 1e-6);
                }
            }
            let [o, e, _, _] = align_to_line([l1, l2, l1, l2], l1, l2);
            prop_assert!(o.distance(Point::ZERO) < 1e-9);
            prop_assert!(e.y.abs() < 1e-6);
            prop_assert!(e.x > 0.0);
        }

        #[test]
        fn prop_bounding_box_contains_samples(
            p0 in point(), p1 in point(), p2 in point(), p3 in point(),
        ) {
            let bounds = cubic_bounding_box(p0, p1, p2, p3);
            let eps = 1e-6;
            for i in 0..=200 {
                let p = evaluate(p0, p1, p2, p3, i as f64 / 200.0);
                prop_assert!(p.x >= bounds.min.x - eps && p.x <= bounds.max.x + eps);
                prop_assert!(p.y >= bounds.min.y - eps && p.y <= bounds.max.y + eps);
            }
        }
    }
}
