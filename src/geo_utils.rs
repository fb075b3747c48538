//! # Geographic Utilities
//!
//! Distance and extent helpers shared by clustering and marker projection.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points |
//! | [`compute_bounds`] | Bounding box of a set of points |
//! | [`compute_center`] | Arithmetic mean of a set of points |
//!
//! ## Haversine Formula
//!
//! Distances use the haversine formula on a sphere of radius [`EARTH_RADIUS_METERS`]
//! (the WGS84 equatorial radius, no ellipsoid correction). This is larger than the
//! mean radius `geo::Haversine` uses, so the formula is written out here instead of
//! delegating to `geo`. Cluster membership thresholds depend on this exact constant.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)

use geo::{BoundingRect, MultiPoint, Point};
use crate::GeoPoint;

/// Earth radius used for all distances, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Center of the box.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// True if `point` lies inside or on the edge of the box.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// Great-circle distance between two points in meters.
///
/// # Example
///
/// ```rust
/// use occurrence_map::{GeoPoint, geo_utils};
///
/// let a = GeoPoint::new(-15.5369, -47.3316);
/// let b = GeoPoint::new(-15.5369, -47.3316);
/// assert_eq!(geo_utils::haversine_distance(&a, &b), 0.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let d_lat = (p2.latitude - p1.latitude).to_radians();
    let d_lng = (p2.longitude - p1.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Bounding box of a set of points, or `None` when empty.
///
/// ```rust
/// use occurrence_map::{GeoPoint, geo_utils};
///
/// let points = vec![
///     GeoPoint::new(-15.60, -47.40),
///     GeoPoint::new(-15.53, -47.33),
/// ];
/// let bounds = geo_utils::compute_bounds(&points).unwrap();
/// assert_eq!(bounds.min_lat, -15.60);
/// assert_eq!(bounds.max_lng, -47.33);
/// ```
pub fn compute_bounds(points: &[GeoPoint]) -> Option<Bounds> {
    let multi: MultiPoint<f64> = points
        .iter()
        .map(|p| Point::new(p.longitude, p.latitude))
        .collect::<Vec<_>>()
        .into();

    multi.bounding_rect().map(|rect| Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

/// Arithmetic mean of a set of points. Returns (0, 0) for empty input.
///
/// Only suitable for small areas that do not cross the antimeridian.
pub fn compute_center(points: &[GeoPoint]) -> GeoPoint {
    if points.is_empty() {
        return GeoPoint::new(0.0, 0.0);
    }

    let sum_lat: f64 = points.iter().map(|p| p.latitude).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude).sum();
    let n = points.len() as f64;

    GeoPoint::new(sum_lat / n, sum_lng / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Distance, Haversine};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GeoPoint::new(-15.5369, -47.3316);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        // One degree along a meridian is R * pi / 180
        let a = GeoPoint::new(0.0, 10.0);
        let b = GeoPoint::new(1.0, 10.0);
        let expected = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;
        assert!(approx_eq(haversine_distance(&a, &b), expected, 1e-6));
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let a = GeoPoint::new(-15.5369, -47.3316);
        let b = GeoPoint::new(-15.6000, -47.4000);
        assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
    }

    #[test]
    fn test_haversine_scales_geo_mean_radius() {
        // Same formula as geo's, only the sphere radius differs
        let a = GeoPoint::new(51.5074, -0.1278);
        let b = GeoPoint::new(48.8566, 2.3522);
        let ours = haversine_distance(&a, &b);
        let theirs = Haversine::distance(
            Point::new(a.longitude, a.latitude),
            Point::new(b.longitude, b.latitude),
        );
        let scaled = theirs * EARTH_RADIUS_METERS / 6_371_008.8;
        assert!(approx_eq(ours / scaled, 1.0, 1e-9));
    }

    #[test]
    fn test_scenario_points_are_kilometres_apart() {
        let a = GeoPoint::new(-15.5369, -47.3316);
        let c = GeoPoint::new(-15.6000, -47.4000);
        let d = haversine_distance(&a, &c);
        assert!(d > 9_000.0 && d < 11_000.0, "got {}", d);
    }

    #[test]
    fn test_compute_bounds() {
        let points = vec![
            GeoPoint::new(-15.50, -47.33),
            GeoPoint::new(-15.51, -47.32),
            GeoPoint::new(-15.505, -47.325),
        ];
        let bounds = compute_bounds(&points).unwrap();
        assert_eq!(bounds.min_lat, -15.51);
        assert_eq!(bounds.max_lat, -15.50);
        assert_eq!(bounds.min_lng, -47.33);
        assert_eq!(bounds.max_lng, -47.32);
        assert!(bounds.contains(&GeoPoint::new(-15.505, -47.325)));
        assert!(!bounds.contains(&GeoPoint::new(-15.60, -47.325)));
    }

    #[test]
    fn test_compute_bounds_empty() {
        assert!(compute_bounds(&[]).is_none());
    }

    #[test]
    fn test_compute_center() {
        let points = vec![
            GeoPoint::new(-15.50, -47.30),
            GeoPoint::new(-15.52, -47.32),
        ];
        let center = compute_center(&points);
        assert!(approx_eq(center.latitude, -15.51, 1e-9));
        assert!(approx_eq(center.longitude, -47.31, 1e-9));
        assert!(compute_bounds(&points).unwrap().center() == center);
    }

    #[test]
    fn test_compute_center_empty() {
        let center = compute_center(&[]);
        assert_eq!(center.latitude, 0.0);
        assert_eq!(center.longitude, 0.0);
    }
}
