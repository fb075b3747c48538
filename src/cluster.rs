//! Proximity clustering of occurrences for map markers.
//!
//! Points are grouped greedily in input order: the first unvisited point becomes an
//! *anchor*, and every later unvisited point strictly within the radius of that anchor
//! joins its cluster. Membership is decided against the anchor only, never
//! transitively through other members, so a cluster can contain two points that are
//! further apart than the radius. Markers are drawn at the anchor, not a centroid.
//!
//! The pass is O(n²) and deterministic for a given input order and radius.

use crate::geo_utils::haversine_distance;
use crate::{GeoPoint, Occurrence};

/// A group of occurrences sharing one map marker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct OccurrenceCluster {
    /// Coordinate of the first member; the marker position
    pub anchor: GeoPoint,
    /// Members in input order, anchor first
    pub members: Vec<Occurrence>,
    /// Always `members.len()`
    pub count: u32,
}

impl OccurrenceCluster {
    /// True for a cluster that renders as a plain marker.
    pub fn is_single(&self) -> bool {
        self.count == 1
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }
}

/// Clusters computed for one radius (typically one map zoom level).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ZoomLevelClusters {
    pub radius_meters: f64,
    pub clusters: Vec<OccurrenceCluster>,
}

/// Group point indices by anchor.
///
/// Returns one index list per cluster, in the order anchors were found. The first
/// index of each list is the anchor. Every index of `points` appears exactly once.
///
/// A radius that is not strictly positive (or NaN) merges nothing, not even
/// identical coordinates, since `0.0 < radius` is then false.
///
/// # Example
/// ```
/// use occurrence_map::{group_by_anchor, GeoPoint};
///
/// let points = vec![
///     GeoPoint::new(-15.5369, -47.3316),
///     GeoPoint::new(-15.6000, -47.4000),
///     GeoPoint::new(-15.5369, -47.3316),
/// ];
/// assert_eq!(group_by_anchor(&points, 200.0), vec![vec![0, 2], vec![1]]);
/// ```
pub fn group_by_anchor(points: &[GeoPoint], radius_meters: f64) -> Vec<Vec<usize>> {
    let mut visited = vec![false; points.len()];
    let mut groups = Vec::new();

    for i in 0..points.len() {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let anchor = &points[i];
        let mut members = vec![i];

        for j in (i + 1)..points.len() {
            if visited[j] {
                continue;
            }
            if haversine_distance(anchor, &points[j]) < radius_meters {
                visited[j] = true;
                members.push(j);
            }
        }

        groups.push(members);
    }

    groups
}

/// Cluster occurrences by proximity to an anchor.
///
/// Input is expected to contain only occurrences with usable coordinates; see
/// [`retain_clusterable`]. Never fails.
///
/// # Example
/// ```
/// use occurrence_map::{cluster_occurrences, GeoPoint, Occurrence, OccurrenceStatus};
///
/// let occurrences = vec![
///     Occurrence::new("a", -15.5369, -47.3316, OccurrenceStatus::Open),
///     Occurrence::new("b", -15.5369, -47.3316, OccurrenceStatus::Open),
///     Occurrence::new("c", -15.6000, -47.4000, OccurrenceStatus::Closed),
/// ];
///
/// let clusters = cluster_occurrences(&occurrences, 200.0);
/// assert_eq!(clusters.len(), 2);
/// assert_eq!(clusters[0].count, 2);
/// assert_eq!(clusters[0].anchor, GeoPoint::new(-15.5369, -47.3316));
/// assert_eq!(clusters[1].member_ids(), vec!["c".to_string()]);
/// ```
pub fn cluster_occurrences(occurrences: &[Occurrence], radius_meters: f64) -> Vec<OccurrenceCluster> {
    let positions: Vec<GeoPoint> = occurrences.iter().map(Occurrence::position).collect();

    group_by_anchor(&positions, radius_meters)
        .into_iter()
        .map(|indices| {
            let members: Vec<Occurrence> = indices
                .iter()
                .map(|&i| occurrences[i].clone())
                .collect();
            OccurrenceCluster {
                anchor: positions[indices[0]],
                count: members.len() as u32,
                members,
            }
        })
        .collect()
}

/// Drop occurrences without a usable location (non-finite, out of range or zeroed).
pub fn retain_clusterable(mut occurrences: Vec<Occurrence>) -> Vec<Occurrence> {
    occurrences.retain(|o| o.position().is_clusterable());
    occurrences
}

/// Cluster the same occurrences once per radius.
///
/// Results come back in the order of `radii_meters`, and each entry is exactly what
/// [`cluster_occurrences`] returns for that radius. With the `parallel` feature the
/// radii are processed on the rayon pool.
pub fn cluster_zoom_levels(occurrences: &[Occurrence], radii_meters: &[f64]) -> Vec<ZoomLevelClusters> {
    map_radii(radii_meters, |&radius_meters| ZoomLevelClusters {
        radius_meters,
        clusters: cluster_occurrences(occurrences, radius_meters),
    })
}

#[cfg(feature = "parallel")]
fn map_radii<F>(radii_meters: &[f64], level: F) -> Vec<ZoomLevelClusters>
where
    F: Fn(&f64) -> ZoomLevelClusters + Sync + Send,
{
    use rayon::prelude::*;
    radii_meters.par_iter().map(level).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_radii<F>(radii_meters: &[f64], level: F) -> Vec<ZoomLevelClusters>
where
    F: Fn(&f64) -> ZoomLevelClusters,
{
    radii_meters.iter().map(level).collect()
}
