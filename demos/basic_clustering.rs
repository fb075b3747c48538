//! Cluster a handful of occurrences and print the resulting markers.
//!
//! Run with: cargo run --example basic_clustering

use occurrence_map::{
    cluster_occurrences, marker_bounds, retain_clusterable, status_set, to_markers, ClusterConfig,
    MarkerKind, Occurrence, OccurrenceStatus,
};

fn main() {
    let occurrences = vec![
        Occurrence::new("A", -15.5369, -47.3316, OccurrenceStatus::Open),
        Occurrence::new("B", -15.5369, -47.3316, OccurrenceStatus::InProgress),
        Occurrence::new("C", -15.5375, -47.3320, OccurrenceStatus::Closed),
        Occurrence::new("D", -15.6000, -47.4000, OccurrenceStatus::Open),
        // No location reported
        Occurrence::new("E", 0.0, 0.0, OccurrenceStatus::Open),
    ];

    let config = ClusterConfig::default();
    let clusterable = retain_clusterable(occurrences);
    let clusters = cluster_occurrences(&clusterable, config.radius_meters);

    println!("Clustering {} occurrences ({}m radius)\n", clusterable.len(), config.radius_meters);

    for (cluster, marker) in clusters.iter().zip(to_markers(&clusters)) {
        let label = match marker.kind {
            MarkerKind::Single => "pin".to_string(),
            MarkerKind::Badge => format!("badge({})", marker.count),
        };
        println!(
            "  {} at ({:.4}, {:.4}) members={:?} statuses={:?}",
            label,
            marker.latitude,
            marker.longitude,
            cluster.member_ids(),
            status_set(cluster),
        );
    }

    if let Some(bounds) = marker_bounds(&to_markers(&clusters)) {
        let center = bounds.center();
        println!("\nFit map to center ({:.4}, {:.4})", center.latitude, center.longitude);
    }
}
