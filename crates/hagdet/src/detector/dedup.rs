//! Cross-tile deduplication of detections.
//!
//! Tiles overlap, so one physical object can surface as several detections
//! with nearby world centroids. Pairs closer than the dedupe radius are
//! merged transitively with a union-find; candidate pairs come from an
//! R-tree query instead of an all-pairs scan.

use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::debug;

use crate::Detection;

use super::label::DisjointSet;

/// One merged group of detections.
///
/// `members` and `representative` are indices into the input slice. The
/// representative is the member with the smallest `(file, id)` key, so the
/// choice does not depend on traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupeCluster {
    pub id: u32,
    pub members: Vec<usize>,
    pub representative: usize,
}

/// Group detections whose centroids lie within `radius_m` of each other.
///
/// Merging is transitive: a chain of detections each within the radius of
/// the next collapses into one cluster even when its endpoints are far
/// apart. Cluster ids are assigned in ascending representative key order,
/// so the output is a pure function of the input set.
pub fn dedupe(detections: &[Detection], radius_m: f64) -> Vec<DedupeCluster> {
    let tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(
        detections
            .iter()
            .enumerate()
            .map(|(i, d)| GeomWithData::new([d.x, d.y], i))
            .collect(),
    );

    let mut sets = DisjointSet::new(detections.len());
    let radius_sq = radius_m * radius_m;
    for (i, d) in detections.iter().enumerate() {
        for neighbor in tree.locate_within_distance([d.x, d.y], radius_sq) {
            sets.union(i, neighbor.data);
        }
    }

    let mut clusters: Vec<DedupeCluster> = Vec::new();
    let mut root_to_cluster: Vec<Option<usize>> = vec![None; detections.len()];
    for i in 0..detections.len() {
        let root = sets.find(i);
        match root_to_cluster[root] {
            Some(c) => clusters[c].members.push(i),
            None => {
                root_to_cluster[root] = Some(clusters.len());
                clusters.push(DedupeCluster {
                    id: 0,
                    members: vec![i],
                    representative: i,
                });
            }
        }
    }

    for cluster in &mut clusters {
        cluster.representative = cluster
            .members
            .iter()
            .copied()
            .min_by_key(|&i| (&detections[i].file, detections[i].id))
            .unwrap_or(cluster.members[0]);
    }
    clusters.sort_by_key(|c| {
        let d = &detections[c.representative];
        (d.file.clone(), d.id)
    });
    for (i, cluster) in clusters.iter_mut().enumerate() {
        cluster.id = i as u32 + 1;
    }

    debug!(
        detections = detections.len(),
        clusters = clusters.len(),
        radius_m,
        "dedupe complete"
    );
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(file: &str, id: u32, x: f64, y: f64) -> Detection {
        Detection {
            file: file.to_string(),
            id,
            row: 0.0,
            col: 0.0,
            x,
            y,
            area_cells: 5,
            area_m2: 0.3125,
            circularity: 0.9,
            solidity: 1.0,
            hag_mean: 0.45,
            hag_max: 0.5,
        }
    }

    #[test]
    fn nearby_pair_merges_distant_pair_does_not() {
        let dets = vec![
            det("a.laz", 1, 0.0, 0.0),
            det("b.laz", 1, 0.3, 0.0),
            det("b.laz", 2, 10.0, 10.0),
        ];
        let clusters = dedupe(&dets, 0.5);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![0, 1]);
        assert_eq!(clusters[0].representative, 0);
        assert_eq!(clusters[1].members, vec![2]);

        let clusters = dedupe(&dets, 0.1);
        assert_eq!(clusters.len(), 3);
    }

    #[test]
    fn merging_is_transitive_along_a_chain() {
        // Each hop is 0.8 m; the endpoints are 2.4 m apart.
        let dets = vec![
            det("a.laz", 1, 0.0, 0.0),
            det("a.laz", 2, 0.8, 0.0),
            det("b.laz", 1, 1.6, 0.0),
            det("b.laz", 2, 2.4, 0.0),
        ];
        let clusters = dedupe(&dets, 1.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 4);
    }

    #[test]
    fn clusters_partition_the_input() {
        let dets = vec![
            det("a.laz", 1, 0.0, 0.0),
            det("a.laz", 2, 5.0, 5.0),
            det("b.laz", 1, 0.2, 0.1),
            det("b.laz", 2, 5.1, 5.0),
            det("c.laz", 1, 20.0, 20.0),
        ];
        let clusters = dedupe(&dets, 1.0);
        let mut seen: Vec<usize> = clusters.iter().flat_map(|c| c.members.clone()).collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn representative_has_smallest_file_id_key() {
        let dets = vec![
            det("z.laz", 1, 0.0, 0.0),
            det("a.laz", 7, 0.1, 0.0),
            det("a.laz", 3, 0.2, 0.0),
        ];
        let clusters = dedupe(&dets, 1.0);
        assert_eq!(clusters.len(), 1);
        let rep = &dets[clusters[0].representative];
        assert_eq!((rep.file.as_str(), rep.id), ("a.laz", 3));
    }

    #[test]
    fn cluster_ids_follow_representative_order() {
        let dets = vec![
            det("b.laz", 1, 50.0, 0.0),
            det("a.laz", 1, 0.0, 0.0),
        ];
        let clusters = dedupe(&dets, 1.0);
        assert_eq!(clusters[0].id, 1);
        assert_eq!(dets[clusters[0].representative].file, "a.laz");
        assert_eq!(clusters[1].id, 2);
        assert_eq!(dets[clusters[1].representative].file, "b.laz");
    }

    #[test]
    fn dedupe_of_representatives_is_a_fixed_point() {
        let dets = vec![
            det("a.laz", 1, 0.0, 0.0),
            det("a.laz", 2, 0.4, 0.0),
            det("b.laz", 1, 10.0, 0.0),
            det("b.laz", 2, 10.2, 0.0),
        ];
        let clusters = dedupe(&dets, 0.5);
        let reps: Vec<Detection> = clusters
            .iter()
            .map(|c| dets[c.representative].clone())
            .collect();
        let again = dedupe(&reps, 0.5);
        assert_eq!(again.len(), reps.len());
        for (i, c) in again.iter().enumerate() {
            assert_eq!(c.members, vec![i]);
        }
    }

    #[test]
    fn empty_input_gives_no_clusters() {
        assert!(dedupe(&[], 1.0).is_empty());
    }
}
