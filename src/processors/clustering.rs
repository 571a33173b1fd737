//! Euclidean cluster extraction over the nested range regions.
//!
//! The clustering capability itself sits behind the [`ClusterExtractor`]
//! trait so an out-of-process engine (e.g. a GPU implementation) can be
//! swapped in. The in-process default uses:
//! - `kiddo` KD-tree for O(log n) fixed-radius neighbor queries
//! - `rayon` for parallel neighbor finding
//! - Atomic union-find for lock-free connected-component merging

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use log::{debug, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::DetectorConfig;
use crate::core::cloud::PointCloud;

/// Base merge tolerance per region band, in meters.
const TOLERANCE_STEP_M: f32 = 0.1;

/// Human bounding-box envelope in meters: (min, max) per axis.
const HUMAN_SIZE_X: (f32, f32) = (0.2, 1.0);
const HUMAN_SIZE_Y: (f32, f32) = (0.2, 1.0);
const HUMAN_SIZE_Z: (f32, f32) = (0.5, 2.0);

/// Errors that can occur during cluster extraction.
#[derive(Debug, Error)]
pub enum ClusteringError {
    #[error("non-positive cluster tolerance: {0:?}")]
    InvalidTolerance([f32; 3]),

    #[error("invalid cluster size bounds: min {min} > max {max}")]
    InvalidSizeBounds { min: usize, max: usize },
}

/// Result type for cluster extraction.
pub type Result<T> = std::result::Result<T, ClusteringError>;

/// Contract for the external clustering capability.
///
/// Implementations return index-groups over the input slice: each group is a
/// disjoint, non-empty subset of input indices with size within
/// `[min_size, max_size]`. Group ordering is engine-defined; callers must not
/// assume spatial adjacency of consecutive groups.
pub trait ClusterExtractor: Send + Sync {
    fn extract(
        &self,
        points: &[[f32; 3]],
        min_size: usize,
        max_size: usize,
        tolerance: [f32; 3],
    ) -> Result<Vec<Vec<usize>>>;
}

/// Atomic union-find for lock-free parallel component merging.
///
/// Path compression uses compare-and-swap; a failed swap is harmless because
/// the structure only needs eventual convergence to the correct root.
struct AtomicUnionFind {
    parent: Vec<AtomicUsize>,
}

impl AtomicUnionFind {
    fn new(size: usize) -> Self {
        let parent = (0..size).map(AtomicUsize::new).collect();
        Self { parent }
    }

    fn find(&self, mut x: usize) -> usize {
        loop {
            let p = self.parent[x].load(Ordering::Relaxed);
            if p == x {
                return x;
            }
            let gp = self.parent[p].load(Ordering::Relaxed);
            if gp != p {
                let _ =
                    self.parent[x].compare_exchange_weak(p, gp, Ordering::Relaxed, Ordering::Relaxed);
            }
            x = p;
        }
    }

    fn union(&self, x: usize, y: usize) -> bool {
        loop {
            let root_x = self.find(x);
            let root_y = self.find(y);

            if root_x == root_y {
                return false;
            }

            let (small, large) = if root_x < root_y {
                (root_x, root_y)
            } else {
                (root_y, root_x)
            };

            match self.parent[small].compare_exchange_weak(
                small,
                large,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(_) => continue,
            }
        }
    }
}

/// In-process Euclidean clustering: single-linkage connected components under
/// a per-axis distance tolerance.
#[derive(Debug, Default, Clone, Copy)]
pub struct EuclideanClusterer;

impl ClusterExtractor for EuclideanClusterer {
    fn extract(
        &self,
        points: &[[f32; 3]],
        min_size: usize,
        max_size: usize,
        tolerance: [f32; 3],
    ) -> Result<Vec<Vec<usize>>> {
        let n = points.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        if tolerance.iter().any(|&t| t <= 0.0) {
            return Err(ClusteringError::InvalidTolerance(tolerance));
        }
        if min_size > max_size {
            return Err(ClusteringError::InvalidSizeBounds {
                min: min_size,
                max: max_size,
            });
        }

        // Scale each axis by its tolerance so the neighborhood ellipsoid
        // becomes the unit sphere.
        let scaled: Vec<[f32; 3]> = points
            .iter()
            .map(|p| [p[0] / tolerance[0], p[1] / tolerance[1], p[2] / tolerance[2]])
            .collect();

        let tree: ImmutableKdTree<f32, 3> = ImmutableKdTree::new_from_slice(&scaled);

        let neighbors: Vec<Vec<usize>> = scaled
            .par_iter()
            .map(|coord| {
                tree.within::<SquaredEuclidean>(coord, 1.0)
                    .iter()
                    .map(|nn| nn.item as usize)
                    .collect()
            })
            .collect();

        let uf = AtomicUnionFind::new(n);
        (0..n).into_par_iter().for_each(|i| {
            for &j in &neighbors[i] {
                if j != i {
                    uf.union(i, j);
                }
            }
        });

        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..n {
            components.entry(uf.find(i)).or_default().push(i);
        }

        // Members were pushed in index order, so sorting groups by their first
        // member gives a deterministic engine order.
        let mut groups: Vec<Vec<usize>> = components
            .into_values()
            .filter(|g| g.len() >= min_size && g.len() <= max_size)
            .collect();
        groups.sort_by_key(|g| g[0]);

        Ok(groups)
    }
}

/// A candidate object cluster within one frame.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Member points.
    pub points: PointCloud,
    /// Frame-level indices of the member points.
    pub indices: Vec<usize>,
    /// Region band the cluster was extracted from.
    pub region: usize,
    /// Axis-aligned bounding box minimum corner.
    pub min: [f32; 3],
    /// Axis-aligned bounding box maximum corner.
    pub max: [f32; 3],
    /// Centroid of the member points.
    pub centroid: [f32; 3],
}

impl Cluster {
    /// Builds a cluster from its member points, deriving bounding box and
    /// centroid. Returns `None` for an empty point set.
    pub fn from_points(points: PointCloud, indices: Vec<usize>, region: usize) -> Option<Self> {
        let (min, max) = points.min_max()?;
        let centroid = points.centroid()?;
        Some(Self {
            points,
            indices,
            region,
            min,
            max,
            centroid,
        })
    }

    /// Bounding box extent along each axis.
    pub fn extents(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// Adaptive merge tolerance for a region band, compensating the sparser
/// returns at longer range.
pub fn region_tolerance(band: usize) -> f32 {
    TOLERANCE_STEP_M * (band as f32 + 1.0)
}

/// Whether a bounding box fits the human-size envelope.
pub fn within_human_size(min: &[f32; 3], max: &[f32; 3]) -> bool {
    let limits = [HUMAN_SIZE_X, HUMAN_SIZE_Y, HUMAN_SIZE_Z];
    for axis in 0..3 {
        let extent = max[axis] - min[axis];
        if extent < limits[axis].0 || extent > limits[axis].1 {
            return false;
        }
    }
    true
}

/// Extract clusters from every non-empty region of a partitioned frame.
///
/// Per region with more than `cluster_size_min` points, the external
/// clustering capability is invoked with the region's adaptive tolerance.
/// Returned groups are mapped back to frame indices, annotated with bounding
/// box and centroid, and optionally gated by the human-size envelope.
///
/// A failed extraction is contained to its region: it is logged and the
/// remaining regions still run.
pub fn cluster_regions(
    cloud: &PointCloud,
    regions: &[Vec<usize>],
    extractor: &dyn ClusterExtractor,
    config: &DetectorConfig,
) -> Vec<Cluster> {
    let mut clusters = Vec::new();

    for (band, region) in regions.iter().enumerate() {
        if region.len() <= config.cluster_size_min {
            continue;
        }

        let region_cloud = cloud.select(region);
        let coords = region_cloud.to_coords();
        let tolerance = region_tolerance(band);

        let groups = match extractor.extract(
            &coords,
            config.cluster_size_min,
            config.cluster_size_max,
            [tolerance; 3],
        ) {
            Ok(groups) => groups,
            Err(e) => {
                warn!("cluster extraction failed for region {}: {}", band, e);
                continue;
            }
        };

        debug!(
            "region {}: {} points, tolerance {:.1} m, {} raw clusters",
            band,
            region.len(),
            tolerance,
            groups.len()
        );

        for group in groups {
            let frame_indices: Vec<usize> = group.iter().map(|&i| region[i]).collect();
            let points = region_cloud.select(&group);

            let Some(cluster) = Cluster::from_points(points, frame_indices, band) else {
                continue;
            };

            if config.human_size_limit && !within_human_size(&cluster.min, &cluster.max) {
                continue;
            }

            clusters.push(cluster);
        }
    }

    clusters
}
