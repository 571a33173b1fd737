//! Geometric feature descriptors for candidate clusters.
//!
//! Each surviving cluster is described by a fixed 34-dimension vector:
//! point count, squared minimum range, the upper triangles of the covariance
//! and inertia tensors of the PCA-projected points, and a 20-value slice
//! profile of the original points. The descriptor order matches the layout
//! the classifier was trained on.

use nalgebra::{Matrix3, SymmetricEigen, Vector3};

use crate::core::cloud::PointCloud;
use crate::processors::clustering::Cluster;

/// Total number of scalar feature dimensions.
pub const FEATURE_SIZE: usize = 34;

/// Number of horizontal slices in the silhouette profile.
pub const SLICE_BINS: usize = 10;

/// Fixed-length geometric descriptor for one cluster.
#[derive(Debug, Clone)]
pub struct Feature {
    /// Cluster centroid, carried for downstream assembly.
    pub centroid: [f32; 3],
    /// Bounding box minimum corner.
    pub min: [f32; 3],
    /// Bounding box maximum corner.
    pub max: [f32; 3],
    /// Number of member points.
    pub number_points: usize,
    /// Minimum squared distance to the sensor (kept squared, never rooted).
    pub min_distance: f64,
    /// Upper triangle of the projected covariance matrix, row-major.
    pub covariance: [f64; 6],
    /// Upper triangle of the inertia tensor of the projected points.
    pub moment: [f64; 6],
    /// Per-slice silhouette extents, two values per bin in bin order.
    pub slice: [f64; 2 * SLICE_BINS],
}

impl Feature {
    /// Flattens the descriptor into the classifier's input layout:
    /// count, min distance, covariance (6), inertia (6), slice (20).
    pub fn to_vector(&self) -> [f64; FEATURE_SIZE] {
        let mut v = [0.0; FEATURE_SIZE];
        v[0] = self.number_points as f64;
        v[1] = self.min_distance;
        v[2..8].copy_from_slice(&self.covariance);
        v[8..14].copy_from_slice(&self.moment);
        v[14..34].copy_from_slice(&self.slice);
        v
    }
}

fn mean_point(points: &[[f64; 3]]) -> Vector3<f64> {
    let mut sum = Vector3::zeros();
    for p in points {
        sum += Vector3::new(p[0], p[1], p[2]);
    }
    sum / points.len() as f64
}

/// Covariance matrix about `mean`, normalized by the point count.
fn covariance_matrix(points: &[[f64; 3]], mean: &Vector3<f64>) -> Matrix3<f64> {
    let mut cov = Matrix3::zeros();
    for p in points {
        let d = Vector3::new(p[0], p[1], p[2]) - mean;
        cov += d * d.transpose();
    }
    cov / points.len() as f64
}

/// Row-major upper triangle of a symmetric 3x3 matrix:
/// (0,0), (0,1), (0,2), (1,1), (1,2), (2,2).
fn upper_triangle(m: &Matrix3<f64>) -> [f64; 6] {
    [
        m[(0, 0)],
        m[(0, 1)],
        m[(0, 2)],
        m[(1, 1)],
        m[(1, 2)],
        m[(2, 2)],
    ]
}

/// Re-expresses the points in their own principal-component basis.
///
/// Eigenvectors are ordered by decreasing eigenvalue, so the first projected
/// axis carries the largest variance. Points are demeaned before rotation.
fn pca_project(points: &[[f64; 3]]) -> Vec<[f64; 3]> {
    if points.is_empty() {
        return Vec::new();
    }

    let mean = mean_point(points);
    let cov = covariance_matrix(points, &mean);
    let eig = SymmetricEigen::new(cov);

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        eig.eigenvalues[b]
            .partial_cmp(&eig.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let basis = Matrix3::from_columns(&[
        eig.eigenvectors.column(order[0]).into_owned(),
        eig.eigenvectors.column(order[1]).into_owned(),
        eig.eigenvectors.column(order[2]).into_owned(),
    ]);
    let rotation = basis.transpose();

    points
        .iter()
        .map(|p| {
            let q = rotation * (Vector3::new(p[0], p[1], p[2]) - mean);
            [q.x, q.y, q.z]
        })
        .collect()
}

/// Rigid-body inertia tensor of the projected points.
///
/// Literal sums over the points, not divided by the point count; the
/// classifier was trained on this unnormalized form.
fn inertia_tensor(points: &[[f64; 3]]) -> [f64; 6] {
    let mut ixx = 0.0;
    let mut ixy = 0.0;
    let mut ixz = 0.0;
    let mut iyy = 0.0;
    let mut iyz = 0.0;
    let mut izz = 0.0;
    for p in points {
        let [x, y, z] = *p;
        ixx += y * y + z * z;
        ixy -= x * y;
        ixz -= x * z;
        iyy += x * x + z * z;
        iyz -= y * z;
        izz += x * x + y * y;
    }
    [ixx, ixy, ixz, iyy, iyz, izz]
}

/// Slice descriptor: per-height-bin silhouette extents.
///
/// The z-range is split into [`SLICE_BINS`] equal bins; each bin with more
/// than 2 points gets a fresh PCA projection and contributes its extents
/// along the first two principal axes. Sparser bins contribute (0, 0), and a
/// degenerate (flat) z-range yields an all-zero descriptor.
fn slice_descriptor(points: &[[f64; 3]], z_min: f64, z_max: f64) -> [f64; 2 * SLICE_BINS] {
    let mut slice = [0.0; 2 * SLICE_BINS];

    let itv = (z_max - z_min) / SLICE_BINS as f64;
    if itv <= 0.0 {
        return slice;
    }

    let mut bins: Vec<Vec<[f64; 3]>> = vec![Vec::new(); SLICE_BINS];
    for p in points {
        let bin = (((p[2] - z_min) / itv) as usize).min(SLICE_BINS - 1);
        bins[bin].push(*p);
    }

    for (i, bin) in bins.iter().enumerate() {
        if bin.len() > 2 {
            let projected = pca_project(bin);
            let mut min = [f64::MAX; 2];
            let mut max = [f64::MIN; 2];
            for p in &projected {
                for axis in 0..2 {
                    min[axis] = min[axis].min(p[axis]);
                    max[axis] = max[axis].max(p[axis]);
                }
            }
            slice[i * 2] = max[0] - min[0];
            slice[i * 2 + 1] = max[1] - min[1];
        }
    }

    slice
}

fn min_squared_range(points: &PointCloud) -> f64 {
    let mut min = f64::MAX;
    for i in 0..points.len() {
        min = min.min(points.squared_range(i) as f64);
    }
    min
}

/// Computes the full geometric descriptor for one cluster.
pub fn extract_feature(cluster: &Cluster) -> Feature {
    let coords: Vec<[f64; 3]> = (0..cluster.points.len())
        .map(|i| {
            let p = cluster.points.point(i);
            [p[0] as f64, p[1] as f64, p[2] as f64]
        })
        .collect();

    let projected = pca_project(&coords);
    let projected_mean = mean_point(&projected);
    let covariance = upper_triangle(&covariance_matrix(&projected, &projected_mean));
    let moment = inertia_tensor(&projected);
    let slice = slice_descriptor(&coords, cluster.min[2] as f64, cluster.max[2] as f64);

    Feature {
        centroid: cluster.centroid,
        min: cluster.min,
        max: cluster.max,
        number_points: cluster.points.len(),
        min_distance: min_squared_range(&cluster.points),
        covariance,
        moment,
        slice,
    }
}
