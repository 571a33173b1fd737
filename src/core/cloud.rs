//! Core point cloud container shared by every pipeline stage.

/// Container for 3D point cloud data.
///
/// Coordinates are stored as parallel vectors, which keeps per-axis scans
/// (z-band filtering, range computation) cache-friendly.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    /// X coordinates of all points.
    pub x: Vec<f32>,
    /// Y coordinates of all points.
    pub y: Vec<f32>,
    /// Z coordinates of all points.
    pub z: Vec<f32>,
}

impl PointCloud {
    /// Creates a new empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
        }
    }

    /// Creates a point cloud from coordinate vectors.
    ///
    /// The three vectors must have equal lengths.
    pub fn from_xyz(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Self {
        debug_assert!(x.len() == y.len() && y.len() == z.len());
        Self { x, y, z }
    }

    /// Creates a point cloud from an array-of-points slice.
    pub fn from_coords(coords: &[[f32; 3]]) -> Self {
        let mut cloud = Self::with_capacity(coords.len());
        for p in coords {
            cloud.push(p[0], p[1], p[2]);
        }
        cloud
    }

    /// Returns the number of points in the cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if the cloud has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Appends a point to the cloud.
    #[inline]
    pub fn push(&mut self, x: f32, y: f32, z: f32) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
    }

    /// Returns the point at index `i` as an `[x, y, z]` array.
    #[inline]
    pub fn point(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    /// Squared Euclidean distance of point `i` from the sensor origin.
    #[inline]
    pub fn squared_range(&self, i: usize) -> f32 {
        self.x[i] * self.x[i] + self.y[i] * self.y[i] + self.z[i] * self.z[i]
    }

    /// Extracts coordinates as a contiguous array-of-points, the layout the
    /// KD-tree and the feature math consume.
    pub fn to_coords(&self) -> Vec<[f32; 3]> {
        (0..self.len()).map(|i| self.point(i)).collect()
    }

    /// Builds a new cloud holding only the points at `indices`.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut cloud = Self::with_capacity(indices.len());
        for &i in indices {
            cloud.push(self.x[i], self.y[i], self.z[i]);
        }
        cloud
    }

    /// Axis-aligned bounding box over all points, or `None` for an empty cloud.
    pub fn min_max(&self) -> Option<([f32; 3], [f32; 3])> {
        if self.is_empty() {
            return None;
        }
        let mut min = self.point(0);
        let mut max = min;
        for i in 1..self.len() {
            let p = self.point(i);
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some((min, max))
    }

    /// Centroid of all points, or `None` for an empty cloud.
    pub fn centroid(&self) -> Option<[f32; 3]> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f64;
        let sx: f64 = self.x.iter().map(|&v| v as f64).sum();
        let sy: f64 = self.y.iter().map(|&v| v as f64).sum();
        let sz: f64 = self.z.iter().map(|&v| v as f64).sum();
        Some([(sx / n) as f32, (sy / n) as f32, (sz / n) as f32])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_point() {
        let mut cloud = PointCloud::new();
        cloud.push(1.0, 2.0, 3.0);
        cloud.push(4.0, 5.0, 6.0);

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.point(1), [4.0, 5.0, 6.0]);
        assert_eq!(cloud.squared_range(0), 14.0);
    }

    #[test]
    fn test_select() {
        let cloud = PointCloud::from_xyz(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 10.0, 20.0, 30.0],
            vec![0.0, 100.0, 200.0, 300.0],
        );

        let picked = cloud.select(&[1, 3]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.point(0), [1.0, 10.0, 100.0]);
        assert_eq!(picked.point(1), [3.0, 30.0, 300.0]);
    }

    #[test]
    fn test_min_max_and_centroid() {
        let cloud = PointCloud::from_coords(&[[1.0, -1.0, 0.0], [3.0, 1.0, 2.0]]);

        let (min, max) = cloud.min_max().unwrap();
        assert_eq!(min, [1.0, -1.0, 0.0]);
        assert_eq!(max, [3.0, 1.0, 2.0]);
        assert_eq!(cloud.centroid().unwrap(), [2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_cloud() {
        let cloud = PointCloud::new();
        assert!(cloud.is_empty());
        assert!(cloud.min_max().is_none());
        assert!(cloud.centroid().is_none());
    }
}
