//! Range-adaptive spatial partitioning.
//!
//! The frame is divided into nested circular regions centered on the sensor.
//! Point density falls off with range, so downstream clustering widens its
//! merge tolerance per region; the band widths below are tuned to that
//! falloff.

use crate::core::cloud::PointCloud;

/// Number of nested circular regions.
pub const NESTED_REGIONS: usize = 14;

/// Width of each region band in meters, consumed as cumulative thresholds.
const REGION_WIDTHS_M: [f32; NESTED_REGIONS] =
    [2.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 2.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0];

/// Keep only points inside the configured vertical band.
///
/// Removes ground and ceiling returns before any region assignment.
pub fn filter_z_band(cloud: &PointCloud, z_limit_min: f32, z_limit_max: f32) -> PointCloud {
    let mut filtered = PointCloud::with_capacity(cloud.len());
    for i in 0..cloud.len() {
        let z = cloud.z[i];
        if z >= z_limit_min && z <= z_limit_max {
            filtered.push(cloud.x[i], cloud.y[i], z);
        }
    }
    filtered
}

/// Assign every point to its nested region band.
///
/// For each point the bands are walked in order, accumulating a running range
/// threshold; the point lands in the first band whose squared-range interval
/// contains its squared range, and is never reconsidered. Points beyond the
/// outermost threshold are silently dropped.
///
/// # Returns
///
/// One vector of point indices per region. Indices are disjoint across
/// regions and every retained point appears exactly once.
pub fn partition_regions(cloud: &PointCloud) -> Vec<Vec<usize>> {
    let mut regions: Vec<Vec<usize>> = vec![Vec::new(); NESTED_REGIONS];

    for i in 0..cloud.len() {
        let d2 = cloud.squared_range(i);
        let mut range = 0.0f32;
        for (band, &width) in REGION_WIDTHS_M.iter().enumerate() {
            let outer = range + width;
            if d2 > range * range && d2 <= outer * outer {
                regions[band].push(i);
                break;
            }
            range = outer;
        }
    }

    regions
}
