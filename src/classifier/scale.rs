//! libsvm-style min-max feature rescaling.
//!
//! The scale table is learned offline alongside the classifier and loaded
//! once at startup; it is never mutated at runtime. The rescaling must
//! reproduce libsvm's exact boundary snapping, not just linear
//! interpolation, to match the training-time convention.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::processors::features::FEATURE_SIZE;

/// Errors that can occur while loading a range file.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed range file: {0}")]
    Malformed(String),

    #[error("feature index {0} out of range (expected 1..={FEATURE_SIZE})")]
    IndexOutOfRange(usize),
}

/// Result type for scale operations.
pub type Result<T> = std::result::Result<T, ScaleError>;

/// Per-dimension (lower, upper) bounds plus the global target interval.
///
/// Dimensions without a stored range (lower == upper) are left unscaled.
#[derive(Debug, Clone)]
pub struct ScaleRange {
    lower: [f64; FEATURE_SIZE],
    upper: [f64; FEATURE_SIZE],
    target_lower: f64,
    target_upper: f64,
}

impl ScaleRange {
    /// Creates a table with the given target bounds and no per-dimension
    /// ranges, i.e. a no-op scaling.
    pub fn new(target_lower: f64, target_upper: f64) -> Self {
        Self {
            lower: [0.0; FEATURE_SIZE],
            upper: [0.0; FEATURE_SIZE],
            target_lower,
            target_upper,
        }
    }

    /// Sets the stored (lower, upper) range for a zero-based dimension.
    pub fn set_range(&mut self, dimension: usize, lower: f64, upper: f64) -> Result<()> {
        if dimension >= FEATURE_SIZE {
            return Err(ScaleError::IndexOutOfRange(dimension + 1));
        }
        self.lower[dimension] = lower;
        self.upper[dimension] = upper;
        Ok(())
    }

    /// Loads a libsvm range file.
    ///
    /// Layout: a header line, a `lower upper` line with the global target
    /// bounds, then zero or more `index min max` lines with 1-based feature
    /// indices. Indices not listed keep a no-op scaling.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines().filter(|l| match l {
            Ok(line) => !line.trim().is_empty(),
            Err(_) => true,
        });

        // Header line ("x" for attribute scaling).
        lines
            .next()
            .transpose()?
            .ok_or_else(|| ScaleError::Malformed("empty range file".into()))?;

        let bounds = lines
            .next()
            .transpose()?
            .ok_or_else(|| ScaleError::Malformed("missing target bounds line".into()))?;
        let fields: Vec<&str> = bounds.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(ScaleError::Malformed(format!(
                "expected 'lower upper', got '{}'",
                bounds
            )));
        }
        let target_lower: f64 = fields[0]
            .parse()
            .map_err(|_| ScaleError::Malformed(format!("bad target lower '{}'", fields[0])))?;
        let target_upper: f64 = fields[1]
            .parse()
            .map_err(|_| ScaleError::Malformed(format!("bad target upper '{}'", fields[1])))?;

        let mut range = Self::new(target_lower, target_upper);

        for line in lines {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 3 {
                return Err(ScaleError::Malformed(format!(
                    "expected 'index min max', got '{}'",
                    line
                )));
            }
            let index: usize = fields[0]
                .parse()
                .map_err(|_| ScaleError::Malformed(format!("bad index '{}'", fields[0])))?;
            let lower: f64 = fields[1]
                .parse()
                .map_err(|_| ScaleError::Malformed(format!("bad min '{}'", fields[1])))?;
            let upper: f64 = fields[2]
                .parse()
                .map_err(|_| ScaleError::Malformed(format!("bad max '{}'", fields[2])))?;

            if index == 0 || index > FEATURE_SIZE {
                return Err(ScaleError::IndexOutOfRange(index));
            }
            range.set_range(index - 1, lower, upper)?;
        }

        Ok(range)
    }

    /// Rescales a feature vector in place.
    ///
    /// Per dimension: a degenerate stored range is skipped (constant
    /// attribute, avoids divide-by-zero); a value exactly on a stored bound
    /// snaps to the matching target bound; anything else interpolates
    /// linearly.
    pub fn apply(&self, values: &mut [f64; FEATURE_SIZE]) {
        for i in 0..FEATURE_SIZE {
            let (lower, upper) = (self.lower[i], self.upper[i]);
            if (lower - upper).abs() < f64::EPSILON {
                continue;
            }
            if (values[i] - lower).abs() < f64::EPSILON {
                values[i] = self.target_lower;
            } else if (values[i] - upper).abs() < f64::EPSILON {
                values[i] = self.target_upper;
            } else {
                values[i] = self.target_lower
                    + (self.target_upper - self.target_lower) * (values[i] - lower)
                        / (upper - lower);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_boundary_values_snap_to_targets() {
        let mut range = ScaleRange::new(-1.0, 1.0);
        range.set_range(0, 5.0, 500.0).unwrap();

        let mut values = [0.0; FEATURE_SIZE];
        values[0] = 5.0;
        range.apply(&mut values);
        assert_eq!(values[0], -1.0);

        values[0] = 500.0;
        range.apply(&mut values);
        assert_eq!(values[0], 1.0);
    }

    #[test]
    fn test_interior_values_interpolate() {
        let mut range = ScaleRange::new(-1.0, 1.0);
        range.set_range(2, 0.0, 10.0).unwrap();

        let mut values = [0.0; FEATURE_SIZE];
        values[2] = 2.5;
        range.apply(&mut values);
        assert!((values[2] - (-0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_range_is_skipped() {
        let mut range = ScaleRange::new(-1.0, 1.0);
        range.set_range(1, 3.0, 3.0).unwrap();

        let mut values = [0.0; FEATURE_SIZE];
        values[1] = 3.0;
        range.apply(&mut values);
        assert_eq!(values[1], 3.0);
    }

    #[test]
    fn test_unlisted_dimensions_pass_through() {
        let range = ScaleRange::new(-1.0, 1.0);

        let mut values = [0.0; FEATURE_SIZE];
        values[7] = 42.0;
        range.apply(&mut values);
        assert_eq!(values[7], 42.0);
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pedestrian.range");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "x").unwrap();
        writeln!(file, "-1 1").unwrap();
        writeln!(file, "1 5 500").unwrap();
        writeln!(file, "3 0.01 2.5").unwrap();
        drop(file);

        let range = ScaleRange::from_file(&path).unwrap();

        let mut values = [0.0; FEATURE_SIZE];
        values[0] = 5.0; // lower bound of dimension 1
        values[2] = 2.5; // upper bound of dimension 3
        values[1] = 9.0; // unlisted, untouched
        range.apply(&mut values);

        assert_eq!(values[0], -1.0);
        assert_eq!(values[2], 1.0);
        assert_eq!(values[1], 9.0);
    }

    #[test]
    fn test_from_file_rejects_bad_index() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.range");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "x").unwrap();
        writeln!(file, "-1 1").unwrap();
        writeln!(file, "35 0 1").unwrap();
        drop(file);

        assert!(matches!(
            ScaleRange::from_file(&path),
            Err(ScaleError::IndexOutOfRange(35))
        ));
    }

    #[test]
    fn test_from_file_rejects_truncated_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("short.range");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "x").unwrap();
        drop(file);

        assert!(matches!(
            ScaleRange::from_file(&path),
            Err(ScaleError::Malformed(_))
        ));
    }
}
