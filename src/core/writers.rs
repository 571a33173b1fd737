//! Detection record writer.
//!
//! Detections are handed downstream as CSV: one row per accepted cluster with
//! centroid, bounding box and optional classifier probability.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use thiserror::Error;

use crate::pipeline::Detection;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Write detections to a CSV file.
///
/// Columns: centroid, bounding box min/max (one column per axis) and the
/// classifier probability, which is empty in model-free mode.
pub fn write_detections_csv(path: &Path, detections: &[Detection]) -> Result<()> {
    ensure_parent_dirs(path)?;

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    let csv_err = |e| WriteError::Csv {
        path: path.display().to_string(),
        source: e,
    };

    writer
        .write_record([
            "centroid_x",
            "centroid_y",
            "centroid_z",
            "min_x",
            "min_y",
            "min_z",
            "max_x",
            "max_y",
            "max_z",
            "probability",
        ])
        .map_err(csv_err)?;

    for d in detections {
        let probability = d.probability.map(|p| p.to_string()).unwrap_or_default();
        writer
            .write_record([
                d.centroid[0].to_string(),
                d.centroid[1].to_string(),
                d.centroid[2].to_string(),
                d.min[0].to_string(),
                d.min[1].to_string(),
                d.min[2].to_string(),
                d.max[0].to_string(),
                d.max[1].to_string(),
                d.max[2].to_string(),
                probability,
            ])
            .map_err(csv_err)?;
    }

    writer.flush().map_err(|e| WriteError::Csv {
        path: path.display().to_string(),
        source: csv::Error::from(e),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_detection(probability: Option<f64>) -> Detection {
        Detection {
            centroid: [1.0, 2.0, 3.0],
            min: [0.5, 1.5, 2.5],
            max: [1.5, 2.5, 3.5],
            probability,
        }
    }

    #[test]
    fn test_write_detections_csv() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("detections.csv");

        let detections = vec![sample_detection(Some(0.9)), sample_detection(None)];
        write_detections_csv(&path, &detections).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("centroid_x"));
        assert!(lines[1].ends_with("0.9"));
        assert!(lines[2].ends_with(","));
    }

    #[test]
    fn test_write_empty_detections() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.csv");

        write_detections_csv(&path, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
