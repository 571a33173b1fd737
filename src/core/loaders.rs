//! Frame loaders for ASCII PLY and Cartesian CSV point cloud files.
//!
//! The pipeline itself is transport-agnostic; these loaders exist so the CLI
//! and tests can feed recorded frames through it.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

use crate::core::cloud::PointCloud;

/// Errors that can occur during frame loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid PLY file: {0}")]
    InvalidPly(String),

    #[error("unsupported frame format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Load a point cloud frame, dispatching on the file extension.
///
/// `.ply` files are parsed as ASCII PLY; `.csv` files as Cartesian x,y,z rows.
pub fn load_frame(path: &Path) -> Result<PointCloud> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "ply" => load_ply(path),
        "csv" => load_xyz_csv(path),
        _ => Err(LoaderError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Load an ASCII PLY point cloud file.
///
/// Only the `x`, `y` and `z` vertex properties are read; any other properties
/// (colors, normals) are skipped.
///
/// # Errors
///
/// Returns `InvalidPly` if the header is malformed or any of the coordinate
/// properties is missing.
pub fn load_ply(path: &Path) -> Result<PointCloud> {
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(64 * 1024, file);
    let mut lines = reader.lines();

    match lines.next() {
        Some(Ok(magic)) if magic.trim() == "ply" => {}
        _ => return Err(LoaderError::InvalidPly("missing 'ply' magic line".into())),
    }

    let mut vertex_count: usize = 0;
    let mut properties: Vec<String> = Vec::new();
    let mut in_vertex_element = false;

    for line in lines.by_ref() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();

        match fields.as_slice() {
            ["end_header"] => break,
            ["format", kind, ..] => {
                if *kind != "ascii" {
                    return Err(LoaderError::InvalidPly(format!(
                        "unsupported PLY format '{}'",
                        kind
                    )));
                }
            }
            ["element", "vertex", count] => {
                vertex_count = count
                    .parse()
                    .map_err(|_| LoaderError::InvalidPly(format!("bad vertex count '{}'", count)))?;
                in_vertex_element = true;
            }
            ["element", ..] => in_vertex_element = false,
            ["property", _, name] if in_vertex_element => properties.push((*name).to_string()),
            _ => {}
        }
    }

    let coord_columns: Vec<usize> = ["x", "y", "z"]
        .iter()
        .map(|axis| {
            properties
                .iter()
                .position(|p| p == axis)
                .ok_or_else(|| LoaderError::InvalidPly(format!("missing '{}' property", axis)))
        })
        .collect::<Result<_>>()?;

    let mut cloud = PointCloud::with_capacity(vertex_count);

    for line in lines.take(vertex_count) {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < properties.len() {
            return Err(LoaderError::InvalidPly(format!(
                "vertex row has {} fields, expected {}",
                fields.len(),
                properties.len()
            )));
        }

        let mut coords = [0.0f32; 3];
        for (axis, &col) in coord_columns.iter().enumerate() {
            coords[axis] = fields[col]
                .parse()
                .map_err(|_| LoaderError::InvalidPly(format!("bad coordinate '{}'", fields[col])))?;
        }
        cloud.push(coords[0], coords[1], coords[2]);
    }

    Ok(cloud)
}

/// Load a Cartesian CSV point cloud file.
///
/// Columns named `x`, `y`, `z` (case-insensitive) are used when present;
/// otherwise the first three columns. A fully numeric first row is treated as
/// data rather than a header, and malformed rows are skipped.
pub fn load_xyz_csv(path: &Path) -> Result<PointCloud> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::with_capacity(64 * 1024, file));

    let headers = reader.headers()?.clone();
    let col_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_lowercase(), i))
        .collect();

    let x_idx = col_map.get("x").copied().unwrap_or(0);
    let y_idx = col_map.get("y").copied().unwrap_or(1);
    let z_idx = col_map.get("z").copied().unwrap_or(2);

    let mut cloud = PointCloud::new();

    // Headerless files put coordinates in the first row.
    if let Some([x, y, z]) = parse_coord_record(&headers, x_idx, y_idx, z_idx) {
        cloud.push(x, y, z);
    }

    for record in reader.records() {
        let record = record?;
        if let Some([x, y, z]) = parse_coord_record(&record, x_idx, y_idx, z_idx) {
            cloud.push(x, y, z);
        }
    }

    Ok(cloud)
}

fn parse_coord_record(
    record: &csv::StringRecord,
    x_idx: usize,
    y_idx: usize,
    z_idx: usize,
) -> Option<[f32; 3]> {
    let field = |i: usize| record.get(i).and_then(|s| s.trim().parse::<f32>().ok());
    Some([field(x_idx)?, field(y_idx)?, field(z_idx)?])
}
