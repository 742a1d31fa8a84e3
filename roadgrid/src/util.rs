use std::path::Path;

use image::RgbImage;

use crate::error::{Error, Result};
use crate::find::SearchReport;
use crate::grid::{Cell, GridMap, Point};
use crate::session::Markers;

/// Decode an image file of any supported format into 8-bit RGB
pub fn load_image(path: impl AsRef<Path>) -> Result<RgbImage> {
    let img = image::open(path)?;
    Ok(img.to_rgb8())
}

/// Parse a grid coordinate written as `row,col`
pub fn parse_point(s: &str) -> Result<Point> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| Error::InvalidPoint(s.to_string()))?;

    match (row.trim().parse(), col.trim().parse()) {
        (Ok(row), Ok(col)) => Ok(Point { row, col }),
        _ => Err(Error::InvalidPoint(s.to_string())),
    }
}

/// Text picture of a grid with the markers, the path and the expanded cells drawn on top.
///
/// `S` and `E` are the markers, `*` the path, `.` cells that were expanded without ending up
/// on the path, `X` blocked cells.
pub fn render_route(map: &GridMap, route: Option<&SearchReport<Point>>, markers: Markers) -> String {
    let mut canvas: Vec<Vec<char>> = map
        .cells
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Cell::Invalid => 'X',
                    Cell::Valid => ' ',
                })
                .collect()
        })
        .collect();

    let mut paint = |p: Point, c: char| {
        if map.is_valid(p) {
            canvas[p.row][p.col] = c;
        }
    };

    if let Some(route) = route {
        for p in &route.visited {
            paint(*p, '.');
        }
        for p in route.path() {
            paint(*p, '*');
        }
    }
    if let Some(p) = markers.start {
        paint(p, 'S');
    }
    if let Some(p) = markers.end {
        paint(p, 'E');
    }

    canvas
        .into_iter()
        .map(|row| row.into_iter().collect::<String>() + "\n")
        .collect()
}
