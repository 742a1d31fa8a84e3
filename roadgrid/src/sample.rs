//! Per-cell features read from the source image.
//!
//! Every grid cell is represented by the single pixel at its centre. For that pixel two
//! values are extracted: the perceptual luma and the response of a 3x3 high-pass filter
//! run over the luma image.

use image::{imageops, GrayImage, Luma, Rgb, RgbImage};

/// Laplacian kernel used to find edges in the luma image
const EDGE_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0];

/// Perceptual brightness of a pixel in the range `0.0..=255.0`.
pub fn luma(pixel: Rgb<u8>) -> f32 {
    let [r, g, b] = pixel.0;
    0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32
}

/// Edge intensity of every pixel of `img`.
///
/// Negative filter responses clamp to 0 and the outermost ring of pixels is always 0.
pub fn edge_image(img: &RgbImage) -> GrayImage {
    let gray = GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([luma(*img.get_pixel(x, y)).round() as u8])
    });

    // filter3x3 cannot deal with an empty image
    if gray.width() == 0 || gray.height() == 0 {
        return gray;
    }

    imageops::filter3x3(&gray, &EDGE_KERNEL)
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellSample {
    /// Luma at the cell centre
    pub brightness: f32,
    /// High-pass response at the cell centre
    pub edge: u8,
    /// The pixel that was sampled, as (x, y)
    pub pixel: (u32, u32),
}

/// The samples of all cells, stored row by row.
#[derive(Clone, Debug)]
pub struct SampleGrid {
    pub cell_size: u32,
    pub rows: usize,
    pub columns: usize,
    samples: Vec<Option<CellSample>>,
}

impl SampleGrid {
    /// The sample of a cell, `None` if the cell lies outside the image.
    pub fn get(&self, row: usize, col: usize) -> Option<CellSample> {
        if row >= self.rows || col >= self.columns {
            return None;
        }
        self.samples[row * self.columns + col]
    }
}

/// Pixel sampled for a cell: the centre of the cell.
/// Returns `None` when the centre falls outside the image.
fn cell_center_pixel(
    row: usize,
    col: usize,
    cell_size: u32,
    width: u32,
    height: u32,
) -> Option<(u32, u32)> {
    let x = ((col as f64 + 0.5) * cell_size as f64).floor() as u64;
    let y = ((row as f64 + 0.5) * cell_size as f64).floor() as u64;

    if x >= width as u64 || y >= height as u64 {
        return None;
    }

    Some((x as u32, y as u32))
}

/// Sample brightness and edge intensity for every cell of a grid with the given cell size.
///
/// The grid has `floor(height / cell_size)` rows and `floor(width / cell_size)` columns.
/// A cell size of 0 gives an empty grid.
pub fn sample_cells(img: &RgbImage, cell_size: u32) -> SampleGrid {
    let (width, height) = img.dimensions();

    if cell_size == 0 {
        return SampleGrid {
            cell_size,
            rows: 0,
            columns: 0,
            samples: Vec::new(),
        };
    }

    let rows = (height / cell_size) as usize;
    let columns = (width / cell_size) as usize;
    let edges = edge_image(img);

    let mut samples = Vec::with_capacity(rows * columns);
    for row in 0..rows {
        for col in 0..columns {
            samples.push(
                cell_center_pixel(row, col, cell_size, width, height).map(|(x, y)| CellSample {
                    brightness: luma(*img.get_pixel(x, y)),
                    edge: edges.get_pixel(x, y).0[0],
                    pixel: (x, y),
                }),
            );
        }
    }

    SampleGrid {
        cell_size,
        rows,
        columns,
        samples,
    }
}
