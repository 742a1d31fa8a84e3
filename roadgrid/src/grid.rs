use crate::find::{MapStorage, MapTrait, NodeReference};
use crate::sample::{sample_cells, CellSample};
use std::{fmt::Display, str::FromStr};

use image::RgbImage;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Cells whose centre has a high-pass response above this are walkable regardless of brightness
pub const EDGE_THRESHOLD: u8 = 40;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Invalid,
    Valid,
}

impl Cell {
    /// Classify a sampled cell. Bright open areas and edge-rich areas both count as walkable.
    pub fn classify(sample: Option<CellSample>, brightness_threshold: u8) -> Self {
        match sample {
            Some(s)
                if s.brightness >= brightness_threshold as f32 || s.edge > EDGE_THRESHOLD =>
            {
                Cell::Valid
            }
            _ => Cell::Invalid,
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Cell::Invalid => "X",
                Cell::Valid => " ",
            }
        )
    }
}

/// Grid coordinate. Ordered by row, then column.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl NodeReference for Point {}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Straight-line distance between two cells, in cells
pub fn distance(a: Point, b: Point) -> f64 {
    let dr = a.row as f64 - b.row as f64;
    let dc = a.col as f64 - b.col as f64;
    dr.hypot(dc)
}

/// Sum of the lengths of all moves along a path
pub fn path_cost(path: &[Point]) -> f64 {
    path.windows(2).map(|pair| distance(pair[0], pair[1])).sum()
}

/// The walkability grid derived from an image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridMap {
    /// Side length of one cell in image pixels
    pub cell_size: u32,
    pub rows: usize,
    pub columns: usize,
    pub cells: Vec<Vec<Cell>>,
}

impl GridMap {
    /// A grid with every cell set to `cell`
    pub fn new(rows: usize, columns: usize, cell_size: u32, cell: Cell) -> Self {
        Self {
            cell_size,
            rows,
            columns,
            cells: vec![vec![cell; columns]; rows],
        }
    }

    /// Build the walkability grid of an image.
    ///
    /// A cell is walkable iff the luma at its centre is at least `brightness_threshold` or the
    /// edge intensity there exceeds [`EDGE_THRESHOLD`].
    pub fn build(img: &RgbImage, cell_size: u32, brightness_threshold: u8) -> Self {
        let samples = sample_cells(img, cell_size);

        let cells: Vec<Vec<Cell>> = (0..samples.rows)
            .map(|row| {
                (0..samples.columns)
                    .map(|col| Cell::classify(samples.get(row, col), brightness_threshold))
                    .collect()
            })
            .collect();

        let map = Self {
            cell_size,
            rows: samples.rows,
            columns: samples.columns,
            cells,
        };

        debug!(
            "built {}x{} grid (cell size {}, threshold {}): {} walkable cells",
            map.rows,
            map.columns,
            cell_size,
            brightness_threshold,
            map.walkable_count()
        );

        map
    }

    /// Create a grid where exactly the given points are walkable. Points outside are ignored.
    pub fn from_walkable(
        rows: usize,
        columns: usize,
        walkable: impl IntoIterator<Item = Point>,
    ) -> Self {
        let mut map = Self::new(rows, columns, 1, Cell::Invalid);
        for p in walkable {
            if map.is_valid(p) {
                map.cells[p.row][p.col] = Cell::Valid;
            }
        }
        map
    }

    pub fn is_valid(&self, point: Point) -> bool {
        point.row < self.rows && point.col < self.columns
    }

    /// Whether `point` is in the walkability set
    pub fn contains(&self, point: Point) -> bool {
        self.is_valid(point) && self.cells[point.row][point.col] == Cell::Valid
    }

    /// All walkable cells in row-major order
    pub fn walkable_cells(&self) -> impl Iterator<Item = Point> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == Cell::Valid)
                .map(move |(col, _)| Point { row, col })
        })
    }

    pub fn walkable_count(&self) -> usize {
        self.walkable_cells().count()
    }

    /// Pixel position of the centre of a cell
    pub fn cell_center(&self, point: Point) -> Point2<f32> {
        let size = self.cell_size as f32;
        Point2::new(
            (point.col as f32 + 0.5) * size,
            (point.row as f32 + 0.5) * size,
        )
    }

    /// The cell containing a pixel position, if it lies on the grid
    pub fn pixel_to_cell(&self, x: f32, y: f32) -> Option<Point> {
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 || self.cell_size == 0 {
            return None;
        }
        let size = self.cell_size as f32;
        let point = Point {
            row: (y / size) as usize,
            col: (x / size) as usize,
        };
        if self.is_valid(point) {
            Some(point)
        } else {
            None
        }
    }
}

impl Display for GridMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.cells {
            for cell in row {
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Parses the text form of a grid, one line per row: `#` or `X` is blocked, `.` or a
/// space is walkable. All rows must have the same length.
impl FromStr for GridMap {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cells = s
            .lines()
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(row, line)| {
                line.chars()
                    .map(|c| match c {
                        '#' | 'X' => Ok(Cell::Invalid),
                        '.' | ' ' => Ok(Cell::Valid),
                        _ => Err(anyhow::anyhow!("invalid cell '{}' in row {}", c, row)),
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let columns = cells.first().map(Vec::len).unwrap_or(0);
        if let Some(row) = cells.iter().position(|r| r.len() != columns) {
            return Err(anyhow::anyhow!(
                "row {} has {} cells, expected {}",
                row,
                cells[row].len(),
                columns
            ));
        }

        Ok(GridMap {
            cell_size: 1,
            rows: cells.len(),
            columns,
            cells,
        })
    }
}

/// A MapStorage that uses a rectangular grid of cells (a vec in a vec)
#[derive(Debug)]
pub struct CellStorage<T>(Vec<Vec<T>>);

impl<T: Copy + 'static> MapStorage<T> for CellStorage<T> {
    type Reference = Point;

    fn get(&self, node: Self::Reference) -> T {
        self.0[node.row][node.col]
    }

    fn get_mut(&mut self, node: Self::Reference) -> &mut T {
        &mut self.0[node.row][node.col]
    }
}

/// Cardinal moves first, then the diagonals
const MOVES: [(isize, isize); 8] = [
    (-1, 0),
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

impl MapTrait for GridMap {
    type Reference = Point;
    type Storage<T: Default + Copy + Clone + 'static> = CellStorage<T>;

    fn is_walkable(&self, node: Self::Reference) -> bool {
        self.contains(node)
    }

    fn neighbors_of(
        &self,
        node: Self::Reference,
        allow_diagonal: bool,
    ) -> impl Iterator<Item = (Self::Reference, f64)> {
        let moves = if allow_diagonal { &MOVES[..] } else { &MOVES[..4] };

        moves.iter().filter_map(move |&(dr, dc)| {
            let point = Point {
                row: node.row.checked_add_signed(dr)?,
                col: node.col.checked_add_signed(dc)?,
            };
            // filter to only keep walkable cells
            if self.contains(point) {
                Some((point, (dr as f64).hypot(dc as f64)))
            } else {
                None
            }
        })
    }

    fn estimate(&self, from: Self::Reference, to: Self::Reference) -> f64 {
        distance(from, to)
    }

    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T> {
        CellStorage(vec![vec![Default::default(); self.columns]; self.rows])
    }
}
