//! Fleet rule, boats, and the wire form a fleet layout round-trips through.

use core::fmt;
use core::str::FromStr;

use crate::common::LayoutError;
use crate::grid::Orientation;

/// Separates the dimension prefix from the boat groups in the wire form.
const DIM_SEPARATOR: char = ';';
/// Separates boat groups from each other.
const BOAT_SEPARATOR: char = '|';
/// Separates fields within a boat group.
const FIELD_SEPARATOR: char = ',';

/// A boat on a board: fixed size, health counts down as segments are hit.
///
/// The origin and orientation are recorded so a placed fleet can be serialized
/// back out of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boat {
    size: usize,
    health: usize,
    row: usize,
    col: usize,
    orientation: Orientation,
}

impl Boat {
    pub fn new(size: usize, row: usize, col: usize, orientation: Orientation) -> Self {
        Boat {
            size,
            health: size,
            row,
            col,
            orientation,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Segments not yet hit.
    pub fn health(&self) -> usize {
        self.health
    }

    pub fn origin(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Records one hit against this boat.
    pub fn take_hit(&mut self) {
        self.health = self.health.saturating_sub(1);
    }

    pub fn is_sunk(&self) -> bool {
        self.health == 0
    }

    pub fn placement(&self) -> BoatPlacement {
        BoatPlacement {
            row: self.row,
            col: self.col,
            size: self.size,
            orientation: self.orientation,
        }
    }
}

/// Boat counts for a square board of side `dim`: for `half = dim / 2`, every
/// size `s` from `1` to `half` gets `half - s + 1` boats. Pairs are returned
/// largest size first, the order the generator places them in.
pub fn fleet_distribution(dim: usize) -> Vec<(usize, usize)> {
    let half = dim / 2;
    (1..=half).rev().map(|size| (size, half - size + 1)).collect()
}

/// Total number of boats the fleet rule yields for a board of side `dim`.
pub fn fleet_boat_count(dim: usize) -> usize {
    fleet_distribution(dim).iter().map(|(_, count)| count).sum()
}

/// Total number of boat segments the fleet rule yields for a board of side `dim`.
pub fn fleet_total_cells(dim: usize) -> usize {
    fleet_distribution(dim)
        .iter()
        .map(|(size, count)| size * count)
        .sum()
}

/// Position, size, and orientation of one boat within a serialized fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoatPlacement {
    pub row: usize,
    pub col: usize,
    pub size: usize,
    pub orientation: Orientation,
}

/// A complete fleet ready for the wire: the board dimension plus one placement
/// per boat.
///
/// The canonical form is `"<dim>;<row>,<col>,<size>,<H|V>|..."`, one group per
/// boat. `Display` writes it and `FromStr` parses it; the round trip preserves
/// dimension, positions, sizes, and orientations exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetLayout {
    pub dim: usize,
    pub boats: Vec<BoatPlacement>,
}

impl fmt::Display for FleetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.dim, DIM_SEPARATOR)?;
        for (i, boat) in self.boats.iter().enumerate() {
            if i > 0 {
                write!(f, "{BOAT_SEPARATOR}")?;
            }
            write!(
                f,
                "{}{sep}{}{sep}{}{sep}{}",
                boat.row,
                boat.col,
                boat.size,
                boat.orientation.code(),
                sep = FIELD_SEPARATOR,
            )?;
        }
        Ok(())
    }
}

impl FromStr for FleetLayout {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (dim_part, boats_part) = s
            .split_once(DIM_SEPARATOR)
            .ok_or(LayoutError::MissingDimension)?;
        let dim = parse_field(dim_part)?;

        let mut boats = Vec::new();
        for group in boats_part.split(BOAT_SEPARATOR).filter(|g| !g.is_empty()) {
            let mut fields = group.split(FIELD_SEPARATOR);
            let (row, col, size, orientation) = match (
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
            ) {
                (Some(row), Some(col), Some(size), Some(orientation), None) => {
                    (row, col, size, orientation)
                }
                _ => return Err(LayoutError::MalformedBoat(group.to_string())),
            };
            let orientation = match orientation.chars().next() {
                Some(code) if orientation.len() == 1 => Orientation::from_code(code)
                    .ok_or_else(|| LayoutError::InvalidOrientation(orientation.to_string()))?,
                _ => return Err(LayoutError::InvalidOrientation(orientation.to_string())),
            };
            boats.push(BoatPlacement {
                row: parse_field(row)?,
                col: parse_field(col)?,
                size: parse_field(size)?,
                orientation,
            });
        }

        Ok(FleetLayout { dim, boats })
    }
}

fn parse_field(field: &str) -> Result<usize, LayoutError> {
    field
        .parse()
        .map_err(|_| LayoutError::InvalidNumber(field.to_string()))
}
