//! Grid model: squares, their status, and the placement predicates used everywhere else.

/// Orientation of a boat run on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Orientation::Horizontal)
    }

    /// One-letter code used in the fleet layout wire form.
    pub fn code(&self) -> char {
        match self {
            Orientation::Horizontal => 'H',
            Orientation::Vertical => 'V',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'H' => Some(Orientation::Horizontal),
            'V' => Some(Orientation::Vertical),
            _ => None,
        }
    }
}

/// Status of an occupied or resolved square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquareStatus {
    /// Boat segment that has not been hit.
    Alive,
    /// Boat segment struck by a guess.
    Hit,
    /// Marker left by a guess that found no live segment.
    Missed,
}

/// One square of a board. Empty water is represented by the absence of a
/// square, not by a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Square {
    pub status: SquareStatus,
    /// Size of the boat this segment belongs to; zero for miss markers.
    pub boat_size: usize,
    /// Index into the owning board's boat list. Miss markers carry none; an
    /// `Alive` square always carries one.
    pub boat: Option<usize>,
    pub owner_is_player: bool,
}

impl Square {
    pub fn segment(boat: usize, boat_size: usize, owner_is_player: bool) -> Self {
        Square {
            status: SquareStatus::Alive,
            boat_size,
            boat: Some(boat),
            owner_is_player,
        }
    }

    pub fn miss_marker(owner_is_player: bool) -> Self {
        Square {
            status: SquareStatus::Missed,
            boat_size: 0,
            boat: None,
            owner_is_player,
        }
    }
}

/// Returns `true` iff a run of `size` squares starting at (`row`, `col`) in the
/// given orientation stays within a `dim` x `dim` grid on both axes.
pub fn fits(row: usize, col: usize, size: usize, orientation: Orientation, dim: usize) -> bool {
    match orientation {
        Orientation::Horizontal => row < dim && col + size <= dim,
        Orientation::Vertical => col < dim && row + size <= dim,
    }
}

/// Square matrix of side `dim` holding `Option<Square>` per cell, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    dim: usize,
    squares: Vec<Option<Square>>,
}

impl Grid {
    /// Creates an empty grid. The engine accepts any `dim >= 2`.
    pub fn new(dim: usize) -> Self {
        assert!(dim >= 2, "grid dimension must be at least 2");
        Grid {
            dim,
            squares: vec![None; dim * dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.dim && col < self.dim
    }

    pub fn square(&self, row: usize, col: usize) -> Option<&Square> {
        if !self.contains(row, col) {
            return None;
        }
        self.squares[row * self.dim + col].as_ref()
    }

    pub(crate) fn square_mut(&mut self, row: usize, col: usize) -> Option<&mut Square> {
        if !self.contains(row, col) {
            return None;
        }
        self.squares[row * self.dim + col].as_mut()
    }

    /// Writes (or overwrites) the square at (`row`, `col`).
    pub(crate) fn put(&mut self, row: usize, col: usize, square: Square) {
        let dim = self.dim;
        self.squares[row * dim + col] = Some(square);
    }

    /// Returns `true` iff every square of the run is currently empty.
    pub fn is_free(&self, row: usize, col: usize, size: usize, orientation: Orientation) -> bool {
        run(row, col, size, orientation).all(|(r, c)| self.square(r, c).is_none())
    }

    /// Count of squares currently holding the given status.
    pub fn count_status(&self, status: SquareStatus) -> usize {
        self.squares
            .iter()
            .flatten()
            .filter(|s| s.status == status)
            .count()
    }
}

/// Iterator over the coordinates covered by a placement run.
pub fn run(
    row: usize,
    col: usize,
    size: usize,
    orientation: Orientation,
) -> impl Iterator<Item = (usize, usize)> {
    (0..size).map(move |i| match orientation {
        Orientation::Horizontal => (row, col + i),
        Orientation::Vertical => (row + i, col),
    })
}
