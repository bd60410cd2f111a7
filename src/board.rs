//! Board engine: fleet generation, placement validation, and guess resolution.

use std::sync::Arc;

use rand::Rng;

use crate::common::{BoardError, GuessOutcome};
use crate::events::{EventSink, Side};
use crate::fleet::{fleet_distribution, Boat, FleetLayout};
use crate::grid::{fits, run, Grid, Orientation, Square, SquareStatus};

/// Random origins tried before falling back to a deterministic sweep of the
/// grid. The fleet rule's distribution is assumed to fit, but the bound keeps
/// the generator from spinning forever if it ever does not.
const MAX_RANDOM_ATTEMPTS: usize = 1_000;

/// State of one side's board: the grid, the boats on it, and (for the player
/// side) the per-size placement credits still available in design mode.
pub struct BoardEngine {
    grid: Grid,
    boats: Vec<Boat>,
    /// Sizes of boats not yet placed by hand, largest first. Always empty for
    /// the system side, which never places manually.
    credits: Vec<usize>,
    side: Side,
    events: Arc<dyn EventSink>,
}

impl BoardEngine {
    /// Creates an empty board of side `dim` reporting to `events`.
    pub fn new(dim: usize, side: Side, events: Arc<dyn EventSink>) -> Self {
        let mut board = BoardEngine {
            grid: Grid::new(dim),
            boats: Vec::new(),
            credits: Vec::new(),
            side,
            events,
        };
        board.reset_state(dim);
        board
    }

    pub fn dim(&self) -> usize {
        self.grid.dim()
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn boats(&self) -> &[Boat] {
        &self.boats
    }

    pub fn square(&self, row: usize, col: usize) -> Option<&Square> {
        self.grid.square(row, col)
    }

    /// Replaces the grid with an empty one of the new dimension, clears the
    /// boats, and recomputes the design credits.
    pub fn resize(&mut self, new_dim: usize) {
        log::debug!("{} board resized to {new_dim}x{new_dim}", self.side);
        self.reset_state(new_dim);
        self.events.on_board_changed(self.side);
    }

    /// Clears all boats at the current dimension.
    pub fn clear(&mut self) {
        self.resize(self.grid.dim());
    }

    /// Clears the board and places the full fleet given by the fleet rule,
    /// largest boats first, at random positions.
    ///
    /// Each boat is retried at fresh random origins (horizontal first, then
    /// vertical) up to a bound, then placed by a deterministic sweep. A boat
    /// that fits nowhere at all is skipped with a warning.
    pub fn randomize_fleet<R: Rng>(&mut self, rng: &mut R) {
        let dim = self.grid.dim();
        self.reset_state(dim);
        for (size, count) in fleet_distribution(dim) {
            for _ in 0..count {
                if !self.place_random_boat(rng, size) {
                    log::warn!("no space left for a boat of size {size} on a {dim}x{dim} grid");
                }
            }
            log::debug!("{} boats of size {size} placed", self.boats_of_size(size));
        }
        self.events.on_board_changed(self.side);
    }

    fn boats_of_size(&self, size: usize) -> usize {
        self.boats.iter().filter(|b| b.size() == size).count()
    }

    fn place_random_boat<R: Rng>(&mut self, rng: &mut R, size: usize) -> bool {
        let dim = self.grid.dim();
        for _ in 0..MAX_RANDOM_ATTEMPTS {
            let row = rng.random_range(0..dim);
            let col = rng.random_range(0..dim);
            for orientation in [Orientation::Horizontal, Orientation::Vertical] {
                if self.try_place(row, col, size, orientation).is_ok() {
                    return true;
                }
            }
        }
        for row in 0..dim {
            for col in 0..dim {
                for orientation in [Orientation::Horizontal, Orientation::Vertical] {
                    if self.try_place(row, col, size, orientation).is_ok() {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Places one boat by hand. Fails if no placement credit remains for the
    /// size (player side), or if the run does not fit or is not free. Consumes
    /// one credit on success.
    pub fn place_boat(
        &mut self,
        row: usize,
        col: usize,
        size: usize,
        orientation: Orientation,
    ) -> bool {
        if self.side.is_player() && self.credits_remaining(size) == 0 {
            log::debug!("no placement credit left for a boat of size {size}");
            return false;
        }
        if self.try_place(row, col, size, orientation).is_err() {
            return false;
        }
        self.consume_credit(size);
        self.events.on_board_changed(self.side);
        true
    }

    /// Validates the run and, only if it is legal, writes the segments and
    /// records the boat. No squares are touched on failure.
    fn try_place(
        &mut self,
        row: usize,
        col: usize,
        size: usize,
        orientation: Orientation,
    ) -> Result<(), BoardError> {
        if !fits(row, col, size, orientation, self.grid.dim()) {
            return Err(BoardError::OutOfBounds);
        }
        if !self.grid.is_free(row, col, size, orientation) {
            return Err(BoardError::Overlap);
        }
        let index = self.boats.len();
        self.boats.push(Boat::new(size, row, col, orientation));
        for (r, c) in run(row, col, size, orientation) {
            self.grid
                .put(r, c, Square::segment(index, size, self.side.is_player()));
        }
        log::debug!(
            "{} {:?} boat of size {size} placed at ({row}, {col})",
            self.side,
            orientation
        );
        Ok(())
    }

    /// Resolves a guess. A live segment becomes a hit and its boat loses one
    /// health point; anything else (open water, or a square that was already
    /// hit or missed) is overwritten with a miss marker and reported as a
    /// miss. Callers are expected not to re-guess resolved squares; the engine
    /// keeps the historical fall-through rather than rejecting them.
    pub fn resolve_guess(&mut self, row: usize, col: usize) -> GuessOutcome {
        if !self.grid.contains(row, col) {
            log::warn!(
                "guess at ({row}, {col}) is outside the {0}x{0} grid",
                self.grid.dim()
            );
            return GuessOutcome::Miss;
        }
        let outcome = match self.grid.square(row, col) {
            Some(&Square {
                status: SquareStatus::Alive,
                boat: Some(index),
                ..
            }) => {
                if let Some(square) = self.grid.square_mut(row, col) {
                    square.status = SquareStatus::Hit;
                }
                let boat = &mut self.boats[index];
                boat.take_hit();
                GuessOutcome::Hit {
                    size: boat.size(),
                    sunk: boat.is_sunk(),
                }
            }
            _ => {
                self.grid
                    .put(row, col, Square::miss_marker(self.side.is_player()));
                GuessOutcome::Miss
            }
        };
        self.events.on_board_changed(self.side);
        outcome
    }

    /// Sum of health over boats that still have any; zero exactly when every
    /// boat on the board is sunk.
    pub fn hit_points_remaining(&self) -> usize {
        self.boats
            .iter()
            .filter(|b| b.health() > 0)
            .map(Boat::health)
            .sum()
    }

    /// Sum of all boat sizes on the board.
    pub fn total_hit_points(&self) -> usize {
        self.boats.iter().map(Boat::size).sum()
    }

    /// How many boats of `size` may still be placed by hand.
    pub fn credits_remaining(&self, size: usize) -> usize {
        self.credits.iter().filter(|&&s| s == size).count()
    }

    /// Distinct boat sizes that may still be placed, largest first.
    pub fn boat_size_options(&self) -> Vec<usize> {
        let mut options: Vec<usize> = self.credits.clone();
        options.dedup();
        options
    }

    /// True when no placement credits remain.
    pub fn design_complete(&self) -> bool {
        self.credits.is_empty()
    }

    /// Uniform pick among squares that are empty or still alive, i.e. not yet
    /// resolved by a guess. Random retries up to a bound, then a sweep; `None`
    /// only when every square is resolved.
    pub fn random_unresolved_target<R: Rng>(&self, rng: &mut R) -> Option<(usize, usize)> {
        let dim = self.grid.dim();
        for _ in 0..MAX_RANDOM_ATTEMPTS {
            let row = rng.random_range(0..dim);
            let col = rng.random_range(0..dim);
            if self.is_unresolved(row, col) {
                return Some((row, col));
            }
        }
        for row in 0..dim {
            for col in 0..dim {
                if self.is_unresolved(row, col) {
                    return Some((row, col));
                }
            }
        }
        None
    }

    fn is_unresolved(&self, row: usize, col: usize) -> bool {
        match self.grid.square(row, col) {
            None => true,
            Some(square) => square.status == SquareStatus::Alive,
        }
    }

    /// Serializable snapshot of the placed fleet.
    pub fn fleet_layout(&self) -> FleetLayout {
        FleetLayout {
            dim: self.grid.dim(),
            boats: self.boats.iter().map(Boat::placement).collect(),
        }
    }

    /// Replaces the board contents with the given layout. A layout that does
    /// not validate leaves the board empty rather than partially populated.
    pub fn load_layout(&mut self, layout: &FleetLayout) -> Result<(), BoardError> {
        if layout.dim < 2 {
            return Err(BoardError::InvalidDimension);
        }
        self.reset_state(layout.dim);
        for placement in &layout.boats {
            if let Err(err) = self.try_place(
                placement.row,
                placement.col,
                placement.size,
                placement.orientation,
            ) {
                self.reset_state(layout.dim);
                self.events.on_board_changed(self.side);
                return Err(err);
            }
            self.consume_credit(placement.size);
        }
        self.events.on_board_changed(self.side);
        Ok(())
    }

    fn consume_credit(&mut self, size: usize) {
        if let Some(pos) = self.credits.iter().position(|&s| s == size) {
            self.credits.remove(pos);
        }
    }

    fn reset_state(&mut self, dim: usize) {
        self.grid = Grid::new(dim);
        self.boats.clear();
        self.credits.clear();
        if self.side.is_player() {
            for (size, count) in fleet_distribution(dim) {
                self.credits.extend(std::iter::repeat(size).take(count));
            }
        }
    }
}
