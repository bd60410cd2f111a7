//! Common types shared by the board engine and the relay: guess outcomes and errors.

/// Result of resolving a guess against a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Guess struck a live boat segment. Carries the boat's size and whether
    /// this hit sank it.
    Hit { size: usize, sunk: bool },
    /// Guess struck open water or an already-resolved square.
    Miss,
}

impl GuessOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, GuessOutcome::Hit { .. })
    }
}

/// Errors returned by board placement and layout loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// Placement run leaves the grid on one of its axes.
    OutOfBounds,
    /// Placement run crosses a square already holding a boat.
    Overlap,
    /// No boat of the requested size is left to place in design mode.
    NoCreditRemaining,
    /// Layout names a grid dimension the engine does not accept.
    InvalidDimension,
}

impl core::fmt::Display for BoardError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BoardError::OutOfBounds => write!(f, "placement is out of bounds"),
            BoardError::Overlap => write!(f, "placement overlaps another boat"),
            BoardError::NoCreditRemaining => {
                write!(f, "no boat of that size remains to be placed")
            }
            BoardError::InvalidDimension => write!(f, "grid dimension must be at least 2"),
        }
    }
}

impl std::error::Error for BoardError {}

/// Errors produced while parsing the fleet layout wire form.
///
/// These are purely syntactic; bounds and overlap are validated by the board
/// engine when the layout is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Layout string has no dimension prefix.
    MissingDimension,
    /// Dimension or coordinate field is not a number.
    InvalidNumber(String),
    /// Orientation code is not `H` or `V`.
    InvalidOrientation(String),
    /// Boat group does not have exactly four fields.
    MalformedBoat(String),
}

impl core::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LayoutError::MissingDimension => write!(f, "layout has no dimension prefix"),
            LayoutError::InvalidNumber(field) => write!(f, "invalid number in layout: {field:?}"),
            LayoutError::InvalidOrientation(code) => {
                write!(f, "invalid orientation code: {code:?}")
            }
            LayoutError::MalformedBoat(group) => write!(f, "malformed boat group: {group:?}"),
        }
    }
}

impl std::error::Error for LayoutError {}
