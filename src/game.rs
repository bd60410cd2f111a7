//! Game session state machine: phases, turn order, and win tracking.

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::board::BoardEngine;
use crate::common::{BoardError, GuessOutcome};
use crate::events::{EventSink, Side};
use crate::fleet::{fleet_total_cells, FleetLayout};
use crate::grid::Orientation;

/// Grid dimension a fresh session starts with.
pub const DEFAULT_DIMENSION: usize = 10;

/// Phase of a play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// The player is placing boats by hand and may still reconfigure.
    Design,
    /// The player accepted a randomized fleet.
    Random,
    /// Both fleets are fixed and guesses are being exchanged.
    InProgress,
    /// Terminal; one side has no hit points left.
    GameOver,
}

/// One play session: both boards, the phase, whose turn it is, and the win
/// counters, which survive `new_game` resets.
pub struct GameSession {
    player_board: BoardEngine,
    system_board: BoardEngine,
    status: GameStatus,
    players_turn: bool,
    player_wins: u32,
    system_wins: u32,
    did_player_win: Option<bool>,
    rng: SmallRng,
    events: Arc<dyn EventSink>,
}

impl GameSession {
    pub fn new(dim: usize, events: Arc<dyn EventSink>) -> Self {
        Self::with_rng(dim, events, SmallRng::from_rng(&mut rand::rng()))
    }

    /// Like [`GameSession::new`] but with a caller-provided RNG so games are
    /// reproducible. The coin flip for the first turn happens here.
    pub fn with_rng(dim: usize, events: Arc<dyn EventSink>, mut rng: SmallRng) -> Self {
        let players_turn = rng.random();
        let player_board = BoardEngine::new(dim, Side::Player, events.clone());
        let mut system_board = BoardEngine::new(dim, Side::System, events.clone());
        system_board.randomize_fleet(&mut rng);
        GameSession {
            player_board,
            system_board,
            status: GameStatus::Design,
            players_turn,
            player_wins: 0,
            system_wins: 0,
            did_player_win: None,
            rng,
            events,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_players_turn(&self) -> bool {
        self.players_turn
    }

    pub fn player_wins(&self) -> u32 {
        self.player_wins
    }

    pub fn system_wins(&self) -> u32 {
        self.system_wins
    }

    /// Outcome of the last finished game, if one has finished since the last
    /// reset.
    pub fn did_player_win(&self) -> Option<bool> {
        self.did_player_win
    }

    pub fn player_board(&self) -> &BoardEngine {
        &self.player_board
    }

    pub fn system_board(&self) -> &BoardEngine {
        &self.system_board
    }

    pub fn dim(&self) -> usize {
        self.player_board.dim()
    }

    /// Places one boat on the player's board during the design phase.
    pub fn place_boat(
        &mut self,
        row: usize,
        col: usize,
        size: usize,
        orientation: Orientation,
    ) -> bool {
        if self.status != GameStatus::Design {
            self.events
                .on_log_event("Boats can only be placed while designing the fleet");
            return false;
        }
        if self.player_board.credits_remaining(size) == 0 {
            self.events
                .on_log_event("You cannot place any more boats of this size");
            return false;
        }
        if self.player_board.place_boat(row, col, size, orientation) {
            self.events
                .on_log_event(&format!("Boat of size {size} placed at ({row}, {col})"));
            true
        } else {
            self.events.on_log_event(&format!(
                "Boat of size {size} cannot be placed at ({row}, {col})"
            ));
            false
        }
    }

    /// Replaces the player's fleet with a random one and marks it accepted.
    pub fn randomize_player_fleet(&mut self) {
        if matches!(self.status, GameStatus::InProgress | GameStatus::GameOver) {
            self.events
                .on_log_event("The fleet cannot be randomized once the game has started");
            return;
        }
        self.status = GameStatus::Random;
        self.player_board.randomize_fleet(&mut self.rng);
        self.events
            .on_log_event("Player fleet locations were randomized");
    }

    /// Clears the player's board and returns to the design phase.
    pub fn clear_player_board(&mut self) {
        self.status = GameStatus::Design;
        self.player_board.clear();
        self.events.on_log_event("Player board cleared for design");
    }

    /// Resizes both boards, re-randomizes the system fleet, and returns to the
    /// design phase.
    pub fn resize(&mut self, new_dim: usize) {
        self.status = GameStatus::Design;
        self.player_board.resize(new_dim);
        self.system_board.resize(new_dim);
        self.system_board.randomize_fleet(&mut self.rng);
        self.events.on_log_event(&format!(
            "Board dimensions were changed to {new_dim}x{new_dim}"
        ));
    }

    /// Starts exchanging guesses. Succeeds only when the player accepted a
    /// random fleet or placed every boat by hand; if the coin flip gave the
    /// system the first turn, it guesses immediately.
    pub fn begin(&mut self) -> bool {
        if !matches!(self.status, GameStatus::Design | GameStatus::Random) {
            return false;
        }
        if self.status == GameStatus::Random || self.player_board.design_complete() {
            self.status = GameStatus::InProgress;
            self.events.on_log_event(&format!(
                "The game has begun; the coin flip gives the {} the first guess",
                if self.players_turn { "player" } else { "system" }
            ));
            if !self.players_turn {
                self.system_guess();
            }
            true
        } else {
            self.events
                .on_log_event("The game cannot start until every boat is placed");
            false
        }
    }

    /// Resolves the player's guess against the system board. Accepted only
    /// while the game is in progress and it is the player's turn.
    pub fn player_guess(&mut self, row: usize, col: usize) -> Option<GuessOutcome> {
        if self.status != GameStatus::InProgress || !self.players_turn {
            return None;
        }
        let outcome = self.system_board.resolve_guess(row, col);
        self.report_guess(Side::Player, row, col, outcome);
        self.finish_turn();
        Some(outcome)
    }

    /// Makes the system's guess against the player board, targeting a
    /// uniformly random square that has not been resolved yet.
    pub fn system_guess(&mut self) -> Option<GuessOutcome> {
        if self.status != GameStatus::InProgress || self.players_turn {
            return None;
        }
        let (row, col) = self.player_board.random_unresolved_target(&mut self.rng)?;
        let outcome = self.player_board.resolve_guess(row, col);
        self.report_guess(Side::System, row, col, outcome);
        self.finish_turn();
        Some(outcome)
    }

    fn report_guess(&self, by: Side, row: usize, col: usize, outcome: GuessOutcome) {
        let message = match outcome {
            GuessOutcome::Hit { size, sunk: true } => {
                format!("{by} sank a boat of size {size} at ({row}, {col})")
            }
            GuessOutcome::Hit { .. } => format!("{by} hit a boat at ({row}, {col})"),
            GuessOutcome::Miss => format!("{by} guessed ({row}, {col}) and missed"),
        };
        self.events.on_log_event(&message);
    }

    /// Evaluated after every resolved guess: either the game ends, or the turn
    /// flips regardless of the outcome.
    fn finish_turn(&mut self) {
        let winner = if self.system_board.hit_points_remaining() == 0 {
            Some(true)
        } else if self.player_board.hit_points_remaining() == 0 {
            Some(false)
        } else {
            None
        };
        match winner {
            Some(winner_is_player) => self.end_game(winner_is_player),
            None => self.players_turn = !self.players_turn,
        }
    }

    fn end_game(&mut self, winner_is_player: bool) {
        self.status = GameStatus::GameOver;
        self.did_player_win = Some(winner_is_player);
        if winner_is_player {
            self.player_wins += 1;
        } else {
            self.system_wins += 1;
        }
        let summary = format!(
            "{} wins the game; score is player {} : system {}",
            if winner_is_player { "Player" } else { "System" },
            self.player_wins,
            self.system_wins
        );
        self.events.on_log_event(&summary);
        self.events.on_game_over(winner_is_player, &summary);
    }

    /// Concedes the game in progress; counts as a loss for the player.
    pub fn forfeit(&mut self) {
        if self.status != GameStatus::InProgress {
            return;
        }
        self.events.on_log_event("Player has forfeited the game");
        self.end_game(false);
    }

    /// Resets both boards for another game at the current dimension. Win
    /// counters carry over.
    pub fn new_game(&mut self) {
        self.status = GameStatus::Design;
        self.did_player_win = None;
        self.player_board.clear();
        self.system_board.randomize_fleet(&mut self.rng);
        self.events.on_log_event("Boards were reset for a new game");
    }

    /// Serializable snapshot of the player's fleet.
    pub fn player_fleet_layout(&self) -> FleetLayout {
        self.player_board.fleet_layout()
    }

    /// True when the player board carries the complete fleet the rule asks
    /// for, whether placed by hand, randomized, or loaded.
    pub fn is_player_fleet_placed(&self) -> bool {
        self.player_board.total_hit_points() == fleet_total_cells(self.player_board.dim())
    }

    /// Replaces the player's fleet with a layout received from the relay and
    /// returns to the design phase. The system board follows a dimension
    /// change with a fresh random fleet.
    pub fn load_player_layout(&mut self, layout: &FleetLayout) -> Result<(), BoardError> {
        self.player_board.load_layout(layout)?;
        if self.system_board.dim() != layout.dim {
            self.system_board.resize(layout.dim);
            self.system_board.randomize_fleet(&mut self.rng);
        }
        self.status = GameStatus::Design;
        self.events
            .on_log_event("Loaded fleet configuration from the server");
        Ok(())
    }
}
