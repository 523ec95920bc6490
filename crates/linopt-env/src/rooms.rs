//! Four-rooms gridworld
//!
//! A deterministic 13×13 grid (11×11 interior) split into four rooms joined
//! by doorways. The observation carries normalized coordinates, a room
//! one-hot, and indicator features for standing in a doorway or on the goal,
//! which makes the doorways natural subgoals for option pretraining. There
//! is no physics: moving into a wall simply leaves the position unchanged.

use linopt_core::{DiscreteAction, Environment, Reward};
use tracing::warn;

/// Grid layout; `#` is a wall cell
const MAP: [&str; 13] = [
    "#############",
    "#     #     #",
    "#     #     #",
    "#           #",
    "#     #     #",
    "#     #     #",
    "## ####     #",
    "#     ### ###",
    "#     #     #",
    "#     #     #",
    "#           #",
    "#     #     #",
    "#############",
];

/// Doorway cells joining adjacent rooms, as (row, col)
const DOORWAYS: [(usize, usize); 4] = [(3, 6), (6, 2), (7, 9), (10, 6)];

const START: (usize, usize) = (1, 1);
const GOAL: (usize, usize) = (11, 11);

/// Four-rooms environment with indicator features for doorways and the goal
#[derive(Debug, Clone)]
pub struct FourRooms {
    row: usize,
    col: usize,
    steps: usize,
}

impl FourRooms {
    /// Number of primitive actions (up, right, down, left)
    pub const NUM_ACTIONS: usize = 4;
    /// Observation length: x, y, room one-hot, doorway flag, goal flag
    pub const SENSATION_LEN: usize = 8;
    /// Index of the doorway indicator in the observation
    pub const DOORWAY_FEATURE: usize = 6;
    /// Index of the goal indicator in the observation
    pub const GOAL_FEATURE: usize = 7;

    /// Create an environment positioned at the start cell
    #[must_use]
    pub fn new() -> Self {
        Self {
            row: START.0,
            col: START.1,
            steps: 0,
        }
    }

    /// Current (row, col) position
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Steps taken since the last reset
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn is_wall(row: usize, col: usize) -> bool {
        MAP[row].as_bytes()[col] == b'#'
    }

    fn is_doorway(row: usize, col: usize) -> bool {
        DOORWAYS.contains(&(row, col))
    }

    /// Room id for a walkable cell; doorway cells belong to no room
    fn room(row: usize, col: usize) -> Option<usize> {
        if Self::is_doorway(row, col) {
            return None;
        }
        match (row, col) {
            (r, c) if c <= 5 && r <= 5 => Some(0),
            (r, c) if c >= 7 && r <= 6 => Some(1),
            (r, c) if c <= 5 && r >= 7 => Some(2),
            _ => Some(3),
        }
    }
}

impl Default for FourRooms {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for FourRooms {
    fn sensation(&self) -> Vec<f64> {
        let mut s = vec![0.0; Self::SENSATION_LEN];
        #[allow(clippy::cast_precision_loss)]
        {
            s[0] = self.col as f64 / 12.0;
            s[1] = self.row as f64 / 12.0;
        }
        if let Some(room) = Self::room(self.row, self.col) {
            s[2 + room] = 1.0;
        }
        if Self::is_doorway(self.row, self.col) {
            s[Self::DOORWAY_FEATURE] = 1.0;
        }
        if (self.row, self.col) == GOAL {
            s[Self::GOAL_FEATURE] = 1.0;
        }
        s
    }

    fn apply(&mut self, action: DiscreteAction) -> Reward {
        let (next_row, next_col) = match action.0 {
            0 => (self.row - 1, self.col),
            1 => (self.row, self.col + 1),
            2 => (self.row + 1, self.col),
            3 => (self.row, self.col - 1),
            other => {
                warn!(action = other, "unknown action id, holding position");
                (self.row, self.col)
            }
        };

        if !Self::is_wall(next_row, next_col) {
            self.row = next_row;
            self.col = next_col;
        }
        self.steps += 1;

        if (self.row, self.col) == GOAL {
            Reward::new(1.0)
        } else {
            Reward::new(0.0)
        }
    }

    fn terminal(&self) -> bool {
        (self.row, self.col) == GOAL
    }

    fn reset(&mut self) {
        self.row = START.0;
        self.col = START.1;
        self.steps = 0;
    }

    fn num_actions(&self) -> usize {
        Self::NUM_ACTIONS
    }
}
