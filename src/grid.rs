use strum::{EnumCount, EnumIter, FromRepr, VariantArray};
use thiserror::Error;

/// A `(row, column)` coordinate into a [`CostGrid`]
pub type Pos = (usize, usize);

/// The four moves available to the agent
///
/// Declaration order is the greedy tie-break order: when several actions share the
/// highest value, the first one listed here wins.
#[derive(EnumIter, EnumCount, VariantArray, FromRepr, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Up = 0,
    Down = 1,
    Right = 2,
    Left = 3,
}

impl Action {
    /// `(row delta, column delta)` of this move
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Right => (0, 1),
            Action::Left => (0, -1),
        }
    }

    /// Position of this table slot within a state's row of action values
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Default reward for entering a closed road or building
pub const DEFAULT_PENALTY: f32 = -1000.0;

/// Default reward for reaching the goal
pub const DEFAULT_GOAL_VALUE: f32 = 1000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("cost grid has no cells")]
    Empty,

    #[error("row {row} has {got} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("{what} {pos:?} lies outside the {rows}x{cols} grid")]
    OutOfBounds {
        what: &'static str,
        pos: Pos,
        rows: usize,
        cols: usize,
    },
}

/// A rectangular grid of street traversal costs with a designated start and goal
///
/// Non-negative cells are ordinary streets whose cost is charged on entry. Negative cells
/// mark closed roads (`-1`) or buildings (`-10`); entering them is heavily penalized but
/// not forbidden.
#[derive(Debug, Clone, PartialEq)]
pub struct CostGrid {
    rows: usize,
    cols: usize,
    costs: Vec<f32>,
    start: Pos,
    goal: Pos,
    goal_value: f32,
    penalty: f32,
}

impl CostGrid {
    /// Build a grid from row-major costs
    ///
    /// Fails if the grid is empty, the rows differ in length, or `start`/`goal` fall
    /// outside it.
    pub fn new(costs: Vec<Vec<f32>>, start: Pos, goal: Pos) -> Result<Self, GridError> {
        let rows = costs.len();
        let cols = costs.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty);
        }

        if let Some((row, r)) = costs.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(GridError::Ragged {
                row,
                expected: cols,
                got: r.len(),
            });
        }

        let grid = Self {
            rows,
            cols,
            costs: costs.into_iter().flatten().collect(),
            start,
            goal,
            goal_value: DEFAULT_GOAL_VALUE,
            penalty: DEFAULT_PENALTY,
        };

        for (what, pos) in [("start", start), ("goal", goal)] {
            if !grid.contains(pos) {
                return Err(GridError::OutOfBounds {
                    what,
                    pos,
                    rows,
                    cols,
                });
            }
        }

        Ok(grid)
    }

    /// Override the reward for reaching the goal
    pub fn with_goal_value(mut self, goal_value: f32) -> Self {
        self.goal_value = goal_value;
        self
    }

    /// Override the reward for entering a closed cell or leaving the grid
    pub fn with_penalty(mut self, penalty: f32) -> Self {
        self.penalty = penalty;
        self
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn goal(&self) -> Pos {
        self.goal
    }

    pub fn goal_value(&self) -> f32 {
        self.goal_value
    }

    pub fn penalty(&self) -> f32 {
        self.penalty
    }

    pub fn contains(&self, (row, col): Pos) -> bool {
        row < self.rows && col < self.cols
    }

    /// Row-major index of `pos`, if it lies inside the grid
    pub fn index(&self, pos: Pos) -> Option<usize> {
        self.contains(pos).then(|| pos.0 * self.cols + pos.1)
    }

    /// Raw cost stored at `pos`
    pub fn cost(&self, pos: Pos) -> Option<f32> {
        self.index(pos).map(|i| self.costs[i])
    }

    /// Overwrite the cost at `pos`, returning the previous value
    pub(crate) fn set_cost(&mut self, pos: Pos, cost: f32) -> Option<f32> {
        let i = self.index(pos)?;
        Some(std::mem::replace(&mut self.costs[i], cost))
    }

    /// The cell reached by taking `action` from `pos`, or `None` when that leaves the grid
    pub fn neighbor(&self, (row, col): Pos, action: Action) -> Option<Pos> {
        let (dr, dc) = action.delta();
        let next = (row.checked_add_signed(dr)?, col.checked_add_signed(dc)?);
        self.contains(next).then_some(next)
    }

    /// Reward for standing on `pos`
    ///
    /// In priority order: the goal yields `goal_value`, a negative cost yields `penalty`,
    /// anything else yields the negated cost. Positions outside the grid yield `penalty`.
    pub fn reward(&self, pos: Pos) -> f32 {
        if pos == self.goal {
            return self.goal_value;
        }
        match self.cost(pos) {
            Some(cost) if cost >= 0.0 => -cost,
            _ => self.penalty,
        }
    }

    /// Iterate over every position in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |c| (r, c)))
    }
}
