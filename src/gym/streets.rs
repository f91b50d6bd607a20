use crate::{
    env::Environment,
    grid::{Action, CostGrid, Pos},
};

/// Cost marking a closed road
const CLOSED: f32 = -1.0;

/// A city street map for a single agent travelling from the grid's start to its goal
///
/// The environment keeps a private working copy of the [`CostGrid`]. Closures applied with
/// [`Streets::close`] only touch the working copy and are undone by
/// [`reset`](Environment::reset); closures listed with [`Streets::with_closures`] are
/// re-applied after every reset.
///
/// Moves that would leave the map act as a wall: the agent stays where it is and
/// receives the grid's penalty.
pub struct Streets {
    grid: CostGrid,
    working: CostGrid,
    closures: Vec<Pos>,
    pos: Pos,
}

impl Streets {
    pub fn new(grid: CostGrid) -> Self {
        Self {
            working: grid.clone(),
            closures: Vec::new(),
            pos: grid.start(),
            grid,
        }
    }

    /// Keep the streets at `closures` closed across resets
    pub fn with_closures(mut self, closures: Vec<Pos>) -> Self {
        self.closures = closures;
        self.apply_closures();
        self
    }

    fn apply_closures(&mut self) {
        for &pos in &self.closures {
            self.working.set_cost(pos, CLOSED);
        }
    }

    /// The current agent position
    pub fn position(&self) -> Pos {
        self.pos
    }

    /// The pristine grid this environment was built from
    pub fn grid(&self) -> &CostGrid {
        &self.grid
    }

    /// Close the street at `pos` until the next reset
    ///
    /// **Returns** `false` if `pos` is outside the grid
    pub fn close(&mut self, pos: Pos) -> bool {
        self.working.set_cost(pos, CLOSED).is_some()
    }
}

impl Environment for Streets {
    type State = Pos;
    type Action = Action;

    fn is_active(&self) -> bool {
        self.pos != self.grid.goal()
    }

    fn step(&mut self, action: Self::Action) -> (Self::State, f32) {
        match self.working.neighbor(self.pos, action) {
            Some(next) => {
                self.pos = next;
                (next, self.working.reward(next))
            }
            None => (self.pos, self.working.penalty()),
        }
    }

    fn reset(&mut self) -> Self::State {
        self.working.clone_from(&self.grid);
        self.apply_closures();
        self.pos = self.grid.start();
        self.pos
    }
}
