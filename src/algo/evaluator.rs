use log::info;

use super::q_table::QTable;
use crate::{
    env::Environment,
    grid::{Action, Pos},
};

/// Positions visited by a greedy rollout, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub positions: Vec<Pos>,
    /// Sum of the rewards collected along the way
    pub reward: f32,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn last(&self) -> Option<Pos> {
        self.positions.last().copied()
    }
}

impl IntoIterator for Trajectory {
    type Item = Pos;
    type IntoIter = std::vec::IntoIter<Pos>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.into_iter()
    }
}

/// Replays a learned table greedily for a bounded number of steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluator {
    steps: usize,
}

impl Evaluator {
    /// `steps` caps the number of moves in a rollout
    pub fn new(steps: usize) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Roll out the greedy policy of `q_table` from the environment's initial state
    ///
    /// Before every step the rollout stops if the environment has become inactive, so the
    /// trajectory never holds more than `steps` positions and, when the goal is reached,
    /// ends with it.
    pub fn evaluate<E>(&self, q_table: &QTable, env: &mut E) -> Trajectory
    where
        E: Environment<State = Pos, Action = Action>,
    {
        let mut state = env.reset();
        let mut trajectory = Trajectory::default();

        for _ in 0..self.steps {
            if !env.is_active() {
                break;
            }
            let (next, reward) = env.step(q_table.best_action(state));
            trajectory.positions.push(next);
            trajectory.reward += reward;
            state = next;
        }

        if env.is_active() {
            info!(
                "Rollout stopped at {:?} after the {} step limit",
                state, self.steps
            );
        } else {
            info!("Rollout reached the goal in {} steps", trajectory.len());
        }
        trajectory
    }
}
