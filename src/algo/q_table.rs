use rand::Rng;
use strum::{EnumCount, VariantArray};

use crate::{
    assert_interval,
    decay::Decay,
    exploration::{Choice, EpsilonGreedy},
    grid::{Action, Pos},
};

const ACTIONS: usize = Action::COUNT;

/// Dense table of action values for every cell of a grid
///
/// Values live in one flat buffer of `rows * cols * 4` entries, addressed by the row-major
/// cell index and the [`Action`] discriminant. Every entry starts at `0.0` and the table
/// never changes size.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl QTable {
    pub fn new((rows, cols): (usize, usize)) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols * ACTIONS],
        }
    }

    /// `(rows, columns)` of the grid this table covers
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn offset(&self, (row, col): Pos) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "State {:?} is outside the {}x{} table",
            (row, col),
            self.rows,
            self.cols
        );
        (row * self.cols + col) * ACTIONS
    }

    /// Values of all actions at `state`, indexed by action discriminant
    ///
    /// **Panics** if `state` is outside the table
    pub fn values(&self, state: Pos) -> &[f32; ACTIONS] {
        let i = self.offset(state);
        self.values[i..i + ACTIONS]
            .try_into()
            .expect("slice has exactly one entry per action")
    }

    pub fn get(&self, state: Pos, action: Action) -> f32 {
        self.values(state)[action.index()]
    }

    fn get_mut(&mut self, state: Pos, action: Action) -> &mut f32 {
        let i = self.offset(state) + action.index();
        &mut self.values[i]
    }

    /// The highest valued action at `state`
    ///
    /// Ties go to the action declared first in [`Action`].
    pub fn best_action(&self, state: Pos) -> Action {
        let values = self.values(state);
        let mut best = Action::VARIANTS[0];
        for &action in &Action::VARIANTS[1..] {
            if values[action.index()] > values[best.index()] {
                best = action;
            }
        }
        best
    }

    /// max<sub>a</sub> Q(state, a)
    pub fn max_value(&self, state: Pos) -> f32 {
        self.values(state)
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Apply the one-step temporal difference rule
    ///
    /// Q(s,a) += α * (r + γ * max<sub>a'</sub> Q(s',a') - Q(s,a))
    ///
    /// **Returns** the new value of Q(s,a)
    pub fn update(
        &mut self,
        state: Pos,
        action: Action,
        reward: f32,
        new_state: Pos,
        alpha: f32,
        gamma: f32,
    ) -> f32 {
        let max_next_q = self.max_value(new_state);
        let q = self.get_mut(state, action);
        *q += alpha * (reward + gamma * max_next_q - *q);
        *q
    }

    /// Iterate over `(state, action values)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Pos, &[f32])> + '_ {
        let cols = self.cols;
        self.values
            .chunks_exact(ACTIONS)
            .enumerate()
            .map(move |(i, v)| ((i / cols, i % cols), v))
    }
}

/// Configuration for the [`QTableAgent`]
pub struct QTableAgentConfig<D: Decay> {
    pub exploration: EpsilonGreedy<D>,
    /// Learning rate, expected in `[0,1]`
    pub alpha: f32,
    /// Discount factor, expected in `[0,1]`
    pub gamma: f32,
}

/// A Q-learning agent over a grid of [`Pos`] states and the four [`Action`]s
///
/// ### Generics
/// - `D` - The [`Decay`] schedule for the exploration rate
/// - `R` - The random source used for exploration; inject a seeded one for reproducible runs
pub struct QTableAgent<D: Decay, R: Rng> {
    q_table: QTable,
    exploration: EpsilonGreedy<D>,
    alpha: f32,   // learning rate
    gamma: f32,   // discount factor
    episode: u32, // current episode
    reward: f32,  // accumulated step reward
    rng: R,
}

impl<D: Decay, R: Rng> QTableAgent<D, R> {
    /// Initialize a new agent with a zeroed table of the given `(rows, columns)` shape
    ///
    /// **Panics** if `alpha` or `gamma` is not in the interval `[0,1]`
    pub fn new(shape: (usize, usize), config: QTableAgentConfig<D>, rng: R) -> Self {
        assert_interval!(config.alpha, 0.0, 1.0);
        assert_interval!(config.gamma, 0.0, 1.0);
        Self {
            q_table: QTable::new(shape),
            exploration: config.exploration,
            alpha: config.alpha,
            gamma: config.gamma,
            episode: 0,
            reward: 0.0,
            rng,
        }
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn into_q_table(self) -> QTable {
        self.q_table
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon(self.episode)
    }

    /// Pin the exploration rate; `0.0` makes [`choose_action`](Self::choose_action) purely greedy
    pub fn force_epsilon(&mut self, epsilon: f32) {
        self.exploration.force(epsilon);
    }

    pub fn episode(&self) -> u32 {
        self.episode
    }

    pub(crate) fn end_episode(&mut self) {
        self.episode += 1;
    }

    /// Step rewards accumulated since the last [`reset_reward`](Self::reset_reward)
    pub fn reward(&self) -> f32 {
        self.reward
    }

    pub fn reset_reward(&mut self) {
        self.reward = 0.0;
    }

    /// Choose an action for `state` with the epsilon greedy policy
    pub fn choose_action(&mut self, state: Pos) -> Action {
        match self.exploration.choose(self.episode, &mut self.rng) {
            Choice::Explore => Action::VARIANTS[self.rng.gen_range(0..ACTIONS)],
            Choice::Exploit => self.q_table.best_action(state),
        }
    }

    /// Learn from one transition and add its reward to the running total
    pub fn update(&mut self, state: Pos, action: Action, reward: f32, new_state: Pos) {
        self.reward += reward;
        self.q_table
            .update(state, action, reward, new_state, self.alpha, self.gamma);
    }
}
