use log::{debug, info, warn};
use rand::Rng;
use thiserror::Error;

use super::q_table::{QTable, QTableAgent};
use crate::{
    decay::Decay,
    env::Environment,
    grid::{Action, Pos},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrainError {
    /// The agent failed to reach a terminal state within the per-episode step cap
    #[error("training did not converge: episode {episode} hit the {steps} step limit")]
    EpisodeStepLimit { episode: u32, steps: u64 },
}

/// Statistics for a single training episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeStats {
    pub steps: u64,
    pub reward: f32,
}

/// Totals for a call to [`Trainer::train`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainSummary {
    pub episodes: u32,
    pub total_steps: u64,
    /// Statistics of the final episode, if any ran
    pub last: Option<EpisodeStats>,
}

/// Runs episodes of Q-learning with a [`QTableAgent`]
///
/// Each episode starts from [`Environment::reset`] and ends when the environment becomes
/// inactive. An episode that runs for `max_episode_steps` transitions without terminating
/// aborts training with [`TrainError::EpisodeStepLimit`].
pub struct Trainer<D: Decay, R: Rng> {
    agent: QTableAgent<D, R>,
    max_episode_steps: u64,
}

impl<D: Decay, R: Rng> Trainer<D, R> {
    pub fn new(agent: QTableAgent<D, R>, max_episode_steps: u64) -> Self {
        Self {
            agent,
            max_episode_steps,
        }
    }

    pub fn agent(&self) -> &QTableAgent<D, R> {
        &self.agent
    }

    pub fn q_table(&self) -> &QTable {
        self.agent.q_table()
    }

    pub fn into_agent(self) -> QTableAgent<D, R> {
        self.agent
    }

    /// Run a single episode, updating the table after every transition
    pub fn run_episode<E>(&mut self, env: &mut E) -> Result<EpisodeStats, TrainError>
    where
        E: Environment<State = Pos, Action = Action>,
    {
        let mut state = env.reset();
        let mut stats = EpisodeStats {
            steps: 0,
            reward: 0.0,
        };

        while env.is_active() {
            if stats.steps >= self.max_episode_steps {
                return Err(TrainError::EpisodeStepLimit {
                    episode: self.agent.episode(),
                    steps: stats.steps,
                });
            }

            let action = self.agent.choose_action(state);
            let (new_state, reward) = env.step(action);
            self.agent.update(state, action, reward, new_state);
            state = new_state;

            stats.steps += 1;
            stats.reward += reward;
        }

        self.agent.end_episode();
        Ok(stats)
    }

    /// Train for `num_episodes` episodes
    ///
    /// Afterwards the accumulated reward is cleared and epsilon is forced to `0`, so any
    /// further action choices are purely greedy.
    pub fn train<E>(&mut self, env: &mut E, num_episodes: u32) -> Result<TrainSummary, TrainError>
    where
        E: Environment<State = Pos, Action = Action>,
    {
        info!("Training for {num_episodes} episodes");
        let mut summary = TrainSummary::default();

        for _ in 0..num_episodes {
            let stats = self.run_episode(env).inspect_err(|e| warn!("{e}"))?;
            debug!(
                "Episode {}: {} steps, reward {}",
                summary.episodes, stats.steps, stats.reward
            );
            summary.episodes += 1;
            summary.total_steps += stats.steps;
            summary.last = Some(stats);
        }

        env.reset();
        self.agent.reset_reward();
        self.agent.force_epsilon(0.0);

        info!(
            "Finished training: {} episodes, {} steps",
            summary.episodes, summary.total_steps
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        algo::q_table::QTableAgentConfig,
        decay::Constant,
        env::tests::{Corridor, Trap},
        exploration::EpsilonGreedy,
        grid::CostGrid,
        gym::Streets,
    };

    fn trainer(
        shape: (usize, usize),
        epsilon: f32,
        alpha: f32,
        gamma: f32,
        cap: u64,
    ) -> Trainer<Constant, StdRng> {
        let config = QTableAgentConfig {
            exploration: EpsilonGreedy::new(Constant::new(epsilon)),
            alpha,
            gamma,
        };
        Trainer::new(
            QTableAgent::new(shape, config, StdRng::seed_from_u64(1101)),
            cap,
        )
    }

    #[test]
    fn corridor_learns_to_go_right() {
        let mut env = Corridor::new(5);
        let mut trainer = trainer((1, 5), 0.3, 0.5, 0.9, 10_000);

        let summary = trainer.train(&mut env, 200).unwrap();
        assert_eq!(summary.episodes, 200);
        assert!(summary.total_steps >= 200 * 4);

        for col in 0..4 {
            assert_eq!(
                trainer.q_table().best_action((0, col)),
                Action::Right,
                "greedy at column {col}"
            );
        }
    }

    #[test]
    fn training_finishes_greedy_with_cleared_reward() {
        let mut env = Corridor::new(3);
        let mut trainer = trainer((1, 3), 0.4, 1.0, 1.0, 1000);
        trainer.train(&mut env, 10).unwrap();

        assert_eq!(trainer.agent().epsilon(), 0.0);
        assert_eq!(trainer.agent().reward(), 0.0);
        assert_eq!(trainer.agent().episode(), 10);
    }

    #[test]
    fn goal_values_never_updated() {
        let grid = CostGrid::new(vec![vec![0.0; 3]; 3], (0, 0), (2, 2))
            .unwrap()
            .with_goal_value(100.0);
        let mut env = Streets::new(grid);
        let mut trainer = trainer((3, 3), 0.4, 1.0, 0.9, 10_000);
        trainer.train(&mut env, 50).unwrap();

        assert_eq!(trainer.q_table().values((2, 2)), &[0.0; 4]);
    }

    #[test]
    fn step_limit_reports_non_convergence() {
        let mut trainer = trainer((1, 1), 0.2, 0.5, 0.5, 25);
        let err = trainer.train(&mut Trap, 3).unwrap_err();
        assert_eq!(
            err,
            TrainError::EpisodeStepLimit {
                episode: 0,
                steps: 25
            }
        );
    }

    #[test]
    fn seeded_training_is_reproducible() {
        let run = || {
            let grid = CostGrid::new(
                vec![vec![1.0, 3.0, 0.0], vec![2.0, -1.0, 1.0], vec![0.0, 0.0, 0.0]],
                (0, 0),
                (2, 2),
            )
            .unwrap();
            let mut trainer = trainer((3, 3), 0.4, 0.8, 0.9, 100_000);
            trainer.train(&mut Streets::new(grid), 100).unwrap();
            trainer.into_agent().into_q_table()
        };
        assert_eq!(run(), run());
    }
}
