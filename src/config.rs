use std::{net::SocketAddr, time::Duration};

use rand::Rng;
use thiserror::Error;

use crate::{
    algo::{Evaluator, QTableAgent, QTableAgentConfig, Trainer},
    decay::{Constant, Decay, DecayError, Exponential},
    exploration::EpsilonGreedy,
    grid::{CostGrid, GridError, Pos, DEFAULT_GOAL_VALUE, DEFAULT_PENALTY},
    replay::Framing,
    util::in_interval,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value {value} for `{name}`, must be in the interval [0, 1]")]
    OutOfInterval { name: &'static str, value: f32 },

    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
}

/// Socket settings for the [`ReplayStreamer`](crate::replay::ReplayStreamer)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamerConfig {
    /// Address to listen on
    ///
    /// **Default**: `127.0.0.1:1101`
    pub addr: SocketAddr,
    /// Delay after each movement message
    ///
    /// **Default**: `500ms`
    pub pace: Duration,
    /// How long to wait for a client, `None` to wait until cancelled
    ///
    /// **Default**: `None`
    pub accept_timeout: Option<Duration>,
    /// How long to wait for the client's acknowledgement, `None` to wait until cancelled
    ///
    /// **Default**: `30s`
    pub handshake_timeout: Option<Duration>,
    /// Socket write timeout while streaming
    ///
    /// **Default**: `10s`
    pub write_timeout: Option<Duration>,
    /// **Default**: [`Framing::Raw`]
    pub framing: Framing,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 1101)),
            pace: Duration::from_millis(500),
            accept_timeout: None,
            handshake_timeout: Some(Duration::from_secs(30)),
            write_timeout: Some(Duration::from_secs(10)),
            framing: Framing::Raw,
        }
    }
}

/// Every tunable of a [`Simulation`](crate::simulation::Simulation)
///
/// The defaults reproduce the reference street map run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Number of training episodes
    pub train_episodes: u32,
    /// Learning rate
    pub alpha: f32,
    /// Exploration rate during training; forced to `0` afterwards
    pub epsilon: f32,
    /// Per-episode exponential decay rate of `epsilon`, `0` to keep it constant
    pub epsilon_decay: f32,
    /// Value `epsilon` decays towards when `epsilon_decay` is non-zero
    pub epsilon_min: f32,
    /// Discount factor
    pub gamma: f32,
    pub start: Pos,
    pub goal: Pos,
    /// Reward for reaching the goal
    pub goal_value: f32,
    /// Reward for entering a closed road or building, or bumping into the map edge
    pub penalty: f32,
    /// Streets closed for the whole run, re-applied after every environment reset
    pub closures: Vec<Pos>,
    /// Step cap for the greedy rollout
    pub steps: usize,
    /// Step cap for a single training episode
    pub max_episode_steps: u64,
    /// Seed for the exploration RNG, `None` to seed from the OS
    pub seed: Option<u64>,
    pub streamer: StreamerConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            train_episodes: 1000,
            alpha: 1.0,
            epsilon: 0.4,
            epsilon_decay: 0.0,
            epsilon_min: 0.0,
            gamma: 1.0,
            start: (0, 6),
            goal: (21, 18),
            goal_value: DEFAULT_GOAL_VALUE,
            penalty: DEFAULT_PENALTY,
            closures: Vec::new(),
            steps: 100,
            max_episode_steps: 100_000,
            seed: None,
            streamer: StreamerConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("epsilon", self.epsilon),
            ("epsilon_min", self.epsilon_min),
            ("gamma", self.gamma),
        ] {
            if !in_interval(value, 0.0, 1.0) {
                return Err(ConfigError::OutOfInterval { name, value });
            }
        }
        if self.steps == 0 {
            return Err(ConfigError::Zero("steps"));
        }
        if self.max_episode_steps == 0 {
            return Err(ConfigError::Zero("max_episode_steps"));
        }
        if self.streamer.accept_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Zero("streamer.accept_timeout"));
        }
        if self.streamer.handshake_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Zero("streamer.handshake_timeout"));
        }
        if self.streamer.write_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Zero("streamer.write_timeout"));
        }
        Ok(())
    }

    /// Build the cost grid for `costs` with this configuration's start, goal and rewards
    ///
    /// Fails if any of `closures` lies outside the grid.
    pub fn grid(&self, costs: Vec<Vec<f32>>) -> Result<CostGrid, GridError> {
        let grid = CostGrid::new(costs, self.start, self.goal)?
            .with_goal_value(self.goal_value)
            .with_penalty(self.penalty);
        if let Some(&pos) = self.closures.iter().find(|&&pos| !grid.contains(pos)) {
            let (rows, cols) = grid.shape();
            return Err(GridError::OutOfBounds {
                what: "closure",
                pos,
                rows,
                cols,
            });
        }
        Ok(grid)
    }

    /// The exploration schedule: constant `epsilon`, or an exponential decay towards
    /// `epsilon_min` when `epsilon_decay` is non-zero
    pub fn epsilon_schedule(&self) -> Result<Box<dyn Decay>, DecayError> {
        if self.epsilon_decay == 0.0 {
            return Ok(Box::new(Constant::new(self.epsilon)));
        }
        Ok(Box::new(Exponential::new(
            self.epsilon_decay,
            self.epsilon,
            self.epsilon_min,
        )?))
    }

    pub fn agent_config(&self) -> Result<QTableAgentConfig<Box<dyn Decay>>, DecayError> {
        Ok(QTableAgentConfig {
            exploration: EpsilonGreedy::new(self.epsilon_schedule()?),
            alpha: self.alpha,
            gamma: self.gamma,
        })
    }

    /// A trainer with a fresh table for a grid of the given `(rows, columns)` shape
    pub fn trainer<R: Rng>(
        &self,
        shape: (usize, usize),
        rng: R,
    ) -> Result<Trainer<Box<dyn Decay>, R>, DecayError> {
        Ok(Trainer::new(
            QTableAgent::new(shape, self.agent_config()?, rng),
            self.max_episode_steps,
        ))
    }

    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let config = SimulationConfig::default();
        assert_eq!(config.train_episodes, 1000);
        assert_eq!((config.alpha, config.epsilon, config.gamma), (1.0, 0.4, 1.0));
        assert_eq!((config.start, config.goal), ((0, 6), (21, 18)));
        assert_eq!(config.goal_value, 1000.0);
        assert_eq!(config.steps, 100);
        assert_eq!(config.streamer.addr.to_string(), "127.0.0.1:1101");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let config = SimulationConfig {
            gamma: 1.5,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::OutOfInterval {
                name: "gamma",
                value: 1.5
            })
        );

        let config = SimulationConfig {
            max_episode_steps: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Zero("max_episode_steps")));
    }

    #[test]
    fn validate_rejects_zero_rollout_steps() {
        let config = SimulationConfig {
            steps: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Zero("steps")));
    }

    #[test]
    fn validate_rejects_zero_timeouts() {
        let with = |streamer| SimulationConfig {
            streamer,
            ..Default::default()
        };

        let config = with(StreamerConfig {
            accept_timeout: Some(Duration::ZERO),
            ..Default::default()
        });
        assert_eq!(config.validate(), Err(ConfigError::Zero("streamer.accept_timeout")));

        let config = with(StreamerConfig {
            handshake_timeout: Some(Duration::ZERO),
            ..Default::default()
        });
        assert_eq!(config.validate(), Err(ConfigError::Zero("streamer.handshake_timeout")));

        let config = with(StreamerConfig {
            write_timeout: Some(Duration::ZERO),
            ..Default::default()
        });
        assert_eq!(config.validate(), Err(ConfigError::Zero("streamer.write_timeout")));

        let config = with(StreamerConfig {
            accept_timeout: None,
            handshake_timeout: None,
            write_timeout: None,
            ..Default::default()
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn epsilon_schedule_follows_decay_rate() {
        let constant = SimulationConfig::default().epsilon_schedule().unwrap();
        assert_eq!(constant.evaluate(500.0), 0.4);

        let config = SimulationConfig {
            epsilon: 1.0,
            epsilon_decay: 1e-2,
            epsilon_min: 0.05,
            ..Default::default()
        };
        let decaying = config.epsilon_schedule().unwrap();
        assert_eq!(decaying.evaluate(0.0), 1.0);
        assert!(decaying.evaluate(100.0) < 0.5);

        let inverted = SimulationConfig {
            epsilon: 0.1,
            epsilon_decay: 1e-2,
            epsilon_min: 0.5,
            ..Default::default()
        };
        assert!(inverted.epsilon_schedule().is_err());
    }

    #[test]
    fn grid_uses_configured_rewards() {
        let config = SimulationConfig {
            start: (0, 0),
            goal: (0, 1),
            goal_value: 10.0,
            penalty: -5.0,
            ..Default::default()
        };
        let grid = config.grid(vec![vec![-1.0, 3.0]]).unwrap();
        assert_eq!(grid.reward((0, 1)), 10.0);
        assert_eq!(grid.reward((0, 0)), -5.0);

        assert!(SimulationConfig::default().grid(vec![vec![0.0]]).is_err());
    }

    #[test]
    fn grid_rejects_closures_outside_map() {
        let config = SimulationConfig {
            start: (0, 0),
            goal: (0, 1),
            closures: vec![(0, 1), (3, 0)],
            ..Default::default()
        };
        assert_eq!(
            config.grid(vec![vec![0.0, 0.0]]),
            Err(GridError::OutOfBounds {
                what: "closure",
                pos: (3, 0),
                rows: 1,
                cols: 2
            })
        );
    }
}
