use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    algo::{Evaluator, QTable, TrainError, TrainSummary, Trainer, Trajectory},
    config::SimulationConfig,
    decay::Decay,
    error::Error,
    grid::{CostGrid, Pos},
    gym::Streets,
    replay::{ReplayStreamer, SessionSummary},
};

/// Outcome of [`Simulation::run`]
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub training: TrainSummary,
    /// Reward collected along the replayed route
    pub route_reward: f32,
    /// Whether the replayed route ends at the goal
    pub reached_goal: bool,
    pub session: SessionSummary,
    /// The learned table, for inspection
    pub q_table: QTable,
}

/// Trains on a street grid, rolls out the learned route and replays it to one client
pub struct Simulation<D: Decay, R: Rng> {
    grid: CostGrid,
    closures: Vec<Pos>,
    trainer: Trainer<D, R>,
    evaluator: Evaluator,
    streamer: ReplayStreamer,
    train_episodes: u32,
}

impl Simulation<Box<dyn Decay>, StdRng> {
    /// Assemble a simulation from `config`, binding the streamer's socket
    pub fn from_config(config: &SimulationConfig, costs: Vec<Vec<f32>>) -> Result<Self, Error> {
        config.validate()?;
        let grid = config.grid(costs)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let trainer = config.trainer(grid.shape(), rng)?;
        let streamer = ReplayStreamer::bind(config.streamer.clone())?;
        Ok(Self::new(
            grid,
            trainer,
            config.evaluator(),
            streamer,
            config.train_episodes,
        )
        .with_closures(config.closures.clone()))
    }
}

impl<D: Decay, R: Rng> Simulation<D, R> {
    /// **Panics** if the trainer's table does not match the grid's shape
    pub fn new(
        grid: CostGrid,
        trainer: Trainer<D, R>,
        evaluator: Evaluator,
        streamer: ReplayStreamer,
        train_episodes: u32,
    ) -> Self {
        assert_eq!(
            trainer.q_table().shape(),
            grid.shape(),
            "Q-table shape must match the cost grid"
        );
        Self {
            grid,
            closures: Vec::new(),
            trainer,
            evaluator,
            streamer,
            train_episodes,
        }
    }

    /// Keep the streets at `closures` closed for every training episode and the rollout
    pub fn with_closures(mut self, closures: Vec<Pos>) -> Self {
        self.closures = closures;
        self
    }

    pub fn grid(&self) -> &CostGrid {
        &self.grid
    }

    pub fn streamer(&self) -> &ReplayStreamer {
        &self.streamer
    }

    /// Train the agent and roll out its greedy route without streaming it
    pub fn plan(&mut self) -> Result<(TrainSummary, Trajectory), TrainError> {
        let mut env = Streets::new(self.grid.clone()).with_closures(self.closures.clone());
        let training = self.trainer.train(&mut env, self.train_episodes)?;
        let trajectory = self.evaluator.evaluate(self.trainer.q_table(), &mut env);
        Ok((training, trajectory))
    }

    /// Plan a route and replay it to the first client that connects
    pub fn run(mut self) -> Result<SimulationReport, Error> {
        let (training, trajectory) = self.plan()?;
        let route_reward = trajectory.reward;
        let reached_goal = trajectory.last() == Some(self.grid.goal());
        info!(
            "Route of {} moves, reward {route_reward}, reached goal: {reached_goal}",
            trajectory.len()
        );

        let session = self.streamer.serve(trajectory)?;
        Ok(SimulationReport {
            training,
            route_reward,
            reached_goal,
            session,
            q_table: self.trainer.into_agent().into_q_table(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::{SocketAddr, TcpStream},
        thread,
        time::Duration,
    };

    use super::*;
    use crate::config::StreamerConfig;

    fn config() -> SimulationConfig {
        SimulationConfig {
            train_episodes: 300,
            alpha: 1.0,
            epsilon: 0.4,
            gamma: 0.9,
            start: (0, 0),
            goal: (2, 3),
            goal_value: 100.0,
            steps: 20,
            seed: Some(1101),
            streamer: StreamerConfig {
                addr: SocketAddr::from(([127, 0, 0, 1], 0)),
                pace: Duration::from_millis(1),
                accept_timeout: Some(Duration::from_secs(5)),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn costs() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 1.0, 1.0, 1.0],
            vec![0.0, -10.0, -10.0, 1.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ]
    }

    #[test]
    fn plan_is_reproducible_with_seed() {
        let plan = || {
            let mut sim = Simulation::from_config(&config(), costs()).unwrap();
            sim.plan().unwrap().1
        };
        let first = plan();
        assert_eq!(first, plan());
        assert_eq!(first.positions, [(1, 0), (2, 0), (2, 1), (2, 2), (2, 3)]);
    }

    #[test]
    fn run_replays_route_to_client() {
        let sim = Simulation::from_config(&config(), costs()).unwrap();
        let addr = sim.streamer().local_addr().unwrap();
        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            let mut query = [0u8; 2];
            stream.read_exact(&mut query).unwrap();
            stream.write_all(b"R").unwrap();
            let mut rest = String::new();
            stream.read_to_string(&mut rest).unwrap();
            rest
        });

        let report = sim.run().unwrap();
        let received = client.join().unwrap();

        assert_eq!(received, "M 0 1M 0 2M 1 2M 2 2M 3 2E");
        assert!(report.reached_goal);
        assert_eq!(report.route_reward, 100.0);
        assert_eq!(report.session.moves_sent, 5);
        assert_eq!(report.training.episodes, 300);
        assert_eq!(report.q_table.shape(), (3, 4));
    }

    #[test]
    fn closures_reroute_the_plan() {
        let config = SimulationConfig {
            closures: vec![(2, 1)],
            ..config()
        };
        let mut sim = Simulation::from_config(&config, costs()).unwrap();
        let (_, route) = sim.plan().unwrap();
        assert_eq!(route.positions, [(0, 1), (0, 2), (0, 3), (1, 3), (2, 3)]);
        assert_eq!(route.reward, 96.0);
    }

    #[test]
    fn decaying_epsilon_still_finds_route() {
        let config = SimulationConfig {
            epsilon: 1.0,
            epsilon_decay: 1e-2,
            epsilon_min: 0.1,
            ..config()
        };
        let mut sim = Simulation::from_config(&config, costs()).unwrap();
        let (_, route) = sim.plan().unwrap();
        assert_eq!(route.last(), Some((2, 3)));
        assert_eq!(route.reward, 100.0);
    }

    #[test]
    fn inverted_epsilon_schedule_is_rejected() {
        let config = SimulationConfig {
            epsilon: 0.1,
            epsilon_decay: 1e-2,
            epsilon_min: 0.5,
            ..config()
        };
        assert!(matches!(
            Simulation::from_config(&config, costs()),
            Err(Error::Decay(_))
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimulationConfig {
            alpha: 2.0,
            ..config()
        };
        assert!(matches!(
            Simulation::from_config(&config, costs()),
            Err(Error::Config(_))
        ));
    }
}
