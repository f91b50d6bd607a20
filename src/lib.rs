/// Q-learning: table, trainer and greedy evaluation
pub mod algo;

/// Simulation and streaming configuration
pub mod config;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Environment
pub mod env;

/// Crate level error type
pub mod error;

/// Exploration policies
pub mod exploration;

/// Street cost grids
pub mod grid;

/// Environments
pub mod gym;

/// Line protocol replay of a learned route over TCP
pub mod replay;

/// Train, evaluate and replay in one run
pub mod simulation;

mod util;

pub use error::Error;
pub use simulation::{Simulation, SimulationReport};
