pub mod evaluator;
pub mod q_table;
pub mod trainer;

pub use evaluator::{Evaluator, Trajectory};
pub use q_table::{QTable, QTableAgent, QTableAgentConfig};
pub use trainer::{TrainError, TrainSummary, Trainer};
