//! Crate level error type

use thiserror::Error;

use crate::{
    algo::TrainError, config::ConfigError, decay::DecayError, grid::GridError,
    replay::SessionError,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid exploration schedule: {0}")]
    Decay(#[from] DecayError),

    #[error("invalid cost grid: {0}")]
    Grid(#[from] GridError),

    #[error(transparent)]
    Train(#[from] TrainError),

    #[error("replay session failed: {0}")]
    Session(#[from] SessionError),
}
