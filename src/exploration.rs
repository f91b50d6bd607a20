use rand::Rng;

use crate::decay::Decay;

/// Exploration policy result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Explore,
    Exploit,
}

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
///
/// The threshold can be pinned with [`force`](EpsilonGreedy::force), which overrides the
/// decay schedule from then on.
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
    forced: Option<f32>,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self {
            epsilon: decay,
            forced: None,
        }
    }

    /// The exploration rate in effect for `episode`
    pub fn epsilon(&self, episode: u32) -> f32 {
        self.forced
            .unwrap_or_else(|| self.epsilon.evaluate(episode as f32))
    }

    /// Pin epsilon to a fixed value regardless of episode
    pub fn force(&mut self, epsilon: f32) {
        self.forced = Some(epsilon);
    }

    /// Invoke epsilon greedy policy for current episode
    ///
    /// Explores when a uniform draw from `[0, 1)` falls below epsilon, so an epsilon of `0`
    /// never explores.
    pub fn choose<R: Rng + ?Sized>(&self, episode: u32, rng: &mut R) -> Choice {
        if rng.gen::<f32>() < self.epsilon(episode) {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }
}
