use thiserror::Error;

/// An implementation of a time-decaying value
pub trait Decay {
    /// Calculate value at time `t`
    fn evaluate(&self, t: f32) -> f32;
}

impl<D: Decay + ?Sized> Decay for Box<D> {
    fn evaluate(&self, t: f32) -> f32 {
        (**self).evaluate(t)
    }
}

/// Rejected decay schedule parameters
#[derive(Debug, Clone, PartialEq, Error)]
#[error("`vi - vf` must have same sign as `rate` (rate {rate}, vi {vi}, vf {vf})")]
pub struct DecayError {
    pub rate: f32,
    pub vi: f32,
    pub vf: f32,
}

fn validate(rate: f32, vi: f32, vf: f32) -> Result<(), DecayError> {
    ((rate >= 0.0 && vi > vf) || (rate < 0.0 && vi < vf))
        .then_some(())
        .ok_or(DecayError { rate, vi, vf })
}

/// A constant value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constant {
    value: f32,
}

impl Constant {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f32) -> f32 {
        self.value
    }
}

/// v(t) = v<sub>f</sub> + (v<sub>i</sub> - v<sub>f</sub>) * e<sup>-rt</sup>
///
/// Useful for annealing exploration over the course of training, with `t` the episode index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exponential {
    rate: f32,
    vi: f32,
    vf: f32,
}

impl Exponential {
    pub fn new(rate: f32, vi: f32, vf: f32) -> Result<Self, DecayError> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for Exponential {
    fn evaluate(&self, t: f32) -> f32 {
        let &Self { rate, vi, vf } = self;
        vf + (vi - vf) * (-rate * t).exp()
    }
}
