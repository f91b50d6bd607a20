/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time MDP with one agent
/// and a finite state space and action space.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State;

    /// A representation of an action that an agent can take to affect the environment
    type Action;

    /// Determine if the current state is active or terminal
    fn is_active(&self) -> bool;

    /// Update the environment in response to an action taken by an agent, producing a new state and associated reward
    ///
    /// **Returns** `(next_state, reward)`
    fn step(&mut self, action: Self::Action) -> (Self::State, f32);

    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::grid::{Action, Pos};

    /// A corridor `len` cells long; the agent starts at column 0 and the goal is the last
    /// column. Moving right pays `1.0` on arrival at the goal and `0.0` elsewhere; any
    /// other action leaves the agent in place and pays `-1.0`.
    pub struct Corridor {
        pub len: usize,
        pub pos: Pos,
    }

    impl Corridor {
        pub fn new(len: usize) -> Self {
            Self { len, pos: (0, 0) }
        }
    }

    impl Environment for Corridor {
        type State = Pos;
        type Action = Action;

        fn is_active(&self) -> bool {
            self.pos.1 != self.len - 1
        }

        fn step(&mut self, action: Action) -> (Pos, f32) {
            match action {
                Action::Right => {
                    self.pos.1 += 1;
                    let reward = if self.is_active() { 0.0 } else { 1.0 };
                    (self.pos, reward)
                }
                _ => (self.pos, -1.0),
            }
        }

        fn reset(&mut self) -> Pos {
            self.pos = (0, 0);
            self.pos
        }
    }

    /// An environment the agent can never leave
    pub struct Trap;

    impl Environment for Trap {
        type State = Pos;
        type Action = Action;

        fn is_active(&self) -> bool {
            true
        }

        fn step(&mut self, _action: Action) -> (Pos, f32) {
            ((0, 0), -1.0)
        }

        fn reset(&mut self) -> Pos {
            (0, 0)
        }
    }

    #[test]
    fn corridor_reaches_end() {
        let mut env = Corridor::new(3);
        assert_eq!(env.reset(), (0, 0));
        assert_eq!(env.step(Action::Left), ((0, 0), -1.0));
        assert_eq!(env.step(Action::Right), ((0, 1), 0.0));
        assert!(env.is_active());
        assert_eq!(env.step(Action::Right), ((0, 2), 1.0));
        assert!(!env.is_active());
    }
}
