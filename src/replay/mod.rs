//! Line protocol for replaying a learned route to a single external client

mod message;
mod session;

pub use message::{Framing, Message, ParseMessageError};
pub use session::{CancelToken, ReplayStreamer, SessionError, SessionState, SessionSummary};
