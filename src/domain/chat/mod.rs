//! Chat history and session state

mod session;
mod turn;

pub use session::{ChatSession, PendingTurn};
pub use turn::{ChatTurn, RetrievalMetric, TurnRole};
