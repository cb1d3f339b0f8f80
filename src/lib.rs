pub mod config;
pub mod counter;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod pose;
pub mod replay;
pub mod session;

pub use counter::{FrameResult, RepCounter, RepCounterState};
pub use error::CounterError;
