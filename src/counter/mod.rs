pub mod aggregate;
pub mod angle;
pub mod phase;
pub mod rep_counter;
pub mod state;
pub mod subject;

pub use aggregate::BilateralAngle;
pub use angle::knee_angle;
pub use phase::{SquatStateMachine, Transition};
pub use rep_counter::{FrameResult, RepCounter};
pub use state::RepCounterState;
pub use subject::SubjectTracker;
