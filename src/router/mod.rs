//! The routing core: event/action model, the decision policy, and the
//! pending-prompt tracker.

pub mod events;
pub mod policy;
pub mod prompt;
