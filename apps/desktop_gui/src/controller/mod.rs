//! Controller layer: backend events, intent-to-command orchestration.

pub mod events;
pub mod orchestration;
