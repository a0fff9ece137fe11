//! Types shared between the label workflow controller and its front-ends.

pub mod domain;
pub mod error;
pub mod protocol;
