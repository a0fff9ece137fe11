pub mod app;

pub use app::{LabelApp, StartupConfig};
