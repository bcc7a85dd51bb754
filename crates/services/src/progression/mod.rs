mod tracker;

pub use tracker::{ProgressEvent, ProgressionTracker};
