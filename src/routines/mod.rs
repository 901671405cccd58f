// Iterate averaging
pub mod averaging;
// Duality gap and objective values
pub mod duality_gap;
// Closed-form step sizes
pub mod line_search;
// Routines for logging
pub mod logger;
// Per-pass observer hook
pub mod observer;
// Routines for output
pub mod output;
// Visiting order of the samples
pub mod sampling;
// Accuracy-like scores
pub mod scoring;
// Routines for settings
pub mod settings;
// Cooperative cancellation
pub mod stop;
