//! Lets an external decision process drive a sender's congestion window.
//!
//! `MetaConController` is handed to the transport as its congestion
//! controller. It folds every transport event into an
//! `IntervalObserver` and, once per cadence, trades the interval's
//! observation for an action over a `DecisionTransport`.

mod config;
mod controller;
pub mod decision;
pub mod window;

pub use config::ControllerConfig;
pub use controller::MetaConController;
pub use decision::{DecisionLoop, LoopState, LoopStats};
pub use window::WindowState;
