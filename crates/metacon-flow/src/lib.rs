mod variance;
mod observer;
mod reward;

pub use variance::VarianceTracker;
pub use observer::{IntervalObserver, SRTT_GAIN};
pub use reward::shaped_reward;
