use metacon_core::{BridgeError, BridgeResult};

/// Congestion window under external control.
///
/// INVARIANT: `current >= floor`, and the floor is the initial window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowState {
    initial: f64,
    current: f64,
}

impl WindowState {
    pub fn new(initial: f64) -> Self {
        Self { initial, current: initial }
    }

    pub fn initial(&self) -> f64 { self.initial }
    pub fn floor(&self) -> f64 { self.initial }
    pub fn current(&self) -> f64 { self.current }

    /// What `apply(action)` would set, without setting it.
    pub fn propose(&self, action: f64) -> BridgeResult<f64> {
        if !action.is_finite() {
            return Err(BridgeError::malformed(format!("non-finite action {}", action)));
        }
        let scaled = self.current * action.exp2();
        if scaled.is_nan() || scaled == f64::INFINITY {
            return Err(BridgeError::malformed(format!(
                "action {} overflows window {}",
                action, self.current
            )));
        }
        Ok(scaled.max(self.floor()))
    }

    /// `current = max(floor, current * 2^action)`.
    /// On error the window is unchanged.
    pub fn apply(&mut self, action: f64) -> BridgeResult<f64> {
        self.current = self.propose(action)?;
        Ok(self.current)
    }
}
