#![forbid(unsafe_code)]

/// Single-pass mean/variance with running extrema (Welford).
/// Used for per-interval RTT statistics.
#[derive(Debug, Clone, Default)]
pub struct VarianceTracker {
    count: u64,
    mean: f64,
    /// Sum of squared deviations from the running mean.
    m2: f64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
    min_seed: Option<f64>,
    max_seed: Option<f64>,
}

impl VarianceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the extrema. A seeded minimum only moves down, a seeded
    /// maximum only moves up, and `reset()` returns to the seed.
    pub fn with_bounds(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min,
            max,
            min_seed: min,
            max_seed: max,
            ..Self::default()
        }
    }

    pub fn update(&mut self, x: f64) {
        self.min = Some(match self.min { Some(m) => m.min(x), None => x });
        self.max = Some(match self.max { Some(m) => m.max(x), None => x });
        self.sum += x;

        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.mean = 0.0;
        self.m2 = 0.0;
        self.sum = 0.0;
        self.min = self.min_seed;
        self.max = self.max_seed;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// Sample variance (n - 1 denominator). Zero below two samples.
    pub fn variance(&self) -> f64 {
        if self.count < 2 { return 0.0; }
        self.m2 / (self.count - 1) as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn min(&self) -> f64 {
        self.min.unwrap_or(0.0)
    }

    pub fn max(&self) -> f64 {
        self.max.unwrap_or(0.0)
    }
}
