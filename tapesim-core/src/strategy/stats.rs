//! Rolling-window statistics used by the bundled strategies.

use std::collections::VecDeque;

/// Rolling mean over a fixed window.
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl RollingMean {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self {
            window,
            values: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;
        if self.values.len() > self.window {
            if let Some(leaving) = self.values.pop_front() {
                self.sum -= leaving;
            }
        }
    }

    /// Mean of the values currently in the window; 0 while empty.
    pub fn value(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f64
        }
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.window
    }
}

/// Rolling population standard deviation over a fixed window.
#[derive(Debug, Clone)]
pub struct RollingStdDev {
    window: usize,
    values: VecDeque<f64>,
    sum: f64,
    sum_squares: f64,
}

impl RollingStdDev {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self {
            window,
            values: VecDeque::with_capacity(window),
            sum: 0.0,
            sum_squares: 0.0,
        }
    }

    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;
        self.sum_squares += value * value;
        if self.values.len() > self.window {
            if let Some(leaving) = self.values.pop_front() {
                self.sum -= leaving;
                self.sum_squares -= leaving * leaving;
            }
        }
    }

    pub fn value(&self) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        let mean = self.sum / n;
        // Guard the subtraction against tiny negative float residue.
        let variance = (self.sum_squares / n - mean * mean).max(0.0);
        variance.sqrt()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.window
    }
}
