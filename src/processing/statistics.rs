// STATISTICS COMPONENT --------------------------------------------------------

/// Running statistics over a stream of samples.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub sum: f64,
    pub sum_of_squares: f64,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_statistics(&mut self, sample: f64) {
        self.sum += sample;
        self.sum_of_squares += sample.powi(2);
        self.count += 1;

        self.mean = self.sum / self.count as f64;
        // Population variance; rounding can push it a hair below zero.
        let variance = (self.sum_of_squares / self.count as f64) - self.mean.powi(2);
        self.std_dev = variance.max(0.0).sqrt();

        self.min = Some(self.min.map_or(sample, |m| m.min(sample)));
        self.max = Some(self.max.map_or(sample, |m| m.max(sample)));
    }

    pub fn z_score(&self, sample: f64) -> f64 {
        if self.std_dev == 0.0 {
            return 0.0;
        }
        (sample - self.mean) / self.std_dev
    }
}
