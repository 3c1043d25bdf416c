use std::collections::VecDeque;

use super::metrics::MetricsSample;

fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Contrast curve for the HUD bars
pub fn amplify(value: f32, gain: f32, power: f32) -> f32 {
    let v = if value.is_finite() { value } else { 0.0 };
    clamp01(clamp01(v * gain).powf(power))
}

/// Metrics shaped to [0, 1] for display
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DisplayMetrics {
    pub entropy: f32,
    pub mixedness: f32,
    pub complexity: f32,
    pub kinetic: f32,
}

impl From<&MetricsSample> for DisplayMetrics {
    fn from(sample: &MetricsSample) -> Self {
        Self {
            entropy: amplify(sample.entropy, 1.15, 0.9),
            mixedness: amplify(sample.mixedness, 1.15, 0.9),
            complexity: amplify(sample.complexity, 2.2, 0.85),
            kinetic: amplify(sample.kinetic, 3.2, 0.7),
        }
    }
}

/// Ring buffer of recent display samples
pub struct MetricsHistory {
    samples: VecDeque<DisplayMetrics>,
    capacity: usize,
}

impl MetricsHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, sample: &MetricsSample) -> DisplayMetrics {
        let shaped = DisplayMetrics::from(sample);
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(shaped);
        shaped
    }

    pub fn latest(&self) -> Option<&DisplayMetrics> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayMetrics> {
        self.samples.iter()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Text sparkline of one series, newest on the right
    pub fn sparkline(&self, pick: impl Fn(&DisplayMetrics) -> f32, width: usize) -> String {
        const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
        let skip = self.samples.len().saturating_sub(width);
        self.samples
            .iter()
            .skip(skip)
            .map(|s| BARS[(clamp01(pick(s)) * 7.0).round() as usize])
            .collect()
    }
}
