// ChannelAggregator - averaged and normalized RGB readings
//
// Channels are sampled interleaved (red, green, blue, red, ...) rather than
// batched, so slow drift or ambient flicker lands equally on all three.

use crate::acquisition::channel::{ChannelTriple, ColorLabel};
use crate::acquisition::sampler::RawSampler;
use crate::error::SensorError;

/// Collects repeated raw samples per channel and reduces them to one triple
pub struct ChannelAggregator<S: RawSampler> {
    sampler: S,
    samples_per_channel: usize,
}

impl<S: RawSampler> ChannelAggregator<S> {
    /// # Arguments
    /// * `sampler` - Raw reading source
    /// * `samples_per_channel` - Raw samples averaged per channel (default: 10)
    pub fn new(sampler: S, samples_per_channel: usize) -> Self {
        Self {
            sampler,
            samples_per_channel,
        }
    }

    /// Raw samples per channel, in acquisition order
    pub fn acquire_raw(&mut self) -> Result<[Vec<f64>; 3], SensorError> {
        let mut readings: [Vec<f64>; 3] = [
            Vec::with_capacity(self.samples_per_channel),
            Vec::with_capacity(self.samples_per_channel),
            Vec::with_capacity(self.samples_per_channel),
        ];

        for _ in 0..self.samples_per_channel {
            for (i, channel) in ColorLabel::ALL.iter().enumerate() {
                readings[i].push(self.sampler.sample(channel.filter())?);
            }
        }

        Ok(readings)
    }

    /// Per-channel arithmetic mean of the raw samples
    pub fn acquire_averaged(&mut self) -> Result<ChannelTriple, SensorError> {
        let readings = self.acquire_raw()?;
        let timeouts = readings.iter().flatten().filter(|&&r| r == 0.0).count();
        if timeouts > 0 {
            tracing::debug!(
                "[Aggregator] {} of {} raw samples timed out",
                timeouts,
                self.samples_per_channel * 3
            );
        }

        let averaged = ChannelTriple::new(
            mean(&readings[0]),
            mean(&readings[1]),
            mean(&readings[2]),
        );
        Ok(averaged)
    }

    /// Averaged reading scaled to ratios summing to 1 (all zero when dark)
    pub fn acquire_normalized(&mut self) -> Result<ChannelTriple, SensorError> {
        let averaged = self.acquire_averaged()?;
        Ok(averaged.normalized())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
