// Acquisition - raw pulse sampling and RGB aggregation
//
// FrequencySampler turns one pulse on the sensor output into a raw reading.
// ChannelAggregator averages repeated interleaved readings per channel and
// normalizes them into ratios.

pub mod aggregator;
pub mod channel;
pub mod sampler;

pub use aggregator::ChannelAggregator;
pub use channel::{ChannelTriple, ColorLabel, FilterSelect};
pub use sampler::{FrequencySampler, RawSampler};
