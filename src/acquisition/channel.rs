// Colour channels, filter selection and RGB triples

use serde::{Deserialize, Serialize};

/// Primary colour, used both as a photodiode channel and a calibrated label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorLabel {
    Red,
    Green,
    Blue,
}

impl ColorLabel {
    /// Fixed channel order: sampling, calibration and tie-breaking all follow it
    pub const ALL: [ColorLabel; 3] = [ColorLabel::Red, ColorLabel::Green, ColorLabel::Blue];

    /// Filter selection that activates this colour's photodiodes
    pub fn filter(self) -> FilterSelect {
        match self {
            ColorLabel::Red => FilterSelect::RED,
            ColorLabel::Green => FilterSelect::GREEN,
            ColorLabel::Blue => FilterSelect::BLUE,
        }
    }

    /// Get human-readable name for display
    pub fn display_name(self) -> &'static str {
        match self {
            ColorLabel::Red => "RED",
            ColorLabel::Green => "GREEN",
            ColorLabel::Blue => "BLUE",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorLabel::Red => "red",
            ColorLabel::Green => "green",
            ColorLabel::Blue => "blue",
        }
    }
}

/// Levels of the S2/S3 filter-select lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterSelect {
    pub s2: bool,
    pub s3: bool,
}

impl FilterSelect {
    pub const RED: FilterSelect = FilterSelect::new(false, false);
    pub const BLUE: FilterSelect = FilterSelect::new(false, true);
    /// No filter. Present on the hardware, unused by the pipeline.
    pub const CLEAR: FilterSelect = FilterSelect::new(true, false);
    pub const GREEN: FilterSelect = FilterSelect::new(true, true);

    pub const fn new(s2: bool, s3: bool) -> Self {
        Self { s2, s3 }
    }

    /// Colour channel selected, `None` for the clear filter
    pub fn channel(self) -> Option<ColorLabel> {
        match (self.s2, self.s3) {
            (false, false) => Some(ColorLabel::Red),
            (true, true) => Some(ColorLabel::Green),
            (false, true) => Some(ColorLabel::Blue),
            (true, false) => None,
        }
    }
}

/// One non-negative value per colour channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelTriple {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ChannelTriple {
    pub const ZERO: ChannelTriple = ChannelTriple::new(0.0, 0.0, 0.0);

    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    pub fn get(&self, channel: ColorLabel) -> f64 {
        match channel {
            ColorLabel::Red => self.red,
            ColorLabel::Green => self.green,
            ColorLabel::Blue => self.blue,
        }
    }

    pub fn set(&mut self, channel: ColorLabel, value: f64) {
        match channel {
            ColorLabel::Red => self.red = value,
            ColorLabel::Green => self.green = value,
            ColorLabel::Blue => self.blue = value,
        }
    }

    /// Build a triple channel by channel
    pub fn from_fn(mut f: impl FnMut(ColorLabel) -> f64) -> Self {
        Self::new(
            f(ColorLabel::Red),
            f(ColorLabel::Green),
            f(ColorLabel::Blue),
        )
    }

    pub fn sum(&self) -> f64 {
        self.red + self.green + self.blue
    }

    /// Scale the channels into ratios summing to 1
    ///
    /// A triple summing to 0 (dark or faulty sensor) normalizes to all zeros.
    pub fn normalized(&self) -> ChannelTriple {
        let total = self.sum();
        if total == 0.0 {
            return ChannelTriple::ZERO;
        }
        Self::from_fn(|c| self.get(c) / total)
    }

    /// Channel-wise division, yielding 0 where the divisor channel is 0
    pub fn divide_by(&self, divisor: &ChannelTriple) -> ChannelTriple {
        Self::from_fn(|c| {
            let d = divisor.get(c);
            if d == 0.0 {
                0.0
            } else {
                self.get(c) / d
            }
        })
    }

    pub fn dot(&self, other: &ChannelTriple) -> f64 {
        ColorLabel::ALL
            .iter()
            .map(|&c| self.get(c) * other.get(c))
            .sum()
    }

    /// Euclidean length
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Cosine of the angle between two triples, 0 if either is the zero vector
    pub fn cosine_similarity(&self, other: &ChannelTriple) -> f64 {
        let denominator = self.norm() * other.norm();
        if denominator > 0.0 {
            self.dot(other) / denominator
        } else {
            0.0
        }
    }
}
