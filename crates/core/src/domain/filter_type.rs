//! Biquad filter shapes

use crate::domain::audio::AudioError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shape of a biquad stage derived from cutoff / Q / gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterType {
    /// Pass-through
    #[default]
    None,
    LowPass,
    HighPass,
    BandPass,
    Notch,
    /// Peaking band EQ
    Peak,
    LowShelf,
    HighShelf,
}

impl FilterType {
    /// All shapes, in their stable order
    pub const ALL: [FilterType; 8] = [
        FilterType::None,
        FilterType::LowPass,
        FilterType::HighPass,
        FilterType::BandPass,
        FilterType::Notch,
        FilterType::Peak,
        FilterType::LowShelf,
        FilterType::HighShelf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterType::None => "none",
            FilterType::LowPass => "low-pass",
            FilterType::HighPass => "high-pass",
            FilterType::BandPass => "band-pass",
            FilterType::Notch => "notch",
            FilterType::Peak => "peak",
            FilterType::LowShelf => "low-shelf",
            FilterType::HighShelf => "high-shelf",
        }
    }

    /// Look up a shape by name.
    ///
    /// Unknown names yield `(FilterType::None, false)`.
    pub fn parse(name: &str) -> (FilterType, bool) {
        Self::ALL
            .iter()
            .find(|filter| filter.name() == name)
            .map_or((FilterType::None, false), |&filter| (filter, true))
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterType {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::parse(s) {
            (filter, true) => Ok(filter),
            (_, false) => Err(AudioError::InvalidConfiguration(format!(
                "unknown filter type '{s}'"
            ))),
        }
    }
}
