//! Domain entities and business rules

pub mod audio;
pub mod sample;
pub mod filter_type;
pub mod biquad;
pub mod equalizer;
pub mod config;

pub use audio::{AudioError, SampleFormat};
pub use biquad::{BiquadCoefficients, BiquadStage, ResponseScale};
pub use config::{ConfigError, EqualizerConfig, PresetManager, StageConfig};
pub use equalizer::{BiquadDesign, ChannelEqualizer, Equalizer, EqualizerKernel};
pub use filter_type::FilterType;
pub use sample::{
    Int16On32Sample, Int16Sample, Int24On32Sample, Int32On64Sample, Int32Sample, Int8On16Sample,
    Int8Sample, Sample,
};
