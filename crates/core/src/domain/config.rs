//! Equalizer presets
//!
//! This module provides:
//! - `EqualizerConfig`: stream parameters plus an ordered list of stages
//! - TOML serialization and async file load/save
//! - `PresetManager` for a directory of named presets

use crate::domain::audio::{AudioError, SampleFormat};
use crate::domain::equalizer::{BiquadDesign, Equalizer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument, Span};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Equalizer error: {0}")]
    Audio(#[from] AudioError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),
}

/// One stage of a preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Target channel (None = every channel)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<usize>,

    pub design: BiquadDesign,
}

/// Complete equalizer preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualizerConfig {
    /// Stream sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    /// Interleaved channel count
    #[serde(default = "default_channels")]
    pub channels: usize,

    /// Sample representation
    #[serde(default)]
    pub format: SampleFormat,

    /// Stages in processing order
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

fn default_sample_rate() -> f64 {
    Equalizer::DEFAULT_SAMPLE_RATE
}

fn default_channels() -> usize {
    Equalizer::DEFAULT_CHANNEL_COUNT
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            format: SampleFormat::default(),
            stages: Vec::new(),
        }
    }
}

impl EqualizerConfig {
    /// Reject values the equalizer would otherwise clamp silently
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.channels == 0 {
            return Err(ConfigError::Invalid("channel count must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading equalizer preset");

        let contents = fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&contents)?;

        debug!(stages = config.stages.len(), "Equalizer preset loaded");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving equalizer preset");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(path, self.to_toml_string()?).await?;

        debug!("Equalizer preset saved");
        Ok(())
    }

    /// Initialize `eq` with this preset, replacing its previous state
    pub fn apply_to(&self, eq: &mut Equalizer) -> Result<()> {
        self.validate()?;
        eq.initialize(self.sample_rate, self.channels, self.format)?;
        for stage in &self.stages {
            eq.add_stage(stage.channel, &stage.design)?;
        }
        Ok(())
    }

    /// Build an initialized equalizer logging under the default span
    pub fn build(&self) -> Result<Equalizer> {
        self.build_with_span(tracing::info_span!("equalizer"))
    }

    /// Build an initialized equalizer logging under `span`
    pub fn build_with_span(&self, span: Span) -> Result<Equalizer> {
        let mut eq = Equalizer::with_span(span);
        self.apply_to(&mut eq)?;
        Ok(eq)
    }
}

/// Preset manager
pub struct PresetManager {
    preset_dir: PathBuf,
}

impl PresetManager {
    /// Create a new preset manager
    pub fn new(preset_dir: PathBuf) -> Self {
        Self { preset_dir }
    }

    fn preset_path(&self, name: &str) -> PathBuf {
        self.preset_dir.join(format!("{}.toml", name))
    }

    /// List all available presets
    #[instrument(skip(self))]
    pub async fn list_presets(&self) -> Result<Vec<String>> {
        let mut presets = Vec::new();

        let mut entries = fs::read_dir(&self.preset_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "toml") {
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    presets.push(name.to_string());
                }
            }
        }

        presets.sort();
        debug!(count = presets.len(), "Listed presets");
        Ok(presets)
    }

    /// Load a preset by name
    #[instrument(skip(self))]
    pub async fn load_preset(&self, name: &str) -> Result<EqualizerConfig> {
        let path = self.preset_path(name);

        if !path.exists() {
            return Err(ConfigError::PresetNotFound(name.to_string()));
        }

        EqualizerConfig::load_from_file(&path).await
    }

    /// Save a preset by name
    #[instrument(skip(self, config))]
    pub async fn save_preset(&self, name: &str, config: &EqualizerConfig) -> Result<()> {
        config.save_to_file(self.preset_path(name)).await
    }

    /// Delete a preset by name
    #[instrument(skip(self))]
    pub async fn delete_preset(&self, name: &str) -> Result<()> {
        let path = self.preset_path(name);

        if !path.exists() {
            return Err(ConfigError::PresetNotFound(name.to_string()));
        }

        fs::remove_file(&path).await?;
        info!(name, "Preset deleted");
        Ok(())
    }

    /// Check if a preset exists
    pub async fn preset_exists(&self, name: &str) -> bool {
        self.preset_path(name).exists()
    }
}
