//! Multi-channel biquad equalizer
//!
//! Two layers:
//! - [`ChannelEqualizer<T>`]: per-channel cascades of [`BiquadStage<T>`],
//!   monomorphized for one numeric representation.
//! - [`Equalizer`]: front door that picks the representation from a
//!   [`SampleFormat`] at initialization and forwards every call to it.
//!
//! Buffers are interleaved frames: sample `c` of frame `n` lives at index
//! `n * channels + c`. Within a channel, stages run in insertion order and
//! each stage consumes the previous stage's output.

use crate::domain::audio::{AudioError, Result, SampleFormat};
use crate::domain::biquad::{BiquadCoefficients, BiquadStage, ResponseScale};
use crate::domain::filter_type::FilterType;
use crate::domain::sample::{
    Int16On32Sample, Int16Sample, Int24On32Sample, Int32On64Sample, Int32Sample, Int8On16Sample,
    Int8Sample, Sample,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use tracing::{debug, error, info, info_span, trace, warn, Span};

/// How a new stage obtains its coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "kebab-case")]
pub enum BiquadDesign {
    /// Raw direct-form coefficients, stored verbatim
    Coefficients(BiquadCoefficients),
    /// Named shape, derived with the equalizer's sample rate
    Shape {
        filter: FilterType,
        cutoff: f64,
        quality: f64,
        gain_db: f64,
    },
}

impl BiquadDesign {
    /// Build a stage in representation `T`
    pub fn build<T: Sample>(&self, sample_rate: f64) -> BiquadStage<T> {
        match *self {
            BiquadDesign::Coefficients(coeffs) => BiquadStage::new(coeffs.cast()),
            BiquadDesign::Shape {
                filter,
                cutoff,
                quality,
                gain_db,
            } => BiquadStage::from_filter_type(filter, cutoff, quality, gain_db, sample_rate),
        }
    }
}

// ============================================================================
// CHANNEL EQUALIZER
// ============================================================================

/// Per-channel biquad cascades over samples of type `T`
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEqualizer<T: Sample> {
    sample_rate: f64,
    channel_count: usize,
    cascades: Vec<Vec<BiquadStage<T>>>,
}

impl<T: Sample> ChannelEqualizer<T> {
    pub fn new(sample_rate: f64, channel_count: usize) -> Self {
        let mut eq = Self {
            sample_rate,
            channel_count: 0,
            cascades: Vec::new(),
        };
        eq.initialize(sample_rate, channel_count);
        eq
    }

    /// Store stream parameters and replace every cascade with an empty one
    ///
    /// A channel count of zero is raised to one.
    pub fn initialize(&mut self, sample_rate: f64, channel_count: usize) {
        self.sample_rate = sample_rate;
        self.channel_count = channel_count.max(1);
        self.cascades = vec![Vec::new(); self.channel_count];
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Stages of one channel, in processing order
    pub fn cascade(&self, channel: usize) -> Option<&[BiquadStage<T>]> {
        self.cascades.get(channel).map(Vec::as_slice)
    }

    /// Clear the history of every stage; coefficients are kept
    pub fn reset_history(&mut self) {
        self.cascades
            .iter_mut()
            .flatten()
            .for_each(BiquadStage::reset_history);
    }

    /// Append one stage to every channel
    pub fn add_stage_to_all_channels(&mut self, design: &BiquadDesign) {
        let stage = design.build::<T>(self.sample_rate);
        for cascade in &mut self.cascades {
            cascade.push(stage.clone());
        }
    }

    /// Append one stage to a single channel
    ///
    /// An out-of-range index is ignored.
    pub fn add_stage_to_channel(&mut self, channel: usize, design: &BiquadDesign) {
        let sample_rate = self.sample_rate;
        if let Some(cascade) = self.cascades.get_mut(channel) {
            cascade.push(design.build::<T>(sample_rate));
        }
    }

    fn check_len(&self, len: usize, frames: usize) -> Result<()> {
        match frames.checked_mul(self.channel_count) {
            Some(needed) if len >= needed => Ok(()),
            Some(needed) => Err(AudioError::BufferTooShort { needed, actual: len }),
            None => Err(AudioError::BufferTooShort {
                needed: usize::MAX,
                actual: len,
            }),
        }
    }

    /// Filter `frames` interleaved frames from `input` into `output`
    pub fn process(&mut self, output: &mut [T], input: &[T], frames: usize) -> Result<()> {
        self.check_len(input.len(), frames)?;
        self.check_len(output.len(), frames)?;
        if frames == 0 {
            return Ok(());
        }

        let stride = self.channel_count;
        for (channel, cascade) in self.cascades.iter_mut().enumerate() {
            let input = &input[channel..];
            let output = &mut output[channel..];
            match cascade.split_first_mut() {
                Some((first, rest)) => {
                    first.process_buffer(input, output, frames, stride, stride);
                    for stage in rest {
                        stage.process_in_place(output, frames, stride);
                    }
                }
                None => {
                    // Empty cascade: the channel passes through unchanged
                    let samples = input.iter().step_by(stride).take(frames);
                    for (out, &sample) in output.iter_mut().step_by(stride).zip(samples) {
                        *out = sample;
                    }
                }
            }
        }
        Ok(())
    }

    /// Filter `frames` interleaved frames of `buffer` in place
    pub fn process_in_place(&mut self, buffer: &mut [T], frames: usize) -> Result<()> {
        self.check_len(buffer.len(), frames)?;
        if frames == 0 {
            return Ok(());
        }

        let stride = self.channel_count;
        for (channel, cascade) in self.cascades.iter_mut().enumerate() {
            let samples = &mut buffer[channel..];
            for stage in cascade {
                stage.process_in_place(samples, frames, stride);
            }
        }
        Ok(())
    }

    /// Combined theoretical response of channel 0's cascade
    ///
    /// Stage responses are summed point-wise in dB, i.e. magnitudes are
    /// multiplied. Empty when channel 0 has no stage.
    pub fn theoretical_response(&self) -> Vec<(f32, f32)> {
        self.theoretical_response_with_scale(ResponseScale::Linear)
    }

    /// Combined response of channel 0's cascade on the given frequency axis
    pub fn theoretical_response_with_scale(&self, scale: ResponseScale) -> Vec<(f32, f32)> {
        let mut stages = self.cascades.first().into_iter().flatten();
        let Some(first) = stages.next() else {
            return Vec::new();
        };
        let mut combined = first.theoretical_response_with_scale(self.sample_rate, scale);
        for stage in stages {
            let response = stage.theoretical_response_with_scale(self.sample_rate, scale);
            for (total, (_, db)) in combined.iter_mut().zip(response) {
                total.1 += db;
            }
        }
        combined
    }
}

/// Capability the [`Equalizer`] front door drives, implemented once per
/// numeric representation by [`ChannelEqualizer<T>`]
pub trait EqualizerKernel: Send {
    /// Representation the kernel computes in
    fn sample_format(&self) -> SampleFormat;
    fn sample_rate(&self) -> f64;
    fn channel_count(&self) -> usize;
    /// Number of stages on a channel, `None` if the channel does not exist
    fn stage_count(&self, channel: usize) -> Option<usize>;
    fn reset_history(&mut self);
    fn add_stage_to_all_channels(&mut self, design: &BiquadDesign);
    fn add_stage_to_channel(&mut self, channel: usize, design: &BiquadDesign);
    fn theoretical_response_with_scale(&self, scale: ResponseScale) -> Vec<(f32, f32)>;
    /// Typed access for buffer processing
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Sample> EqualizerKernel for ChannelEqualizer<T> {
    fn sample_format(&self) -> SampleFormat {
        T::FORMAT
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn stage_count(&self, channel: usize) -> Option<usize> {
        self.cascades.get(channel).map(Vec::len)
    }

    fn reset_history(&mut self) {
        ChannelEqualizer::reset_history(self);
    }

    fn add_stage_to_all_channels(&mut self, design: &BiquadDesign) {
        ChannelEqualizer::add_stage_to_all_channels(self, design);
    }

    fn add_stage_to_channel(&mut self, channel: usize, design: &BiquadDesign) {
        ChannelEqualizer::add_stage_to_channel(self, channel, design);
    }

    fn theoretical_response_with_scale(&self, scale: ResponseScale) -> Vec<(f32, f32)> {
        ChannelEqualizer::theoretical_response_with_scale(self, scale)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// EQUALIZER FRONT DOOR
// ============================================================================

/// Format-erased equalizer
///
/// Every operation other than `initialize` and the format queries fails with
/// [`AudioError::NotInitialized`] (and is logged) until `initialize`
/// succeeds. Diagnostics are emitted under the span given to
/// [`Equalizer::with_span`].
pub struct Equalizer {
    kernel: Option<Box<dyn EqualizerKernel>>,
    format: SampleFormat,
    span: Span,
}

impl Default for Equalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Equalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Equalizer")
            .field("initialized", &self.is_initialized())
            .field("format", &self.format)
            .field("sample_rate", &self.sample_rate())
            .field("channel_count", &self.channel_count())
            .finish()
    }
}

impl Equalizer {
    pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;
    pub const DEFAULT_CHANNEL_COUNT: usize = 2;

    /// Create an uninitialized equalizer logging under `equalizer`
    pub fn new() -> Self {
        Self::with_span(info_span!("equalizer"))
    }

    /// Create an uninitialized equalizer logging under `span`
    pub fn with_span(span: Span) -> Self {
        Self {
            kernel: None,
            format: SampleFormat::Unknown,
            span,
        }
    }

    /// Bind the equalizer to a stream, discarding any previous cascades
    ///
    /// `SampleFormat::Int64` runs on the int32-on-int64 representation.
    /// `SampleFormat::Unknown` leaves the equalizer uninitialized.
    pub fn initialize(
        &mut self,
        sample_rate: f64,
        channel_count: usize,
        format: SampleFormat,
    ) -> Result<()> {
        if channel_count == 0 {
            warn!(parent: &self.span, "Channel count 0 raised to 1");
        }

        let kernel: Box<dyn EqualizerKernel> = match format {
            SampleFormat::Double => {
                Box::new(ChannelEqualizer::<f64>::new(sample_rate, channel_count))
            }
            SampleFormat::Float => {
                Box::new(ChannelEqualizer::<f32>::new(sample_rate, channel_count))
            }
            SampleFormat::Int8 => {
                Box::new(ChannelEqualizer::<Int8Sample>::new(sample_rate, channel_count))
            }
            SampleFormat::Int8On16 => {
                Box::new(ChannelEqualizer::<Int8On16Sample>::new(sample_rate, channel_count))
            }
            SampleFormat::Int16 => {
                Box::new(ChannelEqualizer::<Int16Sample>::new(sample_rate, channel_count))
            }
            SampleFormat::Int16On32 => {
                Box::new(ChannelEqualizer::<Int16On32Sample>::new(sample_rate, channel_count))
            }
            SampleFormat::Int24On32 => {
                Box::new(ChannelEqualizer::<Int24On32Sample>::new(sample_rate, channel_count))
            }
            SampleFormat::Int32 => {
                Box::new(ChannelEqualizer::<Int32Sample>::new(sample_rate, channel_count))
            }
            SampleFormat::Int32On64 | SampleFormat::Int64 => {
                Box::new(ChannelEqualizer::<Int32On64Sample>::new(sample_rate, channel_count))
            }
            SampleFormat::Unknown => {
                error!(
                    parent: &self.span,
                    severity = "critical",
                    %format,
                    "Requested equalizer format does not exist"
                );
                self.kernel = None;
                self.format = SampleFormat::Unknown;
                return Err(AudioError::UnsupportedFormat(format));
            }
        };

        info!(
            parent: &self.span,
            sample_rate,
            channels = kernel.channel_count(),
            %format,
            "Equalizer initialized"
        );
        self.kernel = Some(kernel);
        self.format = format;
        Ok(())
    }

    /// Initialize with 48 kHz, stereo, float
    pub fn initialize_default(&mut self) -> Result<()> {
        self.initialize(Self::DEFAULT_SAMPLE_RATE, Self::DEFAULT_CHANNEL_COUNT, SampleFormat::Float)
    }

    pub fn is_initialized(&self) -> bool {
        self.kernel.is_some()
    }

    /// Format requested at initialization (`Unknown` before)
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn sample_rate(&self) -> Option<f64> {
        self.kernel.as_ref().map(|k| k.sample_rate())
    }

    pub fn channel_count(&self) -> Option<usize> {
        self.kernel.as_ref().map(|k| k.channel_count())
    }

    /// Number of stages on `channel`
    pub fn stage_count(&self, channel: usize) -> Option<usize> {
        self.kernel.as_ref().and_then(|k| k.stage_count(channel))
    }

    /// Formats accepted by `process`
    ///
    /// Reserved for automatic conversion; currently the native set.
    pub fn supported_formats(&self) -> Vec<SampleFormat> {
        self.native_supported_formats()
    }

    /// Formats processed without any conversion
    pub fn native_supported_formats(&self) -> Vec<SampleFormat> {
        vec![SampleFormat::Float]
    }

    fn kernel_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut (dyn EqualizerKernel + 'static)> {
        let span = &self.span;
        match self.kernel.as_deref_mut() {
            Some(kernel) => Ok(kernel),
            None => {
                error!(parent: span, operation, "Equalizer is not initialized");
                Err(AudioError::NotInitialized)
            }
        }
    }

    fn typed_kernel<T: Sample>(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut ChannelEqualizer<T>> {
        let expected = self.format;
        let found = T::FORMAT;
        let span = self.span.clone();
        let kernel = self.kernel_mut(operation)?;
        kernel.as_any_mut().downcast_mut::<ChannelEqualizer<T>>().ok_or_else(|| {
            error!(parent: &span, operation, %expected, %found, "Sample format mismatch");
            AudioError::FormatMismatch { expected, found }
        })
    }

    /// Clear the history of every stage
    pub fn reset(&mut self) -> Result<()> {
        self.kernel_mut("reset")?.reset_history();
        debug!(parent: &self.span, "Equalizer history reset");
        Ok(())
    }

    /// Filter `frames` interleaved frames from `input` into `output`
    ///
    /// `T` must be the representation bound at initialization.
    pub fn process<T: Sample>(
        &mut self,
        output: &mut [T],
        input: &[T],
        frames: usize,
    ) -> Result<()> {
        trace!(parent: &self.span, frames, "process");
        self.typed_kernel::<T>("process")?.process(output, input, frames)
    }

    /// Filter `frames` interleaved frames of `buffer` in place
    pub fn process_in_place<T: Sample>(&mut self, buffer: &mut [T], frames: usize) -> Result<()> {
        trace!(parent: &self.span, frames, "process in place");
        self.typed_kernel::<T>("process_in_place")?.process_in_place(buffer, frames)
    }

    /// Append a stage to every channel, or to `channel` only
    ///
    /// A channel index past the last channel is accepted and ignored.
    pub fn add_stage(&mut self, channel: Option<usize>, design: &BiquadDesign) -> Result<()> {
        let kernel = self.kernel_mut("add_biquad")?;
        match channel {
            Some(index) => kernel.add_stage_to_channel(index, design),
            None => kernel.add_stage_to_all_channels(design),
        }
        debug!(parent: &self.span, ?channel, ?design, "Biquad added");
        Ok(())
    }

    /// Append a stage with raw coefficients to every channel
    pub fn add_biquad_coefficients(
        &mut self,
        a0: f64,
        a1: f64,
        a2: f64,
        b0: f64,
        b1: f64,
    ) -> Result<()> {
        self.add_stage(
            None,
            &BiquadDesign::Coefficients(BiquadCoefficients::new(a0, a1, a2, b0, b1)),
        )
    }

    /// Append a stage with raw coefficients to one channel
    pub fn add_biquad_coefficients_to_channel(
        &mut self,
        channel: usize,
        a0: f64,
        a1: f64,
        a2: f64,
        b0: f64,
        b1: f64,
    ) -> Result<()> {
        self.add_stage(
            Some(channel),
            &BiquadDesign::Coefficients(BiquadCoefficients::new(a0, a1, a2, b0, b1)),
        )
    }

    /// Append a named-shape stage to every channel
    ///
    /// # Parameters
    /// - `cutoff`: Hz, clamped to `[0, sample_rate / 2]`
    /// - `quality`: Q factor, at least 0.01 (0.707 keeps the passband flat)
    /// - `gain_db`: used by peak and shelf shapes
    pub fn add_biquad(
        &mut self,
        filter: FilterType,
        cutoff: f64,
        quality: f64,
        gain_db: f64,
    ) -> Result<()> {
        self.add_stage(
            None,
            &BiquadDesign::Shape {
                filter,
                cutoff,
                quality,
                gain_db,
            },
        )
    }

    /// Append a named-shape stage to one channel
    pub fn add_biquad_to_channel(
        &mut self,
        channel: usize,
        filter: FilterType,
        cutoff: f64,
        quality: f64,
        gain_db: f64,
    ) -> Result<()> {
        self.add_stage(
            Some(channel),
            &BiquadDesign::Shape {
                filter,
                cutoff,
                quality,
                gain_db,
            },
        )
    }

    /// Theoretical `(frequency_hz, gain_db)` response of channel 0
    ///
    /// Empty when uninitialized or when channel 0 has no stage.
    pub fn calculate_theory(&self) -> Vec<(f32, f32)> {
        self.calculate_theory_with_scale(ResponseScale::Linear)
    }

    /// Like [`Equalizer::calculate_theory`], on the given frequency axis
    pub fn calculate_theory_with_scale(&self, scale: ResponseScale) -> Vec<(f32, f32)> {
        match &self.kernel {
            Some(kernel) => kernel.theoretical_response_with_scale(scale),
            None => {
                error!(
                    parent: &self.span,
                    operation = "calculate_theory",
                    "Equalizer is not initialized"
                );
                Vec::new()
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
