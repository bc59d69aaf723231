//! Biquad filter stage (second-order IIR section)
//!
//! Coefficient derivation follows the bilinear-transform cookbook formulas:
//! - <http://www.musicdsp.org/files/Audio-EQ-Cookbook.txt>
//! - <http://www.earlevel.com/main/2013/10/13/biquad-calculator-v2/>
//!
//! Naming: `a0..a2` are the feed-forward (numerator) coefficients and
//! `b0, b1` the feedback (denominator) coefficients, the leading denominator
//! coefficient being normalized to 1.

use crate::domain::filter_type::FilterType;
use crate::domain::sample::Sample;
use serde::{Deserialize, Serialize};
use std::f64::consts::{LN_10, PI, SQRT_2};

/// Number of points produced by a theoretical response evaluation
pub const RESPONSE_POINTS: usize = 512;

/// Lowest gain reported by a theoretical response, in dB
pub const RESPONSE_FLOOR_DB: f64 = -200.0;

/// Smallest accepted quality factor
pub const MIN_QUALITY_FACTOR: f64 = 0.01;

/// Direct-form biquad coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoefficients<T = f64> {
    pub a0: T,
    pub a1: T,
    pub a2: T,
    pub b0: T,
    pub b1: T,
}

impl<T: Sample> Default for BiquadCoefficients<T> {
    fn default() -> Self {
        // Unity gain (pass-through)
        Self {
            a0: T::from_f64(1.0),
            a1: T::default(),
            a2: T::default(),
            b0: T::default(),
            b1: T::default(),
        }
    }
}

impl<T: Sample> BiquadCoefficients<T> {
    pub fn new(a0: T, a1: T, a2: T, b0: T, b1: T) -> Self {
        Self { a0, a1, a2, b0, b1 }
    }

    /// Pass-through coefficients: a = [1, 0, 0], b = [0, 0]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Values in order `[a0, a1, a2, b0, b1]`
    pub fn to_array(&self) -> [T; 5] {
        [self.a0, self.a1, self.a2, self.b0, self.b1]
    }

    /// Convert into another numeric representation
    pub fn cast<U: Sample>(&self) -> BiquadCoefficients<U> {
        BiquadCoefficients {
            a0: U::from_f64(self.a0.to_f64()),
            a1: U::from_f64(self.a1.to_f64()),
            a2: U::from_f64(self.a2.to_f64()),
            b0: U::from_f64(self.b0.to_f64()),
            b1: U::from_f64(self.b1.to_f64()),
        }
    }
}

impl BiquadCoefficients<f64> {
    /// Derive coefficients for a named filter shape
    ///
    /// # Parameters
    /// - `cutoff`: corner/center frequency in Hz, clamped to `[0, sample_rate / 2]`
    /// - `quality`: Q factor, raised to at least 0.01 (0.707 keeps a flat passband)
    /// - `gain_db`: boost/cut for peak and shelf shapes; its sign selects the branch
    /// - `sample_rate`: below 1 Hz the result is pass-through
    #[must_use]
    pub fn from_filter_type(
        filter: FilterType,
        cutoff: f64,
        quality: f64,
        gain_db: f64,
        sample_rate: f64,
    ) -> Self {
        if sample_rate < 1.0 {
            return Self::identity();
        }
        let cutoff = cutoff.clamp(0.0, sample_rate / 2.0);
        let q = quality.max(MIN_QUALITY_FACTOR);
        let v = 10.0_f64.powf(gain_db.abs() / 20.0);
        let k = (PI * cutoff / sample_rate).tan();
        let k2 = k * k;
        let sqrt_2v = (2.0 * v).sqrt();

        match filter {
            FilterType::None => Self::identity(),
            FilterType::LowPass => {
                let norm = 1.0 / (1.0 + k / q + k2);
                let a0 = k2 * norm;
                Self::new(a0, 2.0 * a0, a0, 2.0 * (k2 - 1.0) * norm, (1.0 - k / q + k2) * norm)
            }
            FilterType::HighPass => {
                let norm = 1.0 / (1.0 + k / q + k2);
                Self::new(
                    norm,
                    -2.0 * norm,
                    norm,
                    2.0 * (k2 - 1.0) * norm,
                    (1.0 - k / q + k2) * norm,
                )
            }
            FilterType::BandPass => {
                let norm = 1.0 / (1.0 + k / q + k2);
                let a0 = k / q * norm;
                Self::new(a0, 0.0, -a0, 2.0 * (k2 - 1.0) * norm, (1.0 - k / q + k2) * norm)
            }
            FilterType::Notch => {
                let norm = 1.0 / (1.0 + k / q + k2);
                let a0 = (1.0 + k2) * norm;
                let a1 = 2.0 * (k2 - 1.0) * norm;
                Self::new(a0, a1, a0, a1, (1.0 - k / q + k2) * norm)
            }
            FilterType::Peak => {
                // Boost and cut swap the roles of Q and V/Q so that
                // +g and -g are mirror images in dB.
                let (zero_q, pole_q) = if gain_db >= 0.0 {
                    (v / q, 1.0 / q)
                } else {
                    (1.0 / q, v / q)
                };
                let norm = 1.0 / (1.0 + pole_q * k + k2);
                let a1 = 2.0 * (k2 - 1.0) * norm;
                Self::new(
                    (1.0 + zero_q * k + k2) * norm,
                    a1,
                    (1.0 - zero_q * k + k2) * norm,
                    a1,
                    (1.0 - pole_q * k + k2) * norm,
                )
            }
            FilterType::LowShelf => {
                if gain_db >= 0.0 {
                    let norm = 1.0 / (1.0 + SQRT_2 * k + k2);
                    Self::new(
                        (1.0 + sqrt_2v * k + v * k2) * norm,
                        2.0 * (v * k2 - 1.0) * norm,
                        (1.0 - sqrt_2v * k + v * k2) * norm,
                        2.0 * (k2 - 1.0) * norm,
                        (1.0 - SQRT_2 * k + k2) * norm,
                    )
                } else {
                    let norm = 1.0 / (1.0 + sqrt_2v * k + v * k2);
                    Self::new(
                        (1.0 + SQRT_2 * k + k2) * norm,
                        2.0 * (k2 - 1.0) * norm,
                        (1.0 - SQRT_2 * k + k2) * norm,
                        2.0 * (v * k2 - 1.0) * norm,
                        (1.0 - sqrt_2v * k + v * k2) * norm,
                    )
                }
            }
            FilterType::HighShelf => {
                if gain_db >= 0.0 {
                    let norm = 1.0 / (1.0 + SQRT_2 * k + k2);
                    Self::new(
                        (v + sqrt_2v * k + k2) * norm,
                        2.0 * (k2 - v) * norm,
                        (v - sqrt_2v * k + k2) * norm,
                        2.0 * (k2 - 1.0) * norm,
                        (1.0 - SQRT_2 * k + k2) * norm,
                    )
                } else {
                    let norm = 1.0 / (v + sqrt_2v * k + k2);
                    Self::new(
                        (1.0 + SQRT_2 * k + k2) * norm,
                        2.0 * (k2 - 1.0) * norm,
                        (1.0 - SQRT_2 * k + k2) * norm,
                        2.0 * (k2 - v) * norm,
                        (v - sqrt_2v * k + k2) * norm,
                    )
                }
            }
        }
    }

    /// Magnitude response in dB at normalized angular frequency `w` (0..=π)
    pub fn gain_db_at(&self, w: f64) -> f64 {
        let Self { a0, a1, a2, b0, b1 } = *self;
        let phi = (w / 2.0).sin().powi(2);
        let numerator = (a0 + a1 + a2).powi(2) - 4.0 * (a0 * a1 + 4.0 * a0 * a2 + a1 * a2) * phi
            + 16.0 * a0 * a2 * phi * phi;
        let denominator = (1.0 + b0 + b1).powi(2) - 4.0 * (b0 + 4.0 * b1 + b0 * b1) * phi
            + 16.0 * b1 * phi * phi;
        let db = (numerator.ln() - denominator.ln()) * 10.0 / LN_10;
        // NaN (negative rounding residue) and -inf both land on the floor
        if db.is_nan() || db <= RESPONSE_FLOOR_DB {
            RESPONSE_FLOOR_DB
        } else {
            db
        }
    }

    /// Theoretical magnitude response as `(frequency_hz, gain_db)` pairs
    pub fn theoretical_response(&self, sample_rate: f64, scale: ResponseScale) -> Vec<(f32, f32)> {
        let last = (RESPONSE_POINTS - 1) as f64;
        (0..RESPONSE_POINTS)
            .map(|i| {
                let position = i as f64 / last;
                let (w, freq) = match scale {
                    ResponseScale::Linear => (position * PI, position * sample_rate / 2.0),
                    ResponseScale::Logarithmic => {
                        let ratio = (1000.0_f64.ln() * position).exp() * 0.001;
                        (ratio * PI, ratio * sample_rate / 2.0)
                    }
                };
                (freq as f32, self.gain_db_at(w) as f32)
            })
            .collect()
    }
}

/// Spacing of the angular frequency axis of a theoretical response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseScale {
    /// `w` linear in `[0, π]`
    #[default]
    Linear,
    /// `w` logarithmic in `[0.001π, π]`
    Logarithmic,
}

/// Stateful biquad stage using Direct Form I
///
/// Coefficients and history live in the stream's numeric representation `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadStage<T: Sample = f32> {
    coeffs: BiquadCoefficients<T>,
    // Previous input samples (x[n-1], x[n-2])
    x: [T; 2],
    // Previous output samples (y[n-1], y[n-2])
    y: [T; 2],
}

impl<T: Sample> Default for BiquadStage<T> {
    fn default() -> Self {
        Self::new(BiquadCoefficients::identity())
    }
}

impl<T: Sample> BiquadStage<T> {
    /// Create a stage with given coefficients and empty history
    pub fn new(coeffs: BiquadCoefficients<T>) -> Self {
        Self {
            coeffs,
            x: [T::default(); 2],
            y: [T::default(); 2],
        }
    }

    /// Create a stage from a named filter shape
    pub fn from_filter_type(
        filter: FilterType,
        cutoff: f64,
        quality: f64,
        gain_db: f64,
        sample_rate: f64,
    ) -> Self {
        let mut stage = Self::default();
        stage.set_filter_type(filter, cutoff, quality, gain_db, sample_rate);
        stage
    }

    /// Derive coefficients from a named shape, then clear history
    pub fn set_filter_type(
        &mut self,
        filter: FilterType,
        cutoff: f64,
        quality: f64,
        gain_db: f64,
        sample_rate: f64,
    ) {
        let coeffs =
            BiquadCoefficients::from_filter_type(filter, cutoff, quality, gain_db, sample_rate);
        self.set_coefficients(coeffs.cast());
    }

    /// Store coefficients verbatim, then clear history
    pub fn set_coefficients(&mut self, coeffs: BiquadCoefficients<T>) {
        self.coeffs = coeffs;
        self.reset_history();
    }

    pub fn coefficients(&self) -> BiquadCoefficients<T> {
        self.coeffs
    }

    /// Zero the input/output history; coefficients are kept
    pub fn reset_history(&mut self) {
        self.x = [T::default(); 2];
        self.y = [T::default(); 2];
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, sample: T) -> T {
        let c = &self.coeffs;
        // y[n] = a0*x[n] + a1*x[n-1] + a2*x[n-2] - b0*y[n-1] - b1*y[n-2]
        let output = c.a0 * sample + c.a1 * self.x[0] + c.a2 * self.x[1]
            - c.b0 * self.y[0]
            - c.b1 * self.y[1];

        self.x[1] = self.x[0];
        self.x[0] = sample;
        self.y[1] = self.y[0];
        self.y[0] = output;

        output
    }

    /// Filter `count` samples read from `input` into `output`
    ///
    /// Consecutive samples are `input_stride` / `output_stride` elements
    /// apart, which walks one channel of an interleaved buffer. Processing
    /// stops early if either slice runs out.
    pub fn process_buffer(
        &mut self,
        input: &[T],
        output: &mut [T],
        count: usize,
        input_stride: usize,
        output_stride: usize,
    ) {
        let inputs = input.iter().step_by(input_stride.max(1)).take(count);
        let outputs = output.iter_mut().step_by(output_stride.max(1)).take(count);
        for (out, &sample) in outputs.zip(inputs) {
            *out = self.process_sample(sample);
        }
    }

    /// Filter `count` samples of `buffer` in place, `stride` elements apart
    pub fn process_in_place(&mut self, buffer: &mut [T], count: usize, stride: usize) {
        for sample in buffer.iter_mut().step_by(stride.max(1)).take(count) {
            *sample = self.process_sample(*sample);
        }
    }

    /// Theoretical response on a linear axis (see [`ResponseScale`])
    pub fn theoretical_response(&self, sample_rate: f64) -> Vec<(f32, f32)> {
        self.theoretical_response_with_scale(sample_rate, ResponseScale::Linear)
    }

    pub fn theoretical_response_with_scale(
        &self,
        sample_rate: f64,
        scale: ResponseScale,
    ) -> Vec<(f32, f32)> {
        self.coeffs.cast::<f64>().theoretical_response(sample_rate, scale)
    }
}
