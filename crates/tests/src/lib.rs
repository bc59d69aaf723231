//! Shared signal helpers for the integration suite

/// Interleaved sine, identical on every channel
pub fn generate_sine_wave(
    frequency: f64,
    sample_rate: f64,
    frames: usize,
    channels: usize,
) -> Vec<f32> {
    (0..frames * channels)
        .map(|i| {
            let t = (i / channels) as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// RMS level of one channel of an interleaved buffer
pub fn channel_rms(buffer: &[f32], channel: usize, channels: usize) -> f32 {
    let samples: Vec<f32> = buffer.iter().skip(channel).step_by(channels).copied().collect();
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Convert linear amplitude to decibels
pub fn amplitude_to_db(amp: f32) -> f32 {
    if amp <= 0.0 {
        -100.0
    } else {
        20.0 * amp.log10()
    }
}
