//! Integration tests for the equalizer
//!
//! These tests drive the public facade end to end: presets, multi-stage
//! cascades, per-channel routing and the fixed-point formats.

use drain_core::domain::*;
use drain_tests::{amplitude_to_db, channel_rms, generate_sine_wave};
use proptest::prelude::*;
use tempfile::TempDir;

const SAMPLE_RATE: f64 = 48000.0;

fn float_equalizer(channels: usize) -> Equalizer {
    let mut eq = Equalizer::new();
    eq.initialize(SAMPLE_RATE, channels, SampleFormat::Float).unwrap();
    eq
}

/// Steady-state gain of a sine through `eq`, measured on the second half
fn measured_gain_db(eq: &mut Equalizer, frequency: f64, channels: usize, channel: usize) -> f32 {
    let frames = 9600;
    let input = generate_sine_wave(frequency, SAMPLE_RATE, frames, channels);
    let mut output = vec![0.0f32; input.len()];
    eq.process(&mut output, &input, frames).unwrap();

    let settled = frames / 2 * channels;
    amplitude_to_db(channel_rms(&output[settled..], channel, channels))
        - amplitude_to_db(channel_rms(&input[settled..], channel, channels))
}

// ============================================================================
// FREQUENCY RESPONSE
// ============================================================================

#[test]
fn test_low_pass_attenuates_high_band() {
    let mut eq = float_equalizer(1);
    eq.add_biquad(FilterType::LowPass, 1000.0, 0.707, 0.0).unwrap();

    let pass = measured_gain_db(&mut eq, 100.0, 1, 0);
    eq.reset().unwrap();
    let stop = measured_gain_db(&mut eq, 10000.0, 1, 0);

    assert!(pass.abs() < 0.5, "pass band gain {pass}");
    assert!(stop < -25.0, "stop band gain {stop}");
}

#[test]
fn test_peak_boost_matches_theory() {
    let mut eq = float_equalizer(1);
    eq.add_biquad(FilterType::Peak, 1000.0, 1.0, 6.0).unwrap();

    let measured = measured_gain_db(&mut eq, 1000.0, 1, 0);
    assert!((measured - 6.0).abs() < 0.3, "peak gain {measured}");

    let theory = eq.calculate_theory();
    let max = theory.iter().map(|&(_, g)| g).fold(f32::MIN, f32::max);
    assert!((max - 6.0).abs() < 0.2, "theoretical peak {max}");
}

#[test]
fn test_cascade_gain_is_sum_of_stages() {
    let mut eq = float_equalizer(1);
    eq.add_biquad(FilterType::Peak, 2000.0, 1.0, 4.0).unwrap();
    eq.add_biquad(FilterType::Peak, 2000.0, 1.0, 4.0).unwrap();

    let measured = measured_gain_db(&mut eq, 2000.0, 1, 0);
    assert!((measured - 8.0).abs() < 0.4, "cascade gain {measured}");
}

// ============================================================================
// CHANNEL ROUTING
// ============================================================================

#[test]
fn test_per_channel_stage_leaves_other_channel_untouched() {
    let mut eq = float_equalizer(2);
    eq.add_biquad_to_channel(1, FilterType::HighPass, 5000.0, 0.707, 0.0).unwrap();

    let left = measured_gain_db(&mut eq, 200.0, 2, 0);
    eq.reset().unwrap();
    let right = measured_gain_db(&mut eq, 200.0, 2, 1);

    assert!(left.abs() < 0.01, "left gain {left}");
    assert!(right < -30.0, "right gain {right}");
}

#[test]
fn test_out_of_range_channel_is_ignored() {
    let mut eq = float_equalizer(2);
    eq.add_biquad_to_channel(7, FilterType::LowPass, 100.0, 0.707, 0.0).unwrap();
    assert_eq!(eq.stage_count(0), Some(0));
    assert_eq!(eq.stage_count(1), Some(0));
}

// ============================================================================
// FORMATS
// ============================================================================

#[test]
fn test_fixed_point_tracks_float() {
    let frames = 2048;
    let input_f: Vec<f32> = generate_sine_wave(750.0, SAMPLE_RATE, frames, 1)
        .into_iter()
        .map(|s| s * 0.5)
        .collect();

    let mut float_eq = float_equalizer(1);
    float_eq.add_biquad(FilterType::LowPass, 2000.0, 0.707, 0.0).unwrap();
    let mut out_f = vec![0.0f32; frames];
    float_eq.process(&mut out_f, &input_f, frames).unwrap();

    let mut fixed_eq = Equalizer::new();
    fixed_eq.initialize(SAMPLE_RATE, 1, SampleFormat::Int24On32).unwrap();
    fixed_eq.add_biquad(FilterType::LowPass, 2000.0, 0.707, 0.0).unwrap();
    let input_q: Vec<Int24On32Sample> = input_f
        .iter()
        .map(|&s| Int24On32Sample::from_f64(f64::from(s)))
        .collect();
    let mut out_q = vec![Int24On32Sample::default(); frames];
    fixed_eq.process(&mut out_q, &input_q, frames).unwrap();

    for (f, q) in out_f.iter().zip(&out_q) {
        assert!((f64::from(*f) - q.to_f64()).abs() < 1e-3);
    }
}

#[test]
fn test_wrong_buffer_type_is_rejected() {
    let mut eq = Equalizer::new();
    eq.initialize(SAMPLE_RATE, 1, SampleFormat::Int16).unwrap();

    let input = vec![0.0f32; 16];
    let mut output = vec![0.0f32; 16];
    assert_eq!(
        eq.process(&mut output, &input, 16),
        Err(AudioError::FormatMismatch {
            expected: SampleFormat::Int16,
            found: SampleFormat::Float,
        })
    );
}

// ============================================================================
// PRESETS
// ============================================================================

#[tokio::test]
async fn test_preset_file_drives_equalizer() {
    let temp_dir = TempDir::new().unwrap();
    let manager = PresetManager::new(temp_dir.path().to_path_buf());

    let config = EqualizerConfig {
        sample_rate: SAMPLE_RATE,
        channels: 2,
        format: SampleFormat::Float,
        stages: vec![StageConfig {
            channel: None,
            design: BiquadDesign::Shape {
                filter: FilterType::Notch,
                cutoff: 1000.0,
                quality: 2.0,
                gain_db: 0.0,
            },
        }],
    };
    manager.save_preset("hum", &config).await.unwrap();

    let mut eq = manager.load_preset("hum").await.unwrap().build().unwrap();
    let notched = measured_gain_db(&mut eq, 1000.0, 2, 1);
    assert!(notched < -30.0, "notch depth {notched}");
}

#[test]
fn test_reinitialize_drops_preset_stages() {
    let config = EqualizerConfig::from_toml_str(
        r#"
format = "double"

[[stages]]
[stages.design]
type = "shape"
params = { filter = "high-shelf", cutoff = 6000.0, quality = 0.707, gain_db = -6.0 }
"#,
    )
    .unwrap();

    let mut eq = config.build().unwrap();
    assert_eq!(eq.format(), SampleFormat::Double);
    assert_eq!(eq.stage_count(0), Some(1));

    eq.initialize(44100.0, 1, SampleFormat::Float).unwrap();
    assert_eq!(eq.stage_count(0), Some(0));
    assert!(eq.calculate_theory().is_empty());
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn any_filter() -> impl Strategy<Value = FilterType> {
    prop::sample::select(FilterType::ALL.to_vec())
}

proptest! {
    #[test]
    fn test_single_channel_stage_isolation(
        channels in 1usize..6,
        target in 0usize..6,
        frames in 0usize..128,
        filter in any_filter(),
        cutoff in 20.0f64..20000.0,
        quality in 0.1f64..10.0,
        gain_db in -12.0f64..12.0,
        samples in prop::collection::vec(-1.0f32..1.0, 6 * 128),
    ) {
        let target = target % channels;
        let input = &samples[..frames * channels];

        let mut out_of_place = float_equalizer(channels);
        out_of_place.add_biquad_to_channel(target, filter, cutoff, quality, gain_db).unwrap();
        let mut output = vec![0.0f32; input.len()];
        out_of_place.process(&mut output, input, frames).unwrap();

        let mut in_place = float_equalizer(channels);
        in_place.add_biquad_to_channel(target, filter, cutoff, quality, gain_db).unwrap();
        let mut buffer = input.to_vec();
        in_place.process_in_place(&mut buffer, frames).unwrap();

        prop_assert_eq!(&output, &buffer);
        for (index, (&before, &after)) in input.iter().zip(&output).enumerate() {
            if index % channels != target {
                prop_assert_eq!(before, after);
            }
            prop_assert!(after.is_finite());
        }
    }
}
