//! Completion-beep detection in the audio track.
//!
//! Short high-frequency bursts mark the end of a recorded event. The
//! detector computes a short-time spectral magnitude representation,
//! restricts it to the configured band, thresholds frame energy at a high
//! percentile of the band's distribution, and merges consecutive
//! above-threshold frames into events. The caller picks among multiple
//! events; this module only ranks by peak magnitude as a hint.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;

use crate::config::AudioConfig;
use crate::processing::stats::percentile;

/// FFT size for the short-time transform.
pub const N_FFT: usize = 2048;

/// Hop between successive spectral frames.
pub const HOP_LENGTH: usize = 512;

/// One detected completion beep; immutable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeepEvent {
    /// Onset time in seconds from the start of the audio.
    pub time_seconds: f64,
    pub duration_seconds: f64,
    /// Frequency of the strongest bin inside the event, in Hz.
    pub peak_frequency: f32,
    /// Strongest band magnitude inside the event; tie-break hint only.
    pub peak_magnitude: f32,
}

impl BeepEvent {
    /// Midpoint of the event in seconds.
    pub fn center_seconds(&self) -> f64 {
        self.time_seconds + self.duration_seconds / 2.0
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Band-limited per-frame spectral energy: (energy, argmax frequency).
fn band_energy_per_frame(
    samples: &[f32],
    sample_rate: u32,
    band_hz: (f32, f32),
) -> Vec<(f32, f32)> {
    if samples.len() < N_FFT {
        return Vec::new();
    }

    let bin_hz = sample_rate as f32 / N_FFT as f32;
    let low_bin = (band_hz.0 / bin_hz).ceil() as usize;
    let high_bin = ((band_hz.1 / bin_hz).floor() as usize).min(N_FFT / 2);
    if low_bin > high_bin {
        log::warn!(
            "no spectral bins inside {:.0}-{:.0} Hz at {} Hz sample rate",
            band_hz.0,
            band_hz.1,
            sample_rate
        );
        return Vec::new();
    }

    let window = hann_window(N_FFT);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(N_FFT);

    let frame_count = (samples.len() - N_FFT) / HOP_LENGTH + 1;
    let mut energies = Vec::with_capacity(frame_count);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); N_FFT];

    for frame in 0..frame_count {
        let offset = frame * HOP_LENGTH;
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(samples[offset + i] * window[i], 0.0);
        }
        fft.process(&mut buffer);

        let mut best = (0.0f32, low_bin);
        for bin in low_bin..=high_bin {
            let magnitude = buffer[bin].norm();
            if magnitude > best.0 {
                best = (magnitude, bin);
            }
        }
        energies.push((best.0, best.1 as f32 * bin_hz));
    }
    energies
}

/// Detects completion beeps in a mono sample buffer, ordered by onset time.
///
/// Audio shorter than one analysis window, or a band with no spectral bins,
/// yields an empty vec rather than an error.
pub fn detect_completion(
    samples: &[f32],
    sample_rate: u32,
    config: &AudioConfig,
) -> Vec<BeepEvent> {
    let frames = band_energy_per_frame(samples, sample_rate, config.band_hz);
    if frames.is_empty() {
        return Vec::new();
    }

    let energies: Vec<f32> = frames.iter().map(|(e, _)| *e).collect();
    let threshold = percentile(&energies, config.magnitude_percentile);
    log::debug!(
        "beep detection: threshold={threshold:.3} over {} spectral frames",
        frames.len()
    );

    let frame_secs = HOP_LENGTH as f64 / f64::from(sample_rate);
    let mut events = Vec::new();
    let mut run_start: Option<usize> = None;

    let mut close_run = |start: usize, end_exclusive: usize, events: &mut Vec<BeepEvent>| {
        let duration = (end_exclusive - start) as f64 * frame_secs;
        if duration < config.min_beep_duration {
            return;
        }
        let (peak_magnitude, peak_frequency) = frames[start..end_exclusive]
            .iter()
            .fold((0.0f32, 0.0f32), |acc, &(energy, freq)| {
                if energy > acc.0 {
                    (energy, freq)
                } else {
                    acc
                }
            });
        events.push(BeepEvent {
            time_seconds: start as f64 * frame_secs,
            duration_seconds: duration,
            peak_frequency,
            peak_magnitude,
        });
    };

    for (index, &(energy, _)) in frames.iter().enumerate() {
        if energy > threshold {
            if run_start.is_none() {
                run_start = Some(index);
            }
        } else if let Some(start) = run_start.take() {
            close_run(start, index, &mut events);
        }
    }
    if let Some(start) = run_start {
        close_run(start, frames.len(), &mut events);
    }

    log::info!("detected {} completion beep(s)", events.len());
    events
}

/// The strongest event by peak magnitude, as a selection hint.
pub fn strongest<'a>(events: &'a [BeepEvent]) -> Option<&'a BeepEvent> {
    events.iter().max_by(|a, b| {
        a.peak_magnitude
            .partial_cmp(&b.peak_magnitude)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Derives the analysis start frame from a known end-marker beep and the
/// expected event duration, clamped to frame 0.
///
/// The beep's midpoint is the detection time; onsets smear under the STFT
/// while the midpoint stays stable across window alignments.
pub fn start_frame_from_beep(beep: &BeepEvent, expected_duration_secs: f64, fps: f64) -> u64 {
    let beep_frame = (beep.center_seconds() * fps).round();
    let offset = (expected_duration_secs * fps).round();
    (beep_frame - offset).max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SR: u32 = 44_100;

    /// Mono near-silence: deterministic white noise at amplitude 1e-3, so the
    /// percentile threshold sits on an erratic noise floor the way it does on
    /// real recordings.
    fn near_silence(total_secs: f64) -> Vec<f32> {
        let total = (total_secs * f64::from(TEST_SR)) as usize;
        let mut state: u32 = 0x1234_5678;
        (0..total)
            .map(|_| {
                // xorshift32
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32 - 0.5) * 2e-3
            })
            .collect()
    }

    /// Adds a sine burst of `freq_hz` and `amplitude` over
    /// `[start_secs, start_secs + duration_secs)`.
    fn add_burst(
        samples: &mut [f32],
        start_secs: f64,
        duration_secs: f64,
        freq_hz: f32,
        amplitude: f32,
    ) {
        let start = (start_secs * f64::from(TEST_SR)) as usize;
        let end = ((start_secs + duration_secs) * f64::from(TEST_SR)) as usize;
        for (i, sample) in samples
            .iter_mut()
            .enumerate()
            .skip(start)
            .take(end.saturating_sub(start))
        {
            *sample += (2.0 * PI * freq_hz * i as f32 / TEST_SR as f32).sin() * amplitude;
        }
    }

    #[test]
    fn detects_single_burst_with_expected_timing() {
        let mut samples = near_silence(5.0);
        add_burst(&mut samples, 2.0, 0.3, 2000.0, 0.8);
        let events = detect_completion(&samples, TEST_SR, &AudioConfig::default());
        assert_eq!(events.len(), 1);
        let beep = &events[0];
        assert!(beep.peak_frequency >= 800.0 && beep.peak_frequency <= 4000.0);
        assert!((beep.peak_frequency - 2000.0).abs() < 50.0);
        // Onset near 2.0s, duration near 0.3s, both within STFT smear.
        assert!((beep.time_seconds - 2.0).abs() < 0.06);
        assert!((beep.duration_seconds - 0.3).abs() < 0.08);
    }

    #[test]
    fn silence_yields_no_events() {
        let samples = vec![0.0f32; TEST_SR as usize];
        let events = detect_completion(&samples, TEST_SR, &AudioConfig::default());
        assert!(events.is_empty());
    }

    #[test]
    fn burst_outside_band_is_ignored() {
        // 200 Hz burst sits below the 800-4000 Hz default band; its leakage
        // into the band stays under the noise floor.
        let mut samples = near_silence(5.0);
        add_burst(&mut samples, 2.0, 0.3, 200.0, 0.8);
        let events = detect_completion(&samples, TEST_SR, &AudioConfig::default());
        assert!(events.is_empty());
    }

    #[test]
    fn short_blip_is_discarded() {
        // 20 ms burst is under the 100 ms minimum duration even after smear.
        let mut samples = near_silence(5.0);
        add_burst(&mut samples, 2.0, 0.02, 2000.0, 0.8);
        let events = detect_completion(&samples, TEST_SR, &AudioConfig::default());
        assert!(events.is_empty());
    }

    #[test]
    fn two_bursts_are_ordered_by_onset_and_ranked_by_strength() {
        let mut samples = near_silence(6.0);
        add_burst(&mut samples, 1.0, 0.3, 2000.0, 0.5);
        add_burst(&mut samples, 4.0, 0.3, 3000.0, 0.9);
        let events = detect_completion(&samples, TEST_SR, &AudioConfig::default());
        assert_eq!(events.len(), 2);
        assert!(events[0].time_seconds < events[1].time_seconds);
        let pick = strongest(&events).unwrap();
        assert!((pick.time_seconds - 4.0).abs() < 0.1);
    }

    #[test]
    fn start_frame_subtracts_expected_duration() {
        // Midpoint at 10.2s; 4s earlier at 30 fps is frame 186.
        let beep = BeepEvent {
            time_seconds: 10.0,
            duration_seconds: 0.4,
            peak_frequency: 2000.0,
            peak_magnitude: 1.0,
        };
        assert_eq!(start_frame_from_beep(&beep, 4.0, 30.0), 186);
    }

    #[test]
    fn start_frame_anchors_on_the_beep_midpoint_not_the_onset() {
        let beep = BeepEvent {
            time_seconds: 10.0,
            duration_seconds: 1.0,
            peak_frequency: 2000.0,
            peak_magnitude: 1.0,
        };
        // Onset-anchored would give 180; the midpoint at 10.5s gives 195.
        assert_eq!(start_frame_from_beep(&beep, 4.0, 30.0), 195);
    }

    #[test]
    fn start_frame_clamps_at_zero() {
        let beep = BeepEvent {
            time_seconds: 1.0,
            duration_seconds: 0.3,
            peak_frequency: 2000.0,
            peak_magnitude: 1.0,
        };
        assert_eq!(start_frame_from_beep(&beep, 10.0, 30.0), 0);
    }
}
