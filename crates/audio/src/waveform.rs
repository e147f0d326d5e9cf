use crate::DecodedAudio;

/// Fixed visual resolution of the waveform strip.
pub const BAR_COUNT: usize = 120;

const GAIN: f32 = 1.6;
const PLACEHOLDER_AMP: f32 = 0.08;

/// Fixed-resolution bar heights for the waveform strip, in 0..~1 after gain.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    bars: Vec<f32>,
}

impl Waveform {
    /// Reduce the first channel to `BAR_COUNT` equal blocks; each bar is the
    /// mean absolute amplitude of its block, scaled by a fixed gain.
    pub fn from_audio(audio: &DecodedAudio) -> Self {
        let channel: Vec<f32> = audio.channel(0).collect();
        let block_size = (channel.len() / BAR_COUNT).max(1);

        let bars = (0..BAR_COUNT)
            .map(|i| {
                let start = i * block_size;
                let end = (start + block_size).min(channel.len());
                if start >= end {
                    return 0.0;
                }
                let sum: f32 = channel[start..end].iter().map(|s| s.abs()).sum();
                (sum / (end - start) as f32) * GAIN
            })
            .collect();

        Self { bars }
    }

    /// Flat strip used when decoding fails; the player never shows an error
    /// for an undecodable blob.
    pub fn placeholder() -> Self {
        Self {
            bars: vec![PLACEHOLDER_AMP; BAR_COUNT],
        }
    }

    pub fn bars(&self) -> &[f32] {
        &self.bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_has_fixed_bar_count() {
        let audio = DecodedAudio::new(vec![0.5; 48000], 48000, 1);
        let waveform = Waveform::from_audio(&audio);
        assert_eq!(waveform.bars().len(), BAR_COUNT);
    }

    #[test]
    fn test_constant_signal_gives_gain_scaled_bars() {
        let audio = DecodedAudio::new(vec![0.25; 12000], 48000, 1);
        let waveform = Waveform::from_audio(&audio);
        for &bar in waveform.bars() {
            assert!((bar - 0.25 * GAIN).abs() < 1e-5);
        }
    }

    #[test]
    fn test_only_first_channel_is_reduced() {
        // Left silent, right loud: bars must reflect the silent channel.
        let mut samples = Vec::new();
        for _ in 0..6000 {
            samples.push(0.0);
            samples.push(0.9);
        }
        let audio = DecodedAudio::new(samples, 48000, 2);
        let waveform = Waveform::from_audio(&audio);
        assert!(waveform.bars().iter().all(|&b| b < 1e-6));
    }

    #[test]
    fn test_short_audio_pads_with_zero_bars() {
        // Fewer frames than bars: trailing bars fall outside the data.
        let audio = DecodedAudio::new(vec![0.5; 10], 48000, 1);
        let waveform = Waveform::from_audio(&audio);
        assert_eq!(waveform.bars().len(), BAR_COUNT);
        assert!(waveform.bars()[..10].iter().all(|&b| b > 0.0));
        assert!(waveform.bars()[10..].iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_placeholder_is_flat() {
        let waveform = Waveform::placeholder();
        assert_eq!(waveform.bars().len(), BAR_COUNT);
        assert!(waveform.bars().iter().all(|&b| b == PLACEHOLDER_AMP));
    }
}
