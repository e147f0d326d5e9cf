mod decode;
mod player;
mod waveform;

pub use decode::{AudioError, decode_bytes};
pub use player::{PlaybackCursor, Player};
pub use waveform::{BAR_COUNT, Waveform};

use std::sync::Arc;

/// Decoded PCM audio shared between the UI and the playback callback.
/// Cloning bumps a refcount; the sample data itself is immutable.
#[derive(Clone)]
pub struct DecodedAudio {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl DecodedAudio {
    /// # Panics
    ///
    /// Panics if `channels` is 0 or `samples.len()` is not divisible by it.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        assert!(channels > 0, "channels must be greater than 0");
        assert_eq!(
            samples.len() % channels as usize,
            0,
            "samples.len() must be divisible by channels"
        );
        Self {
            samples: Arc::from(samples),
            sample_rate,
            channels,
        }
    }

    /// Interleaved samples; for stereo the layout is [L, R, L, R, ...].
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Frames per channel.
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Iterate one channel's samples.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= self.channels()`.
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = f32> + '_ {
        assert!(
            channel < self.channels as usize,
            "channel index out of bounds"
        );
        let channels = self.channels as usize;
        (0..self.frames()).map(move |frame| self.samples[frame * channels + channel])
    }

    /// Resample to a target rate with sinc interpolation. Returns a cheap
    /// clone when already at the target rate.
    pub fn resample(&self, target_sample_rate: u32) -> anyhow::Result<Self> {
        use rubato::{
            Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
            WindowFunction,
        };

        if self.sample_rate == target_sample_rate || self.is_empty() {
            return Ok(self.clone());
        }

        let channels = self.channels as usize;
        let input_frames = self.frames();
        let resample_ratio = target_sample_rate as f64 / self.sample_rate as f64;

        let mut input_channels = vec![Vec::with_capacity(input_frames); channels];
        for frame_idx in 0..input_frames {
            for ch in 0..channels {
                input_channels[ch].push(self.samples[frame_idx * channels + ch]);
            }
        }

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let mut resampler =
            SincFixedIn::<f32>::new(resample_ratio, 2.0, params, input_frames, channels)?;
        let output_channels = resampler.process(&input_channels, None)?;

        let output_frames = output_channels[0].len();
        let mut output = Vec::with_capacity(output_frames * channels);
        for frame_idx in 0..output_frames {
            for ch in 0..channels {
                output.push(output_channels[ch][frame_idx]);
            }
        }

        Ok(Self::new(output, target_sample_rate, self.channels))
    }
}

impl std::fmt::Debug for DecodedAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedAudio")
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_audio_frames_and_duration() {
        let audio = DecodedAudio::new(vec![0.0; 44100 * 2], 44100, 2);
        assert_eq!(audio.frames(), 44100);
        assert!((audio.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_channel_iterator_deinterleaves() {
        let audio = DecodedAudio::new(vec![0.0, 1.0, 0.5, 1.5], 44100, 2);
        let left: Vec<f32> = audio.channel(0).collect();
        let right: Vec<f32> = audio.channel(1).collect();
        assert_eq!(left, vec![0.0, 0.5]);
        assert_eq!(right, vec![1.0, 1.5]);
    }

    #[test]
    #[should_panic(expected = "samples.len() must be divisible by channels")]
    fn test_invalid_interleaving_panics() {
        DecodedAudio::new(vec![0.0, 0.1, 0.2], 44100, 2);
    }

    #[test]
    fn test_resample_same_rate_is_cheap_clone() {
        let audio = DecodedAudio::new(vec![0.0; 1000], 48000, 1);
        let resampled = audio.resample(48000).expect("resample");
        assert_eq!(Arc::strong_count(&audio.samples), 2);
        assert_eq!(resampled.sample_rate(), 48000);
    }

    #[test]
    fn test_resample_changes_frame_count() {
        let audio = DecodedAudio::new(vec![0.0; 44100], 44100, 1);
        let resampled = audio.resample(22050).expect("resample");
        assert_eq!(resampled.sample_rate(), 22050);
        let expected = 22050usize;
        let tolerance = expected / 20;
        assert!(
            resampled.frames().abs_diff(expected) <= tolerance,
            "expected ~{} frames, got {}",
            expected,
            resampled.frames()
        );
    }
}
