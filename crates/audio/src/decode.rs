use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

use crate::DecodedAudio;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("unsupported or corrupt audio data: {0}")]
    Format(#[from] symphonia::core::errors::Error),

    #[error("audio stream has no default track")]
    NoTrack,

    #[error("audio stream decoded to zero samples")]
    Empty,
}

/// Decode a fetched audio blob (the backend serves WAV) into interleaved PCM.
/// The bytes are treated as opaque; format detection is left to the probe.
pub fn decode_bytes(bytes: Vec<u8>) -> Result<DecodedAudio, AudioError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let probed = symphonia::default::get_probe().format(
        &Hint::new(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;

    let track = format.default_track().ok_or(AudioError::NoTrack)?;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1) as u16;
    let track_id = track.id;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet)?;
        let spec = *decoded.spec();
        let duration = decoded.capacity() as u64;

        let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    if samples.is_empty() {
        return Err(AudioError::Empty);
    }

    Ok(DecodedAudio::new(samples, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("writer");
            for &sample in samples {
                writer.write_sample(sample).expect("write sample");
            }
            writer.finalize().expect("finalize");
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_mono_wav() {
        let samples: Vec<i16> = (0..4410).map(|i| ((i % 100) * 300) as i16).collect();
        let bytes = wav_bytes(&samples, 44100, 1);

        let decoded = decode_bytes(bytes).expect("decode");
        assert_eq!(decoded.sample_rate(), 44100);
        assert_eq!(decoded.channels(), 1);
        assert_eq!(decoded.frames(), 4410);
    }

    #[test]
    fn test_decode_stereo_wav_keeps_interleaving() {
        // Left channel silent, right channel at full scale.
        let mut samples = Vec::new();
        for _ in 0..1000 {
            samples.push(0i16);
            samples.push(i16::MAX);
        }
        let bytes = wav_bytes(&samples, 48000, 2);

        let decoded = decode_bytes(bytes).expect("decode");
        assert_eq!(decoded.channels(), 2);
        assert_eq!(decoded.frames(), 1000);
        assert!(decoded.channel(0).all(|s| s.abs() < 1e-3));
        assert!(decoded.channel(1).all(|s| s > 0.9));
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        let result = decode_bytes(b"definitely not audio".to_vec());
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_empty_wav_is_an_error() {
        let bytes = wav_bytes(&[], 44100, 1);
        assert!(matches!(decode_bytes(bytes), Err(AudioError::Empty)));
    }
}
