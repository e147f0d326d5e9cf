use basedrop::{Collector, Shared};
use cpal::{
    FromSample, SizedSample,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};

use crate::DecodedAudio;

type SharedClip = Shared<Option<DecodedAudio>>;

enum Command {
    Play,
    Pause,
    Seek { frame: usize },
}

enum Status {
    Position(usize),
    Finished,
}

/// Position state advanced by the audio callback. Kept separate from the
/// stream so the end-of-clip and seek behavior is testable without a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCursor {
    frame: usize,
    total: usize,
    playing: bool,
}

impl PlaybackCursor {
    pub fn new(total: usize) -> Self {
        Self {
            frame: 0,
            total,
            playing: false,
        }
    }

    pub fn set_total(&mut self, total: usize) {
        self.total = total;
        self.frame = 0;
        self.playing = false;
    }

    /// Playback always restarts from zero, never resumes mid-clip.
    pub fn play_from_start(&mut self) {
        self.frame = 0;
        self.playing = self.total > 0;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn seek(&mut self, frame: usize) {
        self.frame = frame.min(self.total);
    }

    /// Advance one frame. Returns true exactly once when the clip ends; the
    /// cursor then rewinds to zero and stops.
    pub fn advance(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.frame += 1;
        if self.frame >= self.total {
            self.frame = 0;
            self.playing = false;
            return true;
        }
        false
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

/// One-clip audio player. The UI thread owns this handle; the cpal callback
/// owns the clip and cursor. Clip swaps travel through a ring buffer as
/// `basedrop` shared pointers so the callback never frees sample memory.
pub struct Player {
    commands: rtrb::Producer<Command>,
    status: rtrb::Consumer<Status>,
    clips: rtrb::Producer<SharedClip>,
    collector: Collector,
    _stream: cpal::Stream,
    device_rate: u32,
    total_frames: usize,
    position_frame: usize,
    duration_secs: f64,
    playing: bool,
}

impl Player {
    pub fn start() -> anyhow::Result<Self> {
        let collector = Collector::new();
        let gc_handle = collector.handle();

        let (command_tx, command_rx) = rtrb::RingBuffer::<Command>::new(64);
        let (status_tx, status_rx) = rtrb::RingBuffer::<Status>::new(256);
        let (clips_tx, clips_rx) = rtrb::RingBuffer::<SharedClip>::new(4);

        let initial_clip = Shared::new(&gc_handle, None);

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("no output device found"))?;
        let config = device.default_output_config()?;
        let device_rate = config.sample_rate().0;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(
                &device,
                &config.into(),
                initial_clip,
                command_rx,
                clips_rx,
                status_tx,
            )?,
            cpal::SampleFormat::I16 => build_stream::<i16>(
                &device,
                &config.into(),
                initial_clip,
                command_rx,
                clips_rx,
                status_tx,
            )?,
            sample_format => anyhow::bail!("unsupported sample format '{sample_format}'"),
        };

        stream.play()?;

        Ok(Self {
            commands: command_tx,
            status: status_rx,
            clips: clips_tx,
            collector,
            _stream: stream,
            device_rate,
            total_frames: 0,
            position_frame: 0,
            duration_secs: 0.0,
            playing: false,
        })
    }

    /// Swap in a new clip, resampled to the device rate. The previous clip is
    /// reclaimed on the UI thread at the next `poll`.
    pub fn load(&mut self, audio: &DecodedAudio) -> anyhow::Result<()> {
        let resampled = audio.resample(self.device_rate)?;
        self.total_frames = resampled.frames();
        self.duration_secs = resampled.duration_secs();
        self.position_frame = 0;
        self.playing = false;
        let shared = Shared::new(&self.collector.handle(), Some(resampled));
        let _ = self.clips.push(shared);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.total_frames = 0;
        self.duration_secs = 0.0;
        self.position_frame = 0;
        self.playing = false;
        let shared = Shared::new(&self.collector.handle(), None);
        let _ = self.clips.push(shared);
    }

    pub fn play_from_start(&mut self) {
        if self.total_frames == 0 {
            return;
        }
        let _ = self.commands.push(Command::Play);
        self.position_frame = 0;
        self.playing = true;
    }

    pub fn pause(&mut self) {
        let _ = self.commands.push(Command::Pause);
        self.playing = false;
    }

    pub fn seek_fraction(&mut self, fraction: f32) {
        if self.total_frames == 0 {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let frame = (fraction as f64 * self.total_frames as f64) as usize;
        let _ = self.commands.push(Command::Seek { frame });
        self.position_frame = frame.min(self.total_frames);
    }

    /// Drain status from the callback and reclaim retired clips. Call once
    /// per UI frame.
    pub fn poll(&mut self) {
        while let Ok(status) = self.status.pop() {
            match status {
                Status::Position(frame) => self.position_frame = frame,
                Status::Finished => {
                    self.position_frame = 0;
                    self.playing = false;
                }
            }
        }
        self.collector.collect();
    }

    pub fn progress(&self) -> f32 {
        if self.total_frames == 0 {
            return 0.0;
        }
        (self.position_frame as f32 / self.total_frames as f32).clamp(0.0, 1.0)
    }

    pub fn position_secs(&self) -> f64 {
        self.position_frame as f64 / self.device_rate as f64
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn has_clip(&self) -> bool {
        self.total_frames > 0
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    initial_clip: SharedClip,
    mut command_rx: rtrb::Consumer<Command>,
    mut clips_rx: rtrb::Consumer<SharedClip>,
    mut status_tx: rtrb::Producer<Status>,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let output_channels = config.channels as usize;

    let mut current_clip = initial_clip;
    let mut cursor = PlaybackCursor::new(0);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            while let Ok(new_clip) = clips_rx.pop() {
                current_clip = new_clip;
                cursor.set_total(
                    current_clip
                        .as_ref()
                        .as_ref()
                        .map(|c| c.frames())
                        .unwrap_or(0),
                );
            }

            while let Ok(cmd) = command_rx.pop() {
                match cmd {
                    Command::Play => cursor.play_from_start(),
                    Command::Pause => cursor.pause(),
                    Command::Seek { frame } => cursor.seek(frame),
                }
            }

            let binding = current_clip.as_ref();
            let clip = binding.as_ref();

            for frame in data.chunks_mut(output_channels) {
                let mut finished = false;
                if let (Some(clip), true) = (clip, cursor.is_playing()) {
                    let clip_channels = clip.channels() as usize;
                    let base = cursor.frame() * clip_channels;
                    for (ch, sample) in frame.iter_mut().enumerate() {
                        let idx = base + ch % clip_channels;
                        let value = clip.samples().get(idx).copied().unwrap_or(0.0);
                        *sample = T::from_sample(value);
                    }
                    finished = cursor.advance();
                } else {
                    for sample in frame.iter_mut() {
                        *sample = T::from_sample(0.0);
                    }
                }
                if finished {
                    let _ = status_tx.push(Status::Finished);
                }
            }

            let _ = status_tx.push(Status::Position(cursor.frame()));
        },
        |err| tracing::error!("output stream error: {err}"),
        None,
    )?;

    Ok(stream)
}
