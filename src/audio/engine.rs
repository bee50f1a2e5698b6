// Audio Engine - Drives the song transport from the output device callback
// The callback writes silence; rendering belongs to the tracks the transport dispatches to

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig};

use crate::sequencer::TransportHandle;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("No audio device found")]
    NoDevice,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

/// Splits device callbacks of arbitrary size into fixed transport periods
#[derive(Debug, Clone, Copy)]
pub struct PeriodClock {
    period: usize,
    pending: usize,
}

impl PeriodClock {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            pending: 0,
        }
    }

    /// Account for `frames` rendered frames, returning how many whole
    /// periods are now due
    pub fn advance(&mut self, frames: usize) -> usize {
        self.pending += frames;
        let due = self.pending / self.period;
        self.pending %= self.period;
        due
    }
}

pub struct AudioEngine {
    _stream: Stream,
    pub sample_rate: u32,
    pub buffer_frames: usize,
}

impl AudioEngine {
    /// Open the default output device and run one transport period per
    /// `frames_per_period` frames it consumes
    pub fn start(transport: TransportHandle) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        log::info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioError::Config(e.to_string()))?;
        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0;
        let config: StreamConfig = supported_config.into();

        let buffer_frames = match config.buffer_size {
            cpal::BufferSize::Fixed(size) => size as usize,
            cpal::BufferSize::Default => transport.with(|t| t.frames_per_period()),
        };

        transport.with(|t| {
            t.set_sample_rate(sample_rate);
            t.set_frames_per_period(buffer_frames);
        });

        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, transport, buffer_frames)
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, transport, buffer_frames)
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, transport, buffer_frames)
            }
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        }?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;
        log::info!(
            "Audio stream running: {} Hz, {} frames per period",
            sample_rate,
            buffer_frames
        );

        Ok(Self {
            _stream: stream,
            sample_rate,
            buffer_frames,
        })
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        transport: TransportHandle,
        period: usize,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample,
    {
        let channels = config.channels.max(1) as usize;
        let mut clock = PeriodClock::new(period);

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    data.fill(T::EQUILIBRIUM);
                    for _ in 0..clock.advance(data.len() / channels) {
                        transport.process_period();
                    }
                },
                |err| log::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))
    }
}
