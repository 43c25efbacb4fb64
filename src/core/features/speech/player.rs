use std::sync::Arc;

use async_trait::async_trait;

use super::pcm::PcmBuffer;
use crate::shared::error::AppResult;
#[cfg(not(feature = "playback"))]
use crate::shared::error::AppError;

/// Sink that renders decoded speech audibly
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Play the buffer to completion
    async fn play(&self, buffer: PcmBuffer) -> AppResult<()>;
}

/// The best output this build supports
pub fn default_output() -> Arc<dyn AudioOutput> {
    #[cfg(feature = "playback")]
    {
        Arc::new(cpal_output::CpalOutput)
    }
    #[cfg(not(feature = "playback"))]
    {
        Arc::new(NoOutput)
    }
}

/// Used when the crate is built without the `playback` feature
#[cfg(not(feature = "playback"))]
pub struct NoOutput;

#[cfg(not(feature = "playback"))]
#[async_trait]
impl AudioOutput for NoOutput {
    async fn play(&self, _buffer: PcmBuffer) -> AppResult<()> {
        Err(AppError::Audio("Built without audio playback support".to_string()))
    }
}

#[cfg(feature = "playback")]
pub use cpal_output::CpalOutput;

#[cfg(feature = "playback")]
mod cpal_output {
    use std::collections::VecDeque;
    use std::sync::{mpsc, Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, SizedSample};

    use super::super::pcm::{self, PcmBuffer};
    use super::AudioOutput;
    use crate::shared::error::{AppError, AppResult};

    /// Grace period for the device to flush its own buffer
    const DEVICE_TAIL: Duration = Duration::from_millis(150);
    const DRAIN_SLACK: Duration = Duration::from_secs(2);

    /// Plays through the default output device of the default host.
    /// A stream is opened per call and closed once the buffer drains.
    pub struct CpalOutput;

    #[async_trait]
    impl AudioOutput for CpalOutput {
        async fn play(&self, buffer: PcmBuffer) -> AppResult<()> {
            tokio::task::spawn_blocking(move || play_blocking(buffer))
                .await
                .map_err(|e| AppError::Audio(format!("Playback thread failed: {}", e)))?
        }
    }

    fn audio_err(context: &str, err: impl std::fmt::Display) -> AppError {
        AppError::Audio(format!("{}: {}", context, err))
    }

    fn play_blocking(buffer: PcmBuffer) -> AppResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AppError::Audio("No audio output device found".to_string()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| audio_err("No usable output config", e))?;
        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.config();

        let frames = pcm::to_device_frames(&buffer, config.sample_rate.0, config.channels);
        tracing::debug!(
            device_rate = config.sample_rate.0,
            channels = config.channels,
            samples = frames.len(),
            "Opening output stream"
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(frames)));
        let (done_tx, done_rx) = mpsc::channel();

        let stream = match format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, queue, done_tx),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, queue, done_tx),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, queue, done_tx),
            other => Err(AppError::Audio(format!("Unsupported sample format {:?}", other))),
        }?;
        stream.play().map_err(|e| audio_err("Failed to start stream", e))?;

        let drained = done_rx.recv_timeout(buffer.duration() + DRAIN_SLACK);
        std::thread::sleep(DEVICE_TAIL);
        drop(stream);

        drained.map_err(|_| AppError::Audio("Playback did not finish in time".to_string()))
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        queue: Arc<Mutex<VecDeque<f32>>>,
        done: mpsc::Sender<()>,
    ) -> AppResult<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut queue = queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    for out in data.iter_mut() {
                        *out = T::from_sample(queue.pop_front().unwrap_or(0.0));
                    }
                    if queue.is_empty() {
                        let _ = done.send(());
                    }
                },
                |err| tracing::warn!(error = %err, "Audio stream error"),
                None,
            )
            .map_err(|e| audio_err("Failed to open output stream", e))
    }
}
