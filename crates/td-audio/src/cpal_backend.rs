//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use td_ir::{RenderCallback, MAX_CHANNELS};

use crate::block::BlockAdapter;
use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output on the default device.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device with its default configuration.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
        let config: StreamConfig = config.into();

        if let Ok(name) = device.name() {
            log::info!(
                "audio device {name}: {} Hz, {} channels",
                config.sample_rate.0,
                config.channels
            );
        }

        Ok(Self {
            device,
            config,
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Build the device stream around `callback` and start it.
    ///
    /// The callback is prepared here with `block_size` frames per render
    /// and up to `channels` channels; it renders on the device thread until
    /// this output is dropped, which releases it.
    pub fn build_stream<C>(&mut self, callback: C, block_size: usize, channels: u16) -> Result<(), AudioError>
    where
        C: RenderCallback + 'static,
    {
        let running = Arc::clone(&self.running);
        let device_channels = self.config.channels as usize;
        let render_channels = channels.min(self.config.channels).clamp(1, MAX_CHANNELS);
        let mut adapter = BlockAdapter::new(callback, block_size, self.config.sample_rate.0, render_channels);

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    adapter.fill_interleaved(data, device_channels);
                },
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        self.running.store(true, Ordering::Relaxed);
        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn channels(&self) -> u16 {
        self.config.channels
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}
