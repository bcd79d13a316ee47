//! Audio output sinks
//!
//! A sink opens a stream that repeatedly calls a render callback with an
//! interleaved f32 buffer to fill. `CpalSink` drives a real device;
//! `ManualSink` lets the caller pull periods by hand (tests, offline use).

use crate::error::{EqError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, StreamConfig};
use std::sync::{Arc, Mutex, PoisonError};

/// Render callback: fill the whole interleaved buffer, given the channel count
pub type RenderCallback = Box<dyn FnMut(&mut [f32], usize) + Send + 'static>;

/// Stream parameters requested from a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub sample_rate: u32,
    pub block_size: usize,
}

/// Audio device information
#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Handle to an open output stream; dropping it releases the device
pub trait OutputStream {
    /// Stop pulling from the render callback
    fn pause(&self) -> Result<()>;

    /// Name of the device behind the stream
    fn device_name(&self) -> &str;
}

/// Something that can open an output stream
pub trait OutputSink: Send {
    /// Open a stream and start calling `render`
    fn open(&mut self, settings: &StreamSettings, render: RenderCallback) -> Result<Box<dyn OutputStream>>;
}

/// Output through cpal
#[derive(Debug, Clone, Default)]
pub struct CpalSink {
    /// Device name to open; the host default when `None`
    device_name: Option<String>,
}

impl CpalSink {
    /// Sink for the default output device
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink for the output device called `name`
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    fn find_device(&self) -> Result<Device> {
        let host = cpal::default_host();

        match &self.device_name {
            None => host
                .default_output_device()
                .ok_or_else(|| EqError::Device("no output device available".into())),
            Some(wanted) => host
                .output_devices()
                .map_err(|e| EqError::Device(e.to_string()))?
                .find(|device| device.name().map(|name| &name == wanted).unwrap_or(false))
                .ok_or_else(|| EqError::Device(format!("output device '{}' not found", wanted))),
        }
    }
}

impl OutputSink for CpalSink {
    fn open(&mut self, settings: &StreamSettings, mut render: RenderCallback) -> Result<Box<dyn OutputStream>> {
        let device = self.find_device()?;

        let name = device.name().map_err(|e| EqError::Device(e.to_string()))?;

        let default_config = device
            .default_output_config()
            .map_err(|e| EqError::Device(e.to_string()))?;

        let channels = default_config.channels();

        // Engine rate, device channel layout; callback period left to the host
        let stream_config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(settings.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    render(data, channels as usize);
                },
                move |err| {
                    log::error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| EqError::Device(e.to_string()))?;

        stream.play().map_err(|e| EqError::Device(e.to_string()))?;

        log::info!(
            "Opened output '{}' ({} Hz, {} ch)",
            name,
            settings.sample_rate,
            channels
        );

        Ok(Box::new(CpalStream { stream, name }))
    }
}

struct CpalStream {
    stream: cpal::Stream,
    name: String,
}

impl OutputStream for CpalStream {
    fn pause(&self) -> Result<()> {
        self.stream.pause().map_err(|e| EqError::Device(e.to_string()))
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

/// List available audio output devices
pub fn list_output_devices() -> Result<Vec<AudioDeviceInfo>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let device_iter = host
        .output_devices()
        .map_err(|e| EqError::Device(e.to_string()))?;

    for device in device_iter {
        if let Ok(name) = device.name() {
            if let Ok(config) = device.default_output_config() {
                devices.push(AudioDeviceInfo {
                    name,
                    sample_rate: config.sample_rate().0,
                    channels: config.channels(),
                });
            }
        }
    }

    Ok(devices)
}

struct ManualState {
    render: Option<RenderCallback>,
    channels: usize,
    opened: usize,
    fail_open: bool,
}

/// Sink whose periods are pulled explicitly with [`ManualSink::pull`]
///
/// Clones share the same slot, so a test can keep one clone while the
/// driver owns another.
#[derive(Clone)]
pub struct ManualSink {
    state: Arc<Mutex<ManualState>>,
}

impl ManualSink {
    /// Sink with `channels` interleaved channels
    pub fn new(channels: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                render: None,
                channels: channels.max(1),
                opened: 0,
                fail_open: false,
            })),
        }
    }

    /// Sink that refuses to open, like a missing device
    pub fn failing() -> Self {
        let sink = Self::new(1);
        sink.lock().fail_open = true;
        sink
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one period of `frames` frames through the open stream
    ///
    /// # Returns
    /// Interleaved samples, or `None` if no stream is open
    pub fn pull(&self, frames: usize) -> Option<Vec<f32>> {
        let mut state = self.lock();
        let channels = state.channels;
        let render = state.render.as_mut()?;

        let mut out = vec![f32::NAN; frames * channels];
        render(&mut out, channels);
        Some(out)
    }

    /// Whether a stream is currently open
    pub fn is_open(&self) -> bool {
        self.lock().render.is_some()
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> usize {
        self.lock().opened
    }
}

impl OutputSink for ManualSink {
    fn open(&mut self, _settings: &StreamSettings, render: RenderCallback) -> Result<Box<dyn OutputStream>> {
        let mut state = self.lock();
        if state.fail_open {
            return Err(EqError::Device("manual sink configured to fail".into()));
        }
        state.render = Some(render);
        state.opened += 1;

        Ok(Box::new(ManualStream {
            state: Arc::clone(&self.state),
        }))
    }
}

struct ManualStream {
    state: Arc<Mutex<ManualState>>,
}

impl OutputStream for ManualStream {
    fn pause(&self) -> Result<()> {
        Ok(())
    }

    fn device_name(&self) -> &str {
        "manual"
    }
}

impl Drop for ManualStream {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.render = None;
    }
}
