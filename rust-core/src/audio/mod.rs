//! Audio engine: gains, block processing, sources and playback

pub mod codec;
pub mod driver;
pub mod equalizer;
pub mod gain;
pub mod monitor;
pub mod output;
pub mod processor;
pub mod source;

pub use driver::{PlaybackDriver, PlaybackState};
pub use equalizer::Equalizer;
pub use gain::{db_to_linear, linear_to_db, GainStage};
pub use monitor::{monitor_queue, MonitorConsumer, MonitorProducer};
pub use output::{list_output_devices, AudioDeviceInfo, CpalSink, ManualSink, OutputSink, StreamSettings};
pub use processor::BlockProcessor;
pub use source::{AudioBuffer, StreamSource};
