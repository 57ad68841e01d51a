// ============================================
//                  Scope/Imports
// ============================================
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, SupportedBufferSize};
use log::{debug, info, warn, error};
use crate::error::{SinkError, StreamFault};
use crate::queue::BlockFiller;
use crate::settings::Settings;
use crate::sink::{AudioBackend, RunningStream};

// ============================================
//       Initialize Audio Interface
// Open communication with the default output
// device of the default host.
// ============================================
pub fn initialize_output_device() -> Result<cpal::Device, SinkError> {
    let host = cpal::default_host();
    debug!("AUDIO: Using host {:?}", host.id());

    let device = host
        .default_output_device()
        .ok_or_else(|| SinkError::DeviceUnavailable("no default output device".into()))?;
    match device.name() {
        Ok(name) => info!("AUDIO: Default output device: {}", name),
        Err(err) => warn!("AUDIO: Failed to get output device name: {}", err),
    }
    Ok(device)
}

// ============================================
//            Supported Configs
// ============================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigCandidate {
    pub channels: u16,
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    pub sample_format: SampleFormat,
    /// Inclusive block size range, when the driver reports one.
    pub buffer_range: Option<(u32, u32)>,
}

impl ConfigCandidate {
    fn supports_rate(&self, sample_rate: u32) -> bool {
        (self.min_sample_rate..=self.max_sample_rate).contains(&sample_rate)
    }
}

pub fn supported_configs(device: &cpal::Device) -> Result<Vec<ConfigCandidate>, SinkError> {
    let ranges = device
        .supported_output_configs()
        .map_err(|err| SinkError::DeviceUnavailable(err.to_string()))?;

    Ok(ranges
        .map(|range| ConfigCandidate {
            channels: range.channels(),
            min_sample_rate: range.min_sample_rate().0,
            max_sample_rate: range.max_sample_rate().0,
            sample_format: range.sample_format(),
            buffer_range: match range.buffer_size() {
                SupportedBufferSize::Range { min, max } => Some((*min, *max)),
                SupportedBufferSize::Unknown => None,
            },
        })
        .collect())
}

fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

// ============================================
//            Select Stream Config
// Prefer the requested channel count, then the
// fewest channels, then i16 over f32 over u16.
// ============================================
pub fn select_stream_config(
    candidates: &[ConfigCandidate],
    settings: &Settings,
    ) -> Result<(cpal::StreamConfig, SampleFormat), SinkError> {

    let sample_rate = settings.get_sample_rate();
    let block_size = settings.get_buffer_size();
    let wanted_channels = settings.get_channels();

    let best = candidates
        .iter()
        .filter(|c| c.supports_rate(sample_rate) && c.channels > 0)
        .filter_map(|c| format_rank(c.sample_format).map(|rank| (c, rank)))
        .min_by_key(|(c, rank)| (c.channels != wanted_channels, c.channels, *rank))
        .map(|(c, _)| c)
        .ok_or_else(|| SinkError::DeviceUnavailable(format!(
            "no supported output config at {} Hz", sample_rate)))?;

    let buffer_size = match best.buffer_range {
        Some((min, max)) if !(min..=max).contains(&block_size) => {
            warn!("AUDIO: Block size {} outside driver range {}..={}, using driver default",
                block_size, min, max);
            cpal::BufferSize::Default
        }
        _ => cpal::BufferSize::Fixed(block_size),
    };

    let config = cpal::StreamConfig {
        channels: best.channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size,
    };
    debug!("AUDIO: Selected {:?} with {:?}", config, best.sample_format);
    Ok((config, best.sample_format))
}

// ============================================
//        Start Output Stream
// ============================================
fn build_output_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut filler: BlockFiller,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<i16>,
{
    let channels = config.channels as usize;
    let fault = filler.fault_latch();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            filler.fill_samples(data, channels);
        },
        move |err| {
            error!("AUDIO: Output stream error: {}", err);
            fault.record(StreamFault::Backend(err.to_string()));
        },
        None
    )
}

pub struct CpalBackend;

impl AudioBackend for CpalBackend {
    fn open_stream(
        &self,
        settings: &Settings,
        filler: BlockFiller,
    ) -> Result<Box<dyn RunningStream>, SinkError> {
        let device = initialize_output_device()?;
        let candidates = supported_configs(&device)?;
        let (config, sample_format) = select_stream_config(&candidates, settings)?;

        let stream = match sample_format {
            SampleFormat::I16 => build_output_stream::<i16>(&device, &config, filler),
            SampleFormat::F32 => build_output_stream::<f32>(&device, &config, filler),
            SampleFormat::U16 => build_output_stream::<u16>(&device, &config, filler),
            sample_format => {
                return Err(SinkError::DeviceUnavailable(format!(
                    "unsupported sample format '{sample_format}'")));
            }
        }
        .map_err(|err| SinkError::DeviceUnavailable(err.to_string()))?;

        stream
            .play()
            .map_err(|err| SinkError::DeviceUnavailable(err.to_string()))?;
        info!("AUDIO: Output stream started ({} channel(s), {:?})", config.channels, sample_format);

        Ok(Box::new(CpalStream { stream: Some(stream) }))
    }
}

// ============================================
//        Stop Audio Stream
// ============================================
struct CpalStream {
    stream: Option<cpal::Stream>,
}

impl RunningStream for CpalStream {
    fn stop(&mut self) -> Result<(), SinkError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let paused = stream.pause();
        // Dropping the stream joins the driver callback.
        drop(stream);
        paused.map_err(|err| SinkError::Stop(err.to_string()))
    }
}
