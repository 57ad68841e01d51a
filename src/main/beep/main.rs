use std::thread;
use std::time::Duration;
use clap::Parser;
use log::info;
use anzanlib::audio;
use anzanlib::config::{AMPLITUDE, BLOCK_SIZE, FREQUENCY, SAMPLE_RATE};
use anzanlib::settings::Settings;
use anzanlib::sink::AudioSink;
use anzanlib::tone;

// Plays a burst of beeps through the default output device.
#[derive(Parser, Debug)]
#[command(name = "beep", about = "Check the beep output on the default device")]
struct Args {
    /// Number of beeps
    #[arg(short, long, default_value_t = 5)]
    count: u32,

    /// Milliseconds between beeps
    #[arg(short, long, default_value_t = 500)]
    interval_ms: u64,

    #[arg(short, long, default_value_t = FREQUENCY)]
    frequency: f64,

    #[arg(short, long, default_value_t = AMPLITUDE)]
    amplitude: f64,

    #[arg(long, default_value_t = SAMPLE_RATE)]
    sample_rate: u32,

    #[arg(long, default_value_t = BLOCK_SIZE)]
    block_size: u32,

    /// List the device's supported output configurations and exit
    #[arg(long)]
    list: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    if args.list {
        let device = audio::initialize_output_device()?;
        println!("Supported output configurations:");
        for config in audio::supported_configs(&device)? {
            println!("Channels: {}, Min Sample Rate: {}, Max Sample Rate: {}, Format: {}",
                config.channels,
                config.min_sample_rate,
                config.max_sample_rate,
                config.sample_format);
        }
        return Ok(());
    }

    let defaults = Settings::get_default_settings();
    let settings = defaults.clone()
        .with_sample_rate(args.sample_rate)
        .with_block_size(args.block_size)
        .with_tone(args.frequency, defaults.get_duration(), args.amplitude);

    let tone = tone::beep_from_settings(&settings)?;
    let mut sink = AudioSink::open(&settings)?;
    let capacity = sink.queue_capacity()?;
    let sample_rate = sink.sample_rate();

    for i in 0..args.count {
        let outcome = sink.play_once(&tone)?;
        info!("BEEP: {} of {}: {:?}", i + 1, args.count, outcome);
        thread::sleep(Duration::from_millis(args.interval_ms));
    }
    // Let the last tone drain before stopping the stream.
    thread::sleep(tone.duration() + Duration::from_millis(100));

    let stats = sink.stats()?;
    sink.close()?;
    println!("Queued {} bytes, played {}, dropped {} (queue {} bytes at {} Hz)",
        stats.appended, stats.drained, stats.dropped, capacity, sample_rate);
    Ok(())
}
