use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use clap::Parser;
use colored::Colorize;
use log::{error, info, warn};
use anzanlib::config::{COUNTDOWN_STEP_MS, SAMPLE_RATE};
use anzanlib::session::{FlashEvent, Flasher, Round, TonePlayer};
use anzanlib::settings::{RoundSettings, Settings};
use anzanlib::sink::AudioSink;
use anzanlib::tone;
use anzanlib::utils::{clear_terminal, prompt, spawn_input_thread, wait_for_command};

#[derive(Parser, Debug)]
#[command(name = "anzan", about = "Flash anzan mental arithmetic trainer")]
struct Args {
    /// Seconds each number stays on screen (0.1 to 10.0)
    #[arg(short, long, default_value_t = 5.0)]
    seconds: f64,

    /// Digits per number (1 to 10)
    #[arg(short, long, default_value_t = 1)]
    digits: u32,

    /// Numbers per round (2 to 50)
    #[arg(short, long, default_value_t = 10)]
    count: usize,

    /// Output sample rate for the beep
    #[arg(long, default_value_t = SAMPLE_RATE)]
    sample_rate: u32,

    /// Run without sound
    #[arg(long)]
    mute: bool,
}

fn show(event: FlashEvent) {
    if let Err(err) = clear_terminal() {
        warn!("SESSION: Unable to clear terminal: {}", err);
    }
    match event {
        FlashEvent::Countdown(step) => {
            println!("{}{}", "Get ready".bold(), ".".repeat(step as usize));
        }
        FlashEvent::Number { value, .. } => {
            println!("\n\n        {}\n\n", value.to_string().bold().bright_green());
        }
        FlashEvent::Finished | FlashEvent::Aborted => {}
    }
}

fn print_settings(settings: &RoundSettings) {
    println!();
    println!("Seconds per number: {}", settings.get_seconds_per_number());
    println!("Digits per number: {}", settings.get_digits());
    println!("Numbers per round: {}", settings.get_count());
    println!("Change with 's <seconds>', 'd <digits>' or 'c <count>'.");
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    // ---- Interrupt ---- //
    // The stop flag ends the current wait; the sink is closed on the way out.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(err) = ctrlc::set_handler(move || stop.store(true, Ordering::Release)) {
            warn!("SESSION: Unable to install interrupt handler: {}", err);
        }
    }

    let mut round_settings = RoundSettings::from_seconds(args.seconds, args.digits, args.count);
    let settings = Settings::get_default_settings().with_sample_rate(args.sample_rate);

    // ---- Audio Setup ---- //
    let mut sink = if args.mute {
        None
    } else {
        match AudioSink::open(&settings) {
            Ok(sink) => Some(sink),
            Err(err) => {
                warn!("SESSION: Continuing without sound: {}", err);
                None
            }
        }
    };
    let beeper = sink.as_ref().and_then(|sink| match tone::beep_from_settings(&settings) {
        Ok(tone) => Some(TonePlayer::new(sink.handle(), tone)),
        Err(err) => {
            warn!("SESSION: Unable to build beep tone: {}", err);
            None
        }
    });

    let commands = spawn_input_thread();
    let mut rng = rand::thread_rng();

    // ---- Rounds ---- //
    'rounds: loop {
        print_settings(&round_settings);
        loop {
            if let Err(err) = prompt("Press Enter to play, q to quit:", &commands) {
                error!("SESSION: Failed to write prompt: {}", err);
                break 'rounds;
            }
            let Some(command) = wait_for_command(&commands, &stop) else {
                break 'rounds;
            };
            if command == "q" {
                break 'rounds;
            }
            if command.is_empty() {
                break;
            }
            match round_settings.with_command(&command) {
                Some(updated) => {
                    round_settings = updated;
                    print_settings(&round_settings);
                }
                None => println!("Unknown command '{}'", command),
            }
        }

        let round = Round::generate(&mut rng, &round_settings);
        info!("SESSION: Starting round of {} numbers", round.numbers().len());
        let flasher = Flasher::new(
            round_settings.get_interval(),
            Duration::from_millis(COUNTDOWN_STEP_MS),
        );
        if flasher.flash(&round, &beeper, &stop, show) == FlashEvent::Aborted {
            break;
        }

        if let Err(err) = prompt("Press Enter to show the answer:", &commands) {
            error!("SESSION: Failed to write prompt: {}", err);
            break;
        }
        if wait_for_command(&commands, &stop).is_none() {
            break;
        }
        println!("{}", round.terms());
        println!("{}", round.sum().to_string().bold().bright_yellow());
    }

    if stop.load(Ordering::Acquire) {
        info!("SESSION: Interrupted");
    }
    drop(beeper);
    if let Some(mut sink) = sink.take() {
        if let Err(err) = sink.close() {
            error!("SESSION: {}", err);
        }
    }
}
