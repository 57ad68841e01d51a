use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, warn};
use rand::Rng;
use crate::config::{COUNTDOWN_STEPS, STOP_POLL_MS};
use crate::settings::RoundSettings;
use crate::sink::SinkHandle;
use crate::tone::Tone;

// ============================================
//                  Beeper
// ============================================
pub trait Beeper {
    fn beep(&self);
}

/// Plays one fixed tone per beep through a sink.
pub struct TonePlayer {
    handle: SinkHandle,
    tone: Tone,
}

impl TonePlayer {
    pub fn new(handle: SinkHandle, tone: Tone) -> Self {
        TonePlayer { handle, tone }
    }
}

impl Beeper for TonePlayer {
    fn beep(&self) {
        // A dropped tone was already logged by the sink.
        if let Err(err) = self.handle.play_once(&self.tone) {
            warn!("SESSION: Beep failed: {}", err);
        }
    }
}

// A missing beeper is a silent session.
impl<B: Beeper> Beeper for Option<B> {
    fn beep(&self) {
        if let Some(beeper) = self {
            beeper.beep();
        }
    }
}

// ============================================
//              Number Generation
// ============================================
pub fn random_number<R: Rng + ?Sized>(rng: &mut R, digits: u32) -> u64 {
    let digits = digits.clamp(1, 19);
    let low = 10u64.pow(digits - 1);
    let high = 10u64.pow(digits) - 1;
    rng.gen_range(low..=high)
}

/// `count` numbers of exactly `digits` digits, no two neighbours equal.
pub fn generate_numbers<R: Rng + ?Sized>(rng: &mut R, digits: u32, count: usize) -> Vec<u64> {
    let mut numbers: Vec<u64> = Vec::with_capacity(count);
    while numbers.len() < count {
        let number = random_number(rng, digits);
        if numbers.last() != Some(&number) {
            numbers.push(number);
        }
    }
    numbers
}

// ============================================
//                   Round
// ============================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    numbers: Vec<u64>,
}

impl Round {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, settings: &RoundSettings) -> Self {
        Round::from_numbers(generate_numbers(rng, settings.get_digits(), settings.get_count()))
    }

    pub fn from_numbers(numbers: Vec<u64>) -> Self {
        Round { numbers }
    }

    /// Numbers in the order they are flashed.
    pub fn numbers(&self) -> &[u64] {
        &self.numbers
    }

    pub fn terms(&self) -> String {
        self.numbers
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn sum(&self) -> u64 {
        self.numbers.iter().sum()
    }
}

// ============================================
//               Flash Schedule
// ============================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashEvent {
    /// "Get ready" step, counting up from 1.
    Countdown(u32),
    Number { index: usize, value: u64 },
    Finished,
    /// The stop flag was raised; nothing more is shown or beeped.
    Aborted,
}

pub struct Flasher {
    interval: Duration,
    countdown_step: Duration,
}

impl Flasher {
    pub fn new(interval: Duration, countdown_step: Duration) -> Self {
        Flasher { interval, countdown_step }
    }

    /// Counts down, then shows each number with one beep at a fixed
    /// cadence, then reports the end one interval after the last number.
    /// Ticks are scheduled from the first number so they do not drift.
    /// `stop` is checked at every tick and while waiting for the next one.
    pub fn flash<B, F>(&self, round: &Round, beeper: &B, stop: &AtomicBool, mut show: F) -> FlashEvent
    where
        B: Beeper + ?Sized,
        F: FnMut(FlashEvent),
    {
        let countdown_start = Instant::now();
        for step in 1..=COUNTDOWN_STEPS {
            if !sleep_until(countdown_start + self.countdown_step * (step - 1), stop) {
                return aborted(show);
            }
            show(FlashEvent::Countdown(step));
        }
        if !sleep_until(countdown_start + self.countdown_step * COUNTDOWN_STEPS, stop) {
            return aborted(show);
        }

        let start = Instant::now();
        for (index, &value) in round.numbers().iter().enumerate() {
            if !sleep_until(start + self.interval * index as u32, stop) {
                debug!("SESSION: Round stopped after {} numbers", index);
                return aborted(show);
            }
            beeper.beep();
            show(FlashEvent::Number { index, value });
            debug!("SESSION: Flashed number {} of {}", index + 1, round.numbers().len());
        }
        if !sleep_until(start + self.interval * round.numbers().len() as u32, stop) {
            return aborted(show);
        }
        show(FlashEvent::Finished);
        FlashEvent::Finished
    }
}

fn aborted<F: FnMut(FlashEvent)>(mut show: F) -> FlashEvent {
    show(FlashEvent::Aborted);
    FlashEvent::Aborted
}

// Sleeps in short slices so a raised stop flag is seen promptly.
// Returns false when stopped.
fn sleep_until(deadline: Instant, stop: &AtomicBool) -> bool {
    loop {
        if stop.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if deadline <= now {
            return true;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(STOP_POLL_MS)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Arc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct CountingBeeper {
        beeps: Cell<usize>,
    }

    impl Beeper for CountingBeeper {
        fn beep(&self) {
            self.beeps.set(self.beeps.get() + 1);
        }
    }

    #[test]
    fn numbers_have_the_requested_digit_count() {
        let mut rng = StdRng::seed_from_u64(7);
        for digits in 1..=10 {
            let low = 10u64.pow(digits - 1);
            let high = 10u64.pow(digits) - 1;
            for number in generate_numbers(&mut rng, digits, 50) {
                assert!((low..=high).contains(&number), "{number} has wrong digit count for {digits}");
            }
        }
    }

    #[test]
    fn neighbouring_numbers_differ() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let numbers = generate_numbers(&mut rng, 1, 50);
            assert_eq!(numbers.len(), 50);
            assert!(numbers.windows(2).all(|pair| pair[0] != pair[1]));
        }
    }

    #[test]
    fn round_follows_settings() {
        let mut rng = StdRng::seed_from_u64(1);
        let round = Round::generate(&mut rng, &RoundSettings::new(10, 3, 12));
        assert_eq!(round.numbers().len(), 12);
        assert!(round.numbers().iter().all(|n| (100..=999).contains(n)));
    }

    #[test]
    fn terms_and_sum() {
        let round = Round::from_numbers(vec![12, 7, 40]);
        assert_eq!(round.terms(), "12+7+40");
        assert_eq!(round.sum(), 59);
    }

    #[test]
    fn largest_round_sum_fits() {
        let round = Round::from_numbers(vec![9_999_999_999; 50]);
        assert_eq!(round.sum(), 499_999_999_950);
    }

    #[test]
    fn one_beep_per_flashed_number() {
        let round = Round::from_numbers(vec![3, 1, 4, 1, 5]);
        let beeper = CountingBeeper::default();
        let mut events = Vec::new();
        let outcome = Flasher::new(Duration::ZERO, Duration::ZERO)
            .flash(&round, &beeper, &AtomicBool::new(false), |event| events.push(event));

        assert_eq!(outcome, FlashEvent::Finished);
        assert_eq!(beeper.beeps.get(), 5);
        assert_eq!(events.len(), 3 + 5 + 1);
        assert_eq!(&events[..3], &[
            FlashEvent::Countdown(1),
            FlashEvent::Countdown(2),
            FlashEvent::Countdown(3),
        ]);
        assert_eq!(events[3], FlashEvent::Number { index: 0, value: 3 });
        assert_eq!(events[7], FlashEvent::Number { index: 4, value: 5 });
        assert_eq!(events[8], FlashEvent::Finished);
    }

    #[test]
    fn flashing_keeps_the_configured_cadence() {
        let round = Round::from_numbers(vec![1, 2, 3]);
        let started = Instant::now();
        Flasher::new(Duration::from_millis(20), Duration::ZERO)
            .flash(&round, &None::<CountingBeeper>, &AtomicBool::new(false), |_| {});
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn silent_session_still_flashes() {
        let round = Round::from_numbers(vec![8, 9]);
        let mut shown = 0;
        let stop = AtomicBool::new(false);
        Flasher::new(Duration::ZERO, Duration::ZERO).flash(&round, &None::<TonePlayer>, &stop, |event| {
            if matches!(event, FlashEvent::Number { .. }) {
                shown += 1;
            }
        });
        assert_eq!(shown, 2);
    }

    #[test]
    fn stop_after_first_number_ends_the_round() {
        let round = Round::from_numbers(vec![5, 6, 7, 8]);
        let beeper = CountingBeeper::default();
        let stop = AtomicBool::new(false);
        let mut events = Vec::new();
        let outcome = Flasher::new(Duration::from_millis(5), Duration::ZERO).flash(&round, &beeper, &stop, |event| {
            if matches!(event, FlashEvent::Number { index: 0, .. }) {
                stop.store(true, Ordering::Release);
            }
            events.push(event);
        });

        assert_eq!(outcome, FlashEvent::Aborted);
        assert_eq!(beeper.beeps.get(), 1);
        assert_eq!(&events[3..], &[
            FlashEvent::Number { index: 0, value: 5 },
            FlashEvent::Aborted,
        ]);
    }

    #[test]
    fn stop_during_countdown_skips_every_number() {
        let round = Round::from_numbers(vec![1, 2]);
        let beeper = CountingBeeper::default();
        let stop = AtomicBool::new(false);
        let mut events = Vec::new();
        Flasher::new(Duration::ZERO, Duration::from_millis(5)).flash(&round, &beeper, &stop, |event| {
            if event == FlashEvent::Countdown(1) {
                stop.store(true, Ordering::Release);
            }
            events.push(event);
        });

        assert_eq!(beeper.beeps.get(), 0);
        assert_eq!(events, vec![FlashEvent::Countdown(1), FlashEvent::Aborted]);
    }

    #[test]
    fn long_interval_is_cut_short_by_stop() {
        let round = Round::from_numbers(vec![1, 2]);
        let stop = Arc::new(AtomicBool::new(false));
        let raiser = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                stop.store(true, Ordering::Release);
            })
        };
        let started = Instant::now();
        let outcome = Flasher::new(Duration::from_secs(10), Duration::ZERO)
            .flash(&round, &None::<CountingBeeper>, &stop, |_| {});
        raiser.join().unwrap();

        assert_eq!(outcome, FlashEvent::Aborted);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
