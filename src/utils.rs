use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use log::debug;
use crate::config::STOP_POLL_MS;

pub fn clear_terminal() -> io::Result<()> {
    print!("\x1B[2J\x1B[1;1H");
    io::stdout().flush()
}

/// Reads one line from stdin, trimmed and lower-cased. End of input is
/// an `UnexpectedEof` error.
pub fn read_command() -> io::Result<String> {
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(line.trim().to_lowercase())
}

// ============================================
//               Input Thread
// Lines from stdin arrive on a channel so the
// main thread can keep watching the stop flag.
// The channel disconnects at end of input.
// ============================================
pub fn spawn_input_thread() -> Receiver<String> {
    let (tx, rx) = channel();
    thread::spawn(move || {
        debug!("INPUT: Thread Initialized");
        loop {
            match read_command() {
                Ok(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!("INPUT: Stopped reading: {}", err);
                    break;
                }
            }
        }
    });
    rx
}

/// Prints `message` after discarding lines typed since the last prompt.
pub fn prompt(message: &str, commands: &Receiver<String>) -> io::Result<()> {
    while commands.try_recv().is_ok() {}
    print!("{} ", message);
    io::stdout().flush()
}

/// Next command, or `None` once `stop` is raised or input has ended.
pub fn wait_for_command(commands: &Receiver<String>, stop: &AtomicBool) -> Option<String> {
    loop {
        if stop.load(Ordering::Acquire) {
            return None;
        }
        match commands.recv_timeout(Duration::from_millis(STOP_POLL_MS)) {
            Ok(command) => return Some(command),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn command_is_returned_while_running() {
        let (tx, rx) = channel();
        tx.send("d 3".to_string()).unwrap();
        assert_eq!(wait_for_command(&rx, &AtomicBool::new(false)), Some("d 3".to_string()));
    }

    #[test]
    fn stop_unblocks_a_waiting_prompt() {
        let (_tx, rx) = channel::<String>();
        let stop = Arc::new(AtomicBool::new(false));
        let raiser = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                stop.store(true, Ordering::Release);
            })
        };
        let started = Instant::now();
        assert_eq!(wait_for_command(&rx, &stop), None);
        raiser.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn closed_input_ends_the_wait() {
        let (tx, rx) = channel::<String>();
        drop(tx);
        assert_eq!(wait_for_command(&rx, &AtomicBool::new(false)), None);
    }

    #[test]
    fn prompt_discards_stale_lines() {
        let (tx, rx) = channel();
        tx.send(String::new()).unwrap();
        tx.send("q".to_string()).unwrap();
        prompt("next:", &rx).unwrap();
        tx.send("c 5".to_string()).unwrap();
        assert_eq!(wait_for_command(&rx, &AtomicBool::new(false)), Some("c 5".to_string()));
    }
}
