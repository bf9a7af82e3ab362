//! Shutdown Control
//!
//! Commands that drive the runner's lifecycle arrive on a plain `mpsc`
//! channel. The terminal and the interrupt signal are just two producers, so
//! tests can trigger shutdown by sending on the channel directly.

use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

/// A lifecycle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Stop every task and exit
    Exit,
}

/// Parses one line of interactive input. Anything but `exit` is ignored.
pub fn parse_command(line: &str) -> Option<Command> {
    if line.trim().eq_ignore_ascii_case("exit") {
        Some(Command::Exit)
    } else {
        None
    }
}

/// Forwards commands read from `reader` until EOF, a read error, or the
/// receiving side hanging up.
pub fn forward_commands<R: BufRead>(reader: R, commands: &Sender<Command>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Stopped reading commands: {}", e);
                return;
            }
        };

        match parse_command(&line) {
            Some(command) => {
                if commands.send(command).is_err() {
                    return;
                }
            }
            None => debug!("Ignoring input: {:?}", line),
        }
    }

    debug!("Command input closed");
}

/// Reads commands from stdin on a background thread.
pub fn spawn_stdin_reader(commands: Sender<Command>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || forward_commands(io::stdin().lock(), &commands))
}

/// Sends [`Command::Exit`] when the process receives Ctrl+C (or SIGTERM on
/// unix).
pub fn spawn_signal_listener(commands: Sender<Command>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("signal-listener".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Failed to start signal runtime: {}", e);
                    return;
                }
            };

            runtime.block_on(shutdown_signal());
            let _ = commands.send(Command::Exit);
        })
}

/// Completes when an interrupt or terminate signal arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, stopping"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received terminate signal, stopping");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc::channel;

    #[test]
    fn test_parse_exit_variants() {
        assert_eq!(parse_command("exit"), Some(Command::Exit));
        assert_eq!(parse_command("  EXIT \r"), Some(Command::Exit));
        assert_eq!(parse_command("Exit"), Some(Command::Exit));
    }

    #[test]
    fn test_parse_ignores_other_input() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("quit"), None);
        assert_eq!(parse_command("exit now"), None);
    }

    #[test]
    fn test_forward_commands_filters_lines() {
        let (tx, rx) = channel();
        let input = Cursor::new("status\nhelp\nexit\nexit\n");

        forward_commands(input, &tx);
        drop(tx);

        let received: Vec<Command> = rx.iter().collect();
        assert_eq!(received, vec![Command::Exit, Command::Exit]);
    }

    #[test]
    fn test_forward_commands_stops_when_receiver_gone() {
        let (tx, rx) = channel();
        drop(rx);

        // Must return instead of looping on send errors.
        forward_commands(Cursor::new("exit\nexit\n"), &tx);
    }

    #[test]
    fn test_forward_commands_eof_sends_nothing() {
        let (tx, rx) = channel();
        forward_commands(Cursor::new(""), &tx);
        drop(tx);
        assert!(rx.recv().is_err());
    }
}
