use std::io::stdin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::console;
use crate::session::Session;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Exit,
    Raw(bool),
    Status,
    Help,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let cmd = line.trim();
    if cmd.is_empty()
        || cmd.eq_ignore_ascii_case("exit")
        || cmd.eq_ignore_ascii_case("quit")
        || cmd.eq_ignore_ascii_case("q")
    {
        return Command::Exit;
    }
    if cmd.eq_ignore_ascii_case("raw on") || cmd.eq_ignore_ascii_case("raw enable") {
        return Command::Raw(true);
    }
    if cmd.eq_ignore_ascii_case("raw off") || cmd.eq_ignore_ascii_case("raw disable") {
        return Command::Raw(false);
    }
    if cmd.eq_ignore_ascii_case("status") || cmd.eq_ignore_ascii_case("s") {
        return Command::Status;
    }
    if cmd.eq_ignore_ascii_case("help") || cmd.eq_ignore_ascii_case("h") {
        return Command::Help;
    }
    Command::Unknown(cmd.to_string())
}

/// Spawn a thread that reads operator commands from stdin. An empty line or
/// `exit` raises `exit`; `raw on|off` flips `print_raw`.
pub fn spawn_stdin_handler(
    session: Arc<Session>,
    exit: Arc<AtomicBool>,
    print_raw: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                // EOF: leave shutdown to Ctrl-C
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    log::error!("stdin read failed: {}", e);
                    break;
                }
            }

            match parse_command(&line) {
                Command::Exit => {
                    exit.store(true, Ordering::SeqCst);
                    break;
                }
                Command::Raw(enabled) => {
                    print_raw.store(enabled, Ordering::SeqCst);
                    println!("Raw EEG printing {}", if enabled { "enabled" } else { "disabled" });
                }
                Command::Status => {
                    console::print_link_state(
                        session.link_state(),
                        &session.connection_status(),
                        session.snapshot().is_some(),
                    );
                    println!("degraded episodes: {}", session.degraded_episodes());
                }
                Command::Help => {
                    println!("Commands:");
                    println!("  raw on/off   - Print raw EEG with each band snapshot");
                    println!("  status/s     - Show headband link state");
                    println!("  help/h       - Show this help");
                    println!("  exit/quit/q  - Exit program");
                }
                Command::Unknown(cmd) => {
                    println!("Unrecognized command: '{}'. Type 'help' for available commands.", cmd);
                }
            }
        }
    })
}
