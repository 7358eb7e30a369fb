use std::io::Write;
use std::net::SocketAddr;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::bands::Snapshot;
use crate::link::{ConnectionStatus, LinkState, CHANNEL_NAMES};

fn print_colored(color: Color, line: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_intense(true));
    let _ = writeln!(&mut stdout, "{}", line);
    let _ = stdout.reset();
}

pub fn print_quick_help() {
    print_colored(Color::Blue, "Type 'help' for commands, 'exit' to quit");
}

pub fn print_listening(addr: SocketAddr) {
    print_colored(
        Color::Green,
        &format!("[server ip: {}] [server port: {}]", addr.ip(), addr.port()),
    );
    println!("awaiting headband connection\n");
}

/// Shown once when a degraded episode starts.
pub fn print_connection_error(status: &ConnectionStatus) {
    let contacts: Vec<String> = CHANNEL_NAMES
        .iter()
        .zip(status.0.iter())
        .map(|(name, code)| format!("{}={}", name, code))
        .collect();
    print_colored(
        Color::Red,
        &format!("connection error: {} ({})", status, contacts.join(" ")),
    );
}

pub fn print_connection_restored() {
    print_colored(Color::Green, "headband connected");
}

pub fn print_link_state(state: LinkState, status: &ConnectionStatus, has_snapshot: bool) {
    let (color, label) = match state {
        LinkState::NeverUpdated => (Color::Yellow, "waiting for headband"),
        LinkState::Usable => (Color::Green, "connected"),
        LinkState::Degraded => (Color::Red, "poor connection"),
    };
    print_colored(color, &format!("link: {} {}", label, status));
    println!(
        "bands: {}",
        if has_snapshot { "complete" } else { "incomplete" }
    );
}

pub fn print_snapshot(snapshot: &Snapshot) {
    let bands: Vec<String> = snapshot
        .iter()
        .map(|(band, reading)| format!("{}: {:?}", band, reading))
        .collect();
    println!("{{{}}}", bands.join(", "));
}

pub fn print_raw(raw: &[f64]) {
    println!("raw: {:?}", raw);
}
