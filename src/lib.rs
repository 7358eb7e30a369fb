//! Listener for a Muse-style EEG headband streaming OSC over UDP.
//!
//! The [`session::Session`] gates band and raw EEG data on contact quality
//! reported by the horseshoe messages, and exposes all five bands only once
//! each has been received.

pub mod bands;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod mqtt_publisher;
pub mod osc_listener;
pub mod session;
pub mod stdin_handler;

pub use bands::{Band, BandReading, Snapshot};
pub use error::{ListenerError, Result};
pub use link::{ConnectionStatus, LinkState};
pub use osc_listener::OscServer;
pub use session::Session;
