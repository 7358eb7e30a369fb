//! Optional downstream sink: publishes each complete band snapshot to MQTT.

use rumqttc::{Client, Connection, Event, LastWill, MqttOptions, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::bands::Snapshot;
use crate::config::MqttConfig;

const CLIENT_ID: &str = "headband-osc";
const KEEP_ALIVE_SECS: u64 = 30;
const RECONNECT_DELAY_SECS: u64 = 1;
const QUEUE_SIZE: usize = 10;
/// Snapshots waiting for the publisher; older cycles are dropped beyond this.
const BACKLOG: usize = 4;

#[derive(Debug, Clone, PartialEq)]
struct MqttTopics {
    bands: String,
    availability: String,
}

impl MqttTopics {
    fn new(base_topic: &str) -> Self {
        let base = base_topic.trim_end_matches('/');
        Self {
            bands: format!("{}/bands", base),
            availability: format!("{}/availability", base),
        }
    }
}

/// Sending half handed to the cycle hook. Never blocks the OSC thread.
#[derive(Clone)]
pub struct SnapshotSender {
    tx: SyncSender<Snapshot>,
}

impl SnapshotSender {
    pub fn send(&self, snapshot: Snapshot) {
        match self.tx.try_send(snapshot) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::debug!("[MQTT] publisher busy, snapshot skipped"),
            Err(TrySendError::Disconnected(_)) => log::debug!("[MQTT] publisher gone"),
        }
    }
}

fn create_mqtt_options(config: &MqttConfig, topics: &MqttTopics) -> MqttOptions {
    let mut options = MqttOptions::new(CLIENT_ID, config.broker_host.clone(), config.broker_port);
    options.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));
    if !config.username.is_empty() {
        options.set_credentials(config.username.clone(), config.password.clone());
    }
    // Broker marks us offline if the connection drops
    options.set_last_will(LastWill::new(
        topics.availability.clone(),
        "offline",
        QoS::AtLeastOnce,
        true,
    ));
    options
}

/// Spawn the publisher. Returns the sender for the cycle hook and the handle
/// of the publishing thread. The network event loop runs detached and ends
/// with the disconnect sent on exit.
pub fn spawn_mqtt_publisher(
    config: &MqttConfig,
    exit: Arc<AtomicBool>,
) -> (SnapshotSender, JoinHandle<()>) {
    let topics = MqttTopics::new(&config.base_topic);
    let (client, connection) = Client::new(create_mqtt_options(config, &topics), QUEUE_SIZE);
    let (tx, rx) = sync_channel(BACKLOG);

    log::info!(
        "[MQTT] publishing snapshots to {}:{} on {}",
        config.broker_host,
        config.broker_port,
        topics.bands
    );

    spawn_event_loop(connection, exit.clone());
    let publisher = thread::spawn(move || run_publish_loop(client, topics, rx, exit));
    (SnapshotSender { tx }, publisher)
}

fn run_publish_loop(client: Client, topics: MqttTopics, rx: Receiver<Snapshot>, exit: Arc<AtomicBool>) {
    let _ = client.publish(&topics.availability, QoS::AtLeastOnce, true, "online");

    loop {
        if exit.load(Ordering::SeqCst) {
            break;
        }
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(snapshot) => match serde_json::to_vec(&snapshot) {
                Ok(payload) => {
                    if let Err(e) = client.try_publish(&topics.bands, QoS::AtMostOnce, false, payload) {
                        log::warn!("[MQTT] publish failed: {}", e);
                    }
                }
                Err(e) => log::error!("[MQTT] could not encode snapshot: {}", e),
            },
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    // Non-blocking: the broker may be unreachable
    let _ = client.try_publish(&topics.availability, QoS::AtLeastOnce, true, "offline");
    let _ = client.try_disconnect();
    log::info!("[MQTT] publisher stopped");
}

fn spawn_event_loop(mut connection: Connection, exit: Arc<AtomicBool>) {
    thread::spawn(move || {
        for event in connection.iter() {
            match event {
                Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(e) => {
                    if exit.load(Ordering::SeqCst) {
                        break;
                    }
                    log::warn!("[MQTT] connection error: {} (retrying in {}s)", e, RECONNECT_DELAY_SECS);
                    thread::sleep(Duration::from_secs(RECONNECT_DELAY_SECS));
                }
            }
        }
    });
}
