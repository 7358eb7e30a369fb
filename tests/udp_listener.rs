use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use headband_osc::dispatch::{
    ALPHA_PATH, BETA_PATH, DELTA_PATH, EEG_PATH, GAMMA_PATH, HORSESHOE_PATH, THETA_PATH,
};
use headband_osc::{Band, LinkState, OscServer, Session};
use rosc::{encoder, OscMessage, OscPacket, OscType};

fn send(socket: &UdpSocket, target: SocketAddr, addr: &str, args: &[f32]) {
    let packet = OscPacket::Message(OscMessage {
        addr: addr.to_string(),
        args: args.iter().map(|&v| OscType::Float(v)).collect(),
    });
    let buf = encoder::encode(&packet).unwrap();
    socket.send_to(&buf, target).unwrap();
}

/// Poll until `cond` holds; datagrams are handled on the server thread.
fn wait_for(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn start(session: Session) -> (Arc<Session>, OscServer, SocketAddr, UdpSocket) {
    let session = Arc::new(session);
    let mut server = OscServer::new("127.0.0.1:0".parse().unwrap(), session.clone());
    let target = server.start().unwrap();
    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    (session, server, target, client)
}

#[test]
fn full_cycle_over_udp() {
    let cycles = Arc::new(AtomicUsize::new(0));
    let mut session = Session::new();
    let counter = cycles.clone();
    session.on_cycle_complete(move |s| {
        if s.snapshot().is_some() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    let (session, mut server, target, client) = start(session);

    send(&client, target, HORSESHOE_PATH, &[1.0, 1.0, 2.0, 1.0]);
    assert!(wait_for(|| session.link_state() == LinkState::Usable));

    send(&client, target, EEG_PATH, &[810.25, 820.5, 830.125, 840.0, 0.0]);
    for path in [THETA_PATH, DELTA_PATH, ALPHA_PATH, BETA_PATH] {
        send(&client, target, path, &[0.123456, 1.0, 2.0, 3.0]);
    }
    assert!(wait_for(|| session.reading(Band::Beta).is_some()));
    assert!(session.snapshot().is_none());

    send(&client, target, GAMMA_PATH, &[4.0, 5.0, 6.0, 7.0]);
    assert!(wait_for(|| cycles.load(Ordering::SeqCst) == 1));

    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.get(Band::Theta)[0], 0.12346);
    assert_eq!(snapshot.get(Band::Gamma), &[4.0, 5.0, 6.0, 7.0]);
    assert_eq!(session.raw_snapshot(), vec![810.25, 820.5, 830.125, 840.0, 0.0]);

    server.stop();
}

#[test]
fn degraded_link_over_udp() {
    let (session, mut server, target, client) = start(Session::new());

    send(&client, target, GAMMA_PATH, &[9.0, 9.0, 9.0, 9.0]);
    assert!(wait_for(|| session.reading(Band::Gamma).is_some()));

    send(&client, target, HORSESHOE_PATH, &[4.0, 4.0, 4.0, 4.0]);
    assert!(wait_for(|| session.link_state() == LinkState::Degraded));

    send(&client, target, GAMMA_PATH, &[1.0, 2.0, 3.0, 4.0]);
    // A malformed message must not stall the listener
    send(&client, target, ALPHA_PATH, &[1.0, 2.0]);
    socket_garbage(&client, target);
    send(&client, target, HORSESHOE_PATH, &[0.0, 1.0, 1.0, 0.0]);
    assert!(wait_for(|| session.link_state() == LinkState::Usable));

    assert_eq!(session.reading(Band::Gamma), Some([9.0; 4]));
    assert_eq!(session.reading(Band::Alpha), None);
    assert_eq!(session.degraded_episodes(), 1);

    server.stop();
}

fn socket_garbage(client: &UdpSocket, target: SocketAddr) {
    client.send_to(b"not osc", target).unwrap();
}

#[test]
fn stop_releases_the_endpoint() {
    let (_session, mut server, target, _client) = start(Session::new());

    let begun = Instant::now();
    server.stop();
    assert!(begun.elapsed() < Duration::from_secs(2));

    UdpSocket::bind(target).unwrap();
}
