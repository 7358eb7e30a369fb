use rosc::decoder;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::parse_endpoint;
use crate::dispatch::{self, EEG_PATH, GAMMA_PATH, HORSESHOE_PATH};
use crate::error::{ListenerError, Result};
use crate::session::Session;

/// How often the receive loop wakes up to check for a stop request.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

struct Running {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// UDP server feeding decoded OSC packets into a [`Session`].
pub struct OscServer {
    addr: SocketAddr,
    session: Arc<Session>,
    running: Option<Running>,
}

impl OscServer {
    pub fn new(addr: SocketAddr, session: Arc<Session>) -> Self {
        Self {
            addr,
            session,
            running: None,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Address the socket is actually bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Bind the socket and spawn the receive thread. Starting a running
    /// server is a no-op.
    pub fn start(&mut self) -> Result<SocketAddr> {
        if let Some(running) = &self.running {
            return Ok(running.local_addr);
        }

        let socket = UdpSocket::bind(self.addr).map_err(|source| ListenerError::Transport {
            addr: self.addr.to_string(),
            source,
        })?;
        // Timeout so the loop can notice a stop request
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        let local_addr = socket.local_addr()?;

        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_receive_loop(socket, self.session.clone(), stop.clone());

        log::info!("server started on {}", local_addr);
        log::debug!(
            "listening for {}, {}, band paths through {}",
            HORSESHOE_PATH,
            EEG_PATH,
            GAMMA_PATH
        );
        self.running = Some(Running {
            local_addr,
            stop,
            handle,
        });
        Ok(local_addr)
    }

    /// Stop receiving and release the socket. Returns within about one poll
    /// interval; calling it on a stopped server does nothing.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop.store(true, Ordering::SeqCst);
            if running.handle.join().is_err() {
                log::error!("OSC receive thread panicked");
            }
            log::info!("server stopped");
        }
    }

    /// Change the listening endpoint. A running server is rebound at once.
    pub fn set_server_info(&mut self, host: &str, port: u16) -> Result<()> {
        let addr = parse_endpoint(host, port)?;
        self.addr = addr;
        log::info!("server IP set to {}", addr.ip());
        log::info!("server port set to {}", addr.port());

        if self.is_running() {
            self.stop();
            self.start()?;
        }
        Ok(())
    }
}

impl Drop for OscServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_receive_loop(socket: UdpSocket, session: Arc<Session>, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; decoder::MTU];

        loop {
            if stop.load(Ordering::SeqCst) {
                break;
            }

            match socket.recv_from(&mut buf) {
                Ok((size, peer_addr)) => match decoder::decode_udp(&buf[..size]) {
                    Ok((_, packet)) => dispatch::handle_packet(&session, packet),
                    Err(err) => log::error!("OSC decode error from {}: {}", peer_addr, err),
                },
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(err) => log::error!("OSC recv error: {}", err),
            }
        }
        log::debug!("OSC receive loop exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn stop_is_idempotent() {
        let mut server = OscServer::new(loopback(), Arc::new(Session::new()));
        server.stop();

        let bound = server.start().unwrap();
        assert_ne!(bound.port(), 0);
        assert_eq!(server.start().unwrap(), bound);

        server.stop();
        server.stop();
        assert!(!server.is_running());
        assert_eq!(server.local_addr(), None);
    }

    #[test]
    fn bind_failure_is_a_transport_error() {
        let taken = UdpSocket::bind(loopback()).unwrap();
        let addr = taken.local_addr().unwrap();

        let mut server = OscServer::new(addr, Arc::new(Session::new()));
        assert!(matches!(
            server.start(),
            Err(ListenerError::Transport { .. })
        ));
        assert!(!server.is_running());
    }

    #[test]
    fn set_server_info_validates_before_applying() {
        let mut server = OscServer::new(loopback(), Arc::new(Session::new()));
        assert!(matches!(
            server.set_server_info("localhost:5000", 5000),
            Err(ListenerError::Configuration(_))
        ));
        assert_eq!(server.addr(), loopback());

        server.set_server_info("127.0.0.1", 5001).unwrap();
        assert_eq!(server.addr(), "127.0.0.1:5001".parse().unwrap());
        assert!(!server.is_running());
    }

    #[test]
    fn set_server_info_rebinds_a_running_server() {
        let mut server = OscServer::new(loopback(), Arc::new(Session::new()));
        let first = server.start().unwrap();

        // Reserve a free port, then hand it over
        let port = {
            let spare = UdpSocket::bind(loopback()).unwrap();
            spare.local_addr().unwrap().port()
        };
        server.set_server_info("127.0.0.1", port).unwrap();

        assert!(server.is_running());
        assert_eq!(server.local_addr().unwrap().port(), port);
        // The old endpoint has been released
        UdpSocket::bind(first).unwrap();
    }
}
