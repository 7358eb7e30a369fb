//! Maps OSC addresses from the headband onto session handlers.

use rosc::{OscMessage, OscPacket, OscType};

use crate::bands::Band;
use crate::error::{ListenerError, Result};
use crate::link::CHANNEL_COUNT;
use crate::session::Session;

pub const HORSESHOE_PATH: &str = "/muse/elements/horseshoe";
pub const EEG_PATH: &str = "/muse/eeg";
pub const THETA_PATH: &str = "/muse/elements/theta_absolute";
pub const DELTA_PATH: &str = "/muse/elements/delta_absolute";
pub const ALPHA_PATH: &str = "/muse/elements/alpha_absolute";
pub const BETA_PATH: &str = "/muse/elements/beta_absolute";
pub const GAMMA_PATH: &str = "/muse/elements/gamma_absolute";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Horseshoe,
    Eeg,
    Band(Band),
}

impl Route {
    pub fn from_addr(addr: &str) -> Option<Route> {
        let route = match addr {
            HORSESHOE_PATH => Route::Horseshoe,
            EEG_PATH => Route::Eeg,
            THETA_PATH => Route::Band(Band::Theta),
            DELTA_PATH => Route::Band(Band::Delta),
            ALPHA_PATH => Route::Band(Band::Alpha),
            BETA_PATH => Route::Band(Band::Beta),
            GAMMA_PATH => Route::Band(Band::Gamma),
            _ => return None,
        };
        Some(route)
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Horseshoe => HORSESHOE_PATH,
            Route::Eeg => EEG_PATH,
            Route::Band(Band::Theta) => THETA_PATH,
            Route::Band(Band::Delta) => DELTA_PATH,
            Route::Band(Band::Alpha) => ALPHA_PATH,
            Route::Band(Band::Beta) => BETA_PATH,
            Route::Band(Band::Gamma) => GAMMA_PATH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatched {
    /// Handler ran and the data was stored.
    Stored(Route),
    /// Handler ran but the link gate dropped the data.
    Dropped(Route),
    /// Address is not one we listen to.
    Unhandled,
}

/// Walk a decoded packet, dispatching every message in it. A bad message is
/// logged and skipped without affecting its siblings in a bundle.
pub fn handle_packet(session: &Session, packet: OscPacket) {
    match packet {
        OscPacket::Message(msg) => {
            if let Err(err) = dispatch(session, &msg) {
                log::error!("rejected OSC message: {}", err);
            }
        }
        OscPacket::Bundle(bundle) => {
            for pkt in bundle.content {
                handle_packet(session, pkt);
            }
        }
    }
}

pub fn dispatch(session: &Session, msg: &OscMessage) -> Result<Dispatched> {
    let Some(route) = Route::from_addr(&msg.addr) else {
        log::trace!("ignoring {}", msg.addr);
        return Ok(Dispatched::Unhandled);
    };

    let stored = match route {
        Route::Horseshoe => {
            session.update_connection(channel_args(msg)?);
            true
        }
        Route::Eeg => session.ingest_raw(&numeric_args(msg)?),
        Route::Band(band) => session.ingest_band(band, channel_args(msg)?),
    };

    Ok(if stored {
        Dispatched::Stored(route)
    } else {
        Dispatched::Dropped(route)
    })
}

fn as_f64(arg: &OscType) -> Option<f64> {
    match *arg {
        OscType::Int(v) => Some(v as f64),
        OscType::Long(v) => Some(v as f64),
        OscType::Float(v) => Some(v as f64),
        OscType::Double(v) => Some(v),
        _ => None,
    }
}

fn numeric_args(msg: &OscMessage) -> Result<Vec<f64>> {
    msg.args
        .iter()
        .enumerate()
        .map(|(index, arg)| {
            as_f64(arg).ok_or_else(|| ListenerError::NonNumericArgument {
                addr: msg.addr.clone(),
                index,
            })
        })
        .collect()
}

/// Exactly one value per channel.
fn channel_args(msg: &OscMessage) -> Result<[f64; CHANNEL_COUNT]> {
    if msg.args.len() != CHANNEL_COUNT {
        return Err(ListenerError::ArityMismatch {
            addr: msg.addr.clone(),
            expected: CHANNEL_COUNT,
            got: msg.args.len(),
        });
    }
    let values = numeric_args(msg)?;
    let mut out = [0.0; CHANNEL_COUNT];
    out.copy_from_slice(&values);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{OscBundle, OscTime};

    fn message(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args,
        }
    }

    fn floats(values: &[f32]) -> Vec<OscType> {
        values.iter().map(|&v| OscType::Float(v)).collect()
    }

    #[test]
    fn routes_round_trip() {
        for route in [
            Route::Horseshoe,
            Route::Eeg,
            Route::Band(Band::Theta),
            Route::Band(Band::Delta),
            Route::Band(Band::Alpha),
            Route::Band(Band::Beta),
            Route::Band(Band::Gamma),
        ] {
            assert_eq!(Route::from_addr(route.path()), Some(route));
        }
        assert_eq!(Route::from_addr("/muse/acc"), None);
    }

    #[test]
    fn horseshoe_accepts_mixed_numeric_types() {
        let session = Session::new();
        let msg = message(
            HORSESHOE_PATH,
            vec![
                OscType::Int(1),
                OscType::Float(2.0),
                OscType::Double(1.0),
                OscType::Long(4),
            ],
        );
        assert_eq!(
            dispatch(&session, &msg).unwrap(),
            Dispatched::Stored(Route::Horseshoe)
        );
        assert_eq!(session.connection_status().0, [1.0, 2.0, 1.0, 4.0]);
    }

    #[test]
    fn wrong_arity_is_rejected_without_touching_state() {
        let session = Session::new();
        let short = message(ALPHA_PATH, floats(&[1.0, 2.0, 3.0]));
        let long = message(HORSESHOE_PATH, floats(&[1.0, 1.0, 1.0, 1.0, 1.0]));

        assert!(matches!(
            dispatch(&session, &short),
            Err(ListenerError::ArityMismatch { expected: 4, got: 3, .. })
        ));
        assert!(matches!(
            dispatch(&session, &long),
            Err(ListenerError::ArityMismatch { got: 5, .. })
        ));
        assert_eq!(session.reading(Band::Alpha), None);
        assert_eq!(session.link_state(), crate::link::LinkState::NeverUpdated);
    }

    #[test]
    fn non_numeric_argument_is_rejected() {
        let session = Session::new();
        let msg = message(
            EEG_PATH,
            vec![OscType::Float(1.0), OscType::String("eeg".to_string())],
        );
        assert!(matches!(
            dispatch(&session, &msg),
            Err(ListenerError::NonNumericArgument { index: 1, .. })
        ));
        assert!(session.raw_snapshot().is_empty());
    }

    #[test]
    fn gated_band_reports_dropped() {
        let session = Session::new();
        dispatch(&session, &message(HORSESHOE_PATH, floats(&[4.0; 4]))).unwrap();
        let result = dispatch(&session, &message(GAMMA_PATH, floats(&[1.0, 2.0, 3.0, 4.0])));
        assert_eq!(result.unwrap(), Dispatched::Dropped(Route::Band(Band::Gamma)));
    }

    #[test]
    fn unknown_address_is_ignored() {
        let session = Session::new();
        let msg = message("/muse/acc", floats(&[0.1, 0.2, 0.3]));
        assert_eq!(dispatch(&session, &msg).unwrap(), Dispatched::Unhandled);
    }

    #[test]
    fn bundle_continues_past_bad_message() {
        let session = Session::new();
        let bundle = OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![
                OscPacket::Message(message(THETA_PATH, floats(&[1.0]))),
                OscPacket::Message(message(EEG_PATH, floats(&[800.0, 801.5]))),
                OscPacket::Message(message(DELTA_PATH, floats(&[0.5, 0.5, 0.5, 0.5]))),
            ],
        });
        handle_packet(&session, bundle);

        assert_eq!(session.reading(Band::Theta), None);
        assert_eq!(session.reading(Band::Delta), Some([0.5; 4]));
        assert_eq!(session.raw_snapshot(), vec![800.0, 801.5]);
    }
}
