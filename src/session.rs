//! The headband session: link monitor and band aggregator behind one lock.
//!
//! Every handler takes the same mutex, so a link check always sees a whole
//! horseshoe update and a reader never sees half of a band overwrite.
//!
//! The cycle hook fires on each accepted gamma message because the headband
//! sends gamma last in its band burst. UDP may reorder datagrams, in which
//! case a hook-driven read can lag the newest cycle by one period.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::bands::{Band, BandAggregator, BandReading, Snapshot};
use crate::console;
use crate::link::{ConnectionStatus, LinkCheck, LinkMonitor, LinkState, CHANNEL_COUNT};

pub type CycleHook = Box<dyn Fn(&Session) + Send + Sync>;

#[derive(Debug, Default)]
struct SessionState {
    link: LinkMonitor,
    bands: BandAggregator,
    degraded_episodes: u64,
    recoveries: u64,
}

impl SessionState {
    /// Run the link check and return whether data may be stored. Reports
    /// while the lock is held so notices print in the order they happened.
    fn gate(&mut self) -> bool {
        let check = self.link.check();
        match check {
            LinkCheck::Degraded(_) => self.degraded_episodes += 1,
            LinkCheck::Recovered => self.recoveries += 1,
            LinkCheck::Usable | LinkCheck::StillDegraded => {}
        }
        report(check);
        check.is_usable()
    }
}

#[derive(Default)]
pub struct Session {
    state: Mutex<SessionState>,
    cycle_hook: Option<CycleHook>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the consumer called after every accepted gamma reading.
    pub fn on_cycle_complete<F>(&mut self, hook: F)
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        self.cycle_hook = Some(Box::new(hook));
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // Handlers never leave the state half-written, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Horseshoe handler: store the contact codes unconditionally.
    pub fn update_connection(&self, codes: [f64; CHANNEL_COUNT]) {
        self.lock().link.update(codes);
    }

    /// Gate and store under one lock. Also returns the status the gate saw.
    fn store_band(&self, band: Band, values: BandReading) -> (bool, ConnectionStatus) {
        let mut state = self.lock();
        let accepted = state.gate();
        if accepted {
            state.bands.ingest_band(band, values);
        }
        (accepted, state.link.status())
    }

    /// Store a band reading if the link is usable. Returns whether it was kept.
    pub fn ingest_band(&self, band: Band, values: BandReading) -> bool {
        let (accepted, _) = self.store_band(band, values);

        if accepted && band == Band::CYCLE_END {
            if let Some(hook) = &self.cycle_hook {
                log::debug!("cycle complete, calling consumer");
                hook(self);
            }
        }
        accepted
    }

    /// Store a raw EEG burst if the link is usable.
    pub fn ingest_raw(&self, values: &[f64]) -> bool {
        let mut state = self.lock();
        let accepted = state.gate();
        if accepted {
            state.bands.ingest_raw(values);
        }
        accepted
    }

    /// Check the link as a data handler would, including notification.
    pub fn is_usable(&self) -> bool {
        self.lock().gate()
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.lock().bands.snapshot()
    }

    pub fn raw_snapshot(&self) -> Vec<f64> {
        self.lock().bands.raw_snapshot()
    }

    pub fn reading(&self, band: Band) -> Option<BandReading> {
        self.lock().bands.reading(band).copied()
    }

    pub fn link_state(&self) -> LinkState {
        self.lock().link.state()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.lock().link.status()
    }

    /// Degraded episodes reported since start.
    pub fn degraded_episodes(&self) -> u64 {
        self.lock().degraded_episodes
    }

    /// Episodes that have ended with a "connected" notice.
    pub fn recoveries(&self) -> u64 {
        self.lock().recoveries
    }
}

fn report(check: LinkCheck) {
    match check {
        LinkCheck::Degraded(status) => {
            log::warn!("poor connection - {}", status);
            console::print_connection_error(&status);
        }
        LinkCheck::Recovered => {
            log::info!("connection restored");
            console::print_connection_restored();
        }
        LinkCheck::Usable | LinkCheck::StillDegraded => {}
    }
}
