//! Generation session
//!
//! Holds the chain and the history for one caller and enforces that at most one
//! acquisition runs at a time. A request made while another is outstanding is
//! dropped, not queued. Every accepted acquisition gets a generation number;
//! a completion whose generation has been superseded is discarded.

use crate::chain::AcquisitionChain;
use crate::history::History;
use crate::request::{GenerationRequest, GenerationResult};
use std::sync::{Mutex, MutexGuard};

/// What became of a call to [`Session::generate`]
#[derive(Debug)]
pub enum AcquireOutcome {
    /// The acquisition finished and is still current.
    Ready(GenerationResult),
    /// Another acquisition was in flight; nothing was started.
    Busy,
    /// The acquisition finished after being superseded; its result was dropped.
    Superseded,
}

impl AcquireOutcome {
    /// The result, if the acquisition is current.
    pub fn into_result(self) -> Option<GenerationResult> {
        match self {
            Self::Ready(result) => Some(result),
            Self::Busy | Self::Superseded => None,
        }
    }
}

#[derive(Debug, Default)]
struct Flight {
    generation: u64,
    in_flight: Option<u64>,
}

/// Context object tying a chain, its history and the in-flight guard together
#[derive(Debug)]
pub struct Session {
    chain: AcquisitionChain,
    history: Mutex<History>,
    flight: Mutex<Flight>,
}

impl Session {
    /// New idle session.
    pub fn new(chain: AcquisitionChain, history: History) -> Self {
        Self {
            chain,
            history: Mutex::new(history),
            flight: Mutex::new(Flight::default()),
        }
    }

    /// The underlying chain.
    pub fn chain(&self) -> &AcquisitionChain {
        &self.chain
    }

    fn flight(&self) -> MutexGuard<'_, Flight> {
        self.flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether an acquisition is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.flight().in_flight.is_some()
    }

    /// Generation number of the most recent accepted or superseding call.
    pub fn generation(&self) -> u64 {
        self.flight().generation
    }

    /// Run the chain for `request` unless another acquisition is outstanding.
    ///
    /// On a current completion the payload is recorded in the history.
    pub async fn generate(&self, request: &GenerationRequest) -> AcquireOutcome {
        let ticket = {
            let mut flight = self.flight();
            if flight.in_flight.is_some() {
                tracing::debug!("Generation already in progress, ignoring request");
                return AcquireOutcome::Busy;
            }
            flight.generation += 1;
            flight.in_flight = Some(flight.generation);
            flight.generation
        };
        let guard = InFlight {
            flight: &self.flight,
            ticket,
        };

        let result = self.chain.acquire(request).await;

        let current = self.flight().generation == ticket;
        drop(guard);

        if !current {
            tracing::debug!(ticket, "Discarding superseded QR result");
            return AcquireOutcome::Superseded;
        }

        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record(request.payload());
        AcquireOutcome::Ready(result)
    }

    /// Abandon the outstanding acquisition, if any, so a new one may start.
    ///
    /// Returns the new generation number.
    pub fn supersede(&self) -> u64 {
        let mut flight = self.flight();
        flight.generation += 1;
        flight.in_flight = None;
        flight.generation
    }

    /// Recent targets, most recent first.
    pub fn recent_targets(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries()
            .to_vec()
    }
}

/// Releases the in-flight slot if it still belongs to this ticket, including on cancellation.
struct InFlight<'a> {
    flight: &'a Mutex<Flight>,
    ticket: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut flight = self.flight.lock().unwrap_or_else(|e| e.into_inner());
        if flight.in_flight == Some(self.ticket) {
            flight.in_flight = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Placeholder, Provider, ProviderKind};
    use std::time::Duration;

    fn session() -> Session {
        let chain = AcquisitionChain::new(
            vec![Provider::Placeholder(Placeholder)],
            Duration::from_secs(1),
        );
        Session::new(chain, History::in_memory(5))
    }

    #[tokio::test]
    async fn ready_result_updates_history() {
        let session = session();
        let request = GenerationRequest::new("https://a.b/c", 64).unwrap();

        let outcome = session.generate(&request).await;
        let result = outcome.into_result().unwrap();
        assert_eq!(result.source(), ProviderKind::Placeholder);
        assert!(!session.is_busy());
        assert_eq!(session.recent_targets(), vec!["https://a.b/c"]);
        assert_eq!(session.generation(), 1);
    }

    #[test]
    fn supersede_bumps_generation() {
        let session = session();
        assert_eq!(session.supersede(), 1);
        assert_eq!(session.supersede(), 2);
        assert!(!session.is_busy());
    }

    #[test]
    fn guard_clears_only_its_own_ticket() {
        let flight = Mutex::new(Flight {
            generation: 2,
            in_flight: Some(2),
        });
        drop(InFlight {
            flight: &flight,
            ticket: 1,
        });
        assert_eq!(flight.lock().unwrap().in_flight, Some(2));
        drop(InFlight {
            flight: &flight,
            ticket: 2,
        });
        assert_eq!(flight.lock().unwrap().in_flight, None);
    }
}
