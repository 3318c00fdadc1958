//! Serial multi-address connection.
//!
//! Candidates are tried strictly one after another, in resolution order.
//! A configured timeout bounds the whole sequence, not each attempt: the
//! time left is re-divided over the remaining candidates before every
//! attempt, with a floor so a long candidate list cannot starve each attempt.

use super::connect::{AttemptOptions, Connect};
use super::DialRequest;
use crate::error::DialError;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

/// Smallest slice of the budget any single attempt is given.
///
/// The overall deadline still caps every attempt.
pub const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Time budget for one dial, fixed when the dial starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl TimeBudget {
    /// Budget starting now.
    pub fn start(timeout: Option<Duration>, deadline: Option<Instant>) -> Self {
        Self::start_at(Instant::now(), timeout, deadline)
    }

    /// Budget starting at `now`.
    ///
    /// The effective deadline is `now + timeout`, or the absolute deadline if
    /// that comes first.
    pub fn start_at(now: Instant, timeout: Option<Duration>, deadline: Option<Instant>) -> Self {
        let timeout = timeout.filter(|t| !t.is_zero());
        let deadline = match (timeout.map(|t| now + t), deadline) {
            (Some(relative), Some(absolute)) => Some(relative.min(absolute)),
            (relative, absolute) => relative.or(absolute),
        };

        Self { timeout, deadline }
    }

    /// A budget with no bound at all.
    pub fn unbounded() -> Self {
        Self {
            timeout: None,
            deadline: None,
        }
    }

    /// The effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cutoff for the next attempt when `remaining` candidates are left,
    /// including the one about to be tried.
    pub fn attempt_deadline(&self, now: Instant, remaining: usize) -> Option<Instant> {
        let deadline = self.deadline?;
        let left = deadline.saturating_duration_since(now);
        let share = u32::try_from(remaining.max(1)).unwrap_or(u32::MAX);

        let mut slice = (left / share).max(MIN_ATTEMPT_TIMEOUT);
        if let Some(timeout) = self.timeout {
            slice = slice.min(timeout);
        }

        Some((now + slice).min(deadline))
    }
}

fn timeout_error() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "i/o timeout")
}

/// Tries each candidate of a [`DialRequest`] in turn.
#[derive(Debug, Clone, Default)]
pub struct SerialConnector<C> {
    connector: C,
}

impl<C> SerialConnector<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C: Connect> SerialConnector<C> {
    /// Connect to the first reachable candidate.
    ///
    /// Returns the first success immediately. If every candidate fails, the
    /// error of the first candidate is returned; later failures are usually
    /// repeats of the same condition. An empty candidate list yields
    /// [`DialError::NoAddresses`].
    pub async fn connect_any(
        &self,
        request: &DialRequest,
        budget: TimeBudget,
        options: &AttemptOptions,
    ) -> Result<C::Stream, DialError> {
        let total = request.candidates.len();
        let mut first_err: Option<DialError> = None;

        for (index, ip) in request.candidates.iter().enumerate() {
            let target = SocketAddr::new(*ip, request.port);
            let now = Instant::now();
            let cutoff = budget.attempt_deadline(now, total - index);

            trace!(
                %target,
                attempt = index + 1,
                of = total,
                budget_ms = cutoff.map(|c| c.saturating_duration_since(now).as_millis() as u64),
                "dialing candidate"
            );

            let result = match cutoff {
                Some(cutoff) if cutoff <= now => Err(timeout_error()),
                Some(cutoff) => {
                    let attempt = self.connector.connect(&request.transport, target, options);
                    timeout_at(cutoff, attempt)
                        .await
                        .unwrap_or_else(|_| Err(timeout_error()))
                }
                None => self.connector.connect(&request.transport, target, options).await,
            };

            match result {
                Ok(stream) => {
                    debug!(address = %request.address, %target, "connected");
                    return Ok(stream);
                }
                Err(source) => {
                    debug!(%target, error = %source, "candidate failed");
                    if first_err.is_none() {
                        first_err = Some(DialError::Connect {
                            transport: request.transport.clone(),
                            target,
                            source,
                        });
                    }
                }
            }
        }

        Err(first_err.unwrap_or_else(|| DialError::NoAddresses {
            address: request.address.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DialErrorKind;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::net::IpAddr;
    use std::sync::Mutex;

    /// Connector with scripted per-address outcomes that records each attempt.
    #[derive(Default)]
    struct ScriptedConnector {
        outcomes: HashMap<IpAddr, Outcome>,
        attempts: Mutex<Vec<(SocketAddr, Instant)>>,
    }

    #[derive(Clone, Copy)]
    enum Outcome {
        Accept,
        Refuse,
        Unreachable,
        Hang,
    }

    impl ScriptedConnector {
        fn with(mut self, ip: &str, outcome: Outcome) -> Self {
            self.outcomes.insert(ip.parse().unwrap(), outcome);
            self
        }

        fn attempted(&self) -> Vec<IpAddr> {
            self.attempts.lock().unwrap().iter().map(|(a, _)| a.ip()).collect()
        }
    }

    #[async_trait]
    impl Connect for ScriptedConnector {
        type Stream = SocketAddr;

        async fn connect(
            &self,
            _transport: &str,
            target: SocketAddr,
            _options: &AttemptOptions,
        ) -> io::Result<SocketAddr> {
            self.attempts.lock().unwrap().push((target, Instant::now()));
            match self.outcomes.get(&target.ip()).copied().unwrap_or(Outcome::Hang) {
                Outcome::Accept => Ok(target),
                Outcome::Refuse => Err(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )),
                Outcome::Unreachable => Err(io::Error::new(
                    io::ErrorKind::Other,
                    "network is unreachable",
                )),
                Outcome::Hang => std::future::pending().await,
            }
        }
    }

    fn request(candidates: &[&str]) -> DialRequest {
        DialRequest {
            transport: "tcp".to_string(),
            address: "example.org:80".to_string(),
            host: "example.org".to_string(),
            port: 80,
            candidates: candidates.iter().map(|c| c.parse().unwrap()).collect(),
        }
    }

    #[test]
    fn test_budget_deadline_is_earliest() {
        let now = Instant::now();
        let absolute = now + Duration::from_secs(3);

        let budget = TimeBudget::start_at(now, Some(Duration::from_secs(10)), Some(absolute));
        assert_eq!(budget.deadline(), Some(absolute));

        let budget = TimeBudget::start_at(now, Some(Duration::from_secs(1)), Some(absolute));
        assert_eq!(budget.deadline(), Some(now + Duration::from_secs(1)));

        let budget = TimeBudget::start_at(now, None, Some(absolute));
        assert_eq!(budget.deadline(), Some(absolute));

        let budget = TimeBudget::start_at(now, Some(Duration::ZERO), None);
        assert_eq!(budget.deadline(), None);
        assert_eq!(budget.attempt_deadline(now, 3), None);
    }

    #[test]
    fn test_attempt_share_and_floor() {
        let now = Instant::now();
        let budget = TimeBudget::start_at(now, Some(Duration::from_secs(30)), None);

        // 30s over 3 candidates
        assert_eq!(
            budget.attempt_deadline(now, 3),
            Some(now + Duration::from_secs(10))
        );
        // 30s over 30 candidates would be 1s; floored to 2s
        assert_eq!(
            budget.attempt_deadline(now, 30),
            Some(now + MIN_ATTEMPT_TIMEOUT)
        );
        // the floor never reaches past the deadline
        let late = now + Duration::from_secs(29);
        assert_eq!(
            budget.attempt_deadline(late, 5),
            Some(now + Duration::from_secs(30))
        );
    }

    #[test]
    fn test_short_timeout_caps_attempt() {
        let now = Instant::now();
        let budget = TimeBudget::start_at(now, Some(Duration::from_secs(1)), None);
        assert_eq!(
            budget.attempt_deadline(now, 4),
            Some(now + Duration::from_secs(1))
        );
    }

    #[test]
    fn test_deadline_only_budget_uses_floor() {
        let now = Instant::now();
        let budget = TimeBudget::start_at(now, None, Some(now + Duration::from_secs(60)));
        assert_eq!(
            budget.attempt_deadline(now, 2),
            Some(now + Duration::from_secs(30))
        );
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let connector = ScriptedConnector::default()
            .with("192.0.2.1", Outcome::Accept)
            .with("192.0.2.2", Outcome::Accept);
        let serial = SerialConnector::new(connector);

        let stream = serial
            .connect_any(
                &request(&["192.0.2.1", "192.0.2.2", "192.0.2.3"]),
                TimeBudget::unbounded(),
                &AttemptOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(stream, "192.0.2.1:80".parse::<SocketAddr>().unwrap());
        assert_eq!(serial.connector().attempted(), vec!["192.0.2.1".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_falls_through_to_next_candidate() {
        let connector = ScriptedConnector::default()
            .with("192.0.2.1", Outcome::Refuse)
            .with("2001:db8::1", Outcome::Accept);
        let serial = SerialConnector::new(connector);

        let stream = serial
            .connect_any(
                &request(&["192.0.2.1", "2001:db8::1"]),
                TimeBudget::unbounded(),
                &AttemptOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(stream, "[2001:db8::1]:80".parse::<SocketAddr>().unwrap());
        assert_eq!(serial.connector().attempted().len(), 2);
    }

    #[tokio::test]
    async fn test_first_error_is_reported() {
        let connector = ScriptedConnector::default()
            .with("192.0.2.1", Outcome::Refuse)
            .with("192.0.2.2", Outcome::Unreachable);
        let serial = SerialConnector::new(connector);

        let err = serial
            .connect_any(
                &request(&["192.0.2.1", "192.0.2.2"]),
                TimeBudget::unbounded(),
                &AttemptOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), DialErrorKind::ConnectionFailure);
        match err {
            DialError::Connect { target, source, .. } => {
                assert_eq!(target, "192.0.2.1:80".parse::<SocketAddr>().unwrap());
                assert_eq!(source.kind(), io::ErrorKind::ConnectionRefused);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(serial.connector().attempted().len(), 2);
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let serial = SerialConnector::new(ScriptedConnector::default());
        let err = serial
            .connect_any(&request(&[]), TimeBudget::unbounded(), &AttemptOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), DialErrorKind::NoAddressesFound);
        assert_eq!(err.to_string(), "dial example.org:80: no IP addresses found");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds_whole_sequence() {
        let serial = SerialConnector::new(ScriptedConnector::default());
        let timeout = Duration::from_secs(10);
        let start = Instant::now();

        let err = serial
            .connect_any(
                &request(&["192.0.2.1", "192.0.2.2", "192.0.2.3"]),
                TimeBudget::start(Some(timeout), None),
                &AttemptOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(start.elapsed() <= timeout);

        // Each candidate got an equal share of the ten seconds.
        let attempts = serial.connector().attempts.lock().unwrap().clone();
        assert_eq!(attempts.len(), 3);
        let gap = attempts[1].1 - attempts[0].1;
        assert!(gap >= Duration::from_millis(3333) && gap <= Duration::from_millis(3334));
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_candidates_keep_the_floor() {
        let serial = SerialConnector::new(ScriptedConnector::default());
        let timeout = Duration::from_secs(10);
        let start = Instant::now();
        let candidates: Vec<String> = (1..=20).map(|i| format!("192.0.2.{}", i)).collect();
        let candidates: Vec<&str> = candidates.iter().map(String::as_str).collect();

        let err = serial
            .connect_any(
                &request(&candidates),
                TimeBudget::start(Some(timeout), None),
                &AttemptOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(start.elapsed() <= timeout);

        // 10s / 20 would be 500ms each; the 2s floor means only five
        // candidates are ever tried before the deadline runs out.
        let attempts = serial.connector().attempts.lock().unwrap().clone();
        assert_eq!(attempts.len(), 5);
        for pair in attempts.windows(2) {
            assert_eq!(pair[1].1 - pair[0].1, MIN_ATTEMPT_TIMEOUT);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_deadline_makes_no_attempt() {
        let serial = SerialConnector::new(
            ScriptedConnector::default().with("192.0.2.1", Outcome::Accept),
        );
        let deadline = Instant::now();
        tokio::time::advance(Duration::from_secs(1)).await;

        let err = serial
            .connect_any(
                &request(&["192.0.2.1"]),
                TimeBudget::start(None, Some(deadline)),
                &AttemptOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(serial.connector().attempted().is_empty());
    }
}
