//! Server revival
//!
//! Bounded retry loop around [`LivenessProber::probe`] used before every chat
//! request. Attempts are sequential with a fixed pause; there is no
//! exponential growth and no jitter.

use std::time::Duration;

use tokio::time::sleep;

use crate::error::{RelayError, Result};
use crate::liveness::LivenessProber;

/// How many times to probe and how long to wait in between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevivalPolicy {
    /// Maximum number of probes (at least one is always made)
    pub max_attempts: u32,
    /// Pause between a failed probe and the next one
    pub pause: Duration,
}

impl Default for RevivalPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            pause: Duration::ZERO,
        }
    }
}

impl RevivalPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub const fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }
}

/// Operator feedback hooks, called from the revival loop
pub trait RevivalObserver: Send {
    /// A probe is about to be issued; `attempt` is 1-based
    fn on_attempt(&mut self, _attempt: u32, _max_attempts: u32) {}

    /// The backend answered
    fn on_revived(&mut self, _attempt: u32) {}

    /// Every attempt failed
    fn on_exhausted(&mut self, _attempts: u32) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl RevivalObserver for SilentObserver {}

/// Probe until the backend is up or the policy is exhausted.
///
/// Returns the 1-based attempt that succeeded, or
/// [`RelayError::ServerUnavailable`].
pub async fn revive_server(
    prober: &LivenessProber,
    policy: &RevivalPolicy,
    observer: &mut dyn RevivalObserver,
) -> Result<u32> {
    let max_attempts = policy.attempts();
    for attempt in 1..=max_attempts {
        observer.on_attempt(attempt, max_attempts);
        if prober.probe().await {
            tracing::info!("Backend is awake after {} attempt(s)", attempt);
            observer.on_revived(attempt);
            return Ok(attempt);
        }

        tracing::warn!(
            "Backend did not answer (attempt {}/{})",
            attempt,
            max_attempts
        );
        if attempt < max_attempts && !policy.pause.is_zero() {
            sleep(policy.pause).await;
        }
    }

    tracing::error!("Backend unavailable after {} attempts", max_attempts);
    observer.on_exhausted(max_attempts);
    Err(RelayError::ServerUnavailable {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpTransport, TransportRequest, TransportResponse, TransportStatus};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedHealth {
        statuses: Mutex<VecDeque<Result<u16>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedHealth {
        fn new(statuses: Vec<Result<u16>>) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedHealth {
        async fn get(&self, _url: &str, _timeout: Duration) -> Result<TransportStatus> {
            *self.calls.lock().unwrap() += 1;
            let status = self.statuses.lock().unwrap().pop_front().unwrap_or(Ok(503))?;
            Ok(TransportStatus {
                status,
                body: String::new(),
            })
        }

        async fn post_json_stream(&self, _request: TransportRequest) -> Result<TransportResponse> {
            Err(RelayError::InternalError("not scripted".into()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        attempts: Vec<u32>,
        revived: Option<u32>,
        exhausted: Option<u32>,
    }

    impl RevivalObserver for Recorder {
        fn on_attempt(&mut self, attempt: u32, max_attempts: u32) {
            assert_eq!(max_attempts, 4);
            self.attempts.push(attempt);
        }

        fn on_revived(&mut self, attempt: u32) {
            self.revived = Some(attempt);
        }

        fn on_exhausted(&mut self, attempts: u32) {
            self.exhausted = Some(attempts);
        }
    }

    fn prober(transport: Arc<ScriptedHealth>) -> LivenessProber {
        LivenessProber::new(transport, "http://health.test/health", Duration::from_secs(1))
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let transport = ScriptedHealth::new(vec![
            Ok(503),
            Err(RelayError::ConnectionError("refused".into())),
            Ok(200),
        ]);
        let mut recorder = Recorder::default();
        let attempt = revive_server(
            &prober(transport.clone()),
            &RevivalPolicy::default(),
            &mut recorder,
        )
        .await
        .unwrap();

        assert_eq!(attempt, 3);
        assert_eq!(transport.calls(), 3);
        assert_eq!(recorder.attempts, [1, 2, 3]);
        assert_eq!(recorder.revived, Some(3));
        assert_eq!(recorder.exhausted, None);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let transport = ScriptedHealth::new(vec![]);
        let mut recorder = Recorder::default();
        let err = revive_server(
            &prober(transport.clone()),
            &RevivalPolicy::default(),
            &mut recorder,
        )
        .await
        .unwrap_err();

        assert_eq!(err, RelayError::ServerUnavailable { attempts: 4 });
        assert_eq!(transport.calls(), 4);
        assert_eq!(recorder.exhausted, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_attempts_only() {
        let transport = ScriptedHealth::new(vec![Ok(500), Ok(200)]);
        let policy = RevivalPolicy::new()
            .with_max_attempts(2)
            .with_pause(Duration::from_secs(30));
        let started = tokio::time::Instant::now();
        let attempt = revive_server(&prober(transport), &policy, &mut SilentObserver)
            .await
            .unwrap();
        assert_eq!(attempt, 2);
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn zero_attempts_still_probes_once() {
        let transport = ScriptedHealth::new(vec![Ok(200)]);
        let policy = RevivalPolicy::new().with_max_attempts(0);
        let attempt = revive_server(&prober(transport.clone()), &policy, &mut SilentObserver)
            .await
            .unwrap();
        assert_eq!(attempt, 1);
        assert_eq!(transport.calls(), 1);
    }
}
