// Alert evaluator - Edge-triggered NORMAL/CRITICAL state machine over telemetry
use crate::application::session_state::SessionState;
use crate::application::subscribers::{AlertListener, TelemetrySubscriber};
use crate::domain::alert::{AlertEvent, AlertState, CriticalCode};
use crate::domain::telemetry::TelemetrySample;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertPhase {
    Normal,
    Critical { code: String, since_sample_id: u64 },
}

/// Raises the session alert on the first sample carrying a critical code.
///
/// There is no telemetry-driven way back to `Normal`: once critical, the
/// evaluator stays critical until [`AlertEvaluator::clear`] is called.
/// All critical codes share one state, so a second distinct code arriving
/// while already critical does not fire.
pub struct AlertEvaluator {
    critical_codes: Vec<CriticalCode>,
    phase: Mutex<AlertPhase>,
    session: Arc<SessionState>,
    listeners: Vec<Arc<dyn AlertListener>>,
}

impl AlertEvaluator {
    pub fn new(critical_codes: Vec<CriticalCode>, session: Arc<SessionState>) -> Self {
        Self {
            critical_codes,
            phase: Mutex::new(AlertPhase::Normal),
            session,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn AlertListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Run one sample through the state machine. Returns the event if this
    /// sample was the onset of a critical condition.
    pub fn evaluate(&self, sample: &TelemetrySample) -> Option<AlertEvent> {
        let critical = self.recognize(sample.dtc.as_deref()?)?;

        // Phase and session alert change under the same guard so a concurrent
        // clear cannot interleave between them.
        {
            let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
            if *phase != AlertPhase::Normal {
                return None;
            }
            *phase = AlertPhase::Critical {
                code: critical.code.clone(),
                since_sample_id: sample.id,
            };
            self.session
                .apply_alert(AlertState::raised(critical.code.clone(), sample.id));
        }

        tracing::warn!(
            "Critical fault {} ({}) on sample {}",
            critical.code,
            critical.description,
            sample.id
        );

        let event = AlertEvent {
            code: critical.clone(),
            sample_id: sample.id,
        };
        for listener in &self.listeners {
            listener.on_alert(&event);
        }
        Some(event)
    }

    /// Explicit reset to `Normal`. Idempotent; emits no events.
    /// Returns whether an active alert was cleared.
    pub fn clear(&self) -> bool {
        let previous = {
            let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
            let previous = std::mem::replace(&mut *phase, AlertPhase::Normal);
            if previous != AlertPhase::Normal {
                self.session.apply_alert(AlertState::default());
            }
            previous
        };
        let AlertPhase::Critical {
            code,
            since_sample_id,
        } = previous
        else {
            return false;
        };

        tracing::info!("Alert {} cleared (raised on sample {})", code, since_sample_id);
        true
    }

    fn recognize(&self, code: &str) -> Option<&CriticalCode> {
        self.critical_codes.iter().find(|c| c.code == code)
    }
}

impl TelemetrySubscriber for AlertEvaluator {
    fn on_sample(&self, sample: &TelemetrySample) {
        self.evaluate(sample);
    }
}
