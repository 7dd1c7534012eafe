// Callback traits for telemetry and alert events
use crate::domain::alert::AlertEvent;
use crate::domain::errors::DecodeError;
use crate::domain::telemetry::TelemetrySample;

/// Receives decoded telemetry, in frame-arrival order, exactly once per frame.
///
/// Callbacks run on the stream's reader task and must not block.
pub trait TelemetrySubscriber: Send + Sync {
    fn on_open(&self) {}

    fn on_sample(&self, sample: &TelemetrySample);

    fn on_decode_error(&self, _error: &DecodeError) {}

    /// The connection ended, whether dropped by the source or torn down locally.
    fn on_close(&self) {}
}

/// Receives edge-triggered alert events.
pub trait AlertListener: Send + Sync {
    fn on_alert(&self, event: &AlertEvent);
}
