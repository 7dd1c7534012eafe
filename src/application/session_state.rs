// Session state - The single mutable aggregate read by presentation
use crate::application::subscribers::TelemetrySubscriber;
use crate::domain::alert::AlertState;
use crate::domain::chat::{ChatMessage, MessageDraft, WELCOME_NOTICE};
use crate::domain::errors::DecodeError;
use crate::domain::telemetry::TelemetrySample;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    #[default]
    Connecting,
    Live,
    Closed,
}

/// Read-only copy of the whole session, handed to presentation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub sample: TelemetrySample,
    pub alert: AlertState,
    pub link: LinkStatus,
    pub decode_errors: u64,
    pub messages: Vec<ChatMessage>,
    pub ended: bool,
}

// Written only by the telemetry side (stream + alert evaluator).
#[derive(Default)]
struct TelemetryGroup {
    sample: TelemetrySample,
    alert: AlertState,
    link: LinkStatus,
    decode_errors: u64,
}

// Written only by the conversation orchestrator.
struct ChatGroup {
    messages: Vec<ChatMessage>,
    next_sequence: u64,
}

impl ChatGroup {
    fn push(&mut self, draft: MessageDraft) -> ChatMessage {
        let message = ChatMessage {
            sequence: self.next_sequence,
            sender: draft.sender,
            text: draft.text,
            created_at: Utc::now(),
        };
        self.next_sequence += 1;
        self.messages.push(message.clone());
        message
    }
}

/// Session aggregate. Sample and alert live behind one lock, the message log
/// behind another, so telemetry and chat traffic never serialize each other.
///
/// After [`SessionState::end`] every mutation entry point is a silent no-op.
pub struct SessionState {
    telemetry: Mutex<TelemetryGroup>,
    chat: Mutex<ChatGroup>,
    ended: AtomicBool,
    snapshots: watch::Sender<SessionSnapshot>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionState {
    /// Fresh session: zero telemetry, no alert, one system welcome message.
    pub fn new() -> Self {
        let mut chat = ChatGroup {
            messages: Vec::new(),
            next_sequence: 1,
        };
        chat.push(MessageDraft::system(WELCOME_NOTICE));

        let telemetry = TelemetryGroup::default();
        let initial = SessionSnapshot {
            sample: telemetry.sample.clone(),
            alert: telemetry.alert.clone(),
            link: telemetry.link,
            decode_errors: 0,
            messages: chat.messages.clone(),
            ended: false,
        };
        let (snapshots, _) = watch::channel(initial);

        Self {
            telemetry: Mutex::new(telemetry),
            chat: Mutex::new(chat),
            ended: AtomicBool::new(false),
            snapshots,
        }
    }

    /// Replace the current sample wholesale.
    pub fn apply_sample(&self, sample: TelemetrySample) -> bool {
        self.mutate_telemetry(|group| group.sample = sample)
    }

    pub fn apply_alert(&self, alert: AlertState) -> bool {
        self.mutate_telemetry(|group| group.alert = alert)
    }

    pub fn set_link(&self, link: LinkStatus) -> bool {
        self.mutate_telemetry(|group| group.link = link)
    }

    pub fn record_decode_error(&self) -> bool {
        self.mutate_telemetry(|group| group.decode_errors += 1)
    }

    pub fn append_message(&self, draft: MessageDraft) -> Option<ChatMessage> {
        self.append_messages(vec![draft]).pop()
    }

    /// Append a group of messages with contiguous sequence numbers; no other
    /// append can land between them. Returns nothing once the session ended.
    pub fn append_messages(&self, drafts: Vec<MessageDraft>) -> Vec<ChatMessage> {
        let appended: Vec<ChatMessage> = {
            let mut chat = lock(&self.chat);
            if self.is_ended() {
                return Vec::new();
            }
            drafts.into_iter().map(|d| chat.push(d)).collect()
        };

        if !appended.is_empty() {
            self.publish();
        }
        appended
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (sample, alert, link, decode_errors) = {
            let t = lock(&self.telemetry);
            (t.sample.clone(), t.alert.clone(), t.link, t.decode_errors)
        };
        let messages = self.messages();

        SessionSnapshot {
            sample,
            alert,
            link,
            decode_errors,
            messages,
            ended: self.is_ended(),
        }
    }

    pub fn latest_sample(&self) -> TelemetrySample {
        lock(&self.telemetry).sample.clone()
    }

    pub fn alert(&self) -> AlertState {
        lock(&self.telemetry).alert.clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        lock(&self.chat).messages.clone()
    }

    /// Snapshots are republished after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Discard the session. Idempotent.
    pub fn end(&self) {
        {
            let _telemetry = lock(&self.telemetry);
            let _chat = lock(&self.chat);
            if self.ended.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        tracing::info!("Session ended");
        self.publish();
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    fn mutate_telemetry(&self, apply: impl FnOnce(&mut TelemetryGroup)) -> bool {
        {
            let mut group = lock(&self.telemetry);
            if self.is_ended() {
                return false;
            }
            apply(&mut group);
        }
        self.publish();
        true
    }

    // Composed under the watch lock so the last published snapshot is always current.
    fn publish(&self) {
        self.snapshots.send_modify(|snapshot| *snapshot = self.snapshot());
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySubscriber for SessionState {
    fn on_open(&self) {
        self.set_link(LinkStatus::Live);
    }

    fn on_sample(&self, sample: &TelemetrySample) {
        self.apply_sample(sample.clone());
    }

    fn on_decode_error(&self, _error: &DecodeError) {
        self.record_decode_error();
    }

    fn on_close(&self) {
        self.set_link(LinkStatus::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::Sender;

    fn sample(id: u64, dtc: Option<&str>) -> TelemetrySample {
        TelemetrySample {
            id,
            rpm: 1500,
            speed: 40.0,
            temperature: 95.0,
            dtc: dtc.map(str::to_string),
            ..TelemetrySample::default()
        }
    }

    #[test]
    fn test_new_session_has_welcome_message_and_zero_telemetry() {
        let session = SessionState::new();
        let snapshot = session.snapshot();

        assert_eq!(snapshot.sample, TelemetrySample::default());
        assert!(!snapshot.alert.active);
        assert_eq!(snapshot.link, LinkStatus::Connecting);
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].sender, Sender::System);
        assert_eq!(snapshot.messages[0].sequence, 1);
    }

    #[test]
    fn test_sample_is_replaced_not_merged() {
        let session = SessionState::new();
        session.apply_sample(sample(1, Some("P0217")));
        session.apply_sample(sample(2, None));

        let latest = session.latest_sample();
        assert_eq!(latest.id, 2);
        assert!(latest.dtc.is_none());
    }

    #[test]
    fn test_grouped_append_gets_contiguous_sequences() {
        let session = SessionState::new();
        session.append_message(MessageDraft::user("hi"));
        let group = session.append_messages(vec![
            MessageDraft::agent("a"),
            MessageDraft::agent("b"),
            MessageDraft::agent("c"),
        ]);

        let sequences: Vec<u64> = group.iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![3, 4, 5]);

        let all: Vec<u64> = session.messages().iter().map(|m| m.sequence).collect();
        assert_eq!(all, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_mutations_after_end_are_noops() {
        let session = SessionState::new();
        session.end();
        session.end();

        assert!(!session.apply_sample(sample(9, None)));
        assert!(!session.apply_alert(AlertState::raised("P0217".into(), 9)));
        assert!(session.append_message(MessageDraft::agent("late")).is_none());

        let snapshot = session.snapshot();
        assert!(snapshot.ended);
        assert_eq!(snapshot.sample.id, 0);
        assert!(!snapshot.alert.active);
        assert_eq!(snapshot.messages.len(), 1);
    }

    #[test]
    fn test_subscribers_see_every_mutation() {
        let session = SessionState::new();
        let mut rx = session.subscribe();
        assert!(!rx.has_changed().unwrap());

        session.apply_sample(sample(4, None));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().sample.id, 4);

        session.append_message(MessageDraft::user("status?"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().messages.len(), 2);
    }

    #[test]
    fn test_telemetry_callbacks_drive_link_status() {
        let session = SessionState::new();
        session.on_open();
        assert_eq!(session.snapshot().link, LinkStatus::Live);

        session.on_decode_error(&DecodeError::NotUtf8);
        session.on_decode_error(&DecodeError::NotUtf8);
        assert_eq!(session.snapshot().decode_errors, 2);

        session.on_close();
        assert_eq!(session.snapshot().link, LinkStatus::Closed);
    }
}
