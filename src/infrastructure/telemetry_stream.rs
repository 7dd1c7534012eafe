// WebSocket telemetry stream - Decodes inbound frames and fans them out to subscribers
use crate::application::subscribers::TelemetrySubscriber;
use crate::domain::errors::{DecodeError, TransportError};
use crate::domain::telemetry::TelemetrySample;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Handle to a live telemetry connection. Cheap to clone; dropping every
/// clone also disconnects.
#[derive(Clone)]
pub struct StreamHandle {
    shutdown: Arc<watch::Sender<bool>>,
    finished: watch::Receiver<bool>,
}

impl StreamHandle {
    /// Tear the connection down. Idempotent, and safe to call from inside a
    /// subscriber callback (including `on_close`).
    pub fn disconnect(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once the reader task has exited and `on_close` has been delivered.
    pub async fn wait_closed(&self) {
        let mut finished = self.finished.clone();
        let _ = finished.wait_for(|done| *done).await;
    }
}

/// Turns raw frames into subscriber callbacks, one frame at a time.
struct FrameDispatcher {
    subscribers: Vec<Arc<dyn TelemetrySubscriber>>,
    frames_seen: u64,
}

impl FrameDispatcher {
    fn open(&self) {
        for subscriber in &self.subscribers {
            subscriber.on_open();
        }
    }

    fn dispatch(&mut self, payload: Result<&[u8], DecodeError>) {
        self.frames_seen += 1;

        match payload.and_then(|bytes| TelemetrySample::decode(self.frames_seen, bytes)) {
            Ok(sample) => {
                for subscriber in &self.subscribers {
                    subscriber.on_sample(&sample);
                }
            }
            Err(e) => {
                tracing::warn!("Dropping telemetry frame {}: {}", self.frames_seen, e);
                for subscriber in &self.subscribers {
                    subscriber.on_decode_error(&e);
                }
            }
        }
    }

    fn close(&self) {
        for subscriber in &self.subscribers {
            subscriber.on_close();
        }
    }
}

pub struct TelemetryStream;

impl TelemetryStream {
    /// Open the connection and start delivering samples. Subscribers are called
    /// in registration order for every frame, frames in arrival order.
    /// No reconnection is attempted once the connection ends.
    pub async fn connect(
        endpoint: &str,
        subscribers: Vec<Arc<dyn TelemetrySubscriber>>,
    ) -> Result<StreamHandle, TransportError> {
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
        }

        let (mut ws, _) = connect_async(endpoint)
            .await
            .map_err(|e| TransportError::Connect(Box::new(e)))?;
        tracing::info!("Telemetry connected to {}", endpoint);

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (finished_tx, finished_rx) = watch::channel(false);

        let mut dispatcher = FrameDispatcher {
            subscribers,
            frames_seen: 0,
        };
        dispatcher.open();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Telemetry disconnect requested");
                        let _ = ws.close(None).await;
                        break;
                    }
                    msg = ws.next() => match msg {
                        Some(Ok(Message::Text(text))) => dispatcher.dispatch(Ok(text.as_bytes())),
                        Some(Ok(Message::Binary(bytes))) => dispatcher.dispatch(
                            std::str::from_utf8(&bytes)
                                .map(str::as_bytes)
                                .map_err(|_| DecodeError::NotUtf8),
                        ),
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!("Telemetry source closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!("{}", TransportError::Lost(Box::new(e)));
                            break;
                        }
                    },
                }
            }

            dispatcher.close();
            finished_tx.send_replace(true);
        });

        Ok(StreamHandle {
            shutdown: Arc::new(shutdown_tx),
            finished: finished_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::net::TcpListener;
    use tokio::sync::Notify;
    use tokio_tungstenite::accept_async;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Open,
        Sample(u64, Option<String>),
        DecodeError,
        Close,
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
        sampled: Notify,
        handle: Mutex<Option<StreamHandle>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl TelemetrySubscriber for Recorder {
        fn on_open(&self) {
            self.events.lock().unwrap().push(Event::Open);
        }

        fn on_sample(&self, sample: &TelemetrySample) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Sample(sample.id, sample.dtc.clone()));
            self.sampled.notify_one();
        }

        fn on_decode_error(&self, _error: &DecodeError) {
            self.events.lock().unwrap().push(Event::DecodeError);
        }

        fn on_close(&self) {
            self.events.lock().unwrap().push(Event::Close);
            if let Some(handle) = self.handle.lock().unwrap().as_ref() {
                handle.disconnect();
            }
        }
    }

    /// Accepts one client, sends `frames`, then either closes or waits for the client to leave.
    async fn serve(frames: Vec<Message>, hold_open: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            for frame in frames {
                ws.send(frame).await.unwrap();
            }
            if hold_open {
                while let Some(Ok(_)) = ws.next().await {}
            } else {
                let _ = ws.close(None).await;
            }
        });
        format!("ws://{}", addr)
    }

    #[tokio::test]
    async fn test_frames_delivered_in_order_and_corrupt_frames_skipped() {
        let endpoint = serve(
            vec![
                Message::Text(r#"{"rpm":900,"speed":0,"temp":95,"dtc":null}"#.into()),
                Message::Text("{not json".into()),
                Message::Binary(br#"{"rpm":3000,"speed":70,"temp":130,"dtc":"P0217"}"#.to_vec().into()),
                Message::Binary(vec![0xff, 0xfe, 0x00].into()),
                Message::Text(r#"{"rpm":3100,"speed":72,"temp":131,"dtc":"P0217"}"#.into()),
            ],
            false,
        )
        .await;
        let recorder = Arc::new(Recorder::default());

        let handle = TelemetryStream::connect(&endpoint, vec![recorder.clone()])
            .await
            .unwrap();
        handle.wait_closed().await;

        assert_eq!(
            recorder.events(),
            vec![
                Event::Open,
                Event::Sample(1, None),
                Event::DecodeError,
                Event::Sample(3, Some("P0217".into())),
                Event::DecodeError,
                Event::Sample(5, Some("P0217".into())),
                Event::Close,
            ]
        );
        handle.disconnect();
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_and_reentrant() {
        let endpoint = serve(
            vec![Message::Text(r#"{"rpm":900,"speed":0,"temp":95}"#.into())],
            true,
        )
        .await;
        let recorder = Arc::new(Recorder::default());

        let handle = TelemetryStream::connect(&endpoint, vec![recorder.clone()])
            .await
            .unwrap();
        *recorder.handle.lock().unwrap() = Some(handle.clone());
        recorder.sampled.notified().await;

        handle.disconnect();
        handle.disconnect();
        handle.wait_closed().await;
        handle.disconnect();

        let events = recorder.events();
        assert_eq!(events.iter().filter(|e| **e == Event::Close).count(), 1);
        assert_eq!(events.last(), Some(&Event::Close));
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_every_frame() {
        let endpoint = serve(
            vec![
                Message::Text(r#"{"rpm":1,"speed":1,"temp":1}"#.into()),
                Message::Text(r#"{"rpm":2,"speed":2,"temp":2}"#.into()),
            ],
            false,
        )
        .await;
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());

        let handle = TelemetryStream::connect(&endpoint, vec![first.clone(), second.clone()])
            .await
            .unwrap();
        handle.wait_closed().await;

        assert_eq!(first.events(), second.events());
        assert_eq!(first.events().len(), 4);
    }

    #[tokio::test]
    async fn test_connect_failures() {
        assert!(matches!(
            TelemetryStream::connect("http://127.0.0.1:1/ws", vec![]).await,
            Err(TransportError::InvalidEndpoint(_))
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(matches!(
            TelemetryStream::connect(&format!("ws://{}", addr), vec![]).await,
            Err(TransportError::Connect(_))
        ));
    }

    #[tokio::test]
    async fn test_secure_endpoint_attempts_tls_handshake() {
        use tokio_tungstenite::tungstenite::error::{Error, UrlError};

        // Plain TCP peer that hangs up: the TLS handshake fails, but the scheme itself is supported.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        match TelemetryStream::connect(&format!("wss://{}", addr), vec![]).await {
            Err(TransportError::Connect(e)) => {
                assert!(!matches!(*e, Error::Url(UrlError::TlsFeatureNotEnabled)));
            }
            Ok(_) => panic!("handshake against a plain TCP peer succeeded"),
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
}
