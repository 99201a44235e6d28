//! Transport seam and the Server-Sent Events implementation.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::DEFAULT_CHANNEL_CAPACITY;
use crate::error::{Result, StreamError};

/// Opens one-way frame streams.
///
/// `connect` resolves once the stream is open; an `Err` means the attempt
/// failed before any frame could be delivered.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<FrameReceiver>;
}

/// Receiving end of an open stream.
///
/// Dropping it (or calling [`FrameReceiver::close`]) stops the reader task.
pub struct FrameReceiver {
    rx: mpsc::Receiver<Result<String>>,
    reader: Option<JoinHandle<()>>,
}

impl FrameReceiver {
    pub fn new(rx: mpsc::Receiver<Result<String>>, reader: Option<JoinHandle<()>>) -> Self {
        Self { rx, reader }
    }

    /// Next raw frame; `None` once the stream has ended.
    pub async fn next_frame(&mut self) -> Option<Result<String>> {
        self.rx.recv().await
    }

    pub fn close(&mut self) {
        self.rx.close();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for FrameReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReceiver")
            .field("reader_running", &self.reader.is_some())
            .finish()
    }
}

/// SSE transport over `reqwest`.
#[derive(Clone)]
pub struct SseTransport {
    client: reqwest::Client,
    capacity: usize,
}

impl SseTransport {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

impl Default for SseTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn connect(&self, url: &str) -> Result<FrameReceiver> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .map_err(StreamError::Request)?;

        if !response.status().is_success() {
            return Err(StreamError::Connection(format!(
                "Failed to connect to event stream: {}",
                response.status()
            )));
        }

        let (tx, rx) = mpsc::channel::<Result<String>>(self.capacity);

        let byte_stream = response.bytes_stream();

        let reader = tokio::spawn(async move {
            let mut event_stream = byte_stream.eventsource();

            while let Some(event_result) = event_stream.next().await {
                match event_result {
                    Ok(event) => {
                        if event.data.is_empty() {
                            continue;
                        }

                        if tx.send(Ok(event.data)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let err_msg = format!("{}", e);
                        let _ = tx.send(Err(StreamError::EventStream(err_msg))).await;
                        break;
                    }
                }
            }
        });

        Ok(FrameReceiver::new(rx, Some(reader)))
    }
}
