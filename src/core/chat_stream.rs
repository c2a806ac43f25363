//! Streaming HTTP transport
//!
//! Owns the network half of a streaming completion: POST the request, read
//! the chunked body, split it into lines, and forward each line over a
//! channel. Interpreting those lines is the decoder's job; this task never
//! looks inside them, so transport failures and protocol decoding stay
//! independently testable.

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::ChatRequest;
use crate::utils::url::completions_url;

/// Messages sent from the transport task to the chat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    /// One raw line of the response body, without its trailing newline.
    Line(String),
    /// The request or connection failed. A `Closed` follows.
    Failed(String),
    /// The response body ended (cleanly or not).
    Closed,
}

/// Everything the transport task needs to issue one streaming request.
pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: String,
    pub request: ChatRequest,
    pub cancel_token: CancellationToken,
}

/// Spawns streaming requests and hands their output back over a channel.
#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<StreamMessage>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Starts one streaming request on a background task. Cancelling the
    /// token stops the task without further messages.
    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                base_url,
                api_key,
                request,
                cancel_token,
            } = params;

            let work = async {
                let response = match client
                    .post(completions_url(&base_url))
                    .header("Content-Type", "application/json")
                    .header("Authorization", format!("Bearer {api_key}"))
                    .json(&request)
                    .send()
                    .await
                {
                    Ok(response) => response,
                    Err(err) => {
                        let _ = tx.send(StreamMessage::Failed(err.to_string()));
                        let _ = tx.send(StreamMessage::Closed);
                        return;
                    }
                };

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    let _ = tx.send(StreamMessage::Failed(format!(
                        "API request failed with status {status}: {body}"
                    )));
                    let _ = tx.send(StreamMessage::Closed);
                    return;
                }

                let mut stream = response.bytes_stream();
                let mut buffer: Vec<u8> = Vec::new();
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(bytes) => {
                            buffer.extend_from_slice(&bytes);
                            while let Some(newline_pos) = memchr(b'\n', &buffer) {
                                match std::str::from_utf8(&buffer[..newline_pos]) {
                                    Ok(line) => {
                                        let _ = tx.send(StreamMessage::Line(line.to_string()));
                                    }
                                    Err(err) => {
                                        tracing::debug!("skipping non-UTF-8 stream line: {err}");
                                    }
                                }
                                buffer.drain(..=newline_pos);
                            }
                        }
                        Err(err) => {
                            let _ = tx.send(StreamMessage::Failed(err.to_string()));
                            let _ = tx.send(StreamMessage::Closed);
                            return;
                        }
                    }
                }
                // A last line without a trailing newline still counts.
                if !buffer.is_empty() {
                    if let Ok(line) = std::str::from_utf8(&buffer) {
                        let _ = tx.send(StreamMessage::Line(line.to_string()));
                    }
                }
                let _ = tx.send(StreamMessage::Closed);
            };

            tokio::select! {
                _ = work => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage) {
        let _ = self.tx.send(message);
    }
}
