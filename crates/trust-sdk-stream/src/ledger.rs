//! Distributed-ledger transport.
//!
//! A batch is submitted to a ledger node as one message on the configured
//! channel; `publish` returns once the node reports the message included.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::Span;

use trust_sdk_core::{Annotation, Context, Error, LedgerConfig, Result};

use crate::provider::{encode_batch, StreamProvider, StreamType};

/// Identifier the node assigns to a submitted message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ledger node returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<LedgerError> for Error {
    fn from(e: LedgerError) -> Self {
        Error::DeliveryFailed {
            attempts: 1,
            reason: e.to_string(),
        }
    }
}

/// The node operations the provider needs.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn submit(&self, channel: &str, payload: Vec<u8>) -> Result<MessageId>;

    async fn is_included(&self, id: &MessageId) -> Result<bool>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    message_id: String,
}

#[derive(Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    included: bool,
}

/// [`LedgerClient`] speaking the node's HTTP API:
///
/// - `POST {node}/channels/{channel}/messages` with the batch as body,
///   answered by `{"messageId": "..."}`
/// - `GET {node}/messages/{id}/metadata`, answered by `{"included": bool}`
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    inner: reqwest::Client,
    node: String,
}

impl HttpLedgerClient {
    pub fn new(node: &str) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::InvalidStreamConfig(format!("ledger http client: {e}")))?;
        Ok(Self {
            inner,
            node: node.trim_end_matches('/').to_string(),
        })
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    async fn checked(
        resp: reqwest::Response,
    ) -> std::result::Result<reqwest::Response, LedgerError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(LedgerError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn submit(&self, channel: &str, payload: Vec<u8>) -> Result<MessageId> {
        let url = format!("{}/channels/{}/messages", self.node, channel);
        let resp = self
            .inner
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(LedgerError::from)?;
        let resp = Self::checked(resp).await?;
        let body: SubmitResponse = resp.json().await.map_err(LedgerError::from)?;
        Ok(MessageId(body.message_id))
    }

    async fn is_included(&self, id: &MessageId) -> Result<bool> {
        let url = format!("{}/messages/{}/metadata", self.node, id);
        let resp = self.inner.get(url).send().await.map_err(LedgerError::from)?;
        let resp = Self::checked(resp).await?;
        let body: MetadataResponse = resp.json().await.map_err(LedgerError::from)?;
        Ok(body.included)
    }
}

/// Submits each batch as one ledger message and waits for inclusion.
///
/// Waiting is bounded by the caller's deadline when it has one, otherwise by
/// `confirmation_timeout_ms`.
pub struct LedgerStreamProvider {
    config: LedgerConfig,
    injected: Option<Arc<dyn LedgerClient>>,
    client: RwLock<Option<Arc<dyn LedgerClient>>>,
    span: Span,
}

impl LedgerStreamProvider {
    pub fn new(config: LedgerConfig, span: Span) -> Result<Self> {
        if config.node.trim().is_empty() {
            return Err(Error::InvalidStreamConfig("ledger node is empty".into()));
        }
        if config.channel.is_empty() {
            return Err(Error::InvalidStreamConfig("ledger channel is empty".into()));
        }
        Ok(Self {
            config,
            injected: None,
            client: RwLock::new(None),
            span,
        })
    }

    /// Use `client` instead of the HTTP client on `connect`.
    pub fn with_client(mut self, client: Arc<dyn LedgerClient>) -> Self {
        self.injected = Some(client);
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn await_inclusion(
        &self,
        client: &dyn LedgerClient,
        id: &MessageId,
        ctx: &Context,
    ) -> Result<()> {
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let mut polls = 0u32;
        loop {
            polls += 1;
            if client.is_included(id).await? {
                tracing::debug!(
                    parent: &self.span,
                    message = %id,
                    polls,
                    "ledger message included"
                );
                return Ok(());
            }
            ctx.sleep(poll).await?;
        }
    }
}

impl std::fmt::Debug for LedgerStreamProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerStreamProvider")
            .field("config", &self.config)
            .field("injected", &self.injected.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StreamProvider for LedgerStreamProvider {
    fn stream_type(&self) -> StreamType {
        StreamType::Ledger
    }

    async fn connect(&self, ctx: &Context) -> Result<()> {
        ctx.check()?;
        let mut client = self.client.write().await;
        if client.is_some() {
            return Ok(());
        }
        let connected: Arc<dyn LedgerClient> = match &self.injected {
            Some(injected) => injected.clone(),
            None => Arc::new(HttpLedgerClient::new(&self.config.node)?),
        };
        *client = Some(connected);
        tracing::info!(
            parent: &self.span,
            node = %self.config.node,
            channel = %self.config.channel,
            "ledger connected"
        );
        Ok(())
    }

    async fn publish(&self, ctx: &Context, batch: Vec<Annotation>) -> Result<()> {
        let client = self.client.read().await.clone().ok_or(Error::NotConnected)?;
        let payload = encode_batch(&batch)?;

        let ctx = match ctx.deadline() {
            Some(_) => ctx.clone(),
            None => ctx.with_timeout(Duration::from_millis(self.config.confirmation_timeout_ms)),
        };
        let result = ctx
            .run(async {
                let id = client.submit(&self.config.channel, payload).await?;
                tracing::debug!(
                    parent: &self.span,
                    message = %id,
                    annotations = batch.len(),
                    "ledger message submitted"
                );
                self.await_inclusion(client.as_ref(), &id, &ctx).await
            })
            .await;

        if let Err(e) = &result {
            tracing::warn!(parent: &self.span, error = %e, "ledger publish failed");
        }
        result
    }

    async fn close(&self) -> Result<()> {
        if self.client.write().await.take().is_some() {
            tracing::info!(parent: &self.span, "ledger disconnected");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use trust_sdk_core::{AnnotationBuilder, AnnotationKind, HashAlgorithm};

    /// Includes a message after `polls_until_included` metadata queries.
    #[derive(Default)]
    struct FakeNode {
        polls_until_included: Option<u32>,
        polls: AtomicU32,
        submitted: Mutex<Vec<(String, Vec<u8>)>>,
        reject: bool,
    }

    #[async_trait]
    impl LedgerClient for FakeNode {
        async fn submit(&self, channel: &str, payload: Vec<u8>) -> Result<MessageId> {
            if self.reject {
                return Err(LedgerError::Status {
                    status: 503,
                    body: "node syncing".into(),
                }
                .into());
            }
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push((channel.to_string(), payload));
            Ok(MessageId(format!("msg-{}", submitted.len())))
        }

        async fn is_included(&self, _id: &MessageId) -> Result<bool> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(self.polls_until_included.is_some_and(|target| n >= target))
        }
    }

    fn batch() -> Vec<Annotation> {
        vec![AnnotationBuilder::new(AnnotationKind::Source, HashAlgorithm::Sha256, "h")
            .data(b"foo")
            .satisfied(true)
            .build()]
    }

    fn provider(node: Arc<FakeNode>) -> LedgerStreamProvider {
        let config = LedgerConfig {
            poll_interval_ms: 10,
            confirmation_timeout_ms: 1_000,
            ..LedgerConfig::default()
        };
        LedgerStreamProvider::new(config, Span::none())
            .unwrap()
            .with_client(node)
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_waits_for_inclusion() {
        let node = Arc::new(FakeNode {
            polls_until_included: Some(3),
            ..FakeNode::default()
        });
        let p = provider(node.clone());
        p.connect(&Context::background()).await.unwrap();
        p.publish(&Context::background(), batch()).await.unwrap();

        assert_eq!(node.polls.load(Ordering::SeqCst), 3);
        let submitted = node.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].0, "annotations");
        assert_eq!(crate::decode_batch(&submitted[0].1).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_included_times_out() {
        let node = Arc::new(FakeNode::default());
        let p = provider(node);
        p.connect(&Context::background()).await.unwrap();
        let result = p.publish(&Context::background(), batch()).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_deadline_is_respected() {
        let p = provider(Arc::new(FakeNode::default()));
        p.connect(&Context::background()).await.unwrap();

        let ctx = Context::background().with_timeout(Duration::from_millis(50));
        let start = tokio::time::Instant::now();
        let result = p.publish(&ctx, batch()).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert!(start.elapsed() < Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_deadline_outlasts_confirmation_timeout() {
        // Included after roughly two seconds of polling, past the configured
        // one-second confirmation timeout.
        let node = Arc::new(FakeNode {
            polls_until_included: Some(200),
            ..FakeNode::default()
        });
        let p = provider(node.clone());
        p.connect(&Context::background()).await.unwrap();

        let ctx = Context::background().with_timeout(Duration::from_secs(10));
        p.publish(&ctx, batch()).await.unwrap();
        assert_eq!(node.polls.load(Ordering::SeqCst), 200);
    }

    #[tokio::test]
    async fn test_rejected_submission_is_delivery_failure() {
        let node = Arc::new(FakeNode {
            reject: true,
            ..FakeNode::default()
        });
        let p = provider(node);
        p.connect(&Context::background()).await.unwrap();
        let err = p.publish(&Context::background(), batch()).await.unwrap_err();
        assert!(matches!(err, Error::DeliveryFailed { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let p = provider(Arc::new(FakeNode {
            polls_until_included: Some(1),
            ..FakeNode::default()
        }));
        assert!(matches!(
            p.publish(&Context::background(), batch()).await,
            Err(Error::NotConnected)
        ));

        p.connect(&Context::background()).await.unwrap();
        p.connect(&Context::background()).await.unwrap();
        p.publish(&Context::background(), batch()).await.unwrap();

        p.close().await.unwrap();
        p.close().await.unwrap();
        assert!(matches!(
            p.publish(&Context::background(), batch()).await,
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_empty_node_rejected() {
        let config = LedgerConfig {
            node: " ".into(),
            ..LedgerConfig::default()
        };
        assert!(matches!(
            LedgerStreamProvider::new(config, Span::none()),
            Err(Error::InvalidStreamConfig(_))
        ));
    }

    /// Serves canned HTTP responses, one per connection, recording request
    /// lines.
    async fn http_node(
        responses: Vec<&'static str>,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for body in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut raw = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    let n = socket.read(&mut chunk).await.unwrap();
                    raw.extend_from_slice(&chunk[..n]);
                    if n == 0 || request_complete(&raw) {
                        break;
                    }
                }
                let text = String::from_utf8_lossy(&raw).to_string();
                requests.push(text.lines().next().unwrap_or_default().to_string());
                let reply = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });
        (format!("http://{addr}/"), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..split]
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= split + 4 + length
    }

    #[tokio::test]
    async fn test_http_client_paths() {
        let (node, server) =
            http_node(vec![r#"{"messageId":"abc123"}"#, r#"{"included":true}"#]).await;
        let client = HttpLedgerClient::new(&node).unwrap();
        assert!(!client.node().ends_with('/'));

        let id = client.submit("annotations", b"[]".to_vec()).await.unwrap();
        assert_eq!(id, MessageId("abc123".into()));
        assert!(client.is_included(&id).await.unwrap());

        let requests = server.await.unwrap();
        assert_eq!(requests[0], "POST /channels/annotations/messages HTTP/1.1");
        assert_eq!(requests[1], "GET /messages/abc123/metadata HTTP/1.1");
    }
}
