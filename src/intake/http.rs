use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use kanal::AsyncSender;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::crypto::webhook_signature;
use crate::traits::EventIntake;
use crate::types::AnchorRequest;

/// Header carrying the sender's HMAC signature over the raw body.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Event category that triggers anchoring; everything else is ignored.
const INVOICE_CATEGORY: &str = "INVOICE";

/// Webhook intake that runs an HTTP server to receive document-changed
/// events from the accounting platform.
///
/// # Protocol
/// - POST /webhook - raw JSON event batch, authenticated by comparing the
///   `x-signature` header against base64(HMAC-SHA256(webhook_key, body));
///   mismatch gets a 401 and the batch is dropped
/// - GET /health - health check endpoint
///
/// # Example POST /webhook payload:
/// ```json
/// {
///   "events": [
///     { "resourceId": "inv-42", "eventCategory": "INVOICE" }
///   ]
/// }
/// ```
///
/// The handler is fire-and-forget: it returns 200 once events are queued;
/// pipeline failures are logged, never surfaced to the sender.
pub struct WebhookIntake {
    /// Address to bind the HTTP server to (e.g., "127.0.0.1:3000")
    bind_addr: String,
    /// Parsed socket address
    socket_addr: SocketAddr,
    /// Shared key the sender signs bodies with
    webhook_key: Arc<String>,
    /// Actual bound address (set after server starts)
    actual_addr: Arc<Mutex<Option<SocketAddr>>>,
    /// Channel sender for forwarding anchor requests
    tx: Arc<Mutex<Option<AsyncSender<AnchorRequest>>>>,
    /// Server shutdown signal
    shutdown_tx: Arc<Mutex<Option<tokio::sync::oneshot::Sender<()>>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookBody {
    events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEvent {
    resource_id: String,
    event_category: String,
}

impl WebhookIntake {
    pub fn new(bind_addr: String, webhook_key: String) -> Self {
        let socket_addr = bind_addr
            .parse()
            .unwrap_or_else(|_| "127.0.0.1:3000".parse().unwrap());

        Self {
            bind_addr,
            socket_addr,
            webhook_key: Arc::new(webhook_key),
            actual_addr: Arc::new(Mutex::new(None)),
            tx: Arc::new(Mutex::new(None)),
            shutdown_tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Get the actual bound address (available after server starts).
    pub async fn actual_addr(&self) -> Option<SocketAddr> {
        *self.actual_addr.lock().await
    }

    async fn handle_request(
        req: Request<Body>,
        tx: Arc<Mutex<Option<AsyncSender<AnchorRequest>>>>,
        webhook_key: Arc<String>,
    ) -> Result<Response<Body>, Infallible> {
        let method = req.method();
        let path = req.uri().path();

        debug!("HTTP request: {} {}", method, path);

        match (method, path) {
            (&Method::GET, "/health") => Ok(Response::builder()
                .status(StatusCode::OK)
                .body(Body::from(r#"{"status":"ok"}"#))
                .unwrap()),

            (&Method::POST, "/webhook") => Self::handle_webhook(req, tx, webhook_key).await,

            _ => Ok(Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Body::from(r#"{"error":"not_found"}"#))
                .unwrap()),
        }
    }

    async fn handle_webhook(
        req: Request<Body>,
        tx: Arc<Mutex<Option<AsyncSender<AnchorRequest>>>>,
        webhook_key: Arc<String>,
    ) -> Result<Response<Body>, Infallible> {
        let claimed_signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // The signature covers the raw body, so read it before parsing.
        let whole_body = match hyper::body::to_bytes(req.into_body()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to read webhook body: {}", e);
                return Ok(Response::builder()
                    .status(StatusCode::BAD_REQUEST)
                    .body(Body::from(r#"{"error":"invalid_body"}"#))
                    .unwrap());
            }
        };

        let expected = webhook_signature(&webhook_key, &whole_body);
        if claimed_signature.as_deref() != Some(expected.as_str()) {
            warn!("Webhook signature check failed, dropping event batch");
            return Ok(Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .body(Body::empty())
                .unwrap());
        }

        let body: WebhookBody = match serde_json::from_slice(&whole_body) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Failed to parse webhook body: {}", e);
                return Ok(Response::builder()
                    .status(StatusCode::BAD_REQUEST)
                    .body(Body::from(r#"{"error":"invalid_json"}"#))
                    .unwrap());
            }
        };

        let tx_guard = tx.lock().await;
        let sender = match tx_guard.as_ref() {
            Some(sender) => sender,
            None => {
                error!("Channel sender not initialized");
                return Ok(Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Body::from(r#"{"error":"not_initialized"}"#))
                    .unwrap());
            }
        };

        let mut queued = 0;
        for event in body.events {
            if event.event_category != INVOICE_CATEGORY {
                debug!(
                    "Ignoring {} event for {}",
                    event.event_category, event.resource_id
                );
                continue;
            }
            let request = AnchorRequest {
                document_id: event.resource_id,
            };
            match sender.send(request).await {
                Ok(_) => queued += 1,
                Err(e) => {
                    error!("Failed to queue anchor request: {}", e);
                    return Ok(Response::builder()
                        .status(StatusCode::INTERNAL_SERVER_ERROR)
                        .body(Body::from(r#"{"error":"channel_error"}"#))
                        .unwrap());
                }
            }
        }

        debug!("Queued {} anchor requests from webhook batch", queued);
        Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Body::from(format!(r#"{{"status":"ok","queued":{}}}"#, queued)))
            .unwrap())
    }
}

#[async_trait]
impl EventIntake for WebhookIntake {
    fn name(&self) -> &'static str {
        "webhook-intake"
    }

    async fn open(&mut self, tx: AsyncSender<AnchorRequest>) -> Result<()> {
        info!("Starting webhook server on {}", self.bind_addr);

        {
            let mut tx_guard = self.tx.lock().await;
            *tx_guard = Some(tx);
        }

        let tx_arc = Arc::clone(&self.tx);
        let key_arc = Arc::clone(&self.webhook_key);

        let make_svc = make_service_fn(move |_conn| {
            let tx_clone = Arc::clone(&tx_arc);
            let key_clone = Arc::clone(&key_arc);
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    Self::handle_request(req, Arc::clone(&tx_clone), Arc::clone(&key_clone))
                }))
            }
        });

        let server = Server::bind(&self.socket_addr).serve(make_svc);
        let addr = server.local_addr();

        {
            let mut actual_addr_guard = self.actual_addr.lock().await;
            *actual_addr_guard = Some(addr);
        }

        info!("Webhook server listening on http://{}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        {
            let mut shutdown_guard = self.shutdown_tx.lock().await;
            *shutdown_guard = Some(shutdown_tx);
        }

        tokio::spawn(async move {
            let graceful = server.with_graceful_shutdown(async {
                shutdown_rx.await.ok();
                info!("Webhook server shutdown signal received");
            });

            if let Err(e) = graceful.await {
                error!("Webhook server error: {}", e);
            } else {
                info!("Webhook server stopped gracefully");
            }
        });

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        info!("Closing webhook server");

        let mut shutdown_guard = self.shutdown_tx.lock().await;
        if let Some(shutdown_tx) = shutdown_guard.take() {
            if shutdown_tx.send(()).is_err() {
                warn!("Failed to send shutdown signal (receiver already dropped)");
            }
        }

        {
            let mut tx_guard = self.tx.lock().await;
            *tx_guard = None;
        }

        info!("Webhook server closed");
        Ok(())
    }
}
