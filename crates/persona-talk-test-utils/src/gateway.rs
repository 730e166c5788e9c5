use async_trait::async_trait;
use parking_lot::Mutex;
use persona_talk_protocol::{CompletionGateway, CompletionRequest, GatewayError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Replies with the same text every time and records each request.
#[derive(Debug, Clone, Default)]
pub struct FixedGateway {
    reply: String,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl FixedGateway {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl CompletionGateway for FixedGateway {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        self.requests.lock().push(request.clone());
        Ok(self.reply.clone())
    }
}

/// Always fails with the configured error.
#[derive(Debug, Clone)]
pub struct FailingGateway {
    error: GatewayError,
    calls: Arc<AtomicUsize>,
}

impl FailingGateway {
    pub fn new(error: GatewayError) -> Self {
        Self {
            error,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionGateway for FailingGateway {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Plays back a queue of results; an exhausted queue yields `Empty`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    script: Arc<Mutex<VecDeque<Result<String, GatewayError>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedGateway {
    pub fn new(script: impl IntoIterator<Item = Result<String, GatewayError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        self.requests.lock().push(request.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or(Err(GatewayError::Empty))
    }
}

/// Blocks every call until `release` is called, then replies with fixed text.
#[derive(Debug, Clone)]
pub struct GatedGateway {
    reply: String,
    gate: Arc<Notify>,
    entered: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

impl GatedGateway {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            gate: Arc::new(Notify::new()),
            entered: Arc::new(Notify::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Let one waiting (or the next) call complete.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// Resolve once a call has reached the gateway.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionGateway for GatedGateway {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(self.reply.clone())
    }
}
