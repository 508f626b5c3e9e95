use crate::api::{ChatMessage, ChatReply, ChatRequest};
use crate::auth::CredentialManager;
use crate::core::agent::{classify, AgentCategory, RoutingTarget};
use crate::core::config::defaults::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_USER_TAG};
use crate::core::error::{DispatchError, PipelineBusy};
use crate::core::message::{Attachment, ConversationLog, Message};
use crate::core::reasoning::split_reasoning;
use crate::core::transport::Transport;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Sending,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineState::Idle => "idle",
            PipelineState::Sending => "sending",
        })
    }
}

/// Request fields that do not come from the conversation itself.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSettings {
    pub max_tokens: u32,
    pub user_tag: String,
    pub default_temperature: f32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            user_tag: DEFAULT_USER_TAG.to_string(),
            default_temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// One user turn handed to [`DispatchPipeline::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub content: String,
    pub forced_category: Option<AgentCategory>,
    pub attachment: Option<Attachment>,
    pub temperature: Option<f32>,
}

impl Outgoing {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            forced_category: None,
            attachment: None,
            temperature: None,
        }
    }

    pub fn with_category(mut self, category: AgentCategory) -> Self {
        self.forced_category = Some(category);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// How a `send()` settled. The returned message is the copy appended to
/// the log.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Another request was outstanding; nothing was appended.
    Skipped,
    Replied(Message),
    Failed {
        reply: Message,
        error: DispatchError,
    },
}

impl SendOutcome {
    pub fn reply(&self) -> Option<&Message> {
        match self {
            SendOutcome::Skipped => None,
            SendOutcome::Replied(reply) | SendOutcome::Failed { reply, .. } => Some(reply),
        }
    }
}

/// Snapshot for the view layer while a send is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub routing: Option<RoutingTarget>,
    pub elapsed: Option<Duration>,
}

#[derive(Debug)]
struct Conversation {
    state: PipelineState,
    log: ConversationLog,
    sending_since: Option<Instant>,
    routing: Option<RoutingTarget>,
}

/// Owns one conversation: its log and the Idle/Sending guard that keeps
/// at most one request in flight.
pub struct DispatchPipeline {
    credentials: Arc<CredentialManager>,
    transport: Arc<dyn Transport>,
    settings: DispatchSettings,
    conversation: Mutex<Conversation>,
    shutdown: CancellationToken,
}

impl DispatchPipeline {
    pub fn new(
        credentials: Arc<CredentialManager>,
        transport: Arc<dyn Transport>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            credentials,
            transport,
            settings,
            conversation: Mutex::new(Conversation {
                state: PipelineState::Idle,
                log: ConversationLog::new(),
                sending_since: None,
                routing: None,
            }),
            shutdown: CancellationToken::new(),
        }
    }

    fn conversation(&self) -> MutexGuard<'_, Conversation> {
        self.conversation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> PipelineState {
        self.conversation().state
    }

    pub fn status(&self) -> PipelineStatus {
        let conversation = self.conversation();
        PipelineStatus {
            state: conversation.state,
            routing: conversation.routing,
            elapsed: conversation.sending_since.map(|since| since.elapsed()),
        }
    }

    /// Copy of the log in append order.
    pub fn messages(&self) -> Vec<Message> {
        self.conversation().log.messages().to_vec()
    }

    pub fn len(&self) -> usize {
        self.conversation().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversation().log.is_empty()
    }

    pub fn clear(&self) -> Result<(), PipelineBusy> {
        let mut conversation = self.conversation();
        if conversation.state == PipelineState::Sending {
            return Err(PipelineBusy);
        }
        conversation.log.clear();
        debug!("conversation cleared");
        Ok(())
    }

    /// Cancel any outstanding request and every later one. Each affected
    /// send still settles with a synthetic reply.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        info!("dispatch pipeline shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Append `outgoing` as a user message, ask the backend for a reply
    /// and append exactly one assistant message describing the result.
    ///
    /// Returns [`SendOutcome::Skipped`] without touching the log when a
    /// request is already outstanding.
    pub async fn send(&self, outgoing: Outgoing) -> SendOutcome {
        let temperature = outgoing
            .temperature
            .unwrap_or(self.settings.default_temperature);
        let request = {
            let mut conversation = self.conversation();
            if conversation.state == PipelineState::Sending {
                debug!("send ignored while a request is outstanding");
                return SendOutcome::Skipped;
            }
            let routing = RoutingTarget::from(outgoing.forced_category);
            conversation
                .log
                .push(Message::user(outgoing.content, outgoing.attachment));
            conversation.state = PipelineState::Sending;
            conversation.sending_since = Some(Instant::now());
            conversation.routing = Some(routing);
            self.build_request(conversation.log.messages(), routing, temperature)
        };
        info!(
            routing = %request.model,
            history = request.messages.len(),
            "dispatching message"
        );

        let mut pending = PendingReply::new(self);
        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(DispatchError::Cancelled),
            result = self.call_backend(&request) => result,
        };
        pending.disarm();

        match result {
            Ok(reply) => {
                let message = reply_message(reply);
                info!(
                    category = %message.agent_category.unwrap_or_default(),
                    served_model = message.served_model.as_deref().unwrap_or(""),
                    "reply received"
                );
                SendOutcome::Replied(self.settle(message))
            }
            Err(error) => {
                warn!(error = %error, "dispatch failed");
                let reply = self.settle(failure_message(&error));
                SendOutcome::Failed { reply, error }
            }
        }
    }

    async fn call_backend(&self, request: &ChatRequest) -> Result<ChatReply, DispatchError> {
        let api_secret = self.credentials.ensure_api_secret().await?;
        Ok(self.transport.complete(&api_secret, request).await?)
    }

    fn build_request(
        &self,
        history: &[Message],
        routing: RoutingTarget,
        temperature: f32,
    ) -> ChatRequest {
        ChatRequest {
            model: routing.as_str().to_string(),
            messages: history.iter().map(to_chat_message).collect(),
            temperature,
            max_tokens: self.settings.max_tokens,
            user: self.settings.user_tag.clone(),
        }
    }

    fn settle(&self, message: Message) -> Message {
        let mut conversation = self.conversation();
        let stored = conversation.log.push(message).clone();
        conversation.state = PipelineState::Idle;
        conversation.sending_since = None;
        conversation.routing = None;
        stored
    }
}

/// Settles the conversation if a `send()` future is dropped before the
/// backend answered, so the log still gets its assistant turn.
struct PendingReply<'a> {
    pipeline: &'a DispatchPipeline,
    armed: bool,
}

impl<'a> PendingReply<'a> {
    fn new(pipeline: &'a DispatchPipeline) -> Self {
        Self {
            pipeline,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("send dropped before completion");
            self.pipeline
                .settle(failure_message(&DispatchError::Cancelled));
        }
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    match &message.attachment {
        Some(attachment) => {
            ChatMessage::multimodal(message.role, message.content.as_str(), attachment.url())
        }
        None => ChatMessage::text(message.role, message.content.as_str()),
    }
}

fn reply_message(reply: ChatReply) -> Message {
    let category = classify(&reply.served_model);
    let split = split_reasoning(&reply.text);
    Message::assistant(split.content, category, Some(reply.served_model), split.thinking)
}

fn failure_message(error: &DispatchError) -> Message {
    Message::failure(format!("Error: {error}"))
}
