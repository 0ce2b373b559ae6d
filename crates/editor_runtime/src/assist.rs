//! Streaming writing assistant.
//!
//! The active document is sent to a local chat endpoint with a placeholder marking where the
//! reply goes. The reply arrives as newline-delimited JSON chunks; every chunk rewrites the tab
//! content with the text generated so far, so the backup worker picks it up like any other edit.

use std::{future::Future, pin::Pin};

use editor_session::{SessionError, TabId, TabPatch, TabSessionStore};
use futures::{
    future::{AbortRegistration, Abortable},
    stream::LocalBoxStream,
    StreamExt,
};
use platform_host::{load_pref_with, PrefsStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Preference key holding [`AssistConfig`].
pub const ASSIST_CONFIG_KEY: &str = "sew.assist.config.v1";

/// Marker replaced by the generated text.
pub const INSERT_PLACEHOLDER: &str = "[[AI_INSERT_HERE]]";

const SYSTEM_PROMPT: &str = "You are being used to write the content in a piece of software. \
You will be provided with the existing content, and then an instruction to append something onto \
that document. Every bit of your reply will be added to the document, so do not add any \
additional commentary of confirmations. Only reply with the exact content that should be \
appended to the document.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssistError {
    #[error("assist stream aborted")]
    Aborted,
    #[error("assist transport failed: {0}")]
    Transport(String),
    #[error("assist response malformed: {0}")]
    Decode(String),
    #[error("assistant cannot edit a read-only tab")]
    ReadOnly,
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub endpoint: String,
    pub model: String,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/chat".to_string(),
            model: "llama3:instruct".to_string(),
        }
    }
}

impl AssistConfig {
    pub async fn load<S: PrefsStore + ?Sized>(prefs: &S) -> Self {
        match load_pref_with::<S, Self>(prefs, ASSIST_CONFIG_KEY).await {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(err) => {
                warn!(error = %err, "assist config unreadable; using defaults");
                Self::default()
            }
        }
    }
}

/// Character range the reply replaces. An empty range inserts at `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub len: usize,
}

impl Selection {
    pub fn caret(at: usize) -> Self {
        Self { start: at, len: 0 }
    }

    /// Splits `content` around the selection. Offsets past the end are clamped.
    pub fn split<'a>(&self, content: &'a str) -> (&'a str, &'a str) {
        let start = byte_offset(content, self.start);
        let end = byte_offset(content, self.start.saturating_add(self.len));
        (&content[..start], &content[end..])
    }
}

fn byte_offset(content: &str, chars: usize) -> usize {
    content
        .char_indices()
        .nth(chars)
        .map(|(index, _)| index)
        .unwrap_or(content.len())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of the chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl ChatRequest {
    /// Builds the insertion prompt for a document already carrying [`INSERT_PLACEHOLDER`].
    pub fn insertion(model: &str, document: &str, instruction: &str) -> Self {
        let user = format!(
            "The user is asking you to write a paragraph that they will insert where the token \
{INSERT_PLACEHOLDER} currently is in this document:\n\n\
```text\n{document}\n```\n\n\
Their instruction is:\n\n\
```text\n{instruction}\n```\n\n\
Notes:\n\
- only reply with the replacement text you think would be a great addition to that document.\n\
- do not reply with the existing content. only what will be replaced at {INSERT_PLACEHOLDER}\n\
- do not wrap it in any markdown tags\n\
- do not add any commentary\n\
- do not reply with the existing content, only the content to append\n"
        );
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            stream: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
}

/// One decoded line of the streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
}

impl ChatChunk {
    pub fn text(&self) -> &str {
        self.message
            .as_ref()
            .map(|message| message.content.as_str())
            .unwrap_or_default()
    }
}

/// Incremental newline-delimited JSON decoder. Network chunks may split lines anywhere,
/// including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    /// Feeds bytes and returns every chunk completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<ChatChunk>, AssistError> {
        self.buffer.extend_from_slice(bytes);
        let mut chunks = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(chunk) = decode_line(&line)? {
                chunks.push(chunk);
            }
        }
        Ok(chunks)
    }

    /// Decodes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Result<Option<ChatChunk>, AssistError> {
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line)
    }
}

fn decode_line(line: &[u8]) -> Result<Option<ChatChunk>, AssistError> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(line)
        .map(Some)
        .map_err(|err| AssistError::Decode(err.to_string()))
}

/// Object-safe boxed future used by [`ChatTransport`].
pub type AssistFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Raw reply body as it arrives from the network.
pub type ReplyStream = LocalBoxStream<'static, Result<Vec<u8>, AssistError>>;

/// Sends a chat request and exposes the streamed reply body.
pub trait ChatTransport {
    fn stream_chat<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> AssistFuture<'a, Result<ReplyStream, AssistError>>;
}

/// [`ChatTransport`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &AssistConfig) -> Self {
        Self::new(config.endpoint.clone())
    }
}

impl ChatTransport for HttpChatTransport {
    fn stream_chat<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> AssistFuture<'a, Result<ReplyStream, AssistError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.endpoint)
                .json(request)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|err| AssistError::Transport(err.to_string()))?;
            let body = response.bytes_stream().map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|err| AssistError::Transport(err.to_string()))
            });
            Ok(body.boxed_local())
        })
    }
}

/// Streams an insertion into tab `id` at `selection`, patching the tab after every chunk.
///
/// Returns the generated text. Aborting through the paired
/// [`futures::future::AbortHandle`] stops the stream with [`AssistError::Aborted`]; content
/// generated up to that point stays in the tab.
pub async fn run_assist(
    store: &TabSessionStore,
    id: TabId,
    selection: Selection,
    instruction: &str,
    model: &str,
    transport: &dyn ChatTransport,
    abort: AbortRegistration,
) -> Result<String, AssistError> {
    let tab = store.get(id).ok_or(SessionError::TabNotFound(id))?;
    if tab.read_only {
        return Err(AssistError::ReadOnly);
    }
    let (before, after) = selection.split(&tab.content);
    let document = format!("{before}{INSERT_PLACEHOLDER}{after}");
    let request = ChatRequest::insertion(model, &document, instruction);
    let insertion = Insertion {
        store,
        id,
        before,
        after,
    };

    match Abortable::new(insertion.stream(transport, &request), abort).await {
        Ok(result) => result,
        Err(_) => {
            debug!(tab = %id, "assist stream aborted");
            Err(AssistError::Aborted)
        }
    }
}

struct Insertion<'a> {
    store: &'a TabSessionStore,
    id: TabId,
    before: &'a str,
    after: &'a str,
}

impl Insertion<'_> {
    async fn stream(
        &self,
        transport: &dyn ChatTransport,
        request: &ChatRequest,
    ) -> Result<String, AssistError> {
        let mut body = transport.stream_chat(request).await?;
        let mut decoder = NdjsonDecoder::default();
        let mut generated = String::new();
        while let Some(bytes) = body.next().await {
            for chunk in decoder.push(&bytes?)? {
                self.apply(&mut generated, &chunk)?;
            }
        }
        if let Some(chunk) = decoder.finish()? {
            self.apply(&mut generated, &chunk)?;
        }
        Ok(generated)
    }

    fn apply(&self, generated: &mut String, chunk: &ChatChunk) -> Result<(), AssistError> {
        if chunk.text().is_empty() {
            return Ok(());
        }
        generated.push_str(chunk.text());
        let content = format!("{}{generated}{}", self.before, self.after);
        self.store.patch_by_id(self.id, TabPatch::edit(content))?;
        Ok(())
    }
}
