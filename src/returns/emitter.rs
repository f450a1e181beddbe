//! Streaming return values.
//!
//! A handler returns a [`ResponseBodyEmitter`] and keeps a clone to send
//! values later, from any thread. Until the return-value handler has
//! initialized the emitter, sends are buffered; afterwards each value is
//! converted and pushed as one frame onto the response's channel.
//!
//! ```text
//! let emitter = ResponseBodyEmitter::sse();
//! let producer = emitter.clone();
//! std::thread::spawn(move || {
//!     for i in 0..3 {
//!         let _ = producer.send_event(SseEvent::data(json!(i)).event("tick"));
//!     }
//!     producer.complete();
//! });
//! Ok(ReturnValue::Emitter(emitter))
//! ```
//!
//! SSE frames follow the `text/event-stream` format:
//!
//! ```text
//! event: tick
//! data: 0
//!
//! ```

use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::codec::{ConversionError, MessageConverter};
use crate::handler::ValueType;
use crate::media::MediaType;

type Callback = Box<dyn FnOnce() + Send>;

/// Why a value could not be emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitterError {
    /// `complete()` or `timeout()` already ran
    AlreadyCompleted,
    /// The host dropped the receiving side
    Disconnected,
    /// No converter writes the value as the requested media type
    NotWritable { media_type: String },
    Conversion(ConversionError),
}

impl fmt::Display for EmitterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitterError::AlreadyCompleted => f.write_str("emitter has already completed"),
            EmitterError::Disconnected => f.write_str("response stream receiver is gone"),
            EmitterError::NotWritable { media_type } => {
                write!(f, "no converter can write the value as {media_type}")
            }
            EmitterError::Conversion(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EmitterError {}

/// One server-sent event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    id: Option<String>,
    event: Option<String>,
    retry_ms: Option<u64>,
    comment: Option<String>,
    data: Value,
}

impl SseEvent {
    #[must_use]
    pub fn data(data: Value) -> Self {
        Self {
            id: None,
            event: None,
            retry_ms: None,
            comment: None,
            data,
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.event = Some(name.into());
        self
    }

    #[must_use]
    pub fn retry_ms(mut self, retry: u64) -> Self {
        self.retry_ms = Some(retry);
        self
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    fn frame(&self, data: &[u8]) -> Vec<u8> {
        let mut out = String::new();
        if let Some(comment) = &self.comment {
            out.push(':');
            out.push_str(comment);
            out.push('\n');
        }
        if let Some(event) = &self.event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        if let Some(id) = &self.id {
            out.push_str("id: ");
            out.push_str(id);
            out.push('\n');
        }
        if let Some(retry) = self.retry_ms {
            out.push_str("retry: ");
            out.push_str(&retry.to_string());
            out.push('\n');
        }
        for line in String::from_utf8_lossy(data).split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out.into_bytes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmitterKind {
    Plain,
    Sse,
}

/// Connection to the host, installed by the return-value handler.
struct Sink {
    tx: mpsc::Sender<Vec<u8>>,
    converters: Vec<Arc<dyn MessageConverter>>,
    media_type: MediaType,
}

enum Pending {
    Value(Value, Option<MediaType>),
    Event(SseEvent),
}

#[derive(Default)]
struct State {
    early: Vec<Pending>,
    sink: Option<Sink>,
}

struct Inner {
    kind: EmitterKind,
    completed: AtomicBool,
    state: Mutex<State>,
    on_timeout: Mutex<Vec<Callback>>,
    on_completion: Mutex<Vec<Callback>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for streaming a response body in several writes.
#[derive(Clone)]
pub struct ResponseBodyEmitter {
    inner: Arc<Inner>,
}

impl fmt::Debug for ResponseBodyEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBodyEmitter")
            .field("kind", &self.inner.kind)
            .field("completed", &self.is_completed())
            .finish_non_exhaustive()
    }
}

impl Default for ResponseBodyEmitter {
    fn default() -> Self {
        Self::new()
    }
}

fn value_type_of(value: &Value) -> ValueType {
    match value {
        Value::String(_) => ValueType::String,
        _ => ValueType::Json,
    }
}

impl ResponseBodyEmitter {
    /// Emitter whose frames are the converted values, back to back.
    #[must_use]
    pub fn new() -> Self {
        Self::with_kind(EmitterKind::Plain)
    }

    /// Emitter producing `text/event-stream` frames.
    #[must_use]
    pub fn sse() -> Self {
        Self::with_kind(EmitterKind::Sse)
    }

    fn with_kind(kind: EmitterKind) -> Self {
        Self {
            inner: Arc::new(Inner {
                kind,
                completed: AtomicBool::new(false),
                state: Mutex::new(State::default()),
                on_timeout: Mutex::new(Vec::new()),
                on_completion: Mutex::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn is_sse(&self) -> bool {
        self.inner.kind == EmitterKind::Sse
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::SeqCst)
    }

    /// Send a value using the negotiated media type.
    pub fn send(&self, value: Value) -> Result<(), EmitterError> {
        self.push(Pending::Value(value, None))
    }

    /// Send a value written as `media_type`.
    pub fn send_as(&self, value: Value, media_type: MediaType) -> Result<(), EmitterError> {
        self.push(Pending::Value(value, Some(media_type)))
    }

    /// Send a server-sent event. On a plain emitter only the data is sent.
    pub fn send_event(&self, event: SseEvent) -> Result<(), EmitterError> {
        self.push(Pending::Event(event))
    }

    fn push(&self, item: Pending) -> Result<(), EmitterError> {
        if self.is_completed() {
            return Err(EmitterError::AlreadyCompleted);
        }
        let mut state = lock(&self.inner.state);
        match &state.sink {
            Some(sink) => self.deliver(sink, item),
            None => {
                state.early.push(item);
                Ok(())
            }
        }
    }

    fn deliver(&self, sink: &Sink, item: Pending) -> Result<(), EmitterError> {
        let frame = match item {
            Pending::Value(value, media_type) => {
                let data = encode(sink, &value, media_type.as_ref())?;
                match self.inner.kind {
                    EmitterKind::Plain => data,
                    EmitterKind::Sse => SseEvent::data(Value::Null).frame(&data),
                }
            }
            Pending::Event(event) => {
                let data = encode(sink, &event.data, None)?;
                match self.inner.kind {
                    EmitterKind::Plain => data,
                    EmitterKind::Sse => event.frame(&data),
                }
            }
        };
        sink.tx.send(frame).map_err(|_| EmitterError::Disconnected)
    }

    /// Connect the emitter to the response channel and flush buffered
    /// sends. Called by the return-value handler.
    pub(crate) fn initialize(
        &self,
        tx: mpsc::Sender<Vec<u8>>,
        converters: Vec<Arc<dyn MessageConverter>>,
        media_type: MediaType,
    ) -> Result<(), EmitterError> {
        let sink = Sink {
            tx,
            converters,
            media_type,
        };
        let mut state = lock(&self.inner.state);
        let early = std::mem::take(&mut state.early);
        debug!(buffered = early.len(), sse = self.is_sse(), "Emitter initialized");
        for item in early {
            self.deliver(&sink, item)?;
        }
        if !self.is_completed() {
            state.sink = Some(sink);
        }
        Ok(())
    }

    /// Register a callback for [`timeout`](Self::timeout).
    pub fn on_timeout(&self, callback: impl FnOnce() + Send + 'static) {
        lock(&self.inner.on_timeout).push(Box::new(callback));
    }

    /// Register a callback run once when the emitter completes for any
    /// reason.
    pub fn on_completion(&self, callback: impl FnOnce() + Send + 'static) {
        lock(&self.inner.on_completion).push(Box::new(callback));
    }

    /// Finish the stream. The channel closes; later sends fail.
    pub fn complete(&self) {
        if self.finish() {
            debug!(sse = self.is_sse(), "Emitter completed");
            run(&self.inner.on_completion);
        }
    }

    /// Fired by the host when the stream outlives its deadline: runs the
    /// timeout callbacks, then the completion callbacks, at most once.
    pub fn timeout(&self) {
        if self.finish() {
            warn!(sse = self.is_sse(), "Emitter timed out");
            run(&self.inner.on_timeout);
            run(&self.inner.on_completion);
        }
    }

    /// Mark completed and close the channel. `true` for the first caller.
    fn finish(&self) -> bool {
        if self.inner.completed.swap(true, Ordering::SeqCst) {
            return false;
        }
        lock(&self.inner.state).sink = None;
        true
    }
}

fn run(callbacks: &Mutex<Vec<Callback>>) {
    let callbacks = std::mem::take(&mut *lock(callbacks));
    for callback in callbacks {
        callback();
    }
}

fn encode(sink: &Sink, value: &Value, media_type: Option<&MediaType>) -> Result<Vec<u8>, EmitterError> {
    let media_type = media_type.unwrap_or(&sink.media_type);
    let value_type = value_type_of(value);
    let converter = sink
        .converters
        .iter()
        .find(|c| c.can_write(&value_type, Some(media_type)))
        .ok_or_else(|| EmitterError::NotWritable {
            media_type: media_type.to_string(),
        })?;
    converter.write(value, media_type).map_err(EmitterError::Conversion)
}
