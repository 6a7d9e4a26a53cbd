/// Destinations for diagnostic messages.
///
/// The tracker never logs directly; it writes formatted warnings to a
/// [`DiagnosticSink`]. The default routes to `tracing`, tests capture into
/// a [`MemorySink`], and any `Fn(&str)` closure can be plugged in.
use parking_lot::Mutex;

/// Receives one formatted diagnostic string per call.
///
/// Implementations are expected to be synchronous and cheap (appending to
/// a logger buffer, not a network round trip).
pub trait DiagnosticSink: Send + Sync {
    fn write(&self, message: &str);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write(&self, message: &str) {
        self(message)
    }
}

/// Default sink: emits each message as a `tracing` warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn write(&self, message: &str) {
        tracing::warn!(target: "querywatch", "{}", message);
    }
}

/// Collects messages in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Drain and return the captured messages.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl DiagnosticSink for MemorySink {
    fn write(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}
