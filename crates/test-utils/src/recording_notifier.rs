use std::sync::{Arc, Mutex};

use assetpipe::notifier::Notifier;

/// Notifier that keeps every `(title, message)` for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }

    /// Titles only, in arrival order.
    pub fn titles(&self) -> Vec<String> {
        self.notifications().into_iter().map(|(t, _)| t).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.seen
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}
