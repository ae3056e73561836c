use parking_lot::Mutex;

/// Router collaborator: receives full-page navigation intents.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Records every navigation, newest last. Used by tests and the CLI.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new() -> Self { Self::default() }

    pub fn history(&self) -> Vec<String> { self.history.lock().clone() }

    pub fn last(&self) -> Option<String> { self.history.lock().last().cloned() }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, path: &str) {
        self.history.lock().push(path.to_string());
    }
}

/// Drops every intent; for callers that act on the returned decision themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _path: &str) {}
}
