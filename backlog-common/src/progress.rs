//! Progress reporting for multi-step reads

/// Receives human-readable progress messages
///
/// Any `Fn(&str) + Send + Sync` closure is a sink, so callers can pass
/// `&|msg: &str| eprintln!("{msg}")` directly.
pub trait ProgressSink: Send + Sync {
    /// Report one progress message
    fn report(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// Sink that drops every message
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink_receives_messages() {
        let seen = Mutex::new(Vec::new());
        let sink = |msg: &str| seen.lock().unwrap().push(msg.to_string());
        sink.report("one");
        ProgressSink::report(&sink, "two");
        assert_eq!(*seen.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn test_no_progress_is_silent() {
        NoProgress.report("ignored");
    }
}
