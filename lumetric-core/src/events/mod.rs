//! Progress and status events emitted by the core library.
//!
//! Follows the observer pattern: consumers register [`EventHandler`]s on an
//! [`EventDispatcher`] and receive events during scans, analysis runs, and
//! export. The core never prints or draws; presentation belongs to the
//! consumer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Event {
    // Range scan events
    ScanStarted {
        total_frames: u64,
    },
    ScanProgress {
        current: u64,
        total: u64,
    },
    ScanComplete {
        frames_scanned: u64,
        candidates: usize,
    },

    // Beep detection events
    AudioExtractionStarted {
        input_file: String,
    },
    BeepDetectionComplete {
        beeps_found: usize,
    },

    // Analysis events
    AnalysisStarted {
        start_frame: u64,
        end_frame: u64,
        region_count: usize,
    },
    AnalysisProgress {
        frames_done: u64,
        total_frames: u64,
        percent: f32,
        fps: f32,
        eta: Duration,
    },
    AnalysisComplete {
        frames_analyzed: u64,
        gaps: u64,
        total_time: Duration,
    },
    AnalysisCancelled {
        frames_analyzed: u64,
    },

    // Export events
    FileWritten {
        path: PathBuf,
    },

    // Generic events
    Warning {
        message: String,
    },
    Error {
        message: String,
        context: Option<String>,
    },
}

pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event);
}

/// Fans one event out to every registered handler, in registration order.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn emit(&self, event: Event) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Handler that forwards warnings and errors to the `log` facade.
///
/// Useful as a default when the consumer has no presentation layer of its own.
pub struct LogEventHandler;

impl EventHandler for LogEventHandler {
    fn handle(&self, event: &Event) {
        match event {
            Event::Warning { message } => log::warn!("{message}"),
            Event::Error { message, context } => match context {
                Some(ctx) => log::error!("{message} ({ctx})"),
                None => log::error!("{message}"),
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<String>>);

    impl EventHandler for Recorder {
        fn handle(&self, event: &Event) {
            self.0.lock().unwrap().push(format!("{event:?}"));
        }
    }

    #[test]
    fn dispatcher_delivers_to_all_handlers() {
        let first = Arc::new(Recorder(Mutex::new(Vec::new())));
        let second = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_handler(first.clone());
        dispatcher.add_handler(second.clone());

        dispatcher.emit(Event::Warning {
            message: "test".to_string(),
        });

        assert_eq!(first.0.lock().unwrap().len(), 1);
        assert_eq!(second.0.lock().unwrap().len(), 1);
    }
}
