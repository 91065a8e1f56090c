//! Logging capability handed to each component instead of a global logger.

use log::Level;
use std::sync::{Arc, Mutex};

pub trait RunLog: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }
}

type Observer = Box<dyn Fn(Level, &str) + Send + Sync>;

/// Fan-out logger owned by the composition root. Every message goes to each
/// subscribed observer in registration order.
#[derive(Default)]
pub struct LogHub {
    observers: Vec<Observer>,
}

impl LogHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: Fn(Level, &str) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl RunLog for LogHub {
    fn log(&self, level: Level, message: &str) {
        for observer in &self.observers {
            observer(level, message);
        }
    }
}

/// Formats a line the way the console and log file show it: `[HH:MM:SS] LEVEL: message`.
pub fn format_line(level: Level, message: &str) -> String {
    format!(
        "[{}] {}: {}",
        chrono::Local::now().format("%H:%M:%S"),
        level,
        message
    )
}

/// Collects messages in memory. Useful for callers that want to show a run's log afterwards.
#[derive(Clone, Default)]
pub struct MemoryLog {
    entries: Arc<Mutex<Vec<(Level, String)>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl RunLog for MemoryLog {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push((level, message.to_string()));
        }
    }
}
