#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use modbuild::dag::{Task, TaskFuture, TaskWork};
use modbuild::errors::ModbuildError;

/// Shared log of `start:<name>` / `end:<name>` events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

/// Task work that logs its start and end, sleeps, and optionally fails.
#[derive(Debug, Clone)]
pub struct RecordingWork {
    name: String,
    log: EventLog,
    delay: Duration,
    fail: bool,
}

impl RecordingWork {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            delay: Duration::from_millis(0),
            fail: false,
        }
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn into_task(self) -> Task {
        Task::new(self.name.clone(), self)
    }
}

impl TaskWork for RecordingWork {
    fn run(&self) -> TaskFuture {
        let this = self.clone();
        Box::pin(async move {
            this.log.push(format!("start:{}", this.name));
            if !this.delay.is_zero() {
                tokio::time::sleep(this.delay).await;
            }
            this.log.push(format!("end:{}", this.name));
            if this.fail {
                return Err(ModbuildError::Other(anyhow!("{} failed", this.name)));
            }
            Ok(())
        })
    }
}
