//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::retrieve::transport::{RequestHandle, RequestOptions, RequestRecord, Transport};

/// Completes requests synchronously from a queue of outcomes. Once the queue
/// is empty, requests stay in flight until aborted.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<RequestRecord, RequestRecord>>>,
    requested: Mutex<Vec<String>>,
    parked: Mutex<Vec<RequestOptions>>,
    aborts: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub(crate) fn new(outcomes: Vec<Result<RequestRecord, RequestRecord>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        })
    }

    pub(crate) fn ok(body: &str) -> Result<RequestRecord, RequestRecord> {
        Ok(RequestRecord::new(200, "OK", Some(body.to_string())))
    }

    pub(crate) fn err(status: u16, status_text: &str) -> Result<RequestRecord, RequestRecord> {
        Err(RequestRecord::new(status, status_text, Some(String::new())))
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub(crate) fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn request(&self, url: &str, options: RequestOptions) -> RequestHandle {
        self.requested.lock().unwrap().push(url.to_string());
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(outcome) => options.complete(outcome),
            None => self.parked.lock().unwrap().push(options),
        }
        let aborts = Arc::clone(&self.aborts);
        RequestHandle::from_fn(move || {
            aborts.fetch_add(1, Ordering::SeqCst);
        })
    }
}
