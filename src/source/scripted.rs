//! In-memory record source for unit tests

use super::types::{Page, PageRequest, RecordSource};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;

type Handler = dyn Fn(&str, &PageRequest, usize) -> Result<Page> + Send + Sync;

/// Answers every fetch through a closure and records the calls.
///
/// The closure receives the endpoint, the request and the number of earlier
/// calls to the same endpoint.
pub(crate) struct ScriptedSource {
    handler: Box<Handler>,
    calls: Mutex<Vec<(String, PageRequest)>>,
}

impl ScriptedSource {
    pub(crate) fn new(
        handler: impl Fn(&str, &PageRequest, usize) -> Result<Page> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, PageRequest)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e == endpoint)
            .count()
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn fetch(&self, endpoint: &str, request: &PageRequest) -> Result<Page> {
        let previous = self.calls_to(endpoint);
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), request.clone()));
        (self.handler)(endpoint, request, previous)
    }
}
