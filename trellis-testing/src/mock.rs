// Call recording test doubles

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: String,
    pub args: Vec<String>,
}

struct Recorder<R> {
    calls: Vec<Call>,
    returns: HashMap<String, R>,
    fallback: Option<R>,
}

/// Records the calls a fake service receives and hands out canned
/// return values.
///
/// Clones share the record, so a clone bound in the container and the
/// copy kept by the test observe the same calls.
pub struct MockService<R = ()> {
    recorder: Arc<Mutex<Recorder<R>>>,
}

impl<R> MockService<R> {
    pub fn new() -> Self {
        Self {
            recorder: Arc::new(Mutex::new(Recorder {
                calls: Vec::new(),
                returns: HashMap::new(),
                fallback: None,
            })),
        }
    }

    /// Value returned for methods without a specific one.
    pub fn returning(self, value: R) -> Self {
        self.recorder.lock().fallback = Some(value);
        self
    }

    pub fn returning_for(self, method: &str, value: R) -> Self {
        self.recorder.lock().returns.insert(method.to_string(), value);
        self
    }

    /// Record a call and return the value configured for `method`.
    pub fn record<I, A>(&self, method: &str, args: I) -> Option<R>
    where
        I: IntoIterator<Item = A>,
        A: ToString,
        R: Clone,
    {
        let mut recorder = self.recorder.lock();
        recorder.calls.push(Call {
            method: method.to_string(),
            args: args.into_iter().map(|arg| arg.to_string()).collect(),
        });
        recorder
            .returns
            .get(method)
            .or(recorder.fallback.as_ref())
            .cloned()
    }

    pub fn record_call(&self, method: &str) {
        let mut recorder = self.recorder.lock();
        recorder.calls.push(Call {
            method: method.to_string(),
            args: Vec::new(),
        });
    }

    /// Every call, oldest first
    pub fn calls(&self) -> Vec<Call> {
        self.recorder.lock().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.recorder
            .lock()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.recorder.lock().calls.len()
    }

    pub fn count_of(&self, method: &str) -> usize {
        self.calls_to(method).len()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.count_of(method) > 0
    }

    /// Forget recorded calls; canned return values stay.
    pub fn reset(&self) {
        self.recorder.lock().calls.clear();
    }
}

impl<R> Clone for MockService<R> {
    fn clone(&self) -> Self {
        Self {
            recorder: Arc::clone(&self.recorder),
        }
    }
}

impl<R> Default for MockService<R> {
    fn default() -> Self {
        Self::new()
    }
}
