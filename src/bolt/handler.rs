//! Response handlers.
//!
//! Every outbound request enqueues a handler; the receive loop dispatches
//! inbound messages to the queue strictly FIFO. A RECORD invokes the head
//! handler's record callback without consuming it; SUCCESS, FAILURE and
//! IGNORED consume the head. A handler is a record of first-class
//! callbacks rather than a trait object, which keeps the state machine
//! decoupled from whoever is waiting on the response.

use std::collections::VecDeque;

use super::error::Neo4jError;
use super::message::response::SuccessMessage;
use crate::driver::types::Record;

/// Callbacks for one outstanding request. All are optional; an absent
/// callback means the outcome is not interesting to the sender.
#[derive(Default)]
pub struct ResponseHandler {
    /// Called for the terminating SUCCESS
    pub on_success: Option<Box<dyn FnMut(&SuccessMessage) + Send>>,
    /// Called once per streamed RECORD
    pub on_record: Option<Box<dyn FnMut(Record) + Send>>,
    /// Called for FAILURE
    pub on_failure: Option<Box<dyn FnMut(&Neo4jError) + Send>>,
    /// Called for IGNORED
    pub on_ignored: Option<Box<dyn FnMut() + Send>>,
}

impl ResponseHandler {
    /// A handler that ignores every outcome.
    pub fn discard() -> Self {
        Self::default()
    }

    /// Set the success callback.
    pub fn on_success(mut self, f: impl FnMut(&SuccessMessage) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Set the record callback.
    pub fn on_record(mut self, f: impl FnMut(Record) + Send + 'static) -> Self {
        self.on_record = Some(Box::new(f));
        self
    }

    /// Set the failure callback.
    pub fn on_failure(mut self, f: impl FnMut(&Neo4jError) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }

    /// Set the ignored callback.
    pub fn on_ignored(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_ignored = Some(Box::new(f));
        self
    }

    /// Deliver a SUCCESS.
    pub fn handle_success(&mut self, success: &SuccessMessage) {
        if let Some(f) = self.on_success.as_mut() {
            f(success);
        }
    }

    /// Deliver one RECORD.
    pub fn handle_record(&mut self, record: Record) {
        if let Some(f) = self.on_record.as_mut() {
            f(record);
        }
    }

    /// Deliver a FAILURE.
    pub fn handle_failure(&mut self, error: &Neo4jError) {
        if let Some(f) = self.on_failure.as_mut() {
            f(error);
        }
    }

    /// Deliver an IGNORED.
    pub fn handle_ignored(&mut self) {
        if let Some(f) = self.on_ignored.as_mut() {
            f();
        }
    }
}

impl std::fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandler")
            .field("on_success", &self.on_success.is_some())
            .field("on_record", &self.on_record.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .field("on_ignored", &self.on_ignored.is_some())
            .finish()
    }
}

/// FIFO queue of handlers for outstanding requests.
#[derive(Debug, Default)]
pub struct HandlerQueue {
    queue: VecDeque<ResponseHandler>,
}

impl HandlerQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a handler for a request about to be sent.
    pub fn push(&mut self, handler: ResponseHandler) {
        self.queue.push_back(handler);
    }

    /// Consume the head handler. Call on SUCCESS/FAILURE/IGNORED.
    pub fn pop(&mut self) -> Option<ResponseHandler> {
        self.queue.pop_front()
    }

    /// Borrow the head handler without consuming it. Call on RECORD.
    pub fn head_mut(&mut self) -> Option<&mut ResponseHandler> {
        self.queue.front_mut()
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no requests are outstanding.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every queued handler. Used when the connection dies.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
