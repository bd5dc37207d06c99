//! In-process transport that records every invocation.
//!
//! Unscripted commands answer with the command's natural default: `null` for
//! the write commands and `false` for the active-user check.

use crate::{CommandError, Invocation, InvokeTransport, CHECK_ACTIVE_USER};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

type Reply = Result<Value, CommandError>;

#[derive(Debug, Default)]
pub struct RecordingTransport {
    invocations: Mutex<Vec<Invocation>>,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next call of `cmd`.
    pub fn respond(&self, cmd: &str, reply: Reply) {
        self.replies.lock().entry(cmd.to_string()).or_default().push_back(reply);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }
}

#[async_trait]
impl InvokeTransport for RecordingTransport {
    async fn invoke(&self, invocation: Invocation) -> Result<Value, CommandError> {
        let scripted = self
            .replies
            .lock()
            .get_mut(&invocation.cmd)
            .and_then(VecDeque::pop_front);

        let reply = scripted.unwrap_or_else(|| match invocation.cmd.as_str() {
            CHECK_ACTIVE_USER => Ok(Value::Bool(false)),
            _ => Ok(Value::Null),
        });

        self.invocations.lock().push(invocation);
        reply
    }
}
