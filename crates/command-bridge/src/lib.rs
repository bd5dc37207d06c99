//! Typed client for the host commands the library front end relies on.
//!
//! The host speaks a loose `invoke(cmd, args) -> json` protocol. [`InvokeBridge`]
//! puts a typed [`CommandBridge`] on top of any [`InvokeTransport`] so callers
//! never build argument objects by hand.

use async_trait::async_trait;
use doc_model::{NewBook, NewUser};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub mod recording;

pub use recording::RecordingTransport;

pub const INSERT_NEW_BOOK: &str = "insert_new_book_command";
pub const CREATE_USER: &str = "create_user_command";
pub const CHECK_ACTIVE_USER: &str = "check_if_there_is_active_user_status_command";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The backend ran the command and refused it.
    #[error("{0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("failed to serialize command arguments: {0}")]
    Serialization(String),

    #[error("unexpected response to {command}: {value}")]
    UnexpectedResponse { command: String, value: Value },
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::Serialization(err.to_string())
    }
}

/// One `invoke` call as it crosses the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub cmd: String,
    pub args: Value,
}

impl Invocation {
    pub fn new(cmd: impl Into<String>, args: Value) -> Self {
        Self { cmd: cmd.into(), args }
    }
}

#[async_trait]
pub trait InvokeTransport: Send + Sync {
    async fn invoke(&self, invocation: Invocation) -> Result<Value, CommandError>;
}

#[async_trait]
pub trait CommandBridge: Send + Sync {
    async fn insert_new_book(&self, book: &NewBook) -> Result<(), CommandError>;

    async fn create_user(&self, user: &NewUser) -> Result<(), CommandError>;

    async fn check_if_there_is_active_user_status(&self) -> Result<bool, CommandError>;
}

pub struct InvokeBridge<T> {
    transport: T,
}

impl<T: InvokeTransport> InvokeBridge<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call(&self, cmd: &str, args: Value) -> Result<Value, CommandError> {
        debug!(cmd, "invoking host command");

        self.transport.invoke(Invocation::new(cmd, args)).await.inspect_err(|err| {
            warn!(cmd, "host command failed: {err}");
        })
    }
}

#[async_trait]
impl<T: InvokeTransport> CommandBridge for InvokeBridge<T> {
    async fn insert_new_book(&self, book: &NewBook) -> Result<(), CommandError> {
        let args = serde_json::to_value(book)?;
        self.call(INSERT_NEW_BOOK, args).await.map(|_| ())
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), CommandError> {
        let args = serde_json::to_value(user)?;
        self.call(CREATE_USER, args).await.map(|_| ())
    }

    async fn check_if_there_is_active_user_status(&self) -> Result<bool, CommandError> {
        match self.call(CHECK_ACTIVE_USER, Value::Object(Default::default())).await? {
            Value::Bool(active) => Ok(active),
            value => Err(CommandError::UnexpectedResponse {
                command: CHECK_ACTIVE_USER.to_string(),
                value,
            }),
        }
    }
}
