use async_trait::async_trait;
use command_bridge::{CommandBridge, CommandError};
use doc_model::{NewBook, NewUser};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted answer for the next write command.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Reject(&'static str),
    /// Wait `ms` milliseconds, then succeed or reject with the message.
    Delay(u64, Option<&'static str>),
    Hang,
}

pub(crate) struct ScriptedBridge {
    replies: Mutex<VecDeque<Reply>>,
    active: Result<bool, CommandError>,
    books: Mutex<Vec<NewBook>>,
    users: Mutex<Vec<NewUser>>,
    checks: AtomicUsize,
}

impl ScriptedBridge {
    pub(crate) fn new() -> Arc<Self> {
        Self::build(Vec::<Reply>::new(), Ok(false))
    }

    pub(crate) fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Self::build(replies, Ok(false))
    }

    pub(crate) fn with_active_user(active: Result<bool, CommandError>) -> Arc<Self> {
        Self::build(Vec::<Reply>::new(), active)
    }

    fn build(
        replies: impl IntoIterator<Item = Reply>,
        active: Result<bool, CommandError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            active,
            books: Mutex::new(Vec::new()),
            users: Mutex::new(Vec::new()),
            checks: AtomicUsize::new(0),
        })
    }

    pub(crate) fn books(&self) -> Vec<NewBook> {
        self.books.lock().clone()
    }

    pub(crate) fn users(&self) -> Vec<NewUser> {
        self.users.lock().clone()
    }

    pub(crate) fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    async fn next_reply(&self) -> Result<(), CommandError> {
        let reply = self.replies.lock().pop_front();
        match reply {
            None => Ok(()),
            Some(Reply::Reject(message)) => Err(CommandError::Rejected(message.to_string())),
            Some(Reply::Delay(ms, outcome)) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                match outcome {
                    Some(message) => Err(CommandError::Rejected(message.to_string())),
                    None => Ok(()),
                }
            }
            Some(Reply::Hang) => std::future::pending().await,
        }
    }
}

#[async_trait]
impl CommandBridge for ScriptedBridge {
    async fn insert_new_book(&self, book: &NewBook) -> Result<(), CommandError> {
        self.books.lock().push(book.clone());
        self.next_reply().await
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), CommandError> {
        self.users.lock().push(user.clone());
        self.next_reply().await
    }

    async fn check_if_there_is_active_user_status(&self) -> Result<bool, CommandError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.active.clone()
    }
}
