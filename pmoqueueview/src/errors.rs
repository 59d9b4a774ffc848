use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueViewError {
    /// The session reported a now-playing item with a duration, but the
    /// queue catalog holds no item with that id.
    #[error("Now playing item {0} is not part of queue {1}")]
    NowPlayingNotInCatalog(String, String),
    #[error("Transport command '{0}' failed: {1}")]
    Transport(String, String),
    #[error("Queue view for {0} has been disposed")]
    Disposed(String),
    #[error("Cannot start queue view worker: {0}")]
    WorkerSpawn(String),
    #[error("Invalid queue view configuration: {0}")]
    Config(String),
}

impl QueueViewError {
    pub fn transport(command: &str, message: impl ToString) -> Self {
        QueueViewError::Transport(command.to_string(), message.to_string())
    }

    pub fn now_playing_not_in_catalog(id: &str, queue_id: &str) -> Self {
        QueueViewError::NowPlayingNotInCatalog(id.to_string(), queue_id.to_string())
    }
}
