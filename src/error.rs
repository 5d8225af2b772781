use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unknown actor: {0}")]
    UnknownActor(String),

    #[error("actor already registered: {0}")]
    DuplicateActor(String),

    #[error("mailbox full: {0}")]
    MailboxFull(String),

    #[error("mailbox closed: {0}")]
    MailboxClosed(String),

    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("vehicle {0} has no active ride")]
    MissingAssignment(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Label used for the dropped-message counter.
    pub fn drop_reason(&self) -> &'static str {
        match self {
            AppError::UnknownActor(_) => "unknown_actor",
            AppError::MailboxFull(_) => "mailbox_full",
            AppError::MailboxClosed(_) => "mailbox_closed",
            _ => "other",
        }
    }
}
