use derive_more::derive::{Display, Error};

//a failed write is reported once to the caller, nothing is retried or queued
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Writing {path} failed: {reason}")]
pub struct WriteError {
    pub path: String,
    pub reason: String,
}

impl WriteError {
    pub fn new(path: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
