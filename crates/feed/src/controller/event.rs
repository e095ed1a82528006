use crate::remote::RemoteError;

/// A change made to the media elsewhere in the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Deleted { result: Result<(), RemoteError> },
    Moved { result: Result<(), RemoteError> },
    Copied { result: Result<(), RemoteError> },
    Renamed { account: String },
    Uploaded { result: Result<(), RemoteError>, account: String },
}

/// Shows failures to the user.
pub trait ErrorPresenter: Send + Sync {
    fn present(&self, error: &RemoteError);
}

/// Default presenter: the failure only goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresenter;
impl ErrorPresenter for LogPresenter {
    fn present(&self, error: &RemoteError) {
        tracing::warn!(code = error.code, description = %error.description, "Media operation failed");
    }
}
