use crate::core_modules::histogram::Channel;
use crate::core_modules::kernel::KernelError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A counting kernel rejected a non-empty partition of `channel`.
    #[error("{channel} kernel failed: {source}")]
    Kernel {
        channel: Channel,
        #[source]
        source: KernelError,
    },

    /// A pool task panicked. The pool itself survives and stays usable.
    #[error("histogram worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("unsupported image: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineErrorClass {
    InvalidInput,
    InvalidConfig,
    Fatal,
}

impl EngineError {
    pub fn class(&self) -> EngineErrorClass {
        match self {
            Self::InvalidConfig(_) => EngineErrorClass::InvalidConfig,
            Self::InvalidInput(_) | Self::Image(_) => EngineErrorClass::InvalidInput,
            Self::Kernel { .. } | Self::WorkerPanicked(_) => EngineErrorClass::Fatal,
        }
    }

    pub(crate) fn from_join(error: tokio::task::JoinError) -> Self {
        if error.is_panic() {
            let payload = error.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Self::WorkerPanicked(message)
        } else {
            Self::WorkerPanicked(error.to_string())
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
