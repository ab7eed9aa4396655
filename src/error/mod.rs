use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {context}")]
    Config { context: &'static str },

    #[error("action failed: {context}")]
    Action { context: String },

    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn config(context: &'static str) -> Self {
        Self::Config { context }
    }

    /// Failure reported by a transform action.
    pub fn action(context: impl Into<String>) -> Self {
        Self::Action {
            context: context.into(),
        }
    }

    pub(crate) fn stage(stage: &'static str, source: Error) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source),
        }
    }
}
