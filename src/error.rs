use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A clause handed to `and`/`or` is not boolean.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cannot parse `{input}`: {reason}")]
    Parse { input: String, reason: String },

    #[error("unknown variable: {0}")]
    UnknownVariable(String),
}

impl Error {
    pub fn parse(input: impl ToString, reason: impl ToString) -> Self {
        Error::Parse {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
