use parlay_utils::errors::{ErrorWithBody, ParlayErrorBody};
use std::fmt;

#[doc(hidden)]
#[macro_export]
macro_rules! runtime_error {
    ($($x:tt)*) => {
        $crate::errors::ParlayBaseError::new(parlay_utils::runtime_error_body!($($x)*))
    };
}

/// Error raised on computation-graph construction misuse.
///
/// There is no recovery path: the caller must fix the graph-building code or
/// configuration and rebuild.
#[derive(Debug, Clone)]
pub struct ParlayBaseError {
    body: Box<ParlayErrorBody>,
}

impl ParlayBaseError {
    pub fn new(body: ParlayErrorBody) -> Self {
        Self {
            body: Box::new(body),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParlayBaseError>;

impl fmt::Display for ParlayBaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.body, f)
    }
}

impl std::error::Error for ParlayBaseError {}

impl ErrorWithBody for ParlayBaseError {
    fn get_body(&self) -> &ParlayErrorBody {
        &self.body
    }
}

impl From<std::io::Error> for ParlayBaseError {
    fn from(error: std::io::Error) -> Self {
        runtime_error!("IO error: {}", error)
    }
}

impl From<serde_json::Error> for ParlayBaseError {
    fn from(error: serde_json::Error) -> Self {
        runtime_error!("Serialization error: {}", error)
    }
}

impl From<std::fmt::Error> for ParlayBaseError {
    fn from(error: std::fmt::Error) -> Self {
        runtime_error!("Formatting error: {}", error)
    }
}
