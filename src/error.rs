use datafusion::error::DataFusionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine error: {0}")]
    Engine(DataFusionError),
}

pub type Result<T> = std::result::Result<T, HarnessError>;

impl HarnessError {
    /// Tunnels a harness error through the engine's error type so it can
    /// cross a record-batch stream and be recovered on the other side.
    pub(crate) fn into_external(self) -> DataFusionError {
        DataFusionError::External(Box::new(self))
    }
}

/// Classifies engine stage errors into the harness taxonomy. Semantic,
/// syntactic and evaluation failures count as invalid input to the tool;
/// errors our own providers tunneled through `External` come back
/// unchanged; anything else keeps the kind the engine assigned.
impl From<DataFusionError> for HarnessError {
    fn from(err: DataFusionError) -> Self {
        match err {
            DataFusionError::Context(_, inner) => Self::from(*inner),
            DataFusionError::External(e) => match e.downcast::<HarnessError>() {
                Ok(ours) => *ours,
                Err(other) => HarnessError::Engine(DataFusionError::External(other)),
            },
            DataFusionError::SQL(e, _) => HarnessError::InvalidArgument(e.to_string()),
            DataFusionError::Plan(msg) => HarnessError::InvalidArgument(msg),
            DataFusionError::SchemaError(e, _) => HarnessError::InvalidArgument(e.to_string()),
            DataFusionError::Execution(msg) => HarnessError::InvalidArgument(msg),
            DataFusionError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                HarnessError::NotFound(e.to_string())
            }
            other => HarnessError::Engine(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_errors_become_invalid_argument() {
        let err = HarnessError::from(DataFusionError::Plan("bad column".to_string()));
        assert!(matches!(err, HarnessError::InvalidArgument(msg) if msg == "bad column"));
    }

    #[test]
    fn tunneled_errors_come_back_unchanged() {
        let original = HarnessError::NotFound("no such file".to_string());
        let err = HarnessError::from(original.into_external());
        assert!(matches!(err, HarnessError::NotFound(msg) if msg == "no such file"));
    }

    #[test]
    fn context_wrapping_is_unwound() {
        let inner = DataFusionError::Plan("inner".to_string());
        let wrapped = DataFusionError::Context("outer".to_string(), Box::new(inner));
        assert!(matches!(
            HarnessError::from(wrapped),
            HarnessError::InvalidArgument(_)
        ));
    }

    #[test]
    fn unknown_engine_errors_pass_through() {
        let err = HarnessError::from(DataFusionError::NotImplemented("x".to_string()));
        assert!(matches!(err, HarnessError::Engine(_)));
    }
}
