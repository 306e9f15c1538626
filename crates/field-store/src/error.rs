use field_engine::{PersistenceError, SaveOperation};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("{operation:?} answer cannot hold {value}")]
    InvalidValue {
        operation: SaveOperation,
        value: String,
    },
    #[error("answer '{0}' not found")]
    NotFound(String),
}

impl From<StoreError> for PersistenceError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound(id) => PersistenceError::NotFound(id),
            StoreError::InvalidValue { operation, .. } => PersistenceError::Rejected {
                mutation: operation.mutation_name().to_string(),
                message,
            },
        }
    }
}
