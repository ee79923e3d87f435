use ossuary_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid config: {0}")]
    Validation(String),

    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}
