/// Errors that can occur in the store layer.
///
/// Every variant is an infrastructure failure. "Key not present" is never
/// an error here: reads report it as `Ok(None)` / `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing service could not be reached, or a command timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A read command (`GET`, `EXISTS`, `PING`) failed.
    #[error("store read failed: {0}")]
    ReadFailed(String),

    /// A write command (`SET`, `DEL`) failed.
    #[error("store write failed: {0}")]
    WriteFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display_includes_message() {
        let err = StoreError::WriteFailed("invalid expire time".into());
        assert_eq!(err.to_string(), "store write failed: invalid expire time");
    }
}
