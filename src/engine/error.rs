use thiserror::Error;

/// Errors surfaced by the playback engine to the caller of the triggering
/// operation. None of them are fatal to the host process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The operation needs a bound word sequence and there is none.
    #[error("Please select a book first.")]
    NoBookLoaded,

    /// The bound word sequence has no tokens.
    #[error("This book has no readable content. Please try another book.")]
    EmptyContent,

    /// An index escaped `[0, len)`. Callers clamp before indexing, so this
    /// points at a logic defect.
    #[error("word index {index} out of range for sequence of {len} words")]
    OutOfRange { index: usize, len: usize },
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(
            EngineError::NoBookLoaded.to_string(),
            "Please select a book first."
        );
        assert!(EngineError::EmptyContent.to_string().contains("no readable content"));
        assert_eq!(
            EngineError::OutOfRange { index: 7, len: 3 }.to_string(),
            "word index 7 out of range for sequence of 3 words"
        );
    }
}
