//! Error types for the stock/checkpoint persistence layer.
//!
//! Every fallible operation in this crate returns [`StockError`] directly so
//! that callers (and tests) can match on the exact kind or inspect the
//! message substrings documented by each variant, rather than going through
//! a type-erased `Box<dyn Error>`.

/// All locally-originated error kinds produced by this crate.
#[derive(thiserror::Error, Debug)]
pub enum StockError {
    /// Underlying filesystem error from open/read/write/seek/truncate/rename/sync.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file format version")]
    InvalidVersion,

    #[error("invalid index type encoding")]
    InvalidIndexEncoding,

    #[error("invalid value type encoding")]
    InvalidValueEncoding,

    #[error("invalid free-list file size")]
    InvalidFreeListSize,

    #[error("insufficient value file size")]
    InsufficientValueFileSize,

    #[error("index out of range, got {got}, range [0,{bound})")]
    IndexOutOfRange { got: u64, bound: u64 },

    #[error("cannot pop from empty stack")]
    EmptyStack,

    #[error("writing data > {0} bytes not supported")]
    WriteTooLarge(usize),

    /// Positions are modeled as `u64`, so a literal negative position is
    /// unrepresentable; this fires instead when `pos + len` would overflow
    /// `u64`, the closest real failure in the same family ("this position
    /// plus this many bytes does not name a valid range").
    #[error("cannot write at negative position")]
    NegativeWritePosition,

    /// See [`NegativeWritePosition`](Self::NegativeWritePosition); same
    /// overflow check, on the read path.
    #[error("cannot read at negative index")]
    NegativeReadPosition,

    #[error("{0}")]
    Other(String),

    /// A multi-step operation (flush, close, commit) failed at more than one
    /// sub-step; every underlying cause is preserved.
    #[error("{}", join_display(.0))]
    Joined(Vec<StockError>),
}

fn join_display(errors: &[StockError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl StockError {
    /// Folds a list of fallible results into a single error, preserving every
    /// cause. Returns `Ok(())` if every result was `Ok`.
    pub fn join<T>(results: Vec<Result<T, StockError>>) -> Result<Vec<T>, StockError> {
        let mut oks = Vec::with_capacity(results.len());
        let mut errs = Vec::new();
        for r in results {
            match r {
                Ok(v) => oks.push(v),
                Err(e) => errs.push(e),
            }
        }
        if errs.is_empty() {
            Ok(oks)
        } else if errs.len() == 1 {
            Err(errs.pop().unwrap())
        } else {
            Err(StockError::Joined(errs))
        }
    }

    pub fn other<S: Into<String>>(msg: S) -> Self {
        StockError::Other(msg.into())
    }

    /// Folds a non-empty list of already-observed errors into one, the way
    /// [`join`](Self::join) does for mixed `Result`s. Panics if `errors` is
    /// empty; callers only reach for this once they know at least one
    /// sub-step failed.
    pub fn join_errors(mut errors: Vec<StockError>) -> StockError {
        if errors.len() == 1 {
            errors.pop().unwrap()
        } else {
            StockError::Joined(errors)
        }
    }
}

pub type StockResult<T> = Result<T, StockError>;

/// Adds file-path context to a raw `std::io::Result`, mirroring the common
/// `.map_err(|e| format!("... - {}", e))` idiom but returning a
/// [`StockError`] directly rather than a type-erased error.
pub trait IoContext<T> {
    fn io_context<F: FnOnce() -> String>(self, context: F) -> StockResult<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context<F: FnOnce() -> String>(self, context: F) -> StockResult<T> {
        self.map_err(|e| StockError::other(format!("{}: {}", context(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_context_prefixes_the_message() {
        let err: std::io::Result<()> = Err(std::io::Error::new(std::io::ErrorKind::NotFound, "nope"));
        let wrapped = err.io_context(|| "opening /tmp/x".to_string()).unwrap_err();
        assert!(wrapped.to_string().contains("opening /tmp/x"));
        assert!(wrapped.to_string().contains("nope"));
    }

    #[test]
    fn join_single_error_is_not_wrapped() {
        let e = StockError::EmptyStack;
        match StockError::join_errors(vec![e]) {
            StockError::EmptyStack => {}
            other => panic!("expected a bare EmptyStack, got {:?}", other),
        }
    }
}
