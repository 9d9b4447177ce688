use thiserror::Error;

/// Failures of a query against the code store.
///
/// An unknown code is not an error: lookups and distances return `None` and
/// a radius search from an unknown origin returns no matches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A key listed by the store did not resolve to a record.
    #[error("corrupt code store: listed code {code:?} has no record")]
    CorruptStore { code: String },
}
