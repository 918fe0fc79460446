// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache backend operations.

/// An error from a cache backend operation.
///
/// This is an opaque error type that can wrap any underlying error from a
/// backend implementation. The registry never surfaces it to callers: every
/// backend error is absorbed as a cache miss or a skipped write.
///
/// # Example
///
/// ```
/// use stowage_backend::Error;
///
/// let error = Error::from_message("connection refused");
/// ```
#[ohno::error]
pub struct Error {}

impl Error {
    /// Creates a new error from any type that can be converted to an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use stowage_backend::Error;
    ///
    /// let error = Error::from_message("operation timed out");
    /// ```
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }

    /// The error every operation of a degraded backend returns.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::caused_by("cache backend unavailable")
    }
}

/// A specialized [`Result`] type for cache backend operations.
pub type Result<T> = std::result::Result<T, Error>;
