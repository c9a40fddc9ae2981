use crate::common::error::CrepoError;

/// Result alias used across the orchestration layer.
///
/// # Examples
///
/// ```
/// use crepo::common::result::CrepoResult;
/// use crepo::common::error::CrepoError;
///
/// fn example_function() -> CrepoResult<String> {
///     Ok("success".to_string())
/// }
///
/// fn example_with_error() -> CrepoResult<()> {
///     Err(CrepoError::internal_error("Something went wrong"))
/// }
/// ```
pub type CrepoResult<T> = Result<T, CrepoError>;

/// Conversion helpers from `Option` into [`CrepoResult`].
pub trait OptionExt<T> {
    /// Convert `None` into an internal error carrying `message`.
    ///
    /// ```
    /// use crepo::common::result::{CrepoResult, OptionExt};
    ///
    /// let none_value: Option<String> = None;
    /// let result: CrepoResult<String> = none_value.ok_or_internal_error("Value not found");
    /// assert!(result.is_err());
    /// ```
    fn ok_or_internal_error(self, message: impl Into<String>) -> CrepoResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_internal_error(self, message: impl Into<String>) -> CrepoResult<T> {
        self.ok_or_else(|| CrepoError::internal_error(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_ext_some() {
        let value: Option<u32> = Some(3);
        assert_eq!(value.ok_or_internal_error("missing").unwrap(), 3);
    }

    #[test]
    fn test_option_ext_none() {
        let value: Option<u32> = None;
        let error = value.ok_or_internal_error("remote missing").unwrap_err();
        assert_eq!(error.to_string(), "Internal error: remote missing");
    }
}
