use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorCode {
    NotFound,
    Validation,
    Conflict,
    Busy,
    Io,
    Internal,
}

impl StoreErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation_error",
            Self::Conflict => "conflict",
            Self::Busy => "busy",
            Self::Io => "io_error",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::NotFound, what)
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Validation, message)
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Conflict, message)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::QueryReturnedNoRows => StoreErrorCode::NotFound,
            rusqlite::Error::SqliteFailure(inner, _) => match inner.code {
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                    StoreErrorCode::Busy
                }
                rusqlite::ErrorCode::ConstraintViolation => StoreErrorCode::Conflict,
                rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::DiskFull
                | rusqlite::ErrorCode::ReadOnly => StoreErrorCode::Io,
                _ => StoreErrorCode::Internal,
            },
            _ => StoreErrorCode::Internal,
        };
        Self::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rows_maps_to_not_found() {
        let err = StoreError::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.code, StoreErrorCode::NotFound);
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = StoreError::conflict("bank balance moved");
        assert_eq!(err.to_string(), "conflict: bank balance moved");
    }
}
