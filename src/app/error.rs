use serde::Serialize;
use std::fmt;

/// Serializable command failure envelope. `code` is one of `ERR_VALIDATION`,
/// `ERR_DEPENDENCY`, `ERR_SYSTEM`.
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub error: String,
    pub code: String,
    pub trace_id: String,
}

impl AppError {
    fn tagged(code: &'static str, message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.to_string(),
            trace_id: trace_id.into(),
        }
    }

    pub fn validation(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::tagged("ERR_VALIDATION", message, trace_id)
    }

    pub fn dependency(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::tagged("ERR_DEPENDENCY", message, trace_id)
    }

    pub fn system(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::tagged("ERR_SYSTEM", message, trace_id)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.code)
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_code_and_trace_id() {
        let err = AppError::validation("device_id is required", "trace-1");
        assert_eq!(err.code, "ERR_VALIDATION");
        assert_eq!(err.trace_id, "trace-1");
        assert_eq!(err.to_string(), "device_id is required (ERR_VALIDATION)");
    }
}
