use std::fmt;

/// Uniform failure shape of every store round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Malformed or out-of-range input, rejected locally or by the store schema.
    Validation(String),
    /// The operation needs a session that is absent or no longer valid.
    Auth(String),
    /// The referenced record does not exist.
    NotFound(String),
    /// Any other remote failure: transport, server, unknown.
    Store {
        code: Option<String>,
        message: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Validation(msg) => write!(f, "invalid input: {msg}"),
            StoreError::Auth(msg) => write!(f, "authentication required: {msg}"),
            StoreError::NotFound(msg) => write!(f, "not found: {msg}"),
            StoreError::Store {
                code: Some(code),
                message,
            } => write!(f, "store error [{code}]: {message}"),
            StoreError::Store { code: None, message } => write!(f, "store error: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    pub fn store(message: impl Into<String>) -> Self {
        StoreError::Store {
            code: None,
            message: message.into(),
        }
    }

    /// True for failures that a login would fix.
    ///
    /// Besides the explicit variant, an unclassified store failure still counts
    /// when its code or message matches a known authentication pattern.
    pub fn is_auth(&self) -> bool {
        match self {
            StoreError::Auth(_) => true,
            StoreError::Store { code, message } => looks_like_auth(code.as_deref(), message),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<foundation::CoordError> for StoreError {
    fn from(err: foundation::CoordError) -> Self {
        StoreError::Validation(err.to_string())
    }
}

const AUTH_CODES: &[&str] = &["42501", "PGRST301", "PGRST302", "401", "403"];

const AUTH_MESSAGE_PATTERNS: &[&str] = &[
    "jwt",
    "not authenticated",
    "auth session missing",
    "row-level security",
    "permission denied",
    "unauthorized",
];

pub fn looks_like_auth(code: Option<&str>, message: &str) -> bool {
    if code.is_some_and(|c| AUTH_CODES.contains(&c)) {
        return true;
    }
    let message = message.to_ascii_lowercase();
    AUTH_MESSAGE_PATTERNS.iter().any(|p| message.contains(p))
}

#[cfg(test)]
mod tests {
    use super::StoreError;

    #[test]
    fn auth_classification_covers_variant_and_patterns() {
        assert!(StoreError::Auth("no session".into()).is_auth());
        assert!(
            StoreError::Store {
                code: Some("PGRST301".into()),
                message: "expired".into()
            }
            .is_auth()
        );
        assert!(StoreError::store("JWT expired").is_auth());
        assert!(
            StoreError::store("new row violates row-level security policy for table").is_auth()
        );
        assert!(!StoreError::store("connection reset").is_auth());
        assert!(!StoreError::NotFound("p-1".into()).is_auth());
    }

    #[test]
    fn display_includes_code_when_present() {
        let e = StoreError::Store {
            code: Some("500".into()),
            message: "boom".into(),
        };
        assert_eq!(e.to_string(), "store error [500]: boom");
        assert_eq!(StoreError::store("boom").to_string(), "store error: boom");
    }
}
