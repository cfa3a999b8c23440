use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Passcode error: {0}")]
    Otp(#[from] OtpError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Failures on the credential/lockout path. Every variant renders a message
/// suitable for direct display to the end user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("{}", invalid_credentials_message(.remaining_attempts))]
    InvalidCredentials { remaining_attempts: Option<u32> },

    #[error("Account locked. Try again in {retry_after_minutes} minute(s).")]
    AccountLocked { retry_after_minutes: i64 },

    #[error("Account disabled by administrator")]
    AccountDisabled,

    #[error("Account not verified. Complete code verification first.")]
    NotVerified,

    #[error("Too many login attempts. Try again in {retry_after_seconds} second(s).")]
    RateLimited { retry_after_seconds: i64 },

    #[error("Email already registered")]
    DuplicateEmail,
}

fn invalid_credentials_message(remaining: &Option<u32>) -> String {
    match remaining {
        Some(n) => format!("Invalid credentials ({n} attempts remaining)"),
        None => "Invalid credentials".to_string(),
    }
}

/// Failures while verifying a one-time passcode. `NotFound`, `Expired`, and
/// `AttemptsExceeded` all mean the challenge is gone and a new one must be
/// requested; `Mismatch` leaves the challenge in place with one fewer attempt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("No active code. Request a new one.")]
    NotFound,

    #[error("Code expired. Request a new one.")]
    Expired,

    #[error("Too many attempts. Request a new code.")]
    AttemptsExceeded,

    #[error("Invalid code ({remaining_attempts} attempts remaining)")]
    Mismatch { remaining_attempts: u32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid mobile number: {0}")]
    InvalidMobile(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Record not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl Error {
    /// True for credential-path denials that increment local counters but are
    /// not system-level failures.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    /// True for failures rejected before any state change.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// True for passcode-path denials, recoverable by reissuing.
    pub fn is_otp_error(&self) -> bool {
        matches!(self, Error::Otp(_))
    }

    /// True for unexpected collaborator failures. These are the only errors
    /// that should propagate past the caller's denial rendering.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// True when the denial is time-boxed and will clear on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Auth(AuthError::AccountLocked { .. })
                | Error::Auth(AuthError::RateLimited { .. })
                | Error::Otp(OtpError::Expired)
                | Error::Otp(OtpError::AttemptsExceeded)
        )
    }
}
