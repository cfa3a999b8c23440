//! Service layer for business logic
//!
//! Concrete service implementations that encapsulate the authentication
//! state machine and the operations around it.

pub mod account;
pub mod audit;
pub mod auth;
pub mod device;
pub mod otp;
pub mod rate_limit;

pub use account::{AccountService, NewAccountInput};
pub use audit::AuditService;
pub use auth::{AuthConfig, AuthService, PendingAuth, RegisterRequest, VerifyOutcome};
pub use device::DeviceService;
pub use otp::{OtpConfig, OtpService};
pub use rate_limit::{RateLimitConfig, RateLimitService};
