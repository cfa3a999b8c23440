//! Core functionality for the vigil zero-trust authentication engine
//!
//! vigil walks a user through a multi-step authentication sequence
//! (credentials, one-time passcode, device trust, risk-based policy decision)
//! and records every step as an auditable event. This crate is the engine:
//! domain types, repository contracts, and the services that implement the
//! state machine. It owns no wire protocol and performs no I/O of its own;
//! storage, signal lookup, and passcode delivery arrive as collaborator
//! traits.
//!
//! See [`services::AuthService`] for the state machine entry points,
//! [`policy`] and [`risk`] for the zero-trust decision pipeline, and
//! [`repositories`] for the storage contract a backend must implement.

pub mod account;
pub mod audit;
pub mod clock;
pub mod device;
pub mod error;
pub mod id;
pub mod lock;
pub mod notify;
pub mod otp;
pub mod policy;
pub mod repositories;
pub mod risk;
pub mod services;
pub mod session;
pub mod signals;
pub mod validation;

pub use account::{Account, AccountId, AccountStatus, Role};
pub use audit::{Actor, AuditAction, AuditEvent, AuditOutcome};
pub use clock::{Clock, SystemClock};
pub use device::{Device, DeviceAttestation, DeviceId, DevicePosture};
pub use error::Error;
pub use notify::{NotificationSink, TracingNotifier};
pub use otp::{OtpChallenge, OtpChannel, OtpPurpose};
pub use policy::{PolicyDecision, PolicyResult};
pub use repositories::RepositoryProvider;
pub use services::{AuthConfig, AuthService, PendingAuth, RegisterRequest, VerifyOutcome};
pub use session::{Session, SessionContext, SessionToken};
pub use signals::{ClientInfo, NetworkOrigin, SignalSnapshot, SignalSource, StaticSignalSource};
