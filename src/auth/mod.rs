//! Authentication core.
//!
//! Token issuance/verification, password hashing, refresh-token rotation and
//! per-route admission control, composed behind the identity gateway.

pub mod claims;
pub mod gateway;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod service;

pub use claims::{Claims, TokenScope};
pub use gateway::{AuthGateway, ConfirmationOutcome, ConfirmationRequest, TokenPair};
pub use password::{hash_password, verify_password};
pub use rate_limit::{RateLimiter, RateQuota, RouteClass};
pub use service::TokenService;
