//! Authentication and authorization module

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, JwtService, RefreshClaims, TokenError, TokenPair};
pub use middleware::{authenticate, extract_token, require_admin, require_auth, Principal};
pub use password::PasswordHasher;
