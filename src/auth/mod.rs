//! Authentication and identity module

pub mod password;
pub mod token;
pub mod user;

// Re-export main components
pub use token::{AuthenticatedUser, Claims, TokenManager, TokenPair};
pub use user::{IdentityError, User};
