//! Authentication and authorization for RentShare
//!
//! Email/password sign-in with Argon2 password hashes and JWT bearer
//! tokens, plus Actix-web extractors for authenticated members and admins.
//!
//! ```no_run
//! use rentshare_auth::{Claims, JwtService, PasswordService};
//! use rentshare_core::models::UserRole;
//! use uuid::Uuid;
//!
//! let passwords = PasswordService::new();
//! let hash = passwords.hash_password("secure_password")?;
//! assert!(passwords.verify_password("secure_password", &hash)?);
//!
//! let jwt = JwtService::new("your-secret-key", 3600);
//! let token = jwt.create_token(&Claims::new(Uuid::new_v4(), "a@example.com", UserRole::Member))?;
//! # Ok::<(), rentshare_core::error::AppError>(())
//! ```

pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use claims::Claims;
pub use jwt::JwtService;
pub use middleware::{AdminUser, AuthenticatedUser};
pub use password::PasswordService;
