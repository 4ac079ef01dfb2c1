pub mod auth_service;
pub mod auth_service_impl;
pub mod password_policy;
pub mod token_service;

pub use auth_service::{AuthError, AuthOutcome, AuthService, PublicUser, RequestContext};
pub use auth_service_impl::SeaOrmAuthService;
pub use token_service::{Claims, TokenError, TokenService};
