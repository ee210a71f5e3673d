pub mod audit;
pub mod auth;

pub use audit::audit_middleware;
pub use auth::{auth_middleware, AppState, AuthUser, Capability};
