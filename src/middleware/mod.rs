pub mod auth;
pub mod response;

pub use auth::{require_scope, RequiredScope};
pub use response::{ApiResponse, ApiResult};
