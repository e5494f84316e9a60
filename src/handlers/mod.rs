// Route handlers. Public routes take no claims; gated routes read the
// ClaimsContext that the require_scope middleware injected.
pub mod drinks;
pub mod health;
