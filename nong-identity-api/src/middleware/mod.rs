/// Middleware modules for the API server
///
/// Authentication and policy middleware live in the shared crate; this
/// module only holds the response hardening applied to every route.

pub mod security;
