/// API route handlers
///
/// - `health`: Health check endpoint
/// - `home`: The caller's claims

pub mod health;
pub mod home;
