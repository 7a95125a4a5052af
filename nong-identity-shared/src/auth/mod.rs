/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`claims`]: Claims and the authenticated principal
/// - [`jwt`]: HS256 bearer token validation
/// - [`authorization`]: Named claim-based policies
/// - [`middleware`]: Axum layers that authenticate and authorize requests
/// - [`password`]: Argon2id password hashing and password rules
///
/// # Example
///
/// ```no_run
/// use nong_identity_shared::auth::authorization::AuthorizationPolicy;
/// use nong_identity_shared::auth::jwt::{validate_token, TokenValidation};
/// use nong_identity_shared::auth::password::{hash_password, verify_password};
///
/// # fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// // Password authentication
/// let hash = hash_password("Pass123$")?;
/// assert!(verify_password("Pass123$", &hash)?);
///
/// // Bearer token authentication and authorization
/// let validation = TokenValidation::new("secret-key").with_issuer("https://localhost:44310");
/// let principal = validate_token(token, &validation)?;
/// AuthorizationPolicy::new("SomePolicy").require_scope("roles").evaluate(&principal)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;
