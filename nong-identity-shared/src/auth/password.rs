/// Password hashing for `Users.PasswordHash`
///
/// Hashes are Argon2id in PHC string format, so the parameters used for a
/// hash travel with it and older hashes keep verifying after the defaults
/// change. [`needs_rehash`] tells whether a stored hash was made with other
/// parameters than the current ones.
///
/// [`PasswordPolicy`] mirrors the usual identity password rules (length,
/// digit, lower and upper case, non-alphanumeric).
///
/// # Example
///
/// ```
/// use nong_identity_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Pass123$")?;
///
/// assert!(verify_password("Pass123$", &hash)?);
/// assert!(!verify_password("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    /// Memory in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    /// 64 MiB, 3 passes, 4 lanes
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl HashingParams {
    fn argon2(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = ParamsBuilder::new()
            .m_cost(self.memory_kib)
            .t_cost(self.iterations)
            .p_cost(self.parallelism)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hashes a password with the default parameters
///
/// Example output:
/// ```text
/// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with(password, &HashingParams::default())
}

/// Hashes a password with explicit parameters and a fresh random salt
pub fn hash_password_with(password: &str, params: &HashingParams) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = params
        .argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// # Returns
///
/// `Ok(true)` if password matches, `Ok(false)` if it doesn't match
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if the stored value is not a PHC
/// string or lacks a salt or digest.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // "$argon2id$x" parses, but has nothing to compare against
    if parsed_hash.salt.is_none() || parsed_hash.hash.is_none() {
        return Err(PasswordError::InvalidHash(
            "Hash is missing its salt or digest".to_string(),
        ));
    }

    // Parameters come from the hash itself
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Whether `hash` was produced with anything other than Argon2id at `params`
pub fn needs_rehash(hash: &str, params: &HashingParams) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    if parsed_hash.algorithm != Algorithm::Argon2id.ident() {
        return Ok(true);
    }

    let stored = Params::try_from(&parsed_hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Bad parameters: {}", e)))?;

    Ok(stored.m_cost() != params.memory_kib
        || stored.t_cost() != params.iterations
        || stored.p_cost() != params.parallelism)
}

/// Password composition rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: 6,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: true,
        }
    }
}

impl PasswordPolicy {
    /// Checks a candidate password
    ///
    /// # Returns
    ///
    /// Every rule the password breaks, empty if it is acceptable
    pub fn violations(&self, password: &str) -> Vec<String> {
        let mut violations = Vec::new();

        if password.chars().count() < self.required_length {
            violations.push(format!(
                "Password must be at least {} characters long",
                self.required_length
            ));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push("Password must contain at least one digit".to_string());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            violations.push("Password must contain at least one lowercase letter".to_string());
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            violations.push("Password must contain at least one uppercase letter".to_string());
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_alphanumeric()) {
            violations.push("Password must contain at least one special character".to_string());
        }

        violations
    }

    pub fn validate(&self, password: &str) -> Result<(), Vec<String>> {
        let violations = self.violations(password);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
