/// Claim-based authorization policies
///
/// A policy is a named list of requirements evaluated against an
/// authenticated [`Principal`]. Every requirement must hold.
///
/// # Example
///
/// ```
/// use nong_identity_shared::auth::authorization::AuthorizationPolicy;
/// use nong_identity_shared::auth::claims::{Claim, Principal};
///
/// let policy = AuthorizationPolicy::new("SomePolicy").require_scope("roles");
///
/// let caller = Principal::new(vec![Claim::new("scope", "openid roles")]);
/// assert!(policy.evaluate(&caller).is_ok());
///
/// let other = Principal::new(vec![Claim::new("scope", "openid")]);
/// assert!(policy.evaluate(&other).is_err());
/// ```

use serde::Serialize;

use super::claims::Principal;

/// Name of the policy guarding the claims endpoints
pub const DEFAULT_POLICY_NAME: &str = "SomePolicy";

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No claim of the required type
    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    /// Claim present but none of its values is allowed
    #[error("Claim {claim_type} does not have an allowed value")]
    ClaimValueNotAllowed { claim_type: String },

    /// Required scope not granted
    #[error("Missing required scope: {0}")]
    MissingScope(String),
}

/// One condition a principal must meet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClaimRequirement {
    /// Some claim of this type exists
    Present { claim_type: String },

    /// Some claim of this type has one of these values
    OneOf {
        claim_type: String,
        allowed: Vec<String>,
    },

    /// The scope is granted, either as its own `scope` claim or inside a
    /// space-separated `scope` value
    Scope { scope: String },
}

impl ClaimRequirement {
    fn check(&self, principal: &Principal) -> Result<(), AuthzError> {
        match self {
            ClaimRequirement::Present { claim_type } => {
                if principal.find_first(claim_type).is_some() {
                    Ok(())
                } else {
                    Err(AuthzError::MissingClaim(claim_type.clone()))
                }
            }
            ClaimRequirement::OneOf {
                claim_type,
                allowed,
            } => {
                let mut values = principal.find_all(claim_type).peekable();
                if values.peek().is_none() {
                    return Err(AuthzError::MissingClaim(claim_type.clone()));
                }
                if values.any(|c| allowed.iter().any(|a| *a == c.value)) {
                    Ok(())
                } else {
                    Err(AuthzError::ClaimValueNotAllowed {
                        claim_type: claim_type.clone(),
                    })
                }
            }
            ClaimRequirement::Scope { scope } => {
                if has_scope(principal, scope) {
                    Ok(())
                } else {
                    Err(AuthzError::MissingScope(scope.clone()))
                }
            }
        }
    }
}

/// Whether `scope` is granted to the principal
pub fn has_scope(principal: &Principal, scope: &str) -> bool {
    principal
        .find_all("scope")
        .flat_map(|c| c.value.split_whitespace())
        .any(|granted| granted == scope)
}

/// Named set of requirements
///
/// A policy with no requirements admits any authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationPolicy {
    pub name: String,
    pub requirements: Vec<ClaimRequirement>,
}

impl AuthorizationPolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirements: Vec::new(),
        }
    }

    pub fn require_claim(mut self, claim_type: impl Into<String>) -> Self {
        self.requirements.push(ClaimRequirement::Present {
            claim_type: claim_type.into(),
        });
        self
    }

    pub fn require_claim_value<I, S>(mut self, claim_type: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements.push(ClaimRequirement::OneOf {
            claim_type: claim_type.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn require_scope(mut self, scope: impl Into<String>) -> Self {
        self.requirements.push(ClaimRequirement::Scope {
            scope: scope.into(),
        });
        self
    }

    /// Checks every requirement in order, stopping at the first failure
    pub fn evaluate(&self, principal: &Principal) -> Result<(), AuthzError> {
        self.requirements
            .iter()
            .try_for_each(|requirement| requirement.check(principal))
    }
}
