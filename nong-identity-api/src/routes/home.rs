/// Claims endpoint
///
/// # Endpoints
///
/// ```text
/// GET /home
/// GET /home/list
/// ```
///
/// Both require a bearer token whose principal satisfies `SomePolicy`.
///
/// # Response
///
/// ```json
/// [
///   { "type": "sub", "value": "5f0c..." },
///   { "type": "scope", "value": "roles" }
/// ]
/// ```

use axum::Json;
use nong_identity_shared::auth::claims::{Claim, Principal};

/// Returns the caller's claims in principal order
pub async fn list_claims(principal: Principal) -> Json<Vec<Claim>> {
    tracing::debug!(
        subject = principal.subject().unwrap_or_default(),
        claims = principal.claims().len(),
        "Listing caller claims"
    );

    Json(principal.into_claims())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_claims_preserves_order() {
        let principal = Principal::new(vec![Claim::new("b", "2"), Claim::new("a", "1")]);

        let Json(claims) = list_claims(principal).await;

        assert_eq!(claims, vec![Claim::new("b", "2"), Claim::new("a", "1")]);
    }

    #[test]
    fn test_claim_json_shape() {
        let json = serde_json::to_value(Claim::new("a", "1")).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "a", "value": "1" }));
    }
}
