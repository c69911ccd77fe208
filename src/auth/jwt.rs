use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub tid: Uuid,
    pub email: String,
    pub role: String,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, tenant_id: Uuid, email: String, role: String) -> Self {
        Self {
            sub: user_id,
            tid: tenant_id,
            email,
            role,
            exp: (Utc::now() + Duration::minutes(15)).timestamp(),
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("JWT encode failed: {e}"))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("JWT decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_principal() {
        let claims = Claims::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            "alice@acme.com".to_string(),
            "admin".to_string(),
        );
        let token = encode_token(&claims, "secret").unwrap();
        let decoded = decode_token(&token, "secret").unwrap();
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.tid, claims.tid);
        assert_eq!(decoded.role, "admin");
    }

    #[test]
    fn rejects_wrong_secret() {
        let claims = Claims::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            "alice@acme.com".to_string(),
            "user".to_string(),
        );
        let token = encode_token(&claims, "secret").unwrap();
        assert!(decode_token(&token, "other-secret").is_err());
    }

    #[test]
    fn rejects_garbage_token() {
        assert!(decode_token("not-a-jwt", "secret").is_err());
    }
}
