use crate::config::JwtConfig;
use crate::error::{Error, UserErrors};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Identity of the authenticated caller, placed in request extensions by [`require_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

/// Verifies bearer tokens issued by the identity provider.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);

        Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.key, &self.validation).map(|data| data.claims)
    }
}

pub async fn require_user(
    State(verifier): State<Arc<JwtVerifier>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Error> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(UserErrors::INVALID_JWT_TOKEN)?;

    let claims = verifier.verify(token.trim()).map_err(|e| {
        debug!("rejected bearer token: {}", e);
        UserErrors::INVALID_JWT_TOKEN
    })?;

    req.extensions_mut().insert(CurrentUser(claims.sub));
    Ok(next.run(req).await)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    pub(crate) fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-with-enough-length-for-hs256".to_string(),
            issuer: "SurveyBasketApp".to_string(),
            audience: "SurveyBasketApp users".to_string(),
        }
    }

    pub(crate) fn issue_token(config: &JwtConfig, user_id: &str, ttl: Duration) -> String {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + ttl).timestamp() as usize,
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .expect("token encodes")
    }

    #[test]
    fn verifies_tokens_from_the_configured_issuer() {
        let config = jwt_config();
        let token = issue_token(&config, "u1", Duration::minutes(30));

        let claims = JwtVerifier::new(&config).verify(&token).expect("token verifies");
        assert_eq!(claims.sub, "u1");
    }

    #[test]
    fn rejects_expired_and_foreign_tokens() {
        let config = jwt_config();
        let verifier = JwtVerifier::new(&config);

        let expired = issue_token(&config, "u1", Duration::hours(-2));
        assert!(verifier.verify(&expired).is_err());

        let foreign = JwtConfig {
            audience: "someone else".to_string(),
            ..jwt_config()
        };
        let token = issue_token(&foreign, "u1", Duration::minutes(30));
        assert!(verifier.verify(&token).is_err());
    }
}
