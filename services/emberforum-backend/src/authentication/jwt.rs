use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn build_token(id: Uuid, secret: &Secret<String>) -> String {
    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::minutes(60)).timestamp() as usize;
    let claims = TokenClaims {
        sub: id.to_string(),
        exp,
        iat,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .expect("signing a jwt with an HS256 key cannot fail")
}

/// Returns the user id carried by a valid, unexpired token.
pub fn validate_token(token: &str, secret: &Secret<String>) -> Option<Uuid> {
    let data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    Uuid::parse_str(&data.claims.sub).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    #[test]
    fn a_built_token_validates_against_the_same_secret() {
        let id = Uuid::new_v4();
        let secret = Secret::new("secret".to_string());

        let token = build_token(id, &secret);

        assert_that(&validate_token(&token, &secret)).is_equal_to(Some(id));
    }

    #[test]
    fn a_token_does_not_validate_against_another_secret() {
        let id = Uuid::new_v4();
        let secret = Secret::new("secret".to_string());
        let other = Secret::new("other".to_string());

        let token = build_token(id, &secret);

        assert_that(&validate_token(&token, &other)).is_none();
    }

    #[test]
    fn garbage_does_not_validate() {
        let secret = Secret::new("secret".to_string());
        assert_that(&validate_token("garbage", &secret)).is_none();
    }
}
