use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

use super::error::{CryptError, CryptResult};
use crate::progress::UserId;

/// Claims of tokens minted by the platform (or the CLI) for its users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserClaims {
    pub fn new(user: UserId, role: Option<String>, lifetime: Duration) -> Self {
        Self {
            sub: user.to_string(),
            exp: (Utc::now() + lifetime).timestamp(),
            role,
        }
    }

    pub fn user_id(&self) -> CryptResult<UserId> {
        self.sub
            .parse::<UserId>()
            .map_err(|_| CryptError::InvalidSubject(self.sub.clone()))
    }
}

pub fn generate_token<K: AsRef<[u8]>>(
    claims: UserClaims,
    key: K,
) -> jsonwebtoken::errors::Result<String> {
    let header = Header::default();
    let key = EncodingKey::from_secret(key.as_ref());

    let token = jsonwebtoken::encode(&header, &claims, &key)?;
    Ok(token)
}

pub fn process_token<K: AsRef<[u8]>>(
    token: &str,
    key: K,
) -> jsonwebtoken::errors::Result<TokenData<UserClaims>> {
    let validation = Validation::default();
    let key = DecodingKey::from_secret(key.as_ref());

    let claims = jsonwebtoken::decode::<UserClaims>(token, &key, &validation)?;
    Ok(claims)
}
