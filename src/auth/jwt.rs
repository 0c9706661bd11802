use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::{
    config::{JwtConfig, MAX_TTL_MINUTES},
    users::User,
};

/// Signing material plus the issuer/audience/ttl every token is held to.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::from_secs((config.ttl_minutes.clamp(1, MAX_TTL_MINUTES) as u64) * 60),
        }
    }

    pub fn claims_for(&self, user: &User, issued_at: OffsetDateTime) -> Claims {
        let exp = issued_at + TimeDuration::seconds(self.ttl.as_secs() as i64);
        Claims {
            id: user.id,
            role: user.role,
            is_admin: user.is_admin,
            iat: issued_at.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        }
    }

    pub fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        let token = encode(&Header::default(), claims, &self.encoding)?;
        debug!(user_id = %claims.id, role = %claims.role, "jwt signed");
        Ok(token)
    }

    /// Mints a token for `user` valid for the configured ttl.
    pub fn issue(&self, user: &User) -> anyhow::Result<String> {
        self.sign(&self.claims_for(user, OffsetDateTime::now_utc()))
    }

    /// Bad signature, expiry and issuer/audience mismatch all yield `None`.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.id, "jwt verified");
                Some(data.claims)
            }
            Err(e) => {
                debug!(error = %e, "jwt rejected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TOKEN_AUDIENCE, TOKEN_ISSUER};
    use crate::users::{Credentials, Role};
    use uuid::Uuid;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 60 * 24,
        })
    }

    fn user(role: Role, is_admin: bool) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            credentials: Credentials::Password { hash: "h".into() },
            role,
            is_admin,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let keys = make_keys("dev-secret", TOKEN_ISSUER, TOKEN_AUDIENCE);
        let u = user(Role::Hr, true);
        let token = keys.issue(&u).expect("issue");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.id, u.id);
        assert_eq!(claims.role, Role::Hr);
        assert!(claims.is_admin);
        assert_eq!(claims.iss, "backend");
        assert_eq!(claims.aud, "client");
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn payload_uses_wire_field_names() {
        let keys = make_keys("dev-secret", TOKEN_ISSUER, TOKEN_AUDIENCE);
        let claims = keys.claims_for(&user(Role::User, false), OffsetDateTime::now_utc());
        let json = serde_json::to_value(&claims).unwrap();
        for key in ["id", "role", "isAdmin", "iat", "exp", "iss", "aud"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn expired_token_verifies_to_none() {
        let keys = make_keys("dev-secret", TOKEN_ISSUER, TOKEN_AUDIENCE);
        let issued = OffsetDateTime::now_utc() - TimeDuration::days(2);
        let token = keys.sign(&keys.claims_for(&user(Role::Admin, false), issued)).unwrap();
        assert!(keys.verify(&token).is_none());
    }

    #[test]
    fn tampered_token_verifies_to_none() {
        let keys = make_keys("dev-secret", TOKEN_ISSUER, TOKEN_AUDIENCE);
        let token = keys.issue(&user(Role::User, false)).unwrap();

        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let forged = make_keys("dev-secret", TOKEN_ISSUER, TOKEN_AUDIENCE)
            .issue(&user(Role::Admin, true))
            .unwrap();
        parts[1] = forged.split('.').nth(1).unwrap().to_string();
        assert!(keys.verify(&parts.join(".")).is_none());

        assert!(keys.verify("not-a-jwt").is_none());
        assert!(keys.verify("").is_none());
    }

    #[test]
    fn wrong_secret_issuer_or_audience_verifies_to_none() {
        let good = make_keys("same-secret", TOKEN_ISSUER, TOKEN_AUDIENCE);
        let token = good.issue(&user(Role::User, false)).unwrap();

        assert!(make_keys("other-secret", TOKEN_ISSUER, TOKEN_AUDIENCE).verify(&token).is_none());
        assert!(make_keys("same-secret", "someone-else", TOKEN_AUDIENCE).verify(&token).is_none());
        assert!(make_keys("same-secret", TOKEN_ISSUER, "mobile").verify(&token).is_none());
    }
}
