use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::identity::VerifiedIdentity;
use crate::config::GoogleConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Profile fields as reported by the provider; any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalProfile {
    pub id: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl ExternalProfile {
    /// `None` when the provider did not report an id or an email.
    pub fn into_verified(self) -> Option<VerifiedIdentity> {
        let external_id = self.id.filter(|v| !v.is_empty())?;
        let email = self.email.filter(|v| !v.is_empty())?;
        let display_name = self
            .display_name
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "User".into());
        Some(VerifiedIdentity {
            external_id,
            email,
            display_name,
        })
    }
}

/// External OAuth identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent page the browser is sent to.
    fn authorize_url(&self) -> String;

    /// Trades the callback's authorization code for the user's profile.
    async fn exchange(&self, code: &str) -> anyhow::Result<ExternalProfile>;
}

pub struct GoogleProvider {
    http: reqwest::Client,
    config: GoogleConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self) -> String {
        format!(
            "{AUTHORIZE_URL}?response_type=code&client_id={}&redirect_uri={}&scope={}",
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.callback_url),
            urlencoding::encode("profile email"),
        )
    }

    async fn exchange(&self, code: &str) -> anyhow::Result<ExternalProfile> {
        let token: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("google token request")?
            .error_for_status()
            .context("google token response")?
            .json()
            .await
            .context("decode google token response")?;

        let info: UserInfo = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("google userinfo request")?
            .error_for_status()
            .context("google userinfo response")?
            .json()
            .await
            .context("decode google userinfo")?;

        debug!(has_email = info.email.is_some(), "google profile received");
        Ok(ExternalProfile {
            id: info.sub,
            email: info.email,
            display_name: info.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_encodes_parameters() {
        let provider = GoogleProvider::new(GoogleConfig {
            client_id: "client id".into(),
            client_secret: "s".into(),
            callback_url: "http://localhost:3000/api/auth/google/callback".into(),
        });
        let url = provider.authorize_url();
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("scope=profile%20email"));
    }

    #[test]
    fn profile_without_id_or_email_is_rejected() {
        let full = ExternalProfile {
            id: Some("g-1".into()),
            email: Some("jane@x.com".into()),
            display_name: None,
        };
        let verified = full.clone().into_verified().unwrap();
        assert_eq!(verified.display_name, "User");

        assert!(ExternalProfile { id: None, ..full.clone() }.into_verified().is_none());
        assert!(ExternalProfile { email: Some(String::new()), ..full }.into_verified().is_none());
    }
}
