use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context;
use infrastructure::HttpClientConfig;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::json;

use crate::port::{IdentityProvider, User};

/// Email/password accounts through the Identity Toolkit REST API.
#[derive(Clone)]
pub struct FirebaseAuth {
    client: ClientWithMiddleware,
    identity_url: String,
    api_key: String,
    account: Arc<RwLock<Option<Account>>>,
}

struct Account {
    user: User,
    id_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    id_token: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Deserialize)]
struct ErrorDetails {
    message: String,
}

impl FirebaseAuth {
    pub fn new(identity_url: &str, api_key: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: HttpClientConfig::default().new_tracing_client()?,
            identity_url: identity_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            account: Arc::new(RwLock::new(None)),
        })
    }

    pub fn id_token(&self) -> Option<String> {
        self.account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|account| account.id_token.clone())
    }

    #[tracing::instrument(skip(self, password))]
    async fn authenticate(&self, operation: &str, email: &str, password: &str) -> anyhow::Result<User> {
        let url = format!("{}/accounts:{}?key={}", self.identity_url, operation, self.api_key);

        let response = self
            .client
            .post(url)
            .json(&json!({"email": email, "password": password, "returnSecureToken": true}))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response
                .json::<ErrorResponse>()
                .await
                .with_context(|| format!("Error reading {} error response ({})", operation, status))?;
            anyhow::bail!("{} for {} failed: {}", operation, email, error.error.message);
        }

        let body = response
            .json::<AuthResponse>()
            .await
            .with_context(|| format!("Error reading {} response", operation))?;

        let user = User {
            email: body.email,
            display_name: body.display_name.filter(|name| !name.is_empty()),
        };

        tracing::info!("Signed in as {}", user.email);

        *self.account.write().unwrap_or_else(PoisonError::into_inner) = Some(Account {
            user: user.clone(),
            id_token: body.id_token,
        });

        Ok(user)
    }
}

impl IdentityProvider for FirebaseAuth {
    fn current_user(&self) -> Option<User> {
        self.account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|account| account.user.clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<User> {
        self.authenticate("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> anyhow::Result<User> {
        self.authenticate("signUp", email, password).await
    }

    fn sign_out(&self) {
        if let Some(account) = self.account.write().unwrap_or_else(PoisonError::into_inner).take() {
            tracing::info!("Signed out {}", account.user.email);
        }
    }
}
