mod auth;
mod store;
mod stream;

pub use auth::FirebaseAuth;
pub use store::FirebaseStore;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct FirebaseSettings {
    pub database_url: String,
    pub api_key: String,
    #[serde(default = "default_identity_url")]
    pub identity_url: String,
    pub email: Option<String>,
    pub password: Option<String>,
}

fn default_identity_url() -> String {
    "https://identitytoolkit.googleapis.com/v1".to_owned()
}

impl FirebaseSettings {
    pub fn new_auth(&self) -> anyhow::Result<FirebaseAuth> {
        FirebaseAuth::new(&self.identity_url, &self.api_key)
    }

    pub fn new_store(&self, auth: Option<FirebaseAuth>) -> anyhow::Result<FirebaseStore> {
        FirebaseStore::new(&self.database_url, auth)
    }
}
