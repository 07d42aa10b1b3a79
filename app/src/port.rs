use serde_json::Value;

use crate::core::{Subscription, WriteError};

/// Keyed hierarchical store with push-based subscriptions.
pub trait RemoteStore: Clone + Send + Sync + 'static {
    //the current value is pushed right after subscribing, `null` if the path is empty
    fn subscribe(&self, path: &str) -> Subscription;

    fn write(&self, path: &str, value: Value) -> impl Future<Output = Result<(), WriteError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub display_name: Option<String>,
}

/// Email/password accounts of the operator.
pub trait IdentityProvider: Send + Sync + 'static {
    fn current_user(&self) -> Option<User>;

    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = anyhow::Result<User>> + Send;

    fn sign_up(&self, email: &str, password: &str) -> impl Future<Output = anyhow::Result<User>> + Send;

    fn sign_out(&self);
}
