use std::sync::Arc;

use anyhow::Context as _;
use port::IdentityProvider;
use session::GreenhouseSession;
use settings::Settings;

mod actuator;
mod adapter;
mod core;
mod notification;
mod observability;
pub mod port;
mod session;
mod settings;
mod telemetry;
mod threshold;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() -> anyhow::Result<()> {
    let settings = Settings::new().context("Error reading configuration")?;

    settings
        .monitoring
        .init()
        .map_err(|e| anyhow::anyhow!("Error initializing monitoring: {}", e))?;

    let auth = settings.firebase.new_auth()?;
    match (&settings.firebase.email, &settings.firebase.password) {
        (Some(email), Some(password)) => {
            auth.sign_in(email, password).await.context("Error signing in")?;
        }
        _ => tracing::warn!("No credentials configured, sign in through the API or access the database unauthenticated"),
    }

    let store = settings.firebase.new_store(Some(auth.clone()))?;
    let session = GreenhouseSession::start(store, &settings.session_config());
    let client = session.client();

    let http_server_exec = {
        let client = client.clone();
        let identity = Arc::new(auth);
        let http_server = settings.http_server.clone();

        async move {
            http_server
                .run_server(move || vec![adapter::api::routes(client.clone(), identity.clone())])
                .await
        }
    };

    tracing::info!("Starting main loop");

    tokio::select!(
        _ = session.run() => {},
        result = http_server_exec => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            client.end();
        },
    );

    Ok(())
}
