use std::time::Duration;

use futures::StreamExt as _;
use infrastructure::{HttpClientConfig, meter};
use reqwest::header::ACCEPT;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;

use super::{
    FirebaseAuth,
    stream::{EventStreamDecoder, FirebaseEvent},
};
use crate::{
    core::{
        Subscription, WriteError,
        resilience::ExponentialBackoff,
        subscription::{self, SnapshotPublisher},
        tree::{merge_at, segments, set_at},
    },
    port::RemoteStore,
};

/// Realtime Database over its REST API. Writes are `PUT`s, subscriptions are
/// server-sent event streams that are reconnected until the subscription is dropped.
#[derive(Clone)]
pub struct FirebaseStore {
    client: ClientWithMiddleware,
    database_url: String,
    auth: Option<FirebaseAuth>,
}

impl FirebaseStore {
    pub fn new(database_url: &str, auth: Option<FirebaseAuth>) -> anyhow::Result<Self> {
        let client = HttpClientConfig::default()
            .with_connect_timeout(Duration::from_secs(10))
            .new_tracing_client()?;

        Ok(Self {
            client,
            database_url: database_url.trim_end_matches('/').to_owned(),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        let mut url = format!("{}/{}.json", self.database_url, segments(path).join("/"));

        if let Some(token) = self.auth.as_ref().and_then(FirebaseAuth::id_token) {
            url.push_str("?auth=");
            url.push_str(&token);
        }

        url
    }

    async fn stream_path(self, publisher: SnapshotPublisher) {
        let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60));

        loop {
            let result = tokio::select! {
                _ = publisher.closed() => break,
                result = self.listen(&publisher, &mut backoff) => result,
            };

            if publisher.is_closed() {
                break;
            }

            match result {
                Ok(()) => tracing::info!("Event stream for {} closed by server", publisher.path()),
                Err(e) => {
                    tracing::warn!("Event stream for {} failed: {:?}", publisher.path(), e);
                    meter::increment("stream_failed", &[("path", publisher.path())]);
                }
            }

            let delay = backoff.next_delay();
            backoff.bump();
            tracing::debug!(
                "Reconnecting to {} in {:?} (attempt {})",
                publisher.path(),
                delay,
                backoff.attempts()
            );

            tokio::select! {
                _ = publisher.closed() => break,
                _ = tokio::time::sleep(delay) => {},
            }
        }

        tracing::debug!("Stopped streaming {}", publisher.path());
    }

    //returns Ok when the server ends the stream or the subscriber went away
    async fn listen(&self, publisher: &SnapshotPublisher, backoff: &mut ExponentialBackoff) -> anyhow::Result<()> {
        let response = self
            .client
            .get(self.url(publisher.path()))
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;

        tracing::info!("Streaming {}", publisher.path());
        backoff.reset();

        //paths of stream events are relative to the subscribed path
        let mut tree = Value::Null;
        let mut decoder = EventStreamDecoder::default();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            for raw in decoder.push(&chunk?) {
                match FirebaseEvent::parse(&raw)? {
                    FirebaseEvent::Put { path, data } => set_at(&mut tree, &path, data),
                    FirebaseEvent::Patch { path, data } => merge_at(&mut tree, &path, data),
                    FirebaseEvent::KeepAlive => continue,
                    FirebaseEvent::Ignored(event) => {
                        tracing::debug!("Ignoring {} event on {}", event, publisher.path());
                        continue;
                    }
                    FirebaseEvent::Cancel(reason) => anyhow::bail!("Stream cancelled by server: {}", reason),
                    FirebaseEvent::AuthRevoked => anyhow::bail!("Stream credentials revoked"),
                }

                if !publisher.publish(tree.clone()).await {
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

impl RemoteStore for FirebaseStore {
    fn subscribe(&self, path: &str) -> Subscription {
        let (publisher, subscription) = subscription::open(path, 16);
        tokio::spawn(self.clone().stream_path(publisher));
        subscription
    }

    #[tracing::instrument(skip(self, value))]
    async fn write(&self, path: &str, value: Value) -> Result<(), WriteError> {
        let response = self
            .client
            .put(self.url(path))
            .json(&value)
            .send()
            .await
            .map_err(|e| WriteError::new(path, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WriteError::new(path, format!("{} {}", status, body.trim())));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::port::IdentityProvider;

    #[tokio::test]
    async fn write_puts_value_at_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/status/pump.json")
            .match_body(Matcher::Json(json!("ON")))
            .with_body(r#""ON""#)
            .create_async()
            .await;

        let store = FirebaseStore::new(&server.url(), None).unwrap();
        store.write("status/pump", json!("ON")).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_write_is_a_write_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/control.json")
            .with_status(401)
            .with_body(r#"{"error": "Permission denied"}"#)
            .create_async()
            .await;

        let store = FirebaseStore::new(&server.url(), None).unwrap();
        let result = store.write("control", json!({"temperature": 25})).await;

        let error = result.unwrap_err();
        assert_eq!(error.path, "control");
        assert!(error.reason.starts_with("401"));
    }

    #[tokio::test]
    async fn stream_events_are_applied_to_the_snapshot() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/status.json")
            .match_header("accept", "text/event-stream")
            .with_header("content-type", "text/event-stream")
            .with_body(concat!(
                "event: put\ndata: {\"path\":\"/\",\"data\":{\"pump\":\"OFF\",\"buzzer\":\"OFF\"}}\n\n",
                "event: keep-alive\ndata: null\n\n",
                "event: put\ndata: {\"path\":\"/pump\",\"data\":\"ON\"}\n\n",
                "event: patch\ndata: {\"path\":\"/\",\"data\":{\"buzzer\":\"ON\"}}\n\n",
            ))
            .create_async()
            .await;

        let store = FirebaseStore::new(&server.url(), None).unwrap();
        let mut subscription = store.subscribe("status");

        assert_eq!(subscription.recv().await, Some(json!({"pump": "OFF", "buzzer": "OFF"})));
        assert_eq!(subscription.recv().await, Some(json!({"pump": "ON", "buzzer": "OFF"})));
        assert_eq!(subscription.recv().await, Some(json!({"pump": "ON", "buzzer": "ON"})));
    }

    #[tokio::test]
    async fn requests_carry_the_id_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts:signInWithPassword")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"idToken":"token-1","email":"grower@example.com"}"#)
            .create_async()
            .await;
        let write = server
            .mock("PUT", "/status/buzzer.json")
            .match_query(Matcher::UrlEncoded("auth".into(), "token-1".into()))
            .create_async()
            .await;

        let auth = FirebaseAuth::new(&server.url(), "api-key").unwrap();
        auth.sign_in("grower@example.com", "secret").await.unwrap();
        let store = FirebaseStore::new(&server.url(), Some(auth)).unwrap();

        store.write("status/buzzer", json!("OFF")).await.unwrap();

        write.assert_async().await;
    }
}
