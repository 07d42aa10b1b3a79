mod bus;
mod http;
mod monitoring;

pub use bus::{EventBus, EventEmitter, EventListener};
pub use monitoring::{LogFormat, MonitoringConfig};

pub use http::client::HttpClientConfig;
pub use http::server::HttpServerConfig;

pub mod meter {
    pub use super::monitoring::meter::{increment, set};
}
