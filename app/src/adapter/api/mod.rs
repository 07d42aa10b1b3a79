use std::{sync::Arc, time::Duration};

use actix_web::{
    HttpResponse, ResponseError,
    http::StatusCode,
    web::{self, Json},
};
use derive_more::derive::{Display, Error};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    actuator::{ActuatorStatus, PowerState},
    core::WriteError,
    notification::Notification,
    port::{IdentityProvider, RemoteStore},
    session::SessionClient,
    telemetry::SensorReading,
    threshold::{ThresholdConfig, ThresholdInput, ValidationError},
};

type ApiResponse = Result<HttpResponse, ApiError>;

const FIRST_THRESHOLDS_WAIT: Duration = Duration::from_secs(2);

pub fn routes<S: RemoteStore, I: IdentityProvider>(session: SessionClient<S>, identity: Arc<I>) -> actix_web::Scope {
    web::scope("/api")
        .route("/dashboard", web::get().to(dashboard::<S>))
        .route("/notifications", web::get().to(notifications::<S>))
        .service(
            web::resource("/thresholds")
                .route(web::get().to(get_thresholds::<S>))
                .route(web::put().to(save_thresholds::<S>)),
        )
        .route("/irrigation/start", web::post().to(start_irrigation::<S>))
        .route("/irrigation/stop", web::post().to(stop_irrigation::<S>))
        .route("/buzzer/toggle", web::post().to(toggle_buzzer::<S>))
        .route("/buzzer", web::put().to(set_buzzer::<S>))
        .route("/profile", web::get().to(profile::<I>))
        .route("/profile/sign-in", web::post().to(sign_in::<I>))
        .route("/profile/sign-up", web::post().to(sign_up::<I>))
        .route("/profile/sign-out", web::post().to(sign_out::<S, I>))
        .app_data(web::Data::new(session))
        .app_data(web::Data::from(identity))
}

#[derive(Debug, Display, Error)]
enum ApiError {
    #[display("Invalid threshold: {_0}")]
    Validation(ValidationError),

    #[display("Saving to the greenhouse failed: {_0}")]
    Write(WriteError),

    #[display("Not signed in")]
    NotSignedIn,

    #[display("{_0}")]
    Authentication(#[error(not(source))] String),

    #[display("Session ended")]
    SessionEnded,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Write(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotSignedIn | ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::SessionEnded => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        tracing::warn!("ApiError: {:?}", self);
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[derive(Serialize)]
struct DashboardDto {
    reading: Option<SensorReading>,
    status: ActuatorStatus,
    irrigating: bool,
}

#[derive(Serialize)]
struct NotificationDto {
    id: String,
    message: String,
    time: String,
}

#[derive(Deserialize, Serialize)]
struct BuzzerCommand {
    state: PowerState,
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

impl From<&Notification> for NotificationDto {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id.to_string(),
            message: notification.message.clone(),
            time: notification.time(),
        }
    }
}

fn active<S: RemoteStore>(session: &SessionClient<S>) -> Result<(), ApiError> {
    if session.is_ended() {
        return Err(ApiError::SessionEnded);
    }
    Ok(())
}

async fn dashboard<S: RemoteStore>(session: web::Data<SessionClient<S>>) -> HttpResponse {
    HttpResponse::Ok().json(DashboardDto {
        reading: session.reading(),
        status: session.status(),
        irrigating: session.is_irrigating(),
    })
}

async fn notifications<S: RemoteStore>(session: web::Data<SessionClient<S>>) -> HttpResponse {
    let notifications = session.notifications().await;
    HttpResponse::Ok().json(notifications.iter().map(NotificationDto::from).collect::<Vec<_>>())
}

//waits briefly for the first remote config, defaults are shown if none arrives
async fn get_thresholds<S: RemoteStore>(session: web::Data<SessionClient<S>>) -> HttpResponse {
    let config = match tokio::time::timeout(FIRST_THRESHOLDS_WAIT, session.load_thresholds()).await {
        Ok(Ok(config)) => config,
        Ok(Err(e)) => {
            tracing::debug!("No threshold config loaded: {:?}", e);
            ThresholdConfig::default()
        }
        Err(_) => {
            tracing::debug!("No threshold config received yet, showing defaults");
            ThresholdConfig::default()
        }
    };

    HttpResponse::Ok().json(ThresholdInput::from(&config))
}

async fn save_thresholds<S: RemoteStore>(
    session: web::Data<SessionClient<S>>,
    input: Json<ThresholdInput>,
) -> ApiResponse {
    active(&session)?;

    let config = input.parse().map_err(ApiError::Validation)?;
    session.save_thresholds(&config).await.map_err(ApiError::Write)?;

    Ok(HttpResponse::Ok().json(config))
}

async fn start_irrigation<S: RemoteStore>(session: web::Data<SessionClient<S>>) -> ApiResponse {
    active(&session)?;
    session.set_pump(PowerState::On).await.map_err(ApiError::Write)?;

    Ok(HttpResponse::Ok().json(json!({ "irrigating": session.is_irrigating() })))
}

async fn stop_irrigation<S: RemoteStore>(session: web::Data<SessionClient<S>>) -> ApiResponse {
    active(&session)?;
    session.set_pump(PowerState::Off).await.map_err(ApiError::Write)?;

    Ok(HttpResponse::Ok().json(json!({ "irrigating": session.is_irrigating() })))
}

async fn toggle_buzzer<S: RemoteStore>(session: web::Data<SessionClient<S>>) -> ApiResponse {
    active(&session)?;
    let state = session.toggle_buzzer().await.map_err(ApiError::Write)?;

    Ok(HttpResponse::Ok().json(BuzzerCommand { state }))
}

async fn set_buzzer<S: RemoteStore>(
    session: web::Data<SessionClient<S>>,
    command: Json<BuzzerCommand>,
) -> ApiResponse {
    active(&session)?;
    session.set_buzzer(command.state).await.map_err(ApiError::Write)?;

    Ok(HttpResponse::Ok().json(command.into_inner()))
}

async fn profile<I: IdentityProvider>(identity: web::Data<I>) -> ApiResponse {
    let user = identity.current_user().ok_or(ApiError::NotSignedIn)?;
    Ok(HttpResponse::Ok().json(user))
}

async fn sign_in<I: IdentityProvider>(identity: web::Data<I>, credentials: Json<Credentials>) -> ApiResponse {
    let user = identity
        .sign_in(&credentials.email, &credentials.password)
        .await
        .map_err(|e| ApiError::Authentication(e.to_string()))?;

    Ok(HttpResponse::Ok().json(user))
}

async fn sign_up<I: IdentityProvider>(identity: web::Data<I>, credentials: Json<Credentials>) -> ApiResponse {
    let user = identity
        .sign_up(&credentials.email, &credentials.password)
        .await
        .map_err(|e| ApiError::Authentication(e.to_string()))?;

    Ok(HttpResponse::Created().json(user))
}

async fn sign_out<S: RemoteStore, I: IdentityProvider>(
    session: web::Data<SessionClient<S>>,
    identity: web::Data<I>,
) -> HttpResponse {
    identity.sign_out();
    session.end();

    HttpResponse::NoContent().finish()
}
