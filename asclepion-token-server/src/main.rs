//! Companion backend that exchanges a signed client assertion for a
//! short-lived bearer token.
//!
//! The private signing key never leaves this process; the live client only
//! ever sees the resulting access token.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::{Value, json};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

const CLIENT_ID_ENV: &str = "ASCLEPION_CLIENT_ID";
const PRIVATE_KEY_PATH_ENV: &str = "ASCLEPION_PRIVATE_KEY_PATH";
const TOKEN_ENDPOINT_ENV: &str = "ASCLEPION_TOKEN_ENDPOINT";
const LISTEN_ADDR_ENV: &str = "ASCLEPION_LISTEN_ADDR";

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 300;

#[derive(Debug, Error)]
enum ServerError {
    #[error("environment variable '{name}' is not set")]
    MissingEnv { name: &'static str },

    #[error("failed to read private key from {path}: {source}")]
    PrivateKeyRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("private key is not a valid RSA PEM: {0}")]
    PrivateKeyParse(#[from] jsonwebtoken::errors::Error),

    #[error("invalid listen address '{addr}': {source}")]
    ListenAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(std::io::Error),
}

/// JWT claim set for the OAuth client assertion.
#[derive(Debug, Serialize)]
struct AssertionClaims {
    iss: String,
    sub: String,
    aud: String,
    jti: String,
    iat: i64,
    exp: i64,
}

impl AssertionClaims {
    fn new(client_id: &str, token_endpoint: &str, issued_at: i64) -> Self {
        Self {
            iss: client_id.to_string(),
            sub: client_id.to_string(),
            aud: token_endpoint.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        }
    }
}

struct AppState {
    client_id: String,
    token_endpoint: String,
    signing_key: EncodingKey,
    http: reqwest::Client,
}

impl AppState {
    fn sign_assertion(&self) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = AssertionClaims::new(&self.client_id, &self.token_endpoint, Utc::now().timestamp());
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let _ = dotenvy::dotenv();
    info!("Starting asclepion token server");

    let client_id = require_env(CLIENT_ID_ENV)?;
    let token_endpoint = require_env(TOKEN_ENDPOINT_ENV)?;
    let key_path = require_env(PRIVATE_KEY_PATH_ENV)?;
    let pem = fs::read(&key_path).map_err(|source| ServerError::PrivateKeyRead {
        path: key_path.clone(),
        source,
    })?;
    let signing_key = EncodingKey::from_rsa_pem(&pem).map_err(ServerError::PrivateKeyParse)?;

    let addr_text = env::var(LISTEN_ADDR_ENV).unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
    let addr: SocketAddr = addr_text
        .parse()
        .map_err(|source| ServerError::ListenAddr {
            addr: addr_text.clone(),
            source,
        })?;

    let state = Arc::new(AppState {
        client_id,
        token_endpoint,
        signing_key,
        http: reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|err| {
                warn!(%err, "falling back to default HTTP client");
                reqwest::Client::new()
            }),
    });

    let app = Router::new()
        .route("/token", get(token_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "Token server ready to accept connections");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(ServerError::Serve)?;
    Ok(())
}

/// Signs a fresh client assertion and trades it for an access token.
async fn token_handler(State(state): State<Arc<AppState>>) -> Response {
    let assertion = match state.sign_assertion() {
        Ok(assertion) => assertion,
        Err(err) => {
            warn!(%err, "failed to sign client assertion");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to sign client assertion",
            );
        }
    };

    let exchange = state
        .http
        .post(&state.token_endpoint)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.as_str()),
        ])
        .send()
        .await;

    let upstream = match exchange {
        Ok(response) => response,
        Err(err) => {
            warn!(%err, "token exchange request failed");
            return error_response(StatusCode::BAD_GATEWAY, "token exchange request failed");
        }
    };

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let body: Value = match upstream.json().await {
        Ok(body) => body,
        Err(err) => {
            warn!(%err, "token endpoint returned a non-JSON body");
            return error_response(
                StatusCode::BAD_GATEWAY,
                "token endpoint returned a non-JSON body",
            );
        }
    };

    if !status.is_success() {
        warn!(status = status.as_u16(), "token endpoint rejected the assertion");
    }
    (status, Json(body)).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn require_env(name: &'static str) -> Result<String, ServerError> {
    env::var(name).map_err(|_| ServerError::MissingEnv { name })
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
