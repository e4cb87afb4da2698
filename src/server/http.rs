//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; one task per connection.

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::header::{AUTHORIZATION, ORIGIN};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::SessionIssuer;
use crate::config::Args;
use crate::db::FarmStore;
use crate::routes::{self, apply_common_headers, error_response, parse_query, ApiRequest, BoxBody};
use crate::services::{Services, SubscriptionCheck};
use crate::types::{FarmError, Result};
use hyper_util::rt::TokioIo;

/// Which backends the process ended up with
#[derive(Debug, Clone, Copy)]
pub struct Backends {
    pub store: &'static str,
    pub subscriptions: &'static str,
}

/// Shared application state
pub struct AppState {
    pub listen: SocketAddr,
    pub dev_mode: bool,
    pub cors_origins: Vec<String>,
    pub services: Services,
    pub backends: Backends,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        args: &Args,
        store: Arc<dyn FarmStore>,
        subscriptions: Arc<dyn SubscriptionCheck>,
        backends: Backends,
    ) -> Result<Self> {
        let config = args.auth_config()?;
        let issuer = SessionIssuer::new(config.jwt_secret.clone(), config.token_ttl)?;

        Ok(Self {
            listen: args.listen,
            dev_mode: args.dev_mode,
            cors_origins: args.cors_origin_list(),
            services: Services::new(store, subscriptions, issuer, config),
            backends,
            started_at: Instant::now(),
        })
    }
}

pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.listen).await?;

    info!("Crazy Farm listening on {}", state.listen);
    info!(
        "Backends: store={}, subscriptions={}",
        state.backends.store, state.backends.subscriptions
    );
    if state.dev_mode {
        warn!("Development mode enabled - do not use in production");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let request_id = Uuid::new_v4().to_string();
    let origin = req
        .headers()
        .get(ORIGIN)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    info!(
        request_id = %request_id,
        "[{}] {} {}",
        addr,
        req.method(),
        req.uri().path()
    );

    let mut response = match read_request(req).await {
        Ok(api_request) => routes::dispatch(&state, &api_request).await,
        Err(e) => error_response(&e),
    };

    apply_common_headers(
        &mut response,
        origin.as_deref(),
        &state.cors_origins,
        &request_id,
    );
    Ok(response)
}

async fn read_request(req: Request<Incoming>) -> Result<ApiRequest> {
    let (parts, body) = req.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| FarmError::WrongDataBody(format!("Failed to read request body: {}", e)))?
        .to_bytes();

    Ok(ApiRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parse_query(parts.uri.query()),
        authorization: parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        body,
    })
}
