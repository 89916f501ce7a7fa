use crate::domain::{BookingSummary, Invoice, PreferencesUpdate, UserPreferences};
use crate::error::BookingError;
use crate::functions::{invoices, messages, parse_body, run_function, webhook, FunctionError};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Error from the read/write API, mapped to its status code
struct ApiError(BookingError);

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!("API request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;
type FunctionResult<T> = Result<Json<T>, FunctionError>;

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "nanny-booking",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn send_invoice_emails(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> FunctionResult<invoices::SendInvoiceEmailsResponse> {
    run_function(invoices::FUNCTION_NAME, async {
        invoices::send_invoice_emails(&state, parse_body(&body)?).await
    })
    .await
}

async fn send_client_message(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> FunctionResult<messages::ClientMessageResponse> {
    run_function(messages::FUNCTION_NAME, async {
        messages::send_client_message(&state, parse_body(&body)?).await
    })
    .await
}

async fn email_webhook(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> FunctionResult<webhook::WebhookAck> {
    run_function(webhook::FUNCTION_NAME, async {
        webhook::handle_email_webhook(&state, parse_body(&body)?).await
    })
    .await
}

async fn client_bookings(
    Extension(state): Extension<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> ApiResult<Vec<BookingSummary>> {
    Ok(Json(state.queries.bookings_for_client(&client_id).await?))
}

async fn nanny_bookings(
    Extension(state): Extension<Arc<AppState>>,
    Path(nanny_id): Path<String>,
) -> ApiResult<Vec<BookingSummary>> {
    Ok(Json(state.queries.bookings_for_nanny(&nanny_id).await?))
}

async fn client_invoices(
    Extension(state): Extension<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> ApiResult<Vec<Invoice>> {
    Ok(Json(state.queries.invoices_for_client(&client_id).await?))
}

async fn get_preferences(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<UserPreferences> {
    Ok(Json(state.queries.preferences(&user_id).await?))
}

async fn put_preferences(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Bytes,
) -> ApiResult<UserPreferences> {
    let update: PreferencesUpdate = parse_body(&body)?;
    Ok(Json(state.queries.update_preferences(&user_id, &update).await?))
}

/// Create the HTTP router with the function endpoints and the dashboard API
pub fn create_server(state: Arc<AppState>) -> Router {
    // Same preflight answer for every route, matching the Supabase client headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("apikey"),
            HeaderName::from_static("x-client-info"),
        ]);

    Router::new()
        .route("/health", get(health))
        .route("/functions/v1/send-invoice-emails", post(send_invoice_emails))
        .route("/functions/v1/send-client-message", post(send_client_message))
        .route("/functions/v1/email-webhook", post(email_webhook))
        .route("/api/clients/:id/bookings", get(client_bookings))
        .route("/api/clients/:id/invoices", get(client_invoices))
        .route("/api/nannies/:id/bookings", get(nanny_bookings))
        .route("/api/users/:id/preferences", get(get_preferences).put(put_preferences))
        .layer(Extension(state))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port, stopping on Ctrl-C
pub async fn start_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = create_server(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("HTTP server running on http://localhost:{}", port);
    info!("Functions under http://localhost:{}/functions/v1/", port);

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
