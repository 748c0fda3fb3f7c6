use axum::response::IntoResponse;

/// Root endpoint; answers with the service name so load balancers and
/// humans poking the port get something meaningful.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
