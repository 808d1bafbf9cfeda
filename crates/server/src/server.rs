use axum::{
    Extension, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::sync::Arc;

use crate::{ServerError, charts, metrics, reports, user};
use engine::{DatabaseQueue, Engine, EngineError, RebuildScheduler, User};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub scheduler: RebuildScheduler<DatabaseQueue>,
}

/// Resolve the Basic-auth user and attach it to the request.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user = match state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await
    {
        Ok(user) => user,
        Err(EngineError::InvalidCredentials) => return Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            tracing::error!("authentication failed: {err}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn require_admin(
    Extension(user): Extension<User>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if let Err(err) = user.ensure_admin() {
        tracing::warn!(user = %user.username, path = %request.uri().path(), "admin route refused");
        return Err(err.into());
    }
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    let authenticated = Router::new()
        .route("/me", get(user::me))
        .route("/charts/revenue", get(charts::revenue))
        .route("/charts/expenses", get(charts::expenses))
        .route("/charts/profit", get(charts::profit));

    let admin = Router::new()
        .route("/charts/budget-vs-fact", get(charts::budget_vs_fact))
        .route(
            "/charts/available-budget-months",
            get(charts::available_budget_months),
        )
        .route("/charts/roi", get(charts::roi))
        .route("/reports/monthly-summary", get(reports::monthly_summary))
        .route(
            "/reports/monthly-summary/export",
            get(reports::monthly_summary_export),
        )
        .route("/reports/budget-plan-fact", get(reports::budget_plan_fact))
        .route(
            "/reports/budget-plan-fact/export",
            get(reports::budget_plan_fact_export),
        )
        .route("/reports/operations/export", get(reports::operations_export))
        .route("/metrics/rebuild", post(metrics::rebuild))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .merge(authenticated)
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    scheduler: RebuildScheduler<DatabaseQueue>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine, scheduler };

    axum::serve(listener, router(state)).await
}
