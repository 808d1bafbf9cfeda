//! Rebuild trigger. Only enqueues; the worker pool does the rebuilding.

use api_types::metrics::{RebuildAccepted, RebuildRequest};
use axum::{Json, extract::State, http::StatusCode};
use engine::{MonthRange, YearMonth};

use crate::{ServerError, server::ServerState};

fn parse_month(raw: &str) -> Result<YearMonth, ServerError> {
    raw.parse::<YearMonth>().map_err(ServerError::from)
}

/// Queue a rebuild of `month`, or of every month from `from` to `to`.
pub async fn rebuild(
    State(state): State<ServerState>,
    Json(payload): Json<RebuildRequest>,
) -> Result<(StatusCode, Json<RebuildAccepted>), ServerError> {
    let queued = match (payload.month, payload.from, payload.to) {
        (Some(month), None, None) => {
            state.scheduler.rebuild_month(parse_month(&month)?).await?;
            1
        }
        (None, Some(from), Some(to)) => {
            let range = MonthRange::new(parse_month(&from)?, parse_month(&to)?)?;
            state.scheduler.rebuild_range(range).await?
        }
        _ => {
            return Err(ServerError::Generic(
                "provide either 'month' or both 'from' and 'to'".to_string(),
            ));
        }
    };

    Ok((StatusCode::ACCEPTED, Json(RebuildAccepted { queued })))
}
