use crate::config::MAX_TOP_N;
use crate::error::{AppError, AppResult};
use crate::models::RankingSnapshot;
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub limit: Option<usize>,
}

/// Current top videos straight from the leaderboard
#[get("/api/v1/trending")]
pub async fn get_trending(
    state: web::Data<AppState>,
    query: web::Query<TrendingQuery>,
) -> AppResult<HttpResponse> {
    let limit = query.limit.unwrap_or(state.config.top_n);
    if limit == 0 || limit > MAX_TOP_N {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_TOP_N}"
        )));
    }

    let entries = state.leaderboard.top(limit).await?;
    Ok(HttpResponse::Ok().json(RankingSnapshot::from_entries(entries)))
}
