/// Search endpoint
///
/// ```text
/// GET /search?query=alpha
/// ```
///
/// Returns projects then tasks whose name/title or description contains the
/// query, case-insensitively:
///
/// ```json
/// [
///   {"id": "uuid", "type": "project", "title": "Alpha Launch", "description": "..."}
/// ]
/// ```
///
/// A missing or blank query returns `[]`.

use crate::{app::AppState, error::ApiResult, extract::ApiQuery};
use axum::{extract::State, Json};
use serde::Deserialize;
use tasktrack_shared::search::SearchResult;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

pub async fn search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Vec<SearchResult>>> {
    let results = state.search.search(&params.query).await?;
    Ok(Json(results))
}
