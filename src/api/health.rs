use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub semantic_provider: Option<String>,
    pub content_records: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        semantic_provider: state.orchestrator.semantic_provider().map(str::to_string),
        content_records: state.content_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::search::keyword::KeywordSearchEngine;
    use crate::search::orchestrator::SearchOrchestrator;
    use crate::search::semantic::SemanticSearchEngine;

    #[tokio::test]
    async fn test_health_reports_unconfigured_provider() {
        let orchestrator = SearchOrchestrator::new(
            KeywordSearchEngine::new(Vec::new()),
            SemanticSearchEngine::unconfigured(),
        );
        let state = AppState::from_parts(Config::default(), orchestrator, 3);

        let Json(resp) = health(State(state)).await;
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["semanticProvider"].is_null());
        assert_eq!(json["contentRecords"], 3);
    }
}
