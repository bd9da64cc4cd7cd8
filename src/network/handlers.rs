use super::dto::{DetectRequest, DetectResponse, HealthResponse, ProgressQuery, ProgressResponse};
use super::error::{ApiError, ApiResult};
use super::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};

/// Start analysing `videoUrl` under `jobId`. Returns 202 once the job is registered.
#[tracing::instrument(skip_all)]
pub async fn detect(
    State(state): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DetectResponse>)> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let job_id = request.job_id.trim();
    let video_url = request.video_url.trim();
    if job_id.is_empty() || video_url.is_empty() {
        return Err(ApiError::BadRequest(
            "jobId and videoUrl are required".to_string(),
        ));
    }

    state.coordinator().trigger(job_id, video_url)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DetectResponse {
            job_id: job_id.to_string(),
            accepted: true,
            message: "Analysis started".to_string(),
        }),
    ))
}

#[tracing::instrument(skip(state))]
pub async fn progress(
    State(state): State<AppState>,
    query: Result<Query<ProgressQuery>, QueryRejection>,
) -> ApiResult<Json<ProgressResponse>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let job_id = query
        .job_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("jobId query parameter is required".to_string()))?;

    Ok(Json(state.coordinator().progress(job_id.trim()).into()))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_ready: state.coordinator().is_model_ready(),
    })
}

#[cfg(test)]
mod tests {
    use crate::config::Configuration;
    use crate::coordinator::CoordinatorBuilder;
    use crate::network::{create_router, AppState};
    use crate::pipeline::services::managers::ProgressStore;
    use crate::pipeline::services::pose::PoseEstimator;
    use crate::testing::{
        blank_frames, wait_for_terminal, CollectingSink, ScriptedPoseModel, ScriptedResult,
        SlowFrameSource,
    };
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(store: ProgressStore) -> Router {
        let coordinator = CoordinatorBuilder::new(Configuration::default())
            .frame_source(Arc::new(SlowFrameSource::new(
                blank_frames(3, 10.0),
                Duration::from_millis(100),
            )))
            .estimator(
                PoseEstimator::new(Box::new(ScriptedPoseModel::new(vec![
                    ScriptedResult::Standing;
                    3
                ])))
                .into_shared(),
            )
            .sink(Arc::new(CollectingSink::default()))
            .progress_store(store)
            .build()
            .expect("coordinator");
        create_router(AppState::new(coordinator))
    }

    fn post_detect(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/detect")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn detect_accepts_then_rejects_duplicates() {
        let store = ProgressStore::new(8);
        let app = app(store.clone());

        let response = app
            .clone()
            .oneshot(post_detect(r#"{"jobId":"j1","videoUrl":"clip.mp4"}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json(response).await;
        assert_eq!(body["jobId"], "j1");
        assert_eq!(body["accepted"], true);

        let response = app
            .clone()
            .oneshot(post_detect(r#"{"jobId":"j1","videoUrl":"clip.mp4"}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json(response).await["code"], "CONFLICT");

        let state = wait_for_terminal(&store, "j1").await;
        assert_eq!(state.percent(), 100);
    }

    #[tokio::test]
    async fn detect_rejects_empty_fields() {
        let app = app(ProgressStore::new(8));

        for body in [r#"{"jobId":"","videoUrl":"clip.mp4"}"#, r#"{"jobId":"j2"}"#, "not json"] {
            let response = app.clone().oneshot(post_detect(body)).await.expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(json(response).await["code"], "BAD_REQUEST");
        }
    }

    #[tokio::test]
    async fn progress_reports_stage_and_percent() {
        let store = ProgressStore::new(8);
        let app = app(store.clone());

        let response = app
            .clone()
            .oneshot(get("/progress?jobId=unknown"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["stage"], "not_started");
        assert_eq!(body["percent"], 0);

        app.clone()
            .oneshot(post_detect(r#"{"jobId":"j3","videoUrl":"clip.mp4"}"#))
            .await
            .expect("response");
        wait_for_terminal(&store, "j3").await;

        let body = json(
            app.oneshot(get("/progress?jobId=j3"))
                .await
                .expect("response"),
        )
        .await;
        assert_eq!(body["stage"], "completed");
        assert_eq!(body["percent"], 100);
        assert_eq!(body["totalFrames"], 3);
    }

    #[tokio::test]
    async fn progress_requires_a_job_id() {
        let response = app(ProgressStore::new(8))
            .oneshot(get("/progress"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn malformed_progress_query_is_a_json_error() {
        let response = app(ProgressStore::new(8))
            .oneshot(get("/progress?jobId=a&jobId=b"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[tokio::test]
    async fn health_reports_model_state() {
        let response = app(ProgressStore::new(8))
            .oneshot(get("/health"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["modelReady"], false);
    }
}
