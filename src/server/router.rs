use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{health, plant, search};
use crate::state::AppState;

/// Creates the application router with CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.allowed_origins);
    let upload_limit = state.settings.server.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health))
        .route("/textlinks", post(search::text_links))
        .route("/imagelinks", post(search::image_links))
        .route(
            "/identify-plant",
            post(plant::identify_plant).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

/// Listed origins only; methods and headers are mirrored for them.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins = origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, err);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::core::config::{AppPaths, ConfigService, Settings};
    use crate::llm::{CompletionOptions, LlmService};
    use crate::rag::{Chunker, InMemoryVectorStore, PipelineOptions, RagPipeline};
    use crate::testing::{
        KeywordEmbedder, StubFetcher, StubImages, StubLlm, StubPlant, StubPlantOutcome,
        StubSearch,
    };
    use crate::tools::plantnet::PlantIdentification;
    use crate::tools::SearchClient;

    struct Stubs {
        search: StubSearch,
        fetcher: StubFetcher,
        llm: StubLlm,
        images: StubImages,
        plant: Arc<StubPlant>,
    }

    impl Default for Stubs {
        fn default() -> Self {
            Self {
                search: StubSearch::default(),
                fetcher: StubFetcher::default(),
                llm: StubLlm::replying("answer"),
                images: StubImages {
                    count: 8,
                    fail: false,
                },
                plant: Arc::new(StubPlant::new(StubPlantOutcome::NoMatch)),
            }
        }
    }

    fn test_app(dir: &tempfile::TempDir, stubs: Stubs) -> Router {
        let paths = Arc::new(AppPaths::with_dirs(
            dir.path().to_path_buf(),
            dir.path().join("data"),
        ));
        let pipeline = RagPipeline::new(
            SearchClient::new(Arc::new(stubs.search)),
            Arc::new(stubs.fetcher),
            Chunker::default(),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(KeywordEmbedder::default()),
            LlmService::new(Arc::new(stubs.llm), CompletionOptions::default()),
            PipelineOptions::default(),
        );
        let state = Arc::new(AppState {
            config: ConfigService::new(paths.clone()),
            paths,
            settings: Arc::new(Settings::default()),
            pipeline: Arc::new(pipeline),
            images: Arc::new(stubs.images),
            plant: stubs.plant,
        });
        router(state)
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(organ: Option<&str>) -> Request<Body> {
        let boundary = "plantboundary";
        let mut body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"leaf.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n\
             jpeg-bytes\r\n"
        );
        if let Some(organ) = organ {
            body.push_str(&format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"organ\"\r\n\r\n\
                 {organ}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));

        Request::builder()
            .method(Method::POST)
            .uri("/identify-plant")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn snake_plant() -> PlantIdentification {
        PlantIdentification {
            species: "Dracaena trifasciata".to_string(),
            common_names: vec!["Snake plant".to_string()],
            family: "Asparagaceae".to_string(),
            genus: "Dracaena".to_string(),
            confidence: 0.873,
            images: vec![json!({ "o": "https://bs.plantnet.org/o/1.jpg" })],
            organ: String::new(),
        }
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, Stubs::default());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn textlinks_returns_generated_answer() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(
            &dir,
            Stubs {
                search: StubSearch::with_links(&["https://snake.example"]),
                fetcher: StubFetcher::default().with_page(
                    "https://snake.example",
                    "<p>Snake plants grow in West Africa.</p>",
                ),
                llm: StubLlm::replying("# Snake plants\n* West Africa"),
                ..Stubs::default()
            },
        );

        let response = app
            .oneshot(json_request(
                "/textlinks",
                json!({ "message": "where do snake plants grow" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "response": "# Snake plants\n* West Africa" })
        );
    }

    #[tokio::test]
    async fn textlinks_without_results_answers_no_information() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, Stubs::default());

        let response = app
            .oneshot(json_request("/textlinks", json!({ "message": "zzzz" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "response": "No relevant information found." })
        );
    }

    #[tokio::test]
    async fn textlinks_rejects_blank_and_missing_message() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, Stubs::default());

        let response = app
            .clone()
            .oneshot(json_request("/textlinks", json!({ "message": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());

        let response = app
            .oneshot(json_request("/textlinks", json!({ "query": "snake" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn imagelinks_returns_at_most_five_results() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, Stubs::default());

        let response = app
            .oneshot(json_request("/imagelinks", json!({ "message": "snake plant" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let results = body.as_array().unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0]["title"], "snake plant 0");
        assert_eq!(results[0]["image"], "https://img.example.com/0.jpg");
    }

    #[tokio::test]
    async fn imagelinks_provider_failure_is_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(
            &dir,
            Stubs {
                images: StubImages {
                    count: 0,
                    fail: true,
                },
                ..Stubs::default()
            },
        );

        let response = app
            .oneshot(json_request("/imagelinks", json!({ "message": "snake plant" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn identify_plant_returns_best_match() {
        let dir = tempfile::tempdir().unwrap();
        let plant = Arc::new(StubPlant::new(StubPlantOutcome::Match(snake_plant())));
        let app = test_app(
            &dir,
            Stubs {
                plant: plant.clone(),
                ..Stubs::default()
            },
        );

        let response = app.oneshot(multipart_request(Some("flower"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "species": "Dracaena trifasciata",
                "common_names": ["Snake plant"],
                "family": "Asparagaceae",
                "genus": "Dracaena",
                "confidence": 0.873,
                "images": [{ "o": "https://bs.plantnet.org/o/1.jpg" }],
                "organ": "flower"
            })
        );
        assert_eq!(plant.seen(), vec![("jpeg-bytes".len(), "flower".to_string())]);
    }

    #[tokio::test]
    async fn identify_plant_without_match_reports_error_body() {
        let dir = tempfile::tempdir().unwrap();
        let plant = Arc::new(StubPlant::new(StubPlantOutcome::NoMatch));
        let app = test_app(
            &dir,
            Stubs {
                plant: plant.clone(),
                ..Stubs::default()
            },
        );

        let response = app.oneshot(multipart_request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "No plant matches found" })
        );
        assert_eq!(plant.seen()[0].1, "leaf");
    }

    #[tokio::test]
    async fn identify_plant_provider_failure_reports_reason() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(
            &dir,
            Stubs {
                plant: Arc::new(StubPlant::new(StubPlantOutcome::Fail)),
                ..Stubs::default()
            },
        );

        let response = app.oneshot(multipart_request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Failed to identify plant: provider returned status 500" })
        );
    }

    #[tokio::test]
    async fn cors_preflight_mirrors_for_listed_origins() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, Stubs::default());

        let preflight = |origin: &str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/textlinks")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap()
        };

        let response = app
            .clone()
            .oneshot(preflight("http://localhost:3000"))
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");

        let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
