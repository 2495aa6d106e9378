use std::sync::Arc;

use axum::{
    Router,
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
use chat_bot::SessionSupervisor;
use engine::Engine;

use crate::{budgets, reports, sessions, transactions};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Engine,
    pub chat: Arc<SessionSupervisor>,
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = auth_header.ok_or(StatusCode::UNAUTHORIZED)?;
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user = state
        .engine
        .verify_credentials(auth_header.username(), auth_header.password())
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub(crate) fn router(state: ServerState) -> Router {
    Router::new()
        .route("/sessions", post(sessions::init).get(sessions::list))
        .route("/sessions/{id}", get(sessions::status).delete(sessions::delete))
        .route("/sessions/{id}/qr", get(sessions::pairing_code))
        .route("/sessions/{id}/settings", axum::routing::put(sessions::update_settings))
        .route("/sessions/{id}/phrases", post(sessions::add_phrases))
        .route("/sessions/{id}/logs", get(sessions::error_logs))
        .route("/sessions/{id}/disconnect", post(sessions::disconnect))
        .route("/sessions/{id}/expire", post(sessions::expire))
        .route(
            "/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route("/transactions/summary", get(transactions::summary))
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::delete),
        )
        .route("/budgets", post(budgets::create).get(budgets::list))
        .route("/budgets/summary", get(budgets::summary))
        .route("/budgets/alerts", get(budgets::alerts))
        .route(
            "/budgets/{id}",
            get(budgets::get).patch(budgets::update).delete(budgets::delete),
        )
        .route("/budgets/{id}/reconcile", post(budgets::reconcile))
        .route("/reports/{period}", get(reports::get))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, chat: Arc<SessionSupervisor>) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, chat, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    chat: Arc<SessionSupervisor>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine, chat };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    chat: Arc<SessionSupervisor>,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, chat, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, header};
    use base64::Engine as _;
    use chat_bot::PatternClassifier;
    use chat_bot::testing::MockTransport;
    use engine::UserRole;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use tower::ServiceExt;

    async fn test_router() -> (Router, Engine) {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::new(db);
        engine
            .create_user("alice", "secret", UserRole::User, 1)
            .await
            .unwrap();

        let chat = Arc::new(SessionSupervisor::new(
            engine.clone(),
            MockTransport::new(),
            Arc::new(PatternClassifier::new()),
        ));
        let state = ServerState {
            engine: engine.clone(),
            chat,
        };
        (router(state), engine)
    }

    fn authed(method: &str, uri: &str, body: Option<serde_json::Value>) -> HttpRequest<Body> {
        let credentials = base64::prelude::BASE64_STANDARD.encode("alice:secret");
        let builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Basic {credentials}"))
            .header(header::CONTENT_TYPE, "application/json");
        match body {
            Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rejects_missing_credentials() {
        let (router, _) = test_router().await;
        let request = HttpRequest::builder()
            .method("GET")
            .uri("/sessions")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_bad_credentials() {
        let (router, _) = test_router().await;
        let credentials = base64::prelude::BASE64_STANDARD.encode("alice:wrong");
        let request = HttpRequest::builder()
            .method("GET")
            .uri("/sessions")
            .header(header::AUTHORIZATION, format!("Basic {credentials}"))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn transaction_create_and_list() {
        let (router, _) = test_router().await;

        let response = router
            .clone()
            .oneshot(authed(
                "POST",
                "/transactions",
                Some(serde_json::json!({
                    "kind": "expense",
                    "amount_minor": 50_000,
                    "category": "food",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["transaction"]["category"], "food");
        assert_eq!(body["alerts"], serde_json::json!([]));

        let response = router
            .oneshot(authed("GET", "/transactions?kind=expense", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["transactions"][0]["amount_minor"], 50_000);
    }

    #[tokio::test]
    async fn budget_total_mismatch_is_unprocessable() {
        let (router, _) = test_router().await;

        let response = router
            .oneshot(authed(
                "POST",
                "/budgets",
                Some(serde_json::json!({
                    "name": "Bulanan",
                    "period": "monthly",
                    "start_date": "2026-08-01T00:00:00Z",
                    "end_date": "2026-08-31T23:59:59Z",
                    "categories": [{ "name": "food", "limit_minor": 1000 }],
                    "total_budget_minor": 9999,
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn session_init_and_quota() {
        let (router, _) = test_router().await;

        let response = router
            .clone()
            .oneshot(authed(
                "POST",
                "/sessions",
                Some(serde_json::json!({ "handle": "6281234567890" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "pending");

        // max_handles is 1 for the test user.
        let response = router
            .oneshot(authed(
                "POST",
                "/sessions",
                Some(serde_json::json!({ "handle": "6289999999999" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_kind_is_unprocessable() {
        let (router, _) = test_router().await;
        let response = router
            .oneshot(authed(
                "POST",
                "/transactions",
                Some(serde_json::json!({
                    "kind": "loan",
                    "amount_minor": 10,
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
