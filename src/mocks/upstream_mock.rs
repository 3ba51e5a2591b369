//! 로컬 axum 서버로 띄우는 가짜 프로바이더 API (테스트 전용)

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use axum::extract::{Json, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;

/// 업스트림이 받은 요청 (POST 바디 또는 GET 쿼리)
pub type Recorded = Arc<Mutex<Vec<Value>>>;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service())
            .await
            .unwrap();
    });
    format!("http://{}", addr)
}

/// POST 엔드포인트 하나를 가진 서버
pub async fn spawn_post(path: &str, status: u16, response: Value) -> (String, Recorded) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let status = StatusCode::from_u16(status).unwrap();
    let app = Router::new()
        .route(
            path,
            post(move |State(state): State<Recorded>, Json(body): Json<Value>| {
                let response = response.clone();
                async move {
                    state.lock().unwrap().push(body);
                    (status, Json(response))
                }
            }),
        )
        .with_state(recorded.clone());
    (serve(app).await, recorded)
}

/// GET 엔드포인트 하나를 가진 서버; 쿼리는 {"key": "value"} 객체로 기록
pub async fn spawn_get(path: &str, status: u16, response: Value) -> (String, Recorded) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let status = StatusCode::from_u16(status).unwrap();
    let app = Router::new()
        .route(
            path,
            get(move |State(state): State<Recorded>, RawQuery(query): RawQuery| {
                let response = response.clone();
                async move {
                    let params: serde_json::Map<String, Value> = query
                        .unwrap_or_default()
                        .split('&')
                        .filter_map(|pair| pair.split_once('='))
                        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                        .collect();
                    state.lock().unwrap().push(Value::Object(params));
                    (status, Json(response))
                }
            }),
        )
        .with_state(recorded.clone());
    (serve(app).await, recorded)
}
