use axum::{routing::get, Router};

use schedule_cell::router::schedule_routes;
use session_cell::router::session_routes;
use shared_database::AppState;
use therapist_cell::router::therapist_routes;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Serenity scheduling API is running!" }))
        .nest("/therapists", therapist_routes(state.clone()))
        .nest("/schedules", schedule_routes(state.clone()))
        .nest("/sessions", session_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use chrono::Duration;
    use shared_utils::test_utils::{ScheduleFixtures, TestConfig, TestUser, TokenFactory};

    struct TestApp {
        app: Router,
        secret: String,
    }

    impl TestApp {
        fn new() -> Self {
            let config = TestConfig::default();
            Self {
                app: create_router(config.to_state()),
                secret: config.jwt_secret,
            }
        }

        async fn send(&self, method: &str, uri: &str, user: Option<&TestUser>, body: Option<Value>) -> Response {
            let mut builder = Request::builder().method(method).uri(uri);

            if let Some(user) = user {
                let token = TokenFactory::new(&self.secret).issue(user, Duration::hours(1));
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }

            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            self.app.clone().oneshot(request).await.unwrap()
        }
    }

    async fn json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn liveness_route_answers() {
        let response = TestApp::new().send("GET", "/", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = TestApp::new();

        let response = app
            .send("POST", "/therapists", None, Some(json!({ "name": "Dr. Anon" })))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.send("GET", "/sessions/mine", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn generate_book_and_cancel_over_http() {
        let app = TestApp::new();
        let admin = TestUser::admin("admin@example.com");
        let client = TestUser::client("client@example.com");
        let monday = ScheduleFixtures::monday().to_string();

        let response = app
            .send("POST", "/therapists", Some(&admin), Some(json!({ "name": "Dr. Serene" })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let therapist_id = json_body(response).await["therapist"]["id"].as_str().unwrap().to_string();

        let response = app
            .send(
                "PUT",
                &format!("/therapists/{}/consulting-hours", therapist_id),
                Some(&admin),
                Some(json!({
                    "consultingHours": [
                        { "dayOfWeek": 1, "startTime": "09:00 AM", "endTime": "01:00 PM", "isEnabled": true }
                    ]
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .send(
                "POST",
                &format!("/therapists/{}/schedules/generate", therapist_id),
                Some(&admin),
                Some(json!({ "startDate": monday, "days": 1 })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .send("GET", &format!("/schedules/{}?date={}", therapist_id, monday), None, None)
            .await;
        let day = json_body(response).await;
        assert_eq!(day["slots"].as_array().unwrap().len(), 3);

        let booking = json!({ "therapistId": therapist_id, "date": monday, "startTime": "10:00 AM" });
        let response = app.send("POST", "/sessions", Some(&client), Some(booking.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let session_id = json_body(response).await["session"]["id"].as_str().unwrap().to_string();

        let response = app.send("POST", "/sessions", Some(&admin), Some(booking)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "slot not available for booking");

        let response = app
            .send(
                "GET",
                &format!("/schedules/{}/range?from={}&to={}&available_only=true", therapist_id, monday, monday),
                None,
                None,
            )
            .await;
        let range = json_body(response).await;
        assert_eq!(range["schedules"][0]["slots"].as_array().unwrap().len(), 2);

        let response = app
            .send("POST", &format!("/sessions/{}/cancel", session_id), Some(&client), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .send("POST", &format!("/sessions/{}/cancel", session_id), Some(&client), None)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send("GET", &format!("/schedules/{}?date={}", therapist_id, monday), None, None)
            .await;
        let day = json_body(response).await;
        assert!(day["slots"].as_array().unwrap().iter().all(|slot| slot["isAvailable"] == true));
    }
}
