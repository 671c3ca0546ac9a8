use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use airdesk::api::auth::{create_session, create_user};
use airdesk::api::create_router;
use airdesk::config::Config;
use airdesk::db::{self, Flight, FlightForm, Passenger, PassengerForm, Role};
use airdesk::engine::{flights, passengers};
use airdesk::notifications::MemoryNotifier;
use airdesk::{AppState, DbPool};

struct TestApp {
    router: Router,
    db: DbPool,
    mail: Arc<MemoryNotifier>,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_notifier(MemoryNotifier::new()).await
    }

    async fn with_notifier(notifier: MemoryNotifier) -> Self {
        let db = db::init_in_memory().await.unwrap();
        let mail = Arc::new(notifier);
        let state = Arc::new(AppState::new(Config::default(), db.clone(), mail.clone()));
        Self {
            router: create_router(state),
            db,
            mail,
        }
    }

    async fn token(&self, email: &str, role: Role) -> String {
        let user = create_user(&self.db, email, "password123", email, role)
            .await
            .unwrap();
        create_session(&self.db, &user, 7).await.unwrap()
    }

    async fn flight(&self, number: &str, offset: Duration, seats: i64) -> Flight {
        let departure = Utc::now() + offset;
        let form = FlightForm {
            id: None,
            flight_number: number.to_string(),
            origin: "ACC".to_string(),
            destination: "LHR".to_string(),
            departure_time: db::timestamp(departure),
            arrival_time: db::timestamp(departure + Duration::hours(6)),
            aircraft_type: "B787".to_string(),
            total_seats: seats,
        };
        flights::create_flight(&self.db, &form).await.unwrap()
    }

    async fn passenger(&self, name: &str, email: &str) -> Passenger {
        let form = PassengerForm {
            id: None,
            full_name: name.to_string(),
            passport_number: "G0000001".to_string(),
            contact_email: email.to_string(),
            phone_number: String::new(),
        };
        passengers::create_passenger(&self.db, &form).await.unwrap()
    }

    /// Insert a booking directly, bypassing departure checks
    async fn seat(&self, flight_id: i64, passenger_id: i64, seat: &str) {
        sqlx::query(
            r#"
            INSERT INTO bookings (flight_id, passenger_id, seat_number, booking_date, status)
            VALUES (?, ?, ?, ?, 'Confirmed')
            "#,
        )
        .bind(flight_id)
        .bind(passenger_id)
        .bind(seat)
        .bind(db::timestamp(Utc::now() - Duration::days(30)))
        .execute(&self.db)
        .await
        .unwrap();
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, token: &str, form: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.send(request).await
    }
}

async fn json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn health_check_is_public() {
    let app = TestApp::new().await;
    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn bookings_require_authentication() {
    let app = TestApp::new().await;
    let response = app.get("/bookings", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json(response).await;
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn admin_sees_all_bookings_and_customers_only_their_own() {
    let app = TestApp::new().await;
    let admin = app.token("root@example.com", Role::Admin).await;
    let ada = app.token("ada@example.com", Role::Customer).await;

    let flight = app.flight("AW1", Duration::days(3), 10).await;
    let p_ada = app.passenger("Ada", "ada@example.com").await;
    let p_bob = app.passenger("Bob", "bob@example.com").await;
    app.seat(flight.id, p_ada.id, "1A").await;
    app.seat(flight.id, p_bob.id, "1B").await;

    let all = json(app.get("/bookings", Some(&admin)).await).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let mine = json(app.get("/bookings", Some(&ada)).await).await;
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["passenger_email"], "ada@example.com");
}

#[tokio::test]
async fn taken_seats_reports_capacity() {
    let app = TestApp::new().await;
    let token = app.token("ada@example.com", Role::Customer).await;
    let legacy = app.flight("AW2", Duration::days(1), 0).await;
    let wide = app.flight("AW3", Duration::days(1), 150).await;

    let body = json(
        app.get(&format!("/bookings/taken-seats?flightId={}", legacy.id), Some(&token))
            .await,
    )
    .await;
    assert_eq!(body["capacity"], 20);

    let body = json(
        app.get(&format!("/bookings/taken-seats?flightId={}", wide.id), Some(&token))
            .await,
    )
    .await;
    assert_eq!(body["capacity"], 150);

    let body = json(app.get("/bookings/taken-seats?flightId=999", Some(&token)).await).await;
    assert_eq!(body["capacity"], 20);
    assert_eq!(body["taken"].as_array().unwrap().len(), 0);

    let response = app.get("/flights/999/seats", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn customer_booking_is_confirmed_and_emailed() {
    let app = TestApp::new().await;
    let token = app.token("ada@example.com", Role::Customer).await;
    let flight = app.flight("AW4", Duration::days(2), 10).await;
    app.passenger("Ada", "ada@example.com").await;

    let response = app
        .post(
            "/bookings/create",
            &token,
            &format!(
                "flight_id={}&seat_number=12c&status=Cancelled&booking_date=1999-01-01",
                flight.id
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/bookings");

    let mine = json(app.get("/bookings", Some(&token)).await).await;
    assert_eq!(mine[0]["status"], "Confirmed");
    assert_eq!(mine[0]["seat_number"], "12C");
    assert!(mine[0]["booking_date"].as_str().unwrap().starts_with("20"));
    assert_ne!(mine[0]["booking_date"], "1999-01-01");

    let mut sent = app.mail.sent();
    for _ in 0..100 {
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        sent = app.mail.sent();
    }
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@example.com");
    assert_eq!(sent[0].subject, "Booking Confirmation - Flight AW4");
}

#[tokio::test]
async fn notifier_failure_does_not_block_booking() {
    let app = TestApp::with_notifier(MemoryNotifier::failing()).await;
    let token = app.token("ada@example.com", Role::Customer).await;
    let flight = app.flight("AW5", Duration::days(2), 10).await;
    app.passenger("Ada", "ada@example.com").await;

    let response = app
        .post(
            "/bookings/create",
            &token,
            &format!("flight_id={}&seat_number=3A", flight.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let mine = json(app.get("/bookings", Some(&token)).await).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn customer_without_profile_is_sent_to_registration() {
    let app = TestApp::new().await;
    let token = app.token("new@example.com", Role::Customer).await;
    let flight = app.flight("AW6", Duration::days(2), 10).await;

    let response = app.get("/bookings/create", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/passengers/register");

    let response = app
        .post(
            "/bookings/create",
            &token,
            &format!("flight_id={}&seat_number=3A", flight.id),
        )
        .await;
    assert_eq!(location(&response), "/passengers/register");

    let response = app
        .post(
            "/passengers/register",
            &token,
            "full_name=New+Customer&passport_number=N123&contact_email=other%40example.com",
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/bookings/create");

    let profile = passengers::find_by_email(&app.db, "new@example.com")
        .await
        .unwrap();
    assert_eq!(profile.unwrap().full_name, "New Customer");
}

#[tokio::test]
async fn taken_seat_redisplays_form() {
    let app = TestApp::new().await;
    let admin = app.token("root@example.com", Role::Admin).await;
    let flight = app.flight("AW7", Duration::days(2), 10).await;
    let ada = app.passenger("Ada", "ada@example.com").await;
    let bob = app.passenger("Bob", "bob@example.com").await;
    app.seat(flight.id, ada.id, "4D").await;

    let response = app
        .post(
            "/bookings/create",
            &admin,
            &format!("flight_id={}&passenger_id={}&seat_number=4D", flight.id, bob.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json(response).await;
    assert!(body["error"]["details"]["seat_number"].is_array());
    assert_eq!(body["form"]["seat_number"], "4D");
    assert_eq!(body["options"]["flights"][0]["selected"], true);
    assert_eq!(body["options"]["passenger"]["mode"], "list");
}

#[tokio::test]
async fn blank_flight_redisplays_form() {
    let app = TestApp::new().await;
    let admin = app.token("root@example.com", Role::Admin).await;
    app.flight("AW9", Duration::days(2), 10).await;
    let bob = app.passenger("Bob", "bob@example.com").await;

    let response = app
        .post(
            "/bookings/create",
            &admin,
            &format!("flight_id=&passenger_id={}&seat_number=1A", bob.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["details"]["flight_id"][0], "Flight is required");
    assert!(body["form"]["flight_id"].is_null());
    assert_eq!(body["form"]["passenger_id"], bob.id);
    assert_eq!(body["form"]["seat_number"], "1A");
    assert_eq!(body["options"]["flights"].as_array().unwrap().len(), 1);
    assert_eq!(body["options"]["passenger"]["passengers"][0]["selected"], true);
    assert!(app.mail.sent().is_empty());
}

#[tokio::test]
async fn malformed_form_body_uses_error_envelope() {
    let app = TestApp::new().await;
    let admin = app.token("root@example.com", Role::Admin).await;

    let response = app
        .post("/bookings/1/edit", &admin, "id=abc&status=Confirmed&version=1")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn deleting_missing_booking_redirects_like_success() {
    let app = TestApp::new().await;
    let admin = app.token("root@example.com", Role::Admin).await;
    let flight = app.flight("AW8", Duration::days(2), 10).await;
    let ada = app.passenger("Ada", "ada@example.com").await;
    app.seat(flight.id, ada.id, "9A").await;

    let existing = app.post("/bookings/1/delete", &admin, "").await;
    let missing = app.post("/bookings/4242/delete", &admin, "").await;

    assert_eq!(existing.status(), StatusCode::SEE_OTHER);
    assert_eq!(missing.status(), existing.status());
    assert_eq!(location(&missing), location(&existing));
}

#[tokio::test]
async fn customer_cannot_delete_someone_elses_booking() {
    let app = TestApp::new().await;
    let ada = app.token("ada@example.com", Role::Customer).await;
    let flight = app.flight("AW9", Duration::days(2), 10).await;
    let bob = app.passenger("Bob", "bob@example.com").await;
    app.seat(flight.id, bob.id, "2B").await;

    let response = app.post("/bookings/1/delete", &ada, "").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get("/bookings/1", Some(&ada)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn edit_with_mismatched_ids_is_not_found() {
    let app = TestApp::new().await;
    let admin = app.token("root@example.com", Role::Admin).await;
    let flight = app.flight("AW10", Duration::days(2), 10).await;
    let ada = app.passenger("Ada", "ada@example.com").await;
    app.seat(flight.id, ada.id, "5C").await;

    let response = app
        .post(
            "/bookings/1/edit",
            &admin,
            &format!(
                "id=2&flight_id={}&passenger_id={}&seat_number=5C&status=CheckedIn&version=1",
                flight.id, ada.id
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let booking = json(app.get("/bookings/1", Some(&admin)).await).await;
    assert_eq!(booking["status"], "Confirmed");
}

#[tokio::test]
async fn stale_edit_is_a_conflict() {
    let app = TestApp::new().await;
    let admin = app.token("root@example.com", Role::Admin).await;
    let flight = app.flight("AW11", Duration::days(2), 10).await;
    let ada = app.passenger("Ada", "ada@example.com").await;
    app.seat(flight.id, ada.id, "6C").await;

    let form = format!(
        "id=1&flight_id={}&passenger_id={}&seat_number=6C&status=CheckedIn&version=1",
        flight.id, ada.id
    );
    let first = app.post("/bookings/1/edit", &admin, &form).await;
    assert_eq!(first.status(), StatusCode::SEE_OTHER);

    let second = app.post("/bookings/1/edit", &admin, &form).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn feedback_for_future_flight_is_refused_with_flash() {
    let app = TestApp::new().await;
    let token = app.token("p2@example.com", Role::Customer).await;
    let f2 = app.flight("F2", Duration::days(1), 10).await;
    let p2 = app.passenger("P2", "p2@example.com").await;
    app.seat(f2.id, p2.id, "1A").await;

    let response = app
        .post(
            "/feedbacks/create",
            &token,
            &format!(
                "flight_id={}&customer_name=P2&comments=Looking+forward&rating=5",
                f2.id
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("airdesk_flash="));

    let response = app.get("/feedbacks/create", Some(&token)).await;
    assert_eq!(location(&response), "/");

    let all = json(app.get("/feedbacks", None).await).await;
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn feedback_for_completed_flight_succeeds() {
    let app = TestApp::new().await;
    let token = app.token("p1@example.com", Role::Customer).await;
    let f1 = app.flight("F1", Duration::days(-1), 10).await;
    let p1 = app.passenger("P1", "p1@example.com").await;
    app.seat(f1.id, p1.id, "1A").await;

    let response = app
        .post(
            "/feedbacks/create",
            &token,
            &format!(
                "flight_id={}&customer_name=P1&comments=Great+flight&rating=4",
                f1.id
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let all = json(app.get("/feedbacks", None).await).await;
    assert_eq!(all[0]["rating"], 4);
    assert_eq!(all[0]["comments"], "Great flight");
    assert_eq!(all[0]["flight_number"], "F1");
}

#[tokio::test]
async fn mistyped_rating_redisplays_feedback_form() {
    let app = TestApp::new().await;
    let token = app.token("p2@example.com", Role::Customer).await;
    let flight = app.flight("F2", Duration::days(-1), 10).await;
    let p2 = app.passenger("P2", "p2@example.com").await;
    app.seat(flight.id, p2.id, "2A").await;

    let response = app
        .post(
            "/feedbacks/create",
            &token,
            &format!(
                "flight_id={}&customer_name=P2&comments=Decent&rating=four",
                flight.id
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json(response).await;
    assert_eq!(body["error"]["details"]["rating"][0], "Rating is required");
    assert_eq!(body["form"]["comments"], "Decent");
    assert_eq!(body["options"]["flights"][0]["value"], flight.id);
    assert_eq!(body["options"]["flights"][0]["selected"], true);
}

#[tokio::test]
async fn customers_cannot_manage_flights() {
    let app = TestApp::new().await;
    let token = app.token("ada@example.com", Role::Customer).await;

    let response = app
        .post(
            "/flights/create",
            &token,
            concat!(
                "flight_number=AW99&origin=ACC&destination=LOS",
                "&departure_time=2030-01-01T10:00:00Z&arrival_time=2030-01-01T11:00:00Z",
            ),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get("/admin-dashboard", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_landing_redirects_to_dashboard() {
    let app = TestApp::new().await;
    let admin = app.token("root@example.com", Role::Admin).await;

    let response = app.get("/", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin-dashboard");

    let counts = json(app.get("/admin-dashboard", Some(&admin)).await).await;
    assert_eq!(counts["flights"], 0);

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_and_login_issue_sessions() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("email=Grace%40Example.com&password=hopper1906&name=Grace"))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json(response).await;
    assert_eq!(body["user"]["email"], "grace@example.com");
    assert_eq!(body["user"]["role"], "customer");

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("email=grace%40example.com&password=wrong-password"))
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("email=grace%40example.com&password=hopper1906"))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = json(response).await["token"].as_str().unwrap().to_string();

    let response = app.get("/bookings", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
