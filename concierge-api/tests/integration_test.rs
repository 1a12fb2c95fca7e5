use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use concierge_api::{app, AppState, AuthConfig};
use concierge_core::memory::{MemorySessionStore, MemoryStore, RecordingNotifier};
use concierge_core::{Role, StaffUser};
use concierge_desk::DeskRules;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const PASSWORD: &str = "correct-horse";

struct Harness {
    state: AppState,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new() -> Self {
        let store = MemoryStore::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(
            store.repositories(),
            Arc::new(MemorySessionStore::default()),
            notifier.clone(),
            DeskRules::default(),
            AuthConfig {
                secret: "test-secret".to_string(),
                expiration: 3600,
                login_attempt_limit: 3,
                login_window_seconds: 900,
            },
            600,
        );
        Self { state, store, notifier }
    }

    fn router(&self) -> Router {
        app(self.state.clone())
    }

    async fn add_staff(&self, username: &str, role: Role) -> StaffUser {
        let hash = bcrypt::hash(PASSWORD, 4).unwrap();
        let user = StaffUser::create(username, username, &format!("{}@hotel.example", username), role, hash, Utc::now()).unwrap();
        self.store.repositories().staff.create_staff(&user).await.unwrap();
        user
    }

    async fn login(&self, username: &str) -> String {
        let (status, body) = self
            .send(Method::POST, "/v1/auth/login", None, Some(json!({ "username": username, "password": PASSWORD })))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    async fn staff_token(&self, username: &str, role: Role) -> String {
        self.add_staff(username, role).await;
        self.login(username).await
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn create_room(&self, token: &str, number: &str) -> Value {
        let (status, room) = self
            .send(
                Method::POST,
                "/v1/rooms",
                Some(token),
                Some(json!({ "number": number, "room_type": "DOUBLE", "floor": 1, "nightly_rate": 10000 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", room);
        room
    }

    async fn create_booking(&self, token: &str, room_id: &str, tentative: bool) -> Value {
        let today = Utc::now().date_naive();
        let (status, booking) = self
            .send(
                Method::POST,
                "/v1/bookings",
                Some(token),
                Some(json!({
                    "guest_name": "Grace Hopper",
                    "guest_email": "grace@example.com",
                    "room_id": room_id,
                    "arrival_date": today,
                    "departure_date": today + Duration::days(2),
                    "tentative": tentative,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", booking);
        booking
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let h = Harness::new();
    let (status, body) = h.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let h = Harness::new();
    let (status, body) = h.send(Method::GET, "/v1/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = h.send(Method::GET, "/v1/bookings", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_me_and_logout() {
    let h = Harness::new();
    let token = h.staff_token("reception", Role::FrontDesk).await;

    let (status, me) = h.send(Method::GET, "/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "reception");
    assert_eq!(me["role"], "FRONT_DESK");
    assert!(me.get("password_hash").is_none());
    assert!(me["last_login_at"].is_string());

    let (status, _) = h.send(Method::POST, "/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = h.send(Method::GET, "/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_attempts_are_limited() {
    let h = Harness::new();
    h.add_staff("nightaudit", Role::Accounts).await;
    let wrong = json!({ "username": "nightaudit", "password": "wrong-password" });

    for _ in 0..3 {
        let (status, _) = h.send(Method::POST, "/v1/auth/login", None, Some(wrong.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = h
        .send(Method::POST, "/v1/auth/login", None, Some(json!({ "username": "nightaudit", "password": PASSWORD })))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("Too many"));
}

#[tokio::test]
async fn test_change_password() {
    let h = Harness::new();
    let token = h.staff_token("manager", Role::Manager).await;

    let (status, _) = h
        .send(
            Method::POST,
            "/v1/auth/password",
            Some(&token),
            Some(json!({ "current_password": PASSWORD, "new_password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h
        .send(
            Method::POST,
            "/v1/auth/password",
            Some(&token),
            Some(json!({ "current_password": PASSWORD, "new_password": "a-much-longer-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = h
        .send(Method::POST, "/v1/auth/login", None, Some(json!({ "username": "manager", "password": PASSWORD })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_roles_are_enforced() {
    let h = Harness::new();
    let housekeeper = h.staff_token("hk.anna", Role::Housekeeping).await;
    let desk = h.staff_token("desk.bob", Role::FrontDesk).await;

    let (status, _) = h.send(Method::GET, "/v1/bookings", Some(&housekeeper), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h.send(Method::GET, "/v1/staff", Some(&desk), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h.send(Method::GET, "/v1/audit", Some(&desk), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h.send(Method::GET, "/v1/rooms", Some(&housekeeper), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_staff_admin_and_deactivation() {
    let h = Harness::new();
    let admin = h.staff_token("admin", Role::Admin).await;

    let (status, created) = h
        .send(
            Method::POST,
            "/v1/staff",
            Some(&admin),
            Some(json!({
                "username": "Temp.Clerk",
                "display_name": "Temp Clerk",
                "email": "temp@hotel.example",
                "role": "FRONT_DESK",
                "password": PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", created);
    assert_eq!(created["username"], "temp.clerk");

    let (status, _) = h
        .send(
            Method::POST,
            "/v1/staff",
            Some(&admin),
            Some(json!({
                "username": "temp.clerk",
                "display_name": "Again",
                "email": "again@hotel.example",
                "role": "FRONT_DESK",
                "password": PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let clerk = h.login("temp.clerk").await;
    let id = created["id"].as_str().unwrap();
    let (status, body) = h
        .send(Method::POST, &format!("/v1/staff/{}/deactivate", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);

    let (status, _) = h.send(Method::GET, "/v1/auth/me", Some(&clerk), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h
        .send(Method::POST, "/v1/auth/login", None, Some(json!({ "username": "temp.clerk", "password": PASSWORD })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_username_answers_like_wrong_password() {
    let h = Harness::new();
    h.add_staff("frontdesk.amy", Role::FrontDesk).await;

    let (status, unknown) = h
        .send(Method::POST, "/v1/auth/login", None, Some(json!({ "username": "nobody", "password": PASSWORD })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, wrong) = h
        .send(Method::POST, "/v1/auth/login", None, Some(json!({ "username": "frontdesk.amy", "password": "not-it" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown["error"], wrong["error"]);
}

#[tokio::test]
async fn test_stay_from_booking_to_checkout() {
    let h = Harness::new();
    let token = h.staff_token("duty.manager", Role::Manager).await;

    let room = h.create_room(&token, "204").await;
    let room_id = room["id"].as_str().unwrap();
    let booking = h.create_booking(&token, room_id, false).await;
    assert_eq!(booking["status"], "CONFIRMED");
    assert_eq!(booking["total_amount"], 20000);
    let booking_id = booking["id"].as_str().unwrap();

    let (status, checked_in) = h
        .send(Method::POST, &format!("/v1/frontdesk/bookings/{}/check-in", booking_id), Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", checked_in);
    assert_eq!(checked_in["status"], "CHECKED_IN");

    let checkout_uri = format!("/v1/frontdesk/bookings/{}/checkout", booking_id);
    let (status, body) = h.send(Method::POST, &checkout_uri, Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["error"].as_str().unwrap().contains("20000"));

    let (status, payment) = h
        .send(
            Method::POST,
            &format!("/v1/bookings/{}/payments", booking_id),
            Some(&token),
            Some(json!({ "amount": 20000, "method": "CARD", "reference": "auth-7781" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", payment);
    assert_eq!(payment["status"], "COMPLETED");

    let (status, ledger) = h
        .send(Method::GET, &format!("/v1/bookings/{}/ledger", booking_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ledger["balance"], 0);

    let (status, outcome) = h.send(Method::POST, &checkout_uri, Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK, "{}", outcome);
    assert_eq!(outcome["booking"]["status"], "CHECKED_OUT");
    assert_eq!(outcome["email_sent"], true);
    assert_eq!(outcome["forced"], false);
    assert_eq!(outcome["invoice"]["total"], 20000);

    let (_, room) = h.send(Method::GET, &format!("/v1/rooms/{}", room_id), Some(&token), None).await;
    assert_eq!(room["status"], "DIRTY");

    let (status, tasks) = h.send(Method::GET, "/v1/housekeeping/tasks?status=PENDING", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["room_id"], room_id);

    let (_, invoices) = h.send(Method::GET, "/v1/invoices", Some(&token), None).await;
    assert_eq!(invoices.as_array().unwrap().len(), 1);

    let (status, audit) = h.send(Method::GET, "/v1/audit?limit=50", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = audit.as_array().unwrap().iter().filter_map(|e| e["action"].as_str()).collect();
    assert!(actions.contains(&"booking.checkout"));
    assert!(actions.contains(&"payment.record"));
}

#[tokio::test]
async fn test_tentative_booking_confirm_and_cancel() {
    let h = Harness::new();
    let token = h.staff_token("reservations", Role::FrontDesk).await;
    let room = h.create_room(&h.staff_token("boss", Role::Manager).await, "310").await;
    let room_id = room["id"].as_str().unwrap();

    let held = h.create_booking(&token, room_id, true).await;
    assert_eq!(held["status"], "TENTATIVE");
    assert!(held["tentative_expires_at"].is_string());
    assert!(h.notifier.emails().is_empty());

    let (status, expiring) = h
        .send(Method::GET, "/v1/bookings/tentative/expiring?within_hours=72", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(expiring.as_array().unwrap().len(), 1);

    let id = held["id"].as_str().unwrap();
    let (status, confirmed) = h
        .send(Method::POST, &format!("/v1/bookings/{}/confirm", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "CONFIRMED");
    assert_eq!(h.notifier.emails().len(), 1);

    let (status, _) = h
        .send(Method::POST, &format!("/v1/bookings/{}/cancel", id), Some(&token), Some(json!({ "reason": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, cancelled) = h
        .send(
            Method::POST,
            &format!("/v1/bookings/{}/cancel", id),
            Some(&token),
            Some(json!({ "reason": "guest changed plans" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");

    let (status, _) = h
        .send(Method::POST, &format!("/v1/bookings/{}/confirm", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, report) = h.send(Method::POST, "/v1/bookings/tentative/sweep", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["cancelled"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_room_status_changes_reach_stream_subscribers() {
    let h = Harness::new();
    let token = h.staff_token("ops", Role::Manager).await;
    let room = h.create_room(&token, "501").await;
    let mut rx = h.state.sse_tx.subscribe();

    let (status, updated) = h
        .send(
            Method::POST,
            &format!("/v1/rooms/{}/status", room["id"].as_str().unwrap()),
            Some(&token),
            Some(json!({ "status": "OUT_OF_SERVICE" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "OUT_OF_SERVICE");

    let change = rx.try_recv().unwrap();
    assert_eq!(change.room_number, "501");
    assert_eq!(change.from, "AVAILABLE");
    assert_eq!(change.to, "OUT_OF_SERVICE");
}

#[tokio::test]
async fn test_invoice_resend_reports_delivery_failure() {
    let h = Harness::new();
    let token = h.staff_token("accounts", Role::Manager).await;
    let room = h.create_room(&token, "118").await;
    let booking = h.create_booking(&token, room["id"].as_str().unwrap(), false).await;
    let booking_id = booking["id"].as_str().unwrap();

    let issue_uri = format!("/v1/bookings/{}/invoice", booking_id);
    let (status, invoice) = h.send(Method::POST, &issue_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(invoice["number"].as_str().unwrap().starts_with("INV-"));

    let (status, again) = h.send(Method::POST, &issue_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], invoice["id"]);

    let resend_uri = format!("/v1/invoices/{}/resend", invoice["id"].as_str().unwrap());
    h.notifier.set_email_failure(true);
    let (status, _) = h.send(Method::POST, &resend_uri, Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    h.notifier.set_email_failure(false);
    let (status, sent) = h
        .send(Method::POST, &resend_uri, Some(&token), Some(json!({ "email": "accounts@guestcorp.example" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["send_count"], 1);
    assert!(sent["last_sent_at"].is_string());
}

#[tokio::test]
async fn test_housekeepers_only_work_their_own_tasks() {
    let h = Harness::new();
    let manager = h.staff_token("hk.supervisor", Role::Manager).await;
    let rosa = h.add_staff("rosa", Role::Housekeeping).await;
    h.add_staff("ivan", Role::Housekeeping).await;
    let rosa_token = h.login("rosa").await;
    let ivan_token = h.login("ivan").await;

    let room = h.create_room(&manager, "612").await;
    let room_id = room["id"].as_str().unwrap();
    let (status, task) = h
        .send(
            Method::POST,
            "/v1/housekeeping/tasks",
            Some(&manager),
            Some(json!({ "room_id": room_id, "assignee_id": rosa.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", task);
    let task_uri = format!("/v1/housekeeping/tasks/{}", task["id"].as_str().unwrap());

    // A second open task for the same room conflicts
    let (status, _) = h
        .send(Method::POST, "/v1/housekeeping/tasks", Some(&manager), Some(json!({ "room_id": room_id })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = h.send(Method::GET, &task_uri, Some(&ivan_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = h
        .send(Method::POST, &format!("{}/assign", task_uri), Some(&ivan_token), Some(json!({ "assignee_id": rosa.id })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = h.send(Method::POST, &format!("{}/start", task_uri), Some(&ivan_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = h.send(Method::POST, &format!("{}/cancel", task_uri), Some(&ivan_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, visible) = h.send(Method::GET, "/v1/housekeeping/tasks", Some(&ivan_token), None).await;
    assert!(visible.as_array().unwrap().is_empty());
    let (_, visible) = h.send(Method::GET, "/v1/housekeeping/tasks", Some(&rosa_token), None).await;
    assert_eq!(visible.as_array().unwrap().len(), 1);

    let (status, fetched) = h.send(Method::GET, &task_uri, Some(&rosa_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "PENDING");

    let (status, started) = h.send(Method::POST, &format!("{}/start", task_uri), Some(&rosa_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "IN_PROGRESS");
    let (_, room) = h.send(Method::GET, &format!("/v1/rooms/{}", room_id), Some(&manager), None).await;
    assert_eq!(room["status"], "CLEANING");

    let (status, done) = h.send(Method::POST, &format!("{}/complete", task_uri), Some(&rosa_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "DONE");
    let (_, room) = h.send(Method::GET, &format!("/v1/rooms/{}", room_id), Some(&manager), None).await;
    assert_eq!(room["status"], "AVAILABLE");
}

#[tokio::test]
async fn test_refund_void_and_daily_takings() {
    let h = Harness::new();
    let token = h.staff_token("cashier", Role::Manager).await;
    let room = h.create_room(&token, "720").await;
    let booking = h.create_booking(&token, room["id"].as_str().unwrap(), false).await;
    let payments_uri = format!("/v1/bookings/{}/payments", booking["id"].as_str().unwrap());

    let mut ids = Vec::new();
    let mut taken_on = String::new();
    for (amount, method) in [(11500, "CARD"), (5000, "CASH"), (3000, "VOUCHER")] {
        let (status, payment) = h
            .send(Method::POST, &payments_uri, Some(&token), Some(json!({ "amount": amount, "method": method })))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", payment);
        ids.push(payment["id"].as_str().unwrap().to_string());
        taken_on = payment["created_at"].as_str().unwrap()[..10].to_string();
    }

    let (status, refunded) = h.send(Method::POST, &format!("/v1/payments/{}/refund", ids[0]), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refunded["status"], "REFUNDED");
    let (status, _) = h.send(Method::POST, &format!("/v1/payments/{}/refund", ids[0]), Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, voided) = h.send(Method::POST, &format!("/v1/payments/{}/void", ids[1]), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voided["status"], "VOID");

    let (status, _) = h
        .send(Method::POST, &format!("/v1/payments/{}/void", Uuid::new_v4()), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, ledger) = h
        .send(Method::GET, &format!("/v1/bookings/{}/ledger", booking["id"].as_str().unwrap()), Some(&token), None)
        .await;
    assert_eq!(ledger["paid"], 3000);
    assert_eq!(ledger["refunded"], 11500);
    assert_eq!(ledger["balance"], 17000);

    let (status, report) = h
        .send(Method::GET, &format!("/v1/reports/takings?date={}", taken_on), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["total"], 3000);
    assert_eq!(report["vat_total"], 391);
    let by_method = report["by_method"].as_array().unwrap();
    assert_eq!(by_method.len(), 1);
    assert_eq!(by_method[0]["method"], "VOUCHER");

    // Amounts beyond the payment ceiling are rejected, not overflowed
    let (status, _) = h
        .send(
            Method::POST,
            &payments_uri,
            Some(&token),
            Some(json!({ "amount": 10_000_000_000_000_000_i64, "method": "CARD" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reconcile_corrects_manual_overrides() {
    let h = Harness::new();
    let token = h.staff_token("night.manager", Role::Manager).await;
    let room = h.create_room(&token, "833").await;
    let room_id = room["id"].as_str().unwrap();

    let (status, _) = h
        .send(Method::POST, &format!("/v1/rooms/{}/status", room_id), Some(&token), Some(json!({ "status": "CLEANING" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, changes) = h.send(Method::POST, "/v1/rooms/reconcile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let changes = changes.as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["room_number"], "833");
    assert_eq!(changes[0]["from"], "CLEANING");
    assert_eq!(changes[0]["to"], "AVAILABLE");

    let (_, changes) = h.send(Method::POST, "/v1/rooms/reconcile", Some(&token), None).await;
    assert!(changes.as_array().unwrap().is_empty());

    let desk = h.staff_token("desk.only", Role::FrontDesk).await;
    let (status, _) = h.send(Method::POST, "/v1/rooms/reconcile", Some(&desk), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_extend_hold_and_hour_bounds() {
    let h = Harness::new();
    let token = h.staff_token("holds", Role::Manager).await;
    let room = h.create_room(&token, "940").await;
    let held = h.create_booking(&token, room["id"].as_str().unwrap(), true).await;
    let extend_uri = format!("/v1/bookings/{}/extend", held["id"].as_str().unwrap());

    let (status, extended) = h.send(Method::POST, &extend_uri, Some(&token), Some(json!({ "hours": 24 }))).await;
    assert_eq!(status, StatusCode::OK, "{}", extended);
    assert_ne!(extended["tentative_expires_at"], held["tentative_expires_at"]);

    for hours in [1_000_000_000_000_i64, i64::MAX, 0] {
        let (status, _) = h.send(Method::POST, &extend_uri, Some(&token), Some(json!({ "hours": hours }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "hours={}", hours);
    }

    let (status, _) = h
        .send(Method::GET, "/v1/bookings/tentative/expiring?within_hours=9223372036854775807", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, unchanged) = h.send(Method::GET, &format!("/v1/bookings/{}", held["id"].as_str().unwrap()), Some(&token), None).await;
    assert_eq!(unchanged["tentative_expires_at"], extended["tentative_expires_at"]);
}

#[tokio::test]
async fn test_duplicate_room_number_is_conflict() {
    let h = Harness::new();
    let token = h.staff_token("rooms.admin", Role::Manager).await;
    h.create_room(&token, "1001").await;

    let (status, body) = h
        .send(
            Method::POST,
            "/v1/rooms",
            Some(&token),
            Some(json!({ "number": "1001", "room_type": "SUITE", "floor": 10, "nightly_rate": 30000 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("1001"));

    let (_, rooms) = h.send(Method::GET, "/v1/rooms", Some(&token), None).await;
    assert_eq!(rooms.as_array().unwrap().len(), 1);
}
