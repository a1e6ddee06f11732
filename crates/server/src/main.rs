use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use server_api::{
    advance_queue, adjust_serial, appointments_for_cr, book_appointment, call_patient,
    complete_patient, list_appointments, login_with_cr, login_with_phone, logout, lookup_by_cr,
    mark_status, queue_snapshot, retreat_queue, session, upcoming_patients, ApiContext,
    UPCOMING_LIMIT,
};
use shared::{
    domain::{Appointment, AppointmentId, AppointmentStatus, HospitalId, DepartmentId},
    error::{ApiError, ErrorCode},
    protocol::{
        BookingConfirmation, BookingRequest, DepartmentSummary, DoctorSummary, HospitalSummary,
        QueueSnapshot, ServerEvent, Session, SortDirection, SortKey,
    },
};
use storage::{FileSessionStore, Store};
use tokio::sync::broadcast;
use tracing::{error, info};

mod config;

use config::load_settings;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
    events: broadcast::Sender<ServerEvent>,
}

#[derive(Debug, Deserialize)]
struct PhoneLoginRequest {
    phone: String,
}

#[derive(Debug, Deserialize)]
struct CrLoginRequest {
    cr_number: String,
}

#[derive(Debug, Deserialize)]
struct StatusUpdateRequest {
    status: AppointmentStatus,
}

#[derive(Debug, Deserialize)]
struct SerialAdjustRequest {
    delta: i32,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    q: Option<String>,
    sort: Option<SortKey>,
    direction: Option<SortDirection>,
}

#[derive(Debug, Deserialize)]
struct QueueQuery {
    serial: u32,
}

#[derive(Debug, Deserialize)]
struct UpcomingQuery {
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let sessions = FileSessionStore::new(&settings.session_path).map_err(|err| {
        error!(
            session_path = %settings.session_path,
            %err,
            "failed to open session store; verify parent directory permissions"
        );
        err
    })?;

    let api = ApiContext {
        store: Store::with_seed_data(),
        sessions: Arc::new(sessions),
        payment_delay: Duration::from_millis(settings.payment_delay_ms),
    };
    let (events, _) = broadcast::channel(256);

    let state = AppState { api, events };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/login/phone", post(http_login_phone))
        .route("/login/cr", post(http_login_cr))
        .route("/logout", post(http_logout))
        .route("/session", get(http_session))
        .route("/hospitals", get(http_list_hospitals))
        .route("/hospitals/:hospital_id/departments", get(http_list_departments))
        .route(
            "/hospitals/:hospital_id/departments/:department_id/doctors",
            get(http_list_doctors),
        )
        .route("/appointments", post(http_book).get(http_list_appointments))
        .route("/appointments/cr/:cr_number", get(http_lookup_cr))
        .route("/appointments/cr/:cr_number/history", get(http_cr_history))
        .route("/appointments/:appointment_id/call", post(http_call))
        .route("/appointments/:appointment_id/complete", post(http_complete))
        .route("/appointments/:appointment_id/status", post(http_set_status))
        .route("/appointments/:appointment_id/serial", post(http_adjust_serial))
        .route("/queue", get(http_queue_snapshot))
        .route("/queue/upcoming", get(http_upcoming))
        .route("/queue/advance", post(http_queue_advance))
        .route("/queue/retreat", post(http_queue_retreat))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

fn reject(error: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match error.code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_login_phone(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PhoneLoginRequest>,
) -> Result<Json<Session>, (StatusCode, Json<ApiError>)> {
    let session = login_with_phone(&state.api, &req.phone)
        .await
        .map_err(reject)?;
    Ok(Json(session))
}

async fn http_login_cr(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CrLoginRequest>,
) -> Result<Json<Session>, (StatusCode, Json<ApiError>)> {
    let session = login_with_cr(&state.api, &req.cr_number)
        .await
        .map_err(reject)?;
    Ok(Json(session))
}

async fn http_logout(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    logout(&state.api).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Session>, (StatusCode, Json<ApiError>)> {
    let session = session(&state.api).await.map_err(reject)?;
    Ok(Json(session))
}

async fn http_list_hospitals(State(state): State<Arc<AppState>>) -> Json<Vec<HospitalSummary>> {
    let hospitals = state
        .api
        .store
        .list_hospitals()
        .await
        .into_iter()
        .map(|hospital| HospitalSummary {
            id: hospital.id,
            name: hospital.name,
            location: hospital.location,
            image: hospital.image,
        })
        .collect();
    Json(hospitals)
}

async fn http_list_departments(
    State(state): State<Arc<AppState>>,
    Path(hospital_id): Path<String>,
) -> Result<Json<Vec<DepartmentSummary>>, (StatusCode, Json<ApiError>)> {
    let hospital = state
        .api
        .store
        .hospital(&HospitalId::new(hospital_id))
        .await
        .ok_or_else(|| reject(ApiError::new(ErrorCode::NotFound, "hospital not found")))?;
    let departments = hospital
        .departments
        .into_iter()
        .map(|department| DepartmentSummary {
            id: department.id,
            name: department.name,
            description: department.description,
        })
        .collect();
    Ok(Json(departments))
}

async fn http_list_doctors(
    State(state): State<Arc<AppState>>,
    Path((hospital_id, department_id)): Path<(String, String)>,
) -> Result<Json<Vec<DoctorSummary>>, (StatusCode, Json<ApiError>)> {
    let department = state
        .api
        .store
        .department(
            &HospitalId::new(hospital_id),
            &DepartmentId::new(department_id),
        )
        .await
        .ok_or_else(|| reject(ApiError::new(ErrorCode::NotFound, "department not found")))?;
    let doctors = department
        .doctors
        .into_iter()
        .map(|doctor| DoctorSummary {
            id: doctor.id,
            name: doctor.name,
            specialty: doctor.specialty,
            image: doctor.image,
            availability: doctor.availability,
            consultation_fee: doctor.consultation_fee,
        })
        .collect();
    Ok(Json(doctors))
}

async fn http_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookingRequest>,
) -> Result<Json<BookingConfirmation>, (StatusCode, Json<ApiError>)> {
    let confirmation = book_appointment(&state.api, req).await.map_err(reject)?;
    let _ = state.events.send(ServerEvent::AppointmentBooked {
        appointment: confirmation.appointment.clone(),
    });
    Ok(Json(confirmation))
}

async fn http_list_appointments(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Json<Vec<Appointment>> {
    let sort = q.sort.map(|key| (key, q.direction.unwrap_or_default()));
    let appointments = list_appointments(&state.api, q.q.as_deref(), sort).await;
    Json(appointments)
}

async fn http_lookup_cr(
    State(state): State<Arc<AppState>>,
    Path(cr_number): Path<String>,
) -> Result<Json<Appointment>, (StatusCode, Json<ApiError>)> {
    let appointment = lookup_by_cr(&state.api, &cr_number).await.map_err(reject)?;
    Ok(Json(appointment))
}

async fn http_cr_history(
    State(state): State<Arc<AppState>>,
    Path(cr_number): Path<String>,
) -> Json<Vec<Appointment>> {
    Json(appointments_for_cr(&state.api, &cr_number).await)
}

async fn http_call(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<ServerEvent>, (StatusCode, Json<ApiError>)> {
    let event = call_patient(&state.api, &AppointmentId::new(appointment_id))
        .await
        .map_err(reject)?;
    let _ = state.events.send(event.clone());
    Ok(Json(event))
}

async fn http_complete(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<ServerEvent>, (StatusCode, Json<ApiError>)> {
    let event = complete_patient(&state.api, &AppointmentId::new(appointment_id))
        .await
        .map_err(reject)?;
    let _ = state.events.send(event.clone());
    Ok(Json(event))
}

async fn http_set_status(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<ServerEvent>, (StatusCode, Json<ApiError>)> {
    let event = mark_status(&state.api, &AppointmentId::new(appointment_id), req.status)
        .await
        .map_err(reject)?;
    let _ = state.events.send(event.clone());
    Ok(Json(event))
}

async fn http_adjust_serial(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
    Json(req): Json<SerialAdjustRequest>,
) -> Result<Json<ServerEvent>, (StatusCode, Json<ApiError>)> {
    let event = adjust_serial(&state.api, &AppointmentId::new(appointment_id), req.delta)
        .await
        .map_err(reject)?;
    let _ = state.events.send(event.clone());
    Ok(Json(event))
}

async fn http_queue_snapshot(
    State(state): State<Arc<AppState>>,
    Query(q): Query<QueueQuery>,
) -> Json<QueueSnapshot> {
    Json(queue_snapshot(&state.api, q.serial).await)
}

async fn http_upcoming(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UpcomingQuery>,
) -> Json<Vec<Appointment>> {
    let limit = q.limit.unwrap_or(UPCOMING_LIMIT);
    Json(upcoming_patients(&state.api, limit).await)
}

async fn http_queue_advance(State(state): State<Arc<AppState>>) -> Json<ServerEvent> {
    let event = advance_queue(&state.api).await;
    let _ = state.events.send(event.clone());
    Json(event)
}

async fn http_queue_retreat(State(state): State<Arc<AppState>>) -> Json<ServerEvent> {
    let event = retreat_queue(&state.api).await;
    let _ = state.events.send(event.clone());
    Json(event)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

/// Pushes every broadcast event to the socket as JSON text. The live-queue
/// display never sends anything meaningful back; inbound frames are drained
/// until the peer hangs up.
async fn ws_connection(state: Arc<AppState>, socket: axum::extract::ws::WebSocket) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events.subscribe();

    let send_task = tokio::spawn(async move {
        while let Ok(event) = events_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use serde_json::json;
    use storage::MemorySessionStore;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let api = ApiContext {
            store: Store::with_seed_data(),
            sessions: Arc::new(MemorySessionStore::default()),
            payment_delay: Duration::ZERO,
        };
        let (events, _) = broadcast::channel(32);
        build_router(Arc::new(AppState { api, events }))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn healthz_responds_ok() {
        let app = test_app();
        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn listing_hospitals_returns_the_seeded_three() {
        let app = test_app();
        let response = app
            .oneshot(Request::get("/hospitals").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let hospitals = body_json(response).await;
        assert_eq!(hospitals.as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn booking_with_bad_form_reports_field_errors() {
        let app = test_app();
        let body = json!({
            "hospital_id": "h1",
            "department_id": "d1",
            "doctor_id": "doc1",
            "name": "",
            "age": "abc",
            "address": "1 Elm St",
            "phone": "555-000-1111"
        });
        let request = Request::post("/appointments")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error = body_json(response).await;
        assert_eq!(error["code"], "validation");
        assert!(!error["field_errors"].as_array().expect("fields").is_empty());
    }

    #[tokio::test]
    async fn booking_a_valid_form_confirms_payment() {
        let app = test_app();
        let body = json!({
            "hospital_id": "h2",
            "department_id": "d4",
            "doctor_id": "doc7",
            "name": "Young Patient",
            "age": "9",
            "sex": "other",
            "address": "2 Oak St",
            "phone": "555-222-3333",
            "date": "2023-07-01T09:00:00Z"
        });
        let request = Request::post("/appointments")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let confirmation = body_json(response).await;
        assert_eq!(confirmation["doctor_name"], "Dr. David Wilson");
        assert_eq!(confirmation["consultation_fee"], 100);
        assert_eq!(confirmation["appointment"]["payment_status"], "paid");
    }

    #[tokio::test]
    async fn cr_lookup_miss_is_not_found() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::get("/appointments/cr/CR99999")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn advancing_the_queue_moves_the_snapshot() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(
                Request::post("/queue/advance")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::get("/queue?serial=5")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let snapshot = body_json(response).await;
        assert_eq!(snapshot["current_serial"], 3);
        assert_eq!(snapshot["standing"], "coming_soon");
    }
}
