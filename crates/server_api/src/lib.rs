//! Service layer: booking, login, queue administration and appointment
//! listings, expressed as free functions over an [`ApiContext`]. Transport
//! concerns (HTTP codes, WebSocket fan-out) live in the server crate.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use shared::{
    domain::{
        Appointment, AppointmentId, AppointmentStatus, Patient, PatientId, PaymentStatus, Sex,
    },
    error::{ApiError, ErrorCode, FieldError},
    protocol::{
        BookingConfirmation, BookingRequest, QueueSnapshot, ServerEvent, Session, SortDirection,
        SortKey,
    },
};
use storage::{SessionStore, Store};

/// How many upcoming patients the admin queue panel shows.
pub const UPCOMING_LIMIT: usize = 5;

const MIN_PHONE_DIGITS: usize = 10;

#[derive(Clone)]
pub struct ApiContext {
    pub store: Store,
    pub sessions: Arc<dyn SessionStore>,
    /// Artificial delay for the simulated payment step. The simulation always
    /// succeeds; this only models the gateway round-trip.
    pub payment_delay: Duration,
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

// --- session ---------------------------------------------------------------

pub async fn login_with_phone(ctx: &ApiContext, phone: &str) -> Result<Session, ApiError> {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if digits < MIN_PHONE_DIGITS {
        return Err(ApiError::validation(vec![FieldError::new(
            "phone",
            "Please enter a valid phone number",
        )]));
    }

    let mut session = ctx.sessions.load().await.map_err(internal)?;
    session.logged_in = true;
    ctx.sessions.store(&session).await.map_err(internal)?;
    Ok(session)
}

/// Returning patients sign in with their CR number; it is remembered for
/// rebooking but not verified against the appointment list. A wrong number
/// surfaces later as a not-found on lookup.
pub async fn login_with_cr(ctx: &ApiContext, cr_number: &str) -> Result<Session, ApiError> {
    let cr_number = cr_number.trim();
    if cr_number.is_empty() {
        return Err(ApiError::validation(vec![FieldError::new(
            "cr_number",
            "Please enter your CR number",
        )]));
    }

    let session = Session {
        logged_in: true,
        cr_number: Some(cr_number.to_string()),
    };
    ctx.sessions.store(&session).await.map_err(internal)?;
    Ok(session)
}

pub async fn logout(ctx: &ApiContext) -> Result<(), ApiError> {
    ctx.sessions.clear().await.map_err(internal)
}

pub async fn session(ctx: &ApiContext) -> Result<Session, ApiError> {
    ctx.sessions.load().await.map_err(internal)
}

// --- booking ---------------------------------------------------------------

/// Patient-form input that passed validation, with the age already parsed.
#[derive(Debug, Clone)]
pub struct ValidatedBooking {
    pub name: String,
    pub age: u32,
    pub sex: Sex,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub date: DateTime<Utc>,
}

/// Checks every field and reports all problems at once, so the form can show
/// inline messages instead of failing on the first bad field.
pub fn validate_booking(request: &BookingRequest) -> Result<ValidatedBooking, Vec<FieldError>> {
    let mut errors = Vec::new();

    if request.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }

    let age = if request.age.trim().is_empty() {
        errors.push(FieldError::new("age", "Age is required"));
        None
    } else {
        match request.age.trim().parse::<u32>() {
            Ok(age) if age > 0 => Some(age),
            _ => {
                errors.push(FieldError::new("age", "Age must be a valid number"));
                None
            }
        }
    };

    if request.sex.is_none() {
        errors.push(FieldError::new("sex", "Sex is required"));
    }

    if request.address.trim().is_empty() {
        errors.push(FieldError::new("address", "Address is required"));
    }

    if request.phone.trim().is_empty() {
        errors.push(FieldError::new("phone", "Phone number is required"));
    }

    if let Some(email) = request.email.as_deref() {
        if !email.is_empty() && !looks_like_email(email) {
            errors.push(FieldError::new("email", "Invalid email format"));
        }
    }

    if request.date.is_none() {
        errors.push(FieldError::new("date", "Appointment date is required"));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // All required fields verified present above.
    match (age, request.sex, request.date) {
        (Some(age), Some(sex), Some(date)) => Ok(ValidatedBooking {
            name: request.name.trim().to_string(),
            age,
            sex,
            address: request.address.trim().to_string(),
            phone: request.phone.trim().to_string(),
            email: request
                .email
                .as_deref()
                .map(str::trim)
                .filter(|email| !email.is_empty())
                .map(str::to_string),
            date,
        }),
        _ => Err(vec![FieldError::new("form", "form is incomplete")]),
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !local.is_empty() && !host.is_empty() && !tld.is_empty()
}

/// Books an appointment: resolves the selected doctor, validates the form,
/// runs the simulated payment (always succeeds), then mints a CR number and a
/// queue serial and stores the appointment.
pub async fn book_appointment(
    ctx: &ApiContext,
    request: BookingRequest,
) -> Result<BookingConfirmation, ApiError> {
    let resolved = ctx
        .store
        .resolve_doctor(&request.hospital_id, &request.department_id, &request.doctor_id)
        .await
        .ok_or_else(|| {
            ApiError::new(
                ErrorCode::NotFound,
                "could not find selected hospital, department, or doctor",
            )
        })?;

    let validated = validate_booking(&request).map_err(ApiError::validation)?;

    // Payment simulation: one deferred step, no failure path.
    tokio::time::sleep(ctx.payment_delay).await;

    let (cr_number, serial_number) = {
        let mut rng = rand::thread_rng();
        (
            format!("CR{}", rng.gen_range(100_000..1_000_000)),
            rng.gen_range(1..=50),
        )
    };
    let patient_id = PatientId::new(format!("p-{}", Uuid::new_v4()));

    let appointment = Appointment {
        id: AppointmentId::new(format!("a-{}", Uuid::new_v4())),
        patient_id: patient_id.clone(),
        doctor_id: request.doctor_id.clone(),
        hospital_id: request.hospital_id.clone(),
        department_id: request.department_id.clone(),
        cr_number: cr_number.clone(),
        serial_number,
        date: validated.date,
        status: AppointmentStatus::Scheduled,
        payment_status: PaymentStatus::Paid,
        patient_info: Patient {
            id: patient_id,
            cr_number: Some(cr_number),
            name: validated.name,
            age: validated.age,
            sex: validated.sex,
            address: validated.address,
            phone: validated.phone,
            email: validated.email,
        },
        created_at: Utc::now(),
    };

    ctx.store.insert_appointment(appointment.clone()).await;
    info!(
        appointment_id = %appointment.id,
        cr_number = %appointment.cr_number,
        serial = appointment.serial_number,
        "appointment booked"
    );

    Ok(BookingConfirmation {
        appointment,
        hospital_name: resolved.hospital_name,
        department_name: resolved.department_name,
        doctor_name: resolved.doctor.name,
        consultation_fee: resolved.doctor.consultation_fee,
    })
}

// --- queue -----------------------------------------------------------------

pub async fn queue_snapshot(ctx: &ApiContext, your_serial: u32) -> QueueSnapshot {
    let current_serial = ctx.store.current_serial().await;
    QueueSnapshot {
        current_serial,
        your_serial,
        progress_percent: queue::progress_for(your_serial, current_serial),
        standing: queue::standing(your_serial, current_serial),
        estimated_wait: queue::estimated_wait(your_serial, current_serial),
        patients_seen: current_serial,
        patients_waiting: queue::patients_waiting(your_serial, current_serial),
    }
}

pub async fn upcoming_patients(ctx: &ApiContext, limit: usize) -> Vec<Appointment> {
    let mut appointments = ctx.store.appointments().await;
    queue::sort_appointments(
        &mut appointments,
        SortKey::SerialNumber,
        SortDirection::Ascending,
    );
    let current_serial = ctx.store.current_serial().await;
    queue::upcoming(&appointments, current_serial, limit)
}

pub async fn advance_queue(ctx: &ApiContext) -> ServerEvent {
    let current_serial = ctx.store.advance_current().await;
    info!(current_serial, "queue advanced");
    ServerEvent::QueueAdvanced { current_serial }
}

pub async fn retreat_queue(ctx: &ApiContext) -> ServerEvent {
    let current_serial = ctx.store.retreat_current().await;
    info!(current_serial, "queue retreated");
    ServerEvent::QueueRetreated { current_serial }
}

/// Calls a patient in: status becomes In Progress and the queue pointer moves
/// forward, as one transaction.
pub async fn call_patient(
    ctx: &ApiContext,
    appointment_id: &AppointmentId,
) -> Result<ServerEvent, ApiError> {
    transition_and_advance(ctx, appointment_id, AppointmentStatus::InProgress).await
}

/// Finishes the current consultation: status becomes Completed and the queue
/// pointer moves forward, as one transaction.
pub async fn complete_patient(
    ctx: &ApiContext,
    appointment_id: &AppointmentId,
) -> Result<ServerEvent, ApiError> {
    transition_and_advance(ctx, appointment_id, AppointmentStatus::Completed).await
}

async fn transition_and_advance(
    ctx: &ApiContext,
    appointment_id: &AppointmentId,
    status: AppointmentStatus,
) -> Result<ServerEvent, ApiError> {
    let (appointment, current_serial) = ctx
        .store
        .call_next(appointment_id, status)
        .await
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "appointment not found"))?;
    info!(
        appointment_id = %appointment.id,
        status = status.label(),
        current_serial,
        "appointment status changed"
    );
    Ok(ServerEvent::AppointmentStatusChanged {
        appointment_id: appointment.id,
        status,
        current_serial,
    })
}

/// Plain status change (e.g. Cancelled) with no pointer movement.
pub async fn mark_status(
    ctx: &ApiContext,
    appointment_id: &AppointmentId,
    status: AppointmentStatus,
) -> Result<ServerEvent, ApiError> {
    if !ctx.store.update_status(appointment_id, status).await {
        return Err(ApiError::new(ErrorCode::NotFound, "appointment not found"));
    }
    Ok(ServerEvent::AppointmentStatusChanged {
        appointment_id: appointment_id.clone(),
        status,
        current_serial: ctx.store.current_serial().await,
    })
}

pub async fn adjust_serial(
    ctx: &ApiContext,
    appointment_id: &AppointmentId,
    delta: i32,
) -> Result<ServerEvent, ApiError> {
    if delta != 1 && delta != -1 {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "serial adjustments move one step at a time",
        ));
    }
    let serial_number = ctx
        .store
        .adjust_serial(appointment_id, delta)
        .await
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "appointment not found"))?;
    Ok(ServerEvent::SerialAdjusted {
        appointment_id: appointment_id.clone(),
        serial_number,
    })
}

// --- listings --------------------------------------------------------------

pub async fn list_appointments(
    ctx: &ApiContext,
    query: Option<&str>,
    sort: Option<(SortKey, SortDirection)>,
) -> Vec<Appointment> {
    let appointments = ctx.store.appointments().await;
    let mut filtered = match query {
        Some(query) => queue::filter_appointments(&appointments, query),
        None => appointments,
    };
    if let Some((key, direction)) = sort {
        queue::sort_appointments(&mut filtered, key, direction);
    }
    filtered
}

pub async fn lookup_by_cr(ctx: &ApiContext, cr_number: &str) -> Result<Appointment, ApiError> {
    ctx.store.find_by_cr(cr_number).await.ok_or_else(|| {
        ApiError::new(ErrorCode::NotFound, "no patient found with this CR number")
    })
}

pub async fn appointments_for_cr(ctx: &ApiContext, cr_number: &str) -> Vec<Appointment> {
    ctx.store.appointments_for_cr(cr_number).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use shared::domain::{DepartmentId, DoctorId, HospitalId};
    use storage::MemorySessionStore;

    fn setup() -> ApiContext {
        ApiContext {
            store: Store::with_seed_data(),
            sessions: Arc::new(MemorySessionStore::default()),
            payment_delay: Duration::ZERO,
        }
    }

    fn booking_request() -> BookingRequest {
        BookingRequest {
            hospital_id: HospitalId::new("h1"),
            department_id: DepartmentId::new("d1"),
            doctor_id: DoctorId::new("doc1"),
            name: "Alice Patient".to_string(),
            age: "34".to_string(),
            sex: Some(Sex::Female),
            address: "12 Elm Street".to_string(),
            phone: "555-000-1111".to_string(),
            email: Some("alice@example.com".to_string()),
            date: Some(Utc::now()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn booking_creates_a_paid_scheduled_appointment() {
        let ctx = setup();
        let confirmation = book_appointment(&ctx, booking_request())
            .await
            .expect("confirmation");

        assert_eq!(confirmation.hospital_name, "Central Hospital");
        assert_eq!(confirmation.doctor_name, "Dr. John Smith");
        assert_eq!(confirmation.consultation_fee, 150);

        let appointment = &confirmation.appointment;
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert_eq!(appointment.payment_status, PaymentStatus::Paid);
        assert!(appointment.cr_number.starts_with("CR"));
        assert!((1..=50).contains(&appointment.serial_number));
        assert_eq!(appointment.patient_info.cr_number.as_deref(), Some(appointment.cr_number.as_str()));

        assert_eq!(ctx.store.appointments().await.len(), 4);
    }

    #[tokio::test]
    async fn booking_reports_every_invalid_field() {
        let ctx = setup();
        let mut request = booking_request();
        request.name = "  ".to_string();
        request.age = "minus five".to_string();
        request.email = Some("not-an-email".to_string());
        request.date = None;

        let err = book_appointment(&ctx, request).await.expect_err("invalid");
        assert_eq!(err.code, ErrorCode::Validation);
        let fields: Vec<&str> = err.field_errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "age", "email", "date"]);
    }

    #[tokio::test]
    async fn booking_with_dangling_doctor_id_is_not_found() {
        let ctx = setup();
        let mut request = booking_request();
        request.doctor_id = DoctorId::new("doc99");

        let err = book_appointment(&ctx, request).await.expect_err("dangling");
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn calling_a_patient_moves_status_and_pointer_together() {
        let ctx = setup();
        let event = call_patient(&ctx, &AppointmentId::new("a1"))
            .await
            .expect("event");

        match event {
            ServerEvent::AppointmentStatusChanged {
                status,
                current_serial,
                ..
            } => {
                assert_eq!(status, AppointmentStatus::InProgress);
                assert_eq!(current_serial, 3);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let appointment = ctx
            .store
            .appointment(&AppointmentId::new("a1"))
            .await
            .expect("appointment");
        assert_eq!(appointment.status, AppointmentStatus::InProgress);
        assert_eq!(ctx.store.current_serial().await, 3);
    }

    #[tokio::test]
    async fn cancelling_does_not_move_the_pointer() {
        let ctx = setup();
        let event = mark_status(
            &ctx,
            &AppointmentId::new("a3"),
            AppointmentStatus::Cancelled,
        )
        .await
        .expect("event");

        match event {
            ServerEvent::AppointmentStatusChanged { current_serial, .. } => {
                assert_eq!(current_serial, 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn serial_adjustment_rejects_large_deltas() {
        let ctx = setup();
        let err = adjust_serial(&ctx, &AppointmentId::new("a1"), 5)
            .await
            .expect_err("delta too large");
        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[tokio::test]
    async fn snapshot_derives_the_queue_view() {
        let ctx = setup();
        let snapshot = queue_snapshot(&ctx, 8).await;

        assert_eq!(snapshot.current_serial, 2);
        assert_eq!(snapshot.progress_percent, 29);
        assert_eq!(snapshot.estimated_wait, "About 1 hour");
        assert_eq!(snapshot.patients_waiting, 6);
    }

    #[tokio::test]
    async fn listings_filter_then_sort() {
        let ctx = setup();
        let all = list_appointments(
            &ctx,
            None,
            Some((SortKey::SerialNumber, SortDirection::Descending)),
        )
        .await;
        let serials: Vec<u32> = all.iter().map(|a| a.serial_number).collect();
        assert_eq!(serials, vec![3, 2, 1]);

        let hits = list_appointments(&ctx, Some("jane"), None).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].cr_number, "CR12346");
    }

    #[tokio::test]
    async fn phone_login_requires_ten_digits() {
        let ctx = setup();
        let err = login_with_phone(&ctx, "12345").await.expect_err("short");
        assert_eq!(err.code, ErrorCode::Validation);

        let logged_in = login_with_phone(&ctx, "555-123-4567").await.expect("login");
        assert!(logged_in.logged_in);
        assert!(session(&ctx).await.expect("session").logged_in);
    }

    #[tokio::test]
    async fn cr_login_remembers_the_number_until_logout() {
        let ctx = setup();
        let logged_in = login_with_cr(&ctx, "CR12345").await.expect("login");
        assert_eq!(logged_in.cr_number.as_deref(), Some("CR12345"));

        logout(&ctx).await.expect("logout");
        let cleared = session(&ctx).await.expect("session");
        assert!(!cleared.logged_in);
        assert!(cleared.cr_number.is_none());
    }
}
