use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        Appointment, AppointmentId, AppointmentStatus, DepartmentId, DoctorId, HospitalId, Sex,
    },
    error::ApiError,
};

/// Session flags remembered across restarts, the way a browser keeps its
/// local-storage login markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cr_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalSummary {
    pub id: HospitalId,
    pub name: String,
    pub location: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentSummary {
    pub id: DepartmentId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: DoctorId,
    pub name: String,
    pub specialty: String,
    pub image: String,
    pub availability: Vec<String>,
    pub consultation_fee: u32,
}

/// Raw patient-detail form input. Age stays a string here because it arrives
/// as free text; the service layer parses and validates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingRequest {
    pub hospital_id: HospitalId,
    pub department_id: DepartmentId,
    pub doctor_id: DoctorId,
    pub name: String,
    pub age: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    pub address: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub appointment: Appointment,
    pub hospital_name: String,
    pub department_name: String,
    pub doctor_name: String,
    pub consultation_fee: u32,
}

/// Where a serial sits relative to the one currently being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStanding {
    AlreadyCalled,
    CurrentlyServing,
    ComingSoon,
    InQueue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub current_serial: u32,
    pub your_serial: u32,
    pub progress_percent: u8,
    pub standing: QueueStanding,
    pub estimated_wait: String,
    pub patients_seen: u32,
    pub patients_waiting: u32,
}

/// Sortable appointment-table columns, one typed accessor per column rather
/// than stringly field paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    SerialNumber,
    CrNumber,
    PatientName,
    Date,
    Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    QueueAdvanced {
        current_serial: u32,
    },
    QueueRetreated {
        current_serial: u32,
    },
    AppointmentBooked {
        appointment: Appointment,
    },
    AppointmentStatusChanged {
        appointment_id: AppointmentId,
        status: AppointmentStatus,
        current_serial: u32,
    },
    SerialAdjusted {
        appointment_id: AppointmentId,
        serial_number: u32,
    },
    Error(ApiError),
}
