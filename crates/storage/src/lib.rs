//! In-memory clinic state: static reference data (hospitals, departments,
//! doctors), the appointment list, and the current-serial pointer. Everything
//! lives behind one `RwLock`; handles are cheap clones.

use std::sync::Arc;

use tokio::sync::RwLock;

use shared::domain::{
    Appointment, AppointmentId, AppointmentStatus, Department, DepartmentId, Doctor, DoctorId,
    Hospital, HospitalId,
};

mod seed;
mod session;

pub use session::{FileSessionStore, MemorySessionStore, SessionStore};

/// A doctor resolved through its owning hospital and department, with the
/// display names the booking confirmation needs.
#[derive(Debug, Clone)]
pub struct ResolvedDoctor {
    pub hospital_name: String,
    pub department_name: String,
    pub doctor: Doctor,
}

#[derive(Clone)]
pub struct Store {
    inner: Arc<RwLock<StoreInner>>,
}

struct StoreInner {
    hospitals: Vec<Hospital>,
    appointments: Vec<Appointment>,
    current_serial: u32,
}

impl Store {
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                hospitals: Vec::new(),
                appointments: Vec::new(),
                current_serial: 1,
            })),
        }
    }

    /// Store preloaded with the demo dataset: three hospitals, ten doctors,
    /// three sample appointments, current serial at 2.
    pub fn with_seed_data() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                hospitals: seed::hospitals(),
                appointments: seed::appointments(),
                current_serial: 2,
            })),
        }
    }

    pub async fn list_hospitals(&self) -> Vec<Hospital> {
        self.inner.read().await.hospitals.clone()
    }

    pub async fn hospital(&self, hospital_id: &HospitalId) -> Option<Hospital> {
        self.inner
            .read()
            .await
            .hospitals
            .iter()
            .find(|hospital| &hospital.id == hospital_id)
            .cloned()
    }

    pub async fn department(
        &self,
        hospital_id: &HospitalId,
        department_id: &DepartmentId,
    ) -> Option<Department> {
        self.inner
            .read()
            .await
            .hospitals
            .iter()
            .find(|hospital| &hospital.id == hospital_id)?
            .departments
            .iter()
            .find(|department| &department.id == department_id)
            .cloned()
    }

    /// Walks hospital -> department -> doctor. A miss at any level means a
    /// dangling id, which callers treat as an internal consistency fault.
    pub async fn resolve_doctor(
        &self,
        hospital_id: &HospitalId,
        department_id: &DepartmentId,
        doctor_id: &DoctorId,
    ) -> Option<ResolvedDoctor> {
        let inner = self.inner.read().await;
        let hospital = inner
            .hospitals
            .iter()
            .find(|hospital| &hospital.id == hospital_id)?;
        let department = hospital
            .departments
            .iter()
            .find(|department| &department.id == department_id)?;
        let doctor = department
            .doctors
            .iter()
            .find(|doctor| &doctor.id == doctor_id)?;
        Some(ResolvedDoctor {
            hospital_name: hospital.name.clone(),
            department_name: department.name.clone(),
            doctor: doctor.clone(),
        })
    }

    pub async fn appointments(&self) -> Vec<Appointment> {
        self.inner.read().await.appointments.clone()
    }

    pub async fn appointment(&self, appointment_id: &AppointmentId) -> Option<Appointment> {
        self.inner
            .read()
            .await
            .appointments
            .iter()
            .find(|appointment| &appointment.id == appointment_id)
            .cloned()
    }

    pub async fn insert_appointment(&self, appointment: Appointment) {
        self.inner.write().await.appointments.push(appointment);
    }

    pub async fn update_status(
        &self,
        appointment_id: &AppointmentId,
        status: AppointmentStatus,
    ) -> bool {
        let mut inner = self.inner.write().await;
        queue::set_status(&mut inner.appointments, appointment_id, status)
    }

    /// Nudges one appointment's serial by `delta`, saturating at 1. Returns
    /// the new serial, or `None` for an unknown id.
    pub async fn adjust_serial(&self, appointment_id: &AppointmentId, delta: i32) -> Option<u32> {
        let mut inner = self.inner.write().await;
        queue::set_serial(&mut inner.appointments, appointment_id, delta)
    }

    pub async fn find_by_cr(&self, cr_number: &str) -> Option<Appointment> {
        let inner = self.inner.read().await;
        queue::lookup_by_cr(&inner.appointments, cr_number).cloned()
    }

    /// Every appointment booked under a CR number, for the patient dashboard.
    pub async fn appointments_for_cr(&self, cr_number: &str) -> Vec<Appointment> {
        self.inner
            .read()
            .await
            .appointments
            .iter()
            .filter(|appointment| appointment.cr_number.eq_ignore_ascii_case(cr_number))
            .cloned()
            .collect()
    }

    pub async fn current_serial(&self) -> u32 {
        self.inner.read().await.current_serial
    }

    pub async fn advance_current(&self) -> u32 {
        let mut inner = self.inner.write().await;
        inner.current_serial = queue::advance(inner.current_serial);
        inner.current_serial
    }

    pub async fn retreat_current(&self) -> u32 {
        let mut inner = self.inner.write().await;
        inner.current_serial = queue::retreat(inner.current_serial);
        inner.current_serial
    }

    /// Sets the appointment's status and advances the current-serial pointer
    /// under a single write lock, so the two can never drift apart. Returns
    /// the updated appointment and the new pointer; `None` leaves the pointer
    /// untouched.
    pub async fn call_next(
        &self,
        appointment_id: &AppointmentId,
        status: AppointmentStatus,
    ) -> Option<(Appointment, u32)> {
        let mut inner = self.inner.write().await;
        if !queue::set_status(&mut inner.appointments, appointment_id, status) {
            return None;
        }
        inner.current_serial = queue::advance(inner.current_serial);
        let current_serial = inner.current_serial;
        let appointment = inner
            .appointments
            .iter()
            .find(|appointment| &appointment.id == appointment_id)
            .cloned()?;
        Some((appointment, current_serial))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
