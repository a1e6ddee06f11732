//! The patient-facing booking stepper: hospital, department, doctor, patient
//! details, payment, confirmation. The flow only tracks selections and step
//! order; the server does the validating and the booking.

use chrono::{DateTime, Utc};
use thiserror::Error;

use shared::{
    domain::{DepartmentId, DoctorId, HospitalId, Sex},
    protocol::{BookingConfirmation, BookingRequest},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStep {
    SelectHospital,
    SelectDepartment,
    SelectDoctor,
    PatientDetails,
    Payment,
    Confirmed,
}

/// Raw form input collected at the patient-details step.
#[derive(Debug, Clone, Default)]
pub struct PatientDetails {
    pub name: String,
    pub age: String,
    pub sex: Option<Sex>,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("this action is not available at the {0:?} step")]
    WrongStep(BookingStep),
    #[error("selections are incomplete")]
    Incomplete,
}

#[derive(Debug, Clone)]
pub struct BookingFlow {
    step: BookingStep,
    hospital_id: Option<HospitalId>,
    department_id: Option<DepartmentId>,
    doctor_id: Option<DoctorId>,
    details: Option<PatientDetails>,
    confirmation: Option<BookingConfirmation>,
}

impl Default for BookingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingFlow {
    pub fn new() -> Self {
        Self {
            step: BookingStep::SelectHospital,
            hospital_id: None,
            department_id: None,
            doctor_id: None,
            details: None,
            confirmation: None,
        }
    }

    pub fn step(&self) -> BookingStep {
        self.step
    }

    pub fn confirmation(&self) -> Option<&BookingConfirmation> {
        self.confirmation.as_ref()
    }

    fn require(&self, step: BookingStep) -> Result<(), FlowError> {
        if self.step == step {
            Ok(())
        } else {
            Err(FlowError::WrongStep(self.step))
        }
    }

    pub fn select_hospital(&mut self, hospital_id: HospitalId) -> Result<(), FlowError> {
        self.require(BookingStep::SelectHospital)?;
        self.hospital_id = Some(hospital_id);
        self.step = BookingStep::SelectDepartment;
        Ok(())
    }

    pub fn select_department(&mut self, department_id: DepartmentId) -> Result<(), FlowError> {
        self.require(BookingStep::SelectDepartment)?;
        self.department_id = Some(department_id);
        self.step = BookingStep::SelectDoctor;
        Ok(())
    }

    pub fn select_doctor(&mut self, doctor_id: DoctorId) -> Result<(), FlowError> {
        self.require(BookingStep::SelectDoctor)?;
        self.doctor_id = Some(doctor_id);
        self.step = BookingStep::PatientDetails;
        Ok(())
    }

    pub fn submit_details(&mut self, details: PatientDetails) -> Result<(), FlowError> {
        self.require(BookingStep::PatientDetails)?;
        self.details = Some(details);
        self.step = BookingStep::Payment;
        Ok(())
    }

    /// The request to send at the payment step. Only available once every
    /// earlier step has been completed.
    pub fn booking_request(&self) -> Result<BookingRequest, FlowError> {
        self.require(BookingStep::Payment)?;
        let (Some(hospital_id), Some(department_id), Some(doctor_id), Some(details)) = (
            self.hospital_id.clone(),
            self.department_id.clone(),
            self.doctor_id.clone(),
            self.details.clone(),
        ) else {
            return Err(FlowError::Incomplete);
        };

        Ok(BookingRequest {
            hospital_id,
            department_id,
            doctor_id,
            name: details.name,
            age: details.age,
            sex: details.sex,
            address: details.address,
            phone: details.phone,
            email: details.email,
            date: details.date,
            notes: details.notes,
        })
    }

    pub fn record_confirmation(
        &mut self,
        confirmation: BookingConfirmation,
    ) -> Result<(), FlowError> {
        self.require(BookingStep::Payment)?;
        self.confirmation = Some(confirmation);
        self.step = BookingStep::Confirmed;
        Ok(())
    }

    /// Steps back one screen, keeping earlier selections. Returns `false` at
    /// the first step and once the booking is confirmed.
    pub fn back(&mut self) -> bool {
        let previous = match self.step {
            BookingStep::SelectHospital | BookingStep::Confirmed => return false,
            BookingStep::SelectDepartment => BookingStep::SelectHospital,
            BookingStep::SelectDoctor => BookingStep::SelectDepartment,
            BookingStep::PatientDetails => BookingStep::SelectDoctor,
            BookingStep::Payment => BookingStep::PatientDetails,
        };
        self.step = previous;
        true
    }
}
