//! Demo reference dataset and sample appointments.

use chrono::{DateTime, TimeZone, Utc};

use shared::domain::{
    Appointment, AppointmentId, AppointmentStatus, Department, DepartmentId, Doctor, DoctorId,
    Hospital, HospitalId, Patient, PatientId, PaymentStatus, Sex,
};

fn date(month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, month, day, hour, minute, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn doctor(id: &str, name: &str, specialty: &str, image: &str, days: &[&str], fee: u32) -> Doctor {
    Doctor {
        id: DoctorId::new(id),
        name: name.to_string(),
        specialty: specialty.to_string(),
        image: image.to_string(),
        availability: days.iter().map(|day| day.to_string()).collect(),
        consultation_fee: fee,
    }
}

const MWF: &[&str] = &["Monday", "Wednesday", "Friday"];
const TTS: &[&str] = &["Tuesday", "Thursday", "Saturday"];
const MTF: &[&str] = &["Monday", "Tuesday", "Friday"];
const WTS: &[&str] = &["Wednesday", "Thursday", "Saturday"];

const SURGEON_IMG: &str = "https://images.unsplash.com/photo-1612349317150-e413f6a5b16d?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=400&q=80";
const CARDIO_IMG: &str = "https://images.unsplash.com/photo-1594824476967-48c8b964273f?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=400&q=80";
const NEURO_IMG: &str = "https://images.unsplash.com/photo-1622253692010-333f2da6031d?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=400&q=80";
const CLINIC_IMG: &str = "https://images.unsplash.com/photo-1559839734-2b71ea197ec2?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=400&q=80";
const ORTHO_IMG: &str = "https://images.unsplash.com/photo-1537368910025-700350fe46c7?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=400&q=80";

pub fn hospitals() -> Vec<Hospital> {
    vec![
        Hospital {
            id: HospitalId::new("h1"),
            name: "Central Hospital".to_string(),
            location: "123 Medical Center Blvd, Healthcare City".to_string(),
            image: "https://images.unsplash.com/photo-1519494026892-80bbd2d6fd0d?ixlib=rb-4.0.3&auto=format&fit=crop&w=1053&q=80".to_string(),
            departments: vec![
                Department {
                    id: DepartmentId::new("d1"),
                    name: "Cardiology".to_string(),
                    description: "Heart and cardiovascular system specialists".to_string(),
                    doctors: vec![
                        doctor("doc1", "Dr. John Smith", "Cardiac Surgeon", SURGEON_IMG, MWF, 150),
                        doctor("doc2", "Dr. Emily Johnson", "Cardiologist", CARDIO_IMG, TTS, 120),
                    ],
                },
                Department {
                    id: DepartmentId::new("d2"),
                    name: "Neurology".to_string(),
                    description: "Brain, spine, and nervous system specialists".to_string(),
                    doctors: vec![
                        doctor("doc3", "Dr. Michael Chen", "Neurologist", NEURO_IMG, MTF, 140),
                        doctor("doc4", "Dr. Sarah Williams", "Neurosurgeon", CLINIC_IMG, WTS, 180),
                    ],
                },
            ],
        },
        Hospital {
            id: HospitalId::new("h2"),
            name: "Memorial Medical Center".to_string(),
            location: "456 Health Avenue, Wellness District".to_string(),
            image: "https://images.unsplash.com/photo-1586773860418-d37222d8fce3?ixlib=rb-4.0.3&auto=format&fit=crop&w=1053&q=80".to_string(),
            departments: vec![
                Department {
                    id: DepartmentId::new("d3"),
                    name: "Orthopedics".to_string(),
                    description: "Bone, joint, and musculoskeletal specialists".to_string(),
                    doctors: vec![
                        doctor("doc5", "Dr. Robert Brown", "Orthopedic Surgeon", ORTHO_IMG, MWF, 130),
                        doctor("doc6", "Dr. Jessica Lee", "Sports Medicine", CLINIC_IMG, TTS, 110),
                    ],
                },
                Department {
                    id: DepartmentId::new("d4"),
                    name: "Pediatrics".to_string(),
                    description: "Child and adolescent health specialists".to_string(),
                    doctors: vec![
                        doctor("doc7", "Dr. David Wilson", "Pediatrician", SURGEON_IMG, MTF, 100),
                        doctor("doc8", "Dr. Amanda Garcia", "Pediatric Surgeon", CARDIO_IMG, WTS, 160),
                    ],
                },
            ],
        },
        Hospital {
            id: HospitalId::new("h3"),
            name: "Community General Hospital".to_string(),
            location: "789 Care Street, Healing Heights".to_string(),
            image: "https://images.unsplash.com/photo-1586773860418-d37222d8fce3?ixlib=rb-4.0.3&auto=format&fit=crop&w=1053&q=80".to_string(),
            departments: vec![
                Department {
                    id: DepartmentId::new("d5"),
                    name: "Dermatology".to_string(),
                    description: "Skin, hair, and nail specialists".to_string(),
                    doctors: vec![
                        doctor("doc9", "Dr. Linda Martinez", "Dermatologist", CARDIO_IMG, MWF, 120),
                    ],
                },
                Department {
                    id: DepartmentId::new("d6"),
                    name: "Ophthalmology".to_string(),
                    description: "Eye and vision specialists".to_string(),
                    doctors: vec![
                        doctor("doc10", "Dr. Thomas Wright", "Ophthalmologist", NEURO_IMG, TTS, 130),
                    ],
                },
            ],
        },
    ]
}

struct SeedAppointment {
    id: &'static str,
    doctor: &'static str,
    hospital: &'static str,
    department: &'static str,
    cr: &'static str,
    serial: u32,
    date: (u32, u32, u32, u32),
    status: AppointmentStatus,
    payment: PaymentStatus,
    patient: (&'static str, &'static str, u32, Sex, &'static str, &'static str),
    created: (u32, u32, u32, u32),
}

pub fn appointments() -> Vec<Appointment> {
    let rows = [
        SeedAppointment {
            id: "a1",
            doctor: "doc1",
            hospital: "h1",
            department: "d1",
            cr: "CR12345",
            serial: 1,
            date: (6, 15, 10, 0),
            status: AppointmentStatus::Scheduled,
            payment: PaymentStatus::Paid,
            patient: (
                "p1",
                "John Doe",
                45,
                Sex::Male,
                "123 Main St, Anytown, AN 12345",
                "555-123-4567",
            ),
            created: (6, 1, 14, 30),
        },
        SeedAppointment {
            id: "a2",
            doctor: "doc3",
            hospital: "h1",
            department: "d2",
            cr: "CR12346",
            serial: 2,
            date: (6, 15, 11, 0),
            status: AppointmentStatus::InProgress,
            payment: PaymentStatus::Paid,
            patient: (
                "p2",
                "Jane Smith",
                32,
                Sex::Female,
                "456 Oak Ave, Somewhere, SO 67890",
                "555-987-6543",
            ),
            created: (6, 2, 9, 15),
        },
        SeedAppointment {
            id: "a3",
            doctor: "doc5",
            hospital: "h2",
            department: "d3",
            cr: "CR12347",
            serial: 3,
            date: (6, 16, 9, 30),
            status: AppointmentStatus::Scheduled,
            payment: PaymentStatus::Pending,
            patient: (
                "p3",
                "Robert Johnson",
                58,
                Sex::Male,
                "789 Pine St, Elsewhere, EL 13579",
                "555-246-8102",
            ),
            created: (6, 3, 16, 45),
        },
    ];

    rows.into_iter()
        .map(|row| {
            let (patient_id, name, age, sex, address, phone) = row.patient;
            let (month, day, hour, minute) = row.date;
            let (c_month, c_day, c_hour, c_minute) = row.created;
            Appointment {
                id: AppointmentId::new(row.id),
                patient_id: PatientId::new(patient_id),
                doctor_id: DoctorId::new(row.doctor),
                hospital_id: HospitalId::new(row.hospital),
                department_id: DepartmentId::new(row.department),
                cr_number: row.cr.to_string(),
                serial_number: row.serial,
                date: date(month, day, hour, minute),
                status: row.status,
                payment_status: row.payment,
                patient_info: Patient {
                    id: PatientId::new(patient_id),
                    cr_number: Some(row.cr.to_string()),
                    name: name.to_string(),
                    age,
                    sex,
                    address: address.to_string(),
                    phone: phone.to_string(),
                    email: None,
                },
                created_at: date(c_month, c_day, c_hour, c_minute),
            }
        })
        .collect()
}
