use super::*;

use chrono::{TimeZone, Utc};
use shared::domain::{
    AppointmentId, DepartmentId, DoctorId, HospitalId, Patient, PatientId, PaymentStatus, Sex,
};

fn appointment(id: &str, cr: &str, serial: u32, name: &str, phone: &str, day: u32) -> Appointment {
    Appointment {
        id: AppointmentId::new(id),
        patient_id: PatientId::new(format!("p-{id}")),
        doctor_id: DoctorId::new("doc1"),
        hospital_id: HospitalId::new("h1"),
        department_id: DepartmentId::new("d1"),
        cr_number: cr.to_string(),
        serial_number: serial,
        date: Utc.with_ymd_and_hms(2023, 6, day, 10, 0, 0).unwrap(),
        status: AppointmentStatus::Scheduled,
        payment_status: PaymentStatus::Paid,
        patient_info: Patient {
            id: PatientId::new(format!("p-{id}")),
            cr_number: Some(cr.to_string()),
            name: name.to_string(),
            age: 40,
            sex: Sex::Other,
            address: "1 Test Lane".to_string(),
            phone: phone.to_string(),
            email: None,
        },
        created_at: Utc.with_ymd_and_hms(2023, 6, 1, 9, 0, 0).unwrap(),
    }
}

fn sample() -> Vec<Appointment> {
    vec![
        appointment("a1", "CR12345", 1, "John Doe", "555-123-4567", 15),
        appointment("a2", "CR12346", 2, "Jane Smith", "555-987-6543", 15),
        appointment("a3", "CR12347", 3, "Robert Johnson", "555-246-8102", 16),
    ]
}

#[test]
fn progress_is_bounded_and_non_decreasing() {
    let your_serial = 10;
    let mut last = 0;
    for current in 1..your_serial {
        let percent = progress_for(your_serial, current);
        assert!(percent <= 100);
        assert!(percent >= last, "progress went backwards at {current}");
        last = percent;
    }
}

#[test]
fn progress_is_complete_once_served() {
    assert_eq!(progress_for(5, 5), 100);
    assert_eq!(progress_for(3, 5), 100);
}

#[test]
fn progress_handles_first_serial_without_dividing_by_zero() {
    assert_eq!(progress_for(1, 1), 100);
}

#[test]
fn progress_rounds_to_nearest_percent() {
    // 5 of 7 served ahead of serial 8.
    assert_eq!(progress_for(8, 5), 71);
}

#[test]
fn wait_estimate_announces_your_turn() {
    assert_eq!(estimated_wait(5, 5), "It's your turn now!");
    assert_eq!(estimated_wait(3, 5), "It's your turn now!");
}

#[test]
fn wait_estimate_formats_minutes_and_hours() {
    assert_eq!(estimated_wait(8, 5), "About 30 minutes");
    assert_eq!(estimated_wait(20, 5), "About 2 hours and 30 minutes");
    assert_eq!(estimated_wait(11, 5), "About 1 hour");
    assert_eq!(estimated_wait(12, 5), "About 1 hour and 10 minutes");
}

#[test]
fn standing_classifies_by_distance() {
    assert_eq!(standing(3, 5), QueueStanding::AlreadyCalled);
    assert_eq!(standing(5, 5), QueueStanding::CurrentlyServing);
    assert_eq!(standing(10, 5), QueueStanding::ComingSoon);
    assert_eq!(standing(11, 5), QueueStanding::InQueue);
}

#[test]
fn pointer_moves_are_saturating() {
    assert_eq!(advance(2), 3);
    assert_eq!(retreat(2), 1);
    assert_eq!(retreat(1), 1);
}

#[test]
fn upcoming_keeps_order_and_truncates() {
    let appointments = sample();
    let next = upcoming(&appointments, 2, 5);
    assert_eq!(next.len(), 2);
    assert_eq!(next[0].serial_number, 2);
    assert_eq!(next[1].serial_number, 3);

    let capped = upcoming(&appointments, 1, 2);
    assert_eq!(capped.len(), 2);
}

#[test]
fn filter_matches_cr_number_case_insensitively() {
    let appointments = sample();
    let hits = filter_appointments(&appointments, "CR12346");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, AppointmentId::new("a2"));

    let lowercase_hits = filter_appointments(&appointments, "cr12346");
    assert_eq!(lowercase_hits.len(), 1);
}

#[test]
fn filter_matches_name_and_phone() {
    let appointments = sample();
    assert_eq!(filter_appointments(&appointments, "jane").len(), 1);
    assert_eq!(filter_appointments(&appointments, "555-246").len(), 1);
}

#[test]
fn empty_filter_returns_everything() {
    let appointments = sample();
    assert_eq!(filter_appointments(&appointments, "").len(), 3);
    assert_eq!(filter_appointments(&appointments, "   ").len(), 3);
}

#[test]
fn sort_by_serial_in_both_directions() {
    let mut appointments = sample();
    appointments.reverse();

    sort_appointments(
        &mut appointments,
        SortKey::SerialNumber,
        SortDirection::Ascending,
    );
    let serials: Vec<u32> = appointments.iter().map(|a| a.serial_number).collect();
    assert_eq!(serials, vec![1, 2, 3]);

    sort_appointments(
        &mut appointments,
        SortKey::SerialNumber,
        SortDirection::Descending,
    );
    let serials: Vec<u32> = appointments.iter().map(|a| a.serial_number).collect();
    assert_eq!(serials, vec![3, 2, 1]);
}

#[test]
fn sort_by_patient_name_reaches_the_nested_field() {
    let mut appointments = sample();
    sort_appointments(
        &mut appointments,
        SortKey::PatientName,
        SortDirection::Ascending,
    );
    let names: Vec<&str> = appointments
        .iter()
        .map(|a| a.patient_info.name.as_str())
        .collect();
    assert_eq!(names, vec!["Jane Smith", "John Doe", "Robert Johnson"]);
}

#[test]
fn sort_by_date_is_chronological() {
    let mut appointments = sample();
    appointments.swap(0, 2);
    sort_appointments(&mut appointments, SortKey::Date, SortDirection::Ascending);
    assert!(appointments.windows(2).all(|pair| pair[0].date <= pair[1].date));
}

#[test]
fn toggling_the_same_column_flips_direction() {
    let mut config = SortConfig::default();
    config.toggle(SortKey::SerialNumber);
    assert_eq!(config.key, Some(SortKey::SerialNumber));
    assert_eq!(config.direction, SortDirection::Ascending);

    config.toggle(SortKey::SerialNumber);
    assert_eq!(config.direction, SortDirection::Descending);

    config.toggle(SortKey::CrNumber);
    assert_eq!(config.key, Some(SortKey::CrNumber));
    assert_eq!(config.direction, SortDirection::Ascending);
}

#[test]
fn set_serial_saturates_at_one() {
    let mut appointments = sample();
    let id = AppointmentId::new("a2");

    assert_eq!(set_serial(&mut appointments, &id, -1), Some(1));
    assert_eq!(set_serial(&mut appointments, &id, -1), Some(1));
    assert_eq!(set_serial(&mut appointments, &id, 1), Some(2));
}

#[test]
fn set_serial_ignores_unknown_ids() {
    let mut appointments = sample();
    let before = appointments.clone();
    assert_eq!(set_serial(&mut appointments, &AppointmentId::new("zz"), 1), None);
    assert_eq!(appointments, before);
}

#[test]
fn set_status_touches_only_the_target() {
    let mut appointments = sample();
    let id = AppointmentId::new("a2");
    assert!(set_status(&mut appointments, &id, AppointmentStatus::Completed));

    for appointment in &appointments {
        if appointment.id == id {
            assert_eq!(appointment.status, AppointmentStatus::Completed);
            assert_eq!(appointment.serial_number, 2);
            assert_eq!(appointment.patient_info.name, "Jane Smith");
        } else {
            assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        }
    }

    assert!(!set_status(
        &mut appointments,
        &AppointmentId::new("zz"),
        AppointmentStatus::Cancelled
    ));
}

#[test]
fn lookup_by_cr_ignores_case() {
    let appointments = sample();
    let found = lookup_by_cr(&appointments, "cr12345").expect("match");
    assert_eq!(found.cr_number, "CR12345");
    assert!(lookup_by_cr(&appointments, "CR99999").is_none());
}
