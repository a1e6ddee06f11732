//! Queue state model and appointment table controller.
//!
//! Everything here is a pure function over plain appointment data: the caller
//! owns the list and the current-serial pointer, this crate only derives views
//! and returns updated values.

use shared::{
    domain::{Appointment, AppointmentId, AppointmentStatus},
    protocol::{QueueStanding, SortDirection, SortKey},
};

/// Fixed scheduling assumption used for wait estimates.
pub const MINUTES_PER_PATIENT: u32 = 10;

/// Serials within this distance of the current one count as "coming soon".
pub const COMING_SOON_WINDOW: u32 = 5;

/// Percentage of the queue ahead of `your_serial` that has been served,
/// rounded to the nearest whole percent.
///
/// Anyone at or before the current serial is done (100). A serial of 1 has
/// nobody ahead, so it reports 100 rather than dividing by zero.
pub fn progress_for(your_serial: u32, current_serial: u32) -> u8 {
    if your_serial <= current_serial {
        return 100;
    }
    let total_before = your_serial - 1;
    if total_before == 0 {
        return 100;
    }
    ((current_serial as f64 / total_before as f64) * 100.0).round() as u8
}

/// Human-readable wait estimate at ten minutes per patient ahead.
pub fn estimated_wait(your_serial: u32, current_serial: u32) -> String {
    if your_serial <= current_serial {
        return "It's your turn now!".to_string();
    }

    let patients_ahead = your_serial - current_serial;
    let wait_minutes = patients_ahead * MINUTES_PER_PATIENT;

    if wait_minutes < 60 {
        return format!("About {wait_minutes} minutes");
    }

    let hours = wait_minutes / 60;
    let minutes = wait_minutes % 60;
    let hour_word = if hours > 1 { "hours" } else { "hour" };
    if minutes > 0 {
        format!("About {hours} {hour_word} and {minutes} minutes")
    } else {
        format!("About {hours} {hour_word}")
    }
}

pub fn standing(your_serial: u32, current_serial: u32) -> QueueStanding {
    if your_serial < current_serial {
        QueueStanding::AlreadyCalled
    } else if your_serial == current_serial {
        QueueStanding::CurrentlyServing
    } else if your_serial - current_serial <= COMING_SOON_WINDOW {
        QueueStanding::ComingSoon
    } else {
        QueueStanding::InQueue
    }
}

pub fn patients_waiting(your_serial: u32, current_serial: u32) -> u32 {
    your_serial.saturating_sub(current_serial)
}

pub fn advance(current_serial: u32) -> u32 {
    current_serial + 1
}

/// Steps the pointer back one place, never below the first serial.
pub fn retreat(current_serial: u32) -> u32 {
    (current_serial - 1).max(1)
}

/// The next patients still to be served, in the order the caller supplied
/// (callers pre-sort by serial), truncated to `limit`.
pub fn upcoming(appointments: &[Appointment], current_serial: u32, limit: usize) -> Vec<Appointment> {
    appointments
        .iter()
        .filter(|appointment| appointment.serial_number >= current_serial)
        .take(limit)
        .cloned()
        .collect()
}

/// Case-insensitive substring search over patient name, CR number and phone.
/// An empty query returns the full input unchanged.
pub fn filter_appointments(appointments: &[Appointment], query: &str) -> Vec<Appointment> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return appointments.to_vec();
    }

    appointments
        .iter()
        .filter(|appointment| {
            appointment
                .patient_info
                .name
                .to_lowercase()
                .contains(&query)
                || appointment.cr_number.to_lowercase().contains(&query)
                || appointment.patient_info.phone.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

/// Stable sort by a typed column accessor. Equal keys keep their relative
/// order, so chained sorts behave like the interactive table expects.
pub fn sort_appointments(appointments: &mut [Appointment], key: SortKey, direction: SortDirection) {
    appointments.sort_by(|a, b| {
        let ordering = match key {
            SortKey::SerialNumber => a.serial_number.cmp(&b.serial_number),
            SortKey::CrNumber => a.cr_number.cmp(&b.cr_number),
            SortKey::PatientName => a.patient_info.name.cmp(&b.patient_info.name),
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::Status => a.status.label().cmp(b.status.label()),
        };
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

/// Column-header toggle state. Owned by the caller, not by `sort_appointments`:
/// clicking the already-ascending column flips it to descending, clicking any
/// other column resets to ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortConfig {
    pub key: Option<SortKey>,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == Some(key) && self.direction == SortDirection::Ascending {
            self.direction = SortDirection::Descending;
        } else {
            self.key = Some(key);
            self.direction = SortDirection::Ascending;
        }
    }
}

/// Replaces the matched appointment's serial with `max(1, serial + delta)`.
/// Returns the new serial, or `None` when the id is unknown (silent no-op).
pub fn set_serial(
    appointments: &mut [Appointment],
    appointment_id: &AppointmentId,
    delta: i32,
) -> Option<u32> {
    let appointment = appointments
        .iter_mut()
        .find(|appointment| &appointment.id == appointment_id)?;
    let adjusted = (i64::from(appointment.serial_number) + i64::from(delta)).max(1);
    appointment.serial_number = adjusted as u32;
    Some(appointment.serial_number)
}

/// Replaces only the status field of the matched appointment. Returns `false`
/// when the id is unknown.
pub fn set_status(
    appointments: &mut [Appointment],
    appointment_id: &AppointmentId,
    status: AppointmentStatus,
) -> bool {
    match appointments
        .iter_mut()
        .find(|appointment| &appointment.id == appointment_id)
    {
        Some(appointment) => {
            appointment.status = status;
            true
        }
        None => false,
    }
}

/// Case-insensitive exact CR-number match; first hit wins.
pub fn lookup_by_cr<'a>(appointments: &'a [Appointment], cr_number: &str) -> Option<&'a Appointment> {
    appointments
        .iter()
        .find(|appointment| appointment.cr_number.eq_ignore_ascii_case(cr_number))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
