use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::{debug, warn};

use crate::error::BookingFormError;
use crate::models::{SlotAvailabilityResponse, SlotStatus};

const SLOT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// One bookable instant for the selected doctor, as the wall-clock written
/// by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub raw: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Parse a backend timestamp. Zone designators are accepted but not applied.
pub fn parse_slot(raw: &str) -> Option<Slot> {
    let trimmed = raw.trim();

    let datetime = DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| {
            SLOT_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        })?;

    Some(Slot {
        raw: raw.to_string(),
        date: datetime.date(),
        time: datetime.time(),
    })
}

/// 24-hour time to the label shown in the picker, e.g. 14:30 -> "2:30 PM".
pub fn format_time_label(time: NaiveTime) -> String {
    let (is_pm, hour) = time.hour12();
    format!("{}:{:02} {}", hour, time.minute(), if is_pm { "PM" } else { "AM" })
}

/// Inverse of [`format_time_label`].
pub fn parse_time_label(label: &str) -> Result<NaiveTime, BookingFormError> {
    let invalid = || BookingFormError::TimeLabel(label.to_string());

    let (clock, period) = label.trim().split_once(' ').ok_or_else(invalid)?;
    let (hour, minute) = clock.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;

    if !(1..=12).contains(&hour) {
        return Err(invalid());
    }

    let hour = match (period.trim().to_ascii_uppercase().as_str(), hour) {
        ("AM", 12) => 0,
        ("AM", h) => h,
        ("PM", 12) => 12,
        ("PM", h) => h + 12,
        _ => return Err(invalid()),
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Date plus picker label to the booking wire format `YYYY-MM-DDTHH:MM:00Z`.
pub fn to_wire_datetime(date: NaiveDate, time_label: &str) -> Result<String, BookingFormError> {
    let time = parse_time_label(time_label)?;
    Ok(format!("{}T{}:00Z", date.format("%Y-%m-%d"), time.format("%H:%M")))
}

/// Distinct slot dates, ascending.
pub fn available_dates(slots: &[Slot]) -> Vec<NaiveDate> {
    slots
        .iter()
        .map(|slot| slot.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Labels for the slots on `date`, in slot order.
pub fn available_times(slots: &[Slot], date: NaiveDate) -> Vec<String> {
    slots
        .iter()
        .filter(|slot| slot.date == date)
        .map(|slot| format_time_label(slot.time))
        .collect()
}

/// Identifies one slot fetch. Results are applied only while the ticket is
/// still the latest one issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTicket {
    pub doctor_id: String,
    generation: u64,
}

/// Slots for the selected doctor and the dates/times derived from them.
///
/// Every derived collection is replaced wholesale when its upstream value
/// changes: slots and dates on a doctor change, times on a date change.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityResolver {
    generation: u64,
    status: SlotStatus,
    error: Option<String>,
    slots: Vec<Slot>,
    dates: Vec<NaiveDate>,
    times: Vec<String>,
}

impl AvailabilityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything derived from the previous doctor. Returns the ticket
    /// for the fetch to issue, if a doctor is selected.
    pub fn reset_for_doctor(&mut self, doctor_id: Option<&str>) -> Option<SlotTicket> {
        self.generation += 1;
        self.slots.clear();
        self.dates.clear();
        self.times.clear();
        self.error = None;

        match doctor_id {
            Some(doctor_id) => {
                self.status = SlotStatus::Loading;
                debug!("Slot fetch {} issued for doctor {}", self.generation, doctor_id);
                Some(SlotTicket {
                    doctor_id: doctor_id.to_string(),
                    generation: self.generation,
                })
            }
            None => {
                self.status = SlotStatus::Idle;
                None
            }
        }
    }

    /// No usable result for the current doctor: the fetch is still out (or
    /// was abandoned) or it failed.
    pub fn needs_refetch(&self) -> bool {
        matches!(self.status, SlotStatus::Loading | SlotStatus::Failed)
    }

    pub fn is_current(&self, ticket: &SlotTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Apply a fetch result. Returns `false` when the ticket was superseded
    /// and the result discarded.
    pub fn apply(&mut self, ticket: &SlotTicket, result: Result<SlotAvailabilityResponse>) -> bool {
        if !self.is_current(ticket) {
            warn!(
                "Discarding stale slots for doctor {} (fetch {}, current {})",
                ticket.doctor_id, ticket.generation, self.generation
            );
            return false;
        }

        let response = match result {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                let message = if response.error_text.is_empty() {
                    format!("Slot lookup rejected with code {}", response.return_code)
                } else {
                    response.error_text
                };
                self.fail(ticket, message);
                return true;
            }
            Err(e) => {
                self.fail(ticket, format!("Error fetching slots: {}", e));
                return true;
            }
        };

        self.slots = response
            .available_slots
            .iter()
            .filter_map(|raw| {
                let slot = parse_slot(raw);
                if slot.is_none() {
                    warn!("Skipping unparseable slot {:?} for doctor {}", raw, ticket.doctor_id);
                }
                slot
            })
            .collect();
        self.dates = available_dates(&self.slots);
        self.status = if self.slots.is_empty() {
            SlotStatus::NoSlots
        } else {
            SlotStatus::Ready
        };

        debug!(
            "Doctor {} has {} slots over {} dates",
            ticket.doctor_id,
            self.slots.len(),
            self.dates.len()
        );
        true
    }

    fn fail(&mut self, ticket: &SlotTicket, message: String) {
        warn!("Slots unavailable for doctor {}: {}", ticket.doctor_id, message);
        self.status = SlotStatus::Failed;
        self.error = Some(message);
    }

    /// Check `date` can be chosen and derive its times. `None` clears times.
    pub fn select_date(&mut self, date: Option<NaiveDate>) -> Result<(), BookingFormError> {
        let Some(date) = date else {
            self.times.clear();
            return Ok(());
        };

        if self.status == SlotStatus::Loading {
            return Err(BookingFormError::SlotsLoading);
        }
        if !self.dates.contains(&date) {
            return Err(BookingFormError::Validation(format!(
                "{} has no available slots",
                date
            )));
        }

        self.times = available_times(&self.slots, date);
        Ok(())
    }

    /// Check `label` is one of the times derived for the selected date.
    pub fn check_time(&self, label: &str) -> Result<(), BookingFormError> {
        if self.status == SlotStatus::Loading {
            return Err(BookingFormError::SlotsLoading);
        }
        if self.times.iter().any(|time| time == label) {
            Ok(())
        } else {
            Err(BookingFormError::Validation(format!(
                "{} is not an available time",
                label
            )))
        }
    }

    pub fn status(&self) -> SlotStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn times(&self) -> &[String] {
        &self.times
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_slot_formats() {
        for raw in [
            "2024-06-10T14:30:00",
            "2024-06-10T14:30:00Z",
            "2024-06-10T14:30:00+05:30",
            "2024-06-10 14:30:00",
            "2024-06-10T14:30:00.000",
        ] {
            let slot = parse_slot(raw).unwrap_or_else(|| panic!("{} should parse", raw));
            assert_eq!(slot.date, date("2024-06-10"));
            assert_eq!(slot.time, NaiveTime::from_hms_opt(14, 30, 0).unwrap());
        }

        assert!(parse_slot("next tuesday").is_none());
        assert!(parse_slot("2024-06-10").is_none());
    }

    #[test]
    fn test_time_labels() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(format_time_label(t(0, 15)), "12:15 AM");
        assert_eq!(format_time_label(t(9, 0)), "9:00 AM");
        assert_eq!(format_time_label(t(12, 0)), "12:00 PM");
        assert_eq!(format_time_label(t(14, 30)), "2:30 PM");
        assert_eq!(format_time_label(t(23, 5)), "11:05 PM");

        assert_eq!(parse_time_label("12:15 AM").unwrap(), t(0, 15));
        assert_eq!(parse_time_label("12:00 PM").unwrap(), t(12, 0));
        assert_eq!(parse_time_label("2:30 pm").unwrap(), t(14, 30));

        assert!(parse_time_label("14:30").is_err());
        assert!(parse_time_label("13:00 PM").is_err());
        assert!(parse_time_label("0:30 AM").is_err());
        assert!(parse_time_label("9:75 AM").is_err());
    }

    #[test]
    fn test_wire_datetime() {
        assert_eq!(
            to_wire_datetime(date("2024-06-10"), "2:30 PM").unwrap(),
            "2024-06-10T14:30:00Z"
        );
        assert_eq!(
            to_wire_datetime(date("2024-06-10"), "12:00 AM").unwrap(),
            "2024-06-10T00:00:00Z"
        );
    }

    #[test]
    fn test_wire_datetime_reparses_to_same_display_pair() {
        let wire = to_wire_datetime(date("2024-06-10"), "2:30 PM").unwrap();
        let slot = parse_slot(&wire).unwrap();

        assert_eq!(slot.date, date("2024-06-10"));
        assert_eq!(format_time_label(slot.time), "2:30 PM");
    }
}
