//! Interview scheduling: business-hour slot generation and calendar booking.
//!
//! Slots are a pure function of a start time, so the same input always lays
//! out the same calendar. Records already carrying `schedule_created = true`
//! are passed through untouched; re-running a schedule never double-books.

use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::actions::{pick, ActionError, ActionsClient, GOOGLECALENDAR_CREATE_EVENT};
use crate::config::Config;
use crate::models::{keys, Candidate};

const DAY_START_HOUR: u32 = 9;
const DAY_END_HOUR: u32 = 18;

#[async_trait]
pub trait InterviewScheduler: Send + Sync {
    /// Returns every input record, each carrying schedule metadata.
    /// A per-record booking failure leaves `schedule_created = false`;
    /// `Err` means the calendar could not be used at all.
    async fn schedule(
        &self,
        candidates: &[Candidate],
        duration_minutes: u32,
    ) -> Result<Vec<Candidate>, ActionError>;
}

fn opening(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(DAY_START_HOUR))
}

/// 09:00 on the day after `now`.
pub fn next_business_morning(now: NaiveDateTime) -> NaiveDateTime {
    opening(now.date() + Duration::days(1))
}

/// `count` interview starts from `start`, `duration_minutes` apart, each
/// starting within 09:00–18:00 on a weekday. The last slot of a day may
/// begin before 18:00 and run past it.
pub fn generate_slots(start: NaiveDateTime, count: usize, duration_minutes: u32) -> Vec<NaiveDateTime> {
    let step = Duration::minutes(i64::from(duration_minutes));
    let mut slots = Vec::with_capacity(count);
    let mut current = start;

    while slots.len() < count {
        let weekday = current.weekday().num_days_from_monday();
        if weekday >= 5 {
            current = opening(current.date() + Duration::days(i64::from(7 - weekday)));
            continue;
        }
        if current.hour() < DAY_START_HOUR {
            current = opening(current.date());
            continue;
        }
        if current.hour() >= DAY_END_HOUR {
            current = opening(current.date() + Duration::days(1));
            continue;
        }
        slots.push(current);
        current += step;
    }
    slots
}

/// Writes the slot fields every scheduled record carries.
pub fn apply_slot(candidate: &mut Candidate, slot: NaiveDateTime, duration_minutes: u32) {
    candidate.set(keys::INTERVIEW_DATE, slot.format("%Y-%m-%d").to_string());
    candidate.set(keys::INTERVIEW_TIME, slot.format("%I:%M %p").to_string());
    candidate.set(keys::INTERVIEW_DATETIME, slot.format("%Y-%m-%dT%H:%M:%S").to_string());
    candidate.set(keys::DURATION_MINUTES, duration_minutes);
}

fn event_params(candidate: &Candidate, slot: NaiveDateTime, duration_minutes: u32) -> Value {
    let name = candidate.name();
    let email = candidate.email();
    let score = candidate
        .number(keys::SCORE)
        .map_or_else(|| "N/A".to_string(), |s| format!("{s:.1}"));
    let end = slot + Duration::minutes(i64::from(duration_minutes));

    let mut description = vec![
        "Candidate Interview".to_string(),
        String::new(),
        format!("Name: {name}"),
    ];
    if !email.is_empty() {
        description.push(format!("Email: {email}"));
    }
    description.push(format!("Score: {score}/10"));
    description.push(String::new());
    description.push("Evaluation Rationale:".to_string());
    description.push(candidate.str_or(keys::RATIONALE, "").to_string());

    let attendees: Vec<&str> = if email.is_empty() { vec![] } else { vec![email] };

    json!({
        "summary": format!("Interview: {name} (Score: {score})"),
        "description": description.join("\n"),
        "start_datetime": slot.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "end_datetime": end.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "attendees": attendees,
    })
}

/// Transport or service level failures mean nothing else will book either.
fn calendar_unreachable(error: &ActionError) -> bool {
    matches!(
        error,
        ActionError::Http(_) | ActionError::Api { .. } | ActionError::Exhausted { .. }
    )
}

pub struct CalendarScheduler {
    actions: ActionsClient,
    entity_id: String,
    /// First slot; `None` means tomorrow at 09:00.
    start: Option<NaiveDateTime>,
}

impl CalendarScheduler {
    pub fn new(actions: ActionsClient, config: &Config) -> Self {
        Self {
            actions,
            entity_id: config.calendar_entity_id.clone(),
            start: None,
        }
    }

    async fn book(
        &self,
        candidate: &Candidate,
        slot: NaiveDateTime,
        duration_minutes: u32,
    ) -> Result<Option<String>, ActionError> {
        let data = self
            .actions
            .execute(
                GOOGLECALENDAR_CREATE_EVENT,
                &self.entity_id,
                event_params(candidate, slot, duration_minutes),
            )
            .await?;
        Ok(pick(&data, &["htmlLink", "html_link"])
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

#[async_trait]
impl InterviewScheduler for CalendarScheduler {
    async fn schedule(
        &self,
        candidates: &[Candidate],
        duration_minutes: u32,
    ) -> Result<Vec<Candidate>, ActionError> {
        let pending = candidates
            .iter()
            .filter(|c| !c.flag(keys::SCHEDULE_CREATED))
            .count();
        let start = self
            .start
            .unwrap_or_else(|| next_business_morning(Local::now().naive_local()));
        let mut slots = generate_slots(start, pending, duration_minutes).into_iter();

        let mut scheduled = Vec::with_capacity(candidates.len());
        let mut first_attempt = true;
        let mut booked = 0usize;

        for candidate in candidates {
            if candidate.flag(keys::SCHEDULE_CREATED) {
                scheduled.push(candidate.clone());
                continue;
            }
            let Some(slot) = slots.next() else {
                scheduled.push(candidate.clone());
                continue;
            };

            let mut record = candidate.clone();
            apply_slot(&mut record, slot, duration_minutes);

            match self.book(&record, slot, duration_minutes).await {
                Ok(link) => {
                    record.set(keys::SCHEDULE_CREATED, true);
                    if let Some(link) = link {
                        record.set(keys::CALENDAR_EVENT_LINK, link);
                    }
                    booked += 1;
                }
                Err(e) if first_attempt && calendar_unreachable(&e) => return Err(e),
                Err(e) => {
                    warn!(candidate = record.name(), "calendar event not created: {e}");
                    record.set(keys::SCHEDULE_CREATED, false);
                }
            }
            first_attempt = false;
            scheduled.push(record);
        }

        info!(requested = pending, booked, "interviews scheduled");
        Ok(scheduled)
    }
}
