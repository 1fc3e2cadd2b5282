use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Serialize, Serializer};
use sqlx::MySqlPool;

use crate::model::office_timing::OfficeTiming;

/// Per-check classification against the configured office window.
#[derive(Debug, Copy, Clone, Eq, PartialEq, derive_more::Display)]
pub enum CheckStatus {
    #[display(fmt = "on_time")]
    OnTime,
    #[display(fmt = "late")]
    Late,
    #[display(fmt = "early")]
    Early,
    #[display(fmt = "pending")]
    Pending,
    #[display(fmt = "absent")]
    Absent,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::OnTime => "on_time",
            CheckStatus::Late => "late",
            CheckStatus::Early => "early",
            CheckStatus::Pending => "pending",
            CheckStatus::Absent => "absent",
        }
    }
}

impl Serialize for CheckStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceEvaluation {
    pub status: &'static str,
    pub check_in_status: CheckStatus,
    pub check_out_status: CheckStatus,
    pub scheduled_start: Option<String>,
    pub scheduled_end: Option<String>,
}

fn normalize_department(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Active office timings, one global entry plus one entry per department key.
pub struct OfficeTimingCache {
    global: Option<OfficeTiming>,
    by_department: HashMap<String, OfficeTiming>,
}

impl OfficeTimingCache {
    /// Rows must be ordered newest-updated first; the first row per key wins.
    pub fn build(rows: Vec<OfficeTiming>) -> Self {
        let mut global: Option<OfficeTiming> = None;
        let mut by_department: HashMap<String, OfficeTiming> = HashMap::new();

        for row in rows {
            match normalize_department(row.department.as_deref()) {
                None => {
                    if global.is_none() {
                        global = Some(row);
                    }
                }
                Some(key) => {
                    by_department.entry(key).or_insert(row);
                }
            }
        }

        Self {
            global,
            by_department,
        }
    }

    /// Department-specific timing when configured, global timing otherwise.
    pub fn resolve(&self, department: Option<&str>) -> Option<&OfficeTiming> {
        if let Some(key) = normalize_department(department) {
            if let Some(timing) = self.by_department.get(&key) {
                return Some(timing);
            }
        }
        self.global.as_ref()
    }
}

pub async fn load_office_timing_cache(pool: &MySqlPool) -> Result<OfficeTimingCache, sqlx::Error> {
    let rows = sqlx::query_as::<_, OfficeTiming>(
        r#"
        SELECT id, department, start_time, end_time,
               check_in_grace_minutes, check_out_grace_minutes,
               is_active, created_at, updated_at
        FROM office_timings
        WHERE is_active = TRUE
        ORDER BY updated_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(OfficeTimingCache::build(rows))
}

/// Classify a day's check-in/check-out against the resolved office window.
///
/// Timestamps are stored in UTC and compared in the configured local offset.
/// Grace minutes widen the acceptable window on each side.
pub fn evaluate_attendance(
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    timing: Option<&OfficeTiming>,
    local_offset: FixedOffset,
) -> AttendanceEvaluation {
    let scheduled_start = timing.map(|t| t.start_time.format("%H:%M").to_string());
    let scheduled_end = timing.map(|t| t.end_time.format("%H:%M").to_string());

    let local_in = match check_in {
        Some(ts) => ts.with_timezone(&local_offset).naive_local(),
        None => {
            return AttendanceEvaluation {
                status: "absent",
                check_in_status: CheckStatus::Absent,
                check_out_status: CheckStatus::Absent,
                scheduled_start,
                scheduled_end,
            };
        }
    };
    let local_out = check_out.map(|ts| ts.with_timezone(&local_offset).naive_local());

    let mut check_in_status = CheckStatus::OnTime;
    if let Some(t) = timing {
        let mut start = local_in.date().and_time(t.start_time);
        if t.check_in_grace_minutes > 0 {
            start += Duration::minutes(t.check_in_grace_minutes as i64);
        }
        if local_in > start {
            check_in_status = CheckStatus::Late;
        }
    }

    let check_out_status = match local_out {
        Some(out) => {
            let mut status = CheckStatus::OnTime;
            if let Some(t) = timing {
                let mut end = out.date().and_time(t.end_time);
                if t.check_out_grace_minutes > 0 {
                    end -= Duration::minutes(t.check_out_grace_minutes as i64);
                }
                if out < end {
                    status = CheckStatus::Early;
                }
            }
            status
        }
        None => CheckStatus::Pending,
    };

    let status = if check_in_status == CheckStatus::Late {
        "late"
    } else {
        "present"
    };

    AttendanceEvaluation {
        status,
        check_in_status,
        check_out_status,
        scheduled_start,
        scheduled_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 1800).unwrap()
    }

    fn timing(start: (u32, u32), end: (u32, u32), grace_in: i32, grace_out: i32) -> OfficeTiming {
        OfficeTiming {
            id: 1,
            department: None,
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            check_in_grace_minutes: grace_in,
            check_out_grace_minutes: grace_out,
            is_active: true,
            created_at: None,
            updated_at: Utc::now(),
        }
    }

    fn dept_timing(department: &str, start: (u32, u32)) -> OfficeTiming {
        OfficeTiming {
            department: Some(department.to_string()),
            ..timing(start, (18, 0), 0, 0)
        }
    }

    // 09:00 IST == 03:30 UTC
    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn missing_check_in_is_absent() {
        let t = timing((9, 0), (18, 0), 0, 0);
        let eval = evaluate_attendance(None, None, Some(&t), ist());
        assert_eq!(eval.status, "absent");
        assert_eq!(eval.check_in_status, CheckStatus::Absent);
        assert_eq!(eval.check_out_status, CheckStatus::Absent);
        assert_eq!(eval.scheduled_start.as_deref(), Some("09:00"));
    }

    #[test]
    fn grace_keeps_check_in_on_time() {
        let t = timing((9, 0), (18, 0), 15, 0);
        // 09:10 IST, inside the 15 minute grace
        let eval = evaluate_attendance(Some(utc(3, 40)), None, Some(&t), ist());
        assert_eq!(eval.check_in_status, CheckStatus::OnTime);
        assert_eq!(eval.check_out_status, CheckStatus::Pending);
        assert_eq!(eval.status, "present");
    }

    #[test]
    fn late_past_grace() {
        let t = timing((9, 0), (18, 0), 15, 0);
        // 09:16 IST
        let eval = evaluate_attendance(Some(utc(3, 46)), None, Some(&t), ist());
        assert_eq!(eval.check_in_status, CheckStatus::Late);
        assert_eq!(eval.status, "late");
    }

    #[test]
    fn early_departure_respects_grace() {
        let t = timing((9, 0), (18, 0), 0, 30);
        // out 17:40 IST, allowed from 17:30
        let on_time = evaluate_attendance(Some(utc(3, 30)), Some(utc(12, 10)), Some(&t), ist());
        assert_eq!(on_time.check_out_status, CheckStatus::OnTime);
        // out 17:20 IST
        let early = evaluate_attendance(Some(utc(3, 30)), Some(utc(11, 50)), Some(&t), ist());
        assert_eq!(early.check_out_status, CheckStatus::Early);
    }

    #[test]
    fn no_timing_defaults_to_on_time() {
        let eval = evaluate_attendance(Some(utc(10, 0)), None, None, ist());
        assert_eq!(eval.check_in_status, CheckStatus::OnTime);
        assert_eq!(eval.check_out_status, CheckStatus::Pending);
        assert!(eval.scheduled_start.is_none());
    }

    #[test]
    fn cache_prefers_department_over_global() {
        let cache = OfficeTimingCache::build(vec![
            dept_timing("Engineering", (10, 0)),
            timing((9, 0), (18, 0), 0, 0),
        ]);

        let resolved = cache.resolve(Some("  engineering ")).unwrap();
        assert_eq!(resolved.department.as_deref(), Some("Engineering"));

        let fallback = cache.resolve(Some("Sales")).unwrap();
        assert!(fallback.department.is_none());

        let global = cache.resolve(None).unwrap();
        assert!(global.department.is_none());
    }

    #[test]
    fn cache_first_row_wins_per_key() {
        let mut newer = dept_timing("Sales", (8, 0));
        newer.id = 7;
        let mut older = dept_timing("sales", (11, 0));
        older.id = 3;

        // build() expects rows already sorted newest first
        let cache = OfficeTimingCache::build(vec![newer, older]);
        assert_eq!(cache.resolve(Some("Sales")).unwrap().id, 7);
    }
}
