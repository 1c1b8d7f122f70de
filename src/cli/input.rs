use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::model::task::Task;

/// Parse a `--deadline` value: an RFC 3339 timestamp, or a bare
/// `YYYY-MM-DD` meaning midnight of that day in `tz`.
///
/// Deadlines before the start of the current day in `tz` are rejected.
pub fn parse_deadline<Tz: TimeZone>(
    s: &str,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    let deadline = if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        at.with_timezone(&Utc)
    } else if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        local_midnight(date, tz)
            .ok_or_else(|| format!("'{}' is not a valid local date", s))?
    } else {
        return Err(format!(
            "invalid deadline '{}' (expected YYYY-MM-DD or an RFC 3339 timestamp)",
            s
        ));
    };

    let today = now.with_timezone(tz).date_naive();
    match local_midnight(today, tz) {
        Some(start_of_today) if deadline < start_of_today => {
            Err("Deadline cannot be in the past".to_string())
        }
        _ => Ok(deadline),
    }
}

fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
}

/// Outcome of matching a user-typed id against the collection
#[derive(Debug, PartialEq, Eq)]
pub enum IdMatch {
    Found(String),
    NotFound,
    Ambiguous(usize),
}

/// Match an exact id, else a unique id prefix
pub fn match_id(tasks: &[Task], arg: &str) -> IdMatch {
    if arg.is_empty() {
        return IdMatch::NotFound;
    }
    if tasks.iter().any(|t| t.id == arg) {
        return IdMatch::Found(arg.to_string());
    }
    let matches: Vec<&Task> = tasks.iter().filter(|t| t.id.starts_with(arg)).collect();
    match matches.as_slice() {
        [] => IdMatch::NotFound,
        [one] => IdMatch::Found(one.id.clone()),
        many => IdMatch::Ambiguous(many.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 15, 30, 0).unwrap()
    }

    #[test]
    fn date_only_is_midnight_in_zone() {
        let plus2 = FixedOffset::east_opt(2 * 3600).unwrap();
        let at = parse_deadline("2025-05-03", now(), &plus2).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 5, 2, 22, 0, 0).unwrap());
    }

    #[test]
    fn rfc3339_is_accepted() {
        let at = parse_deadline("2025-05-01T18:00:00+00:00", now(), &Utc).unwrap();
        assert_eq!(at, now() + Duration::minutes(150));
    }

    #[test]
    fn earlier_today_is_allowed() {
        // the picker allows today; a timestamp earlier today is still today
        assert!(parse_deadline("2025-05-01", now(), &Utc).is_ok());
        assert!(parse_deadline("2025-05-01T01:00:00Z", now(), &Utc).is_ok());
    }

    #[test]
    fn before_today_is_rejected() {
        let err = parse_deadline("2025-04-30", now(), &Utc).unwrap_err();
        assert_eq!(err, "Deadline cannot be in the past");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_deadline("next tuesday", now(), &Utc).is_err());
    }

    fn tasks(ids: &[&str]) -> Vec<Task> {
        ids.iter()
            .map(|id| Task {
                id: id.to_string(),
                title: id.to_string(),
                description: None,
                completed: false,
                raw_priority: None,
                deadline: None,
                created_at: now(),
                updated_at: now(),
            })
            .collect()
    }

    #[test]
    fn id_prefix_matching() {
        let list = tasks(&["abc123", "abd456", "ab"]);
        assert_eq!(match_id(&list, "abc"), IdMatch::Found("abc123".into()));
        // exact match wins over prefix ambiguity
        assert_eq!(match_id(&list, "ab"), IdMatch::Found("ab".into()));
        assert_eq!(match_id(&list, "a"), IdMatch::Ambiguous(3));
        assert_eq!(match_id(&list, "zzz"), IdMatch::NotFound);
        assert_eq!(match_id(&list, ""), IdMatch::NotFound);
    }
}
