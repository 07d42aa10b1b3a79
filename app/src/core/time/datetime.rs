use tokio::task_local;

task_local! {
    pub static FIXED_NOW: DateTime;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DateTime {
    delegate: chrono::DateTime<chrono::Local>,
}

impl DateTime {
    fn new<T: chrono::TimeZone>(delegate: chrono::DateTime<T>) -> Self {
        Self {
            delegate: delegate.with_timezone(&chrono::Local),
        }
    }

    pub fn now() -> Self {
        FIXED_NOW
            .try_with(|t| *t)
            .unwrap_or_else(|_| chrono::Local::now().into())
    }

    #[cfg(test)]
    pub fn from_iso(iso8601: &str) -> anyhow::Result<Self> {
        Ok(chrono::DateTime::parse_from_rfc3339(iso8601)?.into())
    }

    //wall-clock time of day as shown next to notifications, e.g. "9:05:13 AM"
    pub fn to_local_time_string(&self) -> String {
        self.delegate.format("%-I:%M:%S %p").to_string()
    }
}

impl<T: chrono::TimeZone> From<chrono::DateTime<T>> for DateTime {
    fn from(val: chrono::DateTime<T>) -> Self {
        DateTime::new(val)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn local_time_string_uses_twelve_hour_clock() {
        let dt: DateTime = chrono::Local.with_ymd_and_hms(2024, 5, 1, 21, 7, 3).unwrap().into();

        assert_eq!(dt.to_local_time_string(), "9:07:03 PM");
    }

    #[test]
    fn iso_strings_with_offsets_denote_the_same_instant() {
        let utc = DateTime::from_iso("2024-11-03T15:23:46Z").unwrap();
        let cet = DateTime::from_iso("2024-11-03T16:23:46+01:00").unwrap();

        assert_eq!(utc, cet);
        assert!(DateTime::from_iso("yesterday").is_err());
    }

    #[tokio::test]
    async fn now_can_be_fixed_for_a_task() {
        let fixed = DateTime::from_iso("2024-01-01T08:00:00Z").unwrap();

        let now = FIXED_NOW.scope(fixed, async { DateTime::now() }).await;

        assert_eq!(now, fixed);
    }
}
