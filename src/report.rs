use crate::types::PullRequest;
use anyhow::{anyhow, Context};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use std::fmt;
use std::str::FromStr;

const CSV_HEADER: &str = "PR,reviewers,opened,merged,cycle time";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar month in UTC, used as the half-open window `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportMonth {
    first_day: NaiveDate,
    next_first_day: NaiveDate,
}

impl ReportMonth {
    pub fn new(year: i32, month: u32) -> anyhow::Result<Self> {
        let first_day = NaiveDate::from_ymd_opt(year, month, 1)
            .with_context(|| format!("invalid report month {}-{:02}", year, month))?;
        let next_first_day = first_day
            .checked_add_months(Months::new(1))
            .with_context(|| format!("report month {}-{:02} is out of range", year, month))?;

        Ok(Self {
            first_day,
            next_first_day,
        })
    }

    /// First instant of the month.
    pub fn start(&self) -> DateTime<Utc> {
        self.first_day.and_time(NaiveTime::MIN).and_utc()
    }

    /// First instant of the following month.
    pub fn end(&self) -> DateTime<Utc> {
        self.next_first_day.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start() && instant < self.end()
    }
}

impl fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.first_day.year(), self.first_day.month())
    }
}

impl FromStr for ReportMonth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .filter(|(year, month)| is_digits(year, 4) && is_digits(month, 2))
            .ok_or_else(|| anyhow!("report month '{}' is not in YYYY-MM form", s))?;
        let year = year
            .parse()
            .with_context(|| format!("invalid year in report month '{}'", s))?;
        let month = month
            .parse()
            .with_context(|| format!("invalid month in report month '{}'", s))?;
        Self::new(year, month)
    }
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// Keeps the pull requests merged within `month`, oldest merge first.
pub fn filter_and_sort<'a>(prs: &'a [PullRequest], month: &ReportMonth) -> Vec<&'a PullRequest> {
    let mut kept: Vec<&PullRequest> = prs
        .iter()
        .filter(|pr| month.contains(pr.merged_at))
        .collect();
    kept.sort_by_key(|pr| pr.merged_at);

    tracing::debug!(
        month = %month,
        kept = kept.len(),
        total = prs.len(),
        "Filtered pull requests to report month"
    );

    kept
}

/// Renders the cycle-time CSV for the pull requests merged within `month`.
///
/// Columns are the PR number, the number of distinct approvers, the creation and merge
/// dates (`YYYY-MM-DD`), and the time from creation to merge.
pub fn render(prs: &[PullRequest], month: &ReportMonth) -> String {
    let mut csv = String::new();
    csv.push_str(CSV_HEADER);
    csv.push('\n');

    for pr in filter_and_sort(prs, month) {
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            pr.id,
            pr.reviewer_count(),
            pr.created_at.format(DATE_FORMAT),
            pr.merged_at.format(DATE_FORMAT),
            format_cycle_time(pr.cycle_time()),
        ));
    }

    csv
}

/// Formats a duration as hours, minutes and seconds, e.g. `504h30m0s`.
///
/// Leading zero units are dropped (`30m5s`, `7s`) and a zero duration renders as `0s`.
/// Sub-second precision is truncated; GitHub timestamps carry whole seconds.
pub fn format_cycle_time(duration: Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}{}h{}m{}s", sign, hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}{}m{}s", sign, minutes, seconds)
    } else {
        format!("{}{}s", sign, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn merged(id: u64, merged_at: DateTime<Utc>) -> PullRequest {
        PullRequest {
            id,
            created_at: merged_at - Duration::hours(1),
            merged_at,
            reviewers: HashSet::new(),
        }
    }

    fn august() -> ReportMonth {
        ReportMonth::new(2022, 8).unwrap()
    }

    fn body_lines(csv: &str) -> Vec<&str> {
        csv.lines().skip(1).collect()
    }

    #[test]
    fn test_month_bounds() {
        let month = august();
        assert_eq!(month.start(), at(2022, 8, 1, 0, 0, 0));
        assert_eq!(month.end(), at(2022, 9, 1, 0, 0, 0));

        let december: ReportMonth = "2022-12".parse().unwrap();
        assert_eq!(december.end(), at(2023, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_month_parse_rejects_garbage() {
        assert!("2022".parse::<ReportMonth>().is_err());
        assert!("2022-00".parse::<ReportMonth>().is_err());
        assert!("twenty-08".parse::<ReportMonth>().is_err());
        assert!("2022-8".parse::<ReportMonth>().is_err());
        assert!("+2022-08".parse::<ReportMonth>().is_err());
        assert!("22-08".parse::<ReportMonth>().is_err());
        assert!("2022-08-01".parse::<ReportMonth>().is_err());
    }

    #[test]
    fn test_filter_keeps_half_open_window() {
        let prs = vec![
            merged(1, at(2022, 7, 31, 23, 59, 59)),
            merged(2, at(2022, 8, 1, 0, 0, 0)),
            merged(3, at(2022, 8, 31, 23, 59, 59)),
            merged(4, at(2022, 9, 1, 0, 0, 0)),
        ];

        let kept: Vec<u64> = filter_and_sort(&prs, &august())
            .iter()
            .map(|pr| pr.id)
            .collect();

        assert_eq!(kept, vec![2, 3]);
    }

    #[test]
    fn test_rows_sorted_by_merge_date() {
        let prs = vec![
            merged(15, at(2022, 8, 15, 10, 0, 0)),
            merged(2, at(2022, 8, 2, 10, 0, 0)),
            merged(20, at(2022, 8, 20, 10, 0, 0)),
        ];

        let csv = render(&prs, &august());
        let merge_dates: Vec<&str> = body_lines(&csv)
            .iter()
            .map(|line| line.split(',').nth(3).unwrap())
            .collect();

        assert_eq!(merge_dates, vec!["2022-08-02", "2022-08-15", "2022-08-20"]);
    }

    #[test]
    fn test_render_row_format() {
        let pr = PullRequest {
            id: 1234,
            created_at: at(2022, 8, 1, 0, 0, 0),
            merged_at: at(2022, 8, 3, 12, 30, 0),
            reviewers: ["alice", "bob"].iter().map(|s| s.to_string()).collect(),
        };

        let csv = render(&[pr], &august());

        assert_eq!(
            csv,
            "PR,reviewers,opened,merged,cycle time\n1234,2,2022-08-01,2022-08-03,60h30m0s\n"
        );
    }

    #[test]
    fn test_render_empty_is_header_only() {
        let csv = render(&[merged(1, at(2022, 7, 1, 0, 0, 0))], &august());
        assert_eq!(csv, "PR,reviewers,opened,merged,cycle time\n");
    }

    #[test]
    fn test_render_is_idempotent() {
        let prs = vec![
            merged(3, at(2022, 8, 9, 1, 0, 0)),
            merged(1, at(2022, 8, 9, 1, 0, 0)),
            merged(2, at(2022, 8, 4, 1, 0, 0)),
        ];

        assert_eq!(render(&prs, &august()), render(&prs, &august()));
    }

    #[test]
    fn test_format_cycle_time() {
        assert_eq!(format_cycle_time(Duration::zero()), "0s");
        assert_eq!(format_cycle_time(Duration::seconds(7)), "7s");
        assert_eq!(format_cycle_time(Duration::seconds(30 * 60 + 5)), "30m5s");
        assert_eq!(
            format_cycle_time(Duration::hours(504) + Duration::minutes(30)),
            "504h30m0s"
        );
        assert_eq!(format_cycle_time(Duration::seconds(-90)), "-1m30s");
    }
}
