//! Reporting period encoded in export file names, e.g.
//! `Cirrus8 Arrears - Dec 2023.xlsx` or `Excel_Report_Apr 2024.xlsx`.

use chrono::Month;
use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;

static MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s(\d{4})\b").expect("Hardcode regex pattern"));

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReportPeriod {
    pub year: i32,
    /// 1-based month
    pub month: u32,
}

impl ReportPeriod {
    /// Finds the last `<month> <yyyy>` pair in a file name. The month word may
    /// be the tail of an underscore-joined word and is matched by full or
    /// abbreviated name, ignoring case.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        MONTH_YEAR
            .captures_iter(file_name)
            .filter_map(|captures| {
                let word = captures.get(1)?.as_str();
                let month = word.rsplit('_').next()?.parse::<Month>().ok()?;
                let year = captures.get(2)?.as_str().parse::<i32>().ok()?;
                Some(ReportPeriod {
                    year,
                    month: month.number_from_month(),
                })
            })
            .last()
    }

    /// Output file name prefix, e.g. `2024_4_`.
    pub fn prefix(&self) -> String {
        format!("{}_{}_", self.year, self.month)
    }
}

impl Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_name_before_year() {
        let period = ReportPeriod::from_file_name("Cirrus8 Tenancy Schedule (Compact) - March 2024.xlsx");
        assert_eq!(period, Some(ReportPeriod { year: 2024, month: 3 }));
    }

    #[test]
    fn abbreviated_month_in_joined_word() {
        let period = ReportPeriod::from_file_name("Excel_Report_Apr 2024.xlsx").unwrap();
        assert_eq!(period, ReportPeriod { year: 2024, month: 4 });
        assert_eq!(period.prefix(), "2024_4_");
        assert_eq!(period.to_string(), "2024-04");
    }

    #[test]
    fn month_is_case_insensitive() {
        let period = ReportPeriod::from_file_name("arrears - dec 2023.xlsx");
        assert_eq!(period, Some(ReportPeriod { year: 2023, month: 12 }));
    }

    #[test]
    fn last_pair_wins() {
        let period = ReportPeriod::from_file_name("Jan 2023 restated as Feb 2024.xlsx");
        assert_eq!(period, Some(ReportPeriod { year: 2024, month: 2 }));
    }

    #[test]
    fn no_period_in_name() {
        assert_eq!(ReportPeriod::from_file_name("Lease_Expiry_Diary_2024-09-26 01_09_32.xlsx"), None);
        assert_eq!(ReportPeriod::from_file_name("Budget 2024.xlsx"), None);
    }
}
