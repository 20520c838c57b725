use chrono::{Datelike, NaiveDate};

/// A batch can never sit outside semesters 1..=8 of its four-year course.
pub const MIN_SEMESTER: i32 = 1;
pub const MAX_SEMESTER: i32 = 8;

/// Academic years begin in July; January through June belong to the even
/// semester of the academic year that started the previous July.
const ACADEMIC_YEAR_START_MONTH: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemesterDateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Pull the start year out of a batch name like `"2023-2027 A"`.
///
/// The text before the first space must be exactly two dash-separated
/// pieces; only the first piece has to parse as a year.
pub fn batch_start_year(batch_name: &str) -> Option<i32> {
    let year_part = batch_name.split(' ').next().unwrap_or("");
    let pieces: Vec<&str> = year_part.split('-').collect();
    if pieces.len() != 2 {
        return None;
    }
    pieces[0].parse::<i32>().ok()
}

/// Which semester a batch is sitting in on `today`, derived from the batch
/// name alone. Malformed names degrade to semester 1 rather than erroring,
/// so a mistyped batch still renders everywhere.
pub fn calculate_current_semester_for_batch(batch_name: &str, today: NaiveDate) -> i32 {
    let start_year = match batch_start_year(batch_name) {
        Some(year) => year,
        None => return MIN_SEMESTER,
    };

    // Wide arithmetic: an absurd year in a batch name must clamp, not
    // overflow.
    let academic_year_offset = today.year() as i64 - start_year as i64;

    let semester = if today.month() < ACADEMIC_YEAR_START_MONTH {
        // Jan-June: even semester of the academic year that started last July.
        academic_year_offset * 2
    } else {
        // July-Dec: odd semester of the academic year starting this July.
        academic_year_offset * 2 + 1
    };

    semester.clamp(MIN_SEMESTER as i64, MAX_SEMESTER as i64) as i32
}

/// The calendar range covered by `semester` of the named batch.
///
/// Odd semesters run July 1 to Dec 31 of `startYear + offset`; even
/// semesters run Jan 1 to June 30 of the following year. Any parse or
/// date failure falls back to the full span of `today`'s calendar year.
pub fn semester_date_range(batch_name: &str, semester: i32, today: NaiveDate) -> SemesterDateRange {
    let fallback = SemesterDateRange {
        from: NaiveDate::from_ymd_opt(today.year(), 1, 1).expect("January 1st always exists"),
        to: NaiveDate::from_ymd_opt(today.year(), 12, 31).expect("December 31st always exists"),
    };

    let start_year = match batch_start_year(batch_name) {
        Some(year) => year,
        None => return fallback,
    };

    let academic_year_offset = (semester as i64 - 1).div_euclid(2);
    let is_odd_semester = semester % 2 != 0;

    let year = start_year as i64
        + academic_year_offset
        + if is_odd_semester { 0 } else { 1 };
    let year = match i32::try_from(year) {
        Ok(year) => year,
        Err(_) => return fallback,
    };

    let range = if is_odd_semester {
        NaiveDate::from_ymd_opt(year, 7, 1).zip(NaiveDate::from_ymd_opt(year, 12, 31))
    } else {
        NaiveDate::from_ymd_opt(year, 1, 1).zip(NaiveDate::from_ymd_opt(year, 6, 30))
    };

    match range {
        Some((from, to)) => SemesterDateRange { from, to },
        None => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_none, assert_some_eq};
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn start_year_parses_with_and_without_section() {
        assert_some_eq!(batch_start_year("2023-2027"), 2023);
        assert_some_eq!(batch_start_year("2023-2027 A"), 2023);
    }

    #[test]
    fn start_year_rejects_malformed_names() {
        assert_none!(batch_start_year("abc"));
        assert_none!(batch_start_year("2023"));
        assert_none!(batch_start_year("2023-2025-2027"));
        assert_none!(batch_start_year("twenty-23 A"));
    }

    #[test]
    fn first_half_of_year_is_even_semester() {
        // 2023 batch evaluated in March 2025: (2025-2023)*2 = 4.
        assert_eq!(
            calculate_current_semester_for_batch("2023-2027", date(2025, 3, 15)),
            4
        );
    }

    #[test]
    fn second_half_of_year_is_odd_semester() {
        // Same batch in September 2025: (2025-2023)*2+1 = 5.
        assert_eq!(
            calculate_current_semester_for_batch("2023-2027", date(2025, 9, 1)),
            5
        );
    }

    #[test]
    fn freshly_started_batch_clamps_to_first_semester() {
        // Spring before the course even starts would be semester 0.
        assert_eq!(
            calculate_current_semester_for_batch("2025-2029", date(2025, 2, 1)),
            1
        );
    }

    #[test]
    fn graduated_batch_clamps_to_eighth_semester() {
        assert_eq!(
            calculate_current_semester_for_batch("2010-2014", date(2025, 9, 1)),
            8
        );
    }

    #[test]
    fn malformed_name_defaults_to_semester_one() {
        assert_eq!(calculate_current_semester_for_batch("abc", date(2025, 3, 1)), 1);
        assert_eq!(calculate_current_semester_for_batch("", date(2025, 3, 1)), 1);
    }

    #[test]
    fn odd_semester_range_is_second_half_of_calendar_year() {
        let range = semester_date_range("2023-2027", 5, date(2025, 9, 1));
        assert_eq!(range.from, date(2025, 7, 1));
        assert_eq!(range.to, date(2025, 12, 31));
    }

    #[test]
    fn even_semester_range_is_first_half_of_next_calendar_year() {
        let range = semester_date_range("2023-2027", 4, date(2025, 3, 1));
        assert_eq!(range.from, date(2025, 1, 1));
        assert_eq!(range.to, date(2025, 6, 30));
    }

    #[test]
    fn malformed_name_falls_back_to_current_calendar_year() {
        let range = semester_date_range("abc", 3, date(2025, 3, 1));
        assert_eq!(range.from, date(2025, 1, 1));
        assert_eq!(range.to, date(2025, 12, 31));
    }

    #[quickcheck]
    fn semester_is_always_in_valid_band(start: u16, year: u16, month: u8, day: u8) -> TestResult {
        let start_year = 1950 + (start % 150) as i32;
        let today_year = 1950 + (year % 150) as i32;
        let month = 1 + (month % 12) as u32;
        let day = 1 + (day % 28) as u32;

        let name = format!("{}-{}", start_year, start_year + 4);
        let today = match NaiveDate::from_ymd_opt(today_year, month, day) {
            Some(d) => d,
            None => return TestResult::discard(),
        };

        let semester = calculate_current_semester_for_batch(&name, today);
        TestResult::from_bool((MIN_SEMESTER..=MAX_SEMESTER).contains(&semester))
    }

    #[quickcheck]
    fn date_range_never_inverts(start: u16, semester: i8) -> bool {
        let start_year = 1950 + (start % 150) as i32;
        let name = format!("{}-{}", start_year, start_year + 4);
        let range = semester_date_range(&name, semester as i32, date(2025, 6, 1));
        range.from <= range.to
    }
}
