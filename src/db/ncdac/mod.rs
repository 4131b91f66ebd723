//! NC DAC Offender Public Information (OPI) data: download the zip files,
//! load them into SQLite, and cut the database down to recent records.

pub mod build;
pub mod description;
pub mod downsize;
pub mod lib_opi;
pub mod opi_archive;

use std::borrow::Cow;

use jiff::civil::{Date, DateTime};

/// Formats seen in the raw files besides ISO dates.
const DATE_FORMATS: [&str; 4] = ["%m/%d/%Y", "%Y%m%d", "%m-%d-%Y", "%Y/%m/%d"];

/// Columns holding the date a record was last updated, e.g. `DTOFUPDT` in
/// the offender profile table.
pub fn is_update_column(name: &str) -> bool {
    let name = name.to_ascii_uppercase();
    name.contains("UPDT") || name.contains("UPDATE")
}

/// Names of update-date columns preferred over other candidates when a table
/// has several.
const UPDATE_DATE_NAMES: [&str; 3] = ["DTOFUPDT", "UPDATE_DATE", "UPDATEDATE"];

/// Candidate update columns whose exact name marks them as the update date.
pub fn is_preferred_update_column(name: &str) -> bool {
    let name = name.to_ascii_uppercase();
    UPDATE_DATE_NAMES.contains(&name.as_str())
}

/// True for a value already stored as `YYYY-MM-DD`.
pub fn is_iso_date(s: &str) -> bool {
    normalize_date(s).is_some_and(|d| d == s)
}

/// Decode a line of a raw file.  Valid UTF-8 is used as is, anything else is
/// read as ISO-8859-1 so that every byte maps to exactly one character and
/// fixed-width offsets still line up.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Rewrite a date as `YYYY-MM-DD` so that dates compare as strings in SQL.
/// Blank or unparseable input gives `None`.
pub fn normalize_date(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = s.parse::<Date>() {
        return Some(date.to_string());
    }
    if let Ok(dt) = s.parse::<DateTime>() {
        return Some(dt.date().to_string());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| Date::strptime(fmt, s).ok())
        .map(|date| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_columns() {
        assert!(is_update_column("DTOFUPDT"));
        assert!(is_update_column("update_date"));
        assert!(is_update_column("LastUpdated"));
        assert!(!is_update_column("CMDORNUM"));
        assert!(!is_update_column("date_of_birth"));
        assert!(is_update_column("updated_by"));
        assert!(is_preferred_update_column("dtofupdt"));
        assert!(is_preferred_update_column("Update_Date"));
        assert!(!is_preferred_update_column("updated_by"));
        assert!(!is_preferred_update_column("last_update"));
    }

    #[test]
    fn iso_dates() {
        assert!(is_iso_date("2020-05-05"));
        assert!(!is_iso_date("05/05/2020"));
        assert!(!is_iso_date(" 2020-05-05"));
        assert!(!is_iso_date("alice"));
        assert!(!is_iso_date(""));
    }

    #[test]
    fn decode_latin1() {
        assert_eq!(decode_text("MUÑOZ".as_bytes()), "MUÑOZ");
        assert_eq!(decode_text(b"MU\xd1OZ"), "MUÑOZ");
        assert_eq!(decode_text(b"MU\xd1OZ").chars().count(), 5);
        assert!(matches!(decode_text(b"SMITH"), Cow::Borrowed(_)));
    }

    #[test]
    fn normalize_dates() {
        assert_eq!(normalize_date("2020-05-05"), Some("2020-05-05".to_string()));
        assert_eq!(normalize_date(" 2020-05-05 "), Some("2020-05-05".to_string()));
        assert_eq!(normalize_date("2020-05-05T13:45:00"), Some("2020-05-05".to_string()));
        assert_eq!(normalize_date("06/01/2019"), Some("2019-06-01".to_string()));
        assert_eq!(normalize_date("20210101"), Some("2021-01-01".to_string()));
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("0000-00-00"), None);
        assert_eq!(normalize_date("unknown"), None);
    }
}
