use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ScheduleEntry {
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

/// A grid row key in its raw `start-end` form. Rows match on the exact key;
/// the bounds are split out only when a cell is read back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval(String);

/// Address of one grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub day: String,
    pub interval: Interval,
}

impl ScheduleEntry {
    pub fn new(
        day: impl Into<String>,
        group: impl Into<String>,
        subject: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        ScheduleEntry {
            day: day.into(),
            group: group.into(),
            subject: subject.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start.clone(), self.end.clone())
    }

    pub fn cell_key(&self) -> CellKey {
        CellKey::new(self.day.clone(), self.interval())
    }

    /// Rendered cell contents: subject on the first line, group on the second.
    pub fn cell_text(&self) -> String {
        format!("{}\n{}", self.subject, self.group)
    }

    fn from_fields(fields: &[&str]) -> Option<Self> {
        if fields.len() < 5 {
            return None;
        }
        let entry = ScheduleEntry::new(
            fields[0].trim(),
            fields[1].trim(),
            fields[2].trim(),
            fields[3].trim(),
            fields[4].trim(),
        );
        if entry.day.is_empty() {
            return None;
        }
        if entry.group.is_empty()
            && entry.subject.is_empty()
            && entry.start.is_empty()
            && entry.end.is_empty()
        {
            return None;
        }
        Some(entry)
    }
}

impl Interval {
    pub fn new(start: impl AsRef<str>, end: impl AsRef<str>) -> Self {
        Interval(format!("{}-{}", start.as_ref(), end.as_ref()))
    }

    /// Wraps a row identifier as written, without normalising it.
    pub fn from_key(raw: impl Into<String>) -> Self {
        Interval(raw.into())
    }

    pub fn key(&self) -> &str {
        &self.0
    }

    /// Splits the key on `-`. The first two parts are trimmed, missing parts
    /// are empty and anything after the second `-` is ignored.
    pub fn bounds(&self) -> (String, String) {
        let mut parts = self.0.split('-');
        let start = parts.next().unwrap_or_default().trim();
        let end = parts.next().unwrap_or_default().trim();
        (start.to_string(), end.to_string())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl CellKey {
    pub fn new(day: impl Into<String>, interval: Interval) -> Self {
        CellKey {
            day: day.into(),
            interval,
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day, self.interval)
    }
}

/// Parses `day;group;subject;start;end` lines. Malformed lines are skipped.
pub fn parse_delimited_text(text: &str) -> Vec<ScheduleEntry> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(';').collect();
            ScheduleEntry::from_fields(&fields)
        })
        .collect()
}

/// Inverse of [`parse_delimited_text`]. Values are written as-is: a `;` or a
/// line break inside a field will not survive a round trip.
pub fn encode_to_delimited_text(entries: &[ScheduleEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            [
                e.day.as_str(),
                e.group.as_str(),
                e.subject.as_str(),
                e.start.as_str(),
                e.end.as_str(),
            ]
            .join(";")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_example_line() {
        let entries = parse_delimited_text("Mon;9A;Math;08:00;09:00");
        assert_eq!(
            entries,
            vec![ScheduleEntry::new("Mon", "9A", "Math", "08:00", "09:00")]
        );
        assert_eq!(entries[0].interval().key(), "08:00-09:00");
    }

    #[test]
    fn skips_malformed_and_blank_lines() {
        let text = "\n\
            Mon;9A;Math;08:00\n\
            \t  \n\
            ;9A;Math;08:00;09:00\n\
            Tue;;;;\n\
            Wed ; 7B ; History ; 10:00 ; 11:00 ;extra\r\n";
        let entries = parse_delimited_text(text);
        assert_eq!(
            entries,
            vec![ScheduleEntry::new("Wed", "7B", "History", "10:00", "11:00")]
        );
    }

    #[test]
    fn keeps_line_with_only_some_fields() {
        let entries = parse_delimited_text("Fri;;Lab;;");
        assert_eq!(entries, vec![ScheduleEntry::new("Fri", "", "Lab", "", "")]);
    }

    #[test]
    fn round_trips_plain_values() {
        let entries = vec![
            ScheduleEntry::new("Mon", "9A", "Math", "08:00", "09:00"),
            ScheduleEntry::new("Tue", "", "Physics", "09:00", "10:00"),
            ScheduleEntry::new("Mon", "9A", "Math", "08:00", "09:00"),
        ];
        let text = encode_to_delimited_text(&entries);
        assert_eq!(
            text,
            "Mon;9A;Math;08:00;09:00\nTue;;Physics;09:00;10:00\nMon;9A;Math;08:00;09:00"
        );
        assert_eq!(parse_delimited_text(&text), entries);
    }

    #[test]
    fn delimiter_inside_field_is_not_escaped() {
        let entries = vec![ScheduleEntry::new("Mon", "9A;9B", "Math", "08:00", "09:00")];
        let parsed = parse_delimited_text(&encode_to_delimited_text(&entries));
        assert_ne!(parsed, entries);
        assert_eq!(parsed[0].group, "9A");
        assert_eq!(parsed[0].subject, "9B");
    }

    #[test]
    fn interval_bounds_handle_missing_parts() {
        let bounds = |raw: &str| Interval::from_key(raw).bounds();
        assert_eq!(bounds("08:00-09:00"), ("08:00".into(), "09:00".into()));
        assert_eq!(bounds(" 08:00 - 09:00 "), ("08:00".into(), "09:00".into()));
        assert_eq!(bounds("08:00"), ("08:00".into(), String::new()));
        assert_eq!(bounds(""), (String::new(), String::new()));
        assert_eq!(bounds("a-b-c"), ("a".into(), "b".into()));
    }

    #[test]
    fn interval_key_is_kept_verbatim() {
        assert_eq!(Interval::from_key("08:00-09:00"), Interval::new("08:00", "09:00"));
        assert_ne!(Interval::from_key(" 08:00 - 09:00 "), Interval::new("08:00", "09:00"));
        assert_eq!(Interval::from_key("08:00 - 09:00-extra").key(), "08:00 - 09:00-extra");
    }

    #[test]
    fn empty_fields_default_when_deserializing() {
        let entry: ScheduleEntry = serde_yaml::from_str("day: Mon\nsubject: Art\n").unwrap();
        assert_eq!(entry, ScheduleEntry::new("Mon", "", "Art", "", ""));
    }
}
