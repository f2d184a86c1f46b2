//! Capture-date extraction.
//!
//! The embedded EXIF `DateTimeOriginal` tag wins; when it is absent the base
//! file name is searched for a `YYYY[-:]MM[-:]DD` date optionally followed by
//! an `HH[:]MM[:]SS` time.

use exif::{In, Reader, Tag, Value};
use regex::Regex;
use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:20|19)\d\d)[:-]?([01]\d)[:-]?([0-3]\d)").expect("date pattern compiles")
});

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([012]\d):?([0-5]\d):?([0-5]\d)").expect("time pattern compiles")
});

const DEFAULT_TIME: NameTime<'static> = NameTime {
    hour: "00",
    minute: "00",
    second: "00",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameDate<'a> {
    pub year: &'a str,
    pub month: &'a str,
    pub day: &'a str,
    /// Byte offset just past the matched date.
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameTime<'a> {
    pub hour: &'a str,
    pub minute: &'a str,
    pub second: &'a str,
}

pub fn date_from_name(name: &str) -> Option<NameDate<'_>> {
    let caps = DATE_RE.captures(name)?;
    Some(NameDate {
        year: caps.get(1)?.as_str(),
        month: caps.get(2)?.as_str(),
        day: caps.get(3)?.as_str(),
        end: caps.get(0)?.end(),
    })
}

pub fn time_from_name(rest: &str) -> Option<NameTime<'_>> {
    let caps = TIME_RE.captures(rest)?;
    Some(NameTime {
        hour: caps.get(1)?.as_str(),
        minute: caps.get(2)?.as_str(),
        second: caps.get(3)?.as_str(),
    })
}

/// `YYYY:MM:DD HH:MM:SS` from a file name, defaulting the time to midnight.
pub fn name_date(name: &str) -> Option<String> {
    let date = date_from_name(name)?;
    let time = time_from_name(&name[date.end..]).unwrap_or(DEFAULT_TIME);
    Some(format!(
        "{}:{}:{} {}:{}:{}",
        date.year, date.month, date.day, time.hour, time.minute, time.second
    ))
}

/// Raw `DateTimeOriginal` value from an image container, if present.
pub fn exif_date(bytes: &[u8]) -> Option<String> {
    let mut cursor = Cursor::new(bytes);
    let exif = match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(err) => {
            debug!(error = %err, "no readable exif block");
            return None;
        }
    };
    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    let Value::Ascii(ref values) = field.value else {
        return None;
    };
    let raw = values.first()?;
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Capture date for a file whose contents are already in memory.
pub fn capture_date(path: &Path, bytes: &[u8]) -> Option<String> {
    if let Some(date) = exif_date(bytes) {
        return Some(date);
    }
    let name = path.file_name()?.to_string_lossy();
    name_date(&name)
}
