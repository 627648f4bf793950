//! Nursing-record text: split by date, turn lines into keyword/detail items
//! and describe what changed from one date to the next.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Keyword given to lines that have no `keyword: detail` shape.
pub const UNKEYED: &str = "note";

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[-./](\d{1,2})[-./](\d{1,2})\.?(?P<rest>\D.*)?$")
        .expect("numeric date pattern compiles")
});

static KOREAN_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})\s*년\s*(\d{1,2})\s*월\s*(\d{1,2})\s*일(?P<rest>.*)$")
        .expect("korean date pattern compiles")
});

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not read PDF: {0}")]
    Pdf(#[from] pdf_extract::OutputError),
}

/// One line of a day's record. Lines without a `keyword: detail` shape
/// serialize with the keyword `note` but never compare as keyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NursingNoteItem {
    pub keyword: String,
    pub detail: String,
    #[serde(skip)]
    keyed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NursingNote {
    pub date: String,
    pub items: Vec<NursingNoteItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added(NursingNoteItem),
    Removed(NursingNoteItem),
    Changed {
        keyword: String,
        before: String,
        after: String,
    },
}

impl NursingNoteItem {
    /// Splits on the first `:` (or full-width `：`) that is not part of a clock time.
    pub fn from_line(line: &str) -> Self {
        let line = line.trim();
        match split_keyword(line) {
            Some((keyword, detail)) if !keyword.is_empty() && !detail.is_empty() => {
                Self::keyed(keyword, detail)
            }
            _ => Self::unkeyed(line),
        }
    }

    pub fn keyed(keyword: &str, detail: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            detail: detail.to_string(),
            keyed: true,
        }
    }

    pub fn unkeyed(line: &str) -> Self {
        Self {
            keyword: UNKEYED.to_string(),
            detail: line.to_string(),
            keyed: false,
        }
    }

    pub fn is_keyed(&self) -> bool {
        self.keyed
    }
}

impl fmt::Display for NursingNoteItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_keyed() {
            write!(f, "{}: {}", self.keyword, self.detail)
        } else {
            f.write_str(&self.detail)
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added(item) => write!(f, "+ {item}"),
            Self::Removed(item) => write!(f, "- {item}"),
            Self::Changed {
                keyword,
                before,
                after,
            } => write!(f, "~ {keyword}: {before} -> {after}"),
        }
    }
}

fn split_keyword(line: &str) -> Option<(&str, &str)> {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    for (i, &(pos, c)) in chars.iter().enumerate() {
        if c != ':' && c != '：' {
            continue;
        }
        let digit_before = i > 0 && chars[i - 1].1.is_ascii_digit();
        let digit_after = chars.get(i + 1).is_some_and(|(_, next)| next.is_ascii_digit());
        if digit_before && digit_after {
            continue;
        }
        return Some((line[..pos].trim(), line[pos + c.len_utf8()..].trim()));
    }
    None
}

fn match_date(line: &str) -> Option<(NaiveDate, &str)> {
    for pattern in [&*NUMERIC_DATE, &*KOREAN_DATE] {
        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let rest = caps.name("rest").map_or("", |m| m.as_str()).trim();
        return Some((date, rest));
    }
    None
}

/// Groups record lines under the date that precedes them.
///
/// A line opening with a date starts (or continues) that date's section and the
/// remainder of the line becomes its first entry. Lines before the first date
/// are dropped and whitespace inside a line is collapsed.
pub fn parse_by_date(text: &str) -> BTreeMap<NaiveDate, Vec<String>> {
    let mut sections: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    let mut current = None;

    for raw in text.lines() {
        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            continue;
        }

        if let Some((date, rest)) = match_date(&line) {
            current = Some(date);
            let entries = sections.entry(date).or_default();
            if !rest.is_empty() {
                entries.push(rest.to_string());
            }
            continue;
        }

        if let Some(date) = current {
            sections.entry(date).or_default().push(line);
        }
    }

    sections
}

/// Differences between two days of items.
///
/// A keyword is compared through its first occurrence on each day; repeated
/// keywords and unkeyed lines only count as added or removed.
pub fn diff_items(previous: &[NursingNoteItem], current: &[NursingNoteItem]) -> Vec<Change> {
    let prev_first = first_by_keyword(previous);
    let cur_first = first_by_keyword(current);
    let mut changes = Vec::new();

    let mut seen = HashSet::new();
    for item in current {
        if item.is_keyed() && seen.insert(item.keyword.as_str()) {
            match prev_first.get(item.keyword.as_str()) {
                Some(before) if *before == item.detail => {}
                Some(before) => changes.push(Change::Changed {
                    keyword: item.keyword.clone(),
                    before: (*before).to_string(),
                    after: item.detail.clone(),
                }),
                None => changes.push(Change::Added(item.clone())),
            }
        } else if !previous.contains(item) {
            changes.push(Change::Added(item.clone()));
        }
    }

    let mut seen = HashSet::new();
    for item in previous {
        if item.is_keyed() && seen.insert(item.keyword.as_str()) {
            if !cur_first.contains_key(item.keyword.as_str()) {
                changes.push(Change::Removed(item.clone()));
            }
        } else if !current.contains(item) {
            changes.push(Change::Removed(item.clone()));
        }
    }

    changes
}

fn first_by_keyword(items: &[NursingNoteItem]) -> HashMap<&str, &str> {
    let mut map = HashMap::new();
    for item in items.iter().filter(|i| i.is_keyed()) {
        map.entry(item.keyword.as_str())
            .or_insert(item.detail.as_str());
    }
    map
}

/// Human-readable change log: the first date in full, later dates as diffs.
pub fn compare_changes_with_text(parsed: &BTreeMap<NaiveDate, Vec<String>>) -> String {
    let mut out = Vec::new();
    let mut previous: Option<Vec<NursingNoteItem>> = None;

    for (date, lines) in parsed {
        let items: Vec<NursingNoteItem> =
            lines.iter().map(|l| NursingNoteItem::from_line(l)).collect();
        out.push(format!("[{date}]"));

        match &previous {
            None => out.extend(lines.iter().map(|line| format!("  {line}"))),
            Some(prev) => {
                let changes = diff_items(prev, &items);
                if changes.is_empty() {
                    out.push("  (no changes)".to_string());
                }
                out.extend(changes.iter().map(|change| format!("  {change}")));
            }
        }

        previous = Some(items);
    }

    out.join("\n")
}

pub fn build_nursing_notes(text: &str) -> Vec<NursingNote> {
    parse_by_date(text)
        .into_iter()
        .map(|(date, lines)| NursingNote {
            date: date.format("%Y-%m-%d").to_string(),
            items: lines.iter().map(|l| NursingNoteItem::from_line(l)).collect(),
        })
        .collect()
}

pub fn extract_text_from_pdf(path: &Path) -> Result<String, ExtractError> {
    Ok(pdf_extract::extract_text(path)?)
}

pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<String, ExtractError> {
    Ok(pdf_extract::extract_text_from_mem(bytes)?)
}
