//! Normalized bill identifiers.
//!
//! Path form is `1234-2020` for an Introduction and `res-1234-2020` for a
//! Resolution. Upstream the same bill is filed as `Int 1234-2020` or
//! `Res 1234-2020`. A `BillId` can only be built through validation, so an
//! instance is always safe to hand to a cache.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// Prefix marking a resolution in path form.
const RESOLUTION_PREFIX: &str = "res-";

/// Sequence numbers are assigned from 1 within a session.
const MAX_SEQUENCE: u16 = 3500;

/// Earliest session year with records in the upstream system.
const MIN_YEAR: u16 = 1996;

static FILE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-((?:19|20)[9012][0-9])$").expect("file number pattern is valid"));

/// Kind of legislation, selected by the path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillKind {
    Introduction,
    Resolution,
}

impl BillKind {
    /// Matter type name used by the records API.
    pub fn type_name(self) -> &'static str {
        match self {
            BillKind::Introduction => "Introduction",
            BillKind::Resolution => "Resolution",
        }
    }

    fn file_prefix(self) -> &'static str {
        match self {
            BillKind::Introduction => "Int ",
            BillKind::Resolution => "Res ",
        }
    }
}

/// Validated bill identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BillId {
    kind: BillKind,
    number: u16,
    year: u16,
}

impl BillId {
    /// Parse a path segment such as `1234-2020` or `res-0012-2022`.
    pub fn parse(segment: &str) -> Result<Self, Error> {
        Self::parse_with_year(segment, current_year())
    }

    /// Parse an upstream file number such as `Int 1234-2020`.
    ///
    /// Older entries carry an amendment suffix (`Int 0349-1998-A`) which is
    /// dropped.
    pub fn from_file(file: &str) -> Result<Self, Error> {
        let (kind, rest) = if let Some(rest) = file.strip_prefix("Res ") {
            (BillKind::Resolution, rest)
        } else if let Some(rest) = file.strip_prefix("Int ") {
            (BillKind::Introduction, rest)
        } else {
            return Err(Error::InvalidId(format!("invalid file number {file:?}")));
        };

        let rest = match rest.match_indices('-').nth(1) {
            Some((idx, _)) => &rest[..idx],
            None => rest,
        };

        let (number, year) = validate_file_number(rest, current_year())
            .ok_or_else(|| Error::InvalidId(format!("invalid file number {file:?}")))?;
        Ok(Self { kind, number, year })
    }

    fn parse_with_year(segment: &str, current_year: u16) -> Result<Self, Error> {
        let (kind, rest) = match segment.strip_prefix(RESOLUTION_PREFIX) {
            Some(rest) => (BillKind::Resolution, rest),
            None => (BillKind::Introduction, segment),
        };
        let (number, year) = validate_file_number(rest, current_year)
            .ok_or_else(|| Error::InvalidId(format!("invalid bill id {segment:?}")))?;
        Ok(Self { kind, number, year })
    }

    pub fn kind(&self) -> BillKind {
        self.kind
    }

    /// Sequence number without the session year.
    pub fn file_number(&self) -> u16 {
        self.number
    }

    /// Session year of the legislation.
    pub fn year(&self) -> u16 {
        self.year
    }

    /// File number in the upstream form, e.g. `Int 1234-2020`.
    pub fn file(&self) -> String {
        format!("{}{:04}-{}", self.kind.file_prefix(), self.number, self.year)
    }
}

/// Validate the `NNNN-YYYY` part of an identifier.
fn validate_file_number(s: &str, current_year: u16) -> Option<(u16, u16)> {
    let caps = FILE_NUMBER.captures(s)?;
    let number: u16 = caps[1].parse().ok()?;
    let year: u16 = caps[2].parse().ok()?;
    if !(1..=MAX_SEQUENCE).contains(&number) {
        return None;
    }
    if year < MIN_YEAR || year > current_year {
        return None;
    }
    Some((number, year))
}

fn current_year() -> u16 {
    u16::try_from(chrono::Local::now().year()).unwrap_or(u16::MAX)
}

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == BillKind::Resolution {
            f.write_str(RESOLUTION_PREFIX)?;
        }
        write!(f, "{:04}-{}", self.number, self.year)
    }
}

impl FromStr for BillId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for BillId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BillId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        BillId::parse(&s).map_err(serde::de::Error::custom)
    }
}
