//! Record normalization and the validity filter.
//!
//! Every function here is total: unparseable or missing values degrade to a
//! default instead of failing, so one bad spreadsheet row never aborts a
//! report.

use crate::config::SeasonConfig;
use crate::types::{RawSalesRecord, SalesRecord, YearSource};
use crate::util::{fold_accents, non_blank};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_FUNNEL: &str = "Sem funil";
pub const DEFAULT_CLOSER: &str = "Não especificado";
pub const DEFAULT_MONTH: &str = "Sem mês";

const TRUE_TOKENS: [&str; 7] = ["sim", "s", "yes", "y", "x", "1", "true"];

/// (number, canonical label, folded full name, abbreviation)
const MONTHS: [(u32, &str, &str, &str); 12] = [
    (1, "Janeiro", "janeiro", "jan"),
    (2, "Fevereiro", "fevereiro", "fev"),
    (3, "Março", "marco", "mar"),
    (4, "Abril", "abril", "abr"),
    (5, "Maio", "maio", "mai"),
    (6, "Junho", "junho", "jun"),
    (7, "Julho", "julho", "jul"),
    (8, "Agosto", "agosto", "ago"),
    (9, "Setembro", "setembro", "set"),
    (10, "Outubro", "outubro", "out"),
    (11, "Novembro", "novembro", "nov"),
    (12, "Dezembro", "dezembro", "dez"),
];

// `%d/%m/%y` comes before `%d/%m/%Y`: chrono's `%Y` also takes one or two digits, so
// "03/06/25" would otherwise read as year 25.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%y", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parsed years before this are typos, not sales calls.
const MIN_PLAUSIBLE_YEAR: i32 = 1970;

static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"20\d{2}").expect("year token pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    True,
    False,
    /// A non-empty value that is not a known "yes" token. Counts as false.
    Unrecognized(String),
}

impl FlagValue {
    pub fn is_true(&self) -> bool {
        matches!(self, FlagValue::True)
    }
}

/// Coerce a yes/no-like cell. Only the known tokens mean true; blanks and
/// explicit negatives (`não`, `n`, `no`, `0`, `false`, `-`) mean false;
/// anything else is reported as unrecognized and also means false.
pub fn parse_flag(raw: Option<&str>) -> FlagValue {
    let Some(value) = non_blank(raw) else {
        return FlagValue::False;
    };
    let folded = fold_accents(value);
    if TRUE_TOKENS.contains(&folded.as_str()) {
        FlagValue::True
    } else if matches!(folded.as_str(), "nao" | "n" | "no" | "0" | "false" | "-") {
        FlagValue::False
    } else {
        FlagValue::Unrecognized(value.to_string())
    }
}

/// Month number (1–12) for a Portuguese month name or three-letter
/// abbreviation, case- and accent-insensitive.
pub fn month_number(label: &str) -> Option<u32> {
    let folded = fold_accents(label.trim());
    let folded = folded.trim_end_matches('.');
    MONTHS
        .iter()
        .find(|(_, _, full, abbr)| folded == *full || folded == *abbr)
        .map(|(n, _, _, _)| *n)
}

/// Canonical label used in month keys: recognized months get their full
/// capitalized name, other labels are kept as typed.
pub fn canonical_month(label: Option<&str>) -> (String, Option<u32>) {
    let Some(label) = non_blank(label) else {
        return (DEFAULT_MONTH.to_string(), None);
    };
    match month_number(label) {
        Some(n) => (MONTHS[(n - 1) as usize].1.to_string(), Some(n)),
        None => (label.to_string(), None),
    }
}

/// Year from a date-like string, trying the formats the table has been seen
/// to carry.
pub fn parse_date_year(raw: &str) -> Option<i32> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let year = if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        Some(dt.year())
    } else if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        Some(dt.year())
    } else {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            .map(|d| d.year())
    };
    year.filter(|y| *y >= MIN_PLAUSIBLE_YEAR)
}

/// First `20xx` token in the string, for dates like "15 de junho 2025".
pub fn extract_year_token(raw: &str) -> Option<i32> {
    YEAR_TOKEN.find(raw).and_then(|m| m.as_str().parse().ok())
}

/// Season heuristic for records without a usable date.
///
/// June–December belong to the earlier season year and everything else,
/// including labels that are not month names, to the later one. This only
/// exists because the table lacks explicit years; drop it once `DATA` is
/// always filled.
pub fn season_year_for_month(month: &str, season: &SeasonConfig) -> i32 {
    match month_number(month) {
        Some(6..=12) => season.earlier_year(),
        _ => season.later_year(),
    }
}

/// Resolve a record's year: parsed date, then a `20xx` token, then the
/// season heuristic.
pub fn resolve_year(date_raw: Option<&str>, month: &str, season: &SeasonConfig) -> (i32, YearSource) {
    if let Some(raw) = non_blank(date_raw) {
        if let Some(year) = parse_date_year(raw) {
            return (year, YearSource::Date);
        }
        if let Some(year) = extract_year_token(raw) {
            return (year, YearSource::YearToken);
        }
        log::debug!("Unparseable DATA {:?}; guessing year from month {:?}", raw, month);
    }
    (season_year_for_month(month, season), YearSource::MonthHeuristic)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// Internal team syncs logged in the same table.
    InternalMeeting,
    UnspecifiedCloser,
}

/// Why a record must be left out of every bucket, if at all.
pub fn exclusion_reason(raw: &RawSalesRecord) -> Option<ExclusionReason> {
    if let Some(funnel) = non_blank(raw.funnel.as_deref()) {
        let folded = fold_accents(funnel);
        if folded.contains("reuniao") || folded.contains("equipe") {
            return Some(ExclusionReason::InternalMeeting);
        }
    }
    if let Some(closer) = non_blank(raw.closer_name.as_deref()) {
        if fold_accents(closer).contains("nao especificado") {
            return Some(ExclusionReason::UnspecifiedCloser);
        }
    }
    None
}

/// Canonical view of a raw record. The year is resolved here, once.
pub fn normalize_record(raw: &RawSalesRecord, season: &SeasonConfig) -> SalesRecord {
    let (month, month_number) = canonical_month(raw.month.as_deref());
    let (year, year_source) = resolve_year(raw.date_raw.as_deref(), &month, season);

    let mut unrecognized_tokens = Vec::new();
    let mut flag = |value: &Option<String>, column: &str| match parse_flag(value.as_deref()) {
        FlagValue::True => true,
        FlagValue::False => false,
        FlagValue::Unrecognized(token) => {
            log::debug!("Unrecognized {} value {:?} counted as false", column, token);
            unrecognized_tokens.push(token);
            false
        }
    };
    let purchased = flag(&raw.purchased, "COMPROU");
    let did_not_purchase = flag(&raw.did_not_purchase, "NÃO COMPROU");
    let no_show = flag(&raw.no_show, "NO SHOW");
    let rescheduled = flag(&raw.rescheduled, "DESMARCADOS");
    let deposit_commitment = flag(&raw.deposit_commitment, "PIX COMPROMISSO");

    SalesRecord {
        month,
        month_number,
        year,
        year_source,
        funnel: non_blank(raw.funnel.as_deref()).unwrap_or(DEFAULT_FUNNEL).to_string(),
        closer_name: non_blank(raw.closer_name.as_deref())
            .unwrap_or(DEFAULT_CLOSER)
            .to_string(),
        purchased,
        did_not_purchase,
        no_show,
        rescheduled,
        deposit_commitment,
        unrecognized_tokens,
    }
}
