use crate::util::deserialize_loose_string;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabled::Tabled;

/// One row of the sales-call table, exactly as the source exports it.
///
/// Header names are the source's own (accented, upper case); unaccented
/// spellings are accepted as aliases because some exports strip diacritics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSalesRecord {
    #[serde(rename = "MÊS", alias = "MES", default, deserialize_with = "deserialize_loose_string")]
    pub month: Option<String>,
    #[serde(rename = "DATA", default, deserialize_with = "deserialize_loose_string")]
    pub date_raw: Option<String>,
    #[serde(rename = "FUNIL", default, deserialize_with = "deserialize_loose_string")]
    pub funnel: Option<String>,
    #[serde(rename = "QUEM FEZ A CALL", default, deserialize_with = "deserialize_loose_string")]
    pub closer_name: Option<String>,
    #[serde(rename = "COMPROU", default, deserialize_with = "deserialize_loose_string")]
    pub purchased: Option<String>,
    #[serde(
        rename = "NÃO COMPROU",
        alias = "NAO COMPROU",
        default,
        deserialize_with = "deserialize_loose_string"
    )]
    pub did_not_purchase: Option<String>,
    #[serde(rename = "NO SHOW", default, deserialize_with = "deserialize_loose_string")]
    pub no_show: Option<String>,
    #[serde(rename = "DESMARCADOS", default, deserialize_with = "deserialize_loose_string")]
    pub rescheduled: Option<String>,
    #[serde(rename = "PIX COMPROMISSO", default, deserialize_with = "deserialize_loose_string")]
    pub deposit_commitment: Option<String>,
}

/// Where a record's year came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearSource {
    /// `DATA` parsed as a date.
    Date,
    /// A `20xx` token found inside an unparseable `DATA`.
    YearToken,
    /// Guessed from the month label and the configured season.
    MonthHeuristic,
}

/// A record after normalization: canonical labels, resolved year and the
/// five tally flags as booleans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRecord {
    pub month: String,
    pub month_number: Option<u32>,
    pub year: i32,
    pub year_source: YearSource,
    pub funnel: String,
    pub closer_name: String,
    pub purchased: bool,
    pub did_not_purchase: bool,
    pub no_show: bool,
    pub rescheduled: bool,
    pub deposit_commitment: bool,
    /// Non-empty flag values that were not recognized and counted as false.
    pub unrecognized_tokens: Vec<String>,
}

impl SalesRecord {
    pub fn month_key(&self) -> String {
        month_key(&self.month, self.year)
    }
}

pub fn month_key(month: &str, year: i32) -> String {
    format!("{} - {}", month, year)
}

/// Running totals shared by every bucket shape.
///
/// Flags are tallied independently: a record may bump `purchased` and
/// `no_show` at once, while `total_calls` moves exactly once per record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    pub total_calls: u64,
    pub purchased: u64,
    pub did_not_purchase: u64,
    pub no_show: u64,
    pub rescheduled: u64,
    pub deposit_commitment: u64,
}

impl Counters {
    pub fn record(&mut self, r: &SalesRecord) {
        self.total_calls += 1;
        self.purchased += u64::from(r.purchased);
        self.did_not_purchase += u64::from(r.did_not_purchase);
        self.no_show += u64::from(r.no_show);
        self.rescheduled += u64::from(r.rescheduled);
        self.deposit_commitment += u64::from(r.deposit_commitment);
    }

    pub fn merge(&mut self, other: &Counters) {
        self.total_calls += other.total_calls;
        self.purchased += other.purchased;
        self.did_not_purchase += other.did_not_purchase;
        self.no_show += other.no_show;
        self.rescheduled += other.rescheduled;
        self.deposit_commitment += other.deposit_commitment;
    }

    /// Calls that reached a purchase decision. No-shows are not realized.
    pub fn realized_calls(&self) -> u64 {
        self.purchased + self.did_not_purchase
    }

    /// Percentage of realized calls that ended in a purchase, or 0 when no
    /// call was realized.
    pub fn conversion_rate(&self) -> f64 {
        let realized = self.realized_calls();
        if realized == 0 {
            return 0.0;
        }
        self.purchased as f64 / realized as f64 * 100.0
    }
}

/// A funnel or closer line inside a month or across the whole report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownMetric {
    pub name: String,
    #[serde(flatten)]
    pub counters: Counters,
    pub conversion_rate: f64,
}

impl BreakdownMetric {
    pub fn new(name: String, counters: Counters) -> Self {
        Self {
            name,
            conversion_rate: counters.conversion_rate(),
            counters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyMetric {
    pub key: String,
    pub month: String,
    #[serde(skip)]
    pub month_number: Option<u32>,
    pub year: i32,
    #[serde(flatten)]
    pub counters: Counters,
    pub conversion_rate: f64,
    pub funnels: Vec<BreakdownMetric>,
    pub closers: Vec<BreakdownMetric>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    #[serde(flatten)]
    pub counters: Counters,
    pub conversion_rate: f64,
}

impl Totals {
    pub fn from_months(months: &[MonthlyMetric]) -> Self {
        let mut counters = Counters::default();
        for m in months {
            counters.merge(&m.counters);
        }
        Self {
            conversion_rate: counters.conversion_rate(),
            counters,
        }
    }
}

/// The assembled report handed to presentation code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub monthly_metrics: Vec<MonthlyMetric>,
    pub funnel_metrics: Vec<BreakdownMetric>,
    pub closer_metrics: Vec<BreakdownMetric>,
    pub totals: Totals,
    pub available_months: Vec<String>,
    pub available_years: Vec<i32>,
    pub months_by_year: BTreeMap<i32, Vec<String>>,
}

/// Diagnostics gathered during one aggregation pass.
///
/// Used to reconcile the dashboard against the spreadsheet the sales team
/// keeps by hand: every record is either counted or excluded for a reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationAudit {
    pub total_records: usize,
    pub valid_records: usize,
    pub excluded_internal_meetings: usize,
    pub excluded_unspecified_closer: usize,
    pub unrecognized_flag_tokens: usize,
    pub year_from_date: usize,
    pub year_from_token: usize,
    pub year_from_month_heuristic: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthlyRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "TotalCalls")]
    #[tabled(rename = "TotalCalls")]
    pub total_calls: u64,
    #[serde(rename = "Purchased")]
    #[tabled(rename = "Purchased")]
    pub purchased: u64,
    #[serde(rename = "DidNotPurchase")]
    #[tabled(rename = "DidNotPurchase")]
    pub did_not_purchase: u64,
    #[serde(rename = "NoShow")]
    #[tabled(rename = "NoShow")]
    pub no_show: u64,
    #[serde(rename = "Rescheduled")]
    #[tabled(rename = "Rescheduled")]
    pub rescheduled: u64,
    #[serde(rename = "DepositCommitment")]
    #[tabled(rename = "DepositCommitment")]
    pub deposit_commitment: u64,
    #[serde(rename = "ConversionRate")]
    #[tabled(rename = "ConversionRate")]
    pub conversion_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BreakdownRow {
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "TotalCalls")]
    #[tabled(rename = "TotalCalls")]
    pub total_calls: u64,
    #[serde(rename = "Purchased")]
    #[tabled(rename = "Purchased")]
    pub purchased: u64,
    #[serde(rename = "DidNotPurchase")]
    #[tabled(rename = "DidNotPurchase")]
    pub did_not_purchase: u64,
    #[serde(rename = "NoShow")]
    #[tabled(rename = "NoShow")]
    pub no_show: u64,
    #[serde(rename = "ConversionRate")]
    #[tabled(rename = "ConversionRate")]
    pub conversion_rate: String,
}
