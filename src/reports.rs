use crate::config::SeasonConfig;
use crate::normalize::{canonical_month, exclusion_reason, normalize_record, ExclusionReason};
use crate::types::{
    AggregationAudit, BreakdownMetric, Counters, MonthlyMetric, RawSalesRecord,
    SalesRecord, SalesReport, Totals, YearSource,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Month/year selection applied after aggregation, the way the dashboard
/// selectors narrow the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub year: Option<i32>,
    pub month: Option<String>,
}

#[derive(Default)]
struct MonthAcc {
    month: String,
    month_number: Option<u32>,
    year: i32,
    counters: Counters,
    funnels: HashMap<String, Counters>,
    closers: HashMap<String, Counters>,
}

#[derive(Default)]
struct Buckets {
    months: HashMap<String, MonthAcc>,
    funnels: HashMap<String, Counters>,
    closers: HashMap<String, Counters>,
}

impl Buckets {
    fn record(&mut self, r: &SalesRecord) {
        let month = self.months.entry(r.month_key()).or_insert_with(|| MonthAcc {
            month: r.month.clone(),
            month_number: r.month_number,
            year: r.year,
            ..MonthAcc::default()
        });
        month.counters.record(r);
        month.funnels.entry(r.funnel.clone()).or_default().record(r);
        month.closers.entry(r.closer_name.clone()).or_default().record(r);

        self.funnels.entry(r.funnel.clone()).or_default().record(r);
        self.closers.entry(r.closer_name.clone()).or_default().record(r);
    }
}

/// Aggregate raw sales-call rows into the dashboard report.
///
/// Pure: buckets live only for this call, and the output ordering does not
/// depend on the order of `records`.
pub fn build_sales_report(records: &[RawSalesRecord], season: &SeasonConfig) -> SalesReport {
    build_sales_report_with_audit(records, season).0
}

/// Same as [`build_sales_report`], also returning what was excluded or
/// guessed along the way.
pub fn build_sales_report_with_audit(
    records: &[RawSalesRecord],
    season: &SeasonConfig,
) -> (SalesReport, AggregationAudit) {
    let mut audit = AggregationAudit {
        total_records: records.len(),
        ..AggregationAudit::default()
    };
    let mut buckets = Buckets::default();

    for raw in records {
        match exclusion_reason(raw) {
            Some(ExclusionReason::InternalMeeting) => {
                audit.excluded_internal_meetings += 1;
                continue;
            }
            Some(ExclusionReason::UnspecifiedCloser) => {
                audit.excluded_unspecified_closer += 1;
                continue;
            }
            None => {}
        }

        let record = normalize_record(raw, season);
        audit.valid_records += 1;
        audit.unrecognized_flag_tokens += record.unrecognized_tokens.len();
        match record.year_source {
            YearSource::Date => audit.year_from_date += 1,
            YearSource::YearToken => audit.year_from_token += 1,
            YearSource::MonthHeuristic => audit.year_from_month_heuristic += 1,
        }
        buckets.record(&record);
    }

    if audit.unrecognized_flag_tokens > 0 {
        log::info!(
            "{} flag values were not recognized and counted as false",
            audit.unrecognized_flag_tokens
        );
    }

    (assemble(buckets), audit)
}

fn assemble(buckets: Buckets) -> SalesReport {
    let mut monthly_metrics: Vec<MonthlyMetric> = buckets
        .months
        .into_iter()
        .map(|(key, acc)| MonthlyMetric {
            key,
            month: acc.month,
            month_number: acc.month_number,
            year: acc.year,
            conversion_rate: acc.counters.conversion_rate(),
            counters: acc.counters,
            funnels: breakdown(acc.funnels),
            closers: breakdown(acc.closers),
        })
        .collect();
    monthly_metrics.sort_by(recent_first);

    let totals = Totals::from_months(&monthly_metrics);
    let (available_months, available_years, months_by_year) = lookups(&monthly_metrics);

    SalesReport {
        funnel_metrics: breakdown(buckets.funnels),
        closer_metrics: breakdown(buckets.closers),
        monthly_metrics,
        totals,
        available_months,
        available_years,
        months_by_year,
    }
}

fn breakdown(map: HashMap<String, Counters>) -> Vec<BreakdownMetric> {
    let mut rows: Vec<BreakdownMetric> = map
        .into_iter()
        .map(|(name, counters)| BreakdownMetric::new(name, counters))
        .collect();
    rows.sort_by(|a, b| {
        b.counters
            .total_calls
            .cmp(&a.counters.total_calls)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows
}

/// Most recent year first; within a year, later months first. Labels that
/// are not month names go after the real months, alphabetically.
fn recent_first(a: &MonthlyMetric, b: &MonthlyMetric) -> Ordering {
    b.year
        .cmp(&a.year)
        .then_with(|| match (a.month_number, b.month_number) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.month.cmp(&b.month))
}

fn lookups(months: &[MonthlyMetric]) -> (Vec<String>, Vec<i32>, BTreeMap<i32, Vec<String>>) {
    let available_months = months.iter().map(|m| m.key.clone()).collect();
    let mut available_years: Vec<i32> = months.iter().map(|m| m.year).collect();
    available_years.dedup();
    let mut months_by_year: BTreeMap<i32, Vec<String>> = BTreeMap::new();
    for m in months {
        months_by_year.entry(m.year).or_default().push(m.month.clone());
    }
    (available_months, available_years, months_by_year)
}

/// Narrow a report to the selected year and/or month.
///
/// Totals and the global funnel/closer lists are rebuilt from the kept
/// months; the lookup lists are left untouched since they feed the
/// selectors themselves.
pub fn filter_report(report: &SalesReport, filter: &ReportFilter) -> SalesReport {
    let wanted_month = filter
        .month
        .as_deref()
        .map(|m| canonical_month(Some(m)).0);

    let monthly_metrics: Vec<MonthlyMetric> = report
        .monthly_metrics
        .iter()
        .filter(|m| filter.year.map_or(true, |y| m.year == y))
        .filter(|m| wanted_month.as_deref().map_or(true, |w| m.month == w))
        .cloned()
        .collect();

    let mut funnels: HashMap<String, Counters> = HashMap::new();
    let mut closers: HashMap<String, Counters> = HashMap::new();
    for m in &monthly_metrics {
        for f in &m.funnels {
            funnels.entry(f.name.clone()).or_default().merge(&f.counters);
        }
        for c in &m.closers {
            closers.entry(c.name.clone()).or_default().merge(&c.counters);
        }
    }

    SalesReport {
        totals: Totals::from_months(&monthly_metrics),
        funnel_metrics: breakdown(funnels),
        closer_metrics: breakdown(closers),
        monthly_metrics,
        available_months: report.available_months.clone(),
        available_years: report.available_years.clone(),
        months_by_year: report.months_by_year.clone(),
    }
}
