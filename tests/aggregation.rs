use pretty_assertions::assert_eq;
use sales_metrics::loader::{load_records, parse_csv};
use sales_metrics::output;
use sales_metrics::{build_sales_report, build_sales_report_with_audit, RawSalesRecord, SeasonConfig};
use std::path::Path;

const FIXTURE: &str = "tests/fixtures/vendas.csv";

fn fixture_records() -> Vec<RawSalesRecord> {
    let (records, report) = load_records(Path::new(FIXTURE)).unwrap();
    assert_eq!(report.parse_errors, 0);
    records
}

fn raw(month: &str, funnel: &str, flags: [&str; 5]) -> RawSalesRecord {
    let cell = |v: &str| if v.is_empty() { None } else { Some(v.to_string()) };
    RawSalesRecord {
        month: Some(month.to_string()),
        funnel: Some(funnel.to_string()),
        closer_name: Some("Ana".to_string()),
        purchased: cell(flags[0]),
        did_not_purchase: cell(flags[1]),
        no_show: cell(flags[2]),
        rescheduled: cell(flags[3]),
        deposit_commitment: cell(flags[4]),
        ..Default::default()
    }
}

#[test]
fn fixture_report_end_to_end() {
    let records = fixture_records();
    let (report, audit) = build_sales_report_with_audit(&records, &SeasonConfig::default());

    assert_eq!(audit.total_records, 9);
    assert_eq!(audit.valid_records, 7);
    assert_eq!(audit.excluded_internal_meetings, 1);
    assert_eq!(audit.excluded_unspecified_closer, 1);
    assert_eq!(audit.unrecognized_flag_tokens, 1);
    assert_eq!(audit.year_from_date, 3);
    assert_eq!(audit.year_from_token, 1);
    assert_eq!(audit.year_from_month_heuristic, 3);

    assert_eq!(
        report.available_months,
        vec!["Janeiro - 2026", "Julho - 2025", "Junho - 2025", "Dezembro - 2024"]
    );
    assert_eq!(report.available_years, vec![2026, 2025, 2024]);

    let june = &report.monthly_metrics[2];
    assert_eq!(june.key, "Junho - 2025");
    assert_eq!(june.counters.total_calls, 3);
    assert_eq!(june.counters.purchased, 1);
    assert_eq!(june.counters.did_not_purchase, 1);
    assert_eq!(june.counters.no_show, 1);
    assert_eq!(june.counters.deposit_commitment, 1);
    assert_eq!(june.conversion_rate, 50.0);

    let july = &report.monthly_metrics[1];
    assert_eq!(july.counters.total_calls, 2);
    assert_eq!(july.counters.rescheduled, 1);
    assert_eq!(july.conversion_rate, 50.0);

    let january = &report.monthly_metrics[0];
    assert_eq!(january.closers[0].name, "Não especificado");
    assert_eq!(january.counters.purchased, 0);
    assert_eq!(january.counters.did_not_purchase, 1);

    let december = &report.monthly_metrics[3];
    assert_eq!(december.counters.purchased, 1);
    assert_eq!(december.counters.no_show, 1);
    assert_eq!(december.conversion_rate, 100.0);

    assert_eq!(report.totals.counters.total_calls, 7);
    assert_eq!(report.totals.counters.purchased, 3);
    assert_eq!(report.totals.counters.did_not_purchase, 3);
    assert_eq!(report.totals.counters.no_show, 2);
    assert_eq!(report.totals.conversion_rate, 50.0);

    let google = report.funnel_metrics.iter().find(|f| f.name == "Google").unwrap();
    assert_eq!(google.counters.total_calls, 3);
    assert!((google.conversion_rate - 200.0 / 3.0).abs() < 1e-9);
    assert!(report.funnel_metrics.iter().all(|f| !f.name.contains("Reuni")));
}

#[test]
fn output_is_independent_of_input_order() {
    let records = fixture_records();
    let mut reversed = records.clone();
    reversed.reverse();
    let mut rotated = records.clone();
    rotated.rotate_left(4);

    let season = SeasonConfig::default();
    let expected = serde_json::to_string(&build_sales_report(&records, &season)).unwrap();
    for input in [&records, &reversed, &rotated, &records] {
        let json = serde_json::to_string(&build_sales_report(input, &season)).unwrap();
        assert_eq!(json, expected);
    }
}

#[test]
fn conversion_rate_stays_within_bounds() {
    let tokens = ["", "Sim", "x", "nope"];
    let mut records = Vec::new();
    for (i, p) in tokens.iter().enumerate() {
        for (j, d) in tokens.iter().enumerate() {
            for n in tokens {
                let funnel = format!("F{}", (i + j) % 3);
                records.push(raw("Maio", &funnel, [*p, *d, n, "", ""]));
            }
        }
    }
    let report = build_sales_report(&records, &SeasonConfig::default());

    let mut rates = vec![report.totals.conversion_rate];
    for m in &report.monthly_metrics {
        rates.push(m.conversion_rate);
        rates.extend(m.funnels.iter().map(|f| f.conversion_rate));
        rates.extend(m.closers.iter().map(|c| c.conversion_rate));
    }
    rates.extend(report.funnel_metrics.iter().map(|f| f.conversion_rate));
    rates.extend(report.closer_metrics.iter().map(|c| c.conversion_rate));
    for rate in rates {
        assert!(rate.is_finite());
        assert!((0.0..=100.0).contains(&rate), "{rate}");
    }

    let only_no_shows = vec![raw("Maio", "Google", ["", "", "Sim", "", ""])];
    let report = build_sales_report(&only_no_shows, &SeasonConfig::default());
    assert_eq!(report.monthly_metrics[0].conversion_rate, 0.0);
    assert_eq!(report.funnel_metrics[0].conversion_rate, 0.0);
}

#[test]
fn total_calls_counted_once_per_record() {
    let records = vec![raw("Junho", "Google", ["Sim", "Sim", "Sim", "Sim", "Sim"])];
    let report = build_sales_report(&records, &SeasonConfig::default());
    let c = report.totals.counters;
    assert_eq!(c.total_calls, 1);
    assert_eq!(
        (c.purchased, c.did_not_purchase, c.no_show, c.rescheduled, c.deposit_commitment),
        (1, 1, 1, 1, 1)
    );
    assert_eq!(report.monthly_metrics[0].funnels[0].counters, c);
    assert_eq!(report.closer_metrics[0].counters, c);
}

#[test]
fn team_meeting_contributes_nowhere() {
    let records = vec![
        raw("Junho", "Reunião de equipe", ["Sim", "", "", "", ""]),
        raw("Junho", "Google", ["", "Sim", "", "", ""]),
    ];
    let report = build_sales_report(&records, &SeasonConfig::default());
    assert_eq!(report.totals.counters.total_calls, 1);
    assert_eq!(report.totals.counters.purchased, 0);
    assert_eq!(report.funnel_metrics.len(), 1);
    assert_eq!(report.closer_metrics[0].counters.total_calls, 1);
    assert_eq!(report.monthly_metrics[0].funnels.len(), 1);
}

#[test]
fn season_year_is_configurable() {
    let records = vec![
        raw("Julho", "Google", ["", "", "", "", ""]),
        raw("Janeiro", "Google", ["", "", "", "", ""]),
    ];
    let report = build_sales_report(&records, &SeasonConfig::new(2030));
    assert_eq!(report.available_months, vec!["Janeiro - 2031", "Julho - 2030"]);
}

#[test]
fn report_json_shape() {
    let records = vec![raw("Junho", "Google", ["Sim", "", "", "", ""])];
    let report = build_sales_report(&records, &SeasonConfig::default());
    let v = serde_json::to_value(&report).unwrap();

    for key in [
        "monthlyMetrics",
        "funnelMetrics",
        "closerMetrics",
        "totals",
        "availableMonths",
        "availableYears",
        "monthsByYear",
    ] {
        assert!(v.get(key).is_some(), "missing {key}");
    }
    assert_eq!(v["monthlyMetrics"][0]["funnels"][0]["name"], "Google");
    assert_eq!(v["monthlyMetrics"][0]["conversionRate"], 100.0);
    assert_eq!(v["totals"]["totalCalls"], 1);
    assert_eq!(v["monthsByYear"]["2025"][0], "Junho");
}

#[test]
fn csv_export_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("vendas.csv");
    std::fs::copy(FIXTURE, &input).unwrap();

    let (records, _) = load_records(&input).unwrap();
    let report = build_sales_report(&records, &SeasonConfig::default());
    let monthly_path = dir.path().join("monthly.csv");
    output::write_csv(&monthly_path, &output::monthly_rows(&report.monthly_metrics)).unwrap();

    let text = std::fs::read_to_string(&monthly_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("Month,TotalCalls,Purchased,DidNotPurchase,NoShow,Rescheduled,DepositCommitment,ConversionRate")
    );
    assert_eq!(lines.next(), Some("Janeiro - 2026,1,0,1,0,0,0,0.00%"));
    assert_eq!(text.lines().count(), 5);

    let (reloaded, _) = parse_csv(std::fs::read(&input).unwrap().as_slice()).unwrap();
    assert_eq!(reloaded.len(), records.len());
}
