// Entry point and CLI flow.
//
// `report` loads the exported sales table, aggregates it, writes the JSON
// report (and optionally the monthly CSV) and prints markdown previews.
// `months` prints the year/month lookups used to populate the dashboard
// filters.
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use sales_metrics::config::{load_config, SalesMetricsConfig};
use sales_metrics::types::AggregationAudit;
use sales_metrics::util::{format_int, format_number};
use sales_metrics::{
    build_sales_report_with_audit, filter_report, loader, output, RawSalesRecord, ReportFilter,
    SeasonConfig,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sales-metrics", version, about = "Sales-call conversion metrics")]
struct Cli {
    /// Enable debug logging (unrecognized flag values, year fallbacks)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Exported sales table (.csv or .json)
    input: PathBuf,

    /// Config file (default: ./sales-metrics.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Earlier season year used when a row has no usable date
    #[arg(long)]
    season_start_year: Option<i32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the table and write the report
    Report {
        #[command(flatten)]
        input: InputArgs,

        /// JSON report destination
        #[arg(short, long, default_value = "sales_report.json")]
        output: PathBuf,

        /// Also export monthly metrics as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Only keep this year
        #[arg(long)]
        year: Option<i32>,

        /// Only keep this month (name or abbreviation)
        #[arg(long)]
        month: Option<String>,

        /// Rows shown per preview table
        #[arg(long)]
        preview: Option<usize>,
    },

    /// List the years and months present in the table
    Months {
        #[command(flatten)]
        input: InputArgs,
    },
}

/// `--verbose` sets the base level; `RUST_LOG`, when set, refines it.
fn log_builder(verbose: bool) -> env_logger::Builder {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();
    builder
}

/// Resolve config and load the rows, printing the same load summary for
/// every subcommand.
fn load(args: &InputArgs) -> Result<(SalesMetricsConfig, Vec<RawSalesRecord>)> {
    let mut config = load_config(args.config.as_deref()).context("Failed to load config")?;
    if let Some(year) = args.season_start_year {
        config.season = SeasonConfig::new(year);
    }
    let (records, load_report) = loader::load_records(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    println!(
        "Processing sales table... ({} rows loaded)",
        format_int(load_report.total_rows)
    );
    if load_report.parse_errors > 0 {
        println!(
            "Note: {} rows skipped due to parse errors.",
            format_int(load_report.parse_errors)
        );
    }
    println!();
    Ok((config, records))
}

fn print_audit(audit: &AggregationAudit) {
    println!("Audit:");
    println!(
        "  {} of {} records counted",
        format_int(audit.valid_records),
        format_int(audit.total_records)
    );
    println!(
        "  excluded: {} internal meetings, {} unspecified closer",
        format_int(audit.excluded_internal_meetings),
        format_int(audit.excluded_unspecified_closer)
    );
    println!(
        "  year from date: {}, from year token: {}, guessed from month: {}",
        format_int(audit.year_from_date),
        format_int(audit.year_from_token),
        format_int(audit.year_from_month_heuristic)
    );
    if audit.unrecognized_flag_tokens > 0 {
        println!(
            "  {} flag values not recognized (counted as false; run with -v for details)",
            format_int(audit.unrecognized_flag_tokens)
        );
    }
    println!();
}

fn handle_report(
    input: &InputArgs,
    output_path: &Path,
    csv_path: Option<&Path>,
    year: Option<i32>,
    month: Option<String>,
    preview: Option<usize>,
) -> Result<()> {
    let (config, records) = load(input)?;
    let (report, audit) = build_sales_report_with_audit(&records, &config.season);
    let report = if year.is_some() || month.is_some() {
        filter_report(&report, &ReportFilter { year, month })
    } else {
        report
    };
    let max_rows = preview.unwrap_or(config.output.preview_rows);

    output::write_json(output_path, &report)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    let monthly = output::monthly_rows(&report.monthly_metrics);
    if let Some(path) = csv_path {
        output::write_csv(path, &monthly)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    print_audit(&audit);

    println!("Monthly Sales Metrics");
    println!("(Most recent first)\n");
    output::preview_table_rows(&monthly, max_rows);

    println!("Funnel Metrics\n");
    output::preview_table_rows(&output::breakdown_rows(&report.funnel_metrics), max_rows);

    println!("Closer Metrics\n");
    output::preview_table_rows(&output::breakdown_rows(&report.closer_metrics), max_rows);

    println!("Totals:");
    let t = &report.totals.counters;
    println!(
        "{{\"totalCalls\": {}, \"purchased\": {}, \"didNotPurchase\": {}, \"noShow\": {}, \"conversionRate\": {}}}\n",
        format_int(t.total_calls),
        format_int(t.purchased),
        format_int(t.did_not_purchase),
        format_int(t.no_show),
        format_number(report.totals.conversion_rate, 2)
    );
    println!("(Full report exported to {})", output_path.display());
    if let Some(path) = csv_path {
        println!("(Monthly table exported to {})", path.display());
    }
    Ok(())
}

fn handle_months(input: &InputArgs) -> Result<()> {
    let (config, records) = load(input)?;
    let (report, _) = build_sales_report_with_audit(&records, &config.season);
    if report.available_years.is_empty() {
        println!("(no months)");
        return Ok(());
    }
    for year in &report.available_years {
        let months = report
            .months_by_year
            .get(year)
            .map(|m| m.join(", "))
            .unwrap_or_default();
        println!("{}: {}", year, months);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    log_builder(cli.verbose).init();

    match cli.command {
        Commands::Report {
            input,
            output,
            csv,
            year,
            month,
            preview,
        } => handle_report(&input, &output, csv.as_deref(), year, month, preview),
        Commands::Months { input } => handle_months(&input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_flag_sets_log_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert_eq!(log_builder(false).build().filter(), LevelFilter::Info);
        assert_eq!(log_builder(true).build().filter(), LevelFilter::Debug);
    }
}
