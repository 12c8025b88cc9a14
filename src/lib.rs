//! Sales-call conversion metrics for the coaching dashboard.
//!
//! Raw rows from the commercial table are normalized, filtered and folded
//! into monthly, funnel and closer buckets, then assembled into a
//! JSON-serializable [`SalesReport`].
pub mod config;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use config::{SalesMetricsConfig, SeasonConfig};
pub use error::{Result, SalesMetricsError};
pub use reports::{build_sales_report, build_sales_report_with_audit, filter_report, ReportFilter};
pub use types::{AggregationAudit, RawSalesRecord, SalesReport};
