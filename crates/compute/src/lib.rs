pub mod aggregate;
pub mod dataset;
pub mod derive;
pub mod filter;
pub mod key;
pub mod rank;
pub mod report;
pub mod views;

pub use aggregate::{group_fold, group_tally, Grouped, Tally};
pub use dataset::Dataset;
pub use filter::{DateRange, FilterConfig};
pub use key::{extract_key, GroupSpec};
pub use rank::SortOrder;
pub use report::{Report, ReportEngine, ReportMeta, ReportOptions, ViewKind};
pub use views::leads::ConversionBasis;
