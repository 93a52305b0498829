// Expense Classifier - Core Library
// Exposes all modules for use in CLI, terminal dashboard, web server and tests

pub mod category;
pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod normalizer;
pub mod session;
pub mod summary;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use category::Category;
pub use classifier::{CategoryKeywords, Classification, Classifier, KeywordTable};
pub use config::AppConfig;
pub use error::{ExportError, ImportError, KeywordTableError};
pub use export::{parse_columns, to_csv_string, write_csv, ExportColumn};
pub use normalizer::{
    normalize, NormalizeOptions, NormalizedBatch, SkipReason, SkippedRow, Transaction, TransactionKind,
};
pub use session::{parse_category_filter, CategorizedTransaction, Session};
pub use summary::{
    category_breakdown, cumulative_spend, spending_trend, top_merchants, weekday_matrix, CategoryTotal,
    MerchantTotal, Report, SpendingTrend, Summary, WeekdayMatrix,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
