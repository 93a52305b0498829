// 📦 Session - one upload, held in memory
// raw CSV → normalized → categorized. Nothing here touches disk.

use serde::Serialize;
use std::collections::HashSet;
use std::io::Read;
use tracing::info;

use crate::category::Category;
use crate::classifier::Classifier;
use crate::error::ImportError;
use crate::normalizer::{normalize, NormalizeOptions, SkippedRow, Transaction};

/// A transaction plus the single category it was assigned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub category: Category,
    pub matched_keyword: Option<String>,
}

impl CategorizedTransaction {
    pub fn categorize(transaction: Transaction, classifier: &Classifier) -> Self {
        let classification = classifier.explain(&transaction.description);
        CategorizedTransaction {
            transaction,
            category: classification.category,
            matched_keyword: classification.matched_keyword,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub source_name: String,
    pub transactions: Vec<CategorizedTransaction>,
    pub skipped: Vec<SkippedRow>,
    pub header_row: usize,
}

impl Session {
    /// Run the whole pipeline over one upload.
    pub fn from_reader<R: Read>(
        source_name: &str,
        reader: R,
        classifier: &Classifier,
        options: &NormalizeOptions,
    ) -> Result<Self, ImportError> {
        let batch = normalize(reader, options)?;

        let transactions: Vec<CategorizedTransaction> = batch
            .transactions
            .into_iter()
            .map(|tx| CategorizedTransaction::categorize(tx, classifier))
            .collect();

        info!(
            source = source_name,
            transactions = transactions.len(),
            skipped = batch.skipped.len(),
            "classified upload"
        );

        Ok(Session {
            source_name: source_name.to_string(),
            transactions,
            skipped: batch.skipped,
            header_row: batch.header_row,
        })
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Transactions in the given categories; all of them for an empty filter.
    pub fn filtered(&self, categories: &HashSet<Category>) -> Vec<&CategorizedTransaction> {
        self.transactions
            .iter()
            .filter(|tx| categories.is_empty() || categories.contains(&tx.category))
            .collect()
    }
}

/// Parse "Groceries,Food & Dining" into a category set. Unknown labels are errors.
pub fn parse_category_filter(raw: &str) -> Result<HashSet<Category>, crate::error::KeywordTableError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<Category>)
        .collect()
}
