// 📥 Export - classified transactions back to CSV
// The user picks which columns go into the download.

use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;

use crate::error::ExportError;
use crate::session::CategorizedTransaction;

pub const DEFAULT_FILE_NAME: &str = "classified_transactions.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportColumn {
    Date,
    Description,
    Amount,
    Category,
    Month,
    Year,
    DayOfWeek,
    TransactionType,
    AbsAmount,
    Merchant,
    MatchedKeyword,
}

impl ExportColumn {
    pub fn all() -> &'static [ExportColumn] {
        &[
            ExportColumn::Date,
            ExportColumn::Description,
            ExportColumn::Amount,
            ExportColumn::Category,
            ExportColumn::Month,
            ExportColumn::Year,
            ExportColumn::DayOfWeek,
            ExportColumn::TransactionType,
            ExportColumn::AbsAmount,
            ExportColumn::Merchant,
            ExportColumn::MatchedKeyword,
        ]
    }

    pub fn defaults() -> Vec<ExportColumn> {
        vec![
            ExportColumn::Date,
            ExportColumn::Description,
            ExportColumn::Amount,
            ExportColumn::Category,
        ]
    }

    /// Header name in the exported file
    pub fn name(&self) -> &'static str {
        match self {
            ExportColumn::Date => "date",
            ExportColumn::Description => "description",
            ExportColumn::Amount => "amount",
            ExportColumn::Category => "category",
            ExportColumn::Month => "month",
            ExportColumn::Year => "year",
            ExportColumn::DayOfWeek => "day_of_week",
            ExportColumn::TransactionType => "transaction_type",
            ExportColumn::AbsAmount => "abs_amount",
            ExportColumn::Merchant => "merchant",
            ExportColumn::MatchedKeyword => "matched_keyword",
        }
    }

    fn value(&self, tx: &CategorizedTransaction) -> String {
        let t = &tx.transaction;
        match self {
            ExportColumn::Date => t.date.format("%Y-%m-%d").to_string(),
            ExportColumn::Description => t.description.clone(),
            ExportColumn::Amount => format!("{:.2}", t.amount),
            ExportColumn::Category => tx.category.label().to_string(),
            ExportColumn::Month => t.month.clone(),
            ExportColumn::Year => t.year.to_string(),
            ExportColumn::DayOfWeek => t.day_of_week.to_string(),
            ExportColumn::TransactionType => t.kind.as_str().to_string(),
            ExportColumn::AbsAmount => format!("{:.2}", t.abs_amount()),
            ExportColumn::Merchant => t.merchant.clone(),
            ExportColumn::MatchedKeyword => tx.matched_keyword.clone().unwrap_or_default(),
        }
    }
}

impl FromStr for ExportColumn {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ExportColumn::all()
            .iter()
            .copied()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| ExportError::UnknownColumn(s.trim().to_string()))
    }
}

/// "date, category" → columns. Empty input is an error, not "all columns".
pub fn parse_columns(raw: &str) -> Result<Vec<ExportColumn>, ExportError> {
    let columns = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<ExportColumn>, ExportError>>()?;

    if columns.is_empty() {
        return Err(ExportError::NoColumns);
    }
    Ok(columns)
}

/// Write the selected columns for every transaction.
pub fn write_csv<'a, W, I>(writer: W, transactions: I, columns: &[ExportColumn]) -> Result<usize, ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a CategorizedTransaction>,
{
    if columns.is_empty() {
        return Err(ExportError::NoColumns);
    }

    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(columns.iter().map(|c| c.name()))?;

    let mut written = 0;
    for tx in transactions {
        wtr.write_record(columns.iter().map(|c| c.value(tx)))?;
        written += 1;
    }

    wtr.flush()?;
    Ok(written)
}

pub fn to_csv_string<'a, I>(transactions: I, columns: &[ExportColumn]) -> Result<String, ExportError>
where
    I: IntoIterator<Item = &'a CategorizedTransaction>,
{
    let mut buffer = Vec::new();
    write_csv(&mut buffer, transactions, columns)?;
    // csv only writes the UTF-8 strings it was given
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::classifier::Classifier;
    use crate::normalizer::NormalizeOptions;
    use crate::session::Session;

    fn session() -> Session {
        let csv = "date,description,amount\n\
                   2024-01-15,\"Starbucks Coffee, Downtown\",-5.75\n\
                   2024-01-16,Amazon Prime Video,-8.99\n\
                   2024-01-17,Gift from Grandma,0\n\
                   2024-01-31,Salary Deposit,3000\n";
        Session::from_reader("t.csv", csv.as_bytes(), &Classifier::default(), &NormalizeOptions::default())
            .unwrap()
    }

    #[test]
    fn test_default_columns() {
        let session = session();
        let out = to_csv_string(&session.transactions, &ExportColumn::defaults()).unwrap();
        let mut lines = out.lines();

        assert_eq!(lines.next(), Some("date,description,amount,category"));
        assert_eq!(
            lines.next(),
            Some("2024-01-15,\"Starbucks Coffee, Downtown\",-5.75,Food & Dining")
        );
        assert_eq!(lines.next(), Some("2024-01-16,Amazon Prime Video,-8.99,Subscriptions"));
    }

    #[test]
    fn test_category_round_trip() {
        let session = session();
        let out = to_csv_string(&session.transactions, &ExportColumn::all()).unwrap();

        let mut rdr = csv::Reader::from_reader(out.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        let idx = headers.iter().position(|h| h == "category").unwrap();

        let reimported: Vec<Category> = rdr
            .records()
            .map(|r| r.unwrap()[idx].parse::<Category>().unwrap())
            .collect();
        let original: Vec<Category> = session.transactions.iter().map(|t| t.category).collect();

        assert_eq!(reimported, original);
        assert_eq!(reimported.len(), 4);
    }

    #[test]
    fn test_derived_columns() {
        let session = session();
        let columns = parse_columns("day_of_week, TRANSACTION_TYPE,abs_amount,matched_keyword").unwrap();
        let out = to_csv_string(&session.transactions, &columns).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "day_of_week,transaction_type,abs_amount,matched_keyword");
        assert_eq!(lines[1], "Mon,Expense,5.75,coffee");
        assert_eq!(lines[3], "Wed,Neutral,0.00,");
        assert_eq!(lines[4], "Wed,Income,3000.00,salary");
    }

    #[test]
    fn test_parse_columns_errors() {
        assert!(matches!(parse_columns(""), Err(ExportError::NoColumns)));
        assert!(matches!(parse_columns(" , "), Err(ExportError::NoColumns)));
        match parse_columns("date,balance") {
            Err(ExportError::UnknownColumn(name)) => assert_eq!(name, "balance"),
            other => panic!("unexpected: {other:?}"),
        }

        let session = session();
        assert!(matches!(
            to_csv_string(&session.transactions, &[]),
            Err(ExportError::NoColumns)
        ));
    }

    #[test]
    fn test_write_to_file() {
        let session = session();
        let file = tempfile::NamedTempFile::new().unwrap();

        let written =
            write_csv(file.reopen().unwrap(), &session.transactions, &ExportColumn::defaults()).unwrap();
        assert_eq!(written, 4);

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents.lines().count(), 5);
    }
}
