// 📊 Aggregates - summary statistics and chart-ready groupings
//
// Every aggregate here is one pass or one grouping over classified
// transactions. Spend is reported as a positive magnitude; zero amounts count
// towards neither spend nor income.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::category::Category;
use crate::session::CategorizedTransaction;

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Summary {
    pub transaction_count: usize,
    pub expense_count: usize,
    pub income_count: usize,
    pub total_spend: f64,
    pub total_income: f64,
    pub net_cashflow: f64,
    pub average_expense: f64,
    pub period: Option<AnalysisPeriod>,
}

impl Summary {
    pub fn compute<'a, I>(transactions: I) -> Summary
    where
        I: IntoIterator<Item = &'a CategorizedTransaction>,
    {
        let mut summary = Summary::default();
        let mut first: Option<NaiveDate> = None;
        let mut last: Option<NaiveDate> = None;

        for tx in transactions {
            let tx = &tx.transaction;
            summary.transaction_count += 1;

            if tx.is_expense() {
                summary.expense_count += 1;
                summary.total_spend += tx.abs_amount();
            } else if tx.is_income() {
                summary.income_count += 1;
                summary.total_income += tx.amount;
            }

            first = Some(first.map_or(tx.date, |d| d.min(tx.date)));
            last = Some(last.map_or(tx.date, |d| d.max(tx.date)));
        }

        summary.net_cashflow = summary.total_income - summary.total_spend;
        summary.average_expense = average(summary.total_spend, summary.expense_count);
        summary.period = match (first, last) {
            (Some(start), Some(end)) => Some(AnalysisPeriod { start, end, days: (end - start).num_days() }),
            _ => None,
        };

        summary
    }

    /// "Surplus" or "Deficit"
    pub fn cashflow_label(&self) -> &'static str {
        if self.net_cashflow >= 0.0 {
            "Surplus"
        } else {
            "Deficit"
        }
    }
}

fn average(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

// ============================================================================
// PER CATEGORY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub count: usize,
    pub expense_count: usize,
    pub spend: f64,
    pub income: f64,
    pub average_expense: f64,
    /// Percent of total spend
    pub share_of_spend: f64,
}

/// Totals for every category present, biggest spend first.
pub fn category_breakdown<'a, I>(transactions: I) -> Vec<CategoryTotal>
where
    I: IntoIterator<Item = &'a CategorizedTransaction>,
{
    let mut totals: HashMap<Category, CategoryTotal> = HashMap::new();
    let mut total_spend = 0.0;

    for tx in transactions {
        let entry = totals.entry(tx.category).or_insert_with(|| CategoryTotal {
            category: tx.category,
            count: 0,
            expense_count: 0,
            spend: 0.0,
            income: 0.0,
            average_expense: 0.0,
            share_of_spend: 0.0,
        });
        entry.count += 1;

        let t = &tx.transaction;
        if t.is_expense() {
            entry.expense_count += 1;
            entry.spend += t.abs_amount();
            total_spend += t.abs_amount();
        } else if t.is_income() {
            entry.income += t.amount;
        }
    }

    let mut result: Vec<CategoryTotal> = totals
        .into_values()
        .map(|mut total| {
            total.average_expense = average(total.spend, total.expense_count);
            total.share_of_spend = percent(total.spend, total_spend);
            total
        })
        .collect();

    result.sort_by(|a, b| {
        b.spend
            .total_cmp(&a.spend)
            .then_with(|| a.category.priority().cmp(&b.category.priority()))
    });
    result
}

// ============================================================================
// TOP MERCHANTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantTotal {
    pub merchant: String,
    pub count: usize,
    pub spend: f64,
    pub share_of_spend: f64,
}

/// Merchants ranked by spend (expenses only), ties broken by name.
pub fn top_merchants<'a, I>(transactions: I, n: usize) -> Vec<MerchantTotal>
where
    I: IntoIterator<Item = &'a CategorizedTransaction>,
{
    let mut by_merchant: HashMap<&str, (usize, f64)> = HashMap::new();
    let mut total_spend = 0.0;

    for tx in transactions {
        let t = &tx.transaction;
        if !t.is_expense() {
            continue;
        }
        let entry = by_merchant.entry(t.merchant.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += t.abs_amount();
        total_spend += t.abs_amount();
    }

    let mut result: Vec<MerchantTotal> = by_merchant
        .into_iter()
        .map(|(merchant, (count, spend))| MerchantTotal {
            merchant: merchant.to_string(),
            count,
            spend,
            share_of_spend: percent(spend, total_spend),
        })
        .collect();

    result.sort_by(|a, b| b.spend.total_cmp(&a.spend).then_with(|| a.merchant.cmp(&b.merchant)));
    result.truncate(n);
    result
}

// ============================================================================
// DAY-OF-WEEK × CATEGORY
// ============================================================================

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayMatrix {
    /// Mon..Sun
    pub weekdays: Vec<String>,
    /// Columns, in priority order
    pub categories: Vec<Category>,
    /// spend[weekday][category]
    pub spend: Vec<Vec<f64>>,
}

impl WeekdayMatrix {
    pub fn get(&self, weekday: Weekday, category: Category) -> f64 {
        let row = weekday.num_days_from_monday() as usize;
        self.categories
            .iter()
            .position(|c| *c == category)
            .map(|col| self.spend[row][col])
            .unwrap_or(0.0)
    }
}

pub fn weekday_matrix<'a, I>(transactions: I) -> WeekdayMatrix
where
    I: IntoIterator<Item = &'a CategorizedTransaction>,
{
    let mut cells: BTreeMap<(usize, Category), f64> = BTreeMap::new();

    for tx in transactions {
        let t = &tx.transaction;
        if t.is_expense() {
            let row = t.day_of_week.num_days_from_monday() as usize;
            *cells.entry((row, tx.category)).or_insert(0.0) += t.abs_amount();
        }
    }

    let categories: Vec<Category> = Category::all()
        .iter()
        .copied()
        .filter(|c| cells.keys().any(|(_, cat)| cat == c))
        .collect();

    let mut spend = vec![vec![0.0; categories.len()]; WEEKDAYS.len()];
    for ((row, category), amount) in cells {
        if let Some(col) = categories.iter().position(|c| *c == category) {
            spend[row][col] = amount;
        }
    }

    WeekdayMatrix {
        weekdays: WEEKDAYS.iter().map(|d| d.to_string()).collect(),
        categories,
        spend,
    }
}

// ============================================================================
// OVER TIME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativePoint {
    pub date: NaiveDate,
    pub spend: f64,
    pub cumulative: f64,
}

/// Running spend total per expense date
pub fn cumulative_spend<'a, I>(transactions: I) -> Vec<CumulativePoint>
where
    I: IntoIterator<Item = &'a CategorizedTransaction>,
{
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for tx in transactions {
        if tx.transaction.is_expense() {
            *by_date.entry(tx.transaction.date).or_insert(0.0) += tx.transaction.abs_amount();
        }
    }

    let mut running = 0.0;
    by_date
        .into_iter()
        .map(|(date, spend)| {
            running += spend;
            CumulativePoint { date, spend, cumulative: running }
        })
        .collect()
}

/// Weekly buckets below this many days of expenses, monthly otherwise
pub const WEEKLY_TREND_MAX_DAYS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Granularity {
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub category: Category,
    /// One value per period
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingTrend {
    pub granularity: Granularity,
    pub periods: Vec<String>,
    pub series: Vec<TrendSeries>,
}

fn period_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Weekly => date - Duration::days(date.weekday().num_days_from_monday() as i64),
        Granularity::Monthly => date.with_day(1).unwrap_or(date),
    }
}

fn period_label(start: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Weekly => start.format("%b %d").to_string(),
        Granularity::Monthly => start.format("%b %Y").to_string(),
    }
}

/// Spend per period and category (expenses only)
pub fn spending_trend<'a, I>(transactions: I) -> SpendingTrend
where
    I: IntoIterator<Item = &'a CategorizedTransaction>,
{
    let expenses: Vec<&CategorizedTransaction> = transactions
        .into_iter()
        .filter(|tx| tx.transaction.is_expense())
        .collect();

    let first = expenses.iter().map(|tx| tx.transaction.date).min();
    let last = expenses.iter().map(|tx| tx.transaction.date).max();
    let granularity = match (first, last) {
        (Some(first), Some(last)) if (last - first).num_days() >= WEEKLY_TREND_MAX_DAYS => Granularity::Monthly,
        _ => Granularity::Weekly,
    };

    let mut cells: BTreeMap<(NaiveDate, Category), f64> = BTreeMap::new();
    for tx in &expenses {
        let start = period_start(tx.transaction.date, granularity);
        *cells.entry((start, tx.category)).or_insert(0.0) += tx.transaction.abs_amount();
    }

    let mut starts: Vec<NaiveDate> = cells.keys().map(|(start, _)| *start).collect();
    starts.dedup();

    let categories: Vec<Category> = Category::all()
        .iter()
        .copied()
        .filter(|c| cells.keys().any(|(_, cat)| cat == c))
        .collect();

    let series = categories
        .into_iter()
        .map(|category| TrendSeries {
            category,
            values: starts
                .iter()
                .map(|start| cells.get(&(*start, category)).copied().unwrap_or(0.0))
                .collect(),
        })
        .collect();

    SpendingTrend {
        granularity,
        periods: starts.iter().map(|s| period_label(*s, granularity)).collect(),
        series,
    }
}

// ============================================================================
// REPORT (everything the dashboards draw)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub summary: Summary,
    pub categories: Vec<CategoryTotal>,
    pub top_merchants: Vec<MerchantTotal>,
    pub weekday_matrix: WeekdayMatrix,
    pub cumulative_spend: Vec<CumulativePoint>,
    pub trend: SpendingTrend,
}

impl Report {
    pub fn build(transactions: &[&CategorizedTransaction], top_n: usize) -> Report {
        let iter = || transactions.iter().copied();
        Report {
            summary: Summary::compute(iter()),
            categories: category_breakdown(iter()),
            top_merchants: top_merchants(iter(), top_n),
            weekday_matrix: weekday_matrix(iter()),
            cumulative_spend: cumulative_spend(iter()),
            trend: spending_trend(iter()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::normalizer::Transaction;

    fn tx(date: &str, description: &str, amount: f64) -> CategorizedTransaction {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        CategorizedTransaction::categorize(
            Transaction::new(date, description.to_string(), amount, 2),
            &Classifier::default(),
        )
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sample() -> Vec<CategorizedTransaction> {
        vec![
            tx("2024-01-15", "Starbucks Coffee", -5.75),
            tx("2024-01-15", "Starbucks Coffee", -4.25),
            tx("2024-01-16", "Kroger", -60.00),
            tx("2024-01-17", "Shell Gas Station", -45.00),
            tx("2024-01-20", "Zelle to Mom", 0.0),
            tx("2024-01-31", "Salary Deposit", 3000.00),
        ]
    }

    #[test]
    fn test_starbucks_contributes_to_spend() {
        let txs = vec![tx("2024-01-15", "Starbucks Coffee", -5.75)];
        assert_eq!(txs[0].category, Category::FoodAndDining);

        let summary = Summary::compute(&txs);
        assert!(approx(summary.total_spend, 5.75));
        assert!(approx(summary.total_income, 0.0));
    }

    #[test]
    fn test_salary_is_income_not_spend() {
        let txs = vec![tx("2024-01-31", "Salary Deposit", 3000.00)];
        assert_eq!(txs[0].category, Category::Income);

        let summary = Summary::compute(&txs);
        assert!(approx(summary.total_income, 3000.0));
        assert!(approx(summary.total_spend, 0.0));
        assert!(category_breakdown(&txs).iter().all(|c| c.spend == 0.0));
        assert!(top_merchants(&txs, 5).is_empty());
    }

    #[test]
    fn test_summary_totals() {
        let txs = sample();
        let summary = Summary::compute(&txs);

        assert_eq!(summary.transaction_count, 6);
        assert_eq!(summary.expense_count, 4);
        assert_eq!(summary.income_count, 1);
        assert!(approx(summary.total_spend, 115.0));
        assert!(approx(summary.total_income, 3000.0));
        assert!(approx(summary.net_cashflow, 2885.0));
        assert!(approx(summary.average_expense, 28.75));
        assert_eq!(summary.cashflow_label(), "Surplus");

        let period = summary.period.unwrap();
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(period.days, 16);
    }

    #[test]
    fn test_zero_amount_counts_nowhere_but_is_classified() {
        let txs = vec![tx("2024-01-20", "Zelle to Mom", 0.0)];
        assert_eq!(txs[0].category, Category::Transfers);

        let summary = Summary::compute(&txs);
        assert_eq!(summary.transaction_count, 1);
        assert_eq!(summary.expense_count + summary.income_count, 0);
        assert_eq!(summary.total_spend, 0.0);
        assert_eq!(summary.total_income, 0.0);

        let breakdown = category_breakdown(&txs);
        assert_eq!(breakdown[0].category, Category::Transfers);
        assert_eq!(breakdown[0].count, 1);
        assert_eq!(breakdown[0].expense_count, 0);
    }

    #[test]
    fn test_empty_input() {
        let txs: Vec<CategorizedTransaction> = Vec::new();
        let summary = Summary::compute(&txs);
        assert_eq!(summary.transaction_count, 0);
        assert_eq!(summary.average_expense, 0.0);
        assert!(summary.period.is_none());
        assert!(category_breakdown(&txs).is_empty());
        assert!(cumulative_spend(&txs).is_empty());
        assert!(spending_trend(&txs).periods.is_empty());
    }

    #[test]
    fn test_category_breakdown_sorted_by_spend() {
        let txs = sample();
        let breakdown = category_breakdown(&txs);

        let order: Vec<Category> = breakdown.iter().map(|c| c.category).collect();
        assert_eq!(
            order,
            vec![
                Category::Groceries,
                Category::Transportation,
                Category::FoodAndDining,
                // zero spend: ties resolved by priority
                Category::Transfers,
                Category::Income,
            ]
        );

        let food = &breakdown[2];
        assert_eq!(food.count, 2);
        assert!(approx(food.spend, 10.0));
        assert!(approx(food.average_expense, 5.0));
        assert!(approx(food.share_of_spend, 10.0 / 115.0 * 100.0));

        let income = &breakdown[4];
        assert!(approx(income.income, 3000.0));

        let shares: f64 = breakdown.iter().map(|c| c.share_of_spend).sum();
        assert!(approx(shares, 100.0));
    }

    #[test]
    fn test_top_merchants() {
        let txs = sample();
        let top = top_merchants(&txs, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].merchant, "KROGER");
        assert_eq!(top[1].merchant, "SHELL GAS STATION");

        let all = top_merchants(&txs, 10);
        let starbucks = all.iter().find(|m| m.merchant == "STARBUCKS COFFEE").unwrap();
        assert_eq!(starbucks.count, 2);
        assert!(approx(starbucks.spend, 10.0));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_top_merchants_tie_broken_by_name() {
        let txs = vec![tx("2024-01-01", "Zeta Shop", -10.0), tx("2024-01-01", "Alpha Shop", -10.0)];
        let top = top_merchants(&txs, 5);
        assert_eq!(top[0].merchant, "ALPHA SHOP");
        assert_eq!(top[1].merchant, "ZETA SHOP");
    }

    #[test]
    fn test_weekday_matrix() {
        let txs = sample();
        let matrix = weekday_matrix(&txs);

        assert_eq!(matrix.weekdays.len(), 7);
        assert_eq!(matrix.weekdays[0], "Mon");
        assert_eq!(
            matrix.categories,
            vec![Category::FoodAndDining, Category::Groceries, Category::Transportation]
        );

        // 2024-01-15 is a Monday, 2024-01-17 a Wednesday
        assert!(approx(matrix.get(Weekday::Mon, Category::FoodAndDining), 10.0));
        assert!(approx(matrix.get(Weekday::Wed, Category::Transportation), 45.0));
        assert_eq!(matrix.get(Weekday::Sun, Category::Groceries), 0.0);
        assert_eq!(matrix.get(Weekday::Mon, Category::Income), 0.0);

        let total: f64 = matrix.spend.iter().flatten().sum();
        assert!(approx(total, 115.0));
    }

    #[test]
    fn test_cumulative_spend() {
        let txs = sample();
        let points = cumulative_spend(&txs);

        assert_eq!(points.len(), 3);
        assert!(approx(points[0].spend, 10.0));
        assert!(approx(points[1].cumulative, 70.0));
        assert!(approx(points[2].cumulative, 115.0));
    }

    #[test]
    fn test_trend_weekly_for_short_ranges() {
        let txs = sample();
        let trend = spending_trend(&txs);

        assert_eq!(trend.granularity, Granularity::Weekly);
        assert_eq!(trend.periods, vec!["Jan 15".to_string()]);
        assert_eq!(trend.series.len(), 3);
        assert!(approx(trend.series[1].values[0], 60.0));
    }

    #[test]
    fn test_trend_monthly_for_long_ranges() {
        let txs = vec![
            tx("2024-01-05", "Kroger", -10.0),
            tx("2024-02-10", "Kroger", -20.0),
            tx("2024-03-20", "Uber Trip", -30.0),
        ];
        let trend = spending_trend(&txs);

        assert_eq!(trend.granularity, Granularity::Monthly);
        assert_eq!(trend.periods, vec!["Jan 2024", "Feb 2024", "Mar 2024"]);

        let groceries = &trend.series[0];
        assert_eq!(groceries.category, Category::Groceries);
        assert_eq!(groceries.values, vec![10.0, 20.0, 0.0]);
        assert_eq!(trend.series[1].values, vec![0.0, 0.0, 30.0]);
    }

    #[test]
    fn test_report_over_filtered_subset() {
        let txs = sample();
        let groceries: Vec<&CategorizedTransaction> =
            txs.iter().filter(|t| t.category == Category::Groceries).collect();

        let report = Report::build(&groceries, 5);
        assert_eq!(report.summary.transaction_count, 1);
        assert!(approx(report.summary.total_spend, 60.0));
        assert_eq!(report.categories.len(), 1);
        assert_eq!(report.top_merchants[0].merchant, "KROGER");
    }
}
