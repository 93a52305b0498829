// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

use expense_classifier::logging::init_tracing;
use expense_classifier::{
    parse_category_filter, parse_columns, write_csv, AppConfig, Category, Classifier, ExportColumn,
    NormalizeOptions, Report, Session,
};

#[derive(Parser, Debug)]
#[command(name = "expense-classifier", version, about = "Categorize bank transactions from a CSV export")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify every row and write the result as CSV
    Classify {
        csv: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated export columns
        #[arg(long, default_value = "date,description,amount,category")]
        columns: String,
        #[command(flatten)]
        import: ImportArgs,
    },
    /// Print totals, category breakdown and top merchants
    Summary {
        csv: PathBuf,
        /// Number of merchants to list
        #[arg(long)]
        top: Option<usize>,
        /// Only include these categories (comma-separated labels)
        #[arg(long)]
        categories: Option<String>,
        /// Emit the full report as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        import: ImportArgs,
    },
    /// List categories in priority order with their keywords
    Categories,
    /// Open the terminal dashboard
    Tui {
        csv: PathBuf,
        #[command(flatten)]
        import: ImportArgs,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ImportArgs {
    /// Rows to skip before the header (disables auto-detection)
    #[arg(long)]
    skip_rows: Option<usize>,
    /// Take the first row as the header
    #[arg(long)]
    no_auto_detect: bool,
}

impl ImportArgs {
    fn options(&self, config: &AppConfig) -> NormalizeOptions {
        let mut options = config.normalize_options();
        if let Some(skip_rows) = self.skip_rows {
            options.skip_rows = skip_rows;
            options.auto_detect_header = false;
        }
        if self.no_auto_detect {
            options.auto_detect_header = false;
        }
        options
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let classifier = config.build_classifier()?;
    debug!(keywords = classifier.table().keyword_count(), "keyword table loaded");

    match cli.command {
        Command::Classify {
            csv,
            output,
            columns,
            import,
        } => run_classify(&csv, output.as_deref(), &columns, &import.options(&config), &classifier),
        Command::Summary {
            csv,
            top,
            categories,
            json,
            import,
        } => {
            let top = top.unwrap_or(config.analysis.top_merchants);
            run_summary(&csv, top, categories.as_deref(), json, &import.options(&config), &classifier)
        }
        Command::Categories => run_categories(&classifier),
        Command::Tui { csv, import } => run_ui_mode(&csv, &import.options(&config), &classifier, &config),
    }
}

fn load_session(path: &Path, options: &NormalizeOptions, classifier: &Classifier) -> Result<Session> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Session::from_reader(&name, BufReader::new(file), classifier, options)
        .with_context(|| format!("Failed to import {}", path.display()))
}

fn run_classify(
    csv: &Path,
    output: Option<&Path>,
    columns: &str,
    options: &NormalizeOptions,
    classifier: &Classifier,
) -> Result<()> {
    let columns: Vec<ExportColumn> = parse_columns(columns)?;
    let session = load_session(csv, options, classifier)?;

    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            let written = write_csv(file, &session.transactions, &columns)?;
            println!("✓ Classified {} transactions → {}", written, path.display());
            if session.skipped_count() > 0 {
                println!("⚠️  Skipped {} row(s) with invalid date or amount", session.skipped_count());
            }
        }
        None => {
            write_csv(io::stdout().lock(), &session.transactions, &columns)?;
        }
    }

    Ok(())
}

fn run_summary(
    csv: &Path,
    top: usize,
    categories: Option<&str>,
    json: bool,
    options: &NormalizeOptions,
    classifier: &Classifier,
) -> Result<()> {
    let session = load_session(csv, options, classifier)?;
    let filter = match categories {
        Some(raw) => parse_category_filter(raw)?,
        None => Default::default(),
    };
    let report = Report::build(&session.filtered(&filter), top);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let summary = &report.summary;
    println!("📊 {}", session.source_name);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Transactions:    {}", summary.transaction_count);
    println!("Total spend:     {:>12.2}", summary.total_spend);
    println!("Total income:    {:>12.2}", summary.total_income);
    println!("Net cashflow:    {:>12.2} ({})", summary.net_cashflow, summary.cashflow_label());
    println!("Average expense: {:>12.2}", summary.average_expense);
    if let Some(period) = &summary.period {
        println!("Period:          {} → {} ({} days)", period.start, period.end, period.days);
    }

    println!("\nBy category:");
    for c in &report.categories {
        println!(
            "  {:<25} {:>4} tx  spend {:>10.2}  income {:>10.2}  {:>5.1}%",
            c.category.label(),
            c.count,
            c.spend,
            c.income,
            c.share_of_spend
        );
    }

    if !report.top_merchants.is_empty() {
        println!("\nTop {} merchants:", report.top_merchants.len());
        for (i, m) in report.top_merchants.iter().enumerate() {
            println!("  {}. {:<40} {:>10.2}  {:>5.1}%", i + 1, m.merchant, m.spend, m.share_of_spend);
        }
    }

    if session.skipped_count() > 0 {
        println!("\n⚠️  Skipped {} row(s):", session.skipped_count());
        for row in &session.skipped {
            println!("  line {}: {} ({:?}, {:?})", row.line, row.reason.message(), row.date, row.amount);
        }
    }

    Ok(())
}

fn run_categories(classifier: &Classifier) -> Result<()> {
    let table = classifier.table();
    for (i, category) in table.priority_order().into_iter().enumerate() {
        let keywords = table.keywords_for(category);
        if category == Category::Other {
            println!("{:>2}. {} (fallback)", i + 1, category);
        } else {
            println!("{:>2}. {} ({} keywords)", i + 1, category, keywords.len());
            println!("    {}", keywords.join(", "));
        }
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(csv: &Path, options: &NormalizeOptions, classifier: &Classifier, config: &AppConfig) -> Result<()> {
    let session = load_session(csv, options, classifier)?;
    println!("✓ Loaded {} transactions", session.transactions.len());

    let mut app = ui::App::new(session, config.analysis.top_merchants);
    ui::run_ui(&mut app)?;

    println!("✅ UI closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_csv: &Path, _options: &NormalizeOptions, _classifier: &Classifier, _config: &AppConfig) -> Result<()> {
    anyhow::bail!("TUI mode not available, rebuild with: cargo build --features tui")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_skip_rows_disables_detection() {
        let cli = Cli::parse_from(["expense-classifier", "classify", "in.csv", "--skip-rows", "3"]);
        let Command::Classify { import, columns, .. } = cli.command else {
            panic!("expected classify");
        };
        let options = import.options(&AppConfig::default());
        assert_eq!(options.skip_rows, 3);
        assert!(!options.auto_detect_header);
        assert_eq!(columns, "date,description,amount,category");
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["expense-classifier", "summary", "in.csv", "--json", "--config", "c.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(cli.command, Command::Summary { json: true, .. }));
    }

    #[test]
    fn test_classify_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, "Date,Description,Amount\n01/15/2024,Starbucks Coffee,-5.75\n").unwrap();

        run_classify(
            &input,
            Some(&output),
            "date,category",
            &NormalizeOptions::default(),
            &Classifier::default(),
        )
        .unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, "date,category\n2024-01-15,Food & Dining\n");
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_session(Path::new("/no/such.csv"), &NormalizeOptions::default(), &Classifier::default())
            .unwrap_err();
        assert!(err.to_string().contains("/no/such.csv"));
    }
}
