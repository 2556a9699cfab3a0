use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use themescan::config::parse_column_list;
use themescan::models::RunSummary;
use themescan::{ClassificationPipeline, Config};

#[derive(Parser, Debug)]
#[command(name = "themescan")]
#[command(version = "0.1.0")]
#[command(about = "Count research papers by theme and sub-theme using keyword matching")]
struct Args {
    /// Corpus file (.csv, .tsv, .json, .jsonl)
    #[arg(short, long)]
    input: PathBuf,

    /// Schema file defining themes, sub-themes and keywords (YAML or JSON)
    #[arg(short, long)]
    schema: PathBuf,

    /// Output directory for the CSV tables
    #[arg(short, long)]
    outdir: Option<PathBuf>,

    /// Comma-separated text columns to search (overrides the schema's match_fields)
    #[arg(long)]
    text_cols: Option<String>,

    /// Comma-separated id columns, in priority order
    #[arg(long)]
    id_cols: Option<String>,

    /// Summary format (text, markdown, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Write the summary to a file instead of stdout
    #[arg(long)]
    summary_out: Option<PathBuf>,

    /// SQLite database to record the run in
    #[arg(long)]
    database: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        "themescan=debug"
    } else if args.quiet {
        "themescan=warn"
    } else {
        "themescan=info"
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration, CLI flags take precedence
    let mut config = Config::from_env()?;
    if let Some(ref outdir) = args.outdir {
        config.output_dir = outdir.clone();
    }
    if let Some(ref raw) = args.text_cols {
        config.text_columns = Some(parse_column_list(raw, "--text-cols")?);
    }
    if let Some(ref raw) = args.id_cols {
        config.id_columns = Some(parse_column_list(raw, "--id-cols")?);
    }
    if let Some(ref db) = args.database {
        config.database_path = Some(db.clone());
    }

    tracing::info!(
        "Classifying {} with schema {}",
        args.input.display(),
        args.schema.display()
    );

    let pipeline = ClassificationPipeline::new(config).with_progress(!args.quiet);
    let outcome = match pipeline.run(&args.input, &args.schema) {
        Ok(outcome) => outcome,
        Err(e) if e.is_fatal_input() => {
            tracing::error!("{}", e);
            anyhow::bail!("aborted, no output written: {}", e);
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(run_id) = outcome.run_id {
        tracing::info!("Recorded as run {}", run_id);
    }

    output_summary(&outcome.summary, &args)?;

    Ok(())
}

fn output_summary(summary: &RunSummary, args: &Args) -> anyhow::Result<()> {
    let output = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(summary)?,
        "markdown" => format_markdown(summary),
        _ => format_text(summary),
    };

    if let Some(ref path) = args.summary_out {
        std::fs::write(path, &output)?;
        tracing::info!("Summary written to: {}", path.display());
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_text(summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push_str("\n=== Sub-theme Screening ===\n\n");
    output.push_str(&format!("Papers processed: {}\n", summary.papers_processed));
    output.push_str(&format!("Distinct paper ids: {}\n", summary.distinct_papers));
    output.push_str(&format!("Papers with any match: {}\n", summary.matched_papers));
    output.push_str(&format!("Keyword hits: {}\n", summary.total_hits));
    if summary.duplicate_ids > 0 {
        output.push_str(&format!("Duplicate ids merged: {}\n", summary.duplicate_ids));
    }

    let mut current_theme: Option<&str> = None;
    for count in &summary.counts {
        if current_theme != Some(count.theme.as_str()) {
            output.push_str(&format!("\n{}:\n", count.theme));
            current_theme = Some(count.theme.as_str());
        }
        output.push_str(&format!(
            "  - {}: {} papers ({} keywords)\n",
            count.sub_theme, count.paper_count, count.keyword_count
        ));
    }

    output.push_str(&format!(
        "\nGenerated on: {}\n",
        summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

fn format_markdown(summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push_str("# Sub-theme Screening\n\n");
    output.push_str("| Metric | Value |\n|--------|-------|\n");
    output.push_str(&format!("| Papers Processed | {} |\n", summary.papers_processed));
    output.push_str(&format!("| Distinct Paper Ids | {} |\n", summary.distinct_papers));
    output.push_str(&format!("| Papers With Any Match | {} |\n", summary.matched_papers));
    output.push_str(&format!("| Keyword Hits | {} |\n", summary.total_hits));
    output.push_str(&format!("| Duplicate Ids | {} |\n", summary.duplicate_ids));

    output.push_str("\n## Sub-theme Counts\n\n");
    output.push_str("| Theme | Sub-theme | Papers | Keywords |\n");
    output.push_str("|-------|-----------|--------|----------|\n");
    for count in &summary.counts {
        output.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            count.theme, count.sub_theme, count.paper_count, count.keyword_count
        ));
    }

    output.push_str(&format!(
        "\n---\n*Generated on {}*\n",
        summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}
