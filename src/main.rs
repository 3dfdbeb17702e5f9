use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flood_sos_analytics::config::{DEFAULT_API_URL, DEFAULT_PAGE_SIZE, DEFAULT_PAGE_TIMEOUT_SECS};
use flood_sos_analytics::{crosstab, report, source, timeline};
use flood_sos_analytics::{
    FetchConfig, FetchLoop, FlagFilter, HttpPageSource, PageSource, RecordFilter,
    SnapshotPageSource, TimeRange,
};

#[derive(Parser)]
#[command(name = "sos-analytics")]
#[command(about = "District analytics for flood SOS case records", long_about = None)]
struct Cli {
    /// Paginated SOS endpoint
    #[arg(long, env = "SOS_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,
    #[arg(long, env = "SOS_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE, global = true)]
    page_size: u32,
    #[arg(long, env = "SOS_PAGE_TIMEOUT_SECS", default_value_t = DEFAULT_PAGE_TIMEOUT_SECS, global = true)]
    page_timeout_secs: u64,
    /// Read records from a saved JSON snapshot instead of the API
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
    #[command(flatten)]
    filters: FilterArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long, global = true)]
    district: Option<String>,
    #[arg(long, global = true)]
    status: Option<String>,
    #[arg(long, global = true)]
    priority: Option<String>,
    #[arg(long, global = true)]
    emergency_type: Option<String>,
    #[arg(long, value_enum, default_value_t = FlagFilter::Any, global = true)]
    children: FlagFilter,
    #[arg(long, value_enum, default_value_t = FlagFilter::Any, global = true)]
    elderly: FlagFilter,
    #[arg(long, value_enum, default_value_t = FlagFilter::Any, global = true)]
    medical: FlagFilter,
    /// Match name, reference, phone, address or district
    #[arg(long, global = true)]
    search: Option<String>,
}

impl FilterArgs {
    fn into_filter(self) -> RecordFilter {
        RecordFilter {
            district: self.district,
            status: self.status,
            priority: self.priority,
            emergency_type: self.emergency_type,
            has_children: self.children,
            has_elderly: self.elderly,
            has_medical_emergency: self.medical,
            search: self.search,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum TimelineMode {
    Daily,
    Hourly,
    Cumulative,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the district summary
    Summary {
        #[arg(long, default_value_t = 25)]
        limit: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Write the district summary as CSV
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Submissions over time
    Timeline {
        #[arg(long, value_enum, default_value_t = TimelineMode::Daily)]
        mode: TimelineMode,
        #[arg(long, value_enum, default_value_t = TimeRange::All)]
        range: TimeRange,
    },
    /// Compare intake sources
    Sources,
    /// Busiest districts for one intake source, or all of them
    SourceDistricts {
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Average hours to rescue per district
    ResponseTimes {
        #[arg(long, default_value_t = 15)]
        limit: usize,
    },
    /// Save the fetched records for offline use
    Snapshot {
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("flood_sos_analytics=info,sos_analytics=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = FetchConfig {
        base_url: cli.api_url,
        page_size: cli.page_size,
        page_timeout: Duration::from_secs(cli.page_timeout_secs),
    };

    let page_source: Box<dyn PageSource> = match &cli.snapshot {
        Some(path) => Box::new(
            SnapshotPageSource::load(path)
                .with_context(|| format!("failed to load snapshot {}", path.display()))?,
        ),
        None => Box::new(HttpPageSource::new(config.clone()).context("failed to build HTTP client")?),
    };

    let fetcher = FetchLoop::new(page_source, &config);
    let fetched = fetcher
        .refresh(|p| {
            info!(
                "page {}/{}: {} of {} records",
                p.current_page, p.total_pages, p.fetched, p.total_expected
            )
        })
        .await;

    let dashboard = fetcher.dashboard();
    let mut dashboard = dashboard.lock().await;
    if let Err(err) = fetched {
        warn!(
            "fetch stopped early: {err}; continuing with {} records",
            dashboard.records().len()
        );
    }

    dashboard.set_filter(cli.filters.into_filter());
    let view = dashboard.view().clone();
    if view.is_filtered() {
        println!(
            "Showing {} of {} records.",
            view.filtered_count, view.total_count
        );
    }
    let records = dashboard.filtered_records();

    match cli.command {
        Commands::Summary { limit, format } => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
            OutputFormat::Table => {
                if view.summaries.is_empty() {
                    println!("No cases found.");
                    return Ok(());
                }
                let t = &view.totals;
                println!(
                    "{} cases, {} people, {} critical, {} pending, {} verified, {} rescued, {} missing, {} cannot contact",
                    t.total, t.total_people, t.critical, t.pending, t.verified, t.rescued, t.missing, t.cannot_contact
                );
                println!("Districts by case count:");
                for d in view.summaries.iter().take(limit) {
                    println!(
                        "- {} {} cases ({} people): pending {}, verified {}, rescued {}, critical {}",
                        d.district, d.total, d.total_people, d.pending, d.verified, d.rescued, d.critical
                    );
                }
            }
        },
        Commands::Export { out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(report::export_file_name(Utc::now())));
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            report::write_csv(file, &view.summaries)?;
            println!("Wrote {} districts to {}.", view.summaries.len(), out.display());
        }
        Commands::Report { out } => {
            let scope = dashboard.filter().is_active().then_some("filtered records");
            let text = report::build_report(scope, Utc::now(), &records, &Local);
            std::fs::write(&out, text)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Timeline { mode, range } => {
            let selected = range.select(records.iter().copied(), Utc::now());
            match mode {
                TimelineMode::Daily => {
                    for day in timeline::daily_counts(selected.iter().copied(), &Local) {
                        println!("{} {}", day.date, day.count);
                    }
                }
                TimelineMode::Hourly => {
                    for hour in timeline::hourly_counts(selected.iter().copied(), &Local) {
                        println!("{} {}", hour.hour.format("%Y-%m-%d %H:00"), hour.count);
                    }
                }
                TimelineMode::Cumulative => {
                    for day in timeline::cumulative_counts(selected.iter().copied(), &Local) {
                        println!("{} {} {}", day.date, day.count, day.cumulative);
                    }
                }
            }
        }
        Commands::Sources => {
            for row in crosstab::source_comparison(records.iter().copied()) {
                println!(
                    "- {}: {} cases, {} people, {} critical, {} pending, {} rescued ({:.1}%)",
                    row.source, row.total, row.people, row.critical, row.pending, row.rescued, row.rescue_rate
                );
            }
        }
        Commands::SourceDistricts { source, limit } => {
            let rows = crosstab::districts_by_source(records.iter().copied(), source.as_deref(), limit);
            if rows.is_empty() {
                println!("No cases for that source.");
                return Ok(());
            }
            for row in rows {
                println!("- {} {}", row.district, row.count);
            }
        }
        Commands::ResponseTimes { limit } => {
            let times = crosstab::response_times(records.iter().copied());
            if times.is_empty() {
                println!("No resolved cases with usable timestamps.");
                return Ok(());
            }
            println!(
                "Average across districts: {:.1} hours",
                crosstab::overall_response_hours(&times)
            );
            for row in times.iter().take(limit) {
                println!("- {} {:.1} hours ({} cases)", row.district, row.avg_hours, row.count);
            }
        }
        Commands::Snapshot { out } => {
            source::save_snapshot(&out, dashboard.records())?;
            println!(
                "Saved {} records to {}.",
                dashboard.records().len(),
                out.display()
            );
        }
    }

    Ok(())
}
