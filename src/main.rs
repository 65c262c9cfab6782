mod change;
mod db;
mod fetch;
mod pipeline;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::{info, warn};

use pipeline::page::PageContent;

#[derive(Parser)]
#[command(name = "competitor_tracker", about = "Daily competitor price and change tracker")]
struct Cli {
    /// SQLite database path
    #[arg(long, default_value = "data/competitors.sqlite", global = true)]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema and seed the tracked competitors
    Init,
    /// Fetch all competitors, extract prices/offerings, diff snapshots
    Run {
        /// Max competitors to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show table row counts
    Stats,
    /// Latest price per competitor
    Overview {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Most recent detected changes
    Changes {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Latest review stats per competitor and source
    Reviews {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let conn = db::connect(&cli.db_path)?;
    db::init_schema(&conn)?;

    let result = match cli.command {
        Commands::Init => {
            let inserted = db::seed_competitors(&conn)?;
            println!(
                "Seeded {} new competitors ({} tracked).",
                inserted,
                db::fetch_competitors(&conn)?.len()
            );
            Ok(())
        }
        Commands::Run { limit } => run_daily_pass(&conn, limit).await,
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Competitors: {}", s.competitors);
            println!("Prices:      {}", s.prices);
            println!("Offerings:   {}", s.offerings);
            println!("Snapshots:   {}", s.snapshots);
            println!("Changes:     {}", s.changes);
            println!("Reviews:     {}", s.reviews);
            println!("A/B scans:   {}", s.ab_tests);
            Ok(())
        }
        Commands::Overview { limit } => {
            let rows = db::fetch_price_overview(&conn, limit)?;
            if rows.is_empty() {
                println!("No price data yet. Run 'init' then 'run' first.");
                return Ok(());
            }
            println!(
                "{:<26} | {:<10} | {:>8} | {:<3} | {:>7} | {}",
                "Competitor", "Date", "Price", "Cur", "Add-ons", "A/B frameworks"
            );
            println!("{}", "-".repeat(90));
            for r in &rows {
                let price = r
                    .main_price
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "-".into());
                let frameworks = if r.frameworks.is_empty() {
                    "-".to_string()
                } else {
                    r.frameworks.join(", ")
                };
                println!(
                    "{:<26} | {:<10} | {:>8} | {:<3} | {:>7} | {}",
                    r.domain, r.scrape_date, price, r.currency, r.addon_count, frameworks
                );
            }
            Ok(())
        }
        Commands::Reviews { limit } => {
            let rows = db::fetch_review_overview(&conn, limit)?;
            if rows.is_empty() {
                println!("No review data yet.");
                return Ok(());
            }
            println!(
                "{:<26} | {:<10} | {:<10} | {:>6} | {:>8}",
                "Competitor", "Source", "Date", "Rating", "Reviews"
            );
            println!("{}", "-".repeat(72));
            for r in &rows {
                let rating = r
                    .rating
                    .map(|v| format!("{:.1}", v))
                    .unwrap_or_else(|| "-".into());
                let count = r
                    .review_count
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:<26} | {:<10} | {:<10} | {:>6} | {:>8}",
                    r.domain, r.source, r.scrape_date, rating, count
                );
            }
            Ok(())
        }
        Commands::Changes { limit } => {
            let rows = db::fetch_recent_changes(&conn, limit)?;
            if rows.is_empty() {
                println!("No changes detected yet.");
                return Ok(());
            }
            for r in &rows {
                println!(
                    "{} {:<26} [{}] +{} -{}  {}",
                    r.change_date, r.domain, r.page_role, r.additions, r.removals, r.summary
                );
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

struct RunCounts {
    subjects: usize,
    unreachable: usize,
    prices: usize,
    changes: usize,
    reviews: usize,
}

/// One full daily pass: fetch every competitor's pages sequentially,
/// reduce them to the canonical daily records, archive snapshots and
/// classify what moved since the last capture.
async fn run_daily_pass(conn: &Connection, limit: Option<usize>) -> Result<()> {
    let mut competitors = db::fetch_competitors(conn)?;
    if let Some(n) = limit {
        competitors.truncate(n);
    }
    if competitors.is_empty() {
        println!("No competitors seeded. Run 'init' first.");
        return Ok(());
    }

    let client = fetch::build_client()?;
    let scrape_date = Utc::now().date_naive();
    let scraped_at = Utc::now().to_rfc3339();

    let mut counts = RunCounts {
        subjects: competitors.len(),
        unreachable: 0,
        prices: 0,
        changes: 0,
        reviews: 0,
    };

    for competitor in &competitors {
        info!("processing {}", competitor.domain);
        let fetched = fetch::fetch_subject_pages(&client, &competitor.base_url).await;
        if fetched.is_empty() {
            warn!("{}: no pages reachable, keeping yesterday's records", competitor.domain);
            counts.unreachable += 1;
            continue;
        }

        let pages: Vec<PageContent> = fetched
            .iter()
            .map(|f| PageContent::from_html(&f.url, f.role, &f.html))
            .collect();

        let records = pipeline::build_daily_records(
            competitor.id,
            scrape_date,
            &scraped_at,
            &pages,
        );
        db::upsert_price(conn, &records.price)?;
        db::upsert_offerings(conn, &records.offerings)?;
        counts.prices += 1;

        match records.price.main_price {
            Some(p) => info!(
                "{}: main price {:.2} {}",
                competitor.domain, p, records.price.currency
            ),
            None => info!("{}: no price found", competitor.domain),
        }

        for (fetched_page, page) in fetched.iter().zip(&pages) {
            let Some(role) = fetch::snapshot_role(fetched_page.path) else {
                continue;
            };
            let content = page
                .clean_fragments()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let content_hash = change::content_hash(&content);
            let snapshot = db::SnapshotRow {
                competitor_id: competitor.id,
                scrape_date: scrape_date.to_string(),
                scraped_at: scraped_at.clone(),
                page_role: role.to_string(),
                page_url: page.url.clone(),
                content,
                content_hash,
            };
            let previous = db::latest_previous_snapshot(
                conn,
                competitor.id,
                role,
                &snapshot.scrape_date,
            )?;
            let snapshot_id = db::upsert_snapshot(conn, &snapshot)?;

            if let Some(draft) = change::detect_change(previous.as_ref(), &snapshot, snapshot_id) {
                let categories = serde_json::to_string(&draft.categories)?;
                db::upsert_change(
                    conn,
                    &db::ChangeRow {
                        competitor_id: competitor.id,
                        change_date: snapshot.scrape_date.clone(),
                        page_role: role.to_string(),
                        previous_snapshot_id: draft.previous_snapshot_id,
                        current_snapshot_id: snapshot_id,
                        categories,
                        summary: draft.summary.clone(),
                        diff_text: draft.diff_text,
                        additions: draft.additions as i64,
                        removals: draft.removals as i64,
                    },
                )?;
                info!("{} [{}]: {}", competitor.domain, role, draft.summary);
                counts.changes += 1;
            }
        }

        // A/B framework fingerprints live in raw markup, so the scan runs
        // over the fetched HTML, not the filtered fragments.
        let mut frameworks: Vec<&str> = Vec::new();
        for fetched_page in &fetched {
            for name in pipeline::experiments::detect_frameworks(&fetched_page.html) {
                if !frameworks.contains(&name) {
                    frameworks.push(name);
                }
            }
        }
        db::upsert_ab_tests(
            conn,
            &db::AbTestRow {
                competitor_id: competitor.id,
                scrape_date: scrape_date.to_string(),
                scraped_at: scraped_at.clone(),
                frameworks: serde_json::to_string(&frameworks)?,
            },
        )?;
        if !frameworks.is_empty() {
            info!("{}: A/B frameworks: {}", competitor.domain, frameworks.join(", "));
        }

        for source in pipeline::reviews::ReviewSource::ALL {
            fetch::polite_delay().await;
            let url = source.page_url(&competitor.domain);
            let html = match fetch::fetch_page(&client, &url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("skipping {}: {}", url, e);
                    continue;
                }
            };
            let stats = pipeline::reviews::extract_review_stats(&html);
            if stats.is_empty() {
                warn!(
                    "{}: no {} review metrics parsed",
                    competitor.domain,
                    source.as_str()
                );
                continue;
            }
            db::upsert_review(
                conn,
                &db::ReviewRow {
                    competitor_id: competitor.id,
                    scrape_date: scrape_date.to_string(),
                    scraped_at: scraped_at.clone(),
                    source: source.as_str().to_string(),
                    rating: stats.rating,
                    review_count: stats.review_count,
                    source_url: url,
                },
            )?;
            counts.reviews += 1;
        }
    }

    println!(
        "Processed {} competitors ({} unreachable): {} price records, {} changes, {} review rows.",
        counts.subjects, counts.unreachable, counts.prices, counts.changes, counts.reviews
    );
    Ok(())
}
