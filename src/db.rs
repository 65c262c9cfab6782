use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;

/// The fixed set of tracked competitors, seeded on init.
pub const COMPETITORS: &[(&str, &str)] = &[
    ("onwardticket.com", "https://onwardticket.com"),
    ("bestonwardticket.com", "https://bestonwardticket.com"),
    ("dummyticket.com", "https://dummyticket.com"),
    ("dummy-tickets.com", "https://dummy-tickets.com"),
    ("vizafly.com", "https://vizafly.com"),
];

pub fn connect(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS competitors (
            id         INTEGER PRIMARY KEY,
            domain     TEXT UNIQUE NOT NULL,
            base_url   TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One canonical price record per competitor per day.
        CREATE TABLE IF NOT EXISTS prices (
            id            INTEGER PRIMARY KEY,
            competitor_id INTEGER NOT NULL REFERENCES competitors(id),
            scrape_date   TEXT NOT NULL,
            scraped_at    TEXT NOT NULL,
            main_price    REAL,
            currency      TEXT NOT NULL DEFAULT 'USD',
            addons        TEXT,
            source_url    TEXT,
            UNIQUE(competitor_id, scrape_date)
        );
        CREATE INDEX IF NOT EXISTS idx_prices_competitor_date
            ON prices(competitor_id, scrape_date);

        -- Fixed four-category offering vector per competitor per day.
        CREATE TABLE IF NOT EXISTS offerings (
            id                  INTEGER PRIMARY KEY,
            competitor_id       INTEGER NOT NULL REFERENCES competitors(id),
            scrape_date         TEXT NOT NULL,
            scraped_at          TEXT NOT NULL,
            one_way_offered     INTEGER NOT NULL DEFAULT 0,
            one_way_price       REAL,
            round_trip_offered  INTEGER NOT NULL DEFAULT 0,
            round_trip_price    REAL,
            hotel_offered       INTEGER NOT NULL DEFAULT 0,
            hotel_price         REAL,
            visa_letter_offered INTEGER NOT NULL DEFAULT 0,
            visa_letter_price   REAL,
            source_url          TEXT,
            UNIQUE(competitor_id, scrape_date)
        );
        CREATE INDEX IF NOT EXISTS idx_offerings_competitor_date
            ON offerings(competitor_id, scrape_date);

        CREATE TABLE IF NOT EXISTS snapshots (
            id            INTEGER PRIMARY KEY,
            competitor_id INTEGER NOT NULL REFERENCES competitors(id),
            scrape_date   TEXT NOT NULL,
            scraped_at    TEXT NOT NULL,
            page_role     TEXT NOT NULL,
            page_url      TEXT NOT NULL,
            content       TEXT NOT NULL,
            content_hash  TEXT NOT NULL,
            UNIQUE(competitor_id, scrape_date, page_role)
        );
        CREATE INDEX IF NOT EXISTS idx_snapshots_competitor_date
            ON snapshots(competitor_id, scrape_date);

        -- Third-party review stats, one row per competitor per day per source.
        CREATE TABLE IF NOT EXISTS reviews (
            id            INTEGER PRIMARY KEY,
            competitor_id INTEGER NOT NULL REFERENCES competitors(id),
            scrape_date   TEXT NOT NULL,
            scraped_at    TEXT NOT NULL,
            source        TEXT NOT NULL,
            rating        REAL,
            review_count  INTEGER,
            source_url    TEXT,
            UNIQUE(competitor_id, scrape_date, source)
        );
        CREATE INDEX IF NOT EXISTS idx_reviews_competitor_date
            ON reviews(competitor_id, scrape_date);

        -- A/B testing frameworks detected in page markup, per day.
        CREATE TABLE IF NOT EXISTS ab_tests (
            id            INTEGER PRIMARY KEY,
            competitor_id INTEGER NOT NULL REFERENCES competitors(id),
            scrape_date   TEXT NOT NULL,
            scraped_at    TEXT NOT NULL,
            frameworks    TEXT NOT NULL,
            UNIQUE(competitor_id, scrape_date)
        );

        CREATE TABLE IF NOT EXISTS changes (
            id                   INTEGER PRIMARY KEY,
            competitor_id        INTEGER NOT NULL REFERENCES competitors(id),
            change_date          TEXT NOT NULL,
            page_role            TEXT NOT NULL,
            previous_snapshot_id INTEGER REFERENCES snapshots(id),
            current_snapshot_id  INTEGER REFERENCES snapshots(id),
            categories           TEXT NOT NULL,
            summary              TEXT NOT NULL,
            diff_text            TEXT,
            additions            INTEGER NOT NULL DEFAULT 0,
            removals             INTEGER NOT NULL DEFAULT 0,
            UNIQUE(competitor_id, change_date, page_role)
        );
        CREATE INDEX IF NOT EXISTS idx_changes_competitor_date
            ON changes(competitor_id, change_date);
        ",
    )?;
    Ok(())
}

pub fn seed_competitors(conn: &Connection) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO competitors (domain, base_url) VALUES (?1, ?2)")?;
        for (domain, base_url) in COMPETITORS {
            count += stmt.execute(rusqlite::params![domain, base_url])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

#[derive(Debug, Clone)]
pub struct Competitor {
    pub id: i64,
    pub domain: String,
    pub base_url: String,
}

pub fn fetch_competitors(conn: &Connection) -> Result<Vec<Competitor>> {
    let mut stmt = conn.prepare("SELECT id, domain, base_url FROM competitors ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Competitor {
                id: row.get(0)?,
                domain: row.get(1)?,
                base_url: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Daily records ──

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub competitor_id: i64,
    pub scrape_date: String,
    pub scraped_at: String,
    pub main_price: Option<f64>,
    pub currency: String,
    pub addons: Option<String>,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OfferingRow {
    pub competitor_id: i64,
    pub scrape_date: String,
    pub scraped_at: String,
    pub one_way_offered: bool,
    pub one_way_price: Option<f64>,
    pub round_trip_offered: bool,
    pub round_trip_price: Option<f64>,
    pub hotel_offered: bool,
    pub hotel_price: Option<f64>,
    pub visa_letter_offered: bool,
    pub visa_letter_price: Option<f64>,
    pub source_url: String,
}

/// Replace-if-exists keyed on (competitor_id, scrape_date): a same-day
/// re-run overwrites, never appends.
pub fn upsert_price(conn: &Connection, row: &PriceRow) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO prices
         (competitor_id, scrape_date, scraped_at, main_price, currency, addons, source_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.competitor_id,
            row.scrape_date,
            row.scraped_at,
            row.main_price,
            row.currency,
            row.addons,
            row.source_url,
        ],
    )?;
    Ok(())
}

pub fn upsert_offerings(conn: &Connection, row: &OfferingRow) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO offerings (
            competitor_id, scrape_date, scraped_at,
            one_way_offered, one_way_price,
            round_trip_offered, round_trip_price,
            hotel_offered, hotel_price,
            visa_letter_offered, visa_letter_price,
            source_url
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            row.competitor_id,
            row.scrape_date,
            row.scraped_at,
            row.one_way_offered,
            row.one_way_price,
            row.round_trip_offered,
            row.round_trip_price,
            row.hotel_offered,
            row.hotel_price,
            row.visa_letter_offered,
            row.visa_letter_price,
            row.source_url,
        ],
    )?;
    Ok(())
}

// ── Snapshots & changes ──

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub competitor_id: i64,
    pub scrape_date: String,
    pub scraped_at: String,
    pub page_role: String,
    pub page_url: String,
    pub content: String,
    pub content_hash: String,
}

/// A prior snapshot as loaded for differencing.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub id: i64,
    pub scrape_date: String,
    pub content: String,
    pub content_hash: String,
}

/// One snapshot per (competitor, date, role); a same-day re-run overwrites
/// in place. The conflict clause keeps the rowid stable, so change rows
/// already referencing today's snapshot stay valid under foreign keys.
/// Returns the stored row id.
pub fn upsert_snapshot(conn: &Connection, row: &SnapshotRow) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO snapshots
         (competitor_id, scrape_date, scraped_at, page_role, page_url, content, content_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(competitor_id, scrape_date, page_role) DO UPDATE SET
             scraped_at = excluded.scraped_at,
             page_url = excluded.page_url,
             content = excluded.content,
             content_hash = excluded.content_hash
         RETURNING id",
        rusqlite::params![
            row.competitor_id,
            row.scrape_date,
            row.scraped_at,
            row.page_role,
            row.page_url,
            row.content,
            row.content_hash,
        ],
        |r| r.get(0),
    )?;
    Ok(id)
}

/// Most recent snapshot strictly before `before_date` for the same
/// competitor and page role. A gap of several days is fine; the diff
/// baseline is simply the last successful capture.
pub fn latest_previous_snapshot(
    conn: &Connection,
    competitor_id: i64,
    page_role: &str,
    before_date: &str,
) -> Result<Option<StoredSnapshot>> {
    let mut stmt = conn.prepare(
        "SELECT id, scrape_date, content, content_hash
         FROM snapshots
         WHERE competitor_id = ?1 AND page_role = ?2 AND scrape_date < ?3
         ORDER BY scrape_date DESC
         LIMIT 1",
    )?;
    let row = stmt
        .query_row(
            rusqlite::params![competitor_id, page_role, before_date],
            |row| {
                Ok(StoredSnapshot {
                    id: row.get(0)?,
                    scrape_date: row.get(1)?,
                    content: row.get(2)?,
                    content_hash: row.get(3)?,
                })
            },
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    Ok(row)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRow {
    pub competitor_id: i64,
    pub change_date: String,
    pub page_role: String,
    pub previous_snapshot_id: i64,
    pub current_snapshot_id: i64,
    pub categories: String,
    pub summary: String,
    pub diff_text: String,
    pub additions: i64,
    pub removals: i64,
}

pub fn upsert_change(conn: &Connection, row: &ChangeRow) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO changes (
            competitor_id, change_date, page_role,
            previous_snapshot_id, current_snapshot_id,
            categories, summary, diff_text, additions, removals
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            row.competitor_id,
            row.change_date,
            row.page_role,
            row.previous_snapshot_id,
            row.current_snapshot_id,
            row.categories,
            row.summary,
            row.diff_text,
            row.additions,
            row.removals,
        ],
    )?;
    Ok(())
}

// ── Review and A/B signals ──

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    pub competitor_id: i64,
    pub scrape_date: String,
    pub scraped_at: String,
    pub source: String,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub source_url: String,
}

pub fn upsert_review(conn: &Connection, row: &ReviewRow) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO reviews
         (competitor_id, scrape_date, scraped_at, source, rating, review_count, source_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.competitor_id,
            row.scrape_date,
            row.scraped_at,
            row.source,
            row.rating,
            row.review_count,
            row.source_url,
        ],
    )?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbTestRow {
    pub competitor_id: i64,
    pub scrape_date: String,
    pub scraped_at: String,
    pub frameworks: String,
}

pub fn upsert_ab_tests(conn: &Connection, row: &AbTestRow) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO ab_tests
         (competitor_id, scrape_date, scraped_at, frameworks)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            row.competitor_id,
            row.scrape_date,
            row.scraped_at,
            row.frameworks,
        ],
    )?;
    Ok(())
}

pub struct ReviewOverviewRow {
    pub domain: String,
    pub source: String,
    pub scrape_date: String,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
}

/// Latest review stats per competitor per source.
pub fn fetch_review_overview(conn: &Connection, limit: usize) -> Result<Vec<ReviewOverviewRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.domain, r.source, r.scrape_date, r.rating, r.review_count
         FROM reviews r
         JOIN competitors c ON c.id = r.competitor_id
         WHERE r.scrape_date = (
             SELECT MAX(scrape_date) FROM reviews
             WHERE competitor_id = r.competitor_id AND source = r.source
         )
         ORDER BY c.domain, r.source
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok(ReviewOverviewRow {
                domain: row.get(0)?,
                source: row.get(1)?,
                scrape_date: row.get(2)?,
                rating: row.get(3)?,
                review_count: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Reporting ──

pub struct Stats {
    pub competitors: usize,
    pub prices: usize,
    pub offerings: usize,
    pub snapshots: usize,
    pub changes: usize,
    pub reviews: usize,
    pub ab_tests: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |table: &str| -> Result<usize> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
    };
    Ok(Stats {
        competitors: count("competitors")?,
        prices: count("prices")?,
        offerings: count("offerings")?,
        snapshots: count("snapshots")?,
        changes: count("changes")?,
        reviews: count("reviews")?,
        ab_tests: count("ab_tests")?,
    })
}

pub struct PriceOverviewRow {
    pub domain: String,
    pub scrape_date: String,
    pub main_price: Option<f64>,
    pub currency: String,
    pub addon_count: usize,
    pub frameworks: Vec<String>,
}

/// Latest price per competitor, with the most recently detected A/B
/// frameworks alongside.
pub fn fetch_price_overview(conn: &Connection, limit: usize) -> Result<Vec<PriceOverviewRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.domain, p.scrape_date, p.main_price, p.currency, p.addons,
                (SELECT frameworks FROM ab_tests a
                 WHERE a.competitor_id = p.competitor_id
                 ORDER BY a.scrape_date DESC LIMIT 1)
         FROM prices p
         JOIN competitors c ON c.id = p.competitor_id
         WHERE p.scrape_date = (
             SELECT MAX(scrape_date) FROM prices WHERE competitor_id = p.competitor_id
         )
         ORDER BY c.domain
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit], |row| {
            let addons: Option<String> = row.get(4)?;
            let addon_count = addons
                .as_deref()
                .and_then(|a| serde_json::from_str::<Vec<serde_json::Value>>(a).ok())
                .map(|v| v.len())
                .unwrap_or(0);
            let frameworks: Option<String> = row.get(5)?;
            let frameworks = frameworks
                .as_deref()
                .and_then(|f| serde_json::from_str::<Vec<String>>(f).ok())
                .unwrap_or_default();
            Ok(PriceOverviewRow {
                domain: row.get(0)?,
                scrape_date: row.get(1)?,
                main_price: row.get(2)?,
                currency: row.get(3)?,
                addon_count,
                frameworks,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct ChangeListRow {
    pub domain: String,
    pub change_date: String,
    pub page_role: String,
    pub summary: String,
    pub additions: i64,
    pub removals: i64,
}

pub fn fetch_recent_changes(conn: &Connection, limit: usize) -> Result<Vec<ChangeListRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.domain, ch.change_date, ch.page_role, ch.summary, ch.additions, ch.removals
         FROM changes ch
         JOIN competitors c ON c.id = ch.competitor_id
         ORDER BY ch.change_date DESC, c.domain
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok(ChangeListRow {
                domain: row.get(0)?,
                change_date: row.get(1)?,
                page_role: row.get(2)?,
                summary: row.get(3)?,
                additions: row.get(4)?,
                removals: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Tests ──
