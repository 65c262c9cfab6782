pub mod experiments;
pub mod noise;
pub mod offerings;
pub mod page;
pub mod price;
pub mod reviews;

use chrono::NaiveDate;

use crate::db::{OfferingRow, PriceRow};
use page::PageContent;
use price::DEFAULT_CURRENCY;

/// The two canonical daily records for one subject. Built deterministically:
/// identical inputs yield bit-identical rows, so a same-day re-run upserts
/// the same data.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecords {
    pub price: PriceRow,
    pub offerings: OfferingRow,
}

/// Reduce the day's pages for one subject into exactly one price record and
/// one offering record. Pages are evaluated primary-first regardless of
/// fetch order; that precedence is what makes the homepage win ties.
pub fn build_daily_records(
    competitor_id: i64,
    scrape_date: NaiveDate,
    scraped_at: &str,
    pages: &[PageContent],
) -> DailyRecords {
    let mut ordered: Vec<PageContent> = pages.to_vec();
    ordered.sort_by_key(|p| p.role);

    let extraction = price::extract_prices(&ordered);
    let flags = offerings::classify_offerings(&ordered);

    let primary_url = ordered
        .first()
        .map(|p| p.url.clone())
        .unwrap_or_default();

    let (main_price, currency, price_source_url) = match &extraction.main {
        Some(main) => (
            Some(main.amount),
            main.currency.clone(),
            main.source_url.clone(),
        ),
        None => (None, DEFAULT_CURRENCY.to_string(), primary_url.clone()),
    };

    let addons = if extraction.addons.is_empty() {
        None
    } else {
        // Insertion order is encounter order; serde_json preserves it.
        serde_json::to_string(&extraction.addons).ok()
    };

    let price_row = PriceRow {
        competitor_id,
        scrape_date: scrape_date.to_string(),
        scraped_at: scraped_at.to_string(),
        main_price,
        currency,
        addons,
        source_url: price_source_url,
    };

    let offering_row = OfferingRow {
        competitor_id,
        scrape_date: scrape_date.to_string(),
        scraped_at: scraped_at.to_string(),
        one_way_offered: flags.one_way.offered,
        one_way_price: flags.one_way.price,
        round_trip_offered: flags.round_trip.offered,
        round_trip_price: flags.round_trip.price,
        hotel_offered: flags.hotel.offered,
        hotel_price: flags.hotel.price,
        visa_letter_offered: flags.visa_letter.offered,
        visa_letter_price: flags.visa_letter.price,
        source_url: primary_url,
    };

    DailyRecords {
        price: price_row,
        offerings: offering_row,
    }
}

// ── Tests ──
