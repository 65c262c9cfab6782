use super::page::PageContent;
use super::price;

/// Chars of context searched on each side of a keyword hit for a price.
const PRICE_WINDOW: usize = 200;

/// The four tracked product categories. Closed enumeration; never extended
/// at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferingCategory {
    OneWay,
    RoundTrip,
    Hotel,
    VisaLetter,
}

impl OfferingCategory {
    pub const ALL: [OfferingCategory; 4] = [
        OfferingCategory::OneWay,
        OfferingCategory::RoundTrip,
        OfferingCategory::Hotel,
        OfferingCategory::VisaLetter,
    ];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            OfferingCategory::OneWay => &[
                "one-way",
                "one way",
                "onward ticket",
                "dummy ticket",
                "flight reservation",
            ],
            OfferingCategory::RoundTrip => {
                &["round trip", "round-trip", "return", "two-way", "two way"]
            }
            OfferingCategory::Hotel => &["hotel", "accommodation", "hostel"],
            OfferingCategory::VisaLetter => &["visa", "support letter", "invitation letter"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OfferingCategory::OneWay => "one_way",
            OfferingCategory::RoundTrip => "round_trip",
            OfferingCategory::Hotel => "hotel",
            OfferingCategory::VisaLetter => "visa_letter",
        }
    }
}

/// Offered flag plus the price found near the first matching keyword, when
/// any. `offered = true, price = None` is a valid state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OfferingSlot {
    pub offered: bool,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OfferingExtraction {
    pub one_way: OfferingSlot,
    pub round_trip: OfferingSlot,
    pub hotel: OfferingSlot,
    pub visa_letter: OfferingSlot,
}

impl OfferingExtraction {
    pub fn slot(&self, category: OfferingCategory) -> OfferingSlot {
        match category {
            OfferingCategory::OneWay => self.one_way,
            OfferingCategory::RoundTrip => self.round_trip,
            OfferingCategory::Hotel => self.hotel,
            OfferingCategory::VisaLetter => self.visa_letter,
        }
    }

    fn slot_mut(&mut self, category: OfferingCategory) -> &mut OfferingSlot {
        match category {
            OfferingCategory::OneWay => &mut self.one_way,
            OfferingCategory::RoundTrip => &mut self.round_trip,
            OfferingCategory::Hotel => &mut self.hotel,
            OfferingCategory::VisaLetter => &mut self.visa_letter,
        }
    }
}

/// Classify offerings across the day's pages, homepage first. Flags
/// OR-combine across pages; the first price found per category wins.
pub fn classify_offerings(pages: &[PageContent]) -> OfferingExtraction {
    let mut result = OfferingExtraction::default();

    for page in pages {
        let text = page.clean_text_lower();
        for category in OfferingCategory::ALL {
            let slot = result.slot_mut(category);
            let matched = category.keywords().iter().any(|kw| text.contains(kw));
            if !matched {
                continue;
            }
            slot.offered = true;
            if slot.price.is_none() {
                slot.price = price_near_keywords(&text, category.keywords());
            }
        }
    }

    result
}

/// First price within ±PRICE_WINDOW chars of the first occurrence of any of
/// the category's keywords, trying keywords in their fixed order.
fn price_near_keywords(text: &str, keywords: &[&str]) -> Option<f64> {
    for kw in keywords {
        if let Some(idx) = text.find(kw) {
            let window = window_around(text, idx, kw.len());
            if let Some(amount) = price::first_amount_in(window) {
                return Some(amount);
            }
        }
    }
    None
}

fn window_around(text: &str, idx: usize, match_len: usize) -> &str {
    let mut start = idx.saturating_sub(PRICE_WINDOW);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (idx + match_len + PRICE_WINDOW).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::page::PageRole;

    fn page(url: &str, role: PageRole, fragments: &[&str]) -> PageContent {
        PageContent {
            url: url.to_string(),
            role,
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            structured_json: None,
        }
    }

    #[test]
    fn categories_are_independent() {
        let p = page(
            "https://a.test",
            PageRole::Primary,
            &["Hotel bookings and visa support letters available"],
        );
        let r = classify_offerings(&[p]);
        assert!(!r.one_way.offered);
        assert!(!r.round_trip.offered);
        assert!(r.hotel.offered);
        assert!(r.visa_letter.offered);
    }

    #[test]
    fn price_attached_from_keyword_window() {
        let p = page(
            "https://a.test",
            PageRole::Primary,
            &["Onward ticket from $16, delivered in minutes"],
        );
        let r = classify_offerings(&[p]);
        assert!(r.one_way.offered);
        assert_eq!(r.one_way.price, Some(16.0));
    }

    #[test]
    fn offered_without_price_is_valid() {
        let p = page(
            "https://a.test",
            PageRole::Primary,
            &["We arrange hotel reservations for your trip"],
        );
        let r = classify_offerings(&[p]);
        assert!(r.hotel.offered);
        assert!(r.hotel.price.is_none());
    }

    #[test]
    fn price_outside_window_not_attached() {
        let padding = "x ".repeat(150); // 300 chars, past the window
        let text = format!("hotel {}only $9", padding);
        let p = PageContent {
            url: "https://a.test".to_string(),
            role: PageRole::Primary,
            fragments: vec![text],
            structured_json: None,
        };
        let r = classify_offerings(&[p]);
        assert!(r.hotel.offered);
        assert!(r.hotel.price.is_none());
    }

    #[test]
    fn flags_or_combine_and_first_price_wins() {
        let home = page("https://a.test", PageRole::Primary, &["Round trip tickets"]);
        let pricing = page(
            "https://a.test/pricing",
            PageRole::Secondary,
            &["Round trip $23", "Hotel booking $12"],
        );
        let r = classify_offerings(&[home, pricing]);
        assert!(r.round_trip.offered);
        // Homepage had no price near the keyword; the secondary page fills it.
        assert_eq!(r.round_trip.price, Some(23.0));
        assert!(r.hotel.offered);
        assert_eq!(r.hotel.price, Some(12.0));
    }

    #[test]
    fn homepage_price_beats_secondary() {
        let home = page("https://a.test", PageRole::Primary, &["Visa letter $8"]);
        let pricing = page(
            "https://a.test/pricing",
            PageRole::Secondary,
            &["Visa letter $11"],
        );
        let r = classify_offerings(&[home, pricing]);
        assert_eq!(r.visa_letter.price, Some(8.0));
    }

    #[test]
    fn window_respects_utf8_boundaries() {
        let text = format!("{}hotel für €12", "é".repeat(120));
        let p = PageContent {
            url: "https://a.test".to_string(),
            role: PageRole::Primary,
            fragments: vec![text],
            structured_json: None,
        };
        let r = classify_offerings(&[p]);
        assert!(r.hotel.offered);
        assert_eq!(r.hotel.price, Some(12.0));
    }
}
