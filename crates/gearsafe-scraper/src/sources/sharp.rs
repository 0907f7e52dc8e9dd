//! SHARP (UK helmet safety scheme) scraper.
//!
//! The index endpoint is a WordPress AJAX action returning bare `<tr>`
//! fragments; each links to a detail page laid out as a two-column table
//! keyed by `<th>` text.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use gearsafe_core::{SharpImpactZones, SharpRating, SharpTopZones};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::client::FetchPool;
use crate::error::ScraperError;
use crate::html::element_text;
use crate::normalize::sharp_subtype;
use crate::parse::{parse_digits, parse_price_cents, parse_sizes, parse_weight_lbs};

pub const SHARP_INDEX_URL: &str = "https://sharp.dft.gov.uk/wp-admin/admin-ajax.php";

/// Fewer unique detail links than this means the index markup changed.
pub const MIN_HELMET_URLS: usize = 400;

const HELMET_LINK_MARKER: &str = "sharp.dft.gov.uk/helmets/";
const UNLIMITED_POSTS_PER_PAGE: usize = 500_000;

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static HEADER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th").expect("valid selector"));
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid selector"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("valid selector"));
static LATCH_OVERLAY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".percentage-overlay").expect("valid selector"));

static STAR_RATING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"rating-star-(\d)").expect("valid regex"));
static IMPACT_TOP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"front-(\d)-(\d)\.jpg").expect("valid regex"));
static IMPACT_LEFT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"left-(\d)\.jpg").expect("valid regex"));
static IMPACT_RIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"right-(\d)\.jpg").expect("valid regex"));
static IMPACT_REAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"rear-(\d)\.jpg").expect("valid regex"));

/// One parsed SHARP detail page, before manufacturer canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct SharpHelmet {
    pub url: String,
    pub manufacturer: String,
    pub model: String,
    /// `None` when the weight cell could not be parsed.
    pub weight_lbs: Option<f64>,
    pub sizes: Vec<String>,
    pub subtype: String,
    pub retention_system: String,
    pub materials: String,
    /// "Other standards" mentions ECE.
    pub is_ece: bool,
    pub price_cents: Option<i64>,
    pub rating: SharpRating,
    /// Modular helmets only.
    pub latch_percentage: Option<i32>,
}

pub struct SharpClient {
    pool: FetchPool,
    index_url: String,
}

impl SharpClient {
    #[must_use]
    pub fn new(pool: FetchPool) -> Self {
        Self::with_index_url(pool, SHARP_INDEX_URL)
    }

    #[must_use]
    pub fn with_index_url(pool: FetchPool, index_url: impl Into<String>) -> Self {
        Self {
            pool,
            index_url: index_url.into(),
        }
    }

    /// Posts the index form and returns the sorted, deduplicated detail URLs.
    ///
    /// `limit` caps `postsperpage`; `None` asks for everything.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::TooFewRecords`] when fewer than `minimum`
    /// unique URLs come back, or any fetch error from the pool.
    pub async fn fetch_helmet_urls(
        &self,
        limit: Option<usize>,
        minimum: usize,
    ) -> Result<Vec<String>, ScraperError> {
        let posts_per_page = limit.unwrap_or(UNLIMITED_POSTS_PER_PAGE).to_string();
        let form = [
            ("action", "more_helmet_ajax"),
            ("postsperpage", posts_per_page.as_str()),
            ("manufacturer", "All"),
            ("model", "All"),
            ("pageNumber", "1"),
            ("type", "1"),
        ];
        let body = self.pool.post_form_text(&self.index_url, &form).await?;
        let urls = parse_index(&body);
        tracing::info!(count = urls.len(), "fetched SHARP helmet index");

        if urls.len() < minimum {
            return Err(ScraperError::TooFewRecords {
                upstream: "sharp",
                found: urls.len(),
                minimum,
            });
        }
        Ok(urls)
    }

    /// Fetches and parses one detail page.
    ///
    /// # Errors
    ///
    /// Fetch errors, a page missing manufacturer or model, or an impact image
    /// that matches none of the known zone patterns.
    pub async fn fetch_helmet(&self, url: &str) -> Result<SharpHelmet, ScraperError> {
        let body = self.pool.get_text(url).await?;
        parse_helmet_page(url, &body)
    }
}

/// Extracts helmet detail links from the index fragment.
#[must_use]
pub fn parse_index(fragment: &str) -> Vec<String> {
    let document = Html::parse_document(&format!("<html><table>{fragment}</table></html>"));
    let urls: BTreeSet<String> = document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(HELMET_LINK_MARKER))
        .map(str::to_owned)
        .collect();
    urls.into_iter().collect()
}

/// Parses a SHARP detail page.
///
/// # Errors
///
/// [`ScraperError::Parse`] when manufacturer or model is missing;
/// [`ScraperError::UnrecognizedImpactImage`] for an impact image outside the
/// known zone patterns.
pub fn parse_helmet_page(url: &str, html: &str) -> Result<SharpHelmet, ScraperError> {
    let document = Html::parse_document(html);

    let mut rows: HashMap<String, ElementRef<'_>> = HashMap::new();
    let mut impact_cells: Vec<ElementRef<'_>> = Vec::new();
    for row in document.select(&ROW) {
        let Some(header) = row.select(&HEADER).next() else {
            continue;
        };
        let Some(cell) = row.select(&CELL).next() else {
            continue;
        };
        let key = element_text(header).to_lowercase();
        if key.contains("impact") {
            impact_cells.extend(row.select(&CELL));
        }
        rows.entry(key).or_insert(cell);
    }

    let text = |key: &str| rows.get(key).map(|cell| element_text(*cell)).unwrap_or_default();
    let required = |key: &str| {
        let value = text(key);
        if value.is_empty() {
            Err(ScraperError::Parse {
                context: url.to_owned(),
                reason: format!("missing \"{key}\" row"),
            })
        } else {
            Ok(value)
        }
    };

    let manufacturer = required("manufacturer")?;
    let model = required("model")?;

    let weight_raw = text("helmet weight");
    let weight_lbs = parse_weight_lbs(&weight_raw);
    if weight_lbs.is_none() {
        tracing::warn!(url, weight = %weight_raw, "unparseable SHARP helmet weight");
    }

    let stars = rows
        .get("helmet rating")
        .and_then(|cell| cell.select(&IMAGE).next())
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| capture_digit(&STAR_RATING, src, 1))
        .unwrap_or(0);

    let mut impact_zones = SharpImpactZones::default();
    for cell in impact_cells {
        for img in cell.select(&IMAGE) {
            let src = img.value().attr("src").unwrap_or_default();
            apply_impact_image(&mut impact_zones, src).ok_or_else(|| {
                ScraperError::UnrecognizedImpactImage {
                    url: url.to_owned(),
                    src: src.to_owned(),
                }
            })?;
        }
    }

    let latch_percentage = document
        .select(&LATCH_OVERLAY)
        .next()
        .and_then(|el| parse_digits(&element_text(el)));

    Ok(SharpHelmet {
        url: url.to_owned(),
        manufacturer,
        model,
        weight_lbs,
        sizes: parse_sizes(&text("helmet sizes")),
        subtype: sharp_subtype(&text("helmet type")).to_owned(),
        retention_system: text("retention system"),
        materials: text("materials"),
        is_ece: text("other standards").contains("ECE"),
        price_cents: parse_price_cents(&text("price from")),
        rating: SharpRating {
            stars,
            impact_zones,
        },
        latch_percentage,
    })
}

fn capture_digit(re: &Regex, haystack: &str, group: usize) -> Option<u8> {
    re.captures(haystack)?.get(group)?.as_str().parse().ok()
}

/// Writes the zone encoded in an impact image name. `None` if unrecognized.
///
/// The top image is checked first: `front-4-3.jpg` must not be read as a
/// single-digit zone.
fn apply_impact_image(zones: &mut SharpImpactZones, src: &str) -> Option<()> {
    if IMPACT_TOP.is_match(src) {
        zones.top = SharpTopZones {
            front: capture_digit(&IMPACT_TOP, src, 1)?,
            rear: capture_digit(&IMPACT_TOP, src, 2)?,
        };
    } else if IMPACT_LEFT.is_match(src) {
        zones.left = capture_digit(&IMPACT_LEFT, src, 1)?;
    } else if IMPACT_RIGHT.is_match(src) {
        zones.right = capture_digit(&IMPACT_RIGHT, src, 1)?;
    } else if IMPACT_REAR.is_match(src) {
        zones.rear = capture_digit(&IMPACT_REAR, src, 1)?;
    } else {
        return None;
    }
    Some(())
}
