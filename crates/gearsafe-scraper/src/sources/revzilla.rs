//! RevZilla soft-gear scraper: jackets, pants, boots, and gloves.
//!
//! Category pages carry schema.org `meta[itemprop]` children on every
//! `[data-product-id]` node. Product pages list features as `<p>`/`<li>`
//! under `.product-details__details`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use gearsafe_core::GearType;
use scraper::{Html, Selector};

use crate::client::FetchPool;
use crate::error::ScraperError;
use crate::html::{element_text, meta_content};
use crate::parse::parse_price_cents;

pub const REVZILLA_BASE_URL: &str = "https://www.revzilla.com";

/// Fewer listings than this means the category page changed.
pub const MIN_CATEGORY_LISTINGS: usize = 1000;

const LISTING_PAGE_LIMIT: usize = 5000;

static PRODUCT_NODE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-product-id]").expect("valid selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static DESCRIPTION_PART: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".product-details__details p, .product-details__details li")
        .expect("valid selector")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoftGearCategory {
    Jackets,
    Pants,
    Boots,
    Gloves,
}

impl SoftGearCategory {
    pub const ALL: [SoftGearCategory; 4] = [Self::Jackets, Self::Pants, Self::Boots, Self::Gloves];

    #[must_use]
    pub fn gear_type(self) -> GearType {
        match self {
            Self::Jackets => GearType::Jacket,
            Self::Pants => GearType::Pants,
            Self::Boots => GearType::Boots,
            Self::Gloves => GearType::Gloves,
        }
    }

    #[must_use]
    pub fn listing_path(self) -> &'static str {
        match self {
            Self::Jackets => "/motorcycle-jackets-vests",
            Self::Pants => "/motorcycle-pants-chaps",
            Self::Boots => "/motorcycle-boots",
            Self::Gloves => "/motorcycle-gloves",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jackets => "jackets",
            Self::Pants => "pants",
            Self::Boots => "boots",
            Self::Gloves => "gloves",
        }
    }
}

impl fmt::Display for SoftGearCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoftGearCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jacket" | "jackets" => Ok(Self::Jackets),
            "pants" => Ok(Self::Pants),
            "boot" | "boots" => Ok(Self::Boots),
            "glove" | "gloves" => Ok(Self::Gloves),
            other => Err(format!("unknown soft-gear category: {other}")),
        }
    }
}

/// One product node from a category page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductListing {
    pub external_id: String,
    pub name: String,
    pub brand: String,
    pub price_cents: Option<i64>,
    pub currency: String,
    pub image_url: String,
    /// Absolute product page URL.
    pub url: String,
}

pub struct RevzillaClient {
    pool: FetchPool,
    base_url: String,
}

impl RevzillaClient {
    #[must_use]
    pub fn new(pool: FetchPool) -> Self {
        Self::with_base_url(pool, REVZILLA_BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(pool: FetchPool, base_url: impl Into<String>) -> Self {
        Self {
            pool,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Fetches the category listing in one large page.
    ///
    /// # Errors
    ///
    /// Fetch errors, and [`ScraperError::TooFewRecords`] when `minimum` is
    /// set and the page yields fewer listings.
    pub async fn fetch_listings(
        &self,
        category: SoftGearCategory,
        minimum: Option<usize>,
    ) -> Result<Vec<ProductListing>, ScraperError> {
        let url = format!(
            "{}{}?limit={LISTING_PAGE_LIMIT}",
            self.base_url,
            category.listing_path()
        );
        let body = self.pool.get_text(&url).await?;
        let listings = parse_listings(&body, &self.base_url);
        tracing::info!(%category, count = listings.len(), "fetched category listing");

        if let Some(minimum) = minimum {
            if listings.len() < minimum {
                return Err(ScraperError::TooFewRecords {
                    upstream: "revzilla",
                    found: listings.len(),
                    minimum,
                });
            }
        }
        Ok(listings)
    }

    /// Fetches a product page and returns its description parts in order.
    ///
    /// # Errors
    ///
    /// Any fetch error from the pool.
    pub async fn fetch_description_parts(&self, url: &str) -> Result<Vec<String>, ScraperError> {
        let body = self.pool.get_text(url).await?;
        Ok(parse_description_parts(&body))
    }
}

/// Extracts every `[data-product-id]` node. Nodes without a name are skipped.
#[must_use]
pub fn parse_listings(html: &str, base_url: &str) -> Vec<ProductListing> {
    let document = Html::parse_document(html);
    document
        .select(&PRODUCT_NODE)
        .filter_map(|node| {
            let external_id = node.value().attr("data-product-id")?.trim().to_owned();
            let name = meta_content(node, "name")?;
            let href = node
                .value()
                .attr("href")
                .or_else(|| node.select(&LINK).next()?.value().attr("href"))
                .unwrap_or_default();
            Some(ProductListing {
                external_id,
                name,
                brand: meta_content(node, "brand").unwrap_or_default(),
                price_cents: meta_content(node, "price").and_then(|p| parse_price_cents(&p)),
                currency: meta_content(node, "priceCurrency").unwrap_or_default(),
                image_url: meta_content(node, "image").unwrap_or_default(),
                url: absolute_url(base_url, href),
            })
        })
        .filter(|listing| !listing.external_id.is_empty())
        .collect()
}

/// Text of each `<p>` and `<li>` under `.product-details__details`, in
/// document order, empties dropped.
#[must_use]
pub fn parse_description_parts(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&DESCRIPTION_PART)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn absolute_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") || href.is_empty() {
        href.to_owned()
    } else if href.starts_with('/') {
        format!("{base_url}{href}")
    } else {
        format!("{base_url}/{href}")
    }
}
