//! CJ affiliate product-search client.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::client::FetchPool;
use crate::error::ScraperError;
use crate::parse::parse_price_cents;

pub const AFFILIATE_SEARCH_URL: &str = "https://product-search.api.cj.com/v2/product-search";

const RECORDS_PER_PAGE: &str = "100";
const LOW_PRICE: &str = "50";

/// Marker present on every live retailer product page.
const PRODUCT_PAGE_MARKER: &str = "product-show-summary";

#[derive(Debug, Clone)]
pub struct AffiliateConfig {
    pub api_key: String,
    pub website_id: String,
    pub advertiser_ids: String,
    pub search_url: String,
}

impl AffiliateConfig {
    /// `None` when no API key is configured; the affiliate pass is skipped.
    #[must_use]
    pub fn from_app_config(config: &gearsafe_core::AppConfig) -> Option<Self> {
        let api_key = config.cj_api_key.clone()?;
        Some(Self {
            api_key,
            website_id: config.cj_website_id.clone(),
            advertiser_ids: config.cj_advertiser_ids.clone(),
            search_url: AFFILIATE_SEARCH_URL.to_owned(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AffiliateProduct {
    pub buy_url: String,
    pub name: String,
    /// `None` when the price element is missing or unparseable.
    pub price_cents: Option<i64>,
    pub image_url: String,
    pub categories: Vec<String>,
    pub description: String,
}

impl AffiliateProduct {
    /// A helmet listing, excluding visors and spoilers sold for helmets.
    #[must_use]
    pub fn is_helmet(&self) -> bool {
        let category = self.categories.join(" ").to_lowercase();
        let name = self.name.to_lowercase();
        category.contains("helmet") && !name.contains("shield") && !name.contains("spoiler")
    }
}

pub struct AffiliateClient {
    pool: FetchPool,
    config: AffiliateConfig,
}

impl AffiliateClient {
    #[must_use]
    pub fn new(pool: FetchPool, config: AffiliateConfig) -> Self {
        Self { pool, config }
    }

    /// Searches for `manufacturer` + `model` helmets.
    ///
    /// # Errors
    ///
    /// Fetch errors and [`ScraperError::Xml`] for a malformed response.
    pub async fn search(
        &self,
        manufacturer: &str,
        model: &str,
    ) -> Result<Vec<AffiliateProduct>, ScraperError> {
        let url = self.search_url(manufacturer, model);
        let body = self
            .pool
            .get_text_with_bearer(&url, &self.config.api_key)
            .await?;
        parse_search_response(&body)
    }

    /// Fetches a retailer buy page and reports whether the product is gone.
    ///
    /// # Errors
    ///
    /// Any fetch error from the pool.
    pub async fn is_discontinued(&self, buy_url: &str) -> Result<bool, ScraperError> {
        let body = self.pool.get_text(buy_url).await?;
        Ok(is_discontinued_page(&body))
    }

    fn search_url(&self, manufacturer: &str, model: &str) -> String {
        let keywords = format!("+\"{manufacturer}\"+\"{model}\"+helmet");
        format!(
            "{}?website-id={}&advertiser-ids={}&keywords={}&page-number=1&records-per-page={RECORDS_PER_PAGE}&low-price={LOW_PRICE}",
            self.config.search_url,
            utf8_percent_encode(&self.config.website_id, NON_ALPHANUMERIC),
            utf8_percent_encode(&self.config.advertiser_ids, NON_ALPHANUMERIC),
            utf8_percent_encode(&keywords, NON_ALPHANUMERIC),
        )
    }
}

/// A buy page without the product summary block no longer sells the item.
#[must_use]
pub fn is_discontinued_page(body: &str) -> bool {
    !body.to_lowercase().contains(PRODUCT_PAGE_MARKER)
}

/// Parses `<cj-api><products><product>…</product></products></cj-api>`.
///
/// # Errors
///
/// [`ScraperError::Xml`] when the document is not well formed.
pub fn parse_search_response(xml: &str) -> Result<Vec<AffiliateProduct>, ScraperError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut products = Vec::new();
    let mut current: Option<AffiliateProduct> = None;
    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "product" {
                    current = Some(AffiliateProduct::default());
                }
                current_tag = name;
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"product" {
                    products.extend(current.take());
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(product) = current.as_mut() {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    apply_field(product, &current_tag, text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(product) = current.as_mut() {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    apply_field(product, &current_tag, text);
                }
            }
            Ok(Event::Eof) => break,
            Err(source) => {
                return Err(ScraperError::Xml {
                    context: "affiliate product search".to_owned(),
                    source,
                })
            }
            _ => {}
        }
    }

    Ok(products)
}

fn apply_field(product: &mut AffiliateProduct, tag: &str, text: String) {
    match tag {
        "buy-url" => product.buy_url = text,
        "name" => product.name = text,
        "price" => product.price_cents = parse_price_cents(&text),
        "image-url" => product.image_url = text,
        "advertiser-category" => product.categories.push(text),
        "description" => product.description = text,
        _ => {}
    }
}
