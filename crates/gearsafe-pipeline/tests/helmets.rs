//! End-to-end runs of the helmet job against mocked upstreams.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use gearsafe_core::{GearType, ModelAlias, Product};
use gearsafe_pipeline::{HelmetJobOptions, PipelineError};
use gearsafe_scraper::AffiliateConfig;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{pipeline, pipeline_with_settings, test_settings, MemoryImages, MemoryStore};

const RF_SR3_PAGE: &str = r#"
    <html><body><table>
      <tr><th>Manufacturer</th><td>SHOEI</td></tr>
      <tr><th>Model</th><td>RF-SR3</td></tr>
      <tr><th>Helmet Weight</th><td>1.60kg</td></tr>
      <tr><th>Helmet Type</th><td>Full Face</td></tr>
      <tr><th>Other Standards</th><td>ECE 22.05</td></tr>
      <tr><th>Helmet Rating</th><td><img src="/img/rating-star-5.png"></td></tr>
      <tr><th>Impact Zone Ratings</th><td>
        <img src="/img/impact/front-5-5.jpg">
        <img src="/img/impact/left-5.jpg">
        <img src="/img/impact/right-5.jpg">
        <img src="/img/impact/rear-5.jpg">
      </td></tr>
    </table></body></html>
"#;

fn small_options() -> HelmetJobOptions {
    HelmetJobOptions {
        sharp_limit: Some(10),
        min_sharp_urls: 0,
        min_snell_records: 0,
        ..HelmetJobOptions::default()
    }
}

fn snell_row(manufacturer: &str, model: &str, size: &str, standard: &str) -> serde_json::Value {
    json!({
        "manufacturer": manufacturer,
        "model": model,
        "size": size,
        "standard": standard,
        "helmettype": "Motorcycle",
        "faceconfig": "Full Face",
    })
}

/// SHARP index listing one helmet page per slug, all served by `server`.
async fn mount_sharp(server: &MockServer, pages: &[(&str, &str)]) {
    let index: String = pages
        .iter()
        .map(|(slug, _)| {
            format!(
                r#"<tr><td><a href="{}/sharp.dft.gov.uk/helmets/{slug}/">{slug}</a></td></tr>"#,
                server.uri()
            )
        })
        .collect();
    Mock::given(method("POST"))
        .and(path("/wp-admin/admin-ajax.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index))
        .mount(server)
        .await;
    for (slug, page) in pages {
        Mock::given(method("GET"))
            .and(path(format!("/sharp.dft.gov.uk/helmets/{slug}/")))
            .respond_with(ResponseTemplate::new(200).set_body_string(*page))
            .mount(server)
            .await;
    }
}

async fn mount_snell(server: &MockServer, rows: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/cert/certlist.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": rows })))
        .mount(server)
        .await;
}

fn affiliate_config(server: &MockServer) -> AffiliateConfig {
    AffiliateConfig {
        api_key: "cj-key".to_string(),
        website_id: "123".to_string(),
        advertiser_ids: "joined".to_string(),
        search_url: format!("{}/v2/product-search", server.uri()),
    }
}

fn affiliate_response(name: &str, buy_url: &str, extra: &str) -> String {
    format!(
        r#"<cj-api><products><product>
            <buy-url>{buy_url}</buy-url>
            <name>{name}</name>
            <price>699.99</price>
            <advertiser-category>Motorcycle Helmets</advertiser-category>
            {extra}
        </product></products></cj-api>"#
    )
}

fn helmet(manufacturer: &str, model: &str) -> Product {
    Product::new(GearType::Helmet, manufacturer, model)
}

// ---------------------------------------------------------------------------
// SHARP + SNELL
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sharp_and_snell_merge_into_full_spec_helmet() {
    let server = MockServer::start().await;
    mount_sharp(&server, &[("shoei-rf-sr3", RF_SR3_PAGE)]).await;
    mount_snell(
        &server,
        vec![
            snell_row("Shoei", "RF-SR3", "M", "M2015"),
            snell_row("Shoei", "RF-SR3", "L", "M2015"),
        ],
    )
    .await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Arai", "Shoei"]));
    let report = pipeline(Arc::clone(&store), &server.uri())
        .run_helmets(&small_options())
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert!(!report.has_warnings(), "{report:?}");
    let products = store.products();
    assert_eq!(products.len(), 1);
    let product = &products[0];
    assert_eq!(product.manufacturer, "Shoei");
    assert_eq!(product.model, "RF-SR3");
    let certs = product.helmet_certifications().unwrap();
    assert!(certs.sharp.is_some() && certs.snell && certs.ece && certs.dot);
    assert_eq!(product.safety_percentage, 100);
    assert!((product.weight_lbs - 3.53).abs() < 1e-9);
}

#[tokio::test]
async fn snell_only_manufacturer_gets_new_helmet() {
    let server = MockServer::start().await;
    mount_sharp(&server, &[("shoei-rf-sr3", RF_SR3_PAGE)]).await;
    mount_snell(
        &server,
        vec![
            snell_row("Arai", "XD-4", "S", "M2015"),
            snell_row("Arai", "XD-4", "M", "M2015"),
            snell_row("Arai", "Regent-X", "M", "M2020D"),
        ],
    )
    .await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Arai", "Shoei"]));
    let report = pipeline(Arc::clone(&store), &server.uri())
        .run_helmets(&small_options())
        .await
        .unwrap();

    assert_eq!(report.created, 2);
    assert_eq!(report.warnings, 1);
    let arai = store.get("Arai", "XD-4").unwrap();
    let certs = arai.helmet_certifications().unwrap();
    assert!(certs.snell && certs.dot && !certs.ece && certs.sharp.is_none());
    assert_eq!(arai.safety_percentage, 70);
    assert_eq!(arai.subtype, "full");
    assert!(store.get("Arai", "Regent-X").is_none());
}

#[tokio::test]
async fn second_run_changes_nothing() {
    let server = MockServer::start().await;
    mount_sharp(&server, &[("shoei-rf-sr3", RF_SR3_PAGE)]).await;
    mount_snell(&server, vec![snell_row("Shoei", "RF-SR3", "M", "M2015")]).await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Shoei"]));
    let pipeline = pipeline(Arc::clone(&store), &server.uri());
    pipeline.run_helmets(&small_options()).await.unwrap();
    let first = store.products();

    let report = pipeline.run_helmets(&small_options()).await.unwrap();
    assert_eq!((report.created, report.updated), (0, 0));
    assert_eq!(store.products(), first);
}

#[tokio::test]
async fn broken_detail_page_is_skipped_not_fatal() {
    let server = MockServer::start().await;
    let broken = RF_SR3_PAGE.replace("<tr><th>Model</th><td>RF-SR3</td></tr>", "");
    mount_sharp(
        &server,
        &[("shoei-rf-sr3", RF_SR3_PAGE), ("shoei-broken", broken.as_str())],
    )
    .await;
    mount_snell(&server, Vec::new()).await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Shoei"]));
    let report = pipeline(Arc::clone(&store), &server.uri())
        .run_helmets(&small_options())
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.has_warnings());
}

#[tokio::test]
async fn short_sharp_index_aborts_job() {
    let server = MockServer::start().await;
    mount_sharp(&server, &[("shoei-rf-sr3", RF_SR3_PAGE)]).await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Shoei"]));
    let err = pipeline(Arc::clone(&store), &server.uri())
        .run_helmets(&HelmetJobOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Structural(_)), "{err:?}");
    assert!(store.products().is_empty());
}

#[tokio::test]
async fn short_snell_feed_aborts_job() {
    let server = MockServer::start().await;
    mount_sharp(&server, &[("shoei-rf-sr3", RF_SR3_PAGE)]).await;
    mount_snell(&server, vec![snell_row("Shoei", "RF-SR3", "M", "M2015")]).await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Shoei"]));
    let options = HelmetJobOptions {
        min_snell_records: 100,
        ..small_options()
    };
    let err = pipeline(Arc::clone(&store), &server.uri())
        .run_helmets(&options)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Structural(_)), "{err:?}");
}

// ---------------------------------------------------------------------------
// Affiliate enrichment
// ---------------------------------------------------------------------------

/// Mounts empty SHARP and SNELL feeds so only seeded products are enriched.
async fn mount_empty_sources(server: &MockServer) {
    mount_sharp(server, &[]).await;
    mount_snell(server, Vec::new()).await;
}

#[tokio::test]
async fn confident_match_with_dead_buy_page_marks_discontinued() {
    let server = MockServer::start().await;
    mount_empty_sources(&server).await;
    let buy_url = format!("{}/gone", server.uri());
    Mock::given(method("GET"))
        .and(path("/v2/product-search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(affiliate_response("Shoei X-12 Helmet", &buy_url, "")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Sorry, not found</p>"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Shoei"]));
    let mut seeded = helmet("Shoei", "X-12");
    seeded.affiliate_price_cents = 49_999;
    store.seed(seeded);

    let report = pipeline(Arc::clone(&store), &server.uri())
        .with_affiliate(affiliate_config(&server))
        .run_helmets(&small_options())
        .await
        .unwrap();

    assert_eq!(report.discontinued, 1);
    let product = store.get("Shoei", "X-12").unwrap();
    assert!(product.is_discontinued);
    assert_eq!(product.affiliate_price_cents, 49_999);
}

#[tokio::test]
async fn low_confidence_match_leaves_product_alone() {
    let server = MockServer::start().await;
    mount_empty_sources(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/product-search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(affiliate_response(
            "Bell Qualifier DLX",
            "https://shop.example.com/qualifier",
            "",
        )))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["NoName"]));
    let seeded = store.seed(helmet("NoName", "Foo"));

    let report = pipeline(Arc::clone(&store), &server.uri())
        .with_affiliate(affiliate_config(&server))
        .run_helmets(&small_options())
        .await
        .unwrap();

    assert_eq!(report.enriched + report.discontinued + report.updated, 0);
    assert_eq!(report.warnings, 1);
    assert_eq!(store.get("NoName", "Foo").unwrap(), seeded);
}

#[tokio::test]
async fn live_match_enriches_price_certifications_and_image() {
    let server = MockServer::start().await;
    mount_empty_sources(&server).await;
    let buy_url = format!("{}/live", server.uri());
    let image_url = format!("{}/img/x-12.jpg", server.uri());
    let extra = format!(
        "<image-url>{image_url}</image-url><description>DOT FMVSS 218 and ECE 22.05 approved</description>"
    );
    Mock::given(method("GET"))
        .and(path("/v2/product-search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(affiliate_response("Shoei X-12 Helmet", &buy_url, &extra)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/live"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<div class="product-show-summary">In stock</div>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/x-12.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF]),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Shoei"]));
    let mut seeded = helmet("Shoei", "X-12");
    seeded.msrp_cents = 89_999;
    store.seed(seeded);
    let images = Arc::new(MemoryImages::default());

    let report = pipeline(Arc::clone(&store), &server.uri())
        .with_affiliate(affiliate_config(&server))
        .with_images(images.clone())
        .run_helmets(&small_options())
        .await
        .unwrap();

    assert_eq!(report.enriched, 1);
    let product = store.get("Shoei", "X-12").unwrap();
    assert_eq!(product.affiliate_buy_url, buy_url);
    assert_eq!(product.affiliate_price_cents, 69_999);
    assert_eq!(product.search_price_cents, 69_999);
    let certs = product.helmet_certifications().unwrap();
    assert!(certs.dot && certs.ece && !certs.snell);
    assert_eq!(product.safety_percentage, 15);
    assert_eq!(product.image_url, image_url);
    assert_eq!(product.image_key, gearsafe_pipeline::image_key(&image_url));
    assert_eq!(images.objects.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn no_affiliate_config_skips_enrichment() {
    let server = MockServer::start().await;
    mount_empty_sources(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/product-search"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Shoei"]));
    let seeded = store.seed(helmet("Shoei", "X-12"));
    let report = pipeline(Arc::clone(&store), &server.uri())
        .run_helmets(&small_options())
        .await
        .unwrap();

    assert!(!report.has_warnings());
    assert_eq!(store.get("Shoei", "X-12").unwrap(), seeded);
}

fn with_alias(mut product: Product, alias: &str) -> Product {
    product.model_aliases.push(ModelAlias {
        name: alias.to_string(),
        is_for_display: false,
    });
    product
}

/// Search for `model` answered with a single product named `name`.
async fn mount_search(server: &MockServer, model: &str, name: &str, buy_url: &str) {
    Mock::given(method("GET"))
        .and(path("/v2/product-search"))
        .and(query_param("keywords", format!("+\"Shoei\"+\"{model}\"+helmet")))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(affiliate_response(name, buy_url, "")),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_live_page(server: &MockServer, page: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<div class="product-show-summary">In stock</div>"#),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn alias_is_searched_when_model_has_no_confident_match() {
    let server = MockServer::start().await;
    mount_empty_sources(&server).await;
    let buy_url = format!("{}/x-14", server.uri());
    mount_search(&server, "X-Fourteen", "Bell Qualifier DLX", "https://shop.example.com/q").await;
    mount_search(&server, "X-14", "Shoei X-14 Helmet", &buy_url).await;
    mount_live_page(&server, "/x-14").await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Shoei"]));
    store.seed(with_alias(helmet("Shoei", "X-Fourteen"), "X-14"));

    let report = pipeline(Arc::clone(&store), &server.uri())
        .with_affiliate(affiliate_config(&server))
        .run_helmets(&small_options())
        .await
        .unwrap();

    assert_eq!(report.enriched, 1);
    assert!(!report.has_warnings(), "{report:?}");
    let product = store.get("Shoei", "X-Fourteen").unwrap();
    assert_eq!(product.affiliate_buy_url, buy_url);
    assert_eq!(product.affiliate_price_cents, 69_999);
    assert!(!product.is_discontinued);
}

#[tokio::test]
async fn affiliate_searches_are_spaced_by_the_delay() {
    let server = MockServer::start().await;
    mount_empty_sources(&server).await;
    let buy_url = format!("{}/x-14", server.uri());
    mount_search(&server, "X-Fourteen", "Bell Qualifier DLX", "https://shop.example.com/q").await;
    mount_search(&server, "X-14", "Shoei X-14 Helmet", &buy_url).await;
    mount_live_page(&server, "/x-14").await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Shoei"]));
    store.seed(with_alias(helmet("Shoei", "X-Fourteen"), "X-14"));
    let delay = Duration::from_millis(300);
    let settings = gearsafe_pipeline::PipelineSettings {
        affiliate_delay: delay,
        ..test_settings()
    };

    let started = Instant::now();
    let report = pipeline_with_settings(Arc::clone(&store), &server.uri(), settings)
        .with_affiliate(affiliate_config(&server))
        .run_helmets(&small_options())
        .await
        .unwrap();

    assert_eq!(report.enriched, 1);
    // Two searches, one pause between them.
    assert!(started.elapsed() >= delay, "{:?}", started.elapsed());
}
