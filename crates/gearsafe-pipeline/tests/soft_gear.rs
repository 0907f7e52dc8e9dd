//! End-to-end runs of the soft-gear job against a mocked RevZilla.

mod common;

use std::sync::Arc;

use gearsafe_core::{CeZone, Certifications, GearType, Product};
use gearsafe_pipeline::PipelineError;
use gearsafe_scraper::SoftGearCategory;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{pipeline, MemoryStore};

fn listing_node(id: &str, slug: &str, name: &str, brand: &str, price: &str) -> String {
    format!(
        r#"<a data-product-id="{id}" href="/motorcycle/{slug}">
            <meta itemprop="name" content="{name}">
            <meta itemprop="brand" content="{brand}">
            <meta itemprop="price" content="{price}">
            <meta itemprop="priceCurrency" content="USD">
        </a>"#
    )
}

fn details(lines: &[&str]) -> String {
    let items: String = lines.iter().map(|l| format!("<li>{l}</li>")).collect();
    format!(r#"<html><body><div class="product-details__details"><ul>{items}</ul></div></body></html>"#)
}

async fn mount_listing(server: &MockServer, listing_path: &str, nodes: &[String]) {
    Mock::given(method("GET"))
        .and(path(listing_path))
        .and(query_param("limit", "5000"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("<html><body>{}</body></html>", nodes.concat())),
        )
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, slug: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/motorcycle/{slug}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn jacket_zones(product: &Product) -> gearsafe_core::JacketCertifications {
    match product.certifications {
        Certifications::Jacket(jacket) => jacket,
        ref other => panic!("expected jacket certifications, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Jackets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn level_two_jacket_with_airbag_scores_full() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/motorcycle-jackets-vests",
        &[listing_node(
            "1001",
            "alpinestars-t-gp-plus-r-v3-jacket",
            "Alpinestars T-GP Plus R v3 Jacket",
            "Alpinestars",
            "449.95",
        )],
    )
    .await;
    mount_page(
        &server,
        "alpinestars-t-gp-plus-r-v3-jacket",
        details(&[
            "CE approved level 2 shoulder and elbow armor",
            "CE approved level 2 back protector",
            "CE approved level 2 chest pads",
            "Tech-Air and D-air compatible",
        ]),
    )
    .await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Alpinestars", "Dainese"]));
    let report = pipeline(Arc::clone(&store), &server.uri())
        .run_soft_gear(SoftGearCategory::Jackets, false)
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert!(!report.has_warnings(), "{report:?}");
    let product = store.get("Alpinestars", "T-GP Plus R v3 Jacket").unwrap();
    assert_eq!(product.gear_type(), GearType::Jacket);
    assert_eq!(product.external_id.as_deref(), Some("1001"));
    assert_eq!(product.affiliate_price_cents, 44_995);
    assert_eq!(product.search_price_cents, 44_995);
    assert!(product.affiliate_buy_url.ends_with("/motorcycle/alpinestars-t-gp-plus-r-v3-jacket"));

    let full = CeZone {
        is_level_2: true,
        is_approved: true,
        is_empty: false,
    };
    let jacket = jacket_zones(&product);
    assert_eq!(
        (jacket.shoulder, jacket.elbow, jacket.back, jacket.chest),
        (Some(full), Some(full), Some(full), Some(full))
    );
    assert!(jacket.fits_airbag);
    assert_eq!(product.safety_percentage, 100);
}

#[tokio::test]
async fn back_protector_pocket_is_recorded_as_empty_zone() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/motorcycle-jackets-vests",
        &[listing_node("2002", "dainese-pocket-jacket", "Dainese Pocket Jacket", "Dainese", "299.95")],
    )
    .await;
    mount_page(
        &server,
        "dainese-pocket-jacket",
        details(&["Pocket at back for optional CE back protector (sold separately)"]),
    )
    .await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Dainese"]));
    pipeline(Arc::clone(&store), &server.uri())
        .run_soft_gear(SoftGearCategory::Jackets, false)
        .await
        .unwrap();

    let jacket = jacket_zones(&store.get("Dainese", "Pocket Jacket").unwrap());
    assert_eq!(
        jacket.back,
        Some(CeZone {
            is_level_2: false,
            is_approved: false,
            is_empty: true,
        })
    );
    assert_eq!((jacket.shoulder, jacket.elbow, jacket.chest), (None, None, None));
}

#[tokio::test]
async fn rerun_with_same_listing_writes_nothing() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/motorcycle-jackets-vests",
        &[listing_node("2002", "dainese-pocket-jacket", "Dainese Pocket Jacket", "Dainese", "299.95")],
    )
    .await;
    mount_page(
        &server,
        "dainese-pocket-jacket",
        details(&["CE level 1 elbow armor"]),
    )
    .await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Dainese"]));
    let pipeline = pipeline(Arc::clone(&store), &server.uri());
    pipeline
        .run_soft_gear(SoftGearCategory::Jackets, false)
        .await
        .unwrap();
    let first = store.products();

    let report = pipeline
        .run_soft_gear(SoftGearCategory::Jackets, false)
        .await
        .unwrap();
    assert_eq!((report.created, report.updated), (0, 0));
    assert_eq!(store.products(), first);
}

#[tokio::test]
async fn listings_for_the_same_product_settle_on_one_row() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/motorcycle-jackets-vests",
        &[
            listing_node("B2", "alpinestars-x-jacket-black", "Alpinestars X Jacket", "Alpinestars", "249.95"),
            listing_node("A1", "alpinestars-x-jacket", "Alpinestars X Jacket", "Alpinestars", "229.95"),
        ],
    )
    .await;
    mount_page(&server, "alpinestars-x-jacket", details(&["CE level 1 elbow armor"])).await;
    mount_page(&server, "alpinestars-x-jacket-black", details(&["CE level 2 back protector"])).await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Alpinestars"]));
    let pipeline = pipeline(Arc::clone(&store), &server.uri());
    let first = pipeline
        .run_soft_gear(SoftGearCategory::Jackets, false)
        .await
        .unwrap();
    assert_eq!((first.created, first.updated), (1, 0));
    assert_eq!(first.warnings, 1);

    let stored = store.products();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].external_id.as_deref(), Some("A1"));
    assert_eq!(stored[0].affiliate_price_cents, 22_995);

    let second = pipeline
        .run_soft_gear(SoftGearCategory::Jackets, false)
        .await
        .unwrap();
    assert_eq!(second.created + second.updated, 0);
    assert_eq!(store.products(), stored);
}

#[tokio::test]
async fn listing_adopts_catalog_row_with_same_name() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/motorcycle-jackets-vests",
        &[listing_node("7007", "dainese-super-speed-4", "Dainese Super Speed 4", "Dainese", "599.95")],
    )
    .await;
    mount_page(&server, "dainese-super-speed-4", details(&["CE level 2 shoulder armor"])).await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Dainese"]));
    let seeded = store.seed(Product::new(GearType::Jacket, "Dainese", "Super Speed 4"));

    let report = pipeline(Arc::clone(&store), &server.uri())
        .run_soft_gear(SoftGearCategory::Jackets, false)
        .await
        .unwrap();

    assert_eq!((report.created, report.updated), (0, 1));
    let stored = store.products();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].uuid, seeded.uuid);
    assert_eq!(stored[0].external_id.as_deref(), Some("7007"));
}

// ---------------------------------------------------------------------------
// Discontinued and structural failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listing_without_description_discontinues_known_product() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/motorcycle-gloves",
        &[
            listing_node("3003", "klim-known-glove", "Klim Known Glove", "Klim", "59.99"),
            listing_node("4004", "klim-new-glove", "Klim New Glove", "Klim", "49.99"),
        ],
    )
    .await;
    mount_page(&server, "klim-known-glove", "<html><body></body></html>".to_string()).await;
    mount_page(&server, "klim-new-glove", "<html><body></body></html>".to_string()).await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Klim"]));
    let mut known = Product::new(GearType::Gloves, "Klim", "Known Glove");
    known.external_id = Some("3003".to_string());
    store.seed(known);

    let report = pipeline(Arc::clone(&store), &server.uri())
        .run_soft_gear(SoftGearCategory::Gloves, false)
        .await
        .unwrap();

    assert_eq!(report.discontinued, 1);
    assert_eq!(report.created, 0);
    assert!(store.get("Klim", "Known Glove").unwrap().is_discontinued);
    assert!(store.get("Klim", "New Glove").is_none());
}

#[tokio::test]
async fn short_listing_with_min_check_aborts() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/motorcycle-gloves",
        &[listing_node("3003", "klim-glove", "Klim Glove", "Klim", "59.99")],
    )
    .await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Klim"]));
    let err = pipeline(Arc::clone(&store), &server.uri())
        .run_soft_gear(SoftGearCategory::Gloves, true)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Structural(_)), "{err:?}");
    assert!(store.products().is_empty());
}

#[tokio::test]
async fn failing_product_page_is_skipped() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "/motorcycle-gloves",
        &[
            listing_node("3003", "klim-glove", "Klim Glove", "Klim", "59.99"),
            listing_node("5005", "klim-broken", "Klim Broken", "Klim", "59.99"),
        ],
    )
    .await;
    mount_page(&server, "klim-glove", details(&["CE level 1 knuckle protection"])).await;
    Mock::given(method("GET"))
        .and(path("/motorcycle/klim-broken"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_manufacturers(&["Klim"]));
    let report = pipeline(Arc::clone(&store), &server.uri())
        .run_soft_gear(SoftGearCategory::Gloves, false)
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.job, "sync_revzilla_gloves");
}
