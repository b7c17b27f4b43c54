mod common;

use async_trait::async_trait;
use common::{detail_url, grid_page, init_logger, options, Card, Detail, FakeBrowser, GRID_URL};
use listing_scout::core::config::LocationOptions;
use listing_scout::pipeline::location::LocationService;
use listing_scout::pipeline::{normalize_all, DetailEnricher, GridCrawler, Pipeline, PipelineOutcome};
use listing_scout::{EnrichedListing, FieldValue, Location, ScoutError};
use proptest::prelude::*;

fn linked_cards(n: u32) -> (Vec<String>, Vec<String>) {
    let titles = (1..=n).map(|i| format!("Galpão {}", i)).collect();
    let hrefs = (1..=n).map(|i| format!("/imovel/{}", i)).collect();
    (titles, hrefs)
}

fn single_page_browser(n: u32) -> FakeBrowser {
    let (titles, hrefs) = linked_cards(n);
    let cards: Vec<Card<'_>> = titles
        .iter()
        .zip(&hrefs)
        .map(|(t, h)| Card::complete(t, h))
        .collect();
    let mut browser = FakeBrowser::new().with_grid_pages(vec![grid_page(&cards, false)]);
    for i in 1..=n {
        browser = browser.with_detail(&detail_url(i), numbered_detail(i));
    }
    browser
}

/// A complete detail page whose address carries the listing number.
fn numbered_detail(n: u32) -> String {
    let address = format!("Rua {}, 100 - Cajamar/SP", n);
    Detail {
        address: Some(&address),
        ..Detail::complete()
    }
    .html()
}

#[tokio::test]
async fn end_to_end_scenario_with_missing_label_and_missing_tax() {
    init_logger();
    let broken = Card {
        floor_area: None,
        ..Card::complete("Galpão quebrado", "/imovel/2")
    };
    let grid = grid_page(&[Card::complete("Galpão Cajamar", "/imovel/1"), broken], false);
    let no_tax = Detail {
        property_tax: None,
        ..Detail::complete()
    };
    let mut browser = FakeBrowser::new()
        .with_grid_pages(vec![grid])
        .with_detail(&detail_url(1), no_tax.html());
    let opts = options();

    let summaries = GridCrawler::new(&mut browser, &opts).collect(1).await.unwrap();
    assert_eq!(summaries.len(), 1);

    let mut listings: Vec<EnrichedListing> = summaries.into_iter().map(Into::into).collect();
    let report = DetailEnricher::new(&mut browser, &opts).enrich(&mut listings).await;
    assert_eq!(report.visited, 1);

    let details = listings[0].details.as_ref().unwrap();
    assert_eq!(details.property_tax, FieldValue::Unavailable);
    assert_eq!(details.leasable_area, FieldValue::Present("2.839,00 m²".into()));
    assert_eq!(details.total_monthly_value, FieldValue::Present("R$ 83.670,50".into()));
    assert_eq!(details.ceiling_height, FieldValue::Present("12.00".into()));
    assert_eq!(
        details.address,
        FieldValue::Present("Rua das Indústrias, 100 - Cajamar/SP".into())
    );

    listings[0].id = Some(1);
    let records = normalize_all(&listings).unwrap();
    let r = &records[0];
    assert_eq!(r.price, Some(25.0));
    assert_eq!(r.condo_fee, Some(4.5));
    assert_eq!(r.floor_area, Some(2839.0));
    assert_eq!(r.leasable_area, Some(2839.0));
    assert_eq!(r.property_tax, None);
    assert_eq!(r.total_monthly_value, Some(83670.5));
    assert_eq!(r.ceiling_height, Some(12.0));
}

#[tokio::test]
async fn one_failing_detail_page_does_not_touch_its_neighbours() {
    init_logger();
    let mut browser = single_page_browser(3).failing_on(&detail_url(2));
    let opts = options();

    let summaries = GridCrawler::new(&mut browser, &opts).collect(1).await.unwrap();
    let mut listings: Vec<EnrichedListing> = summaries.into_iter().map(Into::into).collect();
    let report = DetailEnricher::new(&mut browser, &opts).enrich(&mut listings).await;

    assert_eq!(report.visited, 2);
    assert_eq!(report.failed, 1);
    for i in [0, 2] {
        let d = listings[i].details.as_ref().unwrap();
        assert_eq!(d.property_tax, FieldValue::Present("R$ 1,20".into()));
        assert_eq!(d.ceiling_height, FieldValue::Present("12.00".into()));
    }
    let failed = listings[1].details.as_ref().unwrap();
    assert_eq!(failed.leasable_area, FieldValue::CollectionError);
    assert_eq!(failed.property_tax, FieldValue::CollectionError);
    assert_eq!(failed.address, FieldValue::CollectionError);
}

#[tokio::test]
async fn slow_detail_pages_are_read_after_they_render() {
    let mut browser = single_page_browser(2).with_render_delay(5);
    let opts = options();

    let summaries = GridCrawler::new(&mut browser, &opts).collect(1).await.unwrap();
    let mut listings: Vec<EnrichedListing> = summaries.into_iter().map(Into::into).collect();
    DetailEnricher::new(&mut browser, &opts).enrich(&mut listings).await;

    for l in &listings {
        let d = l.details.as_ref().unwrap();
        assert_eq!(d.leasable_area, FieldValue::Present("2.839,00 m²".into()));
        assert!(d.address.is_present());
    }
}

#[tokio::test]
async fn identifiers_are_dense_despite_failures() {
    init_logger();
    let mut browser = single_page_browser(5)
        .failing_on(&detail_url(2))
        .failing_on(&detail_url(4));
    let pipeline = Pipeline::new(options(), LocationOptions::default());

    let outcome = pipeline.run(&mut browser, 1).await.unwrap();

    let ids: Vec<u32> = outcome.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(outcome.records()[1].full_address, FieldValue::CollectionError);
    assert_eq!(outcome.records()[1].price, Some(25.0));
}

#[tokio::test]
async fn listings_without_detail_link_are_dropped_before_enrichment() {
    let grid = grid_page(
        &[
            Card::complete("Galpão 1", "/imovel/1"),
            Card::complete("Galpão sem link", ""),
            Card::complete("Galpão 3", "/imovel/3"),
        ],
        false,
    );
    let mut browser = FakeBrowser::new()
        .with_grid_pages(vec![grid])
        .with_detail(&detail_url(1), numbered_detail(1))
        .with_detail(&detail_url(3), numbered_detail(3));
    let pipeline = Pipeline::new(options(), LocationOptions::default());

    let outcome = pipeline.run(&mut browser, 1).await.unwrap();

    let titles: Vec<&str> = outcome.records().iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Galpão 1", "Galpão 3"]);
    assert_eq!(
        browser.navigations,
        vec![GRID_URL.to_string(), detail_url(1), detail_url(3)]
    );
}

#[tokio::test]
async fn session_is_closed_after_success() {
    let mut browser = single_page_browser(2);
    let pipeline = Pipeline::new(options(), LocationOptions::default());

    let outcome = pipeline.run_scoped(&mut browser, 1).await.unwrap();

    assert_eq!(outcome.records().len(), 2);
    assert_eq!(browser.closes, 1);
}

#[tokio::test]
async fn session_is_closed_when_grid_is_empty() {
    let mut browser =
        FakeBrowser::new().with_grid_pages(vec![grid_page(&[], false)]);
    let mut opts = options();
    opts.grid_timeout = std::time::Duration::from_millis(20);
    let pipeline = Pipeline::new(opts, LocationOptions::default());

    let outcome = pipeline.run_scoped(&mut browser, 3).await.unwrap();

    assert_eq!(outcome, PipelineOutcome::Empty);
    assert_eq!(browser.closes, 1);
}

#[tokio::test]
async fn session_is_closed_when_grid_navigation_fails() {
    let mut browser = single_page_browser(1).failing_on(GRID_URL);
    let pipeline = Pipeline::new(options(), LocationOptions::default());

    let result = pipeline.run_scoped(&mut browser, 1).await;

    assert!(result.is_err());
    assert_eq!(browser.closes, 1);
    assert_eq!(browser.navigations.len(), 1);
}

struct FixedLocator;

#[async_trait]
impl LocationService for FixedLocator {
    async fn resolve(&self, title: &str, address: Option<&str>) -> Result<Location, ScoutError> {
        assert_eq!(address, Some("Detalhes da Oferta"));
        if title.contains("Bonsucesso") {
            Ok(Location {
                city: "Guarulhos".into(),
                state: "SP".into(),
                full_address: "Vila Nova Bonsucesso, Guarulhos, SP".into(),
            })
        } else {
            Ok(Location::not_found())
        }
    }
}

#[tokio::test]
async fn placeholder_addresses_are_resolved_when_a_locator_is_set() {
    let grid = grid_page(
        &[
            Card::complete("Galpão Cajamar", "/imovel/1"),
            Card::complete("Bonsucesso Logistics Park - Vila Nova Bonsucesso", "/imovel/2"),
            Card::complete("Galpão sem pistas", "/imovel/3"),
        ],
        false,
    );
    let placeholder = Detail {
        address: Some("Detalhes da Oferta"),
        ..Detail::complete()
    };
    let untaxed_placeholder = Detail {
        property_tax: None,
        ..placeholder.clone()
    };
    let mut browser = FakeBrowser::new()
        .with_grid_pages(vec![grid])
        .with_detail(&detail_url(1), Detail::complete().html())
        .with_detail(&detail_url(2), placeholder.html())
        .with_detail(&detail_url(3), untaxed_placeholder.html());
    let pipeline =
        Pipeline::new(options(), LocationOptions::default()).with_locator(Box::new(FixedLocator));

    let outcome = pipeline.run(&mut browser, 1).await.unwrap();
    let records = outcome.records();

    assert_eq!(
        records[0].full_address,
        FieldValue::Present("Rua das Indústrias, 100 - Cajamar/SP".into())
    );
    assert_eq!(records[0].city, None);
    assert_eq!(
        records[1].full_address,
        FieldValue::Present("Vila Nova Bonsucesso, Guarulhos, SP".into())
    );
    assert_eq!(records[1].state.as_deref(), Some("SP"));
    assert_eq!(records[2].full_address, FieldValue::Unavailable);
    assert_eq!(records[1].property_tax, Some(1.2));
    assert_eq!(records[2].property_tax, None);
}

struct NowhereLocator;

#[async_trait]
impl LocationService for NowhereLocator {
    async fn resolve(&self, _: &str, _: Option<&str>) -> Result<Location, ScoutError> {
        Ok(Location::not_found())
    }
}

#[tokio::test]
async fn failed_detail_page_stays_a_collection_error_after_location_miss() {
    init_logger();
    let mut browser = single_page_browser(2).failing_on(&detail_url(2));
    let pipeline =
        Pipeline::new(options(), LocationOptions::default()).with_locator(Box::new(NowhereLocator));

    let outcome = pipeline.run(&mut browser, 1).await.unwrap();
    let records = outcome.records();

    assert_eq!(
        records[0].full_address,
        FieldValue::Present("Rua 1, 100 - Cajamar/SP".into())
    );
    assert_eq!(records[1].full_address, FieldValue::CollectionError);
    assert_eq!(records[1].city, None);
}

/// Two detail pages that differ in every field the enricher reads.
fn contrasting_details() -> FakeBrowser {
    let grid = grid_page(
        &[
            Card::complete("Galpão Um", "/imovel/1"),
            Card::complete("Galpão Dois", "/imovel/2"),
        ],
        false,
    );
    let first = Detail {
        address: Some("Rua Um, 1 - Cajamar/SP"),
        property_tax: Some("R$ 1,20"),
        ceiling_height: Some("12.00"),
        ..Detail::complete()
    };
    let second = Detail {
        address: Some("Rua Dois, 2 - Jundiaí/SP"),
        property_tax: Some("R$ 9,99"),
        ceiling_height: Some("8.50"),
        ..Detail::complete()
    };
    FakeBrowser::new()
        .with_grid_pages(vec![grid])
        .with_detail(&detail_url(1), first.html())
        .with_detail(&detail_url(2), second.html())
}

fn assert_own_page(listings: &[EnrichedListing]) {
    let second = listings[1].details.as_ref().unwrap();
    assert_eq!(second.address, FieldValue::Present("Rua Dois, 2 - Jundiaí/SP".into()));
    assert_eq!(second.property_tax, FieldValue::Present("R$ 9,99".into()));
    assert_eq!(second.ceiling_height, FieldValue::Present("8.50".into()));
    let first = listings[0].details.as_ref().unwrap();
    assert_eq!(first.property_tax, FieldValue::Present("R$ 1,20".into()));
}

#[tokio::test]
async fn next_detail_page_is_not_read_from_the_previous_render() {
    init_logger();
    let mut browser = contrasting_details().with_render_delay(6);
    let opts = options();

    let summaries = GridCrawler::new(&mut browser, &opts).collect(1).await.unwrap();
    let mut listings: Vec<EnrichedListing> = summaries.into_iter().map(Into::into).collect();
    let report = DetailEnricher::new(&mut browser, &opts).enrich(&mut listings).await;

    assert_eq!(report.failed, 0);
    assert_own_page(&listings);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn each_listing_keeps_its_own_details_under_any_render_delay(delay in 0usize..12) {
        let mut browser = contrasting_details().with_render_delay(delay);
        let opts = options();

        let listings = tokio_test::block_on(async {
            let summaries = GridCrawler::new(&mut browser, &opts).collect(1).await.unwrap();
            let mut listings: Vec<EnrichedListing> =
                summaries.into_iter().map(Into::into).collect();
            DetailEnricher::new(&mut browser, &opts).enrich(&mut listings).await;
            listings
        });

        let taxes: Vec<FieldValue> = listings
            .iter()
            .map(|l| l.details.as_ref().unwrap().property_tax.clone())
            .collect();
        prop_assert_eq!(
            taxes,
            vec![
                FieldValue::Present("R$ 1,20".into()),
                FieldValue::Present("R$ 9,99".into()),
            ]
        );
        let second = listings[1].details.as_ref().unwrap();
        prop_assert_eq!(&second.ceiling_height, &FieldValue::Present("8.50".into()));
    }
}
