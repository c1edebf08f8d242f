use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::NaiveDate;
use procura_auth::Principal;
use procura_core::{Money, UserId};
use procura_events::{EventEnvelope, InMemoryEventBus};
use procura_infra::engine::{Decision, Procurement};
use procura_infra::side_effects::{PlainTextReportRenderer, TracingNotifier};
use procura_infra::event_store::InMemoryEventStore;
use procura_inventory::ItemDetails;
use procura_parties::{VendorProfile, VendorType};
use procura_purchasing::{
    rank_bids, BidCandidate, BidId, BidTerms, CriteriaWeights, RequisitionDetails, RequisitionId,
    Urgency,
};
use rust_decimal::Decimal;
use std::sync::Arc;

type Engine = Procurement<InMemoryEventStore, Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>>;

fn money(units: i64) -> Money {
    Money::new(Decimal::from(units)).unwrap()
}

fn equal_weights() -> CriteriaWeights {
    CriteriaWeights {
        unit_price: Decimal::new(2, 1),
        total_cost: Decimal::new(2, 1),
        lead_time: Decimal::new(2, 1),
        vendor_rating: Decimal::new(2, 1),
        total_ratings: Decimal::new(2, 1),
    }
}

fn candidates(n: usize) -> Vec<BidCandidate> {
    (0..n)
        .map(|i| BidCandidate {
            bid_id: BidId::generate(),
            unit_price: money(10 + (i % 17) as i64),
            fulfilled_quantity: 50 + (i % 11) as u32,
            lead_time_days: 3 + (i % 9) as u32,
            vendor_rating: 1.0 + (i % 5) as f64,
            vendor_total_ratings: (i % 23) as u64,
        })
        .collect()
}

fn engine() -> Engine {
    Procurement::new(
        InMemoryEventStore::new(),
        Arc::new(InMemoryEventBus::new()),
        Arc::new(TracingNotifier),
        Arc::new(PlainTextReportRenderer::new()),
    )
}

/// An open requisition with `bids` submitted bids; returns one of them.
fn requisition_with_bids(engine: &Engine, officer: &Principal, bids: usize) -> (RequisitionId, BidId) {
    let item_id = engine
        .create_item(
            officer,
            ItemDetails {
                name: "Bench item".to_string(),
                description: String::new(),
                unit_price: money(5),
                reorder_level: 10,
                location: "A1".to_string(),
                expiration_date: None,
            },
            100,
        )
        .unwrap();
    let requisition_id = engine
        .create_requisition(
            officer,
            item_id,
            "REQ-BENCH",
            RequisitionDetails {
                requested_quantity: 50,
                expected_delivery: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
                urgency: Urgency::Medium,
                comments: None,
            },
        )
        .unwrap();

    let mut first = None;
    for i in 0..bids {
        let vendor = Principal::vendor(UserId::new());
        engine
            .register_vendor(
                &vendor,
                VendorProfile {
                    name: format!("Vendor {i}"),
                    address: "Dock 4".to_string(),
                    vendor_type: VendorType::Supplier,
                    certified: false,
                    contract_expiry: NaiveDate::from_ymd_opt(2028, 1, 1).unwrap(),
                },
            )
            .unwrap();
        let bid_id = engine
            .submit_bid(
                &vendor,
                requisition_id,
                BidTerms {
                    fulfilled_quantity: 50,
                    unit_price: money(10 + i as i64),
                    lead_time_days: 5,
                    comments: None,
                },
            )
            .unwrap();
        first.get_or_insert(bid_id);
    }

    (requisition_id, first.unwrap())
}

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("bid_ranking");
    let weights = equal_weights();

    for n in [2usize, 10, 100, 1000] {
        let input = candidates(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("rank_bids", n), &input, |b, input| {
            b.iter(|| black_box(rank_bids(black_box(input), &weights).unwrap()));
        });
    }

    group.finish();
}

fn bench_ranking_through_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_ranking");
    let weights = equal_weights();

    for n in [2usize, 20] {
        let engine = engine();
        let officer = Principal::procurement_officer(UserId::new());
        let (requisition_id, _) = requisition_with_bids(&engine, &officer, n);

        group.bench_function(BenchmarkId::new("rank_bids", n), |b| {
            b.iter(|| {
                black_box(
                    engine
                        .rank_bids(&officer, requisition_id, &weights)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn bench_award(c: &mut Criterion) {
    let mut group = c.benchmark_group("award");
    group.sample_size(20);

    // Accepting rejects every sibling in the same commit.
    for siblings in [1usize, 10, 50] {
        group.bench_function(BenchmarkId::new("accept_with_siblings", siblings), |b| {
            b.iter_batched(
                || {
                    let engine = engine();
                    let officer = Principal::procurement_officer(UserId::new());
                    let (_, bid_id) = requisition_with_bids(&engine, &officer, siblings + 1);
                    (engine, officer, bid_id)
                },
                |(engine, officer, bid_id)| {
                    black_box(engine.decide(&officer, bid_id, Decision::Accept).unwrap())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_ranking,
    bench_ranking_through_engine,
    bench_award
);
criterion_main!(benches);
