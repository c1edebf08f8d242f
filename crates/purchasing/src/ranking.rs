//! Multi-criteria bid ranking (TOPSIS).
//!
//! Scores each bid by its relative closeness to a hypothetical ideal bid
//! (lowest prices and lead time, best-rated vendor) versus the worst one.
//! The decision is plain array arithmetic over a fixed five-criterion record;
//! chart rendering stays with the caller, which receives plot-ready series.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use procura_core::{DomainError, DomainResult, Money};

use crate::bid::BidId;

const CRITERIA: usize = 5;

/// Ranking criterion, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    UnitPrice,
    TotalCost,
    LeadTime,
    VendorRating,
    TotalRatings,
}

impl Criterion {
    pub const ALL: [Criterion; CRITERIA] = [
        Criterion::UnitPrice,
        Criterion::TotalCost,
        Criterion::LeadTime,
        Criterion::VendorRating,
        Criterion::TotalRatings,
    ];

    /// Benefit criteria prefer larger values; cost criteria prefer smaller.
    pub fn is_benefit(self) -> bool {
        matches!(self, Criterion::VendorRating | Criterion::TotalRatings)
    }

    pub fn label(self) -> &'static str {
        match self {
            Criterion::UnitPrice => "unit_price",
            Criterion::TotalCost => "total_cost",
            Criterion::LeadTime => "lead_time",
            Criterion::VendorRating => "vendor_rating",
            Criterion::TotalRatings => "total_ratings",
        }
    }
}

/// Caller-supplied weights. Must be non-negative and sum to exactly 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaWeights {
    pub unit_price: Decimal,
    pub total_cost: Decimal,
    pub lead_time: Decimal,
    pub vendor_rating: Decimal,
    pub total_ratings: Decimal,
}

impl CriteriaWeights {
    fn as_array(&self) -> [Decimal; CRITERIA] {
        [
            self.unit_price,
            self.total_cost,
            self.lead_time,
            self.vendor_rating,
            self.total_ratings,
        ]
    }

    pub fn validate(&self) -> DomainResult<()> {
        let weights = self.as_array();
        if let Some(c) = Criterion::ALL
            .iter()
            .zip(weights)
            .find(|(_, w)| w.is_sign_negative() && !w.is_zero())
            .map(|(c, _)| c)
        {
            return Err(DomainError::validation(format!(
                "weight for {} cannot be negative",
                c.label()
            )));
        }

        let sum: Decimal = weights.iter().sum();
        if sum != Decimal::ONE {
            return Err(DomainError::validation(format!(
                "weights must sum to 1 (got {sum})"
            )));
        }
        Ok(())
    }
}

/// One bid as seen by the ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidCandidate {
    pub bid_id: BidId,
    pub unit_price: Money,
    pub fulfilled_quantity: u32,
    pub lead_time_days: u32,
    pub vendor_rating: f64,
    pub vendor_total_ratings: u64,
}

impl BidCandidate {
    fn criteria(&self) -> DomainResult<[f64; CRITERIA]> {
        Ok([
            self.unit_price.to_f64(),
            self.unit_price.times(self.fulfilled_quantity)?.to_f64(),
            f64::from(self.lead_time_days),
            self.vendor_rating,
            self.vendor_total_ratings as f64,
        ])
    }
}

/// A bid with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedBid {
    pub bid_id: BidId,
    /// 1 = closest to the ideal.
    pub rank: u32,
    pub closeness: f64,
    pub distance_to_ideal: f64,
    pub distance_to_negative_ideal: f64,
    /// Raw criterion values, in [`Criterion::ALL`] order.
    pub criteria: [f64; CRITERIA],
    /// Weighted min–max normalized criterion values.
    pub weighted: [f64; CRITERIA],
}

/// Bids ordered by rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRanking {
    pub ranked: Vec<RankedBid>,
}

/// One polygon of a radar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarSeries {
    pub bid_id: BidId,
    pub rank: u32,
    pub values: Vec<(Criterion, f64)>,
}

/// One line of a parallel-coordinates chart, coloured by rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelCoordinate {
    pub bid_id: BidId,
    pub rank: u32,
    pub values: Vec<(Criterion, f64)>,
}

impl BidRanking {
    pub fn best(&self) -> Option<&RankedBid> {
        self.ranked.first()
    }

    pub fn position(&self, bid_id: BidId) -> Option<&RankedBid> {
        self.ranked.iter().find(|r| r.bid_id == bid_id)
    }

    /// Weighted-normalized criteria per bid.
    pub fn radar_series(&self) -> Vec<RadarSeries> {
        self.ranked
            .iter()
            .map(|r| RadarSeries {
                bid_id: r.bid_id,
                rank: r.rank,
                values: Criterion::ALL.iter().copied().zip(r.weighted).collect(),
            })
            .collect()
    }

    /// Raw criteria per bid.
    pub fn parallel_coordinates(&self) -> Vec<ParallelCoordinate> {
        self.ranked
            .iter()
            .map(|r| ParallelCoordinate {
                bid_id: r.bid_id,
                rank: r.rank,
                values: Criterion::ALL.iter().copied().zip(r.criteria).collect(),
            })
            .collect()
    }
}

/// Rank `candidates` by TOPSIS relative closeness.
///
/// Ties keep input order. A column where every bid has the same value
/// normalizes to 0 and so contributes nothing.
pub fn rank_bids(candidates: &[BidCandidate], weights: &CriteriaWeights) -> DomainResult<BidRanking> {
    if candidates.len() < 2 {
        return Err(DomainError::validation(
            "there must be at least two bids to perform ranking",
        ));
    }
    weights.validate()?;

    let weights: Vec<f64> = weights
        .as_array()
        .iter()
        .map(|w| w.to_f64().unwrap_or(0.0))
        .collect();
    let matrix = candidates
        .iter()
        .map(BidCandidate::criteria)
        .collect::<DomainResult<Vec<_>>>()?;

    let mut weighted = vec![[0.0; CRITERIA]; matrix.len()];
    let mut ideal = [0.0; CRITERIA];
    let mut negative_ideal = [0.0; CRITERIA];

    for (col, criterion) in Criterion::ALL.iter().enumerate() {
        let (min, max) = matrix.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), row| {
            (lo.min(row[col]), hi.max(row[col]))
        });
        let span = max - min;

        for (row, out) in matrix.iter().zip(weighted.iter_mut()) {
            let normalized = if span > 0.0 { (row[col] - min) / span } else { 0.0 };
            out[col] = normalized * weights[col];
        }

        let (lo, hi) = weighted.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), row| {
            (lo.min(row[col]), hi.max(row[col]))
        });
        if criterion.is_benefit() {
            ideal[col] = hi;
            negative_ideal[col] = lo;
        } else {
            ideal[col] = lo;
            negative_ideal[col] = hi;
        }
    }

    let mut ranked: Vec<RankedBid> = candidates
        .iter()
        .zip(matrix)
        .zip(weighted)
        .map(|((candidate, criteria), weighted)| {
            let d_plus = euclidean(&weighted, &ideal);
            let d_minus = euclidean(&weighted, &negative_ideal);
            let denominator = d_plus + d_minus;
            RankedBid {
                bid_id: candidate.bid_id,
                rank: 0,
                closeness: if denominator > 0.0 { d_minus / denominator } else { 0.0 },
                distance_to_ideal: d_plus,
                distance_to_negative_ideal: d_minus,
                criteria,
                weighted,
            }
        })
        .collect();

    // `sort_by` is stable, so equal closeness keeps input order.
    ranked.sort_by(|a, b| b.closeness.total_cmp(&a.closeness));
    for (i, r) in ranked.iter_mut().enumerate() {
        r.rank = i as u32 + 1;
    }

    Ok(BidRanking { ranked })
}

fn euclidean(a: &[f64; CRITERIA], b: &[f64; CRITERIA]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
