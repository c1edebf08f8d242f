//! Inventory reorder optimization.
//!
//! Pure functions sizing the next order for an item. The formula variant is
//! picked from which optional parameters are supplied; derived figures (EOQ,
//! safety stock, reorder point) are always computed here, never accepted as
//! input.

use serde::{Deserialize, Serialize};

use procura_core::{DomainError, DomainResult, Money};

const DAYS_PER_YEAR: f64 = 365.0;

/// Inputs for an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationParameters {
    /// Expected annual demand in units.
    pub annual_demand: u64,
    /// Fixed cost of placing one order.
    pub ordering_cost: Money,
    /// Cost of holding one unit for a year.
    pub holding_cost: Money,
    pub lead_time_days: Option<u32>,
    /// Target probability of not stocking out, strictly between 0 and 1.
    pub service_level: Option<f64>,
    pub shelf_life_days: Option<u32>,
    /// Maximum units the storage location can hold.
    pub storage_capacity: Option<u64>,
}

/// Formula variant used to produce an [`OptimizationRecord`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationModel {
    Classical,
    ReorderPoint,
    Perishable,
    LimitedStorage,
}

/// Parameters plus the derived outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub parameters: OptimizationParameters,
    pub model: OptimizationModel,
    pub eoq: f64,
    pub safety_stock: Option<f64>,
    pub reorder_point: Option<f64>,
}

/// Safety stock and the stock level that triggers a reorder.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ReorderLevels {
    pub safety_stock: f64,
    pub reorder_point: f64,
}

/// `sqrt(2·demand·ordering_cost / holding_cost)`.
pub fn eoq_classical(demand: f64, ordering_cost: f64, holding_cost: f64) -> DomainResult<f64> {
    ensure_positive_holding_cost(holding_cost)?;
    Ok((2.0 * demand * ordering_cost / holding_cost).sqrt())
}

/// Safety stock and reorder point for a normally distributed daily demand.
///
/// `z` is taken two-sided at `service_level + (1 - service_level) / 2`.
pub fn safety_stock_and_rop(
    demand: f64,
    lead_time_days: f64,
    service_level: f64,
) -> DomainResult<ReorderLevels> {
    if !(service_level > 0.0 && service_level < 1.0) {
        return Err(DomainError::validation(
            "service level must be strictly between 0 and 1",
        ));
    }
    if lead_time_days < 1.0 {
        return Err(DomainError::validation("lead time must be at least 1 day"));
    }

    let daily_demand = demand / DAYS_PER_YEAR;
    let z = inverse_normal_cdf(service_level + (1.0 - service_level) / 2.0);
    let safety_stock = z * (lead_time_days * daily_demand.powi(2)).sqrt();

    Ok(ReorderLevels {
        safety_stock,
        reorder_point: daily_demand * lead_time_days + safety_stock,
    })
}

/// Classical EOQ with the reorder point folded into the numerator.
pub fn eoq_with_rop(
    demand: f64,
    ordering_cost: f64,
    holding_cost: f64,
    reorder_point: f64,
) -> DomainResult<f64> {
    ensure_positive_holding_cost(holding_cost)?;
    Ok((2.0 * demand * ordering_cost * reorder_point / holding_cost).sqrt())
}

/// EOQ for goods that expire after `shelf_life_days`.
pub fn eoq_perishable(
    demand: f64,
    ordering_cost: f64,
    holding_cost: f64,
    shelf_life_days: f64,
) -> DomainResult<f64> {
    ensure_positive_holding_cost(holding_cost)?;
    let daily_demand = demand / DAYS_PER_YEAR;
    Ok((2.0 * daily_demand * ordering_cost * shelf_life_days / holding_cost).sqrt())
}

/// Classical EOQ capped at what storage can hold.
pub fn eoq_limited_storage(
    demand: f64,
    ordering_cost: f64,
    holding_cost: f64,
    storage_capacity: f64,
) -> DomainResult<f64> {
    Ok(eoq_classical(demand, ordering_cost, holding_cost)?.min(storage_capacity))
}

/// Validate `parameters` and run the applicable formula.
///
/// Precedence: lead time + service level (both required), then shelf life,
/// then storage capacity, else classical.
pub fn optimize(parameters: &OptimizationParameters) -> DomainResult<OptimizationRecord> {
    validate(parameters)?;

    let demand = parameters.annual_demand as f64;
    let ordering_cost = parameters.ordering_cost.to_f64();
    let holding_cost = parameters.holding_cost.to_f64();

    let (model, eoq, levels) = match (
        parameters.lead_time_days,
        parameters.service_level,
        parameters.shelf_life_days,
        parameters.storage_capacity,
    ) {
        (Some(lead_time), Some(service_level), _, _) => {
            let levels = safety_stock_and_rop(demand, f64::from(lead_time), service_level)?;
            let eoq = eoq_with_rop(demand, ordering_cost, holding_cost, levels.reorder_point)?;
            (OptimizationModel::ReorderPoint, eoq, Some(levels))
        }
        (_, _, Some(shelf_life), _) => {
            let eoq = eoq_perishable(demand, ordering_cost, holding_cost, f64::from(shelf_life))?;
            (OptimizationModel::Perishable, eoq, None)
        }
        (_, _, None, Some(capacity)) => {
            let eoq = eoq_limited_storage(demand, ordering_cost, holding_cost, capacity as f64)?;
            (OptimizationModel::LimitedStorage, eoq, None)
        }
        _ => (
            OptimizationModel::Classical,
            eoq_classical(demand, ordering_cost, holding_cost)?,
            None,
        ),
    };

    Ok(OptimizationRecord {
        parameters: parameters.clone(),
        model,
        eoq,
        safety_stock: levels.map(|l| l.safety_stock),
        reorder_point: levels.map(|l| l.reorder_point),
    })
}

fn validate(p: &OptimizationParameters) -> DomainResult<()> {
    if p.holding_cost.is_zero() {
        return Err(DomainError::validation("holding cost must be greater than 0"));
    }
    if let Some(sl) = p.service_level {
        if !(sl > 0.0 && sl < 1.0) {
            return Err(DomainError::validation(
                "service level must be strictly between 0 and 1",
            ));
        }
    }
    if p.lead_time_days == Some(0) {
        return Err(DomainError::validation("lead time must be at least 1 day"));
    }
    if p.shelf_life_days == Some(0) {
        return Err(DomainError::validation("shelf life must be at least 1 day"));
    }
    if p.storage_capacity == Some(0) {
        return Err(DomainError::validation("storage capacity must be greater than 0"));
    }
    Ok(())
}

fn ensure_positive_holding_cost(holding_cost: f64) -> DomainResult<()> {
    if holding_cost <= 0.0 || holding_cost.is_nan() {
        return Err(DomainError::validation("holding cost must be greater than 0"));
    }
    Ok(())
}

/// Standard normal quantile function.
///
/// Abramowitz and Stegun 26.2.23; absolute error below 4.5e-4.
fn inverse_normal_cdf(p: f64) -> f64 {
    if p >= 1.0 {
        return 5.0;
    }
    if p <= 0.0 {
        return -5.0;
    }
    if p == 0.5 {
        return 0.0;
    }

    // Approximation holds on (0, 0.5]; mirror the upper half.
    let q = if p < 0.5 { p } else { 1.0 - p };
    let t = (-2.0 * q.ln()).sqrt();

    const C: [f64; 3] = [2.515517, 0.802853, 0.010328];
    const D: [f64; 3] = [1.432788, 0.189269, 0.001308];

    let numerator = C[0] + C[1] * t + C[2] * t * t;
    let denominator = 1.0 + D[0] * t + D[1] * t * t + D[2] * t * t * t;
    let x = t - numerator / denominator;

    if p < 0.5 { -x } else { x }
}
