//! Funnel-level aggregate of one generated dataset.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::generator::Dataset;
use crate::model::{Bounce, Channel, EventRecord, Stage, UserType};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageReach {
    pub stage: Stage,
    /// Sessions that emitted this stage
    pub sessions: usize,
    /// sessions / sessions at the previous stage (1.0 for Browse)
    pub step_conversion: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunnelSummary {
    pub users: usize,
    pub sessions: usize,
    pub events: usize,

    pub stages: Vec<StageReach>,

    pub new_sessions: usize,
    pub returning_sessions: usize,

    pub purchases: usize,
    /// purchases / sessions
    pub conversion_rate: f64,
    /// Sessions flagged as bounced / sessions
    pub bounce_rate: f64,

    pub revenue_total: f64,
    pub order_value_mean: f64,
    pub order_value_p50: f64,
    pub order_value_p90: f64,

    /// Sum of per-session traffic cost
    pub traffic_spend: f64,
    /// traffic_spend / purchases (0 when nothing was bought)
    pub cost_per_purchase: f64,

    pub purchases_by_channel: BTreeMap<Channel, usize>,
}

// ════════════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════════════

fn quantile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return 0.0;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn sorted(vals: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = vals.collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    v
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Group rows into sessions. Rows of one session are contiguous.
fn sessions(rows: &[EventRecord]) -> impl Iterator<Item = &[EventRecord]> {
    rows.chunk_by(|a, b| a.session_id == b.session_id)
}

// ════════════════════════════════════════════════════════════════════════════
// Aggregation
// ════════════════════════════════════════════════════════════════════════════

pub fn aggregate(data: &Dataset) -> FunnelSummary {
    let mut reached = [0usize; 4];
    let mut session_count = 0usize;
    let mut new_sessions = 0usize;
    let mut bounced = 0usize;
    let mut traffic_spend = 0.0;

    for session in sessions(&data.rows) {
        session_count += 1;
        for (slot, stage) in Stage::ALL.iter().enumerate() {
            if session.iter().any(|r| r.event == *stage) {
                reached[slot] += 1;
            }
        }
        let first = &session[0];
        if first.user_type == UserType::New {
            new_sessions += 1;
        }
        if first.bounce == Bounce::Yes {
            bounced += 1;
        }
        traffic_spend += first.traffic_cost;
    }

    let stages = Stage::ALL
        .iter()
        .enumerate()
        .map(|(slot, &stage)| StageReach {
            stage,
            sessions: reached[slot],
            step_conversion: if slot == 0 {
                ratio(reached[0], session_count)
            } else {
                ratio(reached[slot], reached[slot - 1])
            },
        })
        .collect();

    let orders: Vec<&EventRecord> = data
        .rows
        .iter()
        .filter(|r| r.event == Stage::Purchase)
        .collect();
    let order_values = sorted(orders.iter().map(|r| r.revenue));
    let purchases = orders.len();

    let mut purchases_by_channel: BTreeMap<Channel, usize> =
        Channel::ALL.iter().map(|&c| (c, 0)).collect();
    for order in &orders {
        *purchases_by_channel.entry(order.channel).or_insert(0) += 1;
    }

    FunnelSummary {
        users: data.users,
        sessions: session_count,
        events: data.rows.len(),

        stages,

        new_sessions,
        returning_sessions: session_count - new_sessions,

        purchases,
        conversion_rate: ratio(purchases, session_count),
        bounce_rate: ratio(bounced, session_count),

        revenue_total: order_values.iter().sum(),
        order_value_mean: mean(&order_values),
        order_value_p50: quantile(&order_values, 0.50),
        order_value_p90: quantile(&order_values, 0.90),

        traffic_spend,
        cost_per_purchase: if purchases == 0 {
            0.0
        } else {
            traffic_spend / purchases as f64
        },

        purchases_by_channel,
    }
}
