//! Funnel session simulator.
//!
//! A session draws its attributes once, then walks the stage list with one
//! independent Bernoulli trial per stage and stops at the first failure.
//! The bounce flag is decided after the walk and applied to every row.

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::model::{
    round_cents, session_id, Bounce, Category, Channel, Device, EventRecord, Region, Stage,
    UserType,
};

// ════════════════════════════════════════════════════════════════════════════
// Constants
// ════════════════════════════════════════════════════════════════════════════

/// Session base timestamps fall within this many days before the anchor.
pub const LOOKBACK_DAYS: i64 = 30;
/// Purchase revenue bounds, inclusive
pub const REVENUE_RANGE: (f64, f64) = (200.0, 2000.0);
/// Per-session cost of a paid channel, inclusive
pub const TRAFFIC_COST_RANGE: (f64, f64) = (20.0, 150.0);
/// Minutes between consecutive events of a session, inclusive
pub const STEP_MINUTES: (i64, i64) = (2, 5);

/// Chance that a session which reached the previous stage also reaches
/// `stage`. Browse is never dropped.
pub fn pass_probability(stage: Stage) -> f64 {
    match stage {
        Stage::Browse => 1.0,
        Stage::AddToCart => 0.7,
        Stage::Checkout => 0.5,
        Stage::Purchase => 0.3,
    }
}

/// How many stages a session gets through.
///
/// `trial` yields one uniform draw in [0, 1) per attempted stage. The scan
/// stops at the first draw above the stage's pass probability, so the
/// failed stage consumes a draw and nothing after it is attempted.
pub fn funnel_depth(mut trial: impl FnMut() -> f64) -> usize {
    Stage::ALL
        .iter()
        .take_while(|&&stage| trial() <= pass_probability(stage))
        .count()
}

/// Set every row of a session to the same bounce outcome.
pub fn backfill_bounce(rows: &mut [EventRecord], bounce: Bounce) {
    for row in rows {
        row.bounce = bounce;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Session context
// ════════════════════════════════════════════════════════════════════════════

/// Attributes fixed at session creation and copied onto every row.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionContext {
    pub user_id: String,
    pub session_id: String,
    pub user_type: UserType,
    pub is_first_session: bool,
    pub started_at: NaiveDateTime,
    pub channel: Channel,
    pub traffic_cost: f64,
    pub category: Category,
    pub device: Device,
    pub region: Region,
}

impl SessionContext {
    fn record(&self, stage: Stage, timestamp: NaiveDateTime, revenue: f64) -> EventRecord {
        EventRecord {
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            event: stage,
            timestamp,
            device: self.device,
            region: self.region,
            channel: self.channel,
            category: self.category,
            revenue,
            // Placeholder until the walk finishes
            bounce: Bounce::Yes,
            user_type: self.user_type,
            is_first_session: self.is_first_session,
            traffic_cost: self.traffic_cost,
        }
    }
}

/// Rows emitted for one session plus whether it ended in a purchase.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionRows {
    pub rows: Vec<EventRecord>,
    pub completed_purchase: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// Simulator
// ════════════════════════════════════════════════════════════════════════════

/// Draws sessions against a fixed time window ending at `anchor`.
#[derive(Clone, Debug)]
pub struct SessionSimulator {
    anchor: NaiveDateTime,
    lookback_secs: Uniform<i64>,
    step_minutes: Uniform<i64>,
    revenue: Uniform<f64>,
    traffic_cost: Uniform<f64>,
}

impl SessionSimulator {
    pub fn new(anchor: NaiveDateTime) -> Self {
        Self {
            anchor,
            lookback_secs: Uniform::new_inclusive(0, LOOKBACK_DAYS * 24 * 60 * 60),
            step_minutes: Uniform::new_inclusive(STEP_MINUTES.0, STEP_MINUTES.1),
            revenue: Uniform::new_inclusive(REVENUE_RANGE.0, REVENUE_RANGE.1),
            traffic_cost: Uniform::new_inclusive(TRAFFIC_COST_RANGE.0, TRAFFIC_COST_RANGE.1),
        }
    }

    pub fn anchor(&self) -> NaiveDateTime {
        self.anchor
    }

    /// Draw the session-level attributes for session `session_no` (1-based)
    /// of user `user_no`.
    pub fn draw_context<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        user_id: &str,
        user_no: usize,
        session_no: usize,
    ) -> SessionContext {
        let started_at = self.anchor - Duration::seconds(self.lookback_secs.sample(rng));
        let user_type = UserType::for_session(session_no);

        let channel = pick(Channel::ALL, rng);
        let traffic_cost = if channel.is_paid() {
            round_cents(self.traffic_cost.sample(rng))
        } else {
            0.0
        };

        SessionContext {
            user_id: user_id.to_string(),
            session_id: session_id(user_no, session_no),
            user_type,
            is_first_session: user_type == UserType::New,
            started_at,
            channel,
            traffic_cost,
            category: pick(Category::ALL, rng),
            device: pick(Device::ALL, rng),
            region: pick(Region::ALL, rng),
        }
    }

    /// Run the stage walk for `ctx` with trials drawn from `rng`.
    pub fn simulate<R: Rng + ?Sized>(&self, ctx: &SessionContext, rng: &mut R) -> SessionRows {
        let depth = funnel_depth(|| rng.gen::<f64>());
        self.emit(ctx, depth, rng)
    }

    /// Emit rows for the first `depth` stages and backfill the bounce flag.
    pub fn emit<R: Rng + ?Sized>(
        &self,
        ctx: &SessionContext,
        depth: usize,
        rng: &mut R,
    ) -> SessionRows {
        let reached = &Stage::ALL[..depth.min(Stage::ALL.len())];
        let mut rows = Vec::with_capacity(reached.len());
        let mut at = ctx.started_at;

        for &stage in reached {
            let revenue = if stage == Stage::Purchase {
                round_cents(self.revenue.sample(rng))
            } else {
                0.0
            };
            rows.push(ctx.record(stage, at, revenue));
            at += Duration::minutes(self.step_minutes.sample(rng));
        }

        let completed_purchase = reached.last() == Some(&Stage::Purchase);
        backfill_bounce(&mut rows, Bounce::for_outcome(completed_purchase));

        SessionRows {
            rows,
            completed_purchase,
        }
    }
}

/// `choices` is one of the non-empty `ALL` sets.
fn pick<T: Copy, R: Rng + ?Sized>(choices: &[T], rng: &mut R) -> T {
    choices[rng.gen_range(0..choices.len())]
}
