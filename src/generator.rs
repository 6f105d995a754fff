//! User/session driver: walks users in order, opens 1–4 sessions each and
//! appends every session's rows to one output sequence.

use rand::Rng;
use tracing::debug;

use crate::funnel::SessionSimulator;
use crate::model::{user_id, EventRecord};

/// Sessions per user, inclusive
pub const SESSIONS_PER_USER: (usize, usize) = (1, 4);
/// Largest user count whose ids stay five digits wide (`USR99999`)
pub const MAX_USERS: usize = 99_999;
/// About 5.4 rows per user on average (2.5 sessions × 2.155 stages)
const ROWS_PER_USER_HINT: usize = 6;
/// Emit a progress event every N users
const PROGRESS_INTERVAL: usize = 1000;

/// Everything one generation pass produced.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub users: usize,
    pub sessions: usize,
    /// Sessions that reached Purchase
    pub purchases: usize,
    /// Rows in user order, then session order, then stage order.
    pub rows: Vec<EventRecord>,
}

pub fn generate<R: Rng + ?Sized>(users: usize, sim: &SessionSimulator, rng: &mut R) -> Dataset {
    let mut dataset = Dataset {
        users,
        sessions: 0,
        purchases: 0,
        rows: Vec::with_capacity(users.min(MAX_USERS) * ROWS_PER_USER_HINT),
    };

    for user_no in 1..=users {
        generate_user(user_no, sim, rng, &mut dataset);

        if user_no % PROGRESS_INTERVAL == 0 {
            debug!(
                users = user_no,
                sessions = dataset.sessions,
                rows = dataset.rows.len(),
                "generation progress"
            );
        }
    }

    dataset
}

fn generate_user<R: Rng + ?Sized>(
    user_no: usize,
    sim: &SessionSimulator,
    rng: &mut R,
    out: &mut Dataset,
) {
    let user = user_id(user_no);
    let sessions = rng.gen_range(SESSIONS_PER_USER.0..=SESSIONS_PER_USER.1);

    for session_no in 1..=sessions {
        let ctx = sim.draw_context(rng, &user, user_no, session_no);
        let session = sim.simulate(&ctx, rng);
        out.sessions += 1;
        if session.completed_purchase {
            out.purchases += 1;
        }
        out.rows.extend(session.rows);
    }
}
