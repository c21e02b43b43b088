use chrono::{DateTime, TimeZone, Utc};
use log::info;

use crate::{
    error::LedgerResult,
    ledger::Ledger,
    post::NewPost,
    store::Store,
    user::NewUser,
};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Fill an empty store with two users and two posts.
///
/// Returns `false` when the store already had data and nothing was inserted.
pub fn populate<S: Store>(ledger: &Ledger<S>) -> LedgerResult<bool> {
    if !ledger.store().is_empty()? {
        info!("Store already populated, skipping sample data");
        return Ok(false);
    }

    let sample = ledger
        .register_user(NewUser::new("SampleUser", "hashedGoogleId1").member_since(at(1, 8)))?;
    let another = ledger
        .register_user(NewUser::new("AnotherUser", "hashedGoogleId2").member_since(at(2, 9)))?;

    let post = ledger.create_post(
        NewPost::new(sample.id, "Sample Post", "This is a sample post.").created_at(at(1, 10)),
    )?;
    ledger.toggle_like(post.id, another.id)?;

    ledger.create_post(
        NewPost::new(another.id, "Another Post", "This is another sample post.")
            .created_at(at(2, 12)),
    )?;

    info!("Store populated with sample data");
    Ok(true)
}
