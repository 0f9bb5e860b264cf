//! Unlock gating. Nothing here is stored: whether a capsule is open is always
//! recomputed from its unlock date and the caller's notion of "now".

use chrono::{DateTime, Utc};

use crate::api::{CapsuleView, TimeRemaining};
use crate::models::Capsule;

pub fn is_unlocked(capsule: &Capsule, now: DateTime<Utc>) -> bool {
    now >= capsule.unlock_date
}

/// `None` once unlocked.
pub fn time_until_unlock(capsule: &Capsule, now: DateTime<Utc>) -> Option<TimeRemaining> {
    if is_unlocked(capsule, now) {
        return None;
    }
    Some(TimeRemaining::from_duration(capsule.unlock_date - now))
}

/// Shapes the externally visible view of `capsule` at `now`.
///
/// Content is revealed only when the capsule is unlocked and the caller asked
/// for it. A locked capsule always carries its countdown instead.
pub fn project(capsule: &Capsule, now: DateTime<Utc>, include_content: bool) -> CapsuleView {
    let unlocked = is_unlocked(capsule, now);

    CapsuleView {
        id: capsule.id,
        title: capsule.title.clone(),
        content_type: capsule.content_type.clone(),
        creator_name: capsule.creator_name.clone(),
        tags: capsule.tags.to_vec(),
        created_at: capsule.created_at,
        unlock_date: capsule.unlock_date,
        is_public: capsule.is_public,
        is_unlocked: unlocked,
        fragment_x: capsule.fragment.x,
        fragment_y: capsule.fragment.y,
        fragment_rotation: capsule.fragment.rotation,
        fragment_scale: capsule.fragment.scale,
        content: (unlocked && include_content).then(|| capsule.content.clone()),
        time_remaining: time_until_unlock(capsule, now),
    }
}
