use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::SubsecRound;
use tracing::{info, warn};
use uuid::Uuid;

use capsule_db::{CapsuleFilter, CapsuleRepository};
use capsule_types::api::{
    CapsuleListResponse, CapsuleView, CreateCapsuleRequest, ListCapsulesQuery, StatsResponse,
};
use capsule_types::layout::{FragmentPatch, LayoutSource};
use capsule_types::models::{Capsule, DEFAULT_CONTENT_TYPE, TagList};
use capsule_types::time::{Clock, parse_timestamp};
use capsule_types::visibility::{is_unlocked, project};

use crate::error::{ApiError, CAPSULE_PRIVATE};

/// Default and maximum page size of a listing.
#[derive(Debug, Clone, Copy)]
pub struct PageLimit {
    pub default: u32,
    pub max: u32,
}

impl PageLimit {
    pub fn resolve(self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default).min(self.max)
    }
}

pub const LIST_LIMIT: PageLimit = PageLimit { default: 50, max: 100 };
pub const UNLOCKED_LIMIT: PageLimit = PageLimit { default: 30, max: 100 };
pub const LOCKED_LIMIT: PageLimit = PageLimit { default: 10, max: 50 };

/// Stored timestamps keep microseconds; truncate up front so what we return
/// is what a later read will see.
const STORED_SUBSEC_DIGITS: u16 = 6;

/// The capsule store: validation in front of a [`CapsuleRepository`], with
/// the unlock rules applied to everything handed back.
pub struct CapsuleService {
    repo: Arc<dyn CapsuleRepository>,
    clock: Arc<dyn Clock>,
    layouts: Arc<dyn LayoutSource>,
}

impl CapsuleService {
    pub fn new(
        repo: Arc<dyn CapsuleRepository>,
        clock: Arc<dyn Clock>,
        layouts: Arc<dyn LayoutSource>,
    ) -> Self {
        Self { repo, clock, layouts }
    }

    /// Seals a new capsule. The response never carries content.
    pub fn create(&self, req: CreateCapsuleRequest) -> Result<CapsuleView, ApiError> {
        let title = required("title", req.title)?;
        let content = required("content", req.content)?;
        let creator_name = required("creator_name", req.creator_name)?;
        let unlock_date = required("unlock_date", req.unlock_date)?;

        let unlock_date = parse_timestamp(&unlock_date)
            .ok_or_else(|| ApiError::validation("Invalid unlock_date format. Use ISO 8601 format."))?
            .trunc_subsecs(STORED_SUBSEC_DIGITS);

        let now = self.clock.now().trunc_subsecs(STORED_SUBSEC_DIGITS);
        if unlock_date <= now {
            return Err(ApiError::validation("Unlock date must be in the future"));
        }

        let capsule = Capsule {
            id: Uuid::new_v4(),
            title,
            content,
            content_type: req.content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            creator_name,
            creator_email: req.creator_email,
            tags: req.tags.map(TagList::from).unwrap_or_default(),
            created_at: now,
            unlock_date,
            is_public: req.is_public.unwrap_or(true),
            fragment: self.layouts.layout(),
        };

        self.repo.insert(&capsule)?;
        info!("Capsule {} sealed until {}", capsule.id, capsule.unlock_date);

        Ok(project(&capsule, now, false))
    }

    pub fn get(&self, id: &str) -> Result<CapsuleView, ApiError> {
        let capsule = self.find(id)?;
        if !capsule.is_public {
            return Err(ApiError::Forbidden(CAPSULE_PRIVATE.to_string()));
        }

        let now = self.clock.now();
        Ok(project(&capsule, now, is_unlocked(&capsule, now)))
    }

    pub fn list(&self, query: ListCapsulesQuery) -> Result<CapsuleListResponse, ApiError> {
        let limit = LIST_LIMIT.resolve(query.limit);
        let offset = query.offset.unwrap_or(0);
        let filter = CapsuleFilter {
            tag: non_empty(query.tag),
            search: non_empty(query.search),
            content_type: non_empty(query.content_type),
        };

        let capsules = self.repo.list_public(&filter, limit, offset)?;
        let total = self.repo.count_public(&filter)?;

        let now = self.clock.now();
        let capsules = capsules
            .iter()
            .map(|c| project(c, now, is_unlocked(c, now)))
            .collect();

        Ok(CapsuleListResponse { capsules, total, limit, offset })
    }

    pub fn list_unlocked(&self, limit: Option<u32>) -> Result<Vec<CapsuleView>, ApiError> {
        let now = self.clock.now();
        let capsules = self.repo.list_unlocked(now, UNLOCKED_LIMIT.resolve(limit))?;
        Ok(capsules.iter().map(|c| project(c, now, true)).collect())
    }

    pub fn list_locked(&self, limit: Option<u32>) -> Result<Vec<CapsuleView>, ApiError> {
        let now = self.clock.now();
        let capsules = self.repo.list_locked(now, LOCKED_LIMIT.resolve(limit))?;
        Ok(capsules.iter().map(|c| project(c, now, false)).collect())
    }

    pub fn delete(&self, id: &str) -> Result<(), ApiError> {
        let id = parse_id(id)?;
        if !self.repo.delete(&id)? {
            return Err(ApiError::not_found());
        }
        info!("Capsule {} deleted", id);
        Ok(())
    }

    /// Moves a capsule on the collage. Absent fields keep their value.
    pub fn update_position(&self, id: &str, patch: FragmentPatch) -> Result<CapsuleView, ApiError> {
        let mut capsule = self.find(id)?;
        capsule.fragment.apply(&patch);

        if !self.repo.update_fragment(&capsule.id, &capsule.fragment)? {
            // Deleted between the read and the write.
            return Err(ApiError::not_found());
        }

        let now = self.clock.now();
        Ok(project(&capsule, now, is_unlocked(&capsule, now)))
    }

    /// Distinct tags of public capsules, sorted.
    pub fn tags(&self) -> Result<Vec<String>, ApiError> {
        let tags: BTreeSet<String> = self
            .repo
            .public_tags()?
            .iter()
            .flat_map(|list| list.iter().map(str::to_string))
            .collect();
        Ok(tags.into_iter().collect())
    }

    pub fn stats(&self) -> Result<StatsResponse, ApiError> {
        let counts = self.repo.unlock_counts(self.clock.now())?;
        Ok(StatsResponse {
            total: counts.total,
            unlocked: counts.unlocked,
            locked: counts.locked,
        })
    }

    fn find(&self, id: &str) -> Result<Capsule, ApiError> {
        let id = parse_id(id)?;
        self.repo.find(&id)?.ok_or_else(ApiError::not_found)
    }
}

/// Ids that are not UUIDs cannot name a capsule.
fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    id.parse().map_err(|_| {
        warn!("Lookup with malformed capsule id '{}'", id);
        ApiError::not_found()
    })
}

fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::validation(format!("Missing required field: {field}"))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
