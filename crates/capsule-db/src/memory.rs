use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use capsule_types::layout::Fragment;
use capsule_types::models::{Capsule, TagList};

use crate::repository::{CapsuleFilter, CapsuleRepository, UnlockCounts};

/// Volatile capsule store. Same semantics as the SQLite one, minus the file.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    capsules: RwLock<Vec<Capsule>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Capsule>>> {
        self.capsules.read().map_err(|e| anyhow!("Store lock poisoned: {}", e))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Capsule>>> {
        self.capsules.write().map_err(|e| anyhow!("Store lock poisoned: {}", e))
    }

    fn public_where<P>(&self, predicate: P) -> Result<Vec<Capsule>>
    where
        P: Fn(&Capsule) -> bool,
    {
        Ok(self
            .read()?
            .iter()
            .filter(|c| c.is_public && predicate(c))
            .cloned()
            .collect())
    }
}

fn newest_first(capsules: &mut [Capsule]) {
    capsules.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl CapsuleRepository for MemoryRepository {
    fn insert(&self, capsule: &Capsule) -> Result<()> {
        let mut capsules = self.write()?;
        if capsules.iter().any(|c| c.id == capsule.id) {
            return Err(anyhow!("Duplicate capsule id {}", capsule.id));
        }
        capsules.push(capsule.clone());
        Ok(())
    }

    fn find(&self, id: &Uuid) -> Result<Option<Capsule>> {
        Ok(self.read()?.iter().find(|c| &c.id == id).cloned())
    }

    fn delete(&self, id: &Uuid) -> Result<bool> {
        let mut capsules = self.write()?;
        let before = capsules.len();
        capsules.retain(|c| &c.id != id);
        Ok(capsules.len() < before)
    }

    fn update_fragment(&self, id: &Uuid, fragment: &Fragment) -> Result<bool> {
        let mut capsules = self.write()?;
        match capsules.iter_mut().find(|c| &c.id == id) {
            Some(capsule) => {
                capsule.fragment = *fragment;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list_public(&self, filter: &CapsuleFilter, limit: u32, offset: u32) -> Result<Vec<Capsule>> {
        let mut matching = self.public_where(|c| filter.matches(c))?;
        newest_first(&mut matching);
        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    fn count_public(&self, filter: &CapsuleFilter) -> Result<u64> {
        Ok(self.public_where(|c| filter.matches(c))?.len() as u64)
    }

    fn list_unlocked(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Capsule>> {
        let mut unlocked = self.public_where(|c| c.unlock_date <= now)?;
        newest_first(&mut unlocked);
        unlocked.truncate(limit as usize);
        Ok(unlocked)
    }

    fn list_locked(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Capsule>> {
        let mut locked = self.public_where(|c| c.unlock_date > now)?;
        locked.sort_by(|a, b| a.unlock_date.cmp(&b.unlock_date));
        locked.truncate(limit as usize);
        Ok(locked)
    }

    fn public_tags(&self) -> Result<Vec<TagList>> {
        Ok(self
            .public_where(|c| !c.tags.is_empty())?
            .into_iter()
            .map(|c| c.tags)
            .collect())
    }

    fn unlock_counts(&self, now: DateTime<Utc>) -> Result<UnlockCounts> {
        let capsules = self.read()?;
        let mut counts = UnlockCounts::default();
        for capsule in capsules.iter().filter(|c| c.is_public) {
            counts.total += 1;
            if capsule.unlock_date <= now {
                counts.unlocked += 1;
            } else {
                counts.locked += 1;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::contract;

    #[test]
    fn test_insert_and_find() {
        contract::insert_and_find(&MemoryRepository::new());
    }

    #[test]
    fn test_delete() {
        contract::delete_removes(&MemoryRepository::new());
    }

    #[test]
    fn test_update_fragment() {
        contract::update_fragment_persists(&MemoryRepository::new());
    }

    #[test]
    fn test_list_filters_and_order() {
        contract::list_filters_and_orders(&MemoryRepository::new());
    }

    #[test]
    fn test_list_pagination() {
        contract::list_paginates(&MemoryRepository::new());
    }

    #[test]
    fn test_unlocked_and_locked_feeds() {
        contract::unlocked_and_locked_feeds(&MemoryRepository::new());
    }

    #[test]
    fn test_public_tags() {
        contract::public_tags_skip_private_and_empty(&MemoryRepository::new());
    }

    #[test]
    fn test_empty_store() {
        contract::empty_store(&MemoryRepository::new());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let repo = MemoryRepository::new();
        let c = contract::capsule(contract::Seed::default());
        repo.insert(&c).unwrap();
        assert!(repo.insert(&c).is_err());
    }
}
