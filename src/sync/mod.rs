//! Reconciliation of the local course tree against a VLE snapshot.
//!
//! A single [`reconcile`] walks one level of the hierarchy. What differs
//! between master courses, scheduled courses and groups lives behind
//! [`SyncLevel`]; a level with children recurses from
//! [`SyncLevel::reconcile_children`].

pub mod levels;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Connection, SqliteConnection};
use tracing::debug;

use crate::db::repository::{ChildKey, Resolution};

pub use levels::{GroupLevel, MasterCourseLevel, ScheduledCourseLevel};

/// Counters for one level of the tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelStats {
    pub created: usize,
    pub updated: usize,
    pub renamed: usize,
    pub deleted: usize,
}

impl LevelStats {
    fn record(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Found => self.updated += 1,
            Resolution::Renamed => self.renamed += 1,
            Resolution::Created => self.created += 1,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub master_courses: LevelStats,
    pub scheduled_courses: LevelStats,
    pub groups: LevelStats,
}

/// One level of the course tree.
#[async_trait]
pub trait SyncLevel: Send + Sync {
    /// Incoming snapshot item.
    type Item: Send + Sync;
    /// Parent the children hang off; `()` at the root.
    type Scope: Send + Sync;
    /// Persisted row.
    type Entity: Send + Sync;

    const NAME: &'static str;

    fn external_id<'a>(&self, item: &'a Self::Item) -> &'a str;

    fn display_name<'a>(&self, item: &'a Self::Item) -> &'a str;

    /// Must equal [`ChildKey::signature`] of a sibling for `item` to be taken
    /// as its rename.
    fn signature(&self, _item: &Self::Item) -> String {
        String::new()
    }

    fn stats<'a>(&self, stats: &'a mut SyncStats) -> &'a mut LevelStats;

    /// Children of `scope` as they are before this level is touched.
    async fn existing(
        &self,
        conn: &mut SqliteConnection,
        scope: &Self::Scope,
    ) -> Result<Vec<ChildKey>, sqlx::Error>;

    async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        scope: &Self::Scope,
        external_id: &str,
        rename_from: Option<&str>,
    ) -> Result<(Self::Entity, Resolution), sqlx::Error>;

    /// Overwrites every scalar attribute of `entity` from `item`.
    fn apply(&self, entity: &mut Self::Entity, item: &Self::Item);

    async fn save(&self, conn: &mut SqliteConnection, entity: &Self::Entity) -> Result<(), sqlx::Error>;

    /// Recurses into the next level when `item` carries a nested list.
    async fn reconcile_children(
        &self,
        _conn: &mut SqliteConnection,
        _entity: &Self::Entity,
        _item: &Self::Item,
        _stats: &mut SyncStats,
    ) -> Result<(), sqlx::Error> {
        Ok(())
    }

    /// Deletes the named children of `scope` along with their subtrees.
    async fn delete(
        &self,
        conn: &mut SqliteConnection,
        scope: &Self::Scope,
        external_ids: &[String],
    ) -> Result<u64, sqlx::Error>;
}

/// Reconciles the children of `scope` with `items`.
///
/// Each item, together with everything beneath it, is written in its own
/// transaction (a savepoint when already inside one). Children of `scope`
/// that no item claimed are deleted at the end in one statement.
pub async fn reconcile<L: SyncLevel>(
    level: &L,
    conn: &mut SqliteConnection,
    scope: &L::Scope,
    items: &[L::Item],
    stats: &mut SyncStats,
) -> Result<(), sqlx::Error> {
    let existing = level.existing(conn, scope).await?;
    let mut orphans: HashSet<String> = existing.iter().map(|c| c.external_id.clone()).collect();
    let incoming: HashSet<&str> = items.iter().map(|item| level.external_id(item)).collect();

    for item in items {
        let external_id = level.external_id(item);
        let rename_from = if orphans.contains(external_id) {
            None
        } else {
            rename_candidate(
                &existing,
                &orphans,
                &incoming,
                level.display_name(item),
                &level.signature(item),
            )
        };

        let mut tx = conn.begin().await?;

        let (mut entity, resolution) = level
            .resolve(&mut *tx, scope, external_id, rename_from.as_deref())
            .await?;
        level.apply(&mut entity, item);
        level.save(&mut *tx, &entity).await?;
        level.reconcile_children(&mut *tx, &entity, item, stats).await?;

        tx.commit().await?;

        if resolution != Resolution::Found {
            debug!(
                "{} {} {:?}{}",
                L::NAME,
                external_id,
                resolution,
                rename_from
                    .as_deref()
                    .map(|old| format!(" from {}", old))
                    .unwrap_or_default()
            );
        }
        level.stats(stats).record(resolution);

        orphans.remove(external_id);
        if resolution == Resolution::Renamed {
            if let Some(old) = &rename_from {
                orphans.remove(old);
            }
        }
    }

    if !orphans.is_empty() {
        let mut doomed: Vec<String> = orphans.into_iter().collect();
        doomed.sort();
        debug!("deleting orphan {} {:?}", L::NAME, doomed);
        let deleted = level.delete(conn, scope, &doomed).await?;
        level.stats(stats).deleted += deleted as usize;
    }

    Ok(())
}

/// The unclaimed sibling an unknown id was most likely renamed from.
///
/// It must be unclaimed so far, absent from the incoming level, carry the
/// same non-empty display name and the same signature. Anything other than
/// exactly one match is no rename.
fn rename_candidate(
    existing: &[ChildKey],
    orphans: &HashSet<String>,
    incoming: &HashSet<&str>,
    display_name: &str,
    signature: &str,
) -> Option<String> {
    if display_name.is_empty() {
        return None;
    }

    let mut candidates = existing.iter().filter(|child| {
        child.display_name == display_name
            && child.signature == signature
            && orphans.contains(&child.external_id)
            && !incoming.contains(child.external_id.as_str())
    });

    match (candidates.next(), candidates.next()) {
        (Some(only), None) => Some(only.external_id.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(external_id: &str, display_name: &str) -> ChildKey {
        ChildKey {
            external_id: external_id.to_string(),
            display_name: display_name.to_string(),
            signature: String::new(),
        }
    }

    #[test]
    fn test_rename_candidate_requires_unique_match() {
        let existing = vec![key("A", "Intro"), key("B", "Intro"), key("C", "Advanced")];
        let orphans: HashSet<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let incoming: HashSet<&str> = ["D"].into_iter().collect();

        assert_eq!(rename_candidate(&existing, &orphans, &incoming, "Advanced", ""), Some("C".to_string()));
        assert_eq!(rename_candidate(&existing, &orphans, &incoming, "Intro", ""), None);
        assert_eq!(rename_candidate(&existing, &orphans, &incoming, "Missing", ""), None);
        assert_eq!(rename_candidate(&existing, &orphans, &incoming, "", ""), None);
    }

    #[test]
    fn test_rename_candidate_requires_same_signature() {
        let mut spring = key("001/2025", "Bonfires");
        spring.signature = "|2025-02-01||".to_string();
        let existing = vec![spring];
        let orphans: HashSet<String> = ["001/2025"].iter().map(|s| s.to_string()).collect();
        let incoming: HashSet<&str> = ["001/2026"].into_iter().collect();

        assert_eq!(rename_candidate(&existing, &orphans, &incoming, "Bonfires", "|2026-02-01||"), None);
        assert_eq!(
            rename_candidate(&existing, &orphans, &incoming, "Bonfires", "|2025-02-01||"),
            Some("001/2025".to_string())
        );
    }

    #[test]
    fn test_rename_candidate_skips_claimed_ids() {
        let existing = vec![key("A", "Intro"), key("B", "Intro")];
        let orphans: HashSet<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();

        // B is still coming in under its own id, so only A is free.
        let incoming: HashSet<&str> = ["B", "C"].into_iter().collect();
        assert_eq!(rename_candidate(&existing, &orphans, &incoming, "Intro", ""), Some("A".to_string()));

        // A was already claimed by an earlier rename.
        let orphans: HashSet<String> = ["B"].iter().map(|s| s.to_string()).collect();
        let incoming: HashSet<&str> = ["C"].into_iter().collect();
        assert_eq!(rename_candidate(&existing, &orphans, &incoming, "Intro", ""), Some("B".to_string()));
    }
}
