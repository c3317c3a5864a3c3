//! Analysis history on top of a [`KeyValueStore`].
//!
//! Analyses are stored as JSON under `analysis:{uuid}`. They are immutable
//! once saved; the only mutation is deletion by the owner (or an admin).

use crate::models::Analysis;
use crate::provider::domain::normalize_domain;
use crate::session::{Capability, Session};
use crate::store::{KeyValueStore, StoreError};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

const ANALYSIS_PREFIX: &str = "analysis:";

fn analysis_key(id: Uuid) -> String {
    format!("{}{}", ANALYSIS_PREFIX, id)
}

/// Repository of saved analyses.
pub struct AnalysisRepository<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> AnalysisRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn save(&mut self, analysis: &Analysis) -> Result<(), StoreError> {
        if self.store.get(&analysis_key(analysis.id))?.is_some() {
            return Err(StoreError::Forbidden(format!(
                "analysis {} already exists and cannot be modified",
                analysis.id
            )));
        }
        self.store.set_json(&analysis_key(analysis.id), analysis)?;
        info!("Saved analysis {} for {}", analysis.id, analysis.website);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Analysis>, StoreError> {
        self.store.get_json(&analysis_key(id))
    }

    /// Resolve a full id or a unique prefix of one (as shown in listings).
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<Uuid, StoreError> {
        if let Ok(id) = Uuid::parse_str(id_or_prefix) {
            return Ok(id);
        }

        let needle = id_or_prefix.trim().to_lowercase().replace('-', "");
        if needle.is_empty() {
            return Err(StoreError::NotFound("empty id".to_string()));
        }

        let matches: Vec<Uuid> = self
            .store
            .keys(ANALYSIS_PREFIX)?
            .iter()
            .filter_map(|k| Uuid::parse_str(&k[ANALYSIS_PREFIX.len()..]).ok())
            .filter(|id| id.simple().to_string().starts_with(&needle))
            .collect();

        match matches.as_slice() {
            [id] => Ok(*id),
            [] => Err(StoreError::NotFound(format!("analysis {}", id_or_prefix))),
            _ => Err(StoreError::Ambiguous(id_or_prefix.to_string())),
        }
    }

    /// Load every stored analysis. Unreadable entries are skipped.
    fn load_all(&self) -> Result<Vec<Analysis>, StoreError> {
        let mut analyses = Vec::new();

        for key in self.store.keys(ANALYSIS_PREFIX)? {
            match self.store.get_json::<Analysis>(&key) {
                Ok(Some(analysis)) => analyses.push(analysis),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable entry {}: {}", key, e),
            }
        }

        Ok(analyses)
    }

    /// A user's analyses, most recent first, at most `limit`.
    pub fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Analysis>, StoreError> {
        let mut analyses: Vec<Analysis> = self
            .load_all()?
            .into_iter()
            .filter(|a| a.user_id == user_id)
            .collect();

        analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        analyses.truncate(limit);
        Ok(analyses)
    }

    /// Every user's analyses, most recent first. Requires `ViewAllAnalyses`.
    pub fn list_all(&self, session: &Session, limit: usize) -> Result<Vec<Analysis>, StoreError> {
        if !session.can(Capability::ViewAllAnalyses) {
            return Err(StoreError::Forbidden(
                "listing every user's analyses requires admin access".to_string(),
            ));
        }

        let mut analyses = self.load_all()?;
        analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        analyses.truncate(limit);
        Ok(analyses)
    }

    /// The most recent analysis of `website` by `user_id` created strictly
    /// before `before`.
    pub fn previous_for(
        &self,
        user_id: &str,
        website: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<Analysis>, StoreError> {
        let website = normalize_domain(website);

        let previous = self
            .load_all()?
            .into_iter()
            .filter(|a| a.user_id == user_id)
            .filter(|a| normalize_domain(&a.website) == website)
            .filter(|a| a.created_at < before)
            .max_by_key(|a| a.created_at);

        debug!(
            "Previous analysis for {} before {}: {:?}",
            website,
            before,
            previous.as_ref().map(|a| a.id)
        );
        Ok(previous)
    }

    /// Delete an analysis owned by the session's user, or any analysis for
    /// sessions with `DeleteAnyAnalysis`.
    pub fn delete(&mut self, id: Uuid, session: &Session) -> Result<Analysis, StoreError> {
        let analysis = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(format!("analysis {}", id)))?;

        let allowed = if analysis.user_id == session.user_id {
            session.can(Capability::DeleteOwnAnalysis)
        } else {
            session.can(Capability::DeleteAnyAnalysis)
        };
        if !allowed {
            return Err(StoreError::Forbidden(format!(
                "analysis {} belongs to another user",
                id
            )));
        }

        self.store.delete(&analysis_key(id))?;
        info!("Deleted analysis {}", id);
        Ok(analysis)
    }
}
