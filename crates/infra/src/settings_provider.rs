use crate::repos::IReminderSettingsRepo;
use followup_scheduler_domain::{InvalidSettingsError, ReminderKind, ReminderSettings};
use std::{collections::HashMap, sync::Arc, sync::Mutex};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum UpdateSettingsError {
    #[error(transparent)]
    Invalid(#[from] InvalidSettingsError),
    #[error("Unable to store settings: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
struct CachedSettings {
    fetched_at: i64,
    settings: ReminderSettings,
}

/// Supplies the `ReminderSettings` of a kind.
///
/// Settings are read through a short lived cache owned by the provider.
/// Kinds without stored settings get `ReminderSettings::default_for`.
pub struct SettingsProvider {
    repo: Arc<dyn IReminderSettingsRepo>,
    ttl_millis: i64,
    cache: Mutex<HashMap<ReminderKind, CachedSettings>>,
}

impl SettingsProvider {
    pub fn new(repo: Arc<dyn IReminderSettingsRepo>, ttl_millis: i64) -> Self {
        Self {
            repo,
            ttl_millis,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, kind: ReminderKind, now: i64) -> anyhow::Result<ReminderSettings> {
        if let Some(cached) = self.cached(kind, now) {
            return Ok(cached);
        }

        let settings = match self.repo.find(kind).await? {
            Some(settings) => settings,
            None => {
                debug!("No settings stored for kind: {}, using defaults", kind);
                ReminderSettings::default_for(kind)
            }
        };
        self.cache.lock().unwrap().insert(
            kind,
            CachedSettings {
                fetched_at: now,
                settings: settings.clone(),
            },
        );

        Ok(settings)
    }

    /// Validates and stores new settings for a kind. The next `get` reads them
    /// from the store.
    pub async fn update(
        &self,
        kind: ReminderKind,
        settings: &ReminderSettings,
        now: i64,
    ) -> Result<(), UpdateSettingsError> {
        settings.validate()?;
        self.repo.save(kind, settings, now).await?;
        self.invalidate(kind);
        Ok(())
    }

    pub fn invalidate(&self, kind: ReminderKind) {
        self.cache.lock().unwrap().remove(&kind);
    }

    fn cached(&self, kind: ReminderKind, now: i64) -> Option<ReminderSettings> {
        let cache = self.cache.lock().unwrap();
        cache
            .get(&kind)
            .filter(|cached| now - cached.fetched_at < self.ttl_millis)
            .map(|cached| cached.settings.clone())
    }
}
