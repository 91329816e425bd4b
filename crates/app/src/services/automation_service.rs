//! Automation service — use-cases for managing automations.

use mailflow_domain::automation::{Automation, AutomationStatus};
use mailflow_domain::error::{ConflictError, MailflowError, NotFoundError};
use mailflow_domain::id::AutomationId;
use mailflow_domain::seed::default_automations;
use mailflow_domain::time::now;

use crate::ports::AutomationRepository;

/// Result of [`AutomationService::seed_defaults`].
#[derive(Debug, Clone)]
pub struct SeedOutcome {
    /// Number of catalogue entries that were missing and got created.
    pub created: usize,
    /// Every automation after seeding.
    pub automations: Vec<Automation>,
}

/// Application service for automation CRUD operations.
pub struct AutomationService<R> {
    repo: R,
}

impl<R: AutomationRepository> AutomationService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Create a new automation after validating domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, automation), fields(automation_name = %automation.name))]
    pub async fn create_automation(
        &self,
        automation: Automation,
    ) -> Result<Automation, MailflowError> {
        automation.validate()?;
        self.repo.create(automation).await
    }

    /// Look up an automation by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] when no automation with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_automation(&self, id: AutomationId) -> Result<Automation, MailflowError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all automations.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_automations(&self) -> Result<Vec<Automation>, MailflowError> {
        self.repo.get_all().await
    }

    /// Replace an existing automation.
    ///
    /// `is_system` and `created_at` are kept from the stored record. When the
    /// result no longer accepts enrollments, its scheduled items are cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] for an unknown id,
    /// [`MailflowError::Validation`] if invariants fail, or a storage error
    /// from the repository.
    #[tracing::instrument(skip(self, automation), fields(automation_id = %automation.id))]
    pub async fn update_automation(
        &self,
        mut automation: Automation,
    ) -> Result<Automation, MailflowError> {
        let existing = self.get_automation(automation.id).await?;
        automation.is_system = existing.is_system;
        automation.created_at = existing.created_at;
        automation.validate()?;
        self.save(automation).await
    }

    /// Pause or resume an automation.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] for an unknown id, or a storage
    /// error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: AutomationId,
        status: AutomationStatus,
    ) -> Result<Automation, MailflowError> {
        let mut automation = self.get_automation(id).await?;
        automation.status = status;
        self.save(automation).await
    }

    /// Enable or disable an automation.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] for an unknown id, or a storage
    /// error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn set_enabled(
        &self,
        id: AutomationId,
        enabled: bool,
    ) -> Result<Automation, MailflowError> {
        let mut automation = self.get_automation(id).await?;
        automation.enabled = enabled;
        self.save(automation).await
    }

    /// Delete an automation and cancel its scheduled items.
    ///
    /// Returns the number of cancelled items.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] for an unknown id,
    /// [`MailflowError::Conflict`] for a system automation, or a storage
    /// error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_automation(&self, id: AutomationId) -> Result<u64, MailflowError> {
        let automation = self.get_automation(id).await?;
        if automation.is_system {
            return Err(ConflictError::SystemAutomation { id: id.to_string() }.into());
        }
        let cancelled = self.repo.delete(id).await?;
        tracing::info!(cancelled, "automation deleted");
        Ok(cancelled)
    }

    /// Create the built-in automations that do not exist yet.
    ///
    /// Catalogue entries are matched by name among system automations.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn seed_defaults(&self) -> Result<SeedOutcome, MailflowError> {
        let existing = self.repo.get_all().await?;
        let mut created = 0;
        for automation in default_automations(now())? {
            let present = existing
                .iter()
                .any(|a| a.is_system && a.name == automation.name);
            if !present {
                self.repo.create(automation).await?;
                created += 1;
            }
        }
        tracing::info!(created, "default automations seeded");
        Ok(SeedOutcome {
            created,
            automations: self.repo.get_all().await?,
        })
    }

    async fn save(&self, mut automation: Automation) -> Result<Automation, MailflowError> {
        automation.updated_at = now();
        let cancel_scheduled = !automation.is_accepting();
        let cancelled = self.repo.update(automation.clone(), cancel_scheduled).await?;
        if cancelled > 0 {
            tracing::info!(automation_id = %automation.id, cancelled, "scheduled items cancelled");
        }
        Ok(automation)
    }
}
