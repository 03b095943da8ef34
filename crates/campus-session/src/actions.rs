//! Guarded CRUD over notices, campus events and jobs.
//!
//! Every method follows the same shape: capture the actor, establish the
//! ownership fact (loading the target when one exists), authorize, then
//! write. A deny returns before the store is touched for writing.

use campus_authz::authorize;
use campus_store::{
    CampusEvent, CreateCampusEventParams, CreateJobParams, CreateNoticeParams, Job, Notice,
    UpdateJobParams, UpdateNoticeParams, User,
};
use campus_types::{Action, ActionError, ChatEvent, ResourceKind};

use crate::run_blocking;
use crate::session::Session;

fn require_text(field: &str, value: &str) -> Result<(), ActionError> {
    if value.trim().is_empty() {
        return Err(ActionError::InvalidInput(format!("{field} is required")));
    }
    Ok(())
}

impl Session {
    // ── notices ─────────────────────────────────────────────────────

    pub async fn list_notices(&self) -> Result<Vec<Notice>, ActionError> {
        let actor = self.identity().require()?;
        authorize(&actor, Action::Read, ResourceKind::Notice, false)?;
        let store = self.store().clone();
        run_blocking(move || Ok(store.list_notices()?)).await
    }

    pub async fn create_notice(&self, params: CreateNoticeParams) -> Result<Notice, ActionError> {
        let actor = self.identity().require()?;
        authorize(&actor, Action::Create, ResourceKind::Notice, false)?;
        require_text("title", &params.title)?;

        let store = self.store().clone();
        let notice = run_blocking(move || Ok(store.create_notice(&actor.id, &params)?)).await?;
        tracing::info!(notice_id = %notice.id, author_id = %notice.author_id, "notice created");
        Ok(notice)
    }

    pub async fn update_notice(
        &self,
        notice_id: &str,
        updates: UpdateNoticeParams,
    ) -> Result<Notice, ActionError> {
        let actor = self.identity().require()?;
        if let Some(title) = &updates.title {
            require_text("title", title)?;
        }
        let store = self.store().clone();
        let notice_id = notice_id.to_string();

        run_blocking(move || {
            let existing = store.get_notice(&notice_id)?;
            authorize(
                &actor,
                Action::Update,
                ResourceKind::Notice,
                actor.owns(&existing.author_id),
            )?;
            Ok(store.update_notice(&notice_id, &updates)?)
        })
        .await
    }

    pub async fn delete_notice(&self, notice_id: &str) -> Result<(), ActionError> {
        let actor = self.identity().require()?;
        let store = self.store().clone();
        let notice_id = notice_id.to_string();

        run_blocking(move || {
            let existing = store.get_notice(&notice_id)?;
            authorize(
                &actor,
                Action::Delete,
                ResourceKind::Notice,
                actor.owns(&existing.author_id),
            )?;
            store.delete_notice(&notice_id)?;
            tracing::info!(notice_id = %notice_id, actor_id = %actor.id, "notice deleted");
            Ok(())
        })
        .await
    }

    // ── campus events ───────────────────────────────────────────────

    pub async fn list_events(&self) -> Result<Vec<CampusEvent>, ActionError> {
        let actor = self.identity().require()?;
        authorize(&actor, Action::Read, ResourceKind::Event, false)?;
        let store = self.store().clone();
        run_blocking(move || Ok(store.list_campus_events()?)).await
    }

    pub async fn create_event(
        &self,
        params: CreateCampusEventParams,
    ) -> Result<CampusEvent, ActionError> {
        let actor = self.identity().require()?;
        authorize(&actor, Action::Create, ResourceKind::Event, false)?;
        require_text("title", &params.title)?;
        require_text("startDate", &params.start_date)?;
        require_text("endDate", &params.end_date)?;
        // ISO 8601 dates order lexically.
        if params.end_date < params.start_date {
            return Err(ActionError::InvalidInput(
                "endDate is before startDate".to_string(),
            ));
        }

        let store = self.store().clone();
        let event = run_blocking(move || Ok(store.create_campus_event(&actor.id, &params)?)).await?;
        tracing::info!(event_id = %event.id, author_id = %event.author_id, "campus event created");
        Ok(event)
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<(), ActionError> {
        let actor = self.identity().require()?;
        let store = self.store().clone();
        let event_id = event_id.to_string();

        run_blocking(move || {
            let existing = store.get_campus_event(&event_id)?;
            authorize(
                &actor,
                Action::Delete,
                ResourceKind::Event,
                actor.owns(&existing.author_id),
            )?;
            store.delete_campus_event(&event_id)?;
            tracing::info!(event_id = %event_id, actor_id = %actor.id, "campus event deleted");
            Ok(())
        })
        .await
    }

    /// Adds the bound actor to an event's participants. Joining twice is a
    /// no-op.
    pub async fn participate(&self, event_id: &str) -> Result<CampusEvent, ActionError> {
        let actor = self.identity().require()?;
        let store = self.store().clone();
        let event_id = event_id.to_string();

        run_blocking(move || {
            let existing = store.get_campus_event(&event_id)?;
            authorize(
                &actor,
                Action::Participate,
                ResourceKind::Event,
                actor.owns(&existing.author_id),
            )?;
            Ok(store.add_participant(&event_id, &actor.id)?)
        })
        .await
    }

    // ── jobs ────────────────────────────────────────────────────────

    pub async fn list_jobs(&self) -> Result<Vec<Job>, ActionError> {
        let actor = self.identity().require()?;
        authorize(&actor, Action::Read, ResourceKind::Job, false)?;
        let store = self.store().clone();
        run_blocking(move || Ok(store.list_jobs()?)).await
    }

    pub async fn create_job(&self, params: CreateJobParams) -> Result<Job, ActionError> {
        let actor = self.identity().require()?;
        authorize(&actor, Action::Create, ResourceKind::Job, false)?;
        require_text("title", &params.title)?;
        require_text("company", &params.company)?;

        let store = self.store().clone();
        let job = run_blocking(move || Ok(store.create_job(&actor.id, &params)?)).await?;
        tracing::info!(job_id = %job.id, author_id = %job.author_id, "job posted");
        Ok(job)
    }

    pub async fn update_job(&self, job_id: &str, updates: UpdateJobParams) -> Result<Job, ActionError> {
        let actor = self.identity().require()?;
        let store = self.store().clone();
        let job_id = job_id.to_string();

        run_blocking(move || {
            let existing = store.get_job(&job_id)?;
            authorize(
                &actor,
                Action::Update,
                ResourceKind::Job,
                actor.owns(&existing.author_id),
            )?;
            Ok(store.update_job(&job_id, &updates)?)
        })
        .await
    }

    pub async fn delete_job(&self, job_id: &str) -> Result<(), ActionError> {
        let actor = self.identity().require()?;
        let store = self.store().clone();
        let job_id = job_id.to_string();

        run_blocking(move || {
            let existing = store.get_job(&job_id)?;
            authorize(
                &actor,
                Action::Delete,
                ResourceKind::Job,
                actor.owns(&existing.author_id),
            )?;
            store.delete_job(&job_id)?;
            tracing::info!(job_id = %job_id, actor_id = %actor.id, "job deleted");
            Ok(())
        })
        .await
    }

    // ── members & conversations ─────────────────────────────────────

    pub async fn list_members(&self) -> Result<Vec<User>, ActionError> {
        let actor = self.identity().require()?;
        authorize(&actor, Action::Read, ResourceKind::User, false)?;
        let store = self.store().clone();
        run_blocking(move || Ok(store.list_users(None)?)).await
    }

    /// Edits the bound actor's own name and avatar. Role is not editable.
    pub async fn update_own_profile(
        &self,
        name: Option<String>,
        avatar: Option<String>,
    ) -> Result<User, ActionError> {
        let actor = self.identity().require()?;
        if let Some(name) = &name {
            require_text("name", name)?;
        }
        let store = self.store().clone();
        run_blocking(move || {
            Ok(store.update_profile(&actor.id, name.as_deref(), avatar.as_deref())?)
        })
        .await
    }

    /// Direct messages between the bound actor and `other_id`, oldest first.
    pub async fn conversation(&self, other_id: &str) -> Result<Vec<ChatEvent>, ActionError> {
        let actor = self.identity().require()?;
        authorize(&actor, Action::Read, ResourceKind::Message, false)?;
        let store = self.store().clone();
        let other_id = other_id.to_string();
        run_blocking(move || Ok(store.list_conversation(&actor.id, &other_id)?)).await
    }
}
