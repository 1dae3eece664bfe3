//! Media-request step handlers
//!
//! The six-step progression every media request flows through:
//! Requested -> Ingested by Sonarr / Ingested by Radarr (mutually exclusive
//! alternates) -> Downloading -> Downloaded -> Imported.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use medley_core::domain::pipeline::{
    MEDIA_REQUEST_PIPELINE_NAME, Pipeline, StepKey,
};
use serde_json::{Value, json};
use std::sync::Arc;

use super::Notifier;
use crate::clients::OmbiClient;
use crate::clients::ombi::{discord_value, find_user};
use crate::directory::{ServiceDirectory, ServiceName};
use crate::registry::{StepHandler, StepRegistry};

/// Metadata namespace holding the contact handle(s) used to acknowledge the
/// requester once their title is available.
pub const ACKNOWLEDGE_WITH: &str = "acknowledgeWith";

/// Namespace owned by the Ombi adapter.
pub const OMBI_NAMESPACE: &str = "ombi";

/// Build the media-request registry. Declaration order is the canonical
/// happy-path progression.
pub fn registry(
    directory: Arc<dyn ServiceDirectory>,
    notifier: Arc<dyn Notifier>,
) -> StepRegistry {
    StepRegistry::new(MEDIA_REQUEST_PIPELINE_NAME)
        .with_step(
            "User Requested",
            StepKey::Requested,
            Arc::new(Requested { directory }),
        )
        .with_step(
            "Request Ingested by Sonarr",
            StepKey::IngestedBySonarr,
            Arc::new(Ingested { indexer: "sonarr" }),
        )
        .with_step(
            "Request Ingested by Radarr",
            StepKey::IngestedByRadarr,
            Arc::new(Ingested { indexer: "radarr" }),
        )
        .with_step(
            "Request Downloading",
            StepKey::Downloading,
            Arc::new(Progress { stage: "downloading" }),
        )
        .with_step(
            "Request Downloaded",
            StepKey::Downloaded,
            Arc::new(Progress { stage: "downloaded" }),
        )
        .with_step(
            "Request Imported",
            StepKey::Imported,
            Arc::new(Imported { notifier }),
        )
}

/// Cross-system identity join: from the Ombi username that filed the request
/// to the Discord handle we will notify later. An unresolvable identity
/// fails the step rather than proceeding without a notification target.
struct Requested {
    directory: Arc<dyn ServiceDirectory>,
}

#[async_trait]
impl StepHandler for Requested {
    async fn run(&self, pipeline: &mut Pipeline) -> anyhow::Result<()> {
        let ombi_meta = pipeline
            .metadata(OMBI_NAMESPACE)
            .cloned()
            .ok_or_else(|| anyhow!("metadata does not have an ombi namespace"))?;
        let user_name = ombi_meta
            .get("userName")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("ombi metadata does not carry a userName"))?
            .to_string();

        let service = self
            .directory
            .find(ServiceName::Ombi)
            .await?
            .ok_or_else(|| anyhow!("ombi service is not configured"))?;
        let client = OmbiClient::new(&service);

        let users = client.users().await.context("listing ombi users")?;
        let user = find_user(&users, &user_name)
            .ok_or_else(|| anyhow!("no ombi user named {user_name:?}"))?
            .clone();

        let prefs = client
            .notification_preferences(&user.id)
            .await
            .context("fetching notification preferences")?;
        let discord_id = discord_value(&prefs, &user.id)
            .ok_or_else(|| anyhow!("could not find a Discord id for user {user_name:?}"))?;

        pipeline.insert_metadata(
            ACKNOWLEDGE_WITH,
            json!({ "discord": [{ "id": discord_id }] }),
        );

        // Extend the adapter's namespace with what the directory knows.
        let mut enriched = ombi_meta;
        if let Value::Object(map) = &mut enriched {
            map.insert("userID".into(), json!(user.id));
            map.insert("alias".into(), json!(user.alias));
            map.insert("emailAddress".into(), json!(user.email_address));
        }
        pipeline.insert_metadata(OMBI_NAMESPACE, enriched);

        Ok(())
    }
}

/// One of the competing indexers claimed the request. The exclusion of the
/// other path is the adapter's job (it retires the loser); the step itself
/// only records the claim.
struct Ingested {
    indexer: &'static str,
}

#[async_trait]
impl StepHandler for Ingested {
    async fn run(&self, pipeline: &mut Pipeline) -> anyhow::Result<()> {
        tracing::info!(
            pipeline = %pipeline.id,
            indexer = self.indexer,
            "request ingested by indexer"
        );
        Ok(())
    }
}

/// Download progress marker.
struct Progress {
    stage: &'static str,
}

#[async_trait]
impl StepHandler for Progress {
    async fn run(&self, pipeline: &mut Pipeline) -> anyhow::Result<()> {
        tracing::info!(pipeline = %pipeline.id, stage = self.stage, "request progressed");
        Ok(())
    }
}

/// The title reached the library: tell the requester, if we know who to
/// tell. Requests that predate the tracker have no acknowledge target and
/// complete quietly; a failed send fails the step and is retried on the next
/// delivery.
struct Imported {
    notifier: Arc<dyn Notifier>,
}

#[async_trait]
impl StepHandler for Imported {
    async fn run(&self, pipeline: &mut Pipeline) -> anyhow::Result<()> {
        let Some(discord_id) = acknowledge_target(pipeline) else {
            tracing::debug!(pipeline = %pipeline.id, "no acknowledge target, skipping notification");
            return Ok(());
        };

        let message = match requested_title(pipeline) {
            Some(title) => format!("Your request \"{title}\" is now available."),
            None => "Your media request is now available.".to_string(),
        };

        self.notifier
            .notify(&discord_id, &message)
            .await
            .context("notifying requester on discord")?;

        tracing::info!(pipeline = %pipeline.id, "notified requester of import");
        Ok(())
    }
}

fn acknowledge_target(pipeline: &Pipeline) -> Option<String> {
    pipeline
        .metadata(ACKNOWLEDGE_WITH)?
        .get("discord")?
        .get(0)?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

fn requested_title(pipeline: &Pipeline) -> Option<String> {
    pipeline
        .metadata(OMBI_NAMESPACE)?
        .get("title")?
        .as_str()
        .map(str::to_string)
}
