//! Webhook event ingestion
//!
//! Maps each upstream event to a pipeline id plus a plan of step actions,
//! then executes the plan on a detached task. The webhook response never
//! waits on pipeline work: advancement is decoupled from acknowledging
//! receipt, and step failures are logged and recovered by redelivery.

use medley_core::domain::media::MediaKind;
use medley_core::domain::pipeline::StepKey;
use medley_core::dto::ombi::{NEW_REQUEST_NOTIFICATION, OmbiWebhookData};
use medley_core::dto::radarr::RadarrWebhookData;
use medley_core::dto::sonarr::SonarrWebhookData;
use serde_json::json;
use std::sync::Arc;

use crate::engine::{EngineError, PipelineEngine};
use crate::steps::media_request::OMBI_NAMESPACE;

/// Sonarr's event name for a newly added series. The Radarr-shaped
/// `MovieAdded` spelling is also accepted on the Sonarr hook; deployments in
/// the wild have delivered both.
pub const SERIES_ADD_EVENT: &str = "SeriesAdd";
pub const MOVIE_ADDED_EVENT: &str = "MovieAdded";
/// A release was grabbed and handed to the download client.
pub const GRAB_EVENT: &str = "Grab";
/// The finished download was imported; despite the name this is the
/// end-of-download event, not the start.
pub const DOWNLOAD_EVENT: &str = "Download";

/// One planned pipeline mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Run(StepKey),
    Skip(StepKey),
}

/// Plan for an Ombi notification.
pub fn ombi_actions(data: &OmbiWebhookData) -> Vec<StepAction> {
    match data.notification_type.as_str() {
        NEW_REQUEST_NOTIFICATION => vec![StepAction::Run(StepKey::Requested)],
        _ => Vec::new(),
    }
}

/// Plan for a Sonarr lifecycle event. Ingestion by Sonarr retires the Radarr
/// alternate.
pub fn sonarr_actions(event_type: &str) -> Vec<StepAction> {
    match event_type {
        SERIES_ADD_EVENT | MOVIE_ADDED_EVENT => vec![
            StepAction::Skip(StepKey::IngestedByRadarr),
            StepAction::Run(StepKey::IngestedBySonarr),
        ],
        GRAB_EVENT => vec![StepAction::Run(StepKey::Downloading)],
        DOWNLOAD_EVENT => vec![
            StepAction::Run(StepKey::Downloaded),
            StepAction::Run(StepKey::Imported),
        ],
        _ => Vec::new(),
    }
}

/// Plan for a Radarr lifecycle event. Mirror image of [`sonarr_actions`].
pub fn radarr_actions(event_type: &str) -> Vec<StepAction> {
    match event_type {
        MOVIE_ADDED_EVENT => vec![
            StepAction::Skip(StepKey::IngestedBySonarr),
            StepAction::Run(StepKey::IngestedByRadarr),
        ],
        GRAB_EVENT => vec![StepAction::Run(StepKey::Downloading)],
        DOWNLOAD_EVENT => vec![
            StepAction::Run(StepKey::Downloaded),
            StepAction::Run(StepKey::Imported),
        ],
        _ => Vec::new(),
    }
}

/// Handle an Ombi notification: get-or-create the pipeline, attach the
/// request context to the `ombi` namespace, then fire the plan.
pub async fn ingest_ombi(
    engine: Arc<PipelineEngine>,
    data: OmbiWebhookData,
) -> Result<(), EngineError> {
    let kind: MediaKind = match data.media_type.parse() {
        Ok(kind) => kind,
        Err(err) => {
            tracing::warn!(title = %data.title, %err, "ignoring ombi event");
            return Ok(());
        }
    };

    let actions = ombi_actions(&data);
    let pipeline = engine.get_or_create(kind, &data.title).await?;
    engine
        .add_metadata(
            &pipeline.id,
            OMBI_NAMESPACE,
            json!({
                "requestID": data.request_id,
                "userName": data.user_name,
                "alias": data.alias,
                "mediaType": data.media_type,
                "title": data.title,
                "requestedDate": data.requested_date,
            }),
        )
        .await?;

    dispatch(engine, pipeline.id, actions);
    Ok(())
}

/// Handle a Sonarr lifecycle event.
pub async fn ingest_sonarr(
    engine: Arc<PipelineEngine>,
    data: SonarrWebhookData,
) -> Result<(), EngineError> {
    if data.series.title.is_empty() {
        tracing::warn!(event_type = %data.event_type, "sonarr event without a series title, ignoring");
        return Ok(());
    }

    let actions = sonarr_actions(&data.event_type);
    if actions.is_empty() {
        tracing::debug!(event_type = %data.event_type, "no pipeline work for sonarr event");
        return Ok(());
    }

    let pipeline = engine.get_or_create(MediaKind::Tv, &data.series.title).await?;
    dispatch(engine, pipeline.id, actions);
    Ok(())
}

/// Handle a Radarr lifecycle event.
pub async fn ingest_radarr(
    engine: Arc<PipelineEngine>,
    data: RadarrWebhookData,
) -> Result<(), EngineError> {
    if data.movie.title.is_empty() {
        tracing::warn!(event_type = %data.event_type, "radarr event without a movie title, ignoring");
        return Ok(());
    }

    let actions = radarr_actions(&data.event_type);
    if actions.is_empty() {
        tracing::debug!(event_type = %data.event_type, "no pipeline work for radarr event");
        return Ok(());
    }

    let pipeline = engine.get_or_create(MediaKind::Movie, &data.movie.title).await?;
    dispatch(engine, pipeline.id, actions);
    Ok(())
}

/// Run the plan on a detached task. Actions execute in order; a failed
/// action is logged and the rest still run (a skip landing after a failed
/// run is exactly the alternate-path case).
fn dispatch(engine: Arc<PipelineEngine>, id: String, actions: Vec<StepAction>) {
    if actions.is_empty() {
        return;
    }

    tokio::spawn(async move {
        for action in actions {
            let result = match action {
                StepAction::Run(key) => engine.run_step(&id, key).await,
                StepAction::Skip(key) => engine.mark_step_skipped(&id, key).await,
            };
            if let Err(err) = result {
                tracing::error!(pipeline = %id, ?action, %err, "pipeline action failed");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ombi_new_request_runs_the_requested_step() {
        let data = OmbiWebhookData {
            notification_type: NEW_REQUEST_NOTIFICATION.into(),
            ..OmbiWebhookData::default()
        };
        assert_eq!(ombi_actions(&data), vec![StepAction::Run(StepKey::Requested)]);
    }

    #[test]
    fn ombi_other_notifications_do_nothing() {
        let data = OmbiWebhookData {
            notification_type: "RequestDeclined".into(),
            ..OmbiWebhookData::default()
        };
        assert!(ombi_actions(&data).is_empty());
    }

    #[test]
    fn sonarr_ingestion_retires_the_radarr_alternate() {
        for event in [SERIES_ADD_EVENT, MOVIE_ADDED_EVENT] {
            assert_eq!(
                sonarr_actions(event),
                vec![
                    StepAction::Skip(StepKey::IngestedByRadarr),
                    StepAction::Run(StepKey::IngestedBySonarr),
                ]
            );
        }
    }

    #[test]
    fn radarr_ingestion_retires_the_sonarr_alternate() {
        assert_eq!(
            radarr_actions(MOVIE_ADDED_EVENT),
            vec![
                StepAction::Skip(StepKey::IngestedBySonarr),
                StepAction::Run(StepKey::IngestedByRadarr),
            ]
        );
    }

    #[test]
    fn download_lifecycle_maps_to_progress_steps() {
        assert_eq!(
            sonarr_actions(GRAB_EVENT),
            vec![StepAction::Run(StepKey::Downloading)]
        );
        assert_eq!(
            radarr_actions(DOWNLOAD_EVENT),
            vec![
                StepAction::Run(StepKey::Downloaded),
                StepAction::Run(StepKey::Imported),
            ]
        );
    }

    #[test]
    fn unknown_events_map_to_nothing() {
        assert!(sonarr_actions("Rename").is_empty());
        assert!(radarr_actions("ApplicationUpdate").is_empty());
    }
}
