//! Post-incident review layout.
//!
//! ```text
//! <root parent>/
//!   Post Incident Review/      must exist
//!     TEMPLATE                 must exist
//!     <team>/                  created when missing
//!       TEMPLATE               copied from the base template when missing
//!       <incident>             copied from the team template when missing
//! ```

use serde::Serialize;

use pirkit_common::{Error, Result, ResourceId};

use crate::api::DriveApi;
use crate::materializer::{Materializer, Resolved};
use crate::resolver::Resolver;
use crate::settings::LayoutSettings;

/// Every resource touched while preparing an incident document.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentDocument {
    pub review_folder_id: ResourceId,
    pub base_template_id: ResourceId,
    pub team_folder_id: ResourceId,
    pub team_folder_created: bool,
    pub team_template_id: ResourceId,
    pub team_template_created: bool,
    pub document_id: ResourceId,
    pub document_created: bool,
    /// Browser link of the incident document.
    pub link: Option<String>,
}

/// Ensure the incident document for `team` exists and return it.
///
/// # Errors
/// - Review folder or base template missing or ambiguous
/// - Team folder, team template or incident document ambiguous
/// - Any API failure along the way
pub async fn prepare_incident_document(
    api: &dyn DriveApi,
    layout: &LayoutSettings,
    root_parent: &ResourceId,
    team: &str,
    incident: &str,
) -> Result<IncidentDocument> {
    if team.trim().is_empty() {
        return Err(Error::InvalidInput("Team name cannot be empty".to_string()));
    }
    if incident.trim().is_empty() {
        return Err(Error::InvalidInput("Incident name cannot be empty".to_string()));
    }

    let resolver = Resolver::new(api);
    let materializer = Materializer::new(api);

    let review_folder_id = resolver
        .find_folder(root_parent, &layout.root_folder)
        .await?;
    let base_template_id = resolver
        .find_document(&review_folder_id, &layout.template_name)
        .await?;
    tracing::debug!(folder = %review_folder_id, template = %base_template_id, "Found review folder");

    let Resolved {
        id: team_folder_id,
        created: team_folder_created,
    } = materializer
        .get_or_create_folder(&review_folder_id, team)
        .await?;

    let Resolved {
        id: team_template_id,
        created: team_template_created,
    } = materializer
        .get_or_copy_document(&team_folder_id, &layout.template_name, &base_template_id)
        .await?;

    let Resolved {
        id: document_id,
        created: document_created,
    } = materializer
        .get_or_copy_document(&team_folder_id, incident, &team_template_id)
        .await?;

    let link = api.get_file(&document_id).await?.web_view_link;

    tracing::info!(
        team = %team,
        document = %document_id,
        created = document_created,
        "Incident document ready"
    );

    Ok(IncidentDocument {
        review_folder_id,
        base_template_id,
        team_folder_id,
        team_folder_created,
        team_template_id,
        team_template_created,
        document_id,
        document_created,
        link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDrive;
    use pirkit_common::ResourceKind;

    fn id(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }

    async fn seeded_drive() -> MemoryDrive {
        let drive = MemoryDrive::new();
        drive
            .insert("PIR", "root", "Post Incident Review", ResourceKind::Folder)
            .await;
        drive.insert("T0", "PIR", "TEMPLATE", ResourceKind::Document).await;
        drive
    }

    #[tokio::test]
    async fn test_first_run_creates_everything_below_review_folder() {
        let drive = seeded_drive().await;
        let layout = LayoutSettings::default();

        let doc = prepare_incident_document(&drive, &layout, &id("root"), "Team squad 8", "Outage 1")
            .await
            .unwrap();

        assert_eq!(doc.review_folder_id, id("PIR"));
        assert_eq!(doc.base_template_id, id("T0"));
        assert!(doc.team_folder_created);
        assert!(doc.team_template_created);
        assert!(doc.document_created);
        assert!(doc.link.is_some());
        assert_eq!(drive.create_calls(), 1);
        assert_eq!(drive.copy_calls(), 2);

        let document = drive.get_file(&doc.document_id).await.unwrap();
        assert_eq!(document.name, "Outage 1");
        assert_eq!(document.parents, vec![doc.team_folder_id.to_string()]);
    }

    #[tokio::test]
    async fn test_rerun_creates_nothing() {
        let drive = seeded_drive().await;
        let layout = LayoutSettings::default();

        let first = prepare_incident_document(&drive, &layout, &id("root"), "Team", "Outage")
            .await
            .unwrap();
        let second = prepare_incident_document(&drive, &layout, &id("root"), "Team", "Outage")
            .await
            .unwrap();

        assert_eq!(first.document_id, second.document_id);
        assert!(!second.team_folder_created);
        assert!(!second.team_template_created);
        assert!(!second.document_created);
        assert_eq!(drive.create_calls(), 1);
        assert_eq!(drive.copy_calls(), 2);
    }

    #[tokio::test]
    async fn test_new_incident_reuses_team_template() {
        let drive = seeded_drive().await;
        let layout = LayoutSettings::default();

        let first = prepare_incident_document(&drive, &layout, &id("root"), "Team", "Outage 1")
            .await
            .unwrap();
        let second = prepare_incident_document(&drive, &layout, &id("root"), "Team", "Outage 2")
            .await
            .unwrap();

        assert_eq!(first.team_template_id, second.team_template_id);
        assert!(second.document_created);
        assert_ne!(first.document_id, second.document_id);
        assert_eq!(drive.copy_calls(), 3);
    }

    #[tokio::test]
    async fn test_missing_review_folder_is_fatal() {
        let drive = MemoryDrive::new();
        let result = prepare_incident_document(
            &drive,
            &LayoutSettings::default(),
            &id("root"),
            "Team",
            "Outage",
        )
        .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(drive.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_base_template_is_fatal() {
        let drive = MemoryDrive::new();
        drive
            .insert("PIR", "root", "Post Incident Review", ResourceKind::Folder)
            .await;

        let result = prepare_incident_document(
            &drive,
            &LayoutSettings::default(),
            &id("root"),
            "Team",
            "Outage",
        )
        .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(drive.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_team_folders_stop_the_run() {
        let drive = seeded_drive().await;
        drive.insert("A", "PIR", "Team", ResourceKind::Folder).await;
        drive.insert("B", "PIR", "Team", ResourceKind::Folder).await;

        let result = prepare_incident_document(
            &drive,
            &LayoutSettings::default(),
            &id("root"),
            "Team",
            "Outage",
        )
        .await;

        assert!(matches!(result, Err(Error::Ambiguous(_))));
        assert_eq!(drive.copy_calls(), 0);
    }

    #[tokio::test]
    async fn test_custom_layout_names() {
        let drive = MemoryDrive::new();
        drive.insert("PM", "0ABC", "Postmortems", ResourceKind::Folder).await;
        drive.insert("BASE", "PM", "Base", ResourceKind::Document).await;
        let layout = LayoutSettings {
            root_folder: "Postmortems".to_string(),
            template_name: "Base".to_string(),
        };

        let doc = prepare_incident_document(&drive, &layout, &id("0ABC"), "SRE", "DB failover")
            .await
            .unwrap();

        let team_template = drive.get_file(&doc.team_template_id).await.unwrap();
        assert_eq!(team_template.name, "Base");
    }

    #[tokio::test]
    async fn test_empty_names_rejected() {
        let drive = seeded_drive().await;
        let layout = LayoutSettings::default();

        assert!(prepare_incident_document(&drive, &layout, &id("root"), " ", "x")
            .await
            .is_err());
        assert!(prepare_incident_document(&drive, &layout, &id("root"), "Team", "")
            .await
            .is_err());
        assert_eq!(drive.list_calls(), 0);
    }
}
