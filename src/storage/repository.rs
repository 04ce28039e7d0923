//! Risk Repository
//!
//! Typed access to the four document collections. Each record is embedded
//! from a short natural-language rendering and stored with its fields as
//! metadata, so reads deserialize straight back into the record type.
//!
//! Writes propagate errors. Reads log and degrade to empty results.

use chrono::{Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::vector_store::{Metadata, SharedVectorStore, StoredDocument, VectorRecord, filter_of};
use crate::ai::SharedEmbedder;
use crate::constants::vector::{
    COLLECTIONS, MARKET_DATA_COLLECTION, MAX_FILTER_RESULTS, PROJECTS_COLLECTION,
    REPORTS_COLLECTION, RISKS_COLLECTION,
};
use crate::data::{SampleDataset, slugify};
use crate::types::{
    MarketDataEntry, MarketDataKind, Project, Report, Result, Risk, RiskError, format_timestamp,
    log_filter_warn,
};

/// Counts written by [`RiskRepository::populate_sample_data`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub projects: usize,
    pub risks: usize,
    pub market_data: usize,
}

pub struct RiskRepository {
    store: SharedVectorStore,
    embedder: SharedEmbedder,
}

// =============================================================================
// Document text
// =============================================================================

fn or_unknown(s: &str) -> &str {
    if s.is_empty() { "Unknown" } else { s }
}

pub fn project_document(project: &Project) -> String {
    format!(
        "Project {} (ID: {}): Status: {}. Budget: {}. Timeline: {} to {}. Description: {}.",
        project.name,
        project.id,
        project.status,
        project.budget,
        or_unknown(&project.start_date),
        or_unknown(&project.end_date),
        if project.description.is_empty() {
            "No description"
        } else {
            &project.description
        },
    )
}

pub fn risk_document(risk: &Risk) -> String {
    format!(
        "Risk: {} (ID: {}) for Project ID {}. Category: {}. Probability: {}. Impact: {}. Description: {}. Mitigation: {}.",
        risk.name,
        risk.id,
        if risk.project_id.is_empty() {
            "unknown"
        } else {
            &risk.project_id
        },
        risk.category,
        risk.probability,
        risk.impact,
        if risk.description.is_empty() {
            "No description"
        } else {
            &risk.description
        },
        if risk.mitigation.is_empty() {
            "No mitigation strategy"
        } else {
            &risk.mitigation
        },
    )
}

pub fn market_document(entry: &MarketDataEntry) -> String {
    format!(
        "Market Data (ID: {}): Type: {}. Time: {}. Summary: {}. Details: {}.",
        entry.id,
        entry.kind,
        format_timestamp(entry.timestamp),
        entry.summary,
        if entry.details.is_empty() {
            "No details"
        } else {
            &entry.details
        },
    )
}

pub fn report_document(report: &Report) -> String {
    let mut text = format!(
        "Risk Report (ID: {}) for Project ID {}. Generated: {}. Overall Risk Score: {}. Summary: {}.",
        report.id,
        report.project_id,
        format_timestamp(report.timestamp),
        report.overall_score,
        if report.summary.is_empty() {
            "No summary"
        } else {
            &report.summary
        },
    );
    if !report.content.is_empty() {
        text.push_str("\n\nContent: ");
        text.push_str(&report.content);
    }
    text
}

fn ensure_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = uuid::Uuid::new_v4().simple().to_string();
    }
}

fn to_metadata<T: Serialize>(record: &T) -> Result<Metadata> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(RiskError::Validation(format!(
            "Record must serialize to an object, got {}",
            other
        ))),
    }
}

fn decode<T: DeserializeOwned>(doc: StoredDocument, kind: &str) -> Option<T> {
    log_filter_warn(
        serde_json::from_value(Value::Object(doc.metadata)),
        &format!("decoding {} '{}'", kind, doc.id),
    )
}

impl RiskRepository {
    pub fn new(store: SharedVectorStore, embedder: SharedEmbedder) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &SharedVectorStore {
        &self.store
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_enabled()
    }

    async fn put<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        document: String,
        record: &T,
    ) -> Result<()> {
        let embedding = self.embedder.embed(&document).await;
        let record = VectorRecord {
            id: id.to_string(),
            document,
            metadata: to_metadata(record)?,
            embedding,
        };
        self.store.upsert(collection, vec![record]).await
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Store a project; returns its id (generated when empty)
    pub async fn store_project(&self, project: &Project) -> Result<String> {
        let mut project = project.clone();
        ensure_id(&mut project.id);
        self.put(
            PROJECTS_COLLECTION,
            &project.id,
            project_document(&project),
            &project,
        )
        .await?;
        info!("Stored project data for {} (ID: {})", project.name, project.id);
        Ok(project.id)
    }

    pub async fn store_risk(&self, risk: &Risk) -> Result<String> {
        let mut risk = risk.clone();
        ensure_id(&mut risk.id);
        if risk.project_id.is_empty() {
            risk.project_id = "unknown".to_string();
        }
        self.put(RISKS_COLLECTION, &risk.id, risk_document(&risk), &risk)
            .await?;
        info!("Stored risk data for {} (ID: {})", risk.name, risk.id);
        Ok(risk.id)
    }

    pub async fn store_market_data(&self, entry: &MarketDataEntry) -> Result<String> {
        let mut entry = entry.clone();
        ensure_id(&mut entry.id);
        self.put(
            MARKET_DATA_COLLECTION,
            &entry.id,
            market_document(&entry),
            &entry,
        )
        .await?;
        info!("Stored market data (ID: {}, Type: {})", entry.id, entry.kind);
        Ok(entry.id)
    }

    pub async fn store_report(&self, report: &Report) -> Result<String> {
        let mut report = report.clone();
        ensure_id(&mut report.id);
        self.put(
            REPORTS_COLLECTION,
            &report.id,
            report_document(&report),
            &report,
        )
        .await?;
        info!(
            "Stored risk report (ID: {}) for Project ID {}",
            report.id, report.project_id
        );
        Ok(report.id)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    async fn similar<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &str,
        filter: Option<&Metadata>,
        limit: usize,
        kind: &str,
    ) -> Vec<T> {
        let embedding = self.embedder.embed(query).await;
        match self.store.query(collection, &embedding, filter, limit).await {
            Ok(matches) => matches
                .into_iter()
                .filter_map(|m| decode(m.doc, kind))
                .collect(),
            Err(e) => {
                warn!("Failed to query {}: {}", collection, e);
                Vec::new()
            }
        }
    }

    async fn matching<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Metadata,
        kind: &str,
    ) -> Vec<T> {
        match self
            .store
            .get_where(collection, filter, MAX_FILTER_RESULTS)
            .await
        {
            Ok(docs) => docs.into_iter().filter_map(|d| decode(d, kind)).collect(),
            Err(e) => {
                warn!("Failed to read {}: {}", collection, e);
                Vec::new()
            }
        }
    }

    /// Projects most similar to the query text
    pub async fn query_projects(&self, query: &str, limit: usize) -> Vec<Project> {
        let projects: Vec<Project> = self
            .similar(PROJECTS_COLLECTION, query, None, limit, "project")
            .await;
        info!("Query for '{}' returned {} projects", query, projects.len());
        projects
    }

    /// Risks most similar to the query text, optionally within one project
    pub async fn query_risks(
        &self,
        query: &str,
        project_id: Option<&str>,
        limit: usize,
    ) -> Vec<Risk> {
        let filter = project_id.map(|id| filter_of([("project_id", json!(id))]));
        let risks: Vec<Risk> = self
            .similar(RISKS_COLLECTION, query, filter.as_ref(), limit, "risk")
            .await;
        info!("Query for risks '{}' returned {} risks", query, risks.len());
        risks
    }

    /// Market entries most similar to the query text
    pub async fn query_market_data(&self, query: &str, limit: usize) -> Vec<MarketDataEntry> {
        self.similar(MARKET_DATA_COLLECTION, query, None, limit, "market data")
            .await
    }

    /// Stored id of the project with this name, falling back to its slug
    /// when no such project has been stored.
    pub async fn resolve_project_id(&self, project_name: &str) -> String {
        let projects: Vec<Project> = self
            .matching(
                PROJECTS_COLLECTION,
                &filter_of([("name", json!(project_name))]),
                "project",
            )
            .await;
        projects
            .into_iter()
            .map(|p| p.id)
            .min()
            .unwrap_or_else(|| slugify(project_name))
    }

    pub async fn get_project_by_id(&self, project_id: &str) -> Option<Project> {
        match self
            .store
            .get(PROJECTS_COLLECTION, &[project_id.to_string()])
            .await
        {
            Ok(docs) => docs.into_iter().find_map(|d| decode(d, "project")),
            Err(e) => {
                warn!("Failed to get project by ID: {}", e);
                None
            }
        }
    }

    pub async fn get_risk_by_id(&self, risk_id: &str) -> Option<Risk> {
        match self.store.get(RISKS_COLLECTION, &[risk_id.to_string()]).await {
            Ok(docs) => docs.into_iter().find_map(|d| decode(d, "risk")),
            Err(e) => {
                warn!("Failed to get risk by ID: {}", e);
                None
            }
        }
    }

    /// Every stored risk of a project
    pub async fn get_project_risks(&self, project_id: &str) -> Vec<Risk> {
        let mut risks: Vec<Risk> = self
            .matching(
                RISKS_COLLECTION,
                &filter_of([("project_id", json!(project_id))]),
                "risk",
            )
            .await;
        risks.sort_by(|a, b| a.id.cmp(&b.id));
        info!("Retrieved {} risks for project ID {}", risks.len(), project_id);
        risks
    }

    /// Market entries no older than `hours`, optionally of one kind, newest first
    pub async fn get_recent_market_data(
        &self,
        hours: i64,
        kind: Option<&MarketDataKind>,
    ) -> Vec<MarketDataEntry> {
        let filter = kind
            .map(|k| filter_of([("type", json!(k.as_str()))]))
            .unwrap_or_default();
        let cutoff = Utc::now() - Duration::hours(hours);

        let mut entries: Vec<MarketDataEntry> = self
            .matching(MARKET_DATA_COLLECTION, &filter, "market data")
            .await
            .into_iter()
            .filter(|e: &MarketDataEntry| e.timestamp >= cutoff)
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        info!(
            "Retrieved {} market data entries from the last {} hours",
            entries.len(),
            hours
        );
        entries
    }

    /// Reports for a project, newest first
    pub async fn get_project_reports(&self, project_id: &str, limit: usize) -> Vec<Report> {
        let mut reports: Vec<Report> = self
            .matching(
                REPORTS_COLLECTION,
                &filter_of([("project_id", json!(project_id))]),
                "report",
            )
            .await;
        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        reports.truncate(limit);
        info!(
            "Retrieved {} risk reports for project ID {}",
            reports.len(),
            project_id
        );
        reports
    }

    pub async fn get_all_projects(&self) -> Vec<Project> {
        let mut projects: Vec<Project> = self
            .matching(PROJECTS_COLLECTION, &Metadata::new(), "project")
            .await;
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        info!("Retrieved {} projects", projects.len());
        projects
    }

    /// Number of documents per collection, zero when unreadable
    pub async fn collection_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts = Vec::new();
        for collection in COLLECTIONS {
            let n = log_filter_warn(
                self.store.count(collection).await,
                &format!("counting {}", collection),
            )
            .unwrap_or(0);
            counts.push((collection, n));
        }
        counts
    }

    /// Write the fixed demonstration dataset
    pub async fn populate_sample_data(&self, dataset: &SampleDataset) -> Result<SeedSummary> {
        for project in &dataset.projects {
            self.store_project(project).await?;
        }
        for risk in &dataset.risks {
            self.store_risk(risk).await?;
        }
        for entry in &dataset.market_data {
            self.store_market_data(entry).await?;
        }

        let summary = SeedSummary {
            projects: dataset.projects.len(),
            risks: dataset.risks.len(),
            market_data: dataset.market_data.len(),
        };
        info!("Created sample data successfully: {:?}", summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::HashingEmbedder;
    use crate::data::sample_dataset;
    use crate::storage::{Database, DisabledStore, SqliteVectorStore};
    use crate::types::RiskCategory;
    use std::sync::Arc;

    fn repository() -> RiskRepository {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store = Arc::new(SqliteVectorStore::new(db).unwrap());
        RiskRepository::new(store, Arc::new(HashingEmbedder::new(512)))
    }

    async fn seeded() -> RiskRepository {
        let repo = repository();
        repo.populate_sample_data(&sample_dataset()).await.unwrap();
        repo
    }

    #[test]
    fn test_document_templates() {
        let mut project = Project::new("p1001", "Cloud Migration");
        project.status = "In Progress".to_string();
        project.budget = 500000.0;
        project.start_date = "2023-01-15".to_string();
        project.end_date = "2023-07-30".to_string();
        project.description = "Migrate on-premises infrastructure to cloud services".to_string();
        assert_eq!(
            project_document(&project),
            "Project Cloud Migration (ID: p1001): Status: In Progress. Budget: 500000. \
             Timeline: 2023-01-15 to 2023-07-30. Description: Migrate on-premises infrastructure to cloud services."
        );

        let risk = Risk::new("Budget Overrun", "Financial", 0.6, 0.7)
            .with_id("r2002")
            .with_project("p1001");
        assert_eq!(
            risk_document(&risk),
            "Risk: Budget Overrun (ID: r2002) for Project ID p1001. Category: Financial. \
             Probability: 0.6. Impact: 0.7. Description: No description. Mitigation: No mitigation strategy."
        );
    }

    #[test]
    fn test_report_document_appends_content() {
        let report = Report {
            id: "rep1".to_string(),
            project_id: "p1001".to_string(),
            timestamp: Utc::now(),
            overall_score: 42,
            summary: String::new(),
            content: "# Risk Report".to_string(),
        };
        let text = report_document(&report);
        assert!(text.contains("Overall Risk Score: 42. Summary: No summary."));
        assert!(text.ends_with("\n\nContent: # Risk Report"));
    }

    #[tokio::test]
    async fn test_seed_and_read_back() {
        let repo = seeded().await;

        let projects = repo.get_all_projects().await;
        assert_eq!(projects.len(), 3);
        assert_eq!(projects[0].name, "Cloud Migration");

        let risks = repo.get_project_risks("p1001").await;
        assert_eq!(risks.len(), 3);
        assert!(risks.iter().all(|r| r.project_id == "p1001"));
        assert_eq!(
            risks[1].category,
            RiskCategory::Other("Financial".to_string())
        );

        let project = repo.get_project_by_id("p1003").await.unwrap();
        assert_eq!(project.name, "Data Center Upgrade");
        assert!(repo.get_project_by_id("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_project_id_by_name() {
        let repo = seeded().await;
        assert_eq!(repo.resolve_project_id("Cloud Migration").await, "p1001");
        assert_eq!(repo.resolve_project_id("Data Center Upgrade").await, "p1003");
        assert_eq!(
            repo.resolve_project_id("E-commerce Platform").await,
            "e_commerce_platform"
        );
    }

    #[tokio::test]
    async fn test_query_risks_with_project_filter() {
        let repo = seeded().await;

        let risks = repo.query_risks("security vulnerabilities", Some("p1002"), 10).await;
        assert!(!risks.is_empty());
        assert!(risks.iter().all(|r| r.project_id == "p1002"));

        let top = repo.query_risks("data security breach migration", None, 1).await;
        assert_eq!(top[0].id, "r2001");
    }

    #[tokio::test]
    async fn test_generated_ids() {
        let repo = repository();
        let id = repo
            .store_risk(&Risk::new("Scope creep", "Scope", 0.5, 0.5))
            .await
            .unwrap();
        assert!(!id.is_empty());

        let stored = repo.get_risk_by_id(&id).await.unwrap();
        assert_eq!(stored.project_id, "unknown");
    }

    #[tokio::test]
    async fn test_recent_market_data_window_and_kind() {
        let repo = seeded().await;
        let mut stale = MarketDataEntry {
            id: "m-old".to_string(),
            kind: MarketDataKind::SecurityAlert,
            timestamp: Utc::now() - Duration::hours(100),
            summary: "Old alert".to_string(),
            details: String::new(),
            source: None,
        };
        repo.store_market_data(&stale).await.unwrap();

        let recent = repo.get_recent_market_data(24, None).await;
        assert_eq!(recent.len(), 4);

        let alerts = repo
            .get_recent_market_data(24 * 7, Some(&MarketDataKind::SecurityAlert))
            .await;
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[1].id, "m-old");

        stale.id = "m-older".to_string();
        stale.timestamp = Utc::now() - Duration::hours(1000);
        repo.store_market_data(&stale).await.unwrap();
        assert_eq!(repo.get_recent_market_data(24 * 7, None).await.len(), 5);
    }

    #[tokio::test]
    async fn test_reports_newest_first_and_limited() {
        let repo = repository();
        for hours_ago in [5, 1, 3] {
            repo.store_report(&Report {
                id: format!("rep-{hours_ago}"),
                project_id: "p1001".to_string(),
                timestamp: Utc::now() - Duration::hours(hours_ago),
                overall_score: 40,
                summary: String::new(),
                content: String::new(),
            })
            .await
            .unwrap();
        }

        let reports = repo.get_project_reports("p1001", 2).await;
        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rep-1", "rep-3"]);
        assert!(repo.get_project_reports("p1002", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_store_reads_empty() {
        let repo = RiskRepository::new(Arc::new(DisabledStore), Arc::new(HashingEmbedder::new(8)));
        assert!(!repo.is_enabled());
        assert!(repo.query_risks("anything", None, 5).await.is_empty());
        assert!(repo.get_all_projects().await.is_empty());
    }
}
