//! Fixed demonstration records used to seed the vector store.

use chrono::Utc;

use crate::types::{MarketDataEntry, MarketDataKind, Project, Risk};

/// Records written by `RiskRepository::populate_sample_data`
#[derive(Debug, Clone)]
pub struct SampleDataset {
    pub projects: Vec<Project>,
    pub risks: Vec<Risk>,
    pub market_data: Vec<MarketDataEntry>,
}

struct ProjectSeed {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    status: &'static str,
    start_date: &'static str,
    end_date: &'static str,
    budget: f64,
    team_size: u32,
    client: &'static str,
    industry: &'static str,
}

const PROJECTS: [ProjectSeed; 3] = [
    ProjectSeed {
        id: "p1001",
        name: "Cloud Migration",
        description: "Migrate on-premises infrastructure to cloud services",
        status: "In Progress",
        start_date: "2023-01-15",
        end_date: "2023-07-30",
        budget: 500_000.0,
        team_size: 12,
        client: "InternaCorp",
        industry: "Finance",
    },
    ProjectSeed {
        id: "p1002",
        name: "Mobile Banking App",
        description: "Develop a new mobile banking application with enhanced security",
        status: "Planning",
        start_date: "2023-03-01",
        end_date: "2023-12-15",
        budget: 750_000.0,
        team_size: 8,
        client: "SecureBank",
        industry: "Banking",
    },
    ProjectSeed {
        id: "p1003",
        name: "Data Center Upgrade",
        description: "Upgrade existing data center infrastructure and improve reliability",
        status: "In Progress",
        start_date: "2022-11-10",
        end_date: "2023-05-30",
        budget: 1_200_000.0,
        team_size: 15,
        client: "TechGlobal",
        industry: "Technology",
    },
];

// (id, project, name, description, category, probability, impact, mitigation)
type RiskSeed = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    f64,
    f64,
    &'static str,
);

const RISKS: [RiskSeed; 8] = [
    (
        "r2001",
        "p1001",
        "Data Security Breach",
        "Potential security vulnerabilities during data migration",
        "Security",
        0.3,
        0.9,
        "Implement end-to-end encryption and conduct security audits before, during, and after migration.",
    ),
    (
        "r2002",
        "p1001",
        "Budget Overrun",
        "Project expenses exceeding the allocated budget",
        "Financial",
        0.6,
        0.7,
        "Implement strict cost controls and weekly budget reviews.",
    ),
    (
        "r2003",
        "p1001",
        "Service Disruption",
        "Temporary service unavailability during migration",
        "Operational",
        0.8,
        0.5,
        "Plan for off-hours migration windows and implement redundant systems.",
    ),
    (
        "r2004",
        "p1002",
        "Regulatory Compliance Issues",
        "Failure to meet financial regulations for mobile banking",
        "Regulatory",
        0.4,
        0.9,
        "Engage compliance experts and conduct regular regulatory reviews.",
    ),
    (
        "r2005",
        "p1002",
        "Technical Skill Shortage",
        "Lack of specialized mobile security expertise",
        "Resource",
        0.7,
        0.6,
        "Allocate budget for hiring contractors or training existing staff.",
    ),
    (
        "r2006",
        "p1003",
        "Hardware Delivery Delays",
        "Delayed delivery of critical infrastructure components",
        "Schedule",
        0.5,
        0.7,
        "Order hardware with buffer time and identify alternative suppliers.",
    ),
    (
        "r2007",
        "p1003",
        "Power System Failure",
        "Inadequate power infrastructure for new equipment",
        "Technical",
        0.3,
        0.8,
        "Conduct power assessment and upgrade power systems before equipment installation.",
    ),
    (
        "r2008",
        "p1003",
        "Staff Resistance",
        "IT operations staff resistant to new technologies",
        "Operational",
        0.6,
        0.4,
        "Implement change management plan with training and regular communication.",
    ),
];

// (id, kind, summary, details, source)
const MARKET: [(&str, MarketDataKind, &str, &str, &str); 4] = [
    (
        "m3001",
        MarketDataKind::IndustryTrend,
        "Cloud services pricing decreased by 15% on average",
        "Major cloud providers announced price reductions for enterprise customers. This trend could benefit cloud migration projects by reducing ongoing operational costs.",
        "Cloud Industry Report",
    ),
    (
        "m3002",
        MarketDataKind::EconomicIndicator,
        "Interest rates increased by 0.5%",
        "Central bank raised interest rates, which may impact project financing costs and capital expenditure decisions for IT projects.",
        "Financial Times",
    ),
    (
        "m3003",
        MarketDataKind::TechnologyTrend,
        "Mobile banking adoption increased by 35% year-over-year",
        "Consumer adoption of mobile banking apps continues to accelerate, expanding the potential market but also increasing security concerns and regulatory scrutiny.",
        "Banking Technology Survey",
    ),
    (
        "m3004",
        MarketDataKind::SecurityAlert,
        "New vulnerability discovered in common cloud security protocol",
        "Security researchers identified a critical vulnerability affecting data encryption during cloud migrations. Patches are being developed but haven't been released yet.",
        "Cybersecurity Alert Network",
    ),
];

/// Three projects, eight risks and four market signals; market entries are
/// stamped with the current time.
pub fn sample_dataset() -> SampleDataset {
    let projects = PROJECTS
        .iter()
        .map(|seed| Project {
            id: seed.id.to_string(),
            name: seed.name.to_string(),
            description: seed.description.to_string(),
            status: seed.status.to_string(),
            start_date: seed.start_date.to_string(),
            end_date: seed.end_date.to_string(),
            budget: seed.budget,
            team_size: Some(seed.team_size),
            client: Some(seed.client.to_string()),
            industry: Some(seed.industry.to_string()),
        })
        .collect();

    let risks = RISKS
        .iter()
        .map(
            |&(id, project_id, name, description, category, probability, impact, mitigation)| {
                Risk::new(name, category, probability, impact)
                    .with_id(id)
                    .with_project(project_id)
                    .with_description(description)
                    .with_mitigation(mitigation)
            },
        )
        .collect();

    let now = Utc::now();
    let market_data = MARKET
        .iter()
        .map(|(id, kind, summary, details, source)| MarketDataEntry {
            id: id.to_string(),
            kind: kind.clone(),
            timestamp: now,
            summary: summary.to_string(),
            details: details.to_string(),
            source: Some(source.to_string()),
        })
        .collect();

    SampleDataset {
        projects,
        risks,
        market_data,
    }
}
