//! Agent Personas
//!
//! Five fixed agents, each with a role, goal, backstory and the tools it may
//! consult. The agent id doubles as the key for per-agent model overrides
//! (`llm.agent_models.<id>`).

use serde::Serialize;

use super::tools::ToolName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    RiskManager,
    MarketAnalyst,
    RiskScorer,
    ProjectTracker,
    ReportingAgent,
}

impl AgentId {
    pub const ALL: [AgentId; 5] = [
        AgentId::RiskManager,
        AgentId::MarketAnalyst,
        AgentId::RiskScorer,
        AgentId::ProjectTracker,
        AgentId::ReportingAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RiskManager => "risk_manager",
            Self::MarketAnalyst => "market_analyst",
            Self::RiskScorer => "risk_scorer",
            Self::ProjectTracker => "project_tracker",
            Self::ReportingAgent => "reporting_agent",
        }
    }

    pub fn definition(&self) -> &'static AgentDefinition {
        match self {
            Self::RiskManager => &RISK_MANAGER,
            Self::MarketAnalyst => &MARKET_ANALYST,
            Self::RiskScorer => &RISK_SCORER,
            Self::ProjectTracker => &PROJECT_TRACKER,
            Self::ReportingAgent => &REPORTING_AGENT,
        }
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
pub struct AgentDefinition {
    pub id: AgentId,
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
    pub tools: &'static [ToolName],
}

impl AgentDefinition {
    /// Opening section of every prompt the agent sends
    pub fn persona(&self) -> String {
        format!(
            "You are the {}.\nGoal: {}\n\n{}",
            self.role, self.goal, self.backstory
        )
    }
}

pub static RISK_MANAGER: AgentDefinition = AgentDefinition {
    id: AgentId::RiskManager,
    role: "Project Risk Manager",
    goal: "Identify, assess, and coordinate mitigation of all project risks",
    backstory: "You are a senior project risk manager with extensive experience in IT projects. \
Your expertise lies in identifying risks across multiple dimensions, assessing their potential \
impact, and coordinating mitigation strategies. You have a holistic view of projects and can \
integrate insights from various sources to create a comprehensive risk management approach.",
    tools: &[
        ToolName::ProjectInfo,
        ToolName::RiskAnalysis,
        ToolName::MarketAnalysis,
        ToolName::MitigationStrategies,
        ToolName::ProjectComparison,
    ],
};

pub static MARKET_ANALYST: AgentDefinition = AgentDefinition {
    id: AgentId::MarketAnalyst,
    role: "Market Analysis Agent",
    goal: "Analyze financial trends, market news, and economic indicators to identify external risks",
    backstory: "You are a market analysis specialist with deep knowledge of financial markets, \
economic trends, and industry dynamics. You excel at identifying external factors that could \
impact IT projects, such as market shifts, regulatory changes, and economic conditions. Your \
analysis helps anticipate external risks before they affect project outcomes.",
    tools: &[ToolName::MarketAnalysis, ToolName::IdentifyExternalRisks],
};

pub static RISK_SCORER: AgentDefinition = AgentDefinition {
    id: AgentId::RiskScorer,
    role: "Risk Scoring Agent",
    goal: "Evaluate and score identified risks based on probability, impact, and interdependencies",
    backstory: "You are a risk assessment expert specializing in quantitative risk analysis. \
Your methodical approach to evaluating risk probability and impact enables accurate risk \
scoring and prioritization. You can identify risk interdependencies and calculate cumulative \
effects to determine overall project risk levels.",
    tools: &[
        ToolName::CalculateRiskScore,
        ToolName::RiskAnalysis,
        ToolName::AddRisk,
        ToolName::UpdateRisk,
    ],
};

pub static PROJECT_TRACKER: AgentDefinition = AgentDefinition {
    id: AgentId::ProjectTracker,
    role: "Project Status Tracking Agent",
    goal: "Monitor project progress and identify internal risks related to resources, schedules, and technical aspects",
    backstory: "You are a project status tracking specialist with a keen eye for early warning \
signs in IT projects. You can identify resource constraints, schedule slippages, and technical \
hurdles before they escalate into major issues. Your focus is on internal project dynamics and \
operational challenges that could introduce risks.",
    tools: &[
        ToolName::ProjectInfo,
        ToolName::AnalyzeProjectHealth,
        ToolName::AnalyzeRiskTrends,
    ],
};

pub static REPORTING_AGENT: AgentDefinition = AgentDefinition {
    id: AgentId::ReportingAgent,
    role: "Reporting Agent",
    goal: "Generate detailed risk analytics, alerts, and reports for stakeholders",
    backstory: "You are a risk reporting specialist with expertise in translating complex risk \
data into clear, actionable insights. You excel at creating comprehensive risk reports that \
highlight critical issues, track risk trends, and provide mitigation recommendations. Your \
reports enable informed decision-making by presenting risk information in an accessible, \
prioritized format.",
    tools: &[
        ToolName::GenerateRiskReport,
        ToolName::GetProjectReports,
        ToolName::MitigationStrategies,
    ],
};
