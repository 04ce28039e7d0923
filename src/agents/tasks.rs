//! Task Templates
//!
//! The five pipeline steps, in execution order. Each step is owned by one
//! agent and may read the outputs of earlier steps.

use serde::Serialize;

use super::definitions::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    AnalyzeMarketConditions,
    AssessProjectStatus,
    ScoreProjectRisks,
    GenerateRiskAssessment,
    GenerateRiskReport,
}

impl TaskKind {
    /// Execution order; every dependency precedes its dependents
    pub const PIPELINE: [TaskKind; 5] = [
        TaskKind::AnalyzeMarketConditions,
        TaskKind::AssessProjectStatus,
        TaskKind::ScoreProjectRisks,
        TaskKind::GenerateRiskAssessment,
        TaskKind::GenerateRiskReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyzeMarketConditions => "analyze_market_conditions",
            Self::AssessProjectStatus => "assess_project_status",
            Self::ScoreProjectRisks => "score_project_risks",
            Self::GenerateRiskAssessment => "generate_risk_assessment",
            Self::GenerateRiskReport => "generate_risk_report",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::AnalyzeMarketConditions => "Market Analysis",
            Self::AssessProjectStatus => "Project Status Assessment",
            Self::ScoreProjectRisks => "Risk Scoring",
            Self::GenerateRiskAssessment => "Risk Assessment",
            Self::GenerateRiskReport => "Risk Report",
        }
    }

    pub fn agent(&self) -> AgentId {
        match self {
            Self::AnalyzeMarketConditions => AgentId::MarketAnalyst,
            Self::AssessProjectStatus => AgentId::ProjectTracker,
            Self::ScoreProjectRisks => AgentId::RiskScorer,
            Self::GenerateRiskAssessment => AgentId::RiskManager,
            Self::GenerateRiskReport => AgentId::ReportingAgent,
        }
    }

    pub fn dependencies(&self) -> &'static [TaskKind] {
        match self {
            Self::AnalyzeMarketConditions | Self::AssessProjectStatus => &[],
            Self::ScoreProjectRisks => &[Self::AnalyzeMarketConditions, Self::AssessProjectStatus],
            Self::GenerateRiskAssessment => &[
                Self::AnalyzeMarketConditions,
                Self::AssessProjectStatus,
                Self::ScoreProjectRisks,
            ],
            Self::GenerateRiskReport => &[Self::GenerateRiskAssessment],
        }
    }

    pub fn expected_output(&self) -> &'static str {
        match self {
            Self::AnalyzeMarketConditions => {
                "A comprehensive market analysis report that identifies external risk factors \
related to the project(s). The report should include:
- Industry trends affecting the project
- Economic indicators and their impact
- Competitive landscape analysis
- Regulatory and compliance considerations
- Technology evolution risks"
            }
            Self::AssessProjectStatus => {
                "A detailed project status assessment that identifies internal risk factors.
The assessment should include:
- Resource-related risks (staffing, skills, availability)
- Schedule risks and timeline concerns
- Budget and financial risk factors
- Quality and deliverable risks
- Team and communication risks"
            }
            Self::ScoreProjectRisks => {
                "A risk scoring report that quantifies and prioritizes all identified risks.
The report should include:
- Individual risk scores (probability, impact, overall score)
- Risk priority ranking
- Risk categorization by type and urgency
- Controllability assessment for each risk"
            }
            Self::GenerateRiskAssessment => {
                "A comprehensive risk assessment report with mitigation strategies. The report should include:
- Integrated risk analysis across all categories
- Identification of risk interactions and dependencies
- Specific mitigation strategies for each high-priority risk
- Preventive actions for emerging risks
- Contingency plans for unavoidable risks
- Overall project risk level assessment"
            }
            Self::GenerateRiskReport => {
                "A conversational response that directly addresses the user's query about project risks.
The response should:
- Directly answer what the user asked about
- Provide specific, relevant risk information
- Highlight critical concerns that need attention
- Offer clear recommendations for action
- Be conversational yet informative in tone"
            }
        }
    }

    fn description(&self, query: &str, context: &str) -> String {
        match self {
            Self::AnalyzeMarketConditions => format!(
                "Analyze market conditions, financial trends, and news that might affect IT project risks.

Focus on:
1. Industry-specific trends and disruptions
2. Economic indicators relevant to IT projects
3. Competitor activities and market movements
4. Regulatory changes and compliance risks
5. Technology shifts and obsolescence risks

Context: {context}

Provide a detailed analysis of external market factors that could impact the project(s).
Format your response as a structured market analysis report with clear sections for
different types of external risks."
            ),
            Self::AssessProjectStatus => format!(
                "Analyze internal project parameters to identify risks related to resources,
schedules, and deliverables.

Focus on:
1. Resource availability and allocation issues
2. Schedule delays and timeline risks
3. Budget constraints and financial risks
4. Quality concerns with deliverables
5. Team dynamics and communication risks

Context: {context}

Provide a detailed assessment of internal project risks based on the current
status of the project(s)."
            ),
            Self::ScoreProjectRisks => format!(
                "Analyze the identified risks from market analysis and project status assessment,
then score and prioritize them based on:

1. Probability of occurrence (1-5 scale)
2. Potential impact severity (1-5 scale)
3. Overall risk score (calculate as probability x impact)
4. Urgency (immediate, short-term, long-term)
5. Controllability (how much the team can mitigate the risk)

Context: {context}

Provide a quantitative assessment of each identified risk with clear scoring
and prioritization."
            ),
            Self::GenerateRiskAssessment => format!(
                "Based on the market analysis, project status assessment, and risk scoring,
generate a comprehensive risk assessment and develop mitigation strategies:

1. Synthesize insights from all risk analyses
2. Identify interactions and dependencies between risks
3. Develop specific mitigation strategies for each high-priority risk
4. Recommend preventive actions for emerging risks
5. Suggest contingency plans for unavoidable risks

Context: {context}

Provide a comprehensive assessment that integrates all risk factors and
offers actionable mitigation strategies."
            ),
            Self::GenerateRiskReport => format!(
                "Based on the comprehensive risk assessment, generate a clear, actionable report
that addresses the user's specific query about project risks:

1. Directly answer the user's question about '{query}'
2. Provide relevant risk information specific to the query
3. Highlight the most critical risks and mitigation strategies
4. Recommend next steps and actions for decision-makers
5. Identify any areas requiring further analysis or monitoring

Context: {context}

The report should be conversational and directly address what the user wants to know,
while providing actionable insights about project risks."
            ),
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task instantiated for one user question
#[derive(Debug, Clone, Serialize)]
pub struct TaskPlan {
    pub kind: TaskKind,
    pub agent: AgentId,
    pub description: String,
    pub expected_output: &'static str,
    pub context: String,
    pub dependencies: &'static [TaskKind],
}

pub fn user_context(query: &str, project: &str) -> String {
    format!("The user wants to know about: '{query}' for project: '{project}'")
}

/// All five tasks for `query`, in pipeline order
pub fn build_tasks(query: &str, project: &str) -> Vec<TaskPlan> {
    let context = user_context(query, project);
    TaskKind::PIPELINE
        .iter()
        .map(|kind| TaskPlan {
            kind: *kind,
            agent: kind.agent(),
            description: kind.description(query, &context),
            expected_output: kind.expected_output(),
            context: context.clone(),
            dependencies: kind.dependencies(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_precede_dependents() {
        for (i, kind) in TaskKind::PIPELINE.iter().enumerate() {
            for dep in kind.dependencies() {
                let pos = TaskKind::PIPELINE.iter().position(|k| k == dep).unwrap();
                assert!(pos < i, "{dep} must run before {kind}");
            }
        }
    }

    #[test]
    fn test_tasks_embed_context() {
        let tasks = build_tasks("What are the budget risks?", "Cloud Migration");
        assert_eq!(tasks.len(), 5);
        for task in &tasks {
            assert!(task.description.contains(
                "The user wants to know about: 'What are the budget risks?' for project: 'Cloud Migration'"
            ));
        }
        assert!(
            tasks[4]
                .description
                .contains("Directly answer the user's question about 'What are the budget risks?'")
        );
    }

    #[test]
    fn test_agent_assignment() {
        let agents: Vec<AgentId> = build_tasks("q", "p").iter().map(|t| t.agent).collect();
        assert_eq!(
            agents,
            vec![
                AgentId::MarketAnalyst,
                AgentId::ProjectTracker,
                AgentId::RiskScorer,
                AgentId::RiskManager,
                AgentId::ReportingAgent
            ]
        );
    }
}
