//! Risk Crew
//!
//! Runs the five tasks strictly in order. Before each model call the owning
//! agent's tools run concurrently and their output is placed in the prompt
//! together with the outputs of the task's dependencies.
//!
//! A failing task records its error and the pipeline moves on; only a
//! failure of the final report task fails the run.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::definitions::{AgentDefinition, AgentId};
use super::tasks::{TaskKind, TaskPlan, build_tasks};
use super::tools::{ToolName, ToolOutput, ToolRegistry};
use crate::ai::{SharedProvider, TimeoutConfig, create_agent_provider, with_timeout};
use crate::config::LlmConfig;
use crate::constants::data::DEFAULT_DAYS_BACK;
use crate::types::{Result, RiskError, truncate_chars};

/// Longest tool output embedded in a prompt
const MAX_TOOL_OUTPUT_CHARS: usize = 6000;

pub type AgentProviders = BTreeMap<AgentId, SharedProvider>;

/// One provider per agent, honoring per-agent model overrides.
/// `None` when no language model is configured.
pub fn build_agent_providers(config: &LlmConfig) -> Result<Option<AgentProviders>> {
    let mut providers = AgentProviders::new();
    for id in AgentId::ALL {
        match create_agent_provider(config, id.as_str())? {
            Some(provider) => {
                debug!("Agent {} uses {} ({})", id, provider.name(), provider.model());
                providers.insert(id, provider);
            }
            None => return Ok(None),
        }
    }
    Ok(Some(providers))
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub task: TaskKind,
    pub agent: AgentId,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tools: Vec<ToolName>,
    pub duration_ms: u64,
}

impl TaskOutput {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrewResult {
    /// Text of the final report task
    pub answer: String,
    pub outputs: Vec<TaskOutput>,
}

pub struct RiskCrew {
    providers: AgentProviders,
    tools: Arc<ToolRegistry>,
    timeouts: TimeoutConfig,
    days_back: u32,
}

impl RiskCrew {
    pub fn new(providers: AgentProviders, tools: Arc<ToolRegistry>) -> Result<Self> {
        if let Some(missing) = AgentId::ALL.iter().find(|id| !providers.contains_key(id)) {
            return Err(RiskError::Config(format!(
                "No language model for agent '{}'",
                missing
            )));
        }
        Ok(Self {
            providers,
            tools,
            timeouts: TimeoutConfig::default(),
            days_back: DEFAULT_DAYS_BACK,
        })
    }

    /// Every agent shares one provider
    pub fn uniform(provider: SharedProvider, tools: Arc<ToolRegistry>) -> Self {
        let providers = AgentId::ALL
            .iter()
            .map(|id| (*id, Arc::clone(&provider)))
            .collect();
        Self {
            providers,
            tools,
            timeouts: TimeoutConfig::default(),
            days_back: DEFAULT_DAYS_BACK,
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// History window handed to the tools
    pub fn with_days_back(mut self, days_back: u32) -> Self {
        self.days_back = days_back;
        self
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Answer `query` about `project`
    pub async fn run(&self, query: &str, project: &str) -> Result<CrewResult> {
        with_timeout(
            self.timeouts.crew_run,
            self.run_tasks(query, project),
            "crew run",
        )
        .await
    }

    async fn run_tasks(&self, query: &str, project: &str) -> Result<CrewResult> {
        let started = Instant::now();
        info!("Crew: Starting for '{}' (project={})", query, project);

        let tasks = build_tasks(query, project);
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let output = self.run_task(task, project, &outputs).await;
            outputs.push(output);
        }

        let Some(last) = outputs.last() else {
            return Err(RiskError::Task {
                task: "crew".to_string(),
                message: "No tasks were run".to_string(),
            });
        };
        if let Some(error) = &last.error {
            return Err(RiskError::Task {
                task: last.task.to_string(),
                message: error.clone(),
            });
        }

        let failed = outputs.iter().filter(|o| !o.succeeded()).count();
        info!(
            "Crew: Finished in {}ms ({} of {} tasks failed)",
            started.elapsed().as_millis(),
            failed,
            outputs.len()
        );

        Ok(CrewResult {
            answer: last.content.clone(),
            outputs,
        })
    }

    async fn run_task(&self, task: &TaskPlan, project: &str, previous: &[TaskOutput]) -> TaskOutput {
        let started = Instant::now();
        let definition = task.agent.definition();

        let calls: Vec<(ToolName, Value)> = definition
            .tools
            .iter()
            .filter_map(|tool| {
                tool.default_args(project, self.days_back)
                    .map(|args| (*tool, args))
            })
            .collect();
        let tool_outputs = self.tools.execute_all(calls).await;

        let prompt = build_prompt(task, definition, &tool_outputs, previous);
        debug!(
            "Crew: {} ({}) prompt is {} chars",
            task.kind,
            task.agent,
            prompt.len()
        );

        let result = match self.providers.get(&task.agent) {
            Some(provider) => {
                with_timeout(
                    self.timeouts.llm_request,
                    provider.generate(&prompt, &Value::Null),
                    task.kind.as_str(),
                )
                .await
            }
            None => Err(RiskError::Config(format!(
                "No language model for agent '{}'",
                task.agent
            ))),
        };

        let tools = tool_outputs.iter().map(|o| o.tool).collect();
        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(response) => {
                debug!("Crew: {} finished in {}ms", task.kind, duration_ms);
                TaskOutput {
                    task: task.kind,
                    agent: task.agent,
                    content: response.text().trim().to_string(),
                    error: None,
                    tools,
                    duration_ms,
                }
            }
            Err(e) => {
                warn!("Crew: {} failed: {}", task.kind, e);
                TaskOutput {
                    task: task.kind,
                    agent: task.agent,
                    content: format!("{} could not be completed: {}", task.kind.title(), e),
                    error: Some(e.to_string()),
                    tools,
                    duration_ms,
                }
            }
        }
    }
}

fn build_prompt(
    task: &TaskPlan,
    definition: &AgentDefinition,
    tool_outputs: &[ToolOutput],
    previous: &[TaskOutput],
) -> String {
    let mut prompt = definition.persona();
    let _ = write!(prompt, "\n\n## Task\n{}\n", task.description);
    let _ = write!(prompt, "\n## Expected Output\n{}\n", task.expected_output);

    if !tool_outputs.is_empty() {
        prompt.push_str("\n## Tool Results\n");
        for output in tool_outputs {
            let rendered = match &output.output {
                Value::String(s) => s.clone(),
                other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
            };
            let _ = write!(
                prompt,
                "\n### {}\n{}\n",
                output.tool,
                truncate_chars(&rendered, MAX_TOOL_OUTPUT_CHARS)
            );
        }
    }

    let dependencies: Vec<&TaskOutput> = previous
        .iter()
        .filter(|o| task.dependencies.contains(&o.task))
        .collect();
    if !dependencies.is_empty() {
        prompt.push_str("\n## Findings From Other Agents\n");
        for dep in dependencies {
            let _ = write!(
                prompt,
                "\n### {} ({})\n{}\n",
                dep.task.title(),
                dep.agent.definition().role,
                dep.content
            );
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{HashingEmbedder, LlmProvider, LlmResponse};
    use crate::config::DataConfig;
    use crate::data::ProjectDataService;
    use crate::risk::RiskScorer;
    use crate::storage::{Database, RiskRepository, SqliteVectorStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers with the task title; fails tasks whose prompt contains `fail_on`
    struct ScriptedProvider {
        prompts: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl ScriptedProvider {
        fn new(fail_on: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                fail_on,
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(&self, prompt: &str, _schema: &Value) -> Result<LlmResponse> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(marker) = self.fail_on
                && prompt.contains(marker)
            {
                return Err(RiskError::LlmApi("model overloaded".to_string()));
            }
            let task = TaskKind::PIPELINE
                .iter()
                .find(|k| prompt.contains(k.expected_output()))
                .map(|k| k.title())
                .unwrap_or("tool call");
            Ok(LlmResponse::content_only(Value::String(format!(
                "  {} output  ",
                task
            ))))
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn tools() -> Arc<ToolRegistry> {
        let data = Arc::new(ProjectDataService::new(
            &DataConfig {
                refresh_interval_secs: 3600,
                seed: Some(11),
            },
            RiskScorer::default(),
        ));
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store = Arc::new(SqliteVectorStore::new(db).unwrap());
        let repository = Arc::new(RiskRepository::new(
            store,
            Arc::new(HashingEmbedder::new(256)),
        ));
        Arc::new(ToolRegistry::new(data, repository))
    }

    #[tokio::test]
    async fn test_runs_all_tasks_in_order() {
        let provider = ScriptedProvider::new(None);
        let crew = RiskCrew::uniform(provider.clone(), tools());

        let result = crew
            .run("What are the top risks?", "Cloud Migration")
            .await
            .unwrap();

        assert_eq!(result.answer, "Risk Report output");
        let order: Vec<TaskKind> = result.outputs.iter().map(|o| o.task).collect();
        assert_eq!(order, TaskKind::PIPELINE.to_vec());
        assert!(result.outputs.iter().all(TaskOutput::succeeded));
        assert_eq!(provider.prompts().len(), 5);
    }

    #[tokio::test]
    async fn test_prompts_carry_tools_and_dependencies() {
        let provider = ScriptedProvider::new(None);
        let crew = RiskCrew::uniform(provider.clone(), tools());
        crew.run("Budget outlook?", "ERP Implementation").await.unwrap();

        let prompts = provider.prompts();
        let market = &prompts[0];
        assert!(market.starts_with("You are the Market Analysis Agent."));
        assert!(market.contains("### market_analysis"));
        // no model wired into the registry, so the tool reports an error
        assert!(market.contains("### identify_external_risks"));
        assert!(!market.contains("## Findings From Other Agents"));

        let scoring = &prompts[2];
        assert!(scoring.contains("### Market Analysis (Market Analysis Agent)"));
        assert!(scoring.contains("### Project Status Assessment"));
        assert!(!scoring.contains("### add_risk"));

        let report = &prompts[4];
        assert!(report.contains("### Risk Assessment (Project Risk Manager)"));
        assert!(!report.contains("### Market Analysis ("));
        assert!(report.contains("### generate_risk_report"));
    }

    #[tokio::test]
    async fn test_failed_task_does_not_stop_pipeline() {
        let provider = ScriptedProvider::new(Some("## Task\nAnalyze market conditions"));
        let crew = RiskCrew::uniform(provider.clone(), tools());

        let result = crew.run("Any risks?", "Cloud Migration").await.unwrap();
        assert!(!result.outputs[0].succeeded());
        assert!(result.outputs[1..].iter().all(TaskOutput::succeeded));
        assert!(provider.prompts()[2].contains("Market Analysis could not be completed"));
    }

    #[tokio::test]
    async fn test_failed_report_fails_run() {
        let provider = ScriptedProvider::new(Some("## Task\nBased on the comprehensive"));
        let crew = RiskCrew::uniform(provider, tools());

        let err = crew.run("Any risks?", "Cloud Migration").await.unwrap_err();
        assert!(matches!(err, RiskError::Task { ref task, .. } if task == "generate_risk_report"));
    }

    #[test]
    fn test_new_requires_every_agent() {
        let mut providers = AgentProviders::new();
        providers.insert(
            AgentId::RiskManager,
            ScriptedProvider::new(None) as SharedProvider,
        );
        assert!(matches!(
            RiskCrew::new(providers, tools()),
            Err(RiskError::Config(_))
        ));
    }

    #[test]
    fn test_disabled_llm_has_no_providers() {
        let config = LlmConfig {
            provider: "none".to_string(),
            ..LlmConfig::default()
        };
        assert!(build_agent_providers(&config).unwrap().is_none());
    }
}
