//! Per-review tool dispatch.
//!
//! For every tool run in a job: build the tool with its settings, gate on
//! dependencies, pick a staging strategy, execute, and contain failures so
//! one tool can never take down its siblings. The outcome is a serializable
//! record of what each tool did plus the files with their accumulated
//! comments.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::WorkerConfig;
use crate::repository::GitRepository;
use crate::review::Review;
use crate::stager::{RepositoryStager, StagedRepository};
use crate::tools::{self, Settings, Tool};

/// One requested tool execution within a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRun {
    pub tool: String,
    #[serde(default)]
    pub settings: Settings,
}

/// A review job as delivered by the queue layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewJob {
    pub review: Review,
    pub tool_runs: Vec<ToolRun>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolStatus {
    Completed,
    /// The tool never ran: unknown name or failed dependency check. Not a
    /// failure.
    Skipped { reason: String },
    /// The tool run aborted; no comments were attributed by it.
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool: String,
    #[serde(flatten)]
    pub status: ToolStatus,
}

/// Everything the worker reports back for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub review: Review,
    pub tools: Vec<ToolOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct Worker {
    config: WorkerConfig,
    stager: RepositoryStager,
}

impl Worker {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            stager: RepositoryStager::new(),
        }
    }

    /// Run every tool in the job against the review, in job order.
    pub async fn run_job(&self, job: ReviewJob) -> ReviewOutcome {
        let started_at = Utc::now();
        let mut review = job.review;
        let mut outcomes = Vec::with_capacity(job.tool_runs.len());

        for run in &job.tool_runs {
            let status = self.run_tool(&mut review, run).await;
            tracing::info!(tool = %run.tool, status = ?status, "tool run finished");
            outcomes.push(ToolOutcome {
                tool: run.tool.clone(),
                status,
            });
        }

        ReviewOutcome {
            review,
            tools: outcomes,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn run_tool(&self, review: &mut Review, run: &ToolRun) -> ToolStatus {
        let Some(tool) = tools::create_tool(&run.tool, &run.settings) else {
            return ToolStatus::Skipped {
                reason: format!("unknown tool `{}`", run.tool),
            };
        };

        if !tool.check_dependencies() {
            tracing::debug!(tool = tool.name(), "dependency check failed, skipping");
            return ToolStatus::Skipped {
                reason: "missing external dependencies".to_string(),
            };
        }

        let staged = match self.stage(review, tool.as_ref()).await {
            Ok(staged) => staged,
            Err(message) => return ToolStatus::Failed { message },
        };

        match tool
            .execute(review, &run.settings, Some(staged.path()))
            .await
        {
            Ok(()) => ToolStatus::Completed,
            Err(err) => {
                tracing::error!(tool = tool.name(), error = %err, "tool run failed");
                ToolStatus::Failed {
                    message: err.to_string(),
                }
            }
        }
    }

    async fn stage(&self, review: &mut Review, tool: &dyn Tool) -> Result<StagedRepository, String> {
        if tool.requires_full_repository() {
            let Some(name) = review.repository().map(str::to_string) else {
                return Err(format!(
                    "tool `{}` requires a repository, but the review names none",
                    tool.name()
                ));
            };
            let Some(repo_config) = self.config.repository(&name) else {
                return Err(format!("repository `{name}` is not configured"));
            };

            let repository = GitRepository::new(
                repo_config,
                &self.config.cache_root(),
                &self.config.scratch_root,
            );
            self.stager
                .stage_full_repository(review, &repository)
                .map_err(|err| err.to_string())
        } else {
            self.stager
                .stage_isolated(review)
                .map_err(|err| err.to_string())
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::File;

    fn worker() -> Worker {
        Worker::new(WorkerConfig::default())
    }

    #[tokio::test]
    async fn test_unknown_tool_is_skipped_not_failed() {
        let job = ReviewJob {
            review: Review::new(vec![File::new("a.rs", "")]),
            tool_runs: vec![ToolRun {
                tool: "flake8".into(),
                settings: Settings::new(),
            }],
        };

        let outcome = worker().run_job(job).await;
        assert_eq!(outcome.tools.len(), 1);
        match &outcome.tools[0].status {
            ToolStatus::Skipped { reason } => assert!(reason.contains("unknown tool")),
            other => panic!("expected Skipped, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_full_repository_tool_without_repository_does_not_complete() {
        let job = ReviewJob {
            review: Review::new(vec![File::new("src/main.rs", "fn main() {}\n")]),
            tool_runs: vec![ToolRun {
                tool: "clippy".into(),
                settings: Settings::new(),
            }],
        };

        let outcome = worker().run_job(job).await;
        // Failed when clippy is installed (no repository to stage), skipped
        // when it is not; never completed, never commented.
        assert_ne!(outcome.tools[0].status, ToolStatus::Completed);
        assert!(outcome.review.files()[0].comments().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_repository_fails_the_tool_run() {
        let mut review = Review::new(vec![File::new("src/main.rs", "")]);
        review = review.with_repository("ghost", None);
        let run = ToolRun {
            tool: "clippy".into(),
            settings: Settings::new(),
        };

        let worker = worker();
        let tool = tools::create_tool("clippy", &run.settings).unwrap();
        if !tool.check_dependencies() {
            eprintln!("clippy not installed, skipping");
            return;
        }

        let status = worker.run_tool(&mut review, &run).await;
        match status {
            ToolStatus::Failed { message } => assert!(message.contains("ghost")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_job_payload_round_trip() {
        let json = r#"{
            "review": {
                "review_id": "r-1",
                "files": [{"dest_path": "a.sh", "patched_content": "echo hi\n"}]
            },
            "tool_runs": [
                {"tool": "shellcheck", "settings": {"file_extensions": "sh, zsh"}},
                {"tool": "rustfmt"}
            ]
        }"#;
        let job: ReviewJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.tool_runs.len(), 2);
        assert_eq!(
            job.tool_runs[0].settings.get("file_extensions").unwrap(),
            "sh, zsh"
        );
        assert!(job.tool_runs[1].settings.is_empty());
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let outcome = ReviewOutcome {
            review: Review::new(vec![]),
            tools: vec![ToolOutcome {
                tool: "rustfmt".into(),
                status: ToolStatus::Skipped {
                    reason: "missing external dependencies".into(),
                },
            }],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["tools"][0]["tool"], "rustfmt");
        assert_eq!(json["tools"][0]["status"], "skipped");
        assert!(json["tools"][0]["reason"]
            .as_str()
            .unwrap()
            .contains("dependencies"));
    }
}
