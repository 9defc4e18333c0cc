use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::console::Console;
use crate::error::Result;
use crate::fallback;
use crate::formatter::IssueDraft;

/// Why an issue could not be created. Recovered by local fallback.
#[derive(Error, Debug)]
pub enum DeliveryFailure {
    #[error("tracker returned HTTP {code}: {hint}")]
    Status {
        code: u16,
        hint: &'static str,
        body: String,
    },

    #[error("could not reach the tracker: {0}")]
    Transport(String),

    #[error("could not encode the issue: {0}")]
    Encoding(String),
}

#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered,
    Failed {
        failure: DeliveryFailure,
        saved_to: PathBuf,
    },
}

/// Provide helpful hints based on HTTP status code
fn status_hint(code: u16) -> &'static str {
    match code {
        200 | 202 => "issue was not created",
        401 => "check your GitHub token",
        403 => "token lacks permission to open issues, or rate limited",
        404 => "repository not found or not visible to this token",
        410 => "issues are disabled for this repository",
        422 => "issue was rejected by validation",
        _ => "unexpected error",
    }
}

/// Client for the tracker's create-issue endpoint.
#[derive(Debug, Clone)]
pub struct IssueTracker {
    agent: ureq::Agent,
    api_base: String,
}

impl IssueTracker {
    /// `timeout` bounds the whole request; expiry is a transport failure.
    pub fn new(api_base: &str, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn issues_url(&self, repo: &str) -> String {
        format!("{}/repos/{}/issues", self.api_base, repo)
    }

    /// Single attempt, no retry. Only HTTP 201 counts as success.
    pub fn create_issue(
        &self,
        repo: &str,
        token: &str,
        draft: &IssueDraft,
    ) -> std::result::Result<(), DeliveryFailure> {
        let json_body =
            serde_json::to_string(draft).map_err(|e| DeliveryFailure::Encoding(e.to_string()))?;

        let response = self
            .agent
            .post(&self.issues_url(repo))
            .set("Authorization", &format!("token {token}"))
            .set("Accept", "application/vnd.github+json")
            .set("Content-Type", "application/json")
            .send_string(&json_body);

        match response {
            Ok(resp) if resp.status() == 201 => Ok(()),
            Ok(resp) => {
                let code = resp.status();
                Err(DeliveryFailure::Status {
                    code,
                    hint: status_hint(code),
                    body: resp.into_string().unwrap_or_default(),
                })
            }
            Err(ureq::Error::Status(code, resp)) => Err(DeliveryFailure::Status {
                code,
                hint: status_hint(code),
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(t)) => Err(DeliveryFailure::Transport(t.to_string())),
        }
    }
}

/// Create the issue, or save it under `fallback_dir` if that fails.
///
/// Tells the user which path was taken. Only a failed local write is an error.
pub fn deliver(
    tracker: &IssueTracker,
    draft: &IssueDraft,
    repo: &str,
    token: &str,
    fallback_dir: &Path,
    console: &mut dyn Console,
) -> Result<DeliveryOutcome> {
    let failure = match tracker.create_issue(repo, token, draft) {
        Ok(()) => {
            tracing::info!(%repo, title = %draft.title, "issue created");
            console.say("green", "Issue reported successfully!");
            return Ok(DeliveryOutcome::Delivered);
        }
        Err(failure) => failure,
    };

    tracing::warn!(%repo, error = %failure, "issue delivery failed");
    match &failure {
        DeliveryFailure::Status { code, hint, body } => {
            console.say("red", &format!("Failed to report issue: {code} ({hint})"));
            if !body.is_empty() {
                console.say("", body);
            }
        }
        DeliveryFailure::Transport(reason) => {
            console.say("red", &format!("Failed to connect to GitHub: {reason}"));
        }
        DeliveryFailure::Encoding(reason) => {
            console.say("red", &format!("Failed to report issue: {reason}"));
        }
    }

    let saved_to = fallback::persist_locally(fallback_dir, draft)?;
    console.say(
        "yellow",
        &format!("Error report saved locally as '{}'.", saved_to.display()),
    );
    Ok(DeliveryOutcome::Failed { failure, saved_to })
}
