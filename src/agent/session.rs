//! Line-oriented interactive session.
//!
//! Each input line is either a session command or a question for the model.
//! Reading and printing are left to the caller.

use super::{Agent, AgentResponse};
use crate::error::Result;
use crate::model::ModelClient;
use crate::reporter::Reporter;
use crate::types::ReportFormat;
use crate::Analyzer;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Help text for the session commands.
pub const SESSION_HELP: &str = "\
Available commands:
  help                  Show this help message
  status                Show model server and configuration status
  analyze               Analyze the Terraform files in the working directory
  fix <file> <issue>    Ask for a fix to an issue in one file
  quit | exit | q       Leave the session

Anything else is sent to the model as a question, for example:
  Create a VPC with public and private subnets
  What's wrong with my main.tf file?
  How do I use Terraform modules?";

/// What the caller should do with one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// End the session
    Quit,
    /// Nothing to show
    Empty,
    /// Text produced locally
    Text(String),
    /// A model answer
    Answer(AgentResponse),
}

/// One interactive conversation over a working directory.
pub struct Session<'a, C> {
    agent: &'a Agent<C>,
    directory: PathBuf,
}

impl<'a, C: ModelClient> Session<'a, C> {
    /// Start a session whose questions carry `directory` as context.
    #[must_use]
    pub fn new(agent: &'a Agent<C>, directory: impl Into<PathBuf>) -> Self {
        Self {
            agent,
            directory: directory.into(),
        }
    }

    /// The working directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Handle one input line.
    ///
    /// # Errors
    ///
    /// Returns the error of the analysis or model call behind the line. The
    /// session stays usable afterwards.
    pub async fn handle(&self, line: &str) -> Result<Reply> {
        let line = line.trim();
        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(c, r)| (c, r.trim()));

        match command.to_lowercase().as_str() {
            "" => Ok(Reply::Empty),
            "quit" | "exit" | "q" if rest.is_empty() => Ok(Reply::Quit),
            "help" if rest.is_empty() => Ok(Reply::Text(SESSION_HELP.to_string())),
            "status" if rest.is_empty() => Ok(Reply::Text(self.status().await)),
            "analyze" if rest.is_empty() => self.analyze().await.map(Reply::Text),
            "fix" => self.fix(rest).await,
            _ => {
                tracing::debug!(query = %line, "Session question");
                self.agent
                    .ask(line, Some(&self.directory))
                    .await
                    .map(Reply::Answer)
            }
        }
    }

    async fn status(&self) -> String {
        let client = self.agent.client();
        let config = self.agent.config();
        let mut text = String::new();

        let _ = writeln!(text, "Working directory: {}", self.directory.display());
        let _ = writeln!(text, "Configured model: {}", config.model.name);

        if !client.health_check().await {
            let _ = write!(text, "Model server at {} is not answering", client.host());
            return text;
        }
        let _ = writeln!(text, "Model server at {} is up", client.host());

        match client.list_models().await {
            Ok(models) if models.contains(&config.model.name) => {
                let _ = write!(text, "{} installed model(s), configured model available", models.len());
            }
            Ok(models) => {
                let _ = write!(
                    text,
                    "{} installed model(s), '{}' is not installed. Run: ollama pull {}",
                    models.len(),
                    config.model.name,
                    config.model.name
                );
            }
            Err(e) => {
                let _ = write!(text, "Could not list models: {e}");
            }
        }
        text
    }

    async fn analyze(&self) -> Result<String> {
        let config = self.agent.config();
        let analysis = Analyzer::new(config.clone())
            .analyze_directory(&self.directory)
            .await?;
        Reporter::new(config).generate(&analysis, ReportFormat::Text)
    }

    async fn fix(&self, args: &str) -> Result<Reply> {
        let Some((file, issue)) = args
            .split_once(char::is_whitespace)
            .map(|(f, i)| (f, i.trim()))
            .filter(|(_, i)| !i.is_empty())
        else {
            return Ok(Reply::Text("Usage: fix <file> <issue>".to_string()));
        };

        let path = self.directory.join(file);
        self.agent.suggest_fix(&path, issue).await.map(Reply::Answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::TfAgentError;
    use crate::model::MockModelClient;

    fn quiet_client() -> MockModelClient {
        let mut client = MockModelClient::new();
        client.expect_host().return_const("http://localhost:11434".to_string());
        client.expect_generate().never();
        client
    }

    fn plain_config() -> Config {
        let mut config = Config::default();
        config.output.colored = false;
        config
    }

    #[tokio::test]
    async fn test_local_commands() -> crate::Result<()> {
        let agent = Agent::new(quiet_client(), plain_config());
        let session = Session::new(&agent, ".");

        assert_eq!(session.handle("").await?, Reply::Empty);
        assert_eq!(session.handle("   ").await?, Reply::Empty);
        assert_eq!(session.handle("quit").await?, Reply::Quit);
        assert_eq!(session.handle("EXIT").await?, Reply::Quit);
        assert_eq!(session.handle("q").await?, Reply::Quit);
        assert_eq!(session.handle("help").await?, Reply::Text(SESSION_HELP.to_string()));
        assert_eq!(
            session.handle("fix main.tf").await?,
            Reply::Text("Usage: fix <file> <issue>".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_question_goes_to_model_with_context() -> crate::Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tf"), "variable \"region\" {}\n").unwrap();

        let mut client = MockModelClient::new();
        client.expect_host().return_const("http://localhost:11434".to_string());
        client
            .expect_generate()
            .withf(|request| {
                request.prompt.starts_with("User Query: quit now please\n")
                    && request.prompt.contains("FILE: main.tf")
            })
            .times(1)
            .returning(|_| Ok("Sure.".to_string()));

        let agent = Agent::new(client, plain_config());
        let session = Session::new(&agent, dir.path());

        match session.handle("quit now please").await? {
            Reply::Answer(response) => assert_eq!(response.text, "Sure."),
            other => panic!("expected an answer, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_analyze_renders_report() -> crate::Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.tf"),
            "resource \"google_compute_network\" \"vpc\" {\n  name = \"vpc\"\n}\n",
        )
        .unwrap();

        let agent = Agent::new(quiet_client(), plain_config());
        let session = Session::new(&agent, dir.path());

        match session.handle("analyze").await? {
            Reply::Text(report) => {
                assert!(report.contains("google_compute_network.vpc"));
                assert!(report.contains("1 files parsed | 0 failed"));
            }
            other => panic!("expected a report, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_analyze_missing_directory_is_an_error() {
        let agent = Agent::new(quiet_client(), plain_config());
        let session = Session::new(&agent, "/definitely/not/here");

        let result = session.handle("analyze").await;
        assert!(matches!(result, Err(TfAgentError::DirectoryNotFound { .. })));
    }

    #[tokio::test]
    async fn test_status_reports_missing_model() -> crate::Result<()> {
        let mut client = MockModelClient::new();
        client.expect_host().return_const("http://localhost:11434".to_string());
        client.expect_health_check().times(1).returning(|| true);
        client
            .expect_list_models()
            .times(1)
            .returning(|| Ok(vec!["llama3:8b".to_string()]));

        let agent = Agent::new(client, plain_config());
        let session = Session::new(&agent, ".");

        let Reply::Text(text) = session.handle("status").await? else {
            panic!("expected status text");
        };
        assert!(text.contains("Model server at http://localhost:11434 is up"));
        assert!(text.contains("'codellama:7b-instruct' is not installed"));
        Ok(())
    }

    #[tokio::test]
    async fn test_status_when_server_is_down() -> crate::Result<()> {
        let mut client = MockModelClient::new();
        client.expect_host().return_const("http://localhost:11434".to_string());
        client.expect_health_check().times(1).returning(|| false);
        client.expect_list_models().never();

        let agent = Agent::new(client, plain_config());
        let session = Session::new(&agent, ".");

        let Reply::Text(text) = session.handle("status").await? else {
            panic!("expected status text");
        };
        assert!(text.contains("is not answering"));
        Ok(())
    }

    #[tokio::test]
    async fn test_fix_command_uses_working_directory() -> crate::Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tf"), "resource \"aws_s3_bucket\" \"b\" {}\n").unwrap();

        let mut client = MockModelClient::new();
        client.expect_host().return_const("http://localhost:11434".to_string());
        client
            .expect_generate()
            .withf(|request| request.prompt.contains("missing tags") && request.prompt.contains("aws_s3_bucket"))
            .times(1)
            .returning(|_| Ok("```hcl\nresource \"aws_s3_bucket\" \"b\" {\n  tags = {}\n}\n```".to_string()));

        let agent = Agent::new(client, plain_config());
        let session = Session::new(&agent, dir.path());

        match session.handle("fix main.tf missing tags").await? {
            Reply::Answer(response) => assert_eq!(response.code_blocks.len(), 1),
            other => panic!("expected an answer, got {other:?}"),
        }
        Ok(())
    }
}
