//! Delegation prompt rendering.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::conversation::ConversationId;

const DELEGATE_TEMPLATE: &str = include_str!("prompts/delegate.md");
const DESCRIPTION_CHARS: usize = 50;

/// Parameters handed to the agent runner when delegating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegationRequest {
    pub subagent_type: String,
    pub description: String,
    pub prompt: String,
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("delegate", DELEGATE_TEMPLATE)
            .context("load delegate template")?;
        Ok(Self { env })
    }

    fn render_delegate(
        &self,
        workspace: &str,
        conversation_id: Option<ConversationId>,
        task: &str,
    ) -> Result<String> {
        let template = self.env.get_template("delegate")?;
        let rendered = template.render(context! {
            workspace => workspace,
            conversation_id => conversation_id.map(|id| id.to_string()),
            task => task.trim(),
        })?;
        Ok(rendered)
    }
}

/// Build the delegation triple for `agent`, pinning it to `workspace`.
pub fn build_delegation(
    agent: &str,
    task: &str,
    workspace: &str,
    conversation_id: Option<ConversationId>,
) -> Result<DelegationRequest> {
    let engine = PromptEngine::new()?;
    let prompt = engine
        .render_delegate(workspace, conversation_id, task)
        .context("render delegate prompt")?;
    Ok(DelegationRequest {
        subagent_type: agent.to_string(),
        description: task.chars().take(DESCRIPTION_CHARS).collect(),
        prompt,
    })
}
