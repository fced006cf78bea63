//! Agent definition.

use std::fmt;
use std::sync::Arc;

use serde_json::json;

use desk_tools::{Tool, ToolSpec};

use crate::confirmation::ConfirmationGate;
use crate::hooks::{AgentHooks, NoopHooks};

/// An agent: instructions, a model, tools and the agents it may hand off to.
pub struct Agent {
    name: String,
    instructions: String,
    model: String,
    handoff_description: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    handoffs: Vec<Arc<Agent>>,
    hooks: Arc<dyn AgentHooks>,
    confirmation: Option<Arc<ConfirmationGate>>,
}

impl Agent {
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn handoffs(&self) -> &[Arc<Agent>] {
        &self.handoffs
    }

    pub fn hooks(&self) -> &dyn AgentHooks {
        self.hooks.as_ref()
    }

    pub fn confirmation(&self) -> Option<&ConfirmationGate> {
        self.confirmation.as_deref()
    }

    pub fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Tool name under which other agents reach this one.
    pub fn handoff_tool_name(&self) -> String {
        let snake: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("transfer_to_{snake}")
    }

    pub fn find_handoff(&self, tool_name: &str) -> Option<&Arc<Agent>> {
        self.handoffs
            .iter()
            .find(|a| a.handoff_tool_name() == tool_name)
    }

    fn handoff_spec(&self) -> ToolSpec {
        let mut description = format!(
            "Handoff to the {} agent to handle the request.",
            self.name
        );
        if let Some(extra) = &self.handoff_description {
            description.push(' ');
            description.push_str(extra);
        }
        ToolSpec {
            name: self.handoff_tool_name(),
            description,
            parameters: json!({"type": "object", "properties": {}, "required": []}),
        }
    }

    /// Function specs offered to the model: tools first, then handoffs.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|t| t.spec())
            .chain(self.handoffs.iter().map(|a| a.handoff_spec()))
            .collect()
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field(
                "handoffs",
                &self.handoffs.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field("gated", &self.confirmation.is_some())
            .finish()
    }
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    agent: Agent,
}

impl AgentBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            agent: Agent {
                name: name.into(),
                instructions: String::new(),
                model: String::new(),
                handoff_description: None,
                tools: Vec::new(),
                handoffs: Vec::new(),
                hooks: Arc::new(NoopHooks),
                confirmation: None,
            },
        }
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.agent.instructions = instructions.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.agent.model = model.into();
        self
    }

    /// Shown to other agents in the handoff tool description.
    pub fn handoff_description(mut self, description: impl Into<String>) -> Self {
        self.agent.handoff_description = Some(description.into());
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.agent.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.agent.tools.extend(tools);
        self
    }

    pub fn handoff(mut self, agent: Arc<Agent>) -> Self {
        self.agent.handoffs.push(agent);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn AgentHooks>) -> Self {
        self.agent.hooks = hooks;
        self
    }

    pub fn confirmation(mut self, gate: Arc<ConfirmationGate>) -> Self {
        self.agent.confirmation = Some(gate);
        self
    }

    pub fn build(self) -> Agent {
        self.agent
    }
}
