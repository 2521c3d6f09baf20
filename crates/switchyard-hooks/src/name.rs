//! The closed set of hook names (§4.F).

use std::fmt;

use serde::{Deserialize, Serialize};

/// One point in the pipeline a plugin may intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookName {
    /// Before a work item is persisted.
    WorkItemPreCreate,
    /// After a work item is persisted.
    WorkItemPostCreate,
    /// Before a dispatch's prompt is assembled.
    RunPrePrompt,
    /// Before an agent model call.
    ModelPreCall,
    /// After an agent model call.
    ModelPostCall,
    /// Before a tool invocation.
    ToolPreExec,
    /// After a tool invocation.
    ToolPostExec,
    /// Before a response is delivered via the Effect Outbox.
    ResponsePreDeliver,
    /// After a response is delivered.
    ResponsePostDeliver,
}

impl HookName {
    /// Stable wire/log name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorkItemPreCreate => "work_item.pre_create",
            Self::WorkItemPostCreate => "work_item.post_create",
            Self::RunPrePrompt => "run.pre_prompt",
            Self::ModelPreCall => "model.pre_call",
            Self::ModelPostCall => "model.post_call",
            Self::ToolPreExec => "tool.pre_exec",
            Self::ToolPostExec => "tool.post_exec",
            Self::ResponsePreDeliver => "response.pre_deliver",
            Self::ResponsePostDeliver => "response.post_deliver",
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_dotted_wire_name() {
        assert_eq!(HookName::ToolPreExec.to_string(), "tool.pre_exec");
        assert_eq!(HookName::ModelPostCall.as_str(), "model.post_call");
    }
}
