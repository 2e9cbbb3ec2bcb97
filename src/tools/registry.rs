use super::traits::{Tool, ToolSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// Startup-built lookup table of tools. Registration order is kept so the
/// prompt lists tools the same way every time.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if let Some(&index) = self.by_name.get(&name) {
            self.tools[index] = tool;
        } else {
            self.by_name.insert(name, self.tools.len());
            self.tools.push(tool);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&index| &self.tools[index])
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec()).collect()
    }

    /// Numbered tool list embedded in the agent system prompt.
    pub fn tools_prompt(&self) -> String {
        self.tools
            .iter()
            .enumerate()
            .map(|(index, tool)| {
                let params = tool
                    .parameters_schema()
                    .get("properties")
                    .and_then(serde_json::Value::as_object)
                    .map(|props| props.keys().cloned().collect::<Vec<_>>().join(", "))
                    .unwrap_or_default();
                format!("{}. {}({params}) - {}", index + 1, tool.name(), tool.description())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
