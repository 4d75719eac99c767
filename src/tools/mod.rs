pub mod search;
pub mod web_fetch;

#[cfg(test)]
pub(crate) mod test_server;

pub use search::{SearchConfig, SearchResult, WebSearchTool};
pub use web_fetch::{extract_visible_text, FetchConfig, FetchedPage, WebContentFetcher};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolError;
use crate::llm::ToolSpec;

/// A callable capability an agent may invoke mid-generation.
///
/// Tools take a single string input and return text for the model. An empty or
/// useless result is still `Ok` with an explanatory string; `Err` is reserved
/// for actions that could not complete.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Name of the string argument the model fills in
    fn input_name(&self) -> &str {
        "input"
    }

    /// Tools without side effects may have their results reused within a run
    fn has_side_effects(&self) -> bool {
        false
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError>;

    /// Function schema advertised to the model
    fn spec(&self) -> ToolSpec {
        let mut properties = serde_json::Map::new();
        properties.insert(
            self.input_name().to_string(),
            serde_json::json!({ "type": "string" }),
        );
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": [self.input_name()],
            }),
        }
    }
}

/// Ordered set of tools keyed by name. Tools are shared, so cloning a set is cheap.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any tool with the same name
    pub fn insert(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.insert(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<Arc<dyn Tool>> for ToolSet {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Tool>>>(iter: I) -> Self {
        let mut set = ToolSet::new();
        for tool in iter {
            set.insert(tool);
        }
        set
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Pull the string input for `tool` out of the model's raw arguments.
///
/// Models are inconsistent: some send `{"url": "..."}`, some a bare JSON string,
/// some plain text. Anything unrecognised is passed through unchanged.
pub fn extract_input(input_name: &str, arguments: &str) -> String {
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::String(s)) => s,
        Ok(Value::Object(map)) => {
            if let Some(Value::String(s)) = map.get(input_name) {
                return s.clone();
            }
            let strings: Vec<&String> = map
                .values()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            match strings.as_slice() {
                [only] => (*only).clone(),
                _ => arguments.to_string(),
            }
        }
        _ => arguments.to_string(),
    }
}
