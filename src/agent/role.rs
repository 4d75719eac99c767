use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// Words too common in personas to say anything about who should take a task
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "your", "you", "are", "into", "them",
    "their", "which", "what", "who", "will", "have", "has", "about", "write", "task", "please",
    "using", "manager", "work",
];

/// Persona of an agent: what it is called, what it tries to achieve, and who it is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRole {
    /// Role name, e.g. "Online Researcher". Unique within a crew.
    pub name: String,
    pub goal: String,
    pub backstory: String,
}

impl AgentRole {
    pub fn new(name: impl Into<String>, goal: impl Into<String>, backstory: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }

    /// Get a human-readable description of the role
    pub fn get_description(&self) -> String {
        format!("{}: {}", self.name, self.goal)
    }

    /// Case-insensitive comparison against the role name
    pub fn is_named(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }

    /// Significant words from the role name and goal, used for delegation routing
    pub fn keywords(&self) -> BTreeSet<String> {
        keywords(&format!("{} {}", self.name, self.goal))
    }
}

/// Lowercased alphanumeric words of three or more letters, minus stopwords
pub fn keywords(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}
