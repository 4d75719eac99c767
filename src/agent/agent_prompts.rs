use crate::agent::agent::Agent;
use crate::agent::delegation::{RunScope, DELEGATE_TOOL};
use crate::crew::ExecutionContext;
use crate::llm::ChatMessage;

/// What an agent is asked to do in one run
#[derive(Debug, Clone, Copy)]
pub struct Assignment<'a> {
    pub description: &'a str,
    pub expected_output: Option<&'a str>,
    pub context: &'a ExecutionContext,
}

impl Agent {
    /// Build initial messages for the agent
    pub fn build_initial_messages(&self, assignment: &Assignment<'_>, scope: &RunScope<'_>) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.build_system_prompt(scope)),
            ChatMessage::user(self.build_task_prompt(assignment)),
        ]
    }

    /// Persona, tools and coworkers
    fn build_system_prompt(&self, scope: &RunScope<'_>) -> String {
        let mut prompt = format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role.name, self.role.backstory, self.role.goal
        );

        if self.tools.is_empty() {
            prompt.push_str("\n\nYou have no tools available; answer from your own knowledge and the context given.");
        } else {
            prompt.push_str("\n\nYou have access to the following tools:");
            for tool in self.tools.iter() {
                prompt.push_str(&format!("\n- {}: {}", tool.name(), tool.description()));
            }
        }

        if scope.can_delegate(self) {
            let coworkers: Vec<&str> = scope
                .coworkers_of(self)
                .iter()
                .map(|c| c.role.name.as_str())
                .collect();
            prompt.push_str(&format!(
                "\n\nYou can hand a specific piece of work to a coworker with the {} tool. Coworkers: {}.",
                DELEGATE_TOOL,
                coworkers.join(", ")
            ));
        }

        prompt.push_str("\n\nWhen you have everything you need, reply with your complete final answer as plain text.");
        prompt
    }

    /// Task description, acceptance criteria and prior outputs
    fn build_task_prompt(&self, assignment: &Assignment<'_>) -> String {
        let mut prompt = format!("Current Task: {}", assignment.description.trim());

        if let Some(expected) = assignment.expected_output {
            prompt.push_str(&format!(
                "\n\nThis is the expected criteria for your final answer: {}\n\
                 You MUST return the actual complete content as the final answer, not a summary.",
                expected.trim()
            ));
        }

        if !assignment.context.is_empty() {
            prompt.push_str("\n\nThis is the context you're working with:\n");
            prompt.push_str(&assignment.context.render());
        }

        prompt
    }
}
