//! Task instruction blocks and prompt assembly.
//!
//! Each task gets a fixed instruction block and its own sampling
//! temperature: analytical tasks run cold, conversation runs warmer.

use heliolab_core::knowledge::ScoredEntry;
use heliolab_core::prompt::{AugmentedPrompt, Snippet, Task};
use heliolab_core::session::Turn;

/// The system instruction block for a task.
pub fn instructions_for(task: Task) -> &'static str {
    match task {
        Task::Chat => {
            "You are an assistant specializing in solar photovoltaic (PV) laboratory \
             testing and certification. You have expertise in IEC 61215, IEC 61730, \
             UL 1703 and related PV standards, module testing procedures, test \
             equipment operation and calibration, data analysis and quality control. \
             Provide accurate, safety-conscious guidance and reference the relevant \
             standards when applicable. Be clear and concise."
        }
        Task::Analyze => {
            "You are a data analysis expert for solar PV laboratory testing. Identify \
             anomalies and outliers in test data, detect trends and patterns, provide \
             statistical insight, suggest root causes for unexpected results and \
             recommend corrective actions. Provide quantitative analysis when possible \
             and explain your reasoning."
        }
        Task::Review => {
            "You are a quality assurance specialist for solar PV test reports. Check \
             completeness of the report, verify compliance with the applicable \
             standards, identify errors or inconsistencies and suggest improvements. \
             Be thorough and flag any issue that could affect certification."
        }
        Task::Troubleshoot => {
            "You are a troubleshooting expert for solar PV laboratory equipment and \
             testing. Diagnose the reported problem, identify likely root causes, \
             provide step-by-step corrective actions and suggest preventive measures. \
             Prioritize safety and give practical, actionable guidance."
        }
        Task::Decide => {
            "You are a decision support advisor for solar PV laboratory operations. \
             Evaluate the options objectively against the stated criteria, assess \
             risks and benefits, and give an evidence-based recommendation with clear \
             reasoning."
        }
        Task::Insight => {
            "You are an insights analyst for solar PV laboratory operations. Survey \
             the described data scope for trends, anomalies, predictions and \
             recommendations, and summarize the most actionable findings."
        }
    }
}

/// Sampling temperature per task. Review runs coldest, chat warmest.
pub fn temperature_for(task: Task) -> f32 {
    match task {
        Task::Chat => 0.7,
        Task::Analyze => 0.3,
        Task::Review => 0.2,
        Task::Troubleshoot => 0.5,
        Task::Decide => 0.4,
        Task::Insight => 0.6,
    }
}

/// Assemble the structured prompt for one exchange.
pub fn assemble(
    task: Task,
    history: &[Turn],
    retrieved: &[ScoredEntry],
    user_message: &str,
) -> AugmentedPrompt {
    AugmentedPrompt {
        instructions: instructions_for(task).to_string(),
        history: history.to_vec(),
        snippets: retrieved
            .iter()
            .map(|scored| Snippet {
                topic: scored.entry.topic.clone(),
                category: scored.entry.category,
                body: scored.entry.body.clone(),
            })
            .collect(),
        user_message: user_message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heliolab_core::knowledge::{Category, KnowledgeEntry};

    #[test]
    fn every_task_has_distinct_instructions() {
        let tasks = [
            Task::Chat,
            Task::Analyze,
            Task::Review,
            Task::Troubleshoot,
            Task::Decide,
            Task::Insight,
        ];
        for (i, a) in tasks.iter().enumerate() {
            for b in &tasks[i + 1..] {
                assert_ne!(instructions_for(*a), instructions_for(*b));
            }
        }
    }

    #[test]
    fn review_runs_colder_than_chat() {
        assert!(temperature_for(Task::Review) < temperature_for(Task::Analyze));
        assert!(temperature_for(Task::Analyze) < temperature_for(Task::Chat));
    }

    #[test]
    fn assemble_folds_snippets() {
        let retrieved = vec![ScoredEntry {
            entry: KnowledgeEntry {
                topic: "iec_61215".into(),
                category: Category::Standard,
                keywords: vec![],
                body: "Design qualification for crystalline silicon modules".into(),
            },
            score: 0.9,
        }];
        let prompt = assemble(Task::Chat, &[], &retrieved, "What is IEC 61215?");
        assert_eq!(prompt.snippets.len(), 1);
        assert_eq!(prompt.snippets[0].topic, "iec_61215");
        assert!(prompt.system_text().contains("[Reference Material]"));
    }
}
