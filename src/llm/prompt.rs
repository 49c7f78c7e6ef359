//! Estimation prompt

use crate::estimation::TaskType;

pub fn build_prompt(description: &str, task_type: &TaskType) -> String {
    format!(
        r#"You are an expert in agile methodologies and story-point estimation.

Analyze the following task description and estimate how many story points it should receive.

Task description: "{description}"
Task type: "{task_type}"

Consider the following factors in your analysis:
1. Technical complexity
2. Effort required
3. Uncertainty and risk
4. Dependencies

Answer ONLY with one number from the Fibonacci sequence (1, 2, 3, 5, 8, 13, 21) that best represents the story-point estimate for this task.

Your answer must be ONLY the number, without explanations or additional text."#,
        description = description,
        task_type = task_type.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_quotes_inputs() {
        let prompt = build_prompt("Criar tela de login", &TaskType::Feature);
        assert!(prompt.contains(r#"Task description: "Criar tela de login""#));
        assert!(prompt.contains(r#"Task type: "feature""#));
        assert!(prompt.contains("(1, 2, 3, 5, 8, 13, 21)"));
    }
}
