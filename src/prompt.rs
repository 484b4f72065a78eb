//! Instruction text sent with every generation request.

use crate::exchange::{CANDIDATE_COUNT, DetailLevel, Tone};

/// Builds the system instruction for the given style choices.
///
/// The tone and detail labels are embedded verbatim so the service sees
/// `Tone preference: Academic` rather than an enum discriminant.
pub fn system_instruction(tone: Tone, detail: DetailLevel) -> String {
    format!(
        r#"You are an expert AI prompt engineer specializing in creating optimized, reusable prompts.

When given a user request, you:
1. Understand the core objective and desired output
2. Create {count} distinct, highly-optimized prompts that achieve the goal
3. Structure each prompt with: clear role → specific task → context → constraints → expected output format
4. Ensure reusability across Claude, GPT, Gemini, and other models
5. Add specific techniques: role-playing, chain-of-thought, structured output

Tone preference: {tone}
Detail level: {detail}

Output ONLY valid JSON with this structure:
{{
  "prompts": [
    {{"title": "Prompt 1 Title", "content": "Full optimized prompt here..."}},
    {{"title": "Prompt 2 Title", "content": "Full optimized prompt here..."}},
    {{"title": "Prompt 3 Title", "content": "Full optimized prompt here..."}}
  ]
}}"#,
        count = CANDIDATE_COUNT,
        tone = tone.label(),
        detail = detail.label(),
    )
}

/// Builds the single user-turn message. The goal is passed through untouched.
pub fn user_message(goal: &str) -> String {
    format!("Generate {} optimized prompts for: {}", CANDIDATE_COUNT, goal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_instruction_embeds_style_labels() {
        let system = system_instruction(Tone::Academic, DetailLevel::Detailed);
        assert!(system.contains("Tone preference: Academic"));
        assert!(system.contains("Detail level: Detailed"));
    }

    #[test]
    fn test_system_instruction_each_tone() {
        for tone in Tone::ALL {
            let system = system_instruction(tone, DetailLevel::Balanced);
            assert!(system.contains(&format!("Tone preference: {}", tone.label())));
        }
    }

    #[test]
    fn test_system_instruction_asks_for_json_only() {
        let system = system_instruction(Tone::Casual, DetailLevel::Concise);
        assert!(system.contains("Output ONLY valid JSON"));
        assert!(system.contains(r#""prompts": ["#));
        // Escaped braces must render as literal JSON braces
        assert!(system.contains(r#"{"title": "Prompt 1 Title""#));
        assert!(!system.contains("{{"));
    }

    #[test]
    fn test_system_instruction_mentions_other_models() {
        let system = system_instruction(Tone::Creative, DetailLevel::Balanced);
        assert!(system.contains("Claude, GPT, Gemini"));
        assert!(system.contains("clear role → specific task → context → constraints"));
    }

    #[test]
    fn test_user_message_literal() {
        assert_eq!(
            user_message("teach Python DSA step by step with code examples"),
            "Generate 3 optimized prompts for: teach Python DSA step by step with code examples"
        );
    }

    #[test]
    fn test_user_message_keeps_goal_whitespace() {
        assert_eq!(
            user_message("  spaced goal\n"),
            "Generate 3 optimized prompts for:   spaced goal\n"
        );
    }
}
