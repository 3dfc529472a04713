//! Prompts for extraction, card generation and goal refinement, plus the
//! prepared study-goal presets offered in the form.
//!
//! Every prompt lives here so wording changes never touch retry or parsing
//! logic, and so tests can inspect them without a model.

/// System prompt for transcribing an image.
pub const IMAGE_EXTRACTION_PROMPT: &str = r#"Please extract ALL text content from this image. Include:
- All visible text, headings, and labels
- Any structured information (lists, tables, etc.)
- Mathematical formulas or equations
- Preserve the general structure and formatting where possible

Return only the extracted text content without any additional commentary."#;

/// System prompt for transcribing a PDF document.
pub const PDF_EXTRACTION_PROMPT: &str = r#"Please extract ALL text content from this PDF document. Include:
- All visible text, headings, and labels
- Any structured information (lists, tables, etc.)
- Mathematical formulas or equations
- Preserve the general structure and formatting where possible
- Include page breaks or section separators where appropriate

Return only the extracted text content without any additional commentary."#;

/// System prompt for card generation. The user turn carries the text, the
/// goal and the card count (see [`generation_request`]).
pub const GENERATION_SYSTEM_PROMPT: &str = r#"You create study cards suitable for spaced repetition learning (like Anki flashcards).

INSTRUCTIONS:
1. Each card has a clear, concise FRONT (question/prompt) and BACK (answer/explanation)
2. Focus on the most important information related to the learning objective
3. Make questions specific and testable
4. Include context when necessary for clarity
5. Vary question types (definitions, examples, applications, etc.)
6. Use HTML formatting to make the cards more readable and well-structured

HTML FORMATTING GUIDELINES:
- Use <strong> or <b> for important terms, keywords, and emphasis
- Use <em> or <i> for foreign words, scientific names, or subtle emphasis
- Use <br> for line breaks when needed
- Use <ul>/<ol> and <li> for lists and steps
- Use <div class="highlight"> for key concepts that need special attention
- Use <code> for formulas, equations, or technical terms
- Use <blockquote> for quotes or important excerpts
- Keep every card on as few lines as possible

FORMAT YOUR RESPONSE EXACTLY AS:
CARD 1:
FRONT: [Question or prompt with HTML formatting]
BACK: [Answer or explanation with HTML formatting]

CARD 2:
FRONT: [Question or prompt with HTML formatting]
BACK: [Answer or explanation with HTML formatting]

Do not add any text before the first card or after the last one."#;

/// User turn for card generation.
pub fn generation_request(extracted_text: &str, learning_objective: &str, num_cards: usize) -> String {
    format!(
        "Create exactly {num_cards} flashcards from the text below.\n\n\
         EXTRACTED TEXT:\n{extracted_text}\n\n\
         LEARNING OBJECTIVE:\n{learning_objective}"
    )
}

/// System prompt asking for a sharper learning goal.
pub const REFINE_GOAL_PROMPT: &str = r#"Based on a preview of the study material and the user's learning objective, write an enhanced, more specific learning objective.

Answer with the enhanced objective only: one short paragraph, no headings, no lists, no commentary."#;

/// User turn for goal refinement; the text preview is capped at 500 characters.
pub fn refine_goal_request(text: &str, user_objective: &str) -> String {
    let preview: String = text.chars().take(500).collect();
    format!("TEXT PREVIEW:\n{preview}...\n\nUSER'S OBJECTIVE:\n{user_objective}")
}

// ── Presets ──────────────────────────────────────────────────────────────

/// A prepared study goal selectable in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    /// Stable key used in form values and on the command line.
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

/// All prepared study goals, in display order.
pub const PRESETS: &[Preset] = &[
    Preset {
        key: "japanese-vocabulary",
        title: "Japanese Vocabulary (Intermediate)",
        description: r#"Create Japanese vocabulary cards for intermediate students. Only use native Japanese words written in kanji and/or hiragana; skip katakana loanwords, proper names and English words.
- Front: the <strong>word</strong> in large, clear text, without its reading.
- Back: <strong>Reading:</strong> hiragana reading; <strong>Meaning:</strong> English translation(s); <em>Type:</em> part of speech; <strong>Examples:</strong> <ul><li>Japanese sentence → <em>English translation</em></li></ul>; <strong>Collocations:</strong> common phrases; <div class="highlight">usage notes</div>."#,
    },
    Preset {
        key: "spanish-vocabulary",
        title: "Spanish Vocabulary",
        description: r#"Create Spanish vocabulary cards.
- Front: <strong>Spanish word/phrase</strong>
- Back: <strong>English meaning:</strong> translation; <em>Pronunciation:</em> phonetic guide; <strong>Examples:</strong> <ul><li>Spanish sentence → <em>English translation</em></li></ul>; <strong>Gender/Type:</strong> masculine/feminine, verb conjugation, etc.; <div class="highlight">usage notes</div>."#,
    },
    Preset {
        key: "history",
        title: "Historical Facts & Dates",
        description: r#"Create historical flashcards.
- Front: <strong>historical question or event prompt</strong>
- Back: <strong>Date/Period</strong>; <strong>Key Figures</strong>; <strong>What happened</strong>; <strong>Significance</strong>; <strong>Context:</strong> <ul><li>causes</li><li>consequences</li></ul>; <em>Connections:</em> related events."#,
    },
    Preset {
        key: "math",
        title: "Mathematical Formulas",
        description: r#"Create mathematical concept cards.
- Front: <strong>mathematical concept or problem</strong>
- Back: <strong>Formula:</strong> <code>expression</code>; <strong>Where:</strong> <ul><li><code>variable</code> = definition</li></ul>; <strong>When to use</strong>; <strong>Example:</strong> <ol><li>step with <code>calculation</code></li></ol>; <em>Notes:</em> common mistakes."#,
    },
    Preset {
        key: "science",
        title: "Scientific Terms",
        description: r#"Create scientific terminology cards.
- Front: <strong>scientific term or concept</strong>
- Back: <strong>Definition</strong>; <em>Category:</em> field of science; <strong>Key characteristics:</strong> <ul><li>feature</li></ul>; <strong>Examples</strong>; <strong>Related terms</strong>; <div class="highlight">practical significance</div>."#,
    },
    Preset {
        key: "business",
        title: "Business & Finance",
        description: r#"Create business and finance cards.
- Front: <strong>business term or financial concept</strong>
- Back: <strong>Definition</strong>; <strong>Purpose</strong>; <strong>Key components:</strong> <ul><li>element</li></ul>; <strong>Example:</strong> real-world scenario; <strong>Formula:</strong> <code>formula</code> when applicable; <em>Best practices</em>; risk factors."#,
    },
];

/// Look up a preset by key or by title (case-insensitive).
pub fn find_preset(name: &str) -> Option<&'static Preset> {
    let name = name.trim();
    PRESETS
        .iter()
        .find(|p| p.key.eq_ignore_ascii_case(name) || p.title.eq_ignore_ascii_case(name))
}

/// Pick the goal text: explicit text wins, then the preset description.
/// Returns `None` when both are empty.
pub fn resolve_goal(goal: &str, preset: Option<&str>) -> Option<String> {
    let goal = goal.trim();
    if !goal.is_empty() {
        return Some(goal.to_string());
    }
    preset
        .and_then(find_preset)
        .map(|p| p.description.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_request_contains_inputs() {
        let r = generation_request("Capital of France: Paris", "geography facts", 7);
        assert!(r.contains("exactly 7 flashcards"));
        assert!(r.contains("Capital of France: Paris"));
        assert!(r.contains("geography facts"));
    }

    #[test]
    fn system_prompt_describes_line_format() {
        assert!(GENERATION_SYSTEM_PROMPT.contains("FRONT:"));
        assert!(GENERATION_SYSTEM_PROMPT.contains("BACK:"));
        assert!(GENERATION_SYSTEM_PROMPT.contains("CARD 1:"));
    }

    #[test]
    fn refine_request_caps_preview() {
        let text = "x".repeat(2000);
        let r = refine_goal_request(&text, "learn");
        assert!(r.len() < 600, "got {} bytes", r.len());
    }

    #[test]
    fn preset_keys_are_unique() {
        let mut keys: Vec<_> = PRESETS.iter().map(|p| p.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), PRESETS.len());
    }

    #[test]
    fn resolve_goal_prefers_text_then_preset() {
        assert_eq!(resolve_goal(" facts ", Some("math")).as_deref(), Some("facts"));
        assert!(resolve_goal("", Some("Mathematical Formulas"))
            .unwrap()
            .contains("mathematical concept"));
        assert_eq!(resolve_goal("  ", Some("nope")), None);
        assert_eq!(resolve_goal("", None), None);
    }
}
