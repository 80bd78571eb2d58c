use crate::core::error::{GenerationError, GenerationResult};
use crate::core::state::{ComicPanel, Story};
use crate::utils::language::Language;
use serde::Deserialize;
use serde_json::Value;

/// How many panels to ask for, and the hard cap enforced after the fact.
/// The range is advisory (embedded in the instructions as a target); only
/// `max_panels` is enforced, by truncation in the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelBudget {
    pub target_range: &'static str,
    pub max_panels: usize,
}

/// Short stories get 8-10 panels, long ones 15-20. The 1500-character
/// cutoff is inclusive on the low side.
pub fn compute_budget(char_count: usize) -> PanelBudget {
    if char_count <= 1500 {
        PanelBudget {
            target_range: "8-10",
            max_panels: 10,
        }
    } else {
        PanelBudget {
            target_range: "15-20",
            max_panels: 20,
        }
    }
}

/// The instruction block for the story decomposition call, plus the cap
/// the normalizer must enforce on the answer.
#[derive(Debug, Clone)]
pub struct StoryPrompt {
    pub text: String,
    pub max_panels: usize,
}

/// Builds the decomposition instructions: narrative fields in the user's
/// language, image prompts in English, age-band vocabulary rules, a
/// visual style statement, 3-5 characters, and the JSON output schema.
/// Pure templating; building never fails.
pub fn build_story_prompt(story_text: &str, keywords: &[String], language: Language) -> StoryPrompt {
    let budget = compute_budget(story_text.chars().count());
    let language_name = language.name();

    let keywords_text = if keywords.is_empty() {
        String::new()
    } else {
        format!(
            "\nAdditional keywords/themes to emphasize: {}",
            keywords.join(", ")
        )
    };

    let text = format!(
        r#"You are a master storyteller and comic book writer with expertise in visual narrative structure. Your task is to transform the user's story into an engaging, visually-rich comic book narrative.

USER'S STORY:
{story_text}
{keywords_text}

IMPORTANT LANGUAGE INSTRUCTION:
- The user's input language is: **{language_name}**
- Output visualStyle, characters descriptions, optimizedStory, and panel text in **{language_name}**
- ONLY the imagePrompt field should be in English (for image generation API)

YOUR TASK:
1. **Design Visual Style**: Based on the story's theme, mood, and setting, create a unique visual style description IN THE USER'S INPUT LANGUAGE. This should be a concise statement (1-2 sentences) that defines:
   - Art style (e.g., "watercolor children's book style")
   - Color palette and mood (e.g., "warm pastel tones")
   - Technical details (e.g., "soft brush strokes")
   - Any cultural or thematic aesthetics

2. **Enhance the Story**: Transform this story into a captivating narrative with rich sensory details, distinct personalities, engaging dialogue, and a clear arc with tension and resolution.
   - **AGE-APPROPRIATE CONTENT**: Analyze the story to determine the target age group (3-5 years, 6-8 years, 9-12 years, or 12+ teens/adults)
   - **VOCABULARY MATCHING**: Use vocabulary and sentence complexity appropriate for the target age:
     * Ages 3-5: Simple words, short sentences (5-8 words), concrete concepts
     * Ages 6-8: Basic vocabulary, medium sentences (8-12 words), simple emotions
     * Ages 9-12: Moderate vocabulary, varied sentence length, complex emotions
     * Ages 12+ (Teens/Adults): Advanced vocabulary, complex sentences, abstract concepts, mature themes

3. **Extract Key Characters**: Identify 3-5 main characters and provide detailed visual descriptions IN THE USER'S INPUT LANGUAGE for each:
   - Physical appearance (age, build, distinctive features) - MATCH CHARACTER AGE TO TARGET AUDIENCE
   - Clothing/costume style appropriate for character age
   - Key visual characteristics that make them recognizable

4. **Create Comic Panels**: Break the enhanced story into {target_range} panels (maximum {max_panels}). For each panel:
   - Write compelling narrative text (2-4 sentences) IN THE USER'S INPUT LANGUAGE, using age-appropriate language
   - Create a detailed image generation prompt IN ENGLISH that includes the visual style (translated to English if needed), the scene with specific visual elements, character descriptions with age-specific details, mood and atmosphere, and camera angle/composition suggestions

IMPORTANT GUIDELINES:
- Each panel should advance the story meaningfully
- Ensure visual variety across panels (different angles, settings, compositions)
- Make image prompts specific and detailed for consistent character appearance
- ALL image prompts (imagePrompt field) must be in English
- Any text/UI elements inside images must be in English to avoid garbled characters
- visualStyle, characters, and panel text must be in the SAME LANGUAGE as the user's input

OUTPUT FORMAT (JSON):
{{
  "visualStyle": "Visual style description in user's input language",
  "optimizedStory": "Brief summary in user's input language",
  "characters": [
    "Character 1 description in user's input language",
    "Character 2 description in user's input language"
  ],
  "panels": [
    {{
      "id": 1,
      "text": "Panel narrative text in user's input language",
      "imagePrompt": "Detailed ENGLISH prompt for image generation"
    }}
  ]
}}

Generate the JSON now:"#,
        story_text = story_text,
        keywords_text = keywords_text,
        language_name = language_name,
        target_range = budget.target_range,
        max_panels = budget.max_panels,
    );

    StoryPrompt {
        text,
        max_panels: budget.max_panels,
    }
}

pub fn strip_code_blocks(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("```json") {
        s.trim_start_matches("```json")
            .trim_end_matches("```")
            .trim()
            .to_string()
    } else if s.starts_with("```") {
        s.trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
            .to_string()
    } else {
        s.to_string()
    }
}

#[derive(Deserialize)]
struct RawStory {
    #[serde(rename = "visualStyle", default)]
    visual_style: String,
    #[serde(rename = "optimizedStory", default)]
    optimized_story: String,
    #[serde(default)]
    characters: Vec<Value>,
    panels: Option<Vec<ComicPanel>>,
}

/// Collapses one character entry into a plain string. The model is asked
/// for strings but drifts into `{name, description}` objects often enough
/// that crashing on them is not an option.
fn normalize_character(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            let name = map.get("name").and_then(Value::as_str);
            let description = map.get("description").and_then(Value::as_str);
            match (name, description) {
                (Some(n), Some(d)) => format!("{}: {}", n, d),
                (Some(n), None) => n.to_string(),
                (None, Some(d)) => d.to_string(),
                (None, None) => value.to_string(),
            }
        }
        other => other.to_string(),
    }
}

/// The single trust boundary between "probably-JSON-shaped prose" and a
/// typed `Story`. Strips code fences, parses, requires `panels`, caps the
/// panel count at `max_panels` (order-preserving truncation), and
/// collapses structured character entries to plain strings. Anything
/// unparseable is a `MalformedResponse` carrying the raw text; no default
/// story is ever substituted.
pub fn normalize_story_response(raw: &str, max_panels: usize) -> GenerationResult<Story> {
    let clean = strip_code_blocks(raw);

    let parsed: RawStory =
        serde_json::from_str(&clean).map_err(|e| GenerationError::MalformedResponse {
            reason: e.to_string(),
            raw: raw.to_string(),
        })?;

    let mut panels = parsed
        .panels
        .ok_or_else(|| GenerationError::MalformedResponse {
            reason: "missing `panels` array".to_string(),
            raw: raw.to_string(),
        })?;

    if panels.len() > max_panels {
        log::warn!(
            "Model returned {} panels, truncating to {}",
            panels.len(),
            max_panels
        );
        panels.truncate(max_panels);
    }

    let characters = parsed.characters.iter().map(normalize_character).collect();

    Ok(Story {
        visual_style: parsed.visual_style,
        optimized_story: parsed.optimized_story,
        characters,
        panels,
    })
}
