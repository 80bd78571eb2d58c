use crate::services::llm::{GenerationConfig, LlmClient};
use log::warn;

/// The fixed guideline block appended by the deterministic fallback path.
pub const PROMPT_GUIDELINES: [&str; 4] = [
    "Use English for any text or UI elements in the image to avoid garbled characters.",
    "Maintain consistent character appearances if characters are mentioned.",
    "Apply cinematic composition with clear focal points.",
    "Ensure proper depth and atmospheric perspective.",
];

/// Meta-instruction for the Tier 1 rewrite call: asks the text model to
/// translate style/characters to English and weave everything into one
/// polished image prompt.
pub fn build_rewrite_instruction(
    visual_style: &str,
    characters: &[String],
    panel_text: &str,
    scene_description: &str,
) -> String {
    let characters_text = if characters.is_empty() {
        String::new()
    } else {
        let list = characters
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {}", i + 1, c))
            .collect::<Vec<_>>()
            .join("\n");
        format!("\nCHARACTERS:\n{}", list)
    };

    format!(
        r#"You are a professional image prompt engineer for AI image generation. Your task is to create a high-quality English prompt for generating a comic book panel image.

VISUAL STYLE:
{visual_style}
{characters_text}

PANEL NARRATIVE TEXT:
{panel_text}

SCENE DESCRIPTION:
{scene_description}

YOUR TASK:
Create a professional English image generation prompt that:
1. Starts with the visual style (translate to English if needed)
2. Describes the scene with specific visual details
3. Naturally integrates character descriptions and actions into the scene (like: "Character Name (description) is doing action")
4. Includes mood, lighting, and atmosphere
5. Adds camera angle/composition suggestions
6. Ensures all text is in English to avoid garbled characters

IMPORTANT FORMAT EXAMPLE:
"Watercolor children's book style, warm and soft color palette, rounded brush strokes, 4k resolution, aspect ratio 4:3. Bedroom scene, morning light streaming through window. Duoduo (5-year-old Chinese girl with flower hair clip, wearing colorful dress) is jumping excitedly on her bed. Bright, cheerful atmosphere. Medium shot, slightly low angle."

OUTPUT ONLY THE FINAL ENGLISH PROMPT (no explanations, no quotes):"#,
        visual_style = visual_style,
        characters_text = characters_text,
        panel_text = panel_text,
        scene_description = scene_description,
    )
}

/// Tier 2: deterministic concatenation of style, characters, scene and
/// the fixed guidelines. No network; always succeeds.
pub fn fallback_image_prompt(
    scene_description: &str,
    visual_style: &str,
    characters: &[String],
) -> String {
    let style = format!("{}, 4k resolution, aspect ratio 4:3.", visual_style);

    let characters_str = if characters.is_empty() {
        String::new()
    } else {
        format!("{}.", characters.join(", "))
    };

    let guidelines = PROMPT_GUIDELINES.join(" ");

    [style, characters_str, scene_description.to_string(), guidelines]
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strips one matching pair of surrounding quote characters, the way the
/// rewrite model likes to wrap its answer.
fn strip_wrapping_quotes(s: &str) -> &str {
    let s = s.trim();
    let s = s.strip_prefix('"').unwrap_or(s);
    let s = s.strip_suffix('"').unwrap_or(s);
    let s = s.strip_prefix('\'').unwrap_or(s);
    s.strip_suffix('\'').unwrap_or(s)
}

/// Produces the final image prompt for one panel. Tries the AI-assisted
/// rewrite first; any failure (or an empty rewrite) silently degrades to
/// the deterministic fallback. This function never fails: a Tier 1
/// failure is a quality loss, not a user-facing error.
pub async fn synthesize_image_prompt(
    llm: &dyn LlmClient,
    visual_style: &str,
    characters: &[String],
    panel_text: &str,
    scene_description: &str,
) -> String {
    let instruction =
        build_rewrite_instruction(visual_style, characters, panel_text, scene_description);

    match llm
        .generate(&instruction, &GenerationConfig::prompt_rewrite())
        .await
    {
        Ok(rewritten) => {
            let cleaned = strip_wrapping_quotes(&rewritten).to_string();
            if cleaned.is_empty() {
                warn!("Prompt rewrite returned empty output, using fallback");
                fallback_image_prompt(scene_description, visual_style, characters)
            } else {
                cleaned
            }
        }
        Err(e) => {
            warn!("Prompt rewrite failed ({}), using fallback", e);
            fallback_image_prompt(scene_description, visual_style, characters)
        }
    }
}
