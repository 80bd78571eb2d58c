use crate::utils::language::Language;
use serde::{Deserialize, Serialize};

/// One story submission, as handed to the decomposition pipeline.
/// `language: None` means "detect from the text".
#[derive(Debug, Clone)]
pub struct StoryInput {
    pub raw_text: String,
    pub keywords: Vec<String>,
    pub language: Option<Language>,
}

/// A decomposed story after normalization. Field names follow the JSON
/// schema the model is instructed to emit, so a serialized `Story`
/// re-parses through the normalizer unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    #[serde(rename = "visualStyle")]
    pub visual_style: String,
    #[serde(rename = "optimizedStory")]
    pub optimized_story: String,
    pub characters: Vec<String>,
    pub panels: Vec<ComicPanel>,
}

/// One comic panel: narrative text in the story's language plus a
/// scene-only English image prompt. Panel ids are model-assigned and
/// not necessarily contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComicPanel {
    pub id: u32,
    pub text: String,
    #[serde(rename = "imagePrompt")]
    pub image_prompt: String,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct WorkflowState {
    pub completed_stories: Vec<String>,
}
