use crate::core::config::Config;
use crate::core::io::Storage;
use crate::core::state::{Story, StoryInput, WorkflowState};
use crate::services::export::render_story_html;
use crate::services::image::{encode_data_uri, ImageClient};
use crate::services::llm::{GenerationConfig, LlmClient};
use crate::services::prompt::synthesize_image_prompt;
use crate::services::story::{build_story_prompt, normalize_story_response};
use crate::utils::language::{detect_language, Language};
use anyhow::{Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub struct WorkflowManager {
    config: Config,
    story_llm: Box<dyn LlmClient>,
    prompt_llm: Box<dyn LlmClient>,
    image_client: Box<dyn ImageClient>,
    storage: Arc<dyn Storage>,
    state: WorkflowState,
}

impl WorkflowManager {
    pub async fn new(
        config: Config,
        story_llm: Box<dyn LlmClient>,
        prompt_llm: Box<dyn LlmClient>,
        image_client: Box<dyn ImageClient>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        let state = Self::load_state(&config.build_folder, storage.as_ref()).await?;
        Ok(Self {
            config,
            story_llm,
            prompt_llm,
            image_client,
            storage,
            state,
        })
    }

    async fn load_state(build_folder: &str, storage: &dyn Storage) -> Result<WorkflowState> {
        let path = format!("{}/state.json", build_folder);
        if storage.exists(&path).await? {
            let data = storage.read(&path).await?;
            Ok(serde_json::from_slice(&data).context("Failed to parse state.json")?)
        } else {
            Ok(WorkflowState::default())
        }
    }

    async fn save_state(&self) -> Result<()> {
        let path = format!("{}/state.json", self.config.build_folder);
        self.storage
            .write(&path, serde_json::to_string_pretty(&self.state)?.as_bytes())
            .await
    }

    /// Processes every `.txt` story in the input folder that has not been
    /// completed yet. A story that fails leaves its cached artifacts in
    /// the build folder, so the next run resumes where it stopped.
    pub async fn run(&mut self) -> Result<()> {
        let mut entries = self.storage.list(&self.config.input_folder).await?;
        entries.retain(|e| e.ends_with(".txt"));
        entries.sort();

        if entries.is_empty() {
            warn!("No .txt stories found in {}", self.config.input_folder);
            return Ok(());
        }

        for entry in entries {
            let stem = Path::new(&entry)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| entry.clone());

            if self.state.completed_stories.contains(&stem) {
                info!("Skipping completed story: {}", stem);
                continue;
            }

            println!("Processing story: {}", stem);
            self.process_story(&entry, &stem)
                .await
                .with_context(|| format!("Failed to process story {}", stem))?;

            self.state.completed_stories.push(stem);
            self.save_state().await?;
        }

        Ok(())
    }

    async fn process_story(&self, input_path: &str, stem: &str) -> Result<()> {
        let raw = self.storage.read(input_path).await?;
        let raw_text = String::from_utf8(raw).context("Story file is not valid UTF-8")?;

        let input = StoryInput {
            raw_text,
            keywords: self.config.keywords.clone(),
            language: self
                .config
                .language
                .as_deref()
                .and_then(Language::from_code),
        };

        let build_dir = format!("{}/{}", self.config.build_folder, stem);
        let story = self.decompose(&input, &build_dir).await?;
        let images = self.generate_panel_images(&story, &build_dir).await?;

        let html = render_story_html(stem, &story, &images);
        let output_path = format!("{}/{}.html", self.config.output_folder, stem);
        self.storage.write(&output_path, html.as_bytes()).await?;
        info!("Exported {}", output_path);

        Ok(())
    }

    /// Runs the story decomposition call, or reuses the cached result
    /// from an earlier interrupted run.
    async fn decompose(&self, input: &StoryInput, build_dir: &str) -> Result<Story> {
        let story_path = format!("{}/story.json", build_dir);
        if self.storage.exists(&story_path).await? {
            info!("Reusing cached decomposition: {}", story_path);
            let data = self.storage.read(&story_path).await?;
            return serde_json::from_slice(&data).context("Failed to parse cached story.json");
        }

        let language = input
            .language
            .unwrap_or_else(|| detect_language(&input.raw_text));
        info!("Story language: {}", language.name());

        let prompt = build_story_prompt(&input.raw_text, &input.keywords, language);
        let response = self
            .story_llm
            .generate(&prompt.text, &GenerationConfig::story())
            .await?;
        let story = normalize_story_response(&response, prompt.max_panels)?;
        info!(
            "Decomposed into {} panels, {} characters",
            story.panels.len(),
            story.characters.len()
        );

        self.storage
            .write(&story_path, serde_json::to_string_pretty(&story)?.as_bytes())
            .await?;
        Ok(story)
    }

    /// Generates one image per panel, concurrently up to the configured
    /// limit. Panels depend only on the finalized story, never on each
    /// other. Already-cached panels are not regenerated.
    async fn generate_panel_images(
        &self,
        story: &Story,
        build_dir: &str,
    ) -> Result<HashMap<u32, String>> {
        let pb = ProgressBar::new(story.panels.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("#>-"),
        );

        let prompt_llm = self.prompt_llm.as_ref();
        let image_client = self.image_client.as_ref();
        let storage = &self.storage;
        let story_ref = story;

        let results: Vec<Result<(u32, Vec<u8>)>> =
            futures_util::stream::iter(story.panels.iter())
                .map(|panel| {
                    let panel_path = format!("{}/panel_{:02}.png", build_dir, panel.id);
                    let pb = pb.clone();
                    let storage = storage.clone();
                    async move {
                        let bytes = if storage.exists(&panel_path).await? {
                            storage.read(&panel_path).await?
                        } else {
                            let final_prompt = synthesize_image_prompt(
                                prompt_llm,
                                &story_ref.visual_style,
                                &story_ref.characters,
                                &panel.text,
                                &panel.image_prompt,
                            )
                            .await;
                            let payload = image_client.generate_image(&final_prompt).await?;
                            let bytes = payload.decode()?;
                            storage.write(&panel_path, &bytes).await?;
                            bytes
                        };
                        pb.inc(1);
                        Ok((panel.id, bytes))
                    }
                })
                .buffer_unordered(self.config.image_concurrency.max(1))
                .collect()
                .await;

        pb.finish_with_message("Image generation complete");

        let mut images = HashMap::new();
        for res in results {
            let (id, bytes) = res?;
            images.insert(id, encode_data_uri("image/png", &bytes));
        }
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::GenerationResult;
    use crate::core::io::NativeStorage;
    use crate::services::image::ImagePayload;
    use async_trait::async_trait;
    use base64::Engine;
    use serde_json::json;

    #[derive(Debug)]
    struct FakeStoryLlm;

    #[async_trait]
    impl LlmClient for FakeStoryLlm {
        async fn generate(
            &self,
            _prompt: &str,
            _config: &GenerationConfig,
        ) -> GenerationResult<String> {
            Ok(json!({
                "visualStyle": "watercolor",
                "optimizedStory": "summary",
                "characters": ["Lin: tall boy"],
                "panels": [
                    {"id": 1, "text": "Lin wakes up.", "imagePrompt": "Boy waking up"},
                    {"id": 2, "text": "Lin leaves.", "imagePrompt": "Boy leaving home"}
                ]
            })
            .to_string())
        }
    }

    #[derive(Debug)]
    struct FakePromptLlm;

    #[async_trait]
    impl LlmClient for FakePromptLlm {
        async fn generate(
            &self,
            _prompt: &str,
            _config: &GenerationConfig,
        ) -> GenerationResult<String> {
            Ok("polished prompt".to_string())
        }
    }

    #[derive(Debug)]
    struct FakeImageClient;

    #[async_trait]
    impl ImageClient for FakeImageClient {
        async fn generate_image(&self, _prompt: &str) -> GenerationResult<ImagePayload> {
            Ok(ImagePayload {
                mime_type: "image/png".to_string(),
                base64: base64::engine::general_purpose::STANDARD.encode(b"png-bytes"),
            })
        }
    }

    fn test_config(root: &std::path::Path) -> Config {
        let yaml = format!(
            "input_folder: {root}/input\noutput_folder: {root}/output\nbuild_folder: {root}/build\nunattended: true\n",
            root = root.display()
        );
        serde_yaml_ng::from_str(&yaml).unwrap()
    }

    async fn make_manager(config: Config) -> WorkflowManager {
        WorkflowManager::new(
            config,
            Box::new(FakeStoryLlm),
            Box::new(FakePromptLlm),
            Box::new(FakeImageClient),
            Arc::new(NativeStorage::new()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_full_run_produces_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let storage = NativeStorage::new();

        storage
            .write(
                &format!("{}/morning.txt", config.input_folder),
                "A boy wakes up and leaves home.".as_bytes(),
            )
            .await
            .unwrap();

        let mut manager = make_manager(config.clone()).await;
        manager.run().await.unwrap();

        assert!(storage
            .exists(&format!("{}/morning/story.json", config.build_folder))
            .await
            .unwrap());
        assert!(storage
            .exists(&format!("{}/morning/panel_01.png", config.build_folder))
            .await
            .unwrap());
        assert!(storage
            .exists(&format!("{}/morning/panel_02.png", config.build_folder))
            .await
            .unwrap());

        let html = storage
            .read(&format!("{}/morning.html", config.output_folder))
            .await
            .unwrap();
        let html = String::from_utf8(html).unwrap();
        assert!(html.contains("Lin wakes up."));
        assert!(html.contains("data:image/png;base64,"));

        let state = storage
            .read(&format!("{}/state.json", config.build_folder))
            .await
            .unwrap();
        let state: WorkflowState = serde_json::from_slice(&state).unwrap();
        assert_eq!(state.completed_stories, vec!["morning".to_string()]);
    }

    #[tokio::test]
    async fn test_completed_stories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let storage = NativeStorage::new();

        storage
            .write(
                &format!("{}/morning.txt", config.input_folder),
                b"A story.",
            )
            .await
            .unwrap();
        storage
            .write(
                &format!("{}/state.json", config.build_folder),
                br#"{"completed_stories": ["morning"]}"#,
            )
            .await
            .unwrap();

        let mut manager = make_manager(config.clone()).await;
        manager.run().await.unwrap();

        // Nothing regenerated for the completed story.
        assert!(!storage
            .exists(&format!("{}/morning/story.json", config.build_folder))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_cached_decomposition_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let storage = NativeStorage::new();

        let cached = json!({
            "visualStyle": "ink",
            "optimizedStory": "cached summary",
            "characters": [],
            "panels": [{"id": 7, "text": "Cached panel.", "imagePrompt": "cached scene"}]
        });
        storage
            .write(
                &format!("{}/tale/story.json", config.build_folder),
                cached.to_string().as_bytes(),
            )
            .await
            .unwrap();
        storage
            .write(&format!("{}/tale.txt", config.input_folder), b"Some text.")
            .await
            .unwrap();

        let mut manager = make_manager(config.clone()).await;
        manager.run().await.unwrap();

        let html = storage
            .read(&format!("{}/tale.html", config.output_folder))
            .await
            .unwrap();
        let html = String::from_utf8(html).unwrap();
        // The cached single-panel story was used, not the fake LLM's two panels.
        assert!(html.contains("Cached panel."));
        assert!(!html.contains("Lin wakes up."));
    }
}
