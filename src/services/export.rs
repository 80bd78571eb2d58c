use crate::core::state::Story;
use std::collections::HashMap;

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders a story and its panel-id-keyed image map as one self-contained
/// HTML document. Images arrive as data URIs, so the file needs no
/// external assets; panels without an image get a placeholder box.
pub fn render_story_html(title: &str, story: &Story, images: &HashMap<u32, String>) -> String {
    let characters_html = if story.characters.is_empty() {
        String::new()
    } else {
        let tags = story
            .characters
            .iter()
            .map(|c| format!("<div class=\"character-tag\">{}</div>", escape_html(c)))
            .collect::<Vec<_>>()
            .join("\n        ");
        format!(
            r#"    <div class="characters">
      <h2>Characters</h2>
      <div class="character-list">
        {}
      </div>
    </div>
"#,
            tags
        )
    };

    let panels_html = story
        .panels
        .iter()
        .enumerate()
        .map(|(index, panel)| {
            let image_html = match images.get(&panel.id) {
                Some(data_uri) => format!(
                    "<img src=\"{}\" alt=\"Panel {}\" />",
                    data_uri,
                    index + 1
                ),
                None => "<div class=\"missing\">No image</div>".to_string(),
            };
            format!(
                r#"        <div class="panel">
          <div class="panel-image">
            <div class="panel-number">{number}</div>
            {image}
          </div>
          <div class="panel-text">{text}</div>
        </div>"#,
                number = index + 1,
                image = image_html,
                text = escape_html(&panel.text),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <style>
    * {{ margin: 0; padding: 0; box-sizing: border-box; }}
    body {{
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
      background: linear-gradient(135deg, #1a1a2e 0%, #16213e 100%);
      color: #e5e5e5;
      padding: 20px;
      min-height: 100vh;
    }}
    .container {{ max-width: 1400px; margin: 0 auto; }}
    header {{
      text-align: center;
      padding: 40px 20px;
      background: rgba(255, 255, 255, 0.05);
      border-radius: 16px;
      margin-bottom: 40px;
    }}
    h1 {{ font-size: 2.5rem; margin-bottom: 10px; }}
    .summary {{ color: #999; font-size: 0.95rem; max-width: 800px; margin: 0 auto; }}
    .characters {{
      background: rgba(255, 255, 255, 0.05);
      border-radius: 12px;
      padding: 20px;
      margin-bottom: 40px;
    }}
    .characters h2 {{ color: #667eea; margin-bottom: 15px; font-size: 1.3rem; }}
    .character-list {{ display: flex; flex-wrap: wrap; gap: 10px; }}
    .character-tag {{
      background: rgba(102, 126, 234, 0.2);
      border: 1px solid rgba(102, 126, 234, 0.3);
      padding: 8px 16px;
      border-radius: 20px;
      font-size: 0.9rem;
      color: #a5b4fc;
    }}
    .panels {{
      display: grid;
      grid-template-columns: repeat(auto-fill, minmax(350px, 1fr));
      gap: 30px;
    }}
    .panel {{
      background: rgba(255, 255, 255, 0.05);
      border: 1px solid rgba(255, 255, 255, 0.1);
      border-radius: 16px;
      overflow: hidden;
    }}
    .panel-image {{ position: relative; }}
    .panel-image img {{ width: 100%; display: block; }}
    .panel-number {{
      position: absolute;
      top: 10px;
      left: 10px;
      background: rgba(0, 0, 0, 0.7);
      color: white;
      width: 36px;
      height: 36px;
      border-radius: 50%;
      display: flex;
      align-items: center;
      justify-content: center;
      font-weight: bold;
      z-index: 10;
    }}
    .missing {{
      height: 260px;
      display: flex;
      align-items: center;
      justify-content: center;
      color: #666;
    }}
    .panel-text {{ padding: 16px; line-height: 1.6; }}
  </style>
</head>
<body>
  <div class="container">
    <header>
      <h1>{title}</h1>
      <p class="summary">{summary}</p>
    </header>
{characters}    <div class="panels">
{panels}
    </div>
  </div>
</body>
</html>
"#,
        title = escape_html(title),
        summary = escape_html(&story.optimized_story),
        characters = characters_html,
        panels = panels_html,
    )
}
