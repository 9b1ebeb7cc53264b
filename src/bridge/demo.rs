//! Demo bridge
//!
//! Answers the catalog tools with descriptive results naming the files a
//! real run would produce under the worlds directory. Nothing is written to
//! disk. Used when no external tool command is configured.

use super::catalog::{catalog, ASPECT_RATIOS, SITE_ACTIONS};
use super::{ToolBridge, ToolOutcome, ToolSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub struct DemoBridge {
    worlds_dir: PathBuf,
}

impl DemoBridge {
    pub fn new(worlds_dir: impl Into<PathBuf>) -> Self {
        Self {
            worlds_dir: worlds_dir.into(),
        }
    }

    fn instantiate_world(&self, input: &Value) -> Result<String, String> {
        let name = required_str(input, "world_name")?;
        required_str(input, "world_content")?;

        let base = match optional_str(input, "base_directory") {
            Some(dir) if dir != "." => PathBuf::from(dir),
            _ => self.worlds_dir.clone(),
        };
        let world = base.join(slugify(name));

        let mut out = format!("World '{name}' instantiated (demo mode)\n");
        let _ = writeln!(out, "Created world: {}", world.display());
        let _ = writeln!(out, "Created file: {}", world.join("overview/world-overview.md").display());

        if let Some(taxonomies) = input.get("taxonomies").and_then(Value::as_array) {
            for taxonomy in taxonomies {
                if let Some(tax_name) = taxonomy.get("name").and_then(Value::as_str) {
                    let _ = writeln!(out, "Created taxonomy: {}", world.join(slugify(tax_name)).display());
                }
            }
        }
        Ok(out)
    }

    fn create_taxonomy(input: &Value) -> Result<String, String> {
        let world = Path::new(required_str(input, "world_directory")?);
        let name = required_str(input, "taxonomy_name")?;
        required_str(input, "taxonomy_description")?;

        let slug = slugify(name);
        Ok(format!(
            "Taxonomy '{name}' created (demo mode)\nCreated taxonomy: {}\nCreated file: {}\n",
            world.join(&slug).display(),
            world.join("taxonomies").join(format!("{slug}-overview.md")).display(),
        ))
    }

    fn create_world_entry(input: &Value) -> Result<String, String> {
        let world = Path::new(required_str(input, "world_directory")?);
        let taxonomy = required_str(input, "taxonomy")?;
        let name = required_str(input, "entry_name")?;
        required_str(input, "entry_content")?;

        let path = world
            .join("entries")
            .join(slugify(taxonomy))
            .join(format!("{}.md", slugify(name)));
        Ok(format!(
            "Entry '{name}' added to {taxonomy} (demo mode)\nCreated entry: {}\n",
            path.display()
        ))
    }

    fn generate_image(input: &Value) -> Result<String, String> {
        let filepath = required_str(input, "filepath")?;
        let source = Path::new(filepath);
        if source.extension().and_then(|e| e.to_str()) != Some("md") {
            return Err(format!("filepath must point to a markdown file, got {filepath}"));
        }

        let style = optional_str(input, "style").unwrap_or("fantasy illustration");
        let aspect_ratio = optional_str(input, "aspect_ratio").unwrap_or("16:9");
        if !ASPECT_RATIOS.contains(&aspect_ratio) {
            return Err(format!(
                "Unsupported aspect_ratio {aspect_ratio}; expected one of {}",
                ASPECT_RATIOS.join(", ")
            ));
        }

        let image = source.with_extension("png");
        Ok(format!(
            "Generated {style} image at {aspect_ratio} (demo mode)\nImage saved to: {}\n",
            image.display()
        ))
    }

    fn build_site(input: &Value) -> Result<String, String> {
        let world = Path::new(required_str(input, "world_directory")?);
        let action = optional_str(input, "action").unwrap_or("build");
        if !SITE_ACTIONS.contains(&action) {
            return Err(format!(
                "Unsupported action {action}; expected one of {}",
                SITE_ACTIONS.join(", ")
            ));
        }

        Ok(format!(
            "Static site {action} finished (demo mode)\nSite saved to: {}\n",
            world.join("site/index.html").display()
        ))
    }
}

#[async_trait]
impl ToolBridge for DemoBridge {
    fn available_tools(&self) -> Vec<ToolSpec> {
        catalog().to_vec()
    }

    async fn execute(&self, tool: &str, input: Value) -> ToolOutcome {
        let result = match tool {
            "instantiate_world" => self.instantiate_world(&input),
            "create_taxonomy" => Self::create_taxonomy(&input),
            "create_world_entry" => Self::create_world_entry(&input),
            "generate_image_from_markdown_file" => Self::generate_image(&input),
            "build_static_site" => Self::build_site(&input),
            other => Err(format!("Unknown tool: {other}")),
        };

        match result {
            Ok(output) => ToolOutcome::success(output),
            Err(error) => ToolOutcome::failure(error),
        }
    }
}

fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, String> {
    match input.get(key).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(format!("Missing required parameter: {key}")),
    }
}

fn optional_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

/// Directory-safe form of a display name
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}
