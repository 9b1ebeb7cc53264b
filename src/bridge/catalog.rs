//! Worldbuilding tool catalog

use crate::llm::ToolDefinition;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    World,
    Taxonomy,
    Entry,
    Image,
    Site,
}

impl ToolCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolCategory::World => "world",
            ToolCategory::Taxonomy => "taxonomy",
            ToolCategory::Entry => "entry",
            ToolCategory::Image => "image",
            ToolCategory::Site => "site",
        }
    }
}

/// A tool the model may call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub category: ToolCategory,
    /// One-line summary for listings and the system prompt
    pub summary: &'static str,
    /// Model-facing description
    pub description: &'static str,
    pub input_schema: Value,
}

impl ToolSpec {
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema.clone(),
        }
    }
}

static CATALOG: LazyLock<Vec<ToolSpec>> = LazyLock::new(|| {
    vec![
        ToolSpec {
            name: "instantiate_world",
            category: ToolCategory::World,
            summary: "Create a new world project with foundation content",
            description: "Create a new world project with foundation content and directory structure",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "world_name": {
                        "type": "string",
                        "description": "Name of the world (used for directory naming)"
                    },
                    "world_content": {
                        "type": "string",
                        "description": "Rich world overview/foundation content with concepts, atmosphere, key elements"
                    },
                    "taxonomies": {
                        "type": "array",
                        "description": "Initial taxonomy categories (e.g., characters, locations, artifacts)",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": {"type": "string"},
                                "description": {"type": "string"}
                            },
                            "required": ["name", "description"]
                        },
                        "default": []
                    },
                    "base_directory": {
                        "type": "string",
                        "description": "Base directory for world creation",
                        "default": "."
                    }
                },
                "required": ["world_name", "world_content"]
            }),
        },
        ToolSpec {
            name: "create_taxonomy",
            category: ToolCategory::Taxonomy,
            summary: "Create organized categories for your world",
            description: "Create organized category folders for your world",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "world_directory": {
                        "type": "string",
                        "description": "Path to the world directory"
                    },
                    "taxonomy_name": {
                        "type": "string",
                        "description": "Name of the taxonomy (e.g., characters, locations, artifacts)"
                    },
                    "taxonomy_description": {
                        "type": "string",
                        "description": "Description of what this taxonomy contains"
                    }
                },
                "required": ["world_directory", "taxonomy_name", "taxonomy_description"]
            }),
        },
        ToolSpec {
            name: "create_world_entry",
            category: ToolCategory::Entry,
            summary: "Add detailed entries to your world",
            description: "Add detailed entries to your world with automatic stub generation for referenced entities",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "world_directory": {
                        "type": "string",
                        "description": "Path to the world directory"
                    },
                    "taxonomy": {
                        "type": "string",
                        "description": "Taxonomy category for this entry"
                    },
                    "entry_name": {
                        "type": "string",
                        "description": "Name of the entry"
                    },
                    "entry_content": {
                        "type": "string",
                        "description": "Detailed content for the entry"
                    }
                },
                "required": ["world_directory", "taxonomy", "entry_name", "entry_content"]
            }),
        },
        ToolSpec {
            name: "generate_image_from_markdown_file",
            category: ToolCategory::Image,
            summary: "Create visual representations of your content",
            description: "Create visual representations of your content from markdown files",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filepath": {
                        "type": "string",
                        "description": "Path to the markdown file to generate image for"
                    },
                    "style": {
                        "type": "string",
                        "description": "Art style for the image",
                        "default": "fantasy illustration"
                    },
                    "aspect_ratio": {
                        "type": "string",
                        "description": "Image aspect ratio",
                        "enum": ASPECT_RATIOS,
                        "default": "16:9"
                    }
                },
                "required": ["filepath"]
            }),
        },
        ToolSpec {
            name: "build_static_site",
            category: ToolCategory::Site,
            summary: "Generate a navigable website from your world",
            description: "Generate a navigable website from your world content",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "world_directory": {
                        "type": "string",
                        "description": "Path to the world directory"
                    },
                    "action": {
                        "type": "string",
                        "description": "Build action to perform",
                        "enum": SITE_ACTIONS,
                        "default": "build"
                    }
                },
                "required": ["world_directory"]
            }),
        },
    ]
});

pub(super) const ASPECT_RATIOS: [&str; 5] = ["1:1", "16:9", "9:16", "3:4", "4:3"];
pub(super) const SITE_ACTIONS: [&str; 3] = ["build", "dev", "preview"];

/// Every worldbuilding tool, in presentation order
pub fn catalog() -> &'static [ToolSpec] {
    &CATALOG
}
