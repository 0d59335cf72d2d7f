//! Serializable schema snapshots and their output formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::FieldType;
use crate::value::FieldKind;

/// Binding-free view of a built schema level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<FieldSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<FieldSnapshot>,
}

/// Binding-free view of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldKind>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub type_hint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<char>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
    #[serde(default)]
    pub repeatable: bool,
    /// Nested schema of a sub-command field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcommand: Option<Box<SchemaSnapshot>>,
}

impl SchemaSnapshot {
    pub fn find_option(&self, name: &str) -> Option<&FieldSnapshot> {
        self.options.iter().find(|field| field.name == name)
    }

    pub fn find_subcommand(&self, name: &str) -> Option<&SchemaSnapshot> {
        self.subcommands
            .iter()
            .find(|field| field.name == name)
            .and_then(|field| field.subcommand.as_deref())
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Markdown => "markdown",
        })
    }
}

/// Formats a snapshot in the requested output format.
pub fn format_schema(schema: &SchemaSnapshot, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(schema)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(schema).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => {
            let mut out = String::new();
            schema_to_markdown(schema, 1, &mut out);
            Ok(out)
        }
    }
}

fn schema_to_markdown(schema: &SchemaSnapshot, depth: usize, out: &mut String) {
    let heading = "#".repeat(depth);
    let section = "#".repeat(depth + 1);

    out.push_str(&format!("{heading} {}\n\n", schema.name));

    if !schema.options.is_empty() {
        out.push_str(&format!("{section} Options\n\n"));
        out.push_str("| Option | Type | Description |\n");
        out.push_str("|--------|------|-------------|\n");
        for option in &schema.options {
            let name = match option.shortcut {
                Some(short) => format!("-{short}, --{}", option.name),
                None => format!("--{}", option.name),
            };
            let kind = if option.type_hint.is_empty() {
                "flag"
            } else {
                option.type_hint.as_str()
            };
            out.push_str(&format!(
                "| `{name}` | {kind} | {} |\n",
                describe(option)
            ));
        }
        out.push('\n');
    }

    if !schema.arguments.is_empty() {
        out.push_str(&format!("{section} Arguments\n\n"));
        out.push_str("| Argument | Type | Repeatable | Description |\n");
        out.push_str("|----------|------|------------|-------------|\n");
        for argument in &schema.arguments {
            let repeatable = if argument.repeatable { "yes" } else { "no" };
            out.push_str(&format!(
                "| `{}` | {} | {repeatable} | {} |\n",
                argument.name,
                argument.type_hint,
                describe(argument)
            ));
        }
        out.push('\n');
    }

    if !schema.subcommands.is_empty() {
        out.push_str(&format!("{section} Subcommands\n\n"));
        out.push_str("| Subcommand | Description |\n");
        out.push_str("|------------|-------------|\n");
        for sub in &schema.subcommands {
            out.push_str(&format!("| `{}` | {} |\n", sub.name, sub.help));
        }
        out.push('\n');

        for sub in &schema.subcommands {
            if let Some(nested) = &sub.subcommand {
                schema_to_markdown(nested, depth + 1, out);
            }
        }
    }
}

fn describe(field: &FieldSnapshot) -> String {
    let mut desc = field.help.clone();
    if !field.choices.is_empty() {
        desc.push_str(&format!(" [{}]", field.choices.join(" ")));
    }
    if let Some(default) = &field.default_value {
        desc.push_str(&format!(" (default: `{default}`)"));
    }
    desc.trim().to_string()
}
