//! Help text rendering.
//!
//! Layout of one option row:
//!
//! ```text
//! | margin | shortcut column | name column | gap | help |
//!     -C INT, --count INT       save as the integer (default: 12)
//! ```
//!
//! The shortcut column is right-aligned, the name column left-aligned, and
//! both are measured in terminal columns, so identifiers with wide
//! characters line up with ASCII ones.

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::schema::{FieldDescriptor, ParserSchema};

/// Formatting knobs for rendered help text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpSettings {
    /// Spaces before every row.
    pub margin: usize,
    /// Spaces between the name column and the help text.
    pub gap: usize,
    pub option_title: String,
    pub argument_title: String,
    pub subcommand_title: String,
}

impl Default for HelpSettings {
    fn default() -> Self {
        Self {
            margin: 4,
            gap: 4,
            option_title: "option".to_string(),
            argument_title: "argument".to_string(),
            subcommand_title: "sub-command".to_string(),
        }
    }
}

/// Terminal width of `s`.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn pad_left(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(s));
    format!("{}{s}", " ".repeat(fill))
}

fn pad_right(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(s));
    format!("{s}{}", " ".repeat(fill))
}

impl<C> FieldDescriptor<C> {
    /// `-x TYPE, ` for options with a shortcut, empty otherwise.
    pub(crate) fn shortcut_cell(&self) -> String {
        match self.shortcut {
            Some(shortcut) => {
                let cell = format!("-{shortcut} {}", self.type_hint);
                format!("{}, ", cell.trim_end())
            }
            None => String::new(),
        }
    }

    /// `--name TYPE` for options, the bare name otherwise.
    pub(crate) fn name_cell(&self) -> String {
        if self.is_option() {
            format!("--{} {}", self.name, self.type_hint)
                .trim_end()
                .to_string()
        } else {
            self.name.clone()
        }
    }

    /// Help text with the choice list and captured default appended.
    pub(crate) fn help_cell(&self) -> String {
        let mut help = self.help.clone();
        if !self.choices.is_empty() {
            help = format!("{help} [{}]", self.choices.join(" "));
        }
        if let Some(default) = &self.default_value {
            help = format!("{help} (default: {default})");
        }
        help.trim().to_string()
    }
}

/// Column widths shared by every section of one help message.
struct Columns {
    shortcut: usize,
    total: usize,
}

impl Columns {
    fn measure<C>(schema: &ParserSchema<C>) -> Self {
        let shortcut = schema
            .options()
            .iter()
            .map(|field| display_width(&field.shortcut_cell()))
            .max()
            .unwrap_or(0);
        let name = schema
            .options()
            .iter()
            .map(|field| display_width(&field.name_cell()))
            .max()
            .unwrap_or(0);
        let bare = schema
            .arguments()
            .iter()
            .chain(schema.subcommands())
            .map(|field| display_width(&field.name))
            .max()
            .unwrap_or(0);

        Self {
            shortcut,
            total: (shortcut + name).max(bare),
        }
    }
}

/// Renders the usage line and the option, argument and sub-command sections.
///
/// When `error` is given it is printed first as `error: ...`. Sections with
/// no entries are omitted.
pub(crate) fn render<C>(schema: &ParserSchema<C>, error: Option<&dyn fmt::Display>) -> String {
    let settings = schema.settings();
    let columns = Columns::measure(schema);
    let margin = " ".repeat(settings.margin);
    let gap = " ".repeat(settings.gap);

    let mut lines = Vec::new();
    if let Some(error) = error {
        lines.push(format!("error: {error}"));
    }
    lines.push(usage_line(schema));

    let row = |lead: String, field: &FieldDescriptor<C>| {
        format!("{margin}{lead}{gap}{}", field.help_cell())
            .trim_end()
            .to_string()
    };

    if !schema.options().is_empty() {
        lines.push(String::new());
        lines.push(format!("{}:", settings.option_title));
        for field in schema.options() {
            let lead = format!(
                "{}{}",
                pad_left(&field.shortcut_cell(), columns.shortcut),
                pad_right(&field.name_cell(), columns.total - columns.shortcut),
            );
            lines.push(row(lead, field));
        }
    }

    for (title, fields) in [
        (&settings.argument_title, schema.arguments()),
        (&settings.subcommand_title, schema.subcommands()),
    ] {
        if fields.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("{title}:"));
        for field in fields {
            lines.push(row(pad_right(&field.name, columns.total), field));
        }
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// `usage: <name> [OPTION] <ARG1> ... [SUB-COMMAND]`
pub(crate) fn usage_line<C>(schema: &ParserSchema<C>) -> String {
    let mut usage = format!("usage: {}", schema.name);
    if !schema.options().is_empty() {
        usage.push_str(" [OPTION]");
    }
    for argument in schema.arguments() {
        usage.push_str(&format!(" <{}>", argument.name));
    }
    if !schema.subcommands().is_empty() {
        usage.push_str(" [SUB-COMMAND]");
    }
    usage
}
