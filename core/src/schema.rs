//! Built parser schemas and the builder that derives them.
//!
//! [`ParserSchema::build`] walks a [`Command`]'s description once, in
//! declaration order, and either returns a complete tree or the first
//! [`BuildError`]. Uniqueness of long names, shortcuts and sub-command names
//! is enforced per level while building and not tracked afterwards.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::binding::{Child, Frame, Slot};
use crate::callback::{Handler, HelpSource, lookup_callback};
use crate::coerce::{self, CoercionRule, coercion_rule, in_choices};
use crate::error::{BuildError, BuildResult, ParseError, ParseResult};
use crate::help::{self, HelpSettings};
use crate::output::{FieldSnapshot, SchemaSnapshot};
use crate::spec::{Access, Command, FieldSpec, Spec};
use crate::value::FieldKind;

/// Role of a field in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Named, non-positional: `--name` / `-x`.
    Option,
    /// Positional, bound in declaration order.
    Argument,
    /// Named bare token taking every remaining token.
    Subcommand,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Option => "OPTION",
            Self::Argument => "ARGUMENT",
            Self::Subcommand => "SUB-COMMAND",
        })
    }
}

pub(crate) enum Binding<C> {
    Value {
        slot: Box<dyn Slot<C>>,
        rule: &'static CoercionRule,
    },
    Child(Box<dyn Child<C>>),
}

/// One field bound into a schema.
pub struct FieldDescriptor<C> {
    pub(crate) name: String,
    pub(crate) field_type: FieldType,
    pub(crate) type_hint: &'static str,
    pub(crate) shortcut: Option<char>,
    pub(crate) help: String,
    pub(crate) default_value: Option<String>,
    pub(crate) choices: Vec<String>,
    pub(crate) callback_name: Option<String>,
    pub(crate) been_set: bool,
    pub(crate) binding: Binding<C>,
    pub(crate) handler: Option<Handler>,
}

impl<C> FieldDescriptor<C> {
    /// Display name: lowercase for options and sub-commands, uppercase for
    /// arguments.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_option(&self) -> bool {
        self.field_type == FieldType::Option
    }

    /// Scalar kind of the bound value; `None` for sub-commands.
    pub fn kind(&self) -> Option<FieldKind> {
        match &self.binding {
            Binding::Value { rule, .. } => Some(rule.kind),
            Binding::Child(_) => None,
        }
    }

    pub fn type_hint(&self) -> &str {
        self.type_hint
    }

    pub fn shortcut(&self) -> Option<char> {
        self.shortcut
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    /// Value captured at build time, when it differed from the zero value.
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Allowed values, sorted.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn callback_name(&self) -> Option<&str> {
        self.callback_name.as_deref()
    }

    /// Whether a parse has assigned this field. Sequence fields never
    /// report set, so they stay assignable.
    pub fn been_set(&self) -> bool {
        self.been_set
    }

    pub fn is_sequence(&self) -> bool {
        match &self.binding {
            Binding::Value { slot, .. } => slot.is_sequence(),
            Binding::Child(_) => false,
        }
    }

    /// Whether the field consumes a value token.
    pub fn takes_value(&self) -> bool {
        match &self.binding {
            Binding::Value { rule, .. } => rule.takes_value(),
            Binding::Child(_) => false,
        }
    }

    /// Coerces leading tokens into the bound value; returns tokens consumed.
    pub(crate) fn apply(&self, conf: &mut C, tokens: &[String]) -> ParseResult<usize> {
        match &self.binding {
            Binding::Value { slot, rule } => {
                coerce::assign(rule, slot.as_ref(), conf, tokens, &self.name, &self.choices)
            }
            Binding::Child(_) => Err(ParseError::InvalidValue {
                field: self.name.clone(),
                reason: "sub-command takes no value".to_string(),
            }),
        }
    }

    pub(crate) fn child_mut(&mut self) -> Option<&mut (dyn Child<C> + 'static)> {
        match &mut self.binding {
            Binding::Child(child) => Some(child.as_mut()),
            Binding::Value { .. } => None,
        }
    }

    pub(crate) fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            name: self.name.clone(),
            field_type: self.field_type,
            kind: self.kind(),
            type_hint: self.type_hint.to_string(),
            shortcut: self.shortcut,
            help: self.help.clone(),
            default_value: self.default_value.clone(),
            choices: self.choices.clone(),
            callback: self.callback_name.clone(),
            repeatable: self.is_sequence(),
            subcommand: match &self.binding {
                Binding::Child(child) => Some(Box::new(child.snapshot())),
                Binding::Value { .. } => None,
            },
        }
    }
}

impl<C> fmt::Debug for FieldDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("type_hint", &self.type_hint)
            .field("shortcut", &self.shortcut)
            .field("default_value", &self.default_value)
            .field("choices", &self.choices)
            .field("been_set", &self.been_set)
            .finish_non_exhaustive()
    }
}

/// A built parser for one command level.
pub struct ParserSchema<C> {
    pub(crate) name: String,
    pub(crate) options: Vec<FieldDescriptor<C>>,
    pub(crate) arguments: Vec<FieldDescriptor<C>>,
    pub(crate) subcommands: Vec<FieldDescriptor<C>>,
    settings: HelpSettings,
}

impl<C: Command> ParserSchema<C> {
    /// Builds the schema for `conf`'s type, capturing its current values as
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns the first [`BuildError`] found; no partial schema is kept.
    pub fn build(conf: &mut C) -> BuildResult<Self> {
        Self::build_with(conf, &C::command_name(), &HelpSettings::default())
    }

    /// Builds with an explicit program name and help settings.
    pub fn build_with(conf: &mut C, name: &str, settings: &HelpSettings) -> BuildResult<Self> {
        let mut path = Vec::new();
        let schema = Self::build_nested(conf, name, settings, &mut path)?;
        info!(
            schema = %schema.name,
            options = schema.options.len(),
            arguments = schema.arguments.len(),
            subcommands = schema.subcommands.len(),
            "built parser schema"
        );
        Ok(schema)
    }

    pub(crate) fn build_nested(
        conf: &mut C,
        name: &str,
        settings: &HelpSettings,
        path: &mut Vec<Frame>,
    ) -> BuildResult<Self> {
        let type_id = TypeId::of::<C>();
        if path.iter().any(|frame| frame.type_id == type_id) {
            let cycle = path
                .iter()
                .map(|frame| frame.name.as_str())
                .chain(std::iter::once(name))
                .collect::<Vec<_>>()
                .join(" ");
            return Err(BuildError::SubcommandCycle(cycle));
        }

        path.push(Frame {
            type_id,
            name: name.to_string(),
        });
        let mut builder = Builder {
            schema: ParserSchema {
                name: name.to_string(),
                options: Vec::new(),
                arguments: Vec::new(),
                subcommands: Vec::new(),
                settings: settings.clone(),
            },
            long_names: HashSet::new(),
            shortcuts: HashMap::new(),
            subcommand_names: HashSet::new(),
        };
        let result = builder.add_fields(conf, Spec::<C>::of().fields, path);
        path.pop();

        result.map(|()| builder.schema)
    }
}

impl<C> ParserSchema<C> {
    /// Program or sub-command name shown in the usage line.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn options(&self) -> &[FieldDescriptor<C>] {
        &self.options
    }

    pub fn arguments(&self) -> &[FieldDescriptor<C>] {
        &self.arguments
    }

    pub fn subcommands(&self) -> &[FieldDescriptor<C>] {
        &self.subcommands
    }

    pub fn settings(&self) -> &HelpSettings {
        &self.settings
    }

    /// Finds an option by its long name.
    pub fn find_option(&self, name: &str) -> Option<&FieldDescriptor<C>> {
        self.options.iter().find(|field| field.name == name)
    }

    /// Finds an argument by its display name.
    pub fn find_argument(&self, name: &str) -> Option<&FieldDescriptor<C>> {
        self.arguments.iter().find(|field| field.name == name)
    }

    /// Renders the help text, preceded by `error: ...` when given.
    pub fn help_message(&self, error: Option<&dyn fmt::Display>) -> String {
        help::render(self, error)
    }

    /// Help text of the sub-command `name` at this level.
    pub fn subcommand_help(&self, name: &str) -> Option<String> {
        self.subcommands
            .iter()
            .find(|field| field.name == name)
            .and_then(|field| match &field.binding {
                Binding::Child(child) => Some(child.help_message(None)),
                Binding::Value { .. } => None,
            })
    }

    /// Serializable view of the whole tree, without bindings.
    pub fn snapshot(&self) -> SchemaSnapshot {
        SchemaSnapshot {
            name: self.name.clone(),
            options: self.options.iter().map(FieldDescriptor::snapshot).collect(),
            arguments: self.arguments.iter().map(FieldDescriptor::snapshot).collect(),
            subcommands: self
                .subcommands
                .iter()
                .map(FieldDescriptor::snapshot)
                .collect(),
        }
    }
}

impl<C> HelpSource for ParserSchema<C> {
    fn help_message(&self, error: Option<&dyn fmt::Display>) -> String {
        ParserSchema::help_message(self, error)
    }

    fn snapshot(&self) -> SchemaSnapshot {
        ParserSchema::snapshot(self)
    }
}

impl<C> fmt::Debug for ParserSchema<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserSchema")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("arguments", &self.arguments)
            .field("subcommands", &self.subcommands)
            .finish()
    }
}

/// Schema under construction plus the per-level uniqueness indices.
struct Builder<C> {
    schema: ParserSchema<C>,
    long_names: HashSet<String>,
    shortcuts: HashMap<char, String>,
    subcommand_names: HashSet<String>,
}

impl<C: 'static> Builder<C> {
    fn add_fields(
        &mut self,
        conf: &mut C,
        fields: Vec<FieldSpec<C>>,
        path: &mut Vec<Frame>,
    ) -> BuildResult<()> {
        for field in fields {
            if field.ignore {
                debug!(field = %field.ident, "skip ignored field");
                continue;
            }

            if let Access::Embedded(inner) = field.access {
                debug!(field = %field.ident, "flatten embedded field");
                self.add_fields(conf, inner, path)?;
                continue;
            }

            self.add_field(conf, field, path)?;
        }

        Ok(())
    }

    fn add_field(
        &mut self,
        conf: &mut C,
        field: FieldSpec<C>,
        path: &mut Vec<Frame>,
    ) -> BuildResult<()> {
        let FieldSpec {
            ident,
            name,
            short,
            help,
            callback,
            choices,
            handler,
            access,
            ..
        } = field;

        let field_type = match &access {
            Access::Option(_) => FieldType::Option,
            Access::Argument(_) => FieldType::Argument,
            Access::Subcommand(_) => FieldType::Subcommand,
            Access::Embedded(_) => unreachable!("embedded fields are flattened by add_fields"),
        };

        let mut display_name = match &name {
            Some(name) => name.trim().to_lowercase(),
            None => ident.to_lowercase(),
        };
        if display_name.is_empty() {
            return Err(BuildError::field(&ident, "empty display name"));
        }
        if field_type == FieldType::Argument {
            display_name = display_name.to_uppercase();
        }
        debug!(field = %display_name, %field_type, "new field");

        let shortcut = match &short {
            None => None,
            Some(short) => {
                let mut chars = short.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => {
                        return Err(BuildError::field(
                            &display_name,
                            format!("shortcut must be exactly one character: {short:?}"),
                        ));
                    }
                }
            }
        };
        if shortcut.is_some() && field_type != FieldType::Option {
            return Err(BuildError::field(&display_name, "shortcut only applies to options"));
        }

        let choices = match &choices {
            Some(list) => {
                let mut choices: Vec<String> =
                    list.split_whitespace().map(str::to_string).collect();
                choices.sort();
                choices
            }
            None => Vec::new(),
        };

        let (binding, default_value, type_hint, help) = match access {
            Access::Option(slot) | Access::Argument(slot) => {
                let defaults = slot.defaults(conf);
                if let Some(missing) = defaults
                    .iter()
                    .map(ToString::to_string)
                    .find(|value| !choices.is_empty() && !in_choices(&choices, value))
                {
                    return Err(BuildError::field(
                        &display_name,
                        format!("{missing} not in the choices: [{}]", choices.join(" ")),
                    ));
                }
                let default_value = match defaults.as_slice() {
                    [] => None,
                    [single] if !slot.is_sequence() => Some(single.to_string()),
                    many => Some(format!(
                        "[{}]",
                        many.iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(" ")
                    )),
                };

                let kind = slot.kind();
                let rule = coercion_rule(kind).ok_or_else(|| BuildError::UnsupportedFieldKind {
                    field: display_name.clone(),
                    kind,
                })?;
                if field_type == FieldType::Argument && !rule.takes_value() {
                    return Err(BuildError::field(
                        &display_name,
                        "boolean argument would consume no token",
                    ));
                }

                let help = help
                    .or_else(|| rule.default_help.map(str::to_string))
                    .unwrap_or_default();
                (Binding::Value { slot, rule }, default_value, rule.type_hint, help)
            }
            Access::Subcommand(nest) => {
                if !choices.is_empty() || callback.is_some() || handler.is_some() {
                    return Err(BuildError::field(
                        &display_name,
                        "sub-commands take no choices or callback",
                    ));
                }
                let child = nest.build(&display_name, &self.schema.settings, path)?;
                (Binding::Child(child), None, "", help.unwrap_or_default())
            }
            Access::Embedded(_) => unreachable!("embedded fields are flattened by add_fields"),
        };

        match field_type {
            FieldType::Option => {
                if !self.long_names.insert(display_name.clone()) {
                    return Err(BuildError::DuplicateDefinition {
                        scope: "option",
                        name: display_name,
                    });
                }
                if let Some(shortcut) = shortcut {
                    if let Some(owner) = self.shortcuts.insert(shortcut, display_name.clone()) {
                        debug!(shortcut = %shortcut, owner = %owner, "shortcut collision");
                        return Err(BuildError::DuplicateDefinition {
                            scope: "shortcut",
                            name: shortcut.to_string(),
                        });
                    }
                }
            }
            FieldType::Subcommand => {
                if !self.subcommand_names.insert(display_name.clone()) {
                    return Err(BuildError::DuplicateDefinition {
                        scope: "sub-command",
                        name: display_name,
                    });
                }
            }
            FieldType::Argument => {}
        }

        let handler = match (handler, &callback) {
            (Some(handler), _) => Some(handler),
            (None, Some(callback)) => Some(lookup_callback(callback).ok_or_else(|| {
                BuildError::UnknownCallback {
                    field: display_name.clone(),
                    callback: callback.clone(),
                }
            })?),
            (None, None) => None,
        };

        let descriptor = FieldDescriptor {
            name: display_name,
            field_type,
            type_hint,
            shortcut,
            help,
            default_value,
            choices,
            callback_name: callback,
            been_set: false,
            binding,
            handler,
        };
        match field_type {
            FieldType::Option => self.schema.options.push(descriptor),
            FieldType::Argument => self.schema.arguments.push(descriptor),
            FieldType::Subcommand => self.schema.subcommands.push(descriptor),
        }

        Ok(())
    }
}
