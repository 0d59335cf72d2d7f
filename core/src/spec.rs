//! Declarative configuration descriptions.
//!
//! A configuration type implements [`Command`] and lists its fields, in
//! declaration order, through the record constructors on [`Spec`]. Each
//! record carries the field identifier, an accessor that borrows the field
//! out of the configuration value, and an annotation set.
//!
//! # Examples
//!
//! ```
//! use command_argparse_core::{Command, Help, Spec};
//!
//! #[derive(Default)]
//! struct Serve {
//!     help: Help,
//!     verbose: bool,
//!     port: u16,
//!     root: Option<String>,
//! }
//!
//! impl Command for Serve {
//!     fn describe(spec: &mut Spec<Self>) {
//!         spec.embed("help", |c| &mut c.help);
//!         spec.option("verbose", |c| &mut c.verbose).short("V");
//!         spec.option("port", |c| &mut c.port).short("p").help("listen port");
//!         spec.argument("root", |c| &mut c.root).help("document root");
//!     }
//! }
//!
//! assert_eq!(Serve::command_name(), "serve");
//! ```

use std::any::type_name;
use std::rc::Rc;

use crate::binding::{Embedded, Lens, Nest, Optional, Sequence, Single, Slot, Subcommand};
use crate::callback::Handler;
use crate::value::Scalar;

/// A configuration type a parser can be built from.
pub trait Command: Default + 'static {
    /// Appends this type's field records to `spec`, in declaration order.
    fn describe(spec: &mut Spec<Self>);

    /// Program name used in the usage line: the lowercase type name.
    fn command_name() -> String {
        let full = type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base).to_lowercase()
    }
}

/// Ordered list of field records for one configuration type.
pub struct Spec<C> {
    pub(crate) fields: Vec<FieldSpec<C>>,
}

/// One declared field: identifier, binding and annotations.
pub struct FieldSpec<C> {
    pub(crate) ident: String,
    pub(crate) name: Option<String>,
    pub(crate) short: Option<String>,
    pub(crate) help: Option<String>,
    pub(crate) callback: Option<String>,
    pub(crate) choices: Option<String>,
    pub(crate) ignore: bool,
    pub(crate) handler: Option<Handler>,
    pub(crate) access: Access<C>,
}

/// Declared kind of a record.
pub(crate) enum Access<C> {
    Option(Box<dyn Slot<C>>),
    Argument(Box<dyn Slot<C>>),
    Subcommand(Box<dyn Nest<C>>),
    Embedded(Vec<FieldSpec<C>>),
}

impl<C: 'static> Default for Spec<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> Spec<C> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Describes `C` into a fresh spec.
    pub fn of() -> Self
    where
        C: Command,
    {
        let mut spec = Self::new();
        C::describe(&mut spec);
        spec
    }

    fn push(&mut self, ident: &str, access: Access<C>) -> &mut FieldSpec<C> {
        self.fields.push(FieldSpec {
            ident: ident.to_string(),
            name: None,
            short: None,
            help: None,
            callback: None,
            choices: None,
            ignore: false,
            handler: None,
            access,
        });
        let last = self.fields.len() - 1;
        &mut self.fields[last]
    }

    /// A named option holding a single value.
    pub fn option<T, F>(&mut self, ident: &str, lens: F) -> &mut FieldSpec<C>
    where
        T: Scalar,
        F: Fn(&mut C) -> &mut T + 'static,
    {
        let lens: Lens<C, T> = Rc::new(lens);
        self.push(ident, Access::Option(Box::new(Single(lens))))
    }

    /// A named option that may repeat; each occurrence appends.
    pub fn repeated<T, F>(&mut self, ident: &str, lens: F) -> &mut FieldSpec<C>
    where
        T: Scalar,
        F: Fn(&mut C) -> &mut Vec<T> + 'static,
    {
        let lens: Lens<C, Vec<T>> = Rc::new(lens);
        self.push(ident, Access::Option(Box::new(Sequence(lens))))
    }

    /// A positional argument, `None` until bound.
    pub fn argument<T, F>(&mut self, ident: &str, lens: F) -> &mut FieldSpec<C>
    where
        T: Scalar,
        F: Fn(&mut C) -> &mut Option<T> + 'static,
    {
        let lens: Lens<C, Option<T>> = Rc::new(lens);
        self.push(ident, Access::Argument(Box::new(Optional(lens))))
    }

    /// A positional argument that takes every remaining bare token.
    pub fn arguments<T, F>(&mut self, ident: &str, lens: F) -> &mut FieldSpec<C>
    where
        T: Scalar,
        F: Fn(&mut C) -> &mut Vec<T> + 'static,
    {
        let lens: Lens<C, Vec<T>> = Rc::new(lens);
        self.push(ident, Access::Argument(Box::new(Sequence(lens))))
    }

    /// A nested command, allocated when its name appears on the command line.
    pub fn subcommand<S, F>(&mut self, ident: &str, lens: F) -> &mut FieldSpec<C>
    where
        S: Command,
        F: Fn(&mut C) -> &mut Option<Box<S>> + 'static,
    {
        let lens: Lens<C, Option<Box<S>>> = Rc::new(lens);
        self.push(ident, Access::Subcommand(Box::new(Subcommand(lens))))
    }

    /// Mixes the fields of `E` in at this level, as if declared inline.
    pub fn embed<E, F>(&mut self, ident: &str, lens: F) -> &mut FieldSpec<C>
    where
        E: Command,
        F: Fn(&mut C) -> &mut E + 'static,
    {
        let outer: Lens<C, E> = Rc::new(lens);
        let fields = Spec::<E>::of()
            .fields
            .into_iter()
            .map(|field| field.lift(&outer))
            .collect();
        self.push(ident, Access::Embedded(fields))
    }
}

impl<C> FieldSpec<C> {
    /// Display name override, in place of the lowercase identifier.
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    /// Single-character short form of an option.
    pub fn short(&mut self, short: &str) -> &mut Self {
        self.short = Some(short.to_string());
        self
    }

    pub fn help(&mut self, help: &str) -> &mut Self {
        self.help = Some(help.to_string());
        self
    }

    /// Registry handler run after each assignment.
    pub fn callback(&mut self, name: &str) -> &mut Self {
        self.callback = Some(name.to_string());
        self
    }

    /// Whitespace-separated list of allowed values.
    pub fn choices(&mut self, choices: &str) -> &mut Self {
        self.choices = Some(choices.to_string());
        self
    }

    /// Excludes the field from the schema entirely.
    pub fn ignore(&mut self) -> &mut Self {
        self.ignore = true;
        self
    }

    /// Per-field handler, resolved ahead of the callback registry.
    pub fn on_set(&mut self, handler: Handler) -> &mut Self {
        self.handler = Some(handler);
        self
    }

    /// Re-targets a record declared on an embedded type at its parent.
    fn lift<P: 'static>(self, outer: &Lens<P, C>) -> FieldSpec<P>
    where
        C: 'static,
    {
        let access = match self.access {
            Access::Option(slot) => Access::Option(Box::new(Embedded {
                outer: Rc::clone(outer),
                inner: slot,
            }) as Box<dyn Slot<P>>),
            Access::Argument(slot) => Access::Argument(Box::new(Embedded {
                outer: Rc::clone(outer),
                inner: slot,
            }) as Box<dyn Slot<P>>),
            Access::Subcommand(nest) => Access::Subcommand(Box::new(Embedded {
                outer: Rc::clone(outer),
                inner: nest,
            }) as Box<dyn Nest<P>>),
            Access::Embedded(fields) => Access::Embedded(
                fields.into_iter().map(|field| field.lift(outer)).collect(),
            ),
        };

        FieldSpec {
            ident: self.ident,
            name: self.name,
            short: self.short,
            help: self.help,
            callback: self.callback,
            choices: self.choices,
            ignore: self.ignore,
            handler: self.handler,
            access,
        }
    }
}
