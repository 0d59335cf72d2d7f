//! Declarative command-line argument parsing.
//!
//! A configuration type describes its fields once through [`Command`]; from
//! that description the crate derives a parser that:
//!
//! - [`ParserSchema`] / [`Parser`]: binds options (`--name`, `-x`), positional
//!   arguments and nested sub-commands onto the caller's value.
//! - [`coercion_rule`]: coerces tokens by [`FieldKind`] (integers, strings,
//!   RFC 3339 timestamps, IP addresses, [`Cidr`] blocks, octal
//!   [`Permission`] bits, [`Interface`] names).
//! - [`register_callback`]: runs named handlers after an assignment; the
//!   builtin `_help` and `_version` handlers stop parsing with [`Flow::Exit`].
//! - [`HelpSettings`]: renders help text aligned by terminal display width.
//!
//! Schemas can also be exported with [`format_schema`].
//!
//! # Example
//!
//! ```
//! use command_argparse_core::*;
//!
//! #[derive(Default)]
//! struct Foo {
//!     model: Model,
//!     toggle: bool,
//!     count: i32,
//!     user_name: String,
//!     bind: Option<String>,
//! }
//!
//! impl Command for Foo {
//!     fn describe(spec: &mut Spec<Self>) {
//!         spec.embed("model", |c| &mut c.model);
//!         spec.option("toggle", |c| &mut c.toggle).short("s");
//!         spec.option("count", |c| &mut c.count).short("C").help("how many");
//!         spec.option("user_name", |c| &mut c.user_name).name("user-name");
//!         spec.argument("bind", |c| &mut c.bind);
//!     }
//! }
//!
//! let mut foo = Foo { count: 12, user_name: "user".into(), ..Foo::default() };
//! let mut parser = Parser::new(&mut foo).unwrap();
//!
//! let flow = parser.parse(&mut foo, ["-s", "--count", "22", ":9999"]).unwrap();
//! assert_eq!(flow, Flow::Continue);
//! assert!(foo.toggle);
//! assert_eq!(foo.count, 22);
//! assert_eq!(foo.bind.as_deref(), Some(":9999"));
//!
//! let help = parser.help_message(None);
//! assert!(help.starts_with("usage: foo [OPTION] <BIND>\n"));
//! assert!(help.contains("-C INT, --count INT"));
//! assert!(help.contains("how many (default: 12)"));
//! ```

mod binding;
mod callback;
mod coerce;
mod dispatch;
mod error;
mod help;
mod model;
mod output;
mod parser;
mod schema;
mod spec;
mod value;

pub use callback::{
    Flow, HELP_CALLBACK, Handler, Invocation, VERSION_CALLBACK, VERSION_STRING, lookup_callback,
    register_callback,
};
pub use coerce::{CoercionRule, coercion_rule};
pub use error::{BuildError, BuildResult, ParseError, ParseResult, RegistryError};
pub use help::{HelpSettings, display_width};
pub use model::{Help, Model, Version};
pub use output::{FieldSnapshot, OutputFormat, SchemaSnapshot, format_schema};
pub use parser::Parser;
pub use schema::{FieldDescriptor, FieldType, ParserSchema};
pub use spec::{Command, FieldSpec, Spec};
pub use value::{Cidr, FieldKind, Interface, Permission, Scalar, ScalarValue};
