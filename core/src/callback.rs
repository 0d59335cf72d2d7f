//! Field callbacks and the process-wide callback registry.
//!
//! A callback runs after its field is assigned and decides whether parsing
//! continues. The registry is seeded with two handlers: [`HELP_CALLBACK`]
//! renders the owning schema's help text and [`VERSION_CALLBACK`] prints the
//! crate identification; both terminate with status 0.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use command_argparse_core::{Flow, Invocation, lookup_callback, register_callback};
//!
//! register_callback("doc_quit", Arc::new(|_inv: &mut Invocation<'_>| Ok(Flow::Exit(3)))).unwrap();
//! assert!(lookup_callback("doc_quit").is_some());
//! assert!(register_callback("doc_quit", Arc::new(|_inv: &mut Invocation<'_>| Ok(Flow::Continue))).is_err());
//! assert!(lookup_callback("_help").is_some());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::output::SchemaSnapshot;

/// Registry name of the builtin help handler.
pub const HELP_CALLBACK: &str = "_help";
/// Registry name of the builtin version handler.
pub const VERSION_CALLBACK: &str = "_version";

/// Identification printed by the version handler.
pub const VERSION_STRING: &str = concat!(env!("CARGO_PKG_NAME"), " (v", env!("CARGO_PKG_VERSION"), ")");

/// What the caller should do after a parse call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Every token was consumed; carry on with the parsed configuration.
    Continue,
    /// A callback or a sub-command asked to stop with this exit status.
    Exit(i32),
}

impl Flow {
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit(_))
    }
}

/// A callback handler.
pub type Handler = Arc<dyn Fn(&mut Invocation<'_>) -> io::Result<Flow> + Send + Sync>;

/// Read access to the schema that owns the triggering field.
pub(crate) trait HelpSource {
    fn help_message(&self, error: Option<&dyn fmt::Display>) -> String;

    fn snapshot(&self) -> SchemaSnapshot;
}

/// Context handed to a callback.
pub struct Invocation<'a> {
    pub(crate) field: &'a str,
    pub(crate) token: Option<&'a str>,
    pub(crate) source: &'a dyn HelpSource,
    /// Output sink for anything the callback prints.
    pub out: &'a mut dyn Write,
}

impl<'a> Invocation<'a> {
    /// Display name of the field that was just assigned.
    pub fn field(&self) -> &'a str {
        self.field
    }

    /// Value token consumed by the assignment, if any.
    pub fn token(&self) -> Option<&'a str> {
        self.token
    }

    /// Help text of the schema that owns the field.
    pub fn help_message(&self) -> String {
        self.source.help_message(None)
    }

    /// Snapshot of the schema that owns the field.
    pub fn snapshot(&self) -> SchemaSnapshot {
        self.source.snapshot()
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("field", &self.field)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

static REGISTRY: LazyLock<RwLock<HashMap<String, Handler>>> = LazyLock::new(|| {
    let mut handlers: HashMap<String, Handler> = HashMap::new();
    handlers.insert(HELP_CALLBACK.to_string(), Arc::new(show_help));
    handlers.insert(VERSION_CALLBACK.to_string(), Arc::new(show_version));
    RwLock::new(handlers)
});

fn show_help(inv: &mut Invocation<'_>) -> io::Result<Flow> {
    let message = inv.help_message();
    inv.out.write_all(message.as_bytes())?;
    Ok(Flow::Exit(0))
}

fn show_version(inv: &mut Invocation<'_>) -> io::Result<Flow> {
    writeln!(inv.out, "{VERSION_STRING}")?;
    Ok(Flow::Exit(0))
}

/// Adds a handler to the process-wide registry.
///
/// Register handlers before building parsers that name them; a parser binds
/// its handlers at build time.
///
/// # Errors
///
/// Returns [`RegistryError::DuplicateCallback`] if `name` is taken; the
/// existing handler stays in place.
pub fn register_callback(name: &str, handler: Handler) -> Result<(), RegistryError> {
    let mut handlers = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    if handlers.contains_key(name) {
        warn!(callback = name, "rejected duplicated callback");
        return Err(RegistryError::DuplicateCallback(name.to_string()));
    }

    debug!(callback = name, "register callback");
    handlers.insert(name.to_string(), handler);
    Ok(())
}

/// Resolves a handler by name.
pub fn lookup_callback(name: &str) -> Option<Handler> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl HelpSource for Fixed {
        fn help_message(&self, _error: Option<&dyn fmt::Display>) -> String {
            "usage: fixed\n".to_string()
        }

        fn snapshot(&self) -> SchemaSnapshot {
            SchemaSnapshot::default()
        }
    }

    fn invoke(handler: &Handler) -> (Flow, String) {
        let mut out = Vec::new();
        let flow = {
            let mut inv = Invocation {
                field: "help",
                token: None,
                source: &Fixed,
                out: &mut out,
            };
            handler(&mut inv).unwrap()
        };
        (flow, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_builtin_help_renders_and_terminates() {
        let handler = lookup_callback(HELP_CALLBACK).unwrap();
        assert_eq!(invoke(&handler), (Flow::Exit(0), "usage: fixed\n".to_string()));
    }

    #[test]
    fn test_builtin_version_prints_identification() {
        let handler = lookup_callback(VERSION_CALLBACK).unwrap();
        let (flow, text) = invoke(&handler);
        assert_eq!(flow, Flow::Exit(0));
        assert_eq!(text, "command-argparse-core (v0.1.0)\n");
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let first: Handler = Arc::new(|_: &mut Invocation<'_>| Ok(Flow::Exit(7)));
        let second: Handler = Arc::new(|_: &mut Invocation<'_>| Ok(Flow::Continue));

        register_callback("registry_test_dup", first).unwrap();
        assert_eq!(
            register_callback("registry_test_dup", second),
            Err(RegistryError::DuplicateCallback(
                "registry_test_dup".to_string()
            ))
        );

        let kept = lookup_callback("registry_test_dup").unwrap();
        assert_eq!(invoke(&kept).0, Flow::Exit(7));
    }

    #[test]
    fn test_builtins_cannot_be_replaced() {
        let handler: Handler = Arc::new(|_: &mut Invocation<'_>| Ok(Flow::Continue));
        assert!(register_callback(HELP_CALLBACK, handler).is_err());
    }
}
