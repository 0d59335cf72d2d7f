//! Type-erased write handles into a caller's configuration value.
//!
//! A binding never owns configuration data: it holds an accessor that
//! borrows the field out of the `&mut C` handed to each parse call.

use std::fmt;
use std::io::Write;
use std::rc::Rc;

use tracing::info;

use crate::callback::Flow;
use crate::error::{BuildResult, ParseResult};
use crate::help::HelpSettings;
use crate::output::SchemaSnapshot;
use crate::schema::ParserSchema;
use crate::spec::Command;
use crate::value::{FieldKind, Scalar, ScalarValue};

/// Accessor from a configuration value to one of its fields.
pub(crate) type Lens<C, T> = Rc<dyn Fn(&mut C) -> &mut T>;

/// Scalar-valued write handle.
pub(crate) trait Slot<C> {
    fn kind(&self) -> FieldKind;

    /// Sequence slots append and stay assignable after each write.
    fn is_sequence(&self) -> bool;

    /// Value the coercion starts from; the zero value for fresh elements.
    fn current(&self, conf: &mut C) -> ScalarValue;

    fn store(&self, conf: &mut C, value: ScalarValue) -> Result<(), String>;

    /// Values present at build time, reported as the field's default.
    fn defaults(&self, conf: &mut C) -> Vec<ScalarValue>;
}

/// A plain field: `T`.
pub(crate) struct Single<C, T>(pub Lens<C, T>);

impl<C, T: Scalar> Slot<C> for Single<C, T> {
    fn kind(&self) -> FieldKind {
        T::KIND
    }

    fn is_sequence(&self) -> bool {
        false
    }

    fn current(&self, conf: &mut C) -> ScalarValue {
        (self.0)(conf).to_value()
    }

    fn store(&self, conf: &mut C, value: ScalarValue) -> Result<(), String> {
        *(self.0)(conf) = T::from_value(value)?;
        Ok(())
    }

    fn defaults(&self, conf: &mut C) -> Vec<ScalarValue> {
        let value = (self.0)(conf);
        if value.is_zero() {
            Vec::new()
        } else {
            vec![value.to_value()]
        }
    }
}

/// A nullable field: `Option<T>`, allocated on first write.
pub(crate) struct Optional<C, T>(pub Lens<C, Option<T>>);

impl<C, T: Scalar> Slot<C> for Optional<C, T> {
    fn kind(&self) -> FieldKind {
        T::KIND
    }

    fn is_sequence(&self) -> bool {
        false
    }

    fn current(&self, conf: &mut C) -> ScalarValue {
        (self.0)(conf)
            .as_ref()
            .map_or_else(|| T::zero().to_value(), Scalar::to_value)
    }

    fn store(&self, conf: &mut C, value: ScalarValue) -> Result<(), String> {
        *(self.0)(conf) = Some(T::from_value(value)?);
        Ok(())
    }

    fn defaults(&self, conf: &mut C) -> Vec<ScalarValue> {
        (self.0)(conf).iter().map(Scalar::to_value).collect()
    }
}

/// A repeatable field: `Vec<T>`, one element appended per write.
pub(crate) struct Sequence<C, T>(pub Lens<C, Vec<T>>);

impl<C, T: Scalar> Slot<C> for Sequence<C, T> {
    fn kind(&self) -> FieldKind {
        T::KIND
    }

    fn is_sequence(&self) -> bool {
        true
    }

    fn current(&self, _conf: &mut C) -> ScalarValue {
        T::zero().to_value()
    }

    fn store(&self, conf: &mut C, value: ScalarValue) -> Result<(), String> {
        (self.0)(conf).push(T::from_value(value)?);
        Ok(())
    }

    fn defaults(&self, conf: &mut C) -> Vec<ScalarValue> {
        (self.0)(conf).iter().map(Scalar::to_value).collect()
    }
}

/// A slot declared on an embedded composite, reached through its parent.
pub(crate) struct Embedded<C, E, S: ?Sized> {
    pub outer: Lens<C, E>,
    pub inner: Box<S>,
}

impl<C, E> Slot<C> for Embedded<C, E, dyn Slot<E>> {
    fn kind(&self) -> FieldKind {
        self.inner.kind()
    }

    fn is_sequence(&self) -> bool {
        self.inner.is_sequence()
    }

    fn current(&self, conf: &mut C) -> ScalarValue {
        self.inner.current((self.outer)(conf))
    }

    fn store(&self, conf: &mut C, value: ScalarValue) -> Result<(), String> {
        self.inner.store((self.outer)(conf), value)
    }

    fn defaults(&self, conf: &mut C) -> Vec<ScalarValue> {
        self.inner.defaults((self.outer)(conf))
    }
}

/// Builds a sub-command's schema from a fresh instance of its type.
pub(crate) trait Nest<C> {
    fn build(
        &self,
        name: &str,
        settings: &HelpSettings,
        path: &mut Vec<Frame>,
    ) -> BuildResult<Box<dyn Child<C>>>;
}

/// One level of the sub-command build stack, used for cycle detection.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub type_id: std::any::TypeId,
    pub name: String,
}

/// A built sub-command bound to its parent's `Option<Box<S>>` field.
pub(crate) trait Child<C> {
    /// Hands every remaining token to the child schema.
    ///
    /// A failure inside the child is written to `out` together with the
    /// child's help text and reported as `Flow::Exit(1)`.
    fn dispatch(&mut self, conf: &mut C, tokens: &[String], out: &mut dyn Write)
    -> ParseResult<Flow>;

    fn help_message(&self, error: Option<&dyn fmt::Display>) -> String;

    fn snapshot(&self) -> SchemaSnapshot;
}

pub(crate) struct Subcommand<C, S>(pub Lens<C, Option<Box<S>>>);

impl<C: 'static, S: Command> Nest<C> for Subcommand<C, S> {
    fn build(
        &self,
        name: &str,
        settings: &HelpSettings,
        path: &mut Vec<Frame>,
    ) -> BuildResult<Box<dyn Child<C>>> {
        let mut fresh = S::default();
        let schema = ParserSchema::build_nested(&mut fresh, name, settings, path)?;
        Ok(Box::new(BoundChild {
            lens: Rc::clone(&self.0),
            schema,
        }))
    }
}

struct BoundChild<C, S> {
    lens: Lens<C, Option<Box<S>>>,
    schema: ParserSchema<S>,
}

impl<C, S: Command> Child<C> for BoundChild<C, S> {
    fn dispatch(
        &mut self,
        conf: &mut C,
        tokens: &[String],
        out: &mut dyn Write,
    ) -> ParseResult<Flow> {
        let target = (self.lens)(conf).get_or_insert_with(Box::default);
        match self.schema.dispatch(target, tokens, out) {
            Ok(flow) => Ok(flow),
            Err(err) => {
                info!(subcommand = %self.schema.name, error = %err, "sub-command failed, exit 1");
                let message = self.schema.help_message(Some(&err as &dyn fmt::Display));
                out.write_all(message.as_bytes())?;
                Ok(Flow::Exit(1))
            }
        }
    }

    fn help_message(&self, error: Option<&dyn fmt::Display>) -> String {
        self.schema.help_message(error)
    }

    fn snapshot(&self) -> SchemaSnapshot {
        self.schema.snapshot()
    }
}

impl<C, E> Nest<C> for Embedded<C, E, dyn Nest<E>>
where
    C: 'static,
    E: 'static,
{
    fn build(
        &self,
        name: &str,
        settings: &HelpSettings,
        path: &mut Vec<Frame>,
    ) -> BuildResult<Box<dyn Child<C>>> {
        let inner = self.inner.build(name, settings, path)?;
        Ok(Box::new(Embedded {
            outer: Rc::clone(&self.outer),
            inner,
        }))
    }
}

impl<C, E> Child<C> for Embedded<C, E, dyn Child<E>> {
    fn dispatch(
        &mut self,
        conf: &mut C,
        tokens: &[String],
        out: &mut dyn Write,
    ) -> ParseResult<Flow> {
        self.inner.dispatch((self.outer)(conf), tokens, out)
    }

    fn help_message(&self, error: Option<&dyn fmt::Display>) -> String {
        self.inner.help_message(error)
    }

    fn snapshot(&self) -> SchemaSnapshot {
        self.inner.snapshot()
    }
}
