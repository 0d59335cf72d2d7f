//! Left-to-right token dispatch against a built schema.

use std::io::Write;
use std::ops::ControlFlow;

use tracing::{debug, info};

use crate::callback::{Flow, Invocation};
use crate::error::{ParseError, ParseResult};
use crate::schema::{FieldDescriptor, FieldType, ParserSchema};

/// Outcome of one assignment: tokens consumed, or a callback's stop request.
type Step = ControlFlow<Flow, usize>;

impl<C: 'static> ParserSchema<C> {
    /// Consumes `tokens` in order, writing through the bindings into `conf`.
    ///
    /// The first error aborts the call. Fields assigned by earlier tokens
    /// keep their new values.
    pub(crate) fn dispatch(
        &mut self,
        conf: &mut C,
        tokens: &[String],
        out: &mut dyn Write,
    ) -> ParseResult<Flow> {
        let mut index = 0;
        while index < tokens.len() {
            let token = &tokens[index];
            let rest = &tokens[index + 1..];
            debug!(schema = %self.name, token = %token, "dispatch token");

            let step = match token.strip_prefix("--") {
                Some(name) if !name.is_empty() => {
                    let slot = self
                        .options
                        .iter()
                        .position(|field| field.name == name)
                        .ok_or_else(|| ParseError::UnknownOption(token.clone()))?;
                    self.assign(FieldType::Option, slot, conf, rest, out)?
                        .map_continue(|consumed| consumed + 1)
                }
                _ if token.len() > 1 && token.starts_with('-') => {
                    self.dispatch_short(conf, token, rest, out)?
                }
                _ => {
                    if let Some(slot) = self.subcommands.iter().position(|field| field.name == *token) {
                        return self.enter(slot, conf, rest, out);
                    }
                    let slot = self
                        .arguments
                        .iter()
                        .position(|field| !field.been_set)
                        .ok_or_else(|| ParseError::UnknownArgument(token.clone()))?;
                    self.assign(FieldType::Argument, slot, conf, &tokens[index..], out)?
                }
            };

            match step {
                ControlFlow::Continue(advance) => index += advance.max(1),
                ControlFlow::Break(flow) => return Ok(flow),
            }
        }

        Ok(Flow::Continue)
    }

    /// `-x`, `-x VALUE`, `-xVALUE` and `-abc`.
    fn dispatch_short(
        &mut self,
        conf: &mut C,
        token: &str,
        rest: &[String],
        out: &mut dyn Write,
    ) -> ParseResult<Step> {
        let body = &token[1..];

        if body.chars().count() == 1 {
            let slot = self
                .options
                .iter()
                .position(|field| field.shortcut.is_some_and(|c| c.to_string() == body))
                .ok_or_else(|| ParseError::UnknownOption(token.to_string()))?;
            return Ok(self
                .assign(FieldType::Option, slot, conf, rest, out)?
                .map_continue(|consumed| consumed + 1));
        }

        let mut chars = body.chars();
        if let Some(first) = chars.next() {
            if let Some(slot) = self.shortcut_slot(first).filter(|&slot| self.options[slot].takes_value()) {
                let attached = [chars.as_str().to_string()];
                debug!(shortcut = %first, value = %attached[0], "attached shortcut value");
                return Ok(self
                    .assign(FieldType::Option, slot, conf, &attached, out)?
                    .map_continue(|_| 1));
            }
        }

        for shortcut in body.chars() {
            let slot = self
                .shortcut_slot(shortcut)
                .filter(|&slot| !self.options[slot].takes_value())
                .ok_or_else(|| ParseError::UnknownOption(format!("-{shortcut}")))?;
            if let ControlFlow::Break(flow) = self.assign(FieldType::Option, slot, conf, &[], out)? {
                return Ok(ControlFlow::Break(flow));
            }
        }

        Ok(ControlFlow::Continue(1))
    }

    fn shortcut_slot(&self, shortcut: char) -> Option<usize> {
        self.options
            .iter()
            .position(|field| field.shortcut == Some(shortcut))
    }

    fn field_mut(&mut self, field_type: FieldType, slot: usize) -> &mut FieldDescriptor<C> {
        match field_type {
            FieldType::Option => &mut self.options[slot],
            FieldType::Argument => &mut self.arguments[slot],
            FieldType::Subcommand => &mut self.subcommands[slot],
        }
    }

    /// Writes one value, then runs the field's handler, if any.
    fn assign(
        &mut self,
        field_type: FieldType,
        slot: usize,
        conf: &mut C,
        tokens: &[String],
        out: &mut dyn Write,
    ) -> ParseResult<Step> {
        let field = self.field_mut(field_type, slot);
        let consumed = field.apply(conf, tokens)?;
        field.been_set = !field.is_sequence();

        let Some(handler) = field.handler.clone() else {
            return Ok(ControlFlow::Continue(consumed));
        };
        let name = field.name.clone();
        let token = tokens.first().filter(|_| consumed > 0).map(String::as_str);

        let mut invocation = Invocation {
            field: &name,
            token,
            source: &*self,
            out,
        };
        match handler(&mut invocation)? {
            Flow::Continue => Ok(ControlFlow::Continue(consumed)),
            flow => {
                info!(field = %name, flow = ?flow, "callback stopped parsing");
                Ok(ControlFlow::Break(flow))
            }
        }
    }

    /// Hands every remaining token to the sub-command at `slot`.
    fn enter(
        &mut self,
        slot: usize,
        conf: &mut C,
        rest: &[String],
        out: &mut dyn Write,
    ) -> ParseResult<Flow> {
        let field = &mut self.subcommands[slot];
        field.been_set = true;
        debug!(subcommand = %field.name, remaining = rest.len(), "enter sub-command");

        match field.child_mut() {
            Some(child) => child.dispatch(conf, rest, out),
            None => Ok(Flow::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Command, Flow, ParseError, ParserSchema, Spec};

    #[derive(Default)]
    struct Flags {
        all: bool,
        long: bool,
        depth: u8,
        name: Option<String>,
    }

    impl Command for Flags {
        fn describe(spec: &mut Spec<Self>) {
            spec.option("all", |c| &mut c.all).short("a");
            spec.option("long", |c| &mut c.long).short("l");
            spec.option("depth", |c| &mut c.depth).short("d");
            spec.argument("name", |c| &mut c.name);
        }
    }

    fn run(conf: &mut Flags, args: &[&str]) -> Result<Flow, ParseError> {
        let mut schema = ParserSchema::build(conf).unwrap();
        let tokens: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        schema.dispatch(conf, &tokens, &mut Vec::new())
    }

    #[test]
    fn test_bundle_toggles_each_flag() {
        let mut conf = Flags::default();
        assert_eq!(run(&mut conf, &["-al"]).unwrap(), Flow::Continue);
        assert!(conf.all);
        assert!(conf.long);
    }

    #[test]
    fn test_attached_value_after_shortcut() {
        let mut conf = Flags::default();
        run(&mut conf, &["-d3", "x"]).unwrap();
        assert_eq!(conf.depth, 3);
        assert_eq!(conf.name.as_deref(), Some("x"));
    }

    #[test]
    fn test_value_shortcut_inside_bundle_is_unknown() {
        let mut conf = Flags::default();
        let err = run(&mut conf, &["-ad"]).unwrap_err();
        assert!(matches!(err, ParseError::UnknownOption(ref s) if s == "-d"));
        // fail-fast: the first bundle member stays toggled
        assert!(conf.all);
    }

    #[test]
    fn test_single_dash_is_a_bare_token() {
        let mut conf = Flags::default();
        run(&mut conf, &["-"]).unwrap();
        assert_eq!(conf.name.as_deref(), Some("-"));
    }

    #[test]
    fn test_int_width_overflow_is_invalid_value() {
        let mut conf = Flags::default();
        let err = run(&mut conf, &["--depth", "300"]).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { ref field, .. } if field == "depth"));
        assert_eq!(conf.depth, 0);
    }
}
