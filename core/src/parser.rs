//! The top-level parser handle.

use std::fmt;
use std::io::{self, Write};

use tracing::{debug, warn};

use crate::callback::Flow;
use crate::error::{BuildResult, ParseResult};
use crate::help::HelpSettings;
use crate::output::SchemaSnapshot;
use crate::schema::ParserSchema;
use crate::spec::Command;

/// A built schema plus the sink that help and callback output go to.
///
/// The parser keeps no reference to the configuration value it was built
/// from; each parse call takes the value to write into.
pub struct Parser<C> {
    schema: ParserSchema<C>,
    output: Box<dyn Write>,
}

impl<C: Command> Parser<C> {
    /// Builds a parser for `conf`'s type with default help settings.
    ///
    /// Current field values of `conf` become the displayed defaults.
    ///
    /// # Errors
    ///
    /// Returns the first [`BuildError`](crate::BuildError) found while
    /// deriving the schema.
    pub fn new(conf: &mut C) -> BuildResult<Self> {
        Self::with_settings(conf, HelpSettings::default())
    }

    /// Builds a parser with explicit help settings, inherited by every
    /// sub-command.
    pub fn with_settings(conf: &mut C, settings: HelpSettings) -> BuildResult<Self> {
        let schema = ParserSchema::build_with(conf, &C::command_name(), &settings)?;
        Ok(Self {
            schema,
            output: Box::new(io::stderr()),
        })
    }

    /// Parses `args` into `conf`, writing help and callback output to the
    /// parser's sink.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`](crate::ParseError) at this level.
    /// Failures inside a sub-command are reported on the sink and come back
    /// as `Ok(Flow::Exit(1))`.
    pub fn parse<I, S>(&mut self, conf: &mut C, args: I) -> ParseResult<Flow>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens = collect(args);
        self.schema.dispatch(conf, &tokens, self.output.as_mut())
    }

    /// Like [`Parser::parse`], with a one-off output sink.
    pub fn parse_with<I, S>(&mut self, conf: &mut C, args: I, out: &mut dyn Write) -> ParseResult<Flow>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens = collect(args);
        self.schema.dispatch(conf, &tokens, out)
    }

    /// Parses `args`; on error writes `error: ...` and the help text to the
    /// sink and returns `Flow::Exit(1)`.
    pub fn run<I, S>(&mut self, conf: &mut C, args: I) -> Flow
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.parse(conf, args) {
            Ok(flow) => flow,
            Err(err) => {
                debug!(error = %err, "parse failed, exit 1");
                let message = self.schema.help_message(Some(&err as &dyn fmt::Display));
                if let Err(io_err) = self.output.write_all(message.as_bytes()) {
                    warn!(error = %io_err, "cannot write help message");
                }
                Flow::Exit(1)
            }
        }
    }
}

impl<C> Parser<C> {
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Overrides the program name shown in the usage line.
    pub fn set_name(&mut self, name: &str) {
        self.schema.set_name(name);
    }

    /// Redirects help and callback output; the default is stderr.
    pub fn set_output(&mut self, output: impl Write + 'static) {
        self.output = Box::new(output);
    }

    pub fn schema(&self) -> &ParserSchema<C> {
        &self.schema
    }

    pub fn help_message(&self, error: Option<&dyn fmt::Display>) -> String {
        self.schema.help_message(error)
    }

    /// Writes the help text to the sink.
    pub fn print_help(&mut self) -> io::Result<()> {
        let message = self.schema.help_message(None);
        self.output.write_all(message.as_bytes())
    }

    pub fn snapshot(&self) -> SchemaSnapshot {
        self.schema.snapshot()
    }
}

impl<C> fmt::Debug for Parser<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

fn collect<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter().map(Into::into).collect()
}
