use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use command_argparse_core::{
    Cidr, Command, Flow, Handler, Interface, Invocation, Model, OutputFormat, Parser, Permission,
    Spec, format_schema,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "ARGPARSE_LOG";

#[derive(Debug, Serialize)]
struct Demo {
    #[serde(skip)]
    model: Model,
    verbose: bool,
    count: i64,
    user: String,
    level: String,
    since: DateTime<FixedOffset>,
    listen: IpAddr,
    network: Cidr,
    mode: Permission,
    iface: Interface,
    paths: Vec<String>,
    #[serde(skip)]
    schema: String,
    action: Option<String>,
    targets: Vec<String>,
    log: Option<Box<Log>>,
}

#[derive(Debug, Default, Serialize)]
struct Log {
    #[serde(skip)]
    model: Model,
    follow: bool,
    lines: u32,
    unit: Option<String>,
}

impl Command for Demo {
    fn describe(spec: &mut Spec<Self>) {
        spec.embed("model", |c| &mut c.model);
        spec.option("verbose", |c| &mut c.verbose)
            .short("V")
            .help("print more detail");
        spec.option("count", |c| &mut c.count)
            .short("c")
            .help("number of rounds");
        spec.option("user", |c| &mut c.user).short("u").help("user name");
        spec.option("level", |c| &mut c.level)
            .choices("debug info warn error")
            .help("severity threshold");
        spec.option("since", |c| &mut c.since);
        spec.option("listen", |c| &mut c.listen).help("listen address");
        spec.option("network", |c| &mut c.network).help("allowed clients");
        spec.option("mode", |c| &mut c.mode).short("m");
        spec.option("iface", |c| &mut c.iface).short("i");
        spec.repeated("paths", |c| &mut c.paths)
            .name("path")
            .short("p")
            .help("search path, repeatable");
        spec.option("schema", |c| &mut c.schema)
            .choices("json yaml markdown")
            .help("dump the parser schema and exit")
            .on_set(dump_schema());
        spec.argument("action", |c| &mut c.action)
            .choices("start stop status")
            .help("what to do");
        spec.arguments("targets", |c| &mut c.targets).help("services to act on");
        spec.subcommand("log", |c| &mut c.log).help("show service logs");
    }
}

impl Command for Log {
    fn describe(spec: &mut Spec<Self>) {
        spec.embed("model", |c| &mut c.model);
        spec.option("follow", |c| &mut c.follow)
            .short("f")
            .help("keep streaming");
        spec.option("lines", |c| &mut c.lines)
            .short("n")
            .help("lines of history");
        spec.argument("unit", |c| &mut c.unit).help("service unit");
    }
}

impl Default for Demo {
    fn default() -> Self {
        Self {
            model: Model::default(),
            verbose: false,
            count: 1,
            user: "nobody".to_string(),
            level: "info".to_string(),
            since: DateTime::default(),
            listen: IpAddr::V4(Ipv4Addr::LOCALHOST),
            network: Cidr::default(),
            mode: Permission::default(),
            iface: Interface::default(),
            paths: Vec::new(),
            schema: String::new(),
            action: None,
            targets: Vec::new(),
            log: None,
        }
    }
}

/// Writes the schema of the owning parser in the requested format.
fn dump_schema() -> Handler {
    Arc::new(|inv: &mut Invocation<'_>| {
        let format: OutputFormat = inv
            .token()
            .unwrap_or("json")
            .parse()
            .map_err(|e: String| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let text = format_schema(&inv.snapshot(), format).map_err(io::Error::other)?;
        writeln!(inv.out, "{}", text.trim_end())?;
        Ok(Flow::Exit(0))
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .try_init();
    if let Err(err) = result {
        eprintln!("warning: cannot install log subscriber: {err}");
    }
}

fn main() {
    init_logging();

    let mut demo = Demo::default();
    let mut parser = match Parser::new(&mut demo) {
        Ok(parser) => parser,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };
    parser.set_name("argparse-demo");
    parser.set_output(io::stdout());

    let args: Vec<String> = std::env::args().skip(1).collect();
    debug!(args = ?args, "parse command line");

    match parser.run(&mut demo, args) {
        Flow::Continue => {
            info!(action = ?demo.action, "parsed configuration");
            match serde_json::to_string_pretty(&demo) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    eprintln!("error: JSON serialization failed: {err}");
                    std::process::exit(1);
                }
            }
        }
        Flow::Exit(code) => std::process::exit(code),
    }
}
