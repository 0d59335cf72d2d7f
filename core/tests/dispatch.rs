use std::cell::RefCell;
use std::io::{self, Write};
use std::net::IpAddr;
use std::rc::Rc;
use std::sync::Arc;

use chrono::DateTime;
use command_argparse_core::*;

/// Output sink the test keeps a handle to after giving it to the parser.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Inner;

impl Command for Inner {
    fn describe(_spec: &mut Spec<Self>) {}
}

#[derive(Debug, Default)]
struct Foo {
    model: Model,
    toggle: bool,
    count: i32,
    user_name: String,
    paths: Vec<String>,
    level: u8,
    bind: Option<String>,
    timeout: Option<u32>,
    inner: Option<Box<Inner>>,
}

impl Command for Foo {
    fn describe(spec: &mut Spec<Self>) {
        spec.embed("model", |c| &mut c.model);
        spec.option("toggle", |c| &mut c.toggle).short("s");
        spec.option("count", |c| &mut c.count).short("C");
        spec.option("user_name", |c| &mut c.user_name).name("user-name");
        spec.repeated("paths", |c| &mut c.paths).name("path");
        spec.option("level", |c| &mut c.level).choices("3 1 2");
        spec.argument("bind", |c| &mut c.bind);
        spec.argument("timeout", |c| &mut c.timeout);
        spec.subcommand("inner", |c| &mut c.inner);
    }
}

fn foo() -> Foo {
    Foo {
        count: 12,
        user_name: "user".to_string(),
        ..Foo::default()
    }
}

fn setup() -> (Foo, Parser<Foo>, SharedBuffer) {
    let mut conf = foo();
    let mut parser = Parser::new(&mut conf).unwrap();
    let sink = SharedBuffer::default();
    parser.set_output(sink.clone());
    (conf, parser, sink)
}

#[test]
fn test_toggle_is_its_own_inverse() {
    let (mut conf, mut parser, _) = setup();

    parser.parse(&mut conf, ["-s"]).unwrap();
    assert!(conf.toggle);
    parser.parse(&mut conf, ["-s"]).unwrap();
    assert!(!conf.toggle);

    parser.parse(&mut conf, ["--toggle", "--toggle"]).unwrap();
    assert!(!conf.toggle);

    parser.parse(&mut conf, ["-sss"]).unwrap();
    assert!(conf.toggle);
}

#[test]
fn test_integer_option_by_shortcut_and_long_name() {
    let (mut conf, mut parser, _) = setup();

    assert_eq!(parser.parse(&mut conf, ["-C", "123"]).unwrap(), Flow::Continue);
    assert_eq!(conf.count, 123);

    parser.parse(&mut conf, ["--count", "22"]).unwrap();
    assert_eq!(conf.count, 22);
    assert_eq!(conf.user_name, "user");
}

#[test]
fn test_last_write_wins_across_parses() {
    let (mut conf, mut parser, _) = setup();

    parser.parse(&mut conf, ["--count", "333"]).unwrap();
    parser.parse(&mut conf, ["-C", "44"]).unwrap();
    assert_eq!(conf.count, 44);
}

#[test]
fn test_positionals_bind_first_unset_argument() {
    let (mut conf, mut parser, _) = setup();

    parser.parse(&mut conf, [":9999"]).unwrap();
    assert_eq!(conf.bind.as_deref(), Some(":9999"));
    assert_eq!(conf.timeout, None);

    parser.parse(&mut conf, ["98765"]).unwrap();
    assert_eq!(conf.bind.as_deref(), Some(":9999"));
    assert_eq!(conf.timeout, Some(98765));

    let err = parser.parse(&mut conf, ["extra"]).unwrap_err();
    assert!(matches!(err, ParseError::UnknownArgument(ref token) if token == "extra"));
}

#[test]
fn test_repeated_option_keeps_parse_order() {
    let (mut conf, mut parser, _) = setup();

    parser
        .parse(&mut conf, ["--path", "c", "--path", "a", "--path", "b"])
        .unwrap();
    assert_eq!(conf.paths, ["c", "a", "b"]);

    parser.parse(&mut conf, ["--path", "d"]).unwrap();
    assert_eq!(conf.paths, ["c", "a", "b", "d"]);
}

#[test]
fn test_invalid_choice_leaves_field_unmodified() {
    let (mut conf, mut parser, _) = setup();

    parser.parse(&mut conf, ["--level", "2"]).unwrap();
    assert_eq!(conf.level, 2);

    let err = parser.parse(&mut conf, ["--level", "5"]).unwrap_err();
    assert_eq!(err.to_string(), "5 should choice from [1 2 3]");
    assert!(matches!(err, ParseError::InvalidChoice { ref field, .. } if field == "level"));
    assert_eq!(conf.level, 2);
}

#[derive(Default)]
struct Tier {
    tier: String,
}

impl Command for Tier {
    fn describe(spec: &mut Spec<Self>) {
        spec.option("tier", |c| &mut c.tier).short("t").choices("gold silver");
    }
}

#[test]
fn test_invalid_string_choice_leaves_field_unmodified() {
    let mut conf = Tier {
        tier: "gold".to_string(),
    };
    let mut parser = Parser::new(&mut conf).unwrap();

    parser.parse(&mut conf, ["-t", "silver"]).unwrap();
    assert_eq!(conf.tier, "silver");

    let err = parser.parse(&mut conf, ["--tier", "bronze"]).unwrap_err();
    assert!(matches!(err, ParseError::InvalidChoice { ref field, .. } if field == "tier"));
    assert_eq!(conf.tier, "silver");
}

#[test]
fn test_unknown_and_malformed_options() {
    let (mut conf, mut parser, _) = setup();

    let err = parser.parse(&mut conf, ["--nope"]).unwrap_err();
    assert!(matches!(err, ParseError::UnknownOption(ref token) if token == "--nope"));

    let err = parser.parse(&mut conf, ["-x"]).unwrap_err();
    assert!(matches!(err, ParseError::UnknownOption(ref token) if token == "-x"));

    let err = parser.parse(&mut conf, ["--count"]).unwrap_err();
    assert_eq!(err.to_string(), "count: should pass INT");

    let err = parser.parse(&mut conf, ["--count", "twelve"]).unwrap_err();
    assert!(matches!(err, ParseError::InvalidValue { ref field, .. } if field == "count"));
    assert_eq!(conf.count, 12);
}

#[test]
fn test_fail_fast_keeps_earlier_assignments() {
    let (mut conf, mut parser, _) = setup();

    let err = parser
        .parse(&mut conf, ["-s", "--count", "7", "--bogus", "--path", "x"])
        .unwrap_err();
    assert!(matches!(err, ParseError::UnknownOption(_)));
    assert!(conf.toggle);
    assert_eq!(conf.count, 7);
    assert!(conf.paths.is_empty());
}

#[test]
fn test_subcommand_without_fields() {
    let (mut conf, mut parser, sink) = setup();

    assert_eq!(parser.parse(&mut conf, ["inner"]).unwrap(), Flow::Continue);
    assert!(conf.inner.is_some());
    assert!(sink.contents().is_empty());
}

#[test]
fn test_subcommand_failure_renders_child_help() {
    let (mut conf, mut parser, sink) = setup();

    let flow = parser.parse(&mut conf, ["inner", "--bogus"]).unwrap();
    assert_eq!(flow, Flow::Exit(1));
    assert_eq!(sink.contents(), "error: unknown option: --bogus\nusage: inner\n");
}

#[test]
fn test_subcommand_consumes_every_remaining_token() {
    let (mut conf, mut parser, _) = setup();

    let flow = parser.parse(&mut conf, ["inner", "-s"]).unwrap();
    assert_eq!(flow, Flow::Exit(1));
    assert!(!conf.toggle);
}

#[test]
fn test_help_callback_stops_parsing() {
    let (mut conf, mut parser, sink) = setup();

    let flow = parser.parse(&mut conf, ["-h", "--bogus"]).unwrap();
    assert_eq!(flow, Flow::Exit(0));
    assert!(conf.model.help.show_help);
    assert_eq!(sink.contents(), parser.help_message(None));
}

#[test]
fn test_run_reports_top_level_errors() {
    let (mut conf, mut parser, sink) = setup();

    assert_eq!(parser.run(&mut conf, ["--bogus"]), Flow::Exit(1));
    let text = sink.contents();
    assert!(text.starts_with("error: unknown option: --bogus\nusage: foo [OPTION]"));
    assert!(text.ends_with("inner\n"));

    assert_eq!(parser.run(&mut conf, ["-C", "5"]), Flow::Continue);
    assert_eq!(conf.count, 5);
}

#[derive(Default)]
struct Quit {
    stage: String,
    after: bool,
}

impl Command for Quit {
    fn describe(spec: &mut Spec<Self>) {
        spec.option("stage", |c| &mut c.stage)
            .callback("dispatch_test_quit");
        spec.option("after", |c| &mut c.after).short("a");
    }
}

#[test]
fn test_registered_callback_sees_field_and_token() {
    let seen: Handler = Arc::new(|inv: &mut Invocation<'_>| {
        writeln!(inv.out, "{}={}", inv.field(), inv.token().unwrap_or("-"))?;
        Ok(Flow::Exit(3))
    });
    register_callback("dispatch_test_quit", seen).unwrap();

    let mut conf = Quit::default();
    let mut parser = Parser::new(&mut conf).unwrap();
    let mut out = Vec::new();
    let flow = parser
        .parse_with(&mut conf, ["--stage", "deploy", "-a"], &mut out)
        .unwrap();

    assert_eq!(flow, Flow::Exit(3));
    assert_eq!(conf.stage, "deploy");
    assert!(!conf.after);
    assert_eq!(String::from_utf8(out).unwrap(), "stage=deploy\n");
}

#[derive(Default)]
struct Override {
    dry_run: bool,
}

impl Command for Override {
    fn describe(spec: &mut Spec<Self>) {
        spec.option("dry_run", |c| &mut c.dry_run)
            .name("dry-run")
            .callback(HELP_CALLBACK)
            .on_set(Arc::new(|_: &mut Invocation<'_>| Ok(Flow::Continue)));
    }
}

#[test]
fn test_field_handler_takes_precedence_over_registry() {
    let mut conf = Override::default();
    let mut parser = Parser::new(&mut conf).unwrap();
    let mut out = Vec::new();

    let flow = parser.parse_with(&mut conf, ["--dry-run"], &mut out).unwrap();
    assert_eq!(flow, Flow::Continue);
    assert!(conf.dry_run);
    assert!(out.is_empty());
}

#[derive(Default)]
struct Kinds {
    at: DateTime<chrono::FixedOffset>,
    addr: Option<IpAddr>,
    net: Cidr,
    mode: Permission,
    nic: Interface,
    wide: i64,
}

impl Command for Kinds {
    fn describe(spec: &mut Spec<Self>) {
        spec.option("at", |c| &mut c.at);
        spec.option("net", |c| &mut c.net);
        spec.option("mode", |c| &mut c.mode).short("m");
        spec.option("nic", |c| &mut c.nic);
        spec.option("wide", |c| &mut c.wide).short("計");
        spec.argument("addr", |c| &mut c.addr);
    }
}

#[test]
fn test_specialized_scalar_kinds() {
    let mut conf = Kinds::default();
    let mut parser = Parser::new(&mut conf).unwrap();

    parser
        .parse(
            &mut conf,
            [
                "--at",
                "2020-01-02T11:22:33+07:00",
                "--net",
                "10.1.2.3/8",
                "-m",
                "0755",
                "--nic",
                "eth0",
                "::1",
            ],
        )
        .unwrap();

    assert_eq!(conf.at.to_rfc3339(), "2020-01-02T11:22:33+07:00");
    assert_eq!(conf.net.to_string(), "10.0.0.0/8");
    assert_eq!(conf.mode.bits(), 0o755);
    assert_eq!(conf.nic.name(), "eth0");
    assert_eq!(conf.addr, Some("::1".parse().unwrap()));

    parser.parse(&mut conf, ["-m644"]).unwrap();
    assert_eq!(conf.mode.bits(), 0o644);

    for bad in [
        ["--at", "2020-01-02 11:22:33"],
        ["--net", "10.0.0.0/33"],
        ["--mode", "0800"],
        ["--nic", "bad name"],
    ] {
        let err = parser.parse(&mut conf, bad).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }), "{bad:?}: {err}");
    }
}

#[test]
fn test_wide_character_shortcut() {
    let mut conf = Kinds::default();
    let mut parser = Parser::new(&mut conf).unwrap();

    parser.parse(&mut conf, ["-計", "5"]).unwrap();
    assert_eq!(conf.wide, 5);

    parser.parse(&mut conf, ["-計-7"]).unwrap();
    assert_eq!(conf.wide, -7);
}

#[derive(Default)]
struct Accented {
    acute: bool,
    plain: bool,
    tilde: i32,
}

impl Command for Accented {
    fn describe(spec: &mut Spec<Self>) {
        spec.option("acute", |c| &mut c.acute).short("é");
        spec.option("plain", |c| &mut c.plain).short("x");
        spec.option("tilde", |c| &mut c.tilde).short("ñ");
    }
}

#[test]
fn test_multibyte_shortcuts_bundle_and_take_attached_values() {
    let mut conf = Accented::default();
    let mut parser = Parser::new(&mut conf).unwrap();

    parser.parse(&mut conf, ["-éx"]).unwrap();
    assert!(conf.acute);
    assert!(conf.plain);

    parser.parse(&mut conf, ["-xé"]).unwrap();
    assert!(!conf.acute);
    assert!(!conf.plain);

    parser.parse(&mut conf, ["-ñ5"]).unwrap();
    assert_eq!(conf.tilde, 5);

    parser.parse(&mut conf, ["-é"]).unwrap();
    assert!(conf.acute);
}
