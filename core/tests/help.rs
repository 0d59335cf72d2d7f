use command_argparse_core::*;

#[derive(Default)]
struct Inner {
    quiet: bool,
}

impl Command for Inner {
    fn describe(spec: &mut Spec<Self>) {
        spec.option("quiet", |c| &mut c.quiet).short("q").help("say less");
    }
}

#[derive(Default)]
struct Foo {
    model: Model,
    toggle: bool,
    count: i32,
    user_name: String,
    bind: Option<String>,
    timeout: Option<u32>,
    inner: Option<Box<Inner>>,
}

impl Command for Foo {
    fn describe(spec: &mut Spec<Self>) {
        spec.embed("model", |c| &mut c.model);
        spec.option("toggle", |c| &mut c.toggle).short("s");
        spec.option("count", |c| &mut c.count)
            .short("C")
            .help("save as the integer");
        spec.option("user_name", |c| &mut c.user_name).name("user-name");
        spec.argument("bind", |c| &mut c.bind).help("listen address");
        spec.argument("timeout", |c| &mut c.timeout);
        spec.subcommand("inner", |c| &mut c.inner).help("nested command");
    }
}

fn foo() -> Foo {
    Foo {
        count: 12,
        user_name: "user".to_string(),
        ..Foo::default()
    }
}

const FOO_HELP: &str = "\
usage: foo [OPTION] <BIND> <TIMEOUT> [SUB-COMMAND]

option:
        -h, --help             show this message
        -v, --version          show argparse version
        -s, --toggle
    -C INT, --count INT        save as the integer (default: 12)
            --user-name STR    (default: user)

argument:
    BIND                       listen address
    TIMEOUT

sub-command:
    inner                      nested command
";

#[test]
fn test_help_layout() {
    let mut conf = foo();
    let parser = Parser::new(&mut conf).unwrap();
    assert_eq!(parser.help_message(None), FOO_HELP);
}

#[test]
fn test_help_with_error_line() {
    let mut conf = foo();
    let parser = Parser::new(&mut conf).unwrap();
    let err = ParseError::UnknownOption("--bogus".to_string());

    let text = parser.help_message(Some(&err as &dyn std::fmt::Display));
    assert_eq!(text, format!("error: unknown option: --bogus\n{FOO_HELP}"));
}

#[test]
fn test_help_callback_prints_the_same_text() {
    let mut conf = foo();
    let mut parser = Parser::new(&mut conf).unwrap();
    let mut out = Vec::new();

    let flow = parser.parse_with(&mut conf, ["--help"], &mut out).unwrap();
    assert_eq!(flow, Flow::Exit(0));
    assert_eq!(String::from_utf8(out).unwrap(), FOO_HELP);
}

#[test]
fn test_subcommand_help_and_callback_inside_child() {
    let mut conf = foo();
    let mut parser = Parser::new(&mut conf).unwrap();

    assert_eq!(
        parser.schema().subcommand_help("inner").unwrap(),
        "usage: inner [OPTION]\n\noption:\n    -q, --quiet    say less\n"
    );
    assert!(parser.schema().subcommand_help("outer").is_none());

    let mut out = Vec::new();
    let flow = parser.parse_with(&mut conf, ["inner", "-q"], &mut out).unwrap();
    assert_eq!(flow, Flow::Continue);
    assert!(conf.inner.as_ref().unwrap().quiet);
    assert!(out.is_empty());
}

#[derive(Default)]
struct Wide {
    ascii: i32,
    wide: i32,
}

impl Command for Wide {
    fn describe(spec: &mut Spec<Self>) {
        spec.option("ascii", |c| &mut c.ascii).short("a").help("narrow");
        spec.option("wide", |c| &mut c.wide).short("計").help("wide");
    }
}

#[test]
fn test_wide_shortcut_keeps_columns_aligned() {
    let mut conf = Wide::default();
    let parser = Parser::new(&mut conf).unwrap();
    let text = parser.help_message(None);

    let rows: Vec<&str> = text.lines().filter(|line| line.contains("--")).collect();
    assert_eq!(rows.len(), 2);

    let name_column: Vec<usize> = rows
        .iter()
        .map(|row| display_width(&row[..row.find("--").unwrap()]))
        .collect();
    assert_eq!(name_column[0], name_column[1]);

    let help_column: Vec<usize> = rows
        .iter()
        .map(|row| display_width(row.trim_end_matches(|c: char| c.is_alphabetic())))
        .collect();
    assert_eq!(help_column[0], help_column[1]);

    assert_eq!(rows[1], "    -計 INT, --wide INT     wide");
}

#[test]
fn test_custom_settings_are_inherited() {
    let settings = HelpSettings {
        margin: 2,
        gap: 2,
        option_title: "Options".to_string(),
        subcommand_title: "Commands".to_string(),
        ..HelpSettings::default()
    };
    let mut conf = foo();
    let parser = Parser::with_settings(&mut conf, settings).unwrap();

    let text = parser.help_message(None);
    assert!(text.contains("\nOptions:\n      -h, --help           show this message\n"));
    assert!(text.contains("\nargument:\n  BIND                     listen address\n"));
    assert!(text.contains("\nCommands:\n"));

    assert_eq!(
        parser.schema().subcommand_help("inner").unwrap(),
        "usage: inner [OPTION]\n\nOptions:\n  -q, --quiet  say less\n"
    );
}

#[test]
fn test_set_name_changes_usage_line() {
    let mut conf = foo();
    let mut parser = Parser::new(&mut conf).unwrap();
    parser.set_name("demo");
    assert!(parser.help_message(None).starts_with("usage: demo [OPTION]"));
}
