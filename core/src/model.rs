//! Stock option bundles meant to be embedded into any command.

use serde::{Deserialize, Serialize};

use crate::callback::{HELP_CALLBACK, VERSION_CALLBACK};
use crate::spec::{Command, Spec};

/// `-h, --help`: prints the help text and stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Help {
    pub show_help: bool,
}

impl Command for Help {
    fn describe(spec: &mut Spec<Self>) {
        spec.option("show_help", |c| &mut c.show_help)
            .name("help")
            .short("h")
            .help("show this message")
            .callback(HELP_CALLBACK);
    }
}

/// `-v, --version`: prints the crate identification and stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub show_version: bool,
}

impl Command for Version {
    fn describe(spec: &mut Spec<Self>) {
        spec.option("show_version", |c| &mut c.show_version)
            .name("version")
            .short("v")
            .help("show argparse version")
            .callback(VERSION_CALLBACK);
    }
}

/// [`Help`] and [`Version`] together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    #[serde(flatten)]
    pub help: Help,
    #[serde(flatten)]
    pub version: Version,
}

impl Command for Model {
    fn describe(spec: &mut Spec<Self>) {
        spec.embed("help", |c| &mut c.help);
        spec.embed("version", |c| &mut c.version);
    }
}
