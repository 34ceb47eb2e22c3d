//! Command-line interface for fmakefile.
//!
//! Defines CLI arguments using clap builder API

use std::path::PathBuf;

use clap::{crate_version, Arg, ArgAction, Command};

use crate::config::{BuildProfile, DependencyMode};

/// CLI arguments parsed from command line
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Project directory
    pub directory: PathBuf,

    /// Config file path (overrides auto-discovery)
    pub config: Option<PathBuf>,

    /// Source encoding label
    pub encoding: Option<String>,

    /// Source file extensions (replace the configured set)
    pub extensions: Vec<String>,

    pub compiler: Option<String>,

    pub appname: Option<String>,

    pub object_extension: Option<String>,

    pub dependency: Option<DependencyMode>,

    pub makefile_name: Option<String>,

    /// Paths excluded from scanning
    pub ignore_paths: Vec<String>,

    /// Modules provided outside the project
    pub ignore_modules: Vec<String>,

    /// Include files provided outside the project
    pub ignore_includes: Vec<String>,

    pub profile: Option<BuildProfile>,

    /// Primary compiler parameters
    pub pparams: Option<String>,

    /// Secondary compiler parameters
    pub sparams: Option<String>,

    /// Clear execute bits of collected sources
    pub drop_execute_flag: bool,

    /// Report empty streams as warnings instead of failing
    pub allow_empty: bool,

    /// Number of parallel jobs (0 = auto, 1 = sequential)
    pub jobs: Option<usize>,

    /// Run make on the generated Makefile
    pub make: bool,

    /// Enable debug output
    pub debug: bool,

    /// Silent mode (errors only)
    pub silent: bool,
}

/// `;`-separated list option that may be repeated
fn list_arg(name: &'static str, help: &'static str, value_name: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .value_name(value_name)
        .value_delimiter(';')
        .action(ArgAction::Append)
}

/// Build the clap Command for parsing CLI arguments
#[must_use]
pub fn build_cli() -> Command {
    Command::new("fmakefile")
        .version(crate_version!())
        .about("Makefile generator for Fortran projects with module dependencies")
        .arg(
            Arg::new("directory")
                .help("Project directory")
                .value_name("DIR")
                .default_value(".")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to configuration file (overrides auto-discovery)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("encoding")
                .long("encoding")
                .help("Encoding of source files [default: guess]")
                .value_name("LABEL"),
        )
        .arg(list_arg(
            "extensions",
            "Source file extensions, separated with ; [default: .f90;.F90;.f;.F;.for;.FOR]",
            "EXT",
        ))
        .arg(
            Arg::new("compiler")
                .long("compiler")
                .help("Compiler [default: ifort]")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("appname")
                .long("appname")
                .help("Application name [default: appname]")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("obj-extension")
                .long("obj-extension")
                .help("Extension of object files [default: .obj]")
                .value_name("EXT"),
        )
        .arg(
            Arg::new("dependence")
                .long("dependence")
                .help("What compile rules depend on for used modules [default: object files]")
                .value_name("MODE")
                .value_parser(["object files", "modules"]),
        )
        .arg(
            Arg::new("makefile-name")
                .long("makefile-name")
                .help("Name of the generated makefile [default: Makefile]")
                .value_name("NAME"),
        )
        .arg(list_arg(
            "ignore-paths",
            "Paths (or glob patterns) to ignore, separated with ;",
            "PATH",
        ))
        .arg(list_arg(
            "ignore-modules",
            "Modules provided outside the project, separated with ;",
            "MODULE",
        ))
        .arg(list_arg(
            "ignore-includes",
            "Include files provided outside the project, separated with ;",
            "FILE",
        ))
        .arg(
            Arg::new("profile")
                .long("profile")
                .help("Compiler flag profile [default: release]")
                .value_name("PROFILE")
                .value_parser(["debug", "release"])
                .conflicts_with_all(["pparams", "sparams"]),
        )
        .arg(
            Arg::new("pparams")
                .long("pparams")
                .help("Primary compiler parameters")
                .value_name("FLAGS")
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("sparams")
                .long("sparams")
                .help("Secondary compiler parameters")
                .value_name("FLAGS")
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("drop-execute-flag")
                .long("drop-execute-flag")
                .help("Make all source files not executable (POSIX systems)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("allow-empty")
                .long("allow-empty")
                .help("Warn about files without recognized content instead of failing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .help("Number of parallel jobs (0=auto, 1=sequential)")
                .value_name("NUM")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("make")
                .long("make")
                .help("Run make on the generated makefile")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .short('D')
                .long("debug")
                .help("Enable debug output (shows config and extracted facts)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('S')
                .long("silent")
                .help("Silent mode (errors only)")
                .action(ArgAction::SetTrue)
                .conflicts_with("debug"),
        )
}

/// Parse CLI arguments from command line
#[must_use]
pub fn parse_args() -> CliArgs {
    args_from_matches(&build_cli().get_matches())
}

/// Parse CLI arguments from an iterator (for testing)
#[must_use]
pub fn parse_args_from<I, T>(args: I) -> CliArgs
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    args_from_matches(&build_cli().get_matches_from(args))
}

fn strings(matches: &clap::ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|vals| vals.filter(|v| !v.is_empty()).cloned().collect())
        .unwrap_or_default()
}

/// Convert clap `ArgMatches` to `CliArgs`
fn args_from_matches(matches: &clap::ArgMatches) -> CliArgs {
    CliArgs {
        directory: matches
            .get_one::<PathBuf>("directory")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(".")),
        config: matches.get_one::<PathBuf>("config").cloned(),
        encoding: matches.get_one::<String>("encoding").cloned(),
        extensions: strings(matches, "extensions"),
        compiler: matches.get_one::<String>("compiler").cloned(),
        appname: matches.get_one::<String>("appname").cloned(),
        object_extension: matches.get_one::<String>("obj-extension").cloned(),
        dependency: matches
            .get_one::<String>("dependence")
            .and_then(|v| v.parse().ok()),
        makefile_name: matches.get_one::<String>("makefile-name").cloned(),
        ignore_paths: strings(matches, "ignore-paths"),
        ignore_modules: strings(matches, "ignore-modules"),
        ignore_includes: strings(matches, "ignore-includes"),
        profile: matches
            .get_one::<String>("profile")
            .and_then(|v| v.parse().ok()),
        pparams: matches.get_one::<String>("pparams").cloned(),
        sparams: matches.get_one::<String>("sparams").cloned(),
        drop_execute_flag: matches.get_flag("drop-execute-flag"),
        allow_empty: matches.get_flag("allow-empty"),
        jobs: matches.get_one::<usize>("jobs").copied(),
        make: matches.get_flag("make"),
        debug: matches.get_flag("debug"),
        silent: matches.get_flag("silent"),
    }
}
