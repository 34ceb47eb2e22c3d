//! fmakefile - Makefile generator for Fortran projects

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context};
use fmakefile::config::{BuildProfile, EmptyStreamPolicy};
use fmakefile::emit::RECIPES;
use fmakefile::report::directory_tree;
use fmakefile::{parse_args, write_makefile, CliArgs, Config, MakefileHeader, Project, Result};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    let args = parse_args();
    init_logging(&args);
    debug!("arguments: {args:?}");

    let config = build_config(&args)?;

    // Configure thread pool if --jobs specified
    if let Some(jobs) = args.jobs {
        if jobs > 0 {
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build_global()
            {
                warn!("failed to configure thread pool: {e}");
            }
        }
    }
    let parallel = args.jobs != Some(1);

    let project = Project::new(&args.directory, config);
    let config = project.config();
    let header = MakefileHeader::current(config.platform.to_string());

    let files = project.collect_files()?;
    if files.is_empty() {
        bail!(
            "no source files with extensions [{}] found in {}",
            config.extensions.join(", "),
            project.root().display()
        );
    }

    let analysis = project.analyze(&files, parallel)?;

    if !args.silent {
        print!("{}", directory_tree(&analysis.all_paths()));
        println!();
        println!("appname:              {}", config.app_name());
        println!("compiler:             {}", config.compiler);
        println!("primary parameters:   {}", config.primary_flags());
        println!("secondary parameters: {}", config.secondary_flags());
        println!("available recipes:    {RECIPES}");
    }

    if config.drop_execute_flag {
        drop_execute_flags(project.root(), &files)?;
    }

    let schedule = analysis.schedule()?;

    let makefile_path = project.makefile_path();
    let file = File::create(&makefile_path)
        .with_context(|| format!("failed to create {}", makefile_path.display()))?;
    let mut writer = BufWriter::new(file);
    write_makefile(
        &mut writer,
        &header,
        config,
        &analysis.files,
        &schedule,
        &analysis.index,
    )
    .and_then(|()| writer.flush())
    .with_context(|| format!("failed to write {}", makefile_path.display()))?;

    info!("created {}", makefile_path.display());

    if args.make {
        run_make(project.root(), config)?;
    }

    Ok(())
}

/// Initialize the tracing subscriber once; `RUST_LOG` wins over the CLI level
fn init_logging(args: &CliArgs) {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let level = if args.debug {
            Level::DEBUG
        } else if args.silent {
            Level::ERROR
        } else {
            Level::INFO
        };

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("fmakefile={level}")));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    });
}

/// Build configuration from CLI args and config files
///
/// An explicit `--config` file replaces auto-discovery. CLI arguments override
/// whatever the files set.
fn build_config(args: &CliArgs) -> Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        debug!("using explicit config file: {}", config_path.display());
        Config::from_toml_file(config_path)?
    } else {
        let discovered = Config::discover_config_files(&args.directory);
        if discovered.is_empty() {
            debug!("no config files discovered for {}", args.directory.display());
        }
        Config::from_discovered_files(&args.directory)?
    };

    if !args.extensions.is_empty() {
        config.extensions.clone_from(&args.extensions);
    }
    if let Some(encoding) = &args.encoding {
        config.encoding = Some(encoding.clone());
    }
    if let Some(compiler) = &args.compiler {
        config.compiler.clone_from(compiler);
    }
    if let Some(appname) = &args.appname {
        config.appname.clone_from(appname);
    }
    if let Some(ext) = &args.object_extension {
        config.object_extension.clone_from(ext);
    }
    if let Some(dependency) = args.dependency {
        config.dependency = dependency;
    }
    if let Some(name) = &args.makefile_name {
        config.makefile_name.clone_from(name);
    }
    config.ignore_paths.extend(args.ignore_paths.iter().cloned());
    config
        .ignore_modules
        .extend(args.ignore_modules.iter().cloned());
    config
        .ignore_includes
        .extend(args.ignore_includes.iter().cloned());

    if let Some(profile) = args.profile {
        config.profile = profile;
        // An explicit profile means preset flags
        config.pcompiler_params = None;
        config.scompiler_params = None;
    }
    if let Some(pparams) = &args.pparams {
        config.pcompiler_params = Some(pparams.clone());
    }
    if let Some(sparams) = &args.sparams {
        config.scompiler_params = Some(sparams.clone());
    }
    if args.drop_execute_flag {
        config.drop_execute_flag = true;
    }
    if args.allow_empty {
        config.empty_streams = EmptyStreamPolicy::Warn;
    }

    if config.profile == BuildProfile::Debug && config.pcompiler_params.is_some() {
        warn!("explicit primary parameters given; debug profile does not alter them");
    }

    debug!("configuration: {config:#?}");

    if let Some(error) = config.validate() {
        bail!("Invalid configuration: {error}");
    }

    Ok(config)
}

/// Clear the execute bits of every collected source
#[cfg(unix)]
fn drop_execute_flags(root: &Path, files: &[PathBuf]) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for file in files {
        let path = root.join(file);
        let mut permissions = std::fs::metadata(&path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .permissions();
        let mode = permissions.mode();
        if mode & 0o111 != 0 {
            permissions.set_mode(mode & !0o111);
            std::fs::set_permissions(&path, permissions)
                .with_context(|| format!("failed to change mode of {}", path.display()))?;
            debug!("dropped execute flag of {}", path.display());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn drop_execute_flags(_root: &Path, _files: &[PathBuf]) -> Result<()> {
    warn!("--drop-execute-flag has no effect on this platform");
    Ok(())
}

/// Run the platform build tool on the generated makefile
fn run_make(root: &Path, config: &Config) -> Result<()> {
    let tool = config.platform.make_command();
    info!("running {tool} -f {}", config.makefile_name);
    let status = Command::new(tool)
        .arg("-f")
        .arg(&config.makefile_name)
        .current_dir(root)
        .status()
        .with_context(|| format!("failed to run {tool}"))?;
    if !status.success() {
        bail!("{tool} exited with {status}");
    }
    Ok(())
}
