//! Configuration management for fmakefile.
//!
//! This module provides the [`Config`] struct which controls project analysis
//! and Makefile generation. Configuration can be loaded from:
//! - TOML files (`fmakefile.toml`)
//! - CLI arguments (which override file settings)
//!
//! Config files are auto-discovered in the user's home directory and in every
//! directory from the filesystem root down to the project directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Config file names to search for (in order of priority, later overrides earlier)
const CONFIG_FILE_NAMES: &[&str] = &["fmakefile.toml"];

/// Get the user's home directory
fn dirs_home() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home));
    }
    // Fallback for Windows
    if let Ok(userprofile) = std::env::var("USERPROFILE") {
        return Some(PathBuf::from(userprofile));
    }
    None
}

/// Host platform, selects presets and the executable suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
}

impl Platform {
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Suffix appended to the application name
    #[must_use]
    pub fn executable_suffix(self) -> &'static str {
        match self {
            Self::Linux => ".x",
            Self::Windows => ".exe",
        }
    }

    /// Build tool used by `--make`
    #[must_use]
    pub fn make_command(self) -> &'static str {
        match self {
            Self::Linux => "make",
            Self::Windows => "nmake",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => f.write_str("Linux"),
            Self::Windows => f.write_str("Windows"),
        }
    }
}

/// What compile-rule prerequisites point at for used modules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyMode {
    /// Object file of the module's defining source
    #[default]
    #[serde(rename = "object files")]
    ObjectFiles,
    /// `<module>.mod`
    #[serde(rename = "modules")]
    Modules,
}

impl FromStr for DependencyMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "object files" => Ok(Self::ObjectFiles),
            "modules" => Ok(Self::Modules),
            other => {
                bail!("unexpected dependence mode `{other}`, expected `object files` or `modules`")
            }
        }
    }
}

/// Compiler flag profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    #[default]
    Release,
    /// Preset flags with `O3` lowered to `O1`
    Debug,
}

impl FromStr for BuildProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "release" => Ok(Self::Release),
            "debug" => Ok(Self::Debug),
            other => bail!("unexpected profile `{other}`, expected `debug` or `release`"),
        }
    }
}

/// How files without any recognized facts are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyStreamPolicy {
    #[default]
    Error,
    Warn,
}

/// Default flags and externally provided units of a known compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerPreset {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub std_modules: &'static [&'static str],
    pub std_includes: &'static [&'static str],
}

const INTEL_MODULES: &[&str] = &[
    "ifport", "ifposix", "ifcore", "ifqwin", "iflogm", "ifcom", "ifauto", "omp_lib", "dfport",
    "dflib", "dfwin", "dflogm", "dfauto",
];

const IFORT_LINUX: CompilerPreset = CompilerPreset {
    primary: "-O3 -fpp -diag-disable 7000,7734,7954,8290,8291",
    secondary: "-qopenmp",
    std_modules: INTEL_MODULES,
    std_includes: &["omp_lib.h"],
};

const IFORT_WINDOWS: CompilerPreset = CompilerPreset {
    primary: "/O3 /fpp /Qdiag-disable:7000,7734,7954,8290,8291 /nologo",
    secondary: "/Qopenmp",
    std_modules: INTEL_MODULES,
    std_includes: &["omp_lib.h"],
};

const GFORTRAN: CompilerPreset = CompilerPreset {
    primary: "-O3 -fsyntax-only",
    secondary: "-fopenmp",
    std_modules: &[],
    std_includes: &[],
};

/// Preset for `compiler` on `platform`, if it is a known compiler
#[must_use]
pub fn preset(compiler: &str, platform: Platform) -> Option<CompilerPreset> {
    let name = Path::new(compiler)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(compiler);
    match (name, platform) {
        ("ifort", Platform::Linux) => Some(IFORT_LINUX),
        ("ifort", Platform::Windows) => Some(IFORT_WINDOWS),
        ("gfortran", _) => Some(GFORTRAN),
        _ => None,
    }
}

// Serde default functions
fn default_extensions() -> Vec<String> {
    [".f90", ".F90", ".f", ".F", ".for", ".FOR"]
        .iter()
        .map(ToString::to_string)
        .collect()
}
fn default_object_extension() -> String {
    ".obj".to_string()
}
fn default_appname() -> String {
    "appname".to_string()
}
fn default_compiler() -> String {
    "ifort".to_string()
}
fn default_makefile_name() -> String {
    "Makefile".to_string()
}
fn default_wrap_width() -> usize {
    80
}

/// Main configuration struct for fmakefile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Filename suffixes treated as Fortran source
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Project subdirectories (or glob patterns) excluded from scanning
    #[serde(default)]
    pub ignore_paths: Vec<String>,

    /// Modules provided outside the project, on top of the compiler preset
    #[serde(default)]
    pub ignore_modules: Vec<String>,

    /// Include files provided outside the project, on top of the compiler preset
    #[serde(default)]
    pub ignore_includes: Vec<String>,

    /// Source encoding label, auto-detected when absent
    #[serde(default)]
    pub encoding: Option<String>,

    #[serde(default)]
    pub dependency: DependencyMode,

    #[serde(default = "default_object_extension")]
    pub object_extension: String,

    /// Executable name without platform suffix
    #[serde(default = "default_appname")]
    pub appname: String,

    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Primary compiler parameters, preset when absent
    #[serde(default)]
    pub pcompiler_params: Option<String>,

    /// Secondary compiler parameters, preset when absent
    #[serde(default)]
    pub scompiler_params: Option<String>,

    #[serde(default)]
    pub profile: BuildProfile,

    #[serde(default = "default_makefile_name")]
    pub makefile_name: String,

    /// Clear execute bits of collected sources (Unix only)
    #[serde(default)]
    pub drop_execute_flag: bool,

    #[serde(default)]
    pub empty_streams: EmptyStreamPolicy,

    /// Width of wrapped `OBJS`/`MODS` lists
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,

    #[serde(skip)]
    pub platform: Platform,
}

/// Partial configuration for TOML parsing
///
/// All fields are `Option<T>` so we can distinguish between
/// "explicitly set" and "not specified" when merging configs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    pub extensions: Option<Vec<String>>,
    pub ignore_paths: Option<Vec<String>>,
    pub ignore_modules: Option<Vec<String>>,
    pub ignore_includes: Option<Vec<String>>,
    pub encoding: Option<String>,
    pub dependency: Option<DependencyMode>,
    pub object_extension: Option<String>,
    pub appname: Option<String>,
    pub compiler: Option<String>,
    pub pcompiler_params: Option<String>,
    pub scompiler_params: Option<String>,
    pub profile: Option<BuildProfile>,
    pub makefile_name: Option<String>,
    pub drop_execute_flag: Option<bool>,
    pub empty_streams: Option<EmptyStreamPolicy>,
    pub wrap_width: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            extensions: default_extensions(),
            ignore_paths: Vec::new(),
            ignore_modules: Vec::new(),
            ignore_includes: Vec::new(),
            encoding: None,
            dependency: DependencyMode::ObjectFiles,
            object_extension: default_object_extension(),
            appname: default_appname(),
            compiler: default_compiler(),
            pcompiler_params: None,
            scompiler_params: None,
            profile: BuildProfile::Release,
            makefile_name: default_makefile_name(),
            drop_execute_flag: false,
            empty_streams: EmptyStreamPolicy::Error,
            wrap_width: default_wrap_width(),
            platform: Platform::current(),
        }
    }
}

impl Config {
    /// Narrowest wrap width that still leaves room for `OBJS = ` and a token
    const MIN_WRAP_WIDTH: usize = 20;
    const MAX_WRAP_WIDTH: usize = 1000;

    /// Validate configuration values are within reasonable bounds
    ///
    /// Returns an error message if validation fails, None if valid.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Some("at least one source extension is required".to_string());
        }
        if self.appname.trim().is_empty() {
            return Some("appname must not be empty".to_string());
        }
        if self.compiler.trim().is_empty() {
            return Some("compiler must not be empty".to_string());
        }
        if self.makefile_name.trim().is_empty() {
            return Some("makefile_name must not be empty".to_string());
        }
        if self.object_extension.trim_start_matches('.').is_empty() {
            return Some("object_extension must not be empty".to_string());
        }
        if self.wrap_width < Self::MIN_WRAP_WIDTH {
            return Some(format!(
                "wrap_width {} is below minimum of {}",
                self.wrap_width,
                Self::MIN_WRAP_WIDTH
            ));
        }
        if self.wrap_width > Self::MAX_WRAP_WIDTH {
            return Some(format!(
                "wrap_width {} exceeds maximum of {}",
                self.wrap_width,
                Self::MAX_WRAP_WIDTH
            ));
        }
        None
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.apply_file(path)?;
        Ok(config)
    }

    /// Parse `path` and apply the settings it contains
    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let partial: PartialConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        self.apply_partial(partial);
        Ok(())
    }

    /// Apply a partial config, only overriding fields that are explicitly set
    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(v) = partial.extensions {
            self.extensions = v;
        }
        if let Some(v) = partial.ignore_paths {
            self.ignore_paths = v;
        }
        if let Some(v) = partial.ignore_modules {
            self.ignore_modules = v;
        }
        if let Some(v) = partial.ignore_includes {
            self.ignore_includes = v;
        }
        if partial.encoding.is_some() {
            self.encoding = partial.encoding;
        }
        if let Some(v) = partial.dependency {
            self.dependency = v;
        }
        if let Some(v) = partial.object_extension {
            self.object_extension = v;
        }
        if let Some(v) = partial.appname {
            self.appname = v;
        }
        if let Some(v) = partial.compiler {
            self.compiler = v;
        }
        if partial.pcompiler_params.is_some() {
            self.pcompiler_params = partial.pcompiler_params;
        }
        if partial.scompiler_params.is_some() {
            self.scompiler_params = partial.scompiler_params;
        }
        if let Some(v) = partial.profile {
            self.profile = v;
        }
        if let Some(v) = partial.makefile_name {
            self.makefile_name = v;
        }
        if let Some(v) = partial.drop_execute_flag {
            self.drop_execute_flag = v;
        }
        if let Some(v) = partial.empty_streams {
            self.empty_streams = v;
        }
        if let Some(v) = partial.wrap_width {
            self.wrap_width = v;
        }
    }

    /// Discover config files for a project directory
    ///
    /// Returns the home directory config followed by configs found from the
    /// filesystem root down to `project_dir` (least specific first).
    #[must_use]
    pub fn discover_config_files(project_dir: &Path) -> Vec<PathBuf> {
        let mut config_files = Vec::new();

        if let Some(home) = dirs_home() {
            for config_name in CONFIG_FILE_NAMES {
                let home_config = home.join(config_name);
                if home_config.is_file() {
                    config_files.push(home_config);
                }
            }
        }

        let start_dir = if project_dir.is_dir() {
            Some(project_dir.to_path_buf())
        } else {
            std::env::current_dir().ok()
        };

        if let Some(dir) = start_dir {
            let dir = dir.canonicalize().unwrap_or(dir);
            let mut ancestors: Vec<PathBuf> = dir.ancestors().map(Path::to_path_buf).collect();
            ancestors.reverse();

            for ancestor in ancestors {
                for config_name in CONFIG_FILE_NAMES {
                    let config_path = ancestor.join(config_name);
                    if config_path.is_file() && !config_files.contains(&config_path) {
                        config_files.push(config_path);
                    }
                }
            }
        }

        config_files
    }

    /// Load and merge configuration from discovered config files
    ///
    /// Later files override earlier ones (only explicitly set values).
    /// A file that cannot be read or parsed is an error, so a typo in a key
    /// is never silently ignored.
    pub fn from_discovered_files(project_dir: &Path) -> Result<Self> {
        let mut config = Self::default();
        for path in Self::discover_config_files(project_dir) {
            tracing::debug!("loading config {}", path.display());
            config.apply_file(&path)?;
        }
        Ok(config)
    }

    /// Preset of the configured compiler on the configured platform
    #[must_use]
    pub fn preset(&self) -> Option<CompilerPreset> {
        preset(&self.compiler, self.platform)
    }

    /// Primary compiler flags (`PFLAGS`)
    #[must_use]
    pub fn primary_flags(&self) -> String {
        if let Some(flags) = &self.pcompiler_params {
            return flags.clone();
        }
        let flags = self.preset().map_or("", |p| p.primary);
        match self.profile {
            BuildProfile::Release => flags.to_string(),
            BuildProfile::Debug => flags.replace("/O3", "/O1").replace("-O3", "-O1"),
        }
    }

    /// Secondary compiler flags (`SFLAGS`)
    #[must_use]
    pub fn secondary_flags(&self) -> String {
        match &self.scompiler_params {
            Some(flags) => flags.clone(),
            None => self.preset().map_or("", |p| p.secondary).to_string(),
        }
    }

    /// Modules never treated as project dependencies: preset plus configured
    #[must_use]
    pub fn ignored_modules(&self) -> Vec<String> {
        let preset = self.preset().map_or(&[][..], |p| p.std_modules);
        preset
            .iter()
            .map(ToString::to_string)
            .chain(self.ignore_modules.iter().cloned())
            .collect()
    }

    /// Include targets never followed: preset plus configured
    #[must_use]
    pub fn ignored_includes(&self) -> Vec<String> {
        let preset = self.preset().map_or(&[][..], |p| p.std_includes);
        preset
            .iter()
            .map(ToString::to_string)
            .chain(self.ignore_includes.iter().cloned())
            .collect()
    }

    /// Executable name with the platform suffix
    #[must_use]
    pub fn app_name(&self) -> String {
        let base = [".x", ".exe"]
            .iter()
            .find_map(|suffix| self.appname.strip_suffix(suffix))
            .unwrap_or(&self.appname);
        format!("{base}{}", self.platform.executable_suffix())
    }

    /// Object file suffix, always starting with `.`
    #[must_use]
    pub fn object_extension(&self) -> String {
        if self.object_extension.starts_with('.') {
            self.object_extension.clone()
        } else {
            format!(".{}", self.object_extension)
        }
    }
}
