//! Makefile rendering.
//!
//! The emitter only runs on a complete [`Schedule`]; it never sees a partial
//! result, so a Makefile on disk always describes a resolvable project.

use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Local};

use crate::config::{Config, DependencyMode};
use crate::emit::wrap::{wrap_tokens, WrapOptions};
use crate::extract::ExtractedFile;
use crate::index::ProjectIndex;
use crate::schedule::Schedule;

/// Housekeeping targets appended to every Makefile
pub const RECIPES: &str = "rm_objs rm_mods rm_app clean cleanall remake build";

const BANNER: &str = "()()()()()()()()()()()()()()()()()()()()()()()()()";

/// Provenance written into the comment block at the top of the file
#[derive(Debug, Clone)]
pub struct MakefileHeader {
    pub generated: DateTime<Local>,
    /// Invoking command line, program name first
    pub command_line: String,
    pub platform: String,
}

impl MakefileHeader {
    /// Header for the running process
    #[must_use]
    pub fn current(platform: impl Into<String>) -> Self {
        let mut args = std::env::args();
        let program = args
            .next()
            .map(|arg0| {
                Path::new(&arg0)
                    .file_name()
                    .map_or(arg0.clone(), |name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        let command_line = std::iter::once(program)
            .chain(args)
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            generated: Local::now(),
            command_line,
            platform: platform.into(),
        }
    }
}

/// Object file name for `source`.
///
/// The first matching source suffix is replaced by `object_extension`; a file
/// with no known suffix gets the object extension appended.
#[must_use]
pub fn object_name(source: &Path, extensions: &[String], object_extension: &str) -> String {
    let name = source.to_string_lossy();
    for ext in extensions.iter().filter(|e| !e.is_empty()) {
        if let Some(stem) = name.strip_suffix(ext.as_str()) {
            return format!("{stem}{object_extension}");
        }
    }
    format!("{name}{object_extension}")
}

/// Render the Makefile for a scheduled project into `out`.
pub fn write_makefile<W: Write>(
    out: &mut W,
    header: &MakefileHeader,
    config: &Config,
    files: &[ExtractedFile],
    schedule: &Schedule,
    index: &ProjectIndex,
) -> io::Result<()> {
    let object_extension = config.object_extension();
    let object_of = |path: &Path| object_name(path, &config.extensions, &object_extension);

    writeln!(out)?;
    writeln!(out, "# {BANNER} #")?;
    writeln!(out, "# {}", header.generated.format("%Y-%m-%d %H:%M"))?;
    writeln!(out, "# generated automatically with command line:")?;
    writeln!(out, "# {}", header.command_line)?;
    writeln!(out, "# platform: {}", header.platform)?;
    writeln!(out, "# {BANNER} #")?;
    writeln!(out)?;

    writeln!(out, "NAME={}", config.app_name())?;
    writeln!(out, "COM={}", config.compiler)?;
    writeln!(out, "PFLAGS={}", config.primary_flags())?;
    writeln!(out, "SFLAGS={}", config.secondary_flags())?;
    writeln!(out)?;

    let objects: Vec<String> = schedule.paths(files).into_iter().map(object_of).collect();
    let modules: Vec<String> = schedule.modules.iter().map(|m| format!("{m}.mod")).collect();
    let wrap = |prefix: &'static str| WrapOptions {
        width: config.wrap_width,
        ..WrapOptions::with_prefix(prefix)
    };
    writeln!(out, "{}", wrap_tokens(&objects, &wrap("OBJS = ")))?;
    writeln!(out)?;
    writeln!(out, "{}", wrap_tokens(&modules, &wrap("MODS = ")))?;
    writeln!(out)?;

    writeln!(out, "$(NAME): $(OBJS)")?;
    writeln!(out, "\t$(COM) $(OBJS) $(SFLAGS) -o $(NAME)")?;
    writeln!(out)?;

    for &i in &schedule.order {
        let file = &files[i];
        let source = file.path.display().to_string();
        let object = object_of(&file.path);

        let mut prerequisites: Vec<String> = Vec::new();
        for dep in &file.record.dependencies {
            let prerequisite = match config.dependency {
                DependencyMode::ObjectFiles => match index.module_file(dep) {
                    Some(definer) => object_of(definer),
                    None => continue,
                },
                DependencyMode::Modules => format!("{dep}.mod"),
            };
            if !prerequisites.contains(&prerequisite) {
                prerequisites.push(prerequisite);
            }
        }
        prerequisites.extend(file.record.includes.iter().map(|p| p.display().to_string()));
        prerequisites.push(source.clone());

        writeln!(out, "{object}: {}", prerequisites.join(" "))?;
        writeln!(out, "\t$(COM) -c $(PFLAGS) $(SFLAGS) {source} -o {object}")?;
    }

    writeln!(out)?;
    writeln!(out, ".PHONY: {RECIPES}")?;
    writeln!(out)?;
    out.write_all(
        b"rm_objs:\n\trm -f $(OBJS)\n\n\
          rm_mods:\n\trm -f $(MODS)\n\n\
          rm_app:\n\trm -f $(NAME)\n\n\
          clean:\n\t$(MAKE) rm_objs\n\t$(MAKE) rm_mods\n\n\
          cleanall:\n\t$(MAKE) clean\n\t$(MAKE) rm_app\n\n\
          remake:\n\t$(MAKE) cleanall\n\t$(MAKE)\n\n\
          build:\n\t$(MAKE) cleanall\n\t$(MAKE)\n\t$(MAKE) clean\n\n",
    )?;
    Ok(())
}

/// Render the Makefile into a `String`.
#[must_use]
pub fn render_makefile(
    header: &MakefileHeader,
    config: &Config,
    files: &[ExtractedFile],
    schedule: &Schedule,
    index: &ProjectIndex,
) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_makefile(&mut buffer, header, config, files, schedule, index);
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::TimeZone;

    use super::*;
    use crate::config::Platform;
    use crate::extract::FactRecord;
    use crate::schedule::resolve;

    fn header() -> MakefileHeader {
        MakefileHeader {
            generated: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
            command_line: "fmakefile --compiler gfortran".to_string(),
            platform: "Linux".to_string(),
        }
    }

    fn config() -> Config {
        Config {
            compiler: "gfortran".to_string(),
            platform: Platform::Linux,
            ..Default::default()
        }
    }

    fn file(path: &str, modules: &[&str], deps: &[&str], includes: &[&str]) -> ExtractedFile {
        let mut record = FactRecord::default();
        for m in modules {
            record.add_module(m);
        }
        for d in deps {
            record.add_dependency(d);
        }
        for i in includes {
            record.add_include(PathBuf::from(i));
        }
        ExtractedFile {
            path: PathBuf::from(path),
            record,
            entry_points: Vec::new(),
            included_files: Vec::new(),
        }
    }

    fn render(files: &[ExtractedFile], config: &Config) -> String {
        let mut index = ProjectIndex::new();
        for f in files {
            index.register(f).unwrap();
        }
        let schedule = resolve(files, &index).unwrap();
        render_makefile(&header(), config, files, &schedule, &index)
    }

    fn chain() -> Vec<ExtractedFile> {
        vec![
            file("c.f90", &[], &["mod_b"], &[]),
            file("b.f90", &["mod_b"], &["mod_a"], &[]),
            file("a.f90", &["mod_a"], &[], &[]),
        ]
    }

    #[test]
    fn test_object_name() {
        let exts = vec![".f90".to_string(), ".F90".to_string(), ".f".to_string()];
        assert_eq!(object_name(Path::new("src/a.f90"), &exts, ".obj"), "src/a.obj");
        assert_eq!(object_name(Path::new("b.F90"), &exts, ".o"), "b.o");
        assert_eq!(object_name(Path::new("f90.f"), &exts, ".o"), "f90.o");
        assert_eq!(object_name(Path::new("c.txt"), &exts, ".o"), "c.txt.o");
    }

    #[test]
    fn test_direct_dependencies_only() {
        let text = render(&chain(), &config());
        assert!(text.contains("c.obj: b.obj c.f90\n"));
        assert!(text.contains("b.obj: a.obj b.f90\n"));
        assert!(text.contains("a.obj: a.f90\n"));
        assert!(!text.contains("c.obj: a.obj"));
    }

    #[test]
    fn test_rules_follow_schedule() {
        let text = render(&chain(), &config());
        let a = text.find("a.obj: ").unwrap();
        let b = text.find("b.obj: ").unwrap();
        let c = text.find("c.obj: ").unwrap();
        assert!(a < b && b < c);
        assert!(text.contains("OBJS = a.obj b.obj c.obj\n"));
        assert!(text.contains("MODS = mod_a.mod mod_b.mod\n"));
    }

    #[test]
    fn test_module_mode_and_includes() {
        let files = vec![
            file("a.f90", &["mod_a"], &[], &[]),
            file("main.f90", &[], &["mod_a"], &["inc/defs.inc"]),
        ];
        let config = Config {
            dependency: DependencyMode::Modules,
            object_extension: "o".to_string(),
            ..config()
        };
        let text = render(&files, &config);
        assert!(text.contains("main.o: mod_a.mod inc/defs.inc main.f90\n"));
        assert!(text.contains("\t$(COM) -c $(PFLAGS) $(SFLAGS) main.f90 -o main.o\n"));
    }

    #[test]
    fn test_object_prerequisites_deduplicated() {
        let files = vec![
            file("both.f90", &["m1", "m2"], &[], &[]),
            file("user.f90", &[], &["m1", "m2"], &[]),
        ];
        let text = render(&files, &config());
        assert!(text.contains("user.obj: both.obj user.f90\n"));
    }

    #[test]
    fn test_header_and_variables() {
        let text = render(&chain(), &config());
        let expected = format!(
            "\n# {BANNER} #\n# 2024-03-09 14:05\n# generated automatically with command line:\n\
             # fmakefile --compiler gfortran\n# platform: Linux\n# {BANNER} #\n\n\
             NAME=appname.x\nCOM=gfortran\nPFLAGS=-O3 -fsyntax-only\nSFLAGS=-fopenmp\n\n"
        );
        assert!(text.starts_with(&expected), "{text}");
        assert!(text.contains("$(NAME): $(OBJS)\n\t$(COM) $(OBJS) $(SFLAGS) -o $(NAME)\n\n"));
    }

    #[test]
    fn test_housekeeping_targets() {
        let text = render(&chain(), &config());
        assert!(text.contains("\n.PHONY: rm_objs rm_mods rm_app clean cleanall remake build\n"));
        assert!(text.contains("build:\n\t$(MAKE) cleanall\n\t$(MAKE)\n\t$(MAKE) clean\n"));
        assert!(text.contains("rm_mods:\n\trm -f $(MODS)\n"));
    }
}
