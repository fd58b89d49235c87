//! Just enough of the C preprocessor to read the SDK headers: conditional
//! blocks, object-like macros, includes and include guards.

pub mod conditions;

use crate::models::Error;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

const INCLUDE_DEPTH_LIMIT: usize = 64;
const EXPANSION_LIMIT: usize = 16;

lazy_static! {
    static ref DIRECTIVE: Regex = Regex::new(r"^\s*#\s*(\w*)\s*(.*)$").unwrap();
    static ref DEFINITION: Regex = Regex::new(r"^([A-Za-z_]\w*)(\()?").unwrap();
    static ref INCLUDE: Regex = Regex::new(r#"^(?:"([^"]+)"|<([^>]+)>)"#).unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_]\w*$").unwrap();
    static ref TOKEN: Regex = Regex::new(r#""(?:\\.|[^"\\])*"|[0-9]\w*|[A-Za-z_]\w*"#).unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub body: String,
    pub function_like: bool,
}

impl Macro {
    pub fn object(body: &str) -> Self {
        Macro {
            body: body.trim().to_string(),
            function_like: false,
        }
    }
}

pub type Macros = HashMap<String, Macro>;

/// Active text contributed by one header file.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub file: String,
    pub source: String,
    pub raw: String,
}

#[derive(Debug, Default)]
pub struct Translation {
    pub units: Vec<Unit>,
}

impl Translation {
    pub fn unit(&self, file: &str) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.file == file)
    }
}

#[derive(Debug)]
struct Frame {
    parent_active: bool,
    active: bool,
    taken: bool,
    seen_else: bool,
}

pub struct Preprocessor {
    include_dirs: Vec<PathBuf>,
    macros: Macros,
    preserved: HashSet<String>,
    once: HashSet<PathBuf>,
    units: Vec<Unit>,
    depth: usize,
}

/// Splices `\`-continued lines and blanks out comments, keeping newlines so
/// that directives stay on their own lines.
pub fn strip_comments(source: &str) -> String {
    let source = source.replace("\\\r\n", "").replace("\\\n", "");
    let mut output = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;
    while let Some(c) = chars.next() {
        if let Some(delimiter) = quote {
            output.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    output.push(escaped);
                }
            } else if c == delimiter || c == '\n' {
                quote = None;
            }
            continue;
        }
        match (c, chars.peek()) {
            ('/', Some('*')) => {
                chars.next();
                let mut previous = ' ';
                for c in chars.by_ref() {
                    if c == '\n' {
                        output.push('\n');
                    }
                    if previous == '*' && c == '/' {
                        break;
                    }
                    previous = c;
                }
                output.push(' ');
            }
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        output.push('\n');
                        break;
                    }
                }
            }
            ('"', _) | ('\'', _) => {
                quote = Some(c);
                output.push(c);
            }
            _ => output.push(c),
        }
    }
    output
}

impl Preprocessor {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        Preprocessor {
            include_dirs,
            macros: Macros::new(),
            preserved: HashSet::new(),
            once: HashSet::new(),
            units: vec![],
            depth: 0,
        }
    }

    pub fn define(&mut self, name: &str, body: &str) {
        self.macros.insert(name.to_string(), Macro::object(body));
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Keeps `name` in declaration text even when it expands to nothing.
    pub fn preserve(&mut self, name: &str) {
        self.preserved.insert(name.to_string());
    }

    /// Whether `name` is an object-like macro that ends up empty, possibly
    /// through a chain of macros naming other macros.
    fn expands_to_nothing(&self, name: &str) -> bool {
        let mut name = name;
        for _ in 0..EXPANSION_LIMIT {
            if self.preserved.contains(name) {
                return false;
            }
            match self.macros.get(name) {
                Some(definition) if !definition.function_like => {
                    if definition.body.is_empty() {
                        return true;
                    }
                    if !IDENTIFIER.is_match(&definition.body) {
                        return false;
                    }
                    name = &definition.body;
                }
                _ => return false,
            }
        }
        false
    }

    /// Drops calling convention and export markers such as `F_CALL` that
    /// are defined empty on the target platform. String literals are kept.
    fn expand_line(&self, line: &str) -> String {
        TOKEN
            .replace_all(line, |captures: &Captures| {
                let token = &captures[0];
                if IDENTIFIER.is_match(token) && self.expands_to_nothing(token) {
                    String::new()
                } else {
                    token.to_string()
                }
            })
            .into_owned()
    }

    fn unit_mut(&mut self, file: &str) -> &mut Unit {
        let index = match self.units.iter().position(|unit| unit.file == file) {
            Some(index) => index,
            None => {
                self.units.push(Unit {
                    file: file.to_string(),
                    source: String::new(),
                    raw: String::new(),
                });
                self.units.len() - 1
            }
        };
        &mut self.units[index]
    }

    fn resolve(&self, name: &str, quoted: bool, current_dir: Option<&Path>) -> Option<PathBuf> {
        let local = if quoted { current_dir } else { None };
        local
            .into_iter()
            .chain(self.include_dirs.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Resolves `name` the way `#include <name>` would.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        self.resolve(name, false, None)
    }

    pub fn process_file(&mut self, path: &Path) -> Result<(), Error> {
        let canonical = fs::canonicalize(path)?;
        if self.once.contains(&canonical) {
            return Ok(());
        }
        if self.depth >= INCLUDE_DEPTH_LIMIT {
            return Err(Error::Directive(format!(
                "#include nested too deeply at {}",
                path.display()
            )));
        }
        let source = fs::read_to_string(path)?;
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        tracing::debug!("preprocessing {}", path.display());

        self.depth += 1;
        let result = self.process_source(&file, &source, path.parent(), Some(canonical.as_path()));
        self.depth -= 1;
        result
    }

    pub fn process_source(
        &mut self,
        file: &str,
        source: &str,
        current_dir: Option<&Path>,
        canonical: Option<&Path>,
    ) -> Result<(), Error> {
        {
            let unit = self.unit_mut(file);
            if unit.raw.is_empty() {
                unit.raw = source.to_string();
            }
        }

        let text = strip_comments(source);
        let mut stack: Vec<Frame> = vec![];

        for line in text.lines() {
            let active = stack.last().map_or(true, |frame| frame.active);
            let captures = match DIRECTIVE.captures(line) {
                Some(captures) => captures,
                None => {
                    if active && !line.trim().is_empty() {
                        let line = self.expand_line(line);
                        if !line.trim().is_empty() {
                            let unit = self.unit_mut(file);
                            unit.source.push_str(&line);
                            unit.source.push('\n');
                        }
                    }
                    continue;
                }
            };
            let directive = captures.get(1).map_or("", |m| m.as_str());
            let rest = captures.get(2).map_or("", |m| m.as_str()).trim();

            match directive {
                "if" | "ifdef" | "ifndef" => {
                    let condition = if !active {
                        false
                    } else if directive == "if" {
                        conditions::evaluate(rest, &self.macros)?
                    } else {
                        let name = rest.split_whitespace().next().unwrap_or("");
                        self.is_defined(name) == (directive == "ifdef")
                    };
                    stack.push(Frame {
                        parent_active: active,
                        active: condition,
                        taken: condition,
                        seen_else: false,
                    });
                }
                "elif" => {
                    let frame = match stack.last() {
                        Some(frame) if !frame.seen_else => frame,
                        _ => {
                            return Err(Error::UnbalancedConditional(format!(
                                "#elif without #if in {}",
                                file
                            )))
                        }
                    };
                    let condition = frame.parent_active
                        && !frame.taken
                        && conditions::evaluate(rest, &self.macros)?;
                    if let Some(frame) = stack.last_mut() {
                        frame.active = condition;
                        frame.taken |= condition;
                    }
                }
                "else" => match stack.last_mut() {
                    Some(frame) if !frame.seen_else => {
                        frame.active = frame.parent_active && !frame.taken;
                        frame.taken = true;
                        frame.seen_else = true;
                    }
                    _ => {
                        return Err(Error::UnbalancedConditional(format!(
                            "#else without #if in {}",
                            file
                        )))
                    }
                },
                "endif" => {
                    if stack.pop().is_none() {
                        return Err(Error::UnbalancedConditional(format!(
                            "#endif without #if in {}",
                            file
                        )));
                    }
                }
                _ if !active => continue,
                "define" => self.process_define(file, rest),
                "undef" => {
                    self.macros.remove(rest.split_whitespace().next().unwrap_or(""));
                }
                "include" => self.process_include(rest, current_dir)?,
                "pragma" => {
                    if rest == "once" {
                        if let Some(canonical) = canonical {
                            self.once.insert(canonical.to_path_buf());
                        }
                    }
                }
                "error" => return Err(Error::Directive(rest.to_string())),
                _ => tracing::debug!("ignoring #{} in {}", directive, file),
            }
        }

        if !stack.is_empty() {
            return Err(Error::UnbalancedConditional(format!(
                "unterminated #if in {}",
                file
            )));
        }
        Ok(())
    }

    fn process_define(&mut self, file: &str, rest: &str) {
        let captures = match DEFINITION.captures(rest) {
            Some(captures) => captures,
            None => return,
        };
        let name = captures.get(1).map_or("", |m| m.as_str()).to_string();
        let function_like = captures.get(2).is_some();
        let body = if function_like {
            rest.find(')').map_or("", |index| &rest[index + 1..])
        } else {
            &rest[name.len()..]
        };
        let body = body.trim().to_string();

        if !function_like && !body.is_empty() {
            let unit = self.unit_mut(file);
            unit.source.push_str(&format!("#define {} {}\n", name, body));
        }
        self.macros.insert(
            name,
            Macro {
                body,
                function_like,
            },
        );
    }

    fn process_include(&mut self, rest: &str, current_dir: Option<&Path>) -> Result<(), Error> {
        let captures = match INCLUDE.captures(rest) {
            Some(captures) => captures,
            None => return Err(Error::Directive(format!("malformed #include {}", rest))),
        };
        let (name, quoted) = match (captures.get(1), captures.get(2)) {
            (Some(name), _) => (name.as_str(), true),
            (None, Some(name)) => (name.as_str(), false),
            _ => return Err(Error::Directive(format!("malformed #include {}", rest))),
        };
        match self.resolve(name, quoted, current_dir) {
            Some(path) => self.process_file(&path),
            None if quoted => Err(Error::MissingHeader(name.to_string())),
            None => {
                tracing::debug!("system header <{}> not on the include path, skipped", name);
                Ok(())
            }
        }
    }

    pub fn finish(self) -> Translation {
        Translation { units: self.units }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::Error;
    use crate::preprocessor::{strip_comments, Preprocessor};
    use std::fs;
    use tempfile::TempDir;

    fn process(source: &str) -> Result<String, Error> {
        let mut preprocessor = Preprocessor::new(vec![]);
        preprocessor.define("XPLM200", "");
        preprocessor.define("XPLM210", "");
        preprocessor.define("LIN", "1");
        preprocessor.process_source("test.h", source, None, None)?;
        let translation = preprocessor.finish();
        Ok(translation
            .unit("test.h")
            .map(|unit| unit.source.clone())
            .unwrap_or_default())
    }

    #[test]
    fn test_should_strip_comments_and_keep_lines() {
        let source = "int a; /* one\n two */ int b; // three\nint c;";
        assert_eq!(strip_comments(source), "int a; \n  int b; \nint c;");
    }

    #[test]
    fn test_should_keep_comment_markers_inside_strings() {
        let source = "#define XPLM_MAP_IOS \"/*ios*/\"";
        assert_eq!(strip_comments(source), source);
    }

    #[test]
    fn test_should_join_continued_lines() {
        let source = "#if defined(XPLM200) && \\\n    defined(XPLM210)\nint a;\n#endif\n";
        assert_eq!(process(source), Ok("int a;\n".into()));
    }

    #[test]
    fn test_should_select_active_branches() {
        let source = r#"
            #if defined(XPLM300)
            int newer;
            #elif defined(XPLM210)
            int middle;
            #else
            int older;
            #endif
            #ifdef XPLM_DEPRECATED
            int deprecated;
            #endif
            #ifndef XPLM_DEPRECATED
            int current;
            #endif
        "#;
        let output = process(source).unwrap();
        assert!(output.contains("int middle;"));
        assert!(!output.contains("int newer;"));
        assert!(!output.contains("int older;"));
        assert!(!output.contains("int deprecated;"));
        assert!(output.contains("int current;"));
    }

    #[test]
    fn test_should_skip_nested_blocks_of_inactive_branch() {
        let source = r#"
            #if defined(XPLM300)
            #if LIN
            int nested;
            #else
            int other;
            #endif
            #endif
        "#;
        assert_eq!(process(source), Ok("".into()));
    }

    #[test]
    fn test_should_keep_object_like_definitions() {
        let source = r#"
            #define XPLMDefs_h
            #define XPLM_NO_PLUGIN_ID    (-1)
            #define XPLM_MSG(x) ((x) + 1)
        "#;
        assert_eq!(
            process(source),
            Ok("#define XPLM_NO_PLUGIN_ID (-1)\n".into())
        );
    }

    #[test]
    fn test_should_drop_macros_defined_empty_from_declarations() {
        let mut preprocessor = Preprocessor::new(vec![]);
        preprocessor.preserve("XPLM_API");
        let source = r#"
#define F_CALL
#define F_CALLBACK F_CALL
#define XPLM_API
#define F_EXPORT __attribute__((visibility("default")))
typedef FMOD_RESULT (F_CALL *FMOD_FILE_OPEN_CALLBACK)(void *userdata);
typedef FMOD_RESULT (F_CALLBACK *FMOD_FILE_CLOSE_CALLBACK)(void *handle);
XPLM_API void XPLMDebugString(const char * inString);
F_EXPORT int FMOD_Memory_Initialize(int length);
const char *name = "F_CALL 0xF_CALL";
F_CALL
"#;
        preprocessor
            .process_source("fmod_common.h", source, None, None)
            .unwrap();
        let translation = preprocessor.finish();
        let lines: Vec<&str> = translation
            .unit("fmod_common.h")
            .unwrap()
            .source
            .lines()
            .filter(|line| !line.starts_with('#'))
            .collect();
        assert_eq!(
            lines,
            vec![
                "typedef FMOD_RESULT ( *FMOD_FILE_OPEN_CALLBACK)(void *userdata);",
                "typedef FMOD_RESULT ( *FMOD_FILE_CLOSE_CALLBACK)(void *handle);",
                "XPLM_API void XPLMDebugString(const char * inString);",
                "F_EXPORT int FMOD_Memory_Initialize(int length);",
                "const char *name = \"F_CALL 0xF_CALL\";",
            ]
        );
    }

    #[test]
    fn test_should_honour_undef() {
        let source = r#"
            #define FEATURE 1
            #undef FEATURE
            #if FEATURE
            int feature;
            #endif
        "#;
        assert_eq!(process(source), Ok("#define FEATURE 1\n".into()));
    }

    #[test]
    fn test_should_fail_on_active_error() {
        let source = r#"
            #if !defined(LIN)
            #error Platform not defined!
            #endif
            #if !defined(IBM)
            #error "IBM required"
            #endif
        "#;
        assert_eq!(
            process(source),
            Err(Error::Directive("\"IBM required\"".into()))
        );
    }

    #[test]
    fn test_should_fail_on_unbalanced_conditionals() {
        assert!(matches!(
            process("#if LIN\nint a;\n"),
            Err(Error::UnbalancedConditional(_))
        ));
        assert!(matches!(
            process("#endif\n"),
            Err(Error::UnbalancedConditional(_))
        ));
        assert!(matches!(
            process("#if LIN\n#else\n#else\n#endif\n"),
            Err(Error::UnbalancedConditional(_))
        ));
    }

    #[test]
    fn test_should_follow_includes_and_guards() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("XPLMDefs.h"),
            "#ifndef XPLMDefs_h\n#define XPLMDefs_h\ntypedef int XPLMPluginID;\n#endif\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("XPLMPlugin.h"),
            "#include \"XPLMDefs.h\"\n#include <stdint.h>\nXPLM_API XPLMPluginID XPLMGetMyID(void);\n",
        )
        .unwrap();

        let mut preprocessor = Preprocessor::new(vec![dir.path().to_path_buf()]);
        let combined = "#include <XPLMDefs.h>\n#include <XPLMPlugin.h>\n#include <XPLMDefs.h>\n";
        preprocessor
            .process_source("combined.h", combined, None, None)
            .unwrap();
        let translation = preprocessor.finish();

        assert_eq!(
            translation.unit("XPLMDefs.h").unwrap().source,
            "typedef int XPLMPluginID;\n"
        );
        assert_eq!(
            translation.unit("XPLMPlugin.h").unwrap().source,
            "XPLM_API XPLMPluginID XPLMGetMyID(void);\n"
        );
    }

    #[test]
    fn test_should_process_pragma_once_headers_once() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("XPWidgetDefs.h"),
            "#pragma once\ntypedef void * XPWidgetID;\n",
        )
        .unwrap();
        let mut preprocessor = Preprocessor::new(vec![dir.path().to_path_buf()]);
        preprocessor
            .process_source(
                "combined.h",
                "#include <XPWidgetDefs.h>\n#include <XPWidgetDefs.h>\n",
                None,
                None,
            )
            .unwrap();
        let translation = preprocessor.finish();
        assert_eq!(
            translation.unit("XPWidgetDefs.h").unwrap().source,
            "typedef void * XPWidgetID;\n"
        );
    }

    #[test]
    fn test_should_fail_on_missing_quoted_include() {
        assert_eq!(
            process("#include \"fmod.h\"\n"),
            Err(Error::MissingHeader("fmod.h".into()))
        );
    }

    #[test]
    fn test_should_ignore_inactive_missing_include() {
        let source = "#ifdef XPLM_DEPRECATED\n#include \"gone.h\"\n#endif\nint a;\n";
        assert_eq!(process(source), Ok("int a;\n".into()));
    }
}
