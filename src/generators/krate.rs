use std::fs;
use std::env;
use std::path::{Component, Path, PathBuf};

use handlebars::{no_escape, Handlebars, RenderError, TemplateError};
use serde::Serialize;

use crate::config::Config;
use crate::models::{Api, Error};

const CARGO_TOML: &str = include_str!("../templates/Cargo.toml.hbs");
const BUILD_RS: &str = include_str!("../templates/build.rs.hbs");
const LIB_RS: &str = include_str!("../templates/lib.rs.hbs");

impl From<TemplateError> for Error {
    fn from(error: TemplateError) -> Self {
        Error::Template(error.to_string())
    }
}

impl From<RenderError> for Error {
    fn from(error: RenderError) -> Self {
        Error::Template(error.to_string())
    }
}

/// Values the crate templates are rendered with.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Krate {
    pub name: String,
    pub version: String,
    pub level: u32,
    pub sdk: String,
    pub fmod_stub: bool,
    pub libraries: Vec<String>,
}

impl Krate {
    pub fn new(config: &Config, api: &Api) -> Result<Krate, Error> {
        Ok(Krate {
            name: config.name.clone(),
            version: config.version.clone(),
            level: config.level,
            sdk: sdk_from_output(&config.sdk, &config.output)?
                .to_string_lossy()
                .replace('\\', "/"),
            fmod_stub: config.fmod_stub,
            libraries: api.functions.iter().map(|(link, _)| link.clone()).collect(),
        })
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            component => normalized.push(component),
        }
    }
    normalized
}

/// `path` as seen from the directory `base`. Both must be absolute; paths on
/// different roots come back unchanged.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);
    let mut path_components = path.components().peekable();
    let mut base_components = base.components().peekable();
    if path_components.peek() != base_components.peek() {
        return path;
    }
    while let (Some(left), Some(right)) = (path_components.peek(), base_components.peek()) {
        if left != right {
            break;
        }
        path_components.next();
        base_components.next();
    }
    let mut relative = PathBuf::new();
    for _ in base_components {
        relative.push(Component::ParentDir);
    }
    relative.extend(path_components);
    relative
}

/// The generated build script resolves the SDK against the output crate's
/// manifest directory, while the configuration names it from the working
/// directory.
fn sdk_from_output(sdk: &Path, output: &Path) -> Result<PathBuf, Error> {
    if sdk.is_absolute() {
        return Ok(sdk.to_path_buf());
    }
    let current = env::current_dir()?;
    Ok(relative_path(&current.join(sdk), &current.join(output)))
}

fn templates() -> Result<Handlebars<'static>, Error> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(no_escape);
    handlebars.register_template_string("Cargo.toml", CARGO_TOML)?;
    handlebars.register_template_string("build.rs", BUILD_RS)?;
    handlebars.register_template_string("src/lib.rs", LIB_RS)?;
    Ok(handlebars)
}

/// Renders the crate files as `(relative path, contents)` pairs.
pub fn render(krate: &Krate) -> Result<Vec<(&'static str, String)>, Error> {
    let handlebars = templates()?;
    let mut files = vec![];
    for file in ["Cargo.toml", "build.rs", "src/lib.rs"] {
        files.push((file, handlebars.render(file, krate)?));
    }
    Ok(files)
}

pub fn write(output: &Path, krate: &Krate, bindings: &str) -> Result<(), Error> {
    fs::create_dir_all(output.join("src"))?;
    for (file, contents) in render(krate)? {
        fs::write(output.join(file), contents)?;
    }
    fs::write(output.join("src/bindings.rs"), bindings)?;
    tracing::info!("bindings crate {} written to {}", krate.name, output.display());
    Ok(())
}
