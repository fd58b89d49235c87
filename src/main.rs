#[macro_use]
extern crate quote;

#[macro_use]
extern crate pest_derive;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::combined::{CombinedHeader, COMBINED_FILE};
use crate::config::{Config, Platform, CONFIG_FILE};
use crate::generators::krate::Krate;
use crate::generators::{ffi, krate};
use crate::models::{Api, Error, Library};
use crate::preprocessor::Preprocessor;

mod combined;
mod config;
mod generators;
mod models;
mod parsers;
mod patching;
mod preprocessor;
mod repr;

/// Generates a Rust bindings crate for the X-Plane plugin SDK
#[derive(Parser, Debug)]
#[command(name = "xplm-gen", version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Root of the X-Plane SDK
    #[arg(long, env = "XPLANE_SDK_PATH")]
    sdk: Option<PathBuf>,

    /// Additional header search directory
    #[arg(short = 'I', long = "include")]
    include_dirs: Vec<PathBuf>,

    /// Directory to write the bindings crate to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// SDK API level, e.g. 303 or 400
    #[arg(long)]
    level: Option<u32>,

    #[arg(long, value_enum)]
    platform: Option<Platform>,

    /// Include deprecated declarations
    #[arg(long)]
    deprecated: bool,

    /// Read the real FMOD headers instead of declaring stand-in types
    #[arg(long)]
    no_fmod_stub: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> Result<Config, Error> {
        let mut config = Config::load_or_default(&self.config)?;
        if let Some(sdk) = &self.sdk {
            config.sdk = sdk.clone();
        }
        config.include_dirs.extend(self.include_dirs.iter().cloned());
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(level) = self.level {
            config.level = level;
        }
        if let Some(platform) = self.platform {
            config.platform = platform;
        }
        if self.deprecated {
            config.deprecated = true;
        }
        if self.no_fmod_stub {
            config.fmod_stub = false;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Reads every SDK header through the combined header and collects their
/// declarations.
pub fn aggregate(config: &Config) -> Result<Api, Error> {
    let mut preprocessor = Preprocessor::new(config.header_dirs());
    for (name, value) in config.predefined_macros() {
        preprocessor.define(&name, &value);
    }
    for name in parsers::xplm::EXPORT_MACROS {
        preprocessor.preserve(name);
    }

    let combined = CombinedHeader;
    for header in combined.headers() {
        if preprocessor.locate(header).is_none() {
            return Err(Error::MissingHeader(header.to_string()));
        }
    }
    preprocessor.process_source(COMBINED_FILE, &combined.render(), None, None)?;

    let mut api = Api::default();
    for unit in preprocessor.finish().units {
        let header = parsers::xplm::parse(&unit.source)?;
        api.merge(Library::from_file(&unit.file), header)?;
        api.docs.extend(parsers::docs::parse(&unit.raw));
    }

    tracing::info!(
        "{} types, {} constants, {} enumerations, {} structures, {} callbacks, {} functions",
        api.opaque_types.len() + api.type_aliases.len(),
        api.constants.len(),
        api.enumerations.len(),
        api.structures.len(),
        api.callbacks.len(),
        api.function_count()
    );
    Ok(api)
}

fn run(config: &Config) -> Result<(), Error> {
    tracing::info!(
        "generating XPLM{} bindings for {:?} from {}",
        config.level,
        config.platform,
        config.sdk.display()
    );
    let api = aggregate(config)?;
    let bindings = ffi::generate(&api)?;
    krate::write(&config.output, &Krate::new(config, &api)?, &bindings)
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("xplm_gen=debug")
    } else {
        EnvFilter::new("xplm_gen=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    if let Err(error) = cli.load_config().and_then(|config| run(&config)) {
        tracing::error!("{}", error);
        std::process::exit(1);
    }
}
