use std::io;
use std::path::{Path, PathBuf};

use config::{Config as Settings, Environment as EnvironmentSource, File};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Default configuration directory, relative to the working directory.
const DEFAULT_DIRECTORY: &str = "configuration";

/// Relocates the configuration directory when set.
const DIRECTORY_ENV_NAME: &str = "APP_CONFIGURATION_DIR";

/// Extensions probed for every configuration file, in order.
const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Prefix of environment variable overrides, e.g. `APP_SINK__STREAM_NAME`.
const OVERRIDE_PREFIX: &str = "APP";

/// Separator of nested keys in override names.
const OVERRIDE_KEY_SEPARATOR: &str = "__";

/// Separator of list elements in override values.
const OVERRIDE_LIST_SEPARATOR: &str = ",";

/// Implemented by configuration roots loaded with [`load_config`].
pub trait Config {
    /// Dotted keys whose environment overrides are comma-separated lists.
    const LIST_PARSE_KEYS: &'static [&'static str];
}

/// Errors raised while assembling a configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to resolve the working directory: {0}")]
    WorkingDirectory(#[source] io::Error),

    #[error("configuration directory `{}` does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("no `{stem}` configuration file in `{}` (tried {})", directory.display(), EXTENSIONS.join(", "))]
    MissingFile { stem: String, directory: PathBuf },

    #[error("configuration file `{}` is invalid: {source}", path.display())]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("runtime environment is invalid: {0}")]
    Environment(#[from] io::Error),

    #[error("configuration could not be merged: {0}")]
    Merge(#[source] config::ConfigError),

    #[error("configuration does not match the expected shape: {0}")]
    Shape(#[source] config::ConfigError),
}

/// Loads a configuration of type `T`.
///
/// Layers, later ones winning: `base.<ext>`, then `<environment>.<ext>` for the environment
/// selected by `APP_ENVIRONMENT`, then `APP_`-prefixed environment variables. Files are read
/// from `./configuration` unless `APP_CONFIGURATION_DIR` points elsewhere.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let directory = configuration_directory()?;
    let environment = Environment::load()?;

    let base = read_file(&directory, "base")?;
    let overlay = read_file(&directory, environment.as_str())?;

    Settings::builder()
        .add_source(base)
        .add_source(overlay)
        .add_source(overrides::<T>())
        .build()
        .map_err(LoadConfigError::Merge)?
        .try_deserialize()
        .map_err(LoadConfigError::Shape)
}

fn configuration_directory() -> Result<PathBuf, LoadConfigError> {
    let directory = match std::env::var_os(DIRECTORY_ENV_NAME) {
        Some(directory) => PathBuf::from(directory),
        None => std::env::current_dir()
            .map_err(LoadConfigError::WorkingDirectory)?
            .join(DEFAULT_DIRECTORY),
    };

    if directory.is_dir() {
        Ok(directory)
    } else {
        Err(LoadConfigError::MissingDirectory(directory))
    }
}

/// Parses the first existing `<stem>.<ext>` file on its own so a syntax error names its file.
fn read_file(directory: &Path, stem: &str) -> Result<Settings, LoadConfigError> {
    let path = EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .find(|path| path.is_file())
        .ok_or_else(|| LoadConfigError::MissingFile {
            stem: stem.to_owned(),
            directory: directory.to_path_buf(),
        })?;

    Settings::builder()
        .add_source(File::from(path.as_path()))
        .build()
        .map_err(|source| LoadConfigError::InvalidFile { path, source })
}

fn overrides<T: Config>() -> EnvironmentSource {
    let source = EnvironmentSource::with_prefix(OVERRIDE_PREFIX)
        .prefix_separator("_")
        .separator(OVERRIDE_KEY_SEPARATOR);

    if T::LIST_PARSE_KEYS.is_empty() {
        return source;
    }

    T::LIST_PARSE_KEYS.iter().fold(
        source
            .try_parsing(true)
            .list_separator(OVERRIDE_LIST_SEPARATOR),
        |source, key| source.with_list_parse_key(key),
    )
}
