use archiver_config::load_config;
use archiver_config::shared::ArchiverConfig;

use crate::error::{CliError, CliResult};

/// Loads the archiver configuration, applies command line overrides and validates the result.
pub fn load_archiver_config(
    table: Option<String>,
    stream: Option<String>,
) -> CliResult<ArchiverConfig> {
    let mut config = load_config::<ArchiverConfig>().map_err(CliError::config)?;

    if let Some(table) = table {
        config.source.table_name = table;
    }
    if let Some(stream) = stream {
        config.sink.stream_name = stream;
    }

    config.validate().map_err(CliError::config)?;

    Ok(config)
}
