use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use macaddr::MacAddr6;
use thiserror::Error;

const SENSOR_SECTION_PREFIX: &str = "sensor:";
const INFLUXDB_SECTION: &str = "influxdb";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("section [{section}] is missing required option `{option}`")]
    MissingOption { section: String, option: String },

    #[error("section [{section}]: invalid value `{value}` for option `{option}`: {message}")]
    InvalidOption {
        section: String,
        option: String,
        value: String,
        message: String,
    },
}

/// One `[sensor:<label>]` section. The label is the part of the section name
/// after the prefix; the address is validated when the config is loaded.
#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub label: String,
    pub address: MacAddr6,
}

/// The `[influxdb]` section. Absent section means no network sink.
#[derive(Debug, Clone)]
pub struct InfluxDbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Sensors in file order; this is also the polling order.
    pub sensors: Vec<SensorConfig>,
    pub influxdb: Option<InfluxDbConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let sections = parse_sections(text)?;

        let mut sensors = Vec::new();
        let mut influxdb = None;

        for (name, options) in &sections {
            if let Some(label) = name.strip_prefix(SENSOR_SECTION_PREFIX) {
                sensors.push(SensorConfig {
                    label: label.to_string(),
                    address: parse_option(name, options, "address")?,
                });
            } else if name == INFLUXDB_SECTION {
                influxdb = Some(InfluxDbConfig {
                    host: require_option(name, options, "host")?.to_string(),
                    port: parse_option(name, options, "port")?,
                    database: require_option(name, options, "database")?.to_string(),
                });
            }
            // Other sections are not ours; leave them alone.
        }

        Ok(Self { sensors, influxdb })
    }
}

type Sections = IndexMap<String, IndexMap<String, String>>;

/// Splits the INI text into sections. Option names are lowercased, section
/// names keep their case, section order is preserved.
fn parse_sections(text: &str) -> Result<Sections, ConfigError> {
    let mut sections = Sections::new();
    let mut current: Option<String> = None;

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let Some(name) = header.strip_suffix(']') else {
                return Err(ConfigError::Syntax {
                    line: index + 1,
                    message: format!("unterminated section header: {line}"),
                });
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::Syntax {
                    line: index + 1,
                    message: "empty section name".to_string(),
                });
            }
            sections.entry(name.to_string()).or_default();
            current = Some(name.to_string());
            continue;
        }

        // `key = value` or `key: value`, whichever delimiter comes first.
        let delimiter = line
            .char_indices()
            .find(|&(_, c)| c == '=' || c == ':')
            .map(|(i, _)| i);
        let Some(delimiter) = delimiter else {
            return Err(ConfigError::Syntax {
                line: index + 1,
                message: format!("expected `option = value`, got: {line}"),
            });
        };

        let option = line[..delimiter].trim().to_lowercase();
        let value = line[delimiter + 1..].trim().to_string();
        if option.is_empty() {
            return Err(ConfigError::Syntax {
                line: index + 1,
                message: format!("option has no name: {line}"),
            });
        }

        let Some(section) = &current else {
            return Err(ConfigError::Syntax {
                line: index + 1,
                message: format!("option outside of any section: {line}"),
            });
        };
        sections[section].insert(option, value);
    }

    Ok(sections)
}

fn require_option<'a>(
    section: &str,
    options: &'a IndexMap<String, String>,
    option: &str,
) -> Result<&'a str, ConfigError> {
    options
        .get(option)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingOption {
            section: section.to_string(),
            option: option.to_string(),
        })
}

fn parse_option<T>(
    section: &str,
    options: &IndexMap<String, String>,
    option: &str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = require_option(section, options, option)?;
    value.parse().map_err(|e: T::Err| ConfigError::InvalidOption {
        section: section.to_string(),
        option: option.to_string(),
        value: value.to_string(),
        message: e.to_string(),
    })
}
