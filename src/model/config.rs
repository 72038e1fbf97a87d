use clap::Parser;
use serde::{Deserialize, Serialize};

/**
 * Command-line arguments for the application.
 */
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ApplicationArguments {
    /**
     * Path to the configuration file.
     */
    #[arg(short, long)]
    pub config_file: String,
}

/**
 * Represents the configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /**
     * Logging configuration for the application.
     */
    pub logging: LoggingConfig,
    /**
     * Server configuration for the application.
     */
    pub server: Server,
    /**
     * Location of the ledger file.
     */
    #[serde(default)]
    pub store: StoreConfig,
    /**
     * Names shown on the entry page.
     */
    #[serde(default)]
    pub presenter: PresenterConfig,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /**
     * Whether to log the target of the log message.
     */
    pub target: bool,
    /**
     * Whether to log thread IDs .
     */
    pub thread_ids: bool,
    /**
     * Whether to log thread names.
     */
    pub thread_names: bool,
    /**
     * Whether to log line numbers.
     */
    pub line_number: bool,
    /**
     * Whether to log the log level.
     */
    pub level: bool,
    /**
     * Whether to use ANSI colors in logs.
     */
    pub ansi: bool,
    /**
     * Whether to log the source file name.
     */
    pub file: bool,
    /**
     * Optional file that receives a copy of all log output.
     */
    pub logfile: Option<String>,
    /**
     * Additional directives for logging configuration.
     */
    pub directives: Vec<String>,
}

impl LoggingConfig {
    #[allow(dead_code)]
    pub fn default() -> Self {
        LoggingConfig {
            target: true,
            thread_ids: true,
            thread_names: true,
            line_number: true,
            level: true,
            ansi: true,
            file: true,
            logfile: Some("/tmp/monitoring_ledger.log".to_string()),
            directives: vec![],
        }
    }
}

/**
 * Represents the server configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /**
     * Number of worker threads for the server.
     */
    pub workers: usize,
    /**
     * Address to bind to.
     */
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /**
     * HTTP port for the server.
     */
    pub http_port: u16,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/**
 * Represents the ledger file configuration.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /**
     * Path to the CSV ledger. Created on the first submission.
     */
    #[serde(default = "default_data_file")]
    pub data_file: String,
}

fn default_data_file() -> String {
    "poverty_data.csv".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig { data_file: default_data_file() }
    }
}

/**
 * Branding of the entry page.
 */
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PresenterConfig {
    /**
     * Administrator shown in the side panel.
     */
    pub administrator: String,
    /**
     * Service center the ledger belongs to.
     */
    pub region: String,
    /**
     * Village whose households are collected.
     */
    pub village: String,
    /**
     * Person responsible for the ledger, shown below the title.
     */
    pub developer: String,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        PresenterConfig { administrator: "昕泽".to_string(), region: "隆化镇党群服务中心".to_string(), village: "隆化村".to_string(), developer: "昕泽".to_string() }
    }
}
