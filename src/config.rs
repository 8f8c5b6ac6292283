//! Service configuration, read once at startup from the environment.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Runtime configuration for the loan-assist service.
#[derive(Clone, Debug)]
pub struct Config {
    /// Credential for the NL service. Required — startup fails without it.
    pub gemini_api_key: SecretString,
    /// Session-signing secret. Defaults to a dev value when unset.
    pub session_secret: SecretString,
    /// NL model used for conversational replies and extraction.
    pub model: String,
    /// Port for the WebSocket/REST server.
    pub port: u16,
    /// Directory where generated sanction letters are stored.
    pub letters_dir: PathBuf,
    /// Path to the synthetic customer directory database.
    pub directory_db_path: PathBuf,
}

impl Config {
    /// Read configuration from environment variables.
    ///
    /// `GEMINI_API_KEY` is the primary AI credential; its absence is a fatal
    /// startup error per the interface contract.
    pub fn from_env() -> Result<Self, ConfigError> {
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let session_secret = std::env::var("SESSION_SECRET")
            .unwrap_or_else(|_| "dev-secret-key".to_string());

        let model = std::env::var("LOAN_ASSIST_MODEL")
            .unwrap_or_else(|_| "gemini-2.5-flash".to_string());

        let port_raw = std::env::var("LOAN_ASSIST_PORT").unwrap_or_else(|_| "5000".to_string());
        let port: u16 = port_raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "LOAN_ASSIST_PORT".to_string(),
            message: format!("not a valid port: {port_raw}"),
        })?;

        let letters_dir = std::env::var("LOAN_ASSIST_LETTERS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./sanction_letters"));

        let directory_db_path = std::env::var("LOAN_ASSIST_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/customer_data.db"));

        Ok(Self {
            gemini_api_key: SecretString::from(gemini_api_key),
            session_secret: SecretString::from(session_secret),
            model,
            port,
            letters_dir,
            directory_db_path,
        })
    }
}
