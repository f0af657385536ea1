#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Svn(SvnError),
    AI(AIError),
    Report(ReportError),
    Crypto(CryptoError),
    IO(String, std::io::Error), // For general I/O errors not covered by specific types
    Generic(String),            // For simple string-based errors
}

#[derive(Debug)]
pub enum ConfigError {
    FileRead(String, std::io::Error),
    FileWrite(String, std::io::Error),
    YamlParse(String, serde_yaml::Error),
    YamlSerialize(serde_yaml::Error),
    UnknownProvider(String),
}

#[derive(Debug)]
pub enum SvnError {
    CommandFailed {
        command: String,
        status_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    ConnectionFailed(String),
    NotAFile(String),
    FileTooLarge {
        path: String,
        size: u64,
    },
    RevisionNotFound(u64),
    Other(String), // Generic SVN error
}

#[derive(Debug)]
pub enum AIError {
    RequestFailed(reqwest::Error),
    ResponseParseFailed(reqwest::Error),
    ApiResponseError(reqwest::StatusCode, String), // HTTP status was not success, String is a response body
    EmptyMessage,
    NoChoiceInResponse,
}

#[derive(Debug)]
pub enum ReportError {
    OutputDir(String, std::io::Error),
    FileWrite(String, std::io::Error),
    BrowserSpawn(std::io::Error),
}

#[derive(Debug)]
pub enum CryptoError {
    EmptyInput,
    Base64Decode(base64::DecodeError),
    InvalidBlockLength(usize),
    InvalidPadding,
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Svn(e) => write!(f, "SVN command error: {}", e),
            AppError::AI(e) => write!(f, "AI interaction error: {}", e),
            AppError::Report(e) => write!(f, "Report generation error: {}", e),
            AppError::Crypto(e) => write!(f, "Crypto error: {}", e),
            AppError::IO(context, e) => write!(f, "I/O error while {}: {}", context, e),
            AppError::Generic(s) => write!(f, "Application error: {}", s),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Svn(e) => Some(e),
            AppError::AI(e) => Some(e),
            AppError::Report(e) => Some(e),
            AppError::Crypto(e) => Some(e),
            AppError::IO(_, e) => Some(e),
            AppError::Generic(_) => None,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(file, e) => write!(f, "Failed to read file '{}': {}", file, e),
            ConfigError::FileWrite(path, e) => {
                write!(f, "Failed to write to path '{}': {}", path, e)
            }
            ConfigError::YamlParse(file, e) => {
                write!(f, "Failed to parse YAML from file '{}': {}", file, e)
            }
            ConfigError::YamlSerialize(e) => {
                write!(f, "Failed to serialize configuration to YAML: {}", e)
            }
            ConfigError::UnknownProvider(p) => {
                write!(f, "Unsupported AI provider '{}'", p)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileRead(_, e) => Some(e),
            ConfigError::FileWrite(_, e) => Some(e),
            ConfigError::YamlParse(_, e) => Some(e),
            ConfigError::YamlSerialize(e) => Some(e),
            ConfigError::UnknownProvider(_) => None,
        }
    }
}

impl std::fmt::Display for SvnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SvnError::CommandFailed {
                command,
                status_code,
                stdout,
                stderr,
            } => {
                write!(f, "SVN command '{}' failed", command)?;
                if let Some(c) = status_code {
                    write!(f, " with exit code {}", c)?;
                }
                if !stdout.is_empty() {
                    write!(f, "\nStdout:\n{}", stdout)?;
                }
                if !stderr.is_empty() {
                    write!(f, "\nStderr:\n{}", stderr)?;
                }
                Ok(())
            }
            SvnError::ConnectionFailed(detail) => {
                write!(f, "Failed to connect to SVN server: {}", detail)
            }
            SvnError::NotAFile(path) => write!(f, "Path '{}' is a directory, not a file", path),
            SvnError::FileTooLarge { path, size } => write!(
                f,
                "File '{}' is too large ({} bytes, 10 MiB limit)",
                path, size
            ),
            SvnError::RevisionNotFound(rev) => write!(f, "Revision r{} not found", rev),
            SvnError::Other(s) => write!(f, "SVN error: {}", s),
        }
    }
}

impl std::error::Error for SvnError {}

impl std::fmt::Display for AIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AIError::RequestFailed(e) => write!(f, "AI API request failed: {}", e),
            AIError::ResponseParseFailed(e) => {
                write!(f, "Failed to parse AI API JSON response: {}", e)
            }
            AIError::ApiResponseError(status, body) => {
                write!(f, "AI API responded with error {}: {}", status, body)
            }
            AIError::EmptyMessage => write!(f, "AI returned an empty message."),
            AIError::NoChoiceInResponse => write!(f, "AI API response contained no choices."),
        }
    }
}

impl std::error::Error for AIError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AIError::RequestFailed(e) => Some(e),
            AIError::ResponseParseFailed(e) => Some(e),
            _ => None, // Other values are self-contained
        }
    }
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::OutputDir(dir, e) => {
                write!(f, "Failed to create report directory '{}': {}", dir, e)
            }
            ReportError::FileWrite(path, e) => {
                write!(f, "Failed to write report file '{}': {}", path, e)
            }
            ReportError::BrowserSpawn(e) => write!(f, "Failed to open browser: {}", e),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::OutputDir(_, e) => Some(e),
            ReportError::FileWrite(_, e) => Some(e),
            ReportError::BrowserSpawn(e) => Some(e),
        }
    }
}

impl std::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CryptoError::EmptyInput => write!(f, "API key must not be empty"),
            CryptoError::Base64Decode(e) => write!(f, "Base64 decoding failed: {}", e),
            CryptoError::InvalidBlockLength(len) => write!(
                f,
                "Ciphertext length {} is not a multiple of the DES block size",
                len
            ),
            CryptoError::InvalidPadding => write!(f, "Invalid PKCS#5 padding"),
        }
    }
}

impl std::error::Error for CryptoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CryptoError::Base64Decode(e) => Some(e),
            _ => None,
        }
    }
}

// --- From implementations for AppError ---

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<SvnError> for AppError {
    fn from(err: SvnError) -> Self {
        AppError::Svn(err)
    }
}

impl From<AIError> for AppError {
    fn from(err: AIError) -> Self {
        AppError::AI(err)
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        AppError::Report(err)
    }
}

impl From<CryptoError> for AppError {
    fn from(err: CryptoError) -> Self {
        AppError::Crypto(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IO("I/O operation failed".to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn mock_reqwest_error() -> reqwest::Error {
        // Reliable way to get a reqwest::Error: an invalid URL cannot be parsed.
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            reqwest::Client::new()
                .get("http://0.0.0.0.0.0.1")
                .send()
                .await
                .unwrap_err()
        })
    }

    fn mock_yaml_error() -> serde_yaml::Error {
        serde_yaml::from_str::<std::collections::HashMap<String, String>>("[1, 2")
            .err()
            .unwrap()
    }

    #[test]
    fn test_config_error_display() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err_file_read = ConfigError::FileRead("config.yaml".to_string(), io_err);
        assert_eq!(
            format!("{}", err_file_read),
            "Failed to read file 'config.yaml': file not found"
        );

        let err_yaml_parse = ConfigError::YamlParse("config.yaml".to_string(), mock_yaml_error());
        assert!(
            format!("{}", err_yaml_parse)
                .starts_with("Failed to parse YAML from file 'config.yaml': ")
        );

        let err_provider = ConfigError::UnknownProvider("acme".to_string());
        assert_eq!(format!("{}", err_provider), "Unsupported AI provider 'acme'");
    }

    #[test]
    fn test_svn_error_display() {
        let err_cmd_failed = SvnError::CommandFailed {
            command: "svn status".to_string(),
            status_code: Some(1),
            stdout: "".to_string(),
            stderr: "svn: E155007: not a working copy".to_string(),
        };
        assert_eq!(
            format!("{}", err_cmd_failed),
            "SVN command 'svn status' failed with exit code 1\nStderr:\nsvn: E155007: not a working copy"
        );

        let err_connection = SvnError::ConnectionFailed("E170013".to_string());
        assert_eq!(
            format!("{}", err_connection),
            "Failed to connect to SVN server: E170013"
        );

        let err_too_large = SvnError::FileTooLarge {
            path: "big.bin".to_string(),
            size: 20_000_000,
        };
        assert_eq!(
            format!("{}", err_too_large),
            "File 'big.bin' is too large (20000000 bytes, 10 MiB limit)"
        );

        let err_revision = SvnError::RevisionNotFound(42);
        assert_eq!(format!("{}", err_revision), "Revision r42 not found");
    }

    #[test]
    fn test_ai_error_display() {
        let err_request_failed = AIError::RequestFailed(mock_reqwest_error());
        assert!(format!("{}", err_request_failed).starts_with("AI API request failed: "));

        let err_api_response = AIError::ApiResponseError(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "Server meltdown".to_string(),
        );
        assert_eq!(
            format!("{}", err_api_response),
            "AI API responded with error 500 Internal Server Error: Server meltdown"
        );

        let err_empty = AIError::EmptyMessage;
        assert_eq!(format!("{}", err_empty), "AI returned an empty message.");

        let err_no_choice = AIError::NoChoiceInResponse;
        assert_eq!(
            format!("{}", err_no_choice),
            "AI API response contained no choices."
        );
    }

    #[test]
    fn test_crypto_error_display() {
        assert_eq!(
            format!("{}", CryptoError::EmptyInput),
            "API key must not be empty"
        );
        assert_eq!(
            format!("{}", CryptoError::InvalidBlockLength(13)),
            "Ciphertext length 13 is not a multiple of the DES block size"
        );
        assert_eq!(
            format!("{}", CryptoError::InvalidPadding),
            "Invalid PKCS#5 padding"
        );
    }

    #[test]
    fn test_app_error_display() {
        let config_err = ConfigError::UnknownProvider("acme".to_string());
        let app_config_err = AppError::from(config_err);
        assert_eq!(
            format!("{}", app_config_err),
            "Configuration error: Unsupported AI provider 'acme'"
        );

        let svn_err = SvnError::RevisionNotFound(7);
        let app_svn_err = AppError::from(svn_err);
        assert_eq!(
            format!("{}", app_svn_err),
            "SVN command error: Revision r7 not found"
        );

        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe broke");
        let app_io_err: AppError = io_err.into();
        assert_eq!(
            format!("{}", app_io_err),
            "I/O error while I/O operation failed: pipe broke" // Default context
        );

        let app_generic_err = AppError::Generic("Something went wrong".to_string());
        assert_eq!(
            format!("{}", app_generic_err),
            "Application error: Something went wrong"
        );
    }
}
