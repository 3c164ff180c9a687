use thiserror::Error;

/// The crate's single error currency. Every fallible operation in the
/// translation pipeline and execution client returns `Result<T, MongoSqlError>`.
#[derive(Error, Debug)]
pub enum MongoSqlError {
    #[error("ParseError at position {position}: {message}")]
    ParseError { position: usize, message: String },

    #[error("UnsupportedFeature: {detail}")]
    UnsupportedFeature { detail: String },

    #[error("TranslationError: {detail}")]
    TranslationError { detail: String },

    #[error("SchemaError: {detail}")]
    SchemaError { detail: String },

    #[error("ERROR {code} ({sqlstate}): {detail}")]
    ExecutionError {
        code: u32,
        sqlstate: &'static str,
        detail: String,
    },

    #[error("ConfigError: {0}")]
    ConfigError(String),

    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),
}

impl MongoSqlError {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        MongoSqlError::ParseError {
            position,
            message: message.into(),
        }
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        MongoSqlError::UnsupportedFeature {
            detail: detail.into(),
        }
    }

    pub fn translation(detail: impl Into<String>) -> Self {
        MongoSqlError::TranslationError {
            detail: detail.into(),
        }
    }

    pub fn schema(detail: impl Into<String>) -> Self {
        MongoSqlError::SchemaError {
            detail: detail.into(),
        }
    }

    pub fn auth_denied(user: &str, host: &str) -> Self {
        MongoSqlError::ExecutionError {
            code: 1045,
            sqlstate: "28000",
            detail: format!("Access denied for user '{user}'@'{host}' (using password: YES)"),
        }
    }

    pub fn no_database_selected() -> Self {
        MongoSqlError::ExecutionError {
            code: 1046,
            sqlstate: "3D000",
            detail: "No database selected".to_string(),
        }
    }

    pub fn unknown_database(db: &str) -> Self {
        MongoSqlError::ExecutionError {
            code: 1049,
            sqlstate: "42000",
            detail: format!("Unknown database '{db}'"),
        }
    }

    pub fn sql_syntax(detail: impl Into<String>) -> Self {
        MongoSqlError::ExecutionError {
            code: 1064,
            sqlstate: "42000",
            detail: detail.into(),
        }
    }

    pub fn unknown_table(collection: &str) -> Self {
        MongoSqlError::ExecutionError {
            code: 1146,
            sqlstate: "42S02",
            detail: format!("Table '{collection}' doesn't exist"),
        }
    }

    /// Supplemented from the original implementation's `mongodb_client.py`;
    /// not in spec.md's §7 table but raised there for a role-denied operation.
    pub fn command_denied(detail: impl Into<String>) -> Self {
        MongoSqlError::ExecutionError {
            code: 1142,
            sqlstate: "42000",
            detail: detail.into(),
        }
    }

    pub fn connect_failure(host: &str, detail: impl std::fmt::Display) -> Self {
        MongoSqlError::ExecutionError {
            code: 2003,
            sqlstate: "HY000",
            detail: format!("Can't connect to MongoDB server on '{host}' ({detail})"),
        }
    }

    pub fn server_gone(detail: impl Into<String>) -> Self {
        MongoSqlError::ExecutionError {
            code: 2006,
            sqlstate: "HY000",
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MongoSqlError>;
