use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("exchange error: {0}")]
    Exchange(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("strategy error: {0}")]
    Strategy(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("database connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("database migration error: {0}")]
    Migration(String),

    #[error("unknown market: {0}")]
    UnknownMarket(String),

    #[error("notification error: {0}")]
    Notification(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
