use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
    #[display("missing required secret: {name}")]
    MissingSecret { name: String },
}

/// Rejected alert submission.
#[derive(Debug, Display, Error, PartialEq)]
pub enum ValidationError {
    #[display("symbol must not be empty")]
    EmptySymbol,
    #[display("target price must be a positive number, got {target}")]
    NonPositiveTarget { target: f64 },
}

#[derive(Debug, Display, Error)]
pub enum PriceFetchError {
    #[display("price request for {symbol} failed")]
    Request { symbol: String },
    #[display("price endpoint returned an error for {symbol}")]
    Status { symbol: String },
    #[display("failed to parse price response for {symbol}")]
    ResponseParse { symbol: String },
}

#[derive(Debug, Display, Error)]
pub enum NotifyError {
    #[display("failed to reach messaging service")]
    Request,
    #[display("messaging service rejected the message")]
    Delivery,
}
