use ledger_api::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("template: {0}")]
    Template(String),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("auth: {0}")]
    Auth(String),

    #[error("write '{path}': {source}")]
    Write { path: String, source: std::io::Error },
}

impl ReportError {
    pub fn config(context: &'static str, detail: impl Into<String>) -> Self {
        Self::Config { context, detail: detail.into() }
    }
}
