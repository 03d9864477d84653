use thiserror::Error;

/// Reason a document did not produce a model.
///
/// Callers of the `Option` entry points never see this; it is surfaced by the
/// `try_*` functions and in log diagnostics.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("input is empty")]
    Empty,

    #[error("input is {size} bytes, limit is {limit}")]
    InputTooLarge { size: usize, limit: usize },

    #[error("XML parse error: {0}")]
    MalformedXml(#[from] roxmltree::Error),

    #[error("expected root <{expected}>, found <{found}>")]
    MissingRoot { expected: &'static str, found: String },

    #[error("root <{found}> is neither <project> nor <FBType>")]
    UnknownDialect { found: String },

    #[error("<FBType> has no <BasicFB> child")]
    NotBasicFb,

    #[error("type expression nested deeper than {limit}")]
    TypeTooDeep { limit: usize },

    #[error("internal error during traversal: {0}")]
    Internal(String),
}
