use thiserror::Error;

/// Errors that can occur while converting between canonical and XML invoices.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConvertError {
    /// A field required by the target document is absent (e.g. "Customer", "Supplier tax ID").
    #[error("{0} not found")]
    MissingRequiredField(String),

    /// Unknown target format selector or unknown XML root element.
    #[error("unrecognized format: {0}")]
    UnrecognizedFormat(String),

    /// The payload is neither a readable envelope nor well-formed XML.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The envelope holds a document that is not an invoice.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A canonical value has no counterpart in the target code list.
    #[error("no code mapped for {field} '{value}'")]
    UnmappedCode { field: &'static str, value: String },

    /// XML generation error.
    #[error("XML error: {0}")]
    Xml(String),

    /// An error annotated with the conversion step it occurred in.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ConvertError>,
    },
}

/// Flat classification of a [`ConvertError`], ignoring any context wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingRequiredField,
    UnrecognizedFormat,
    MalformedInput,
    TypeMismatch,
    UnmappedCode,
    Xml,
}

impl ConvertError {
    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Self::MissingRequiredField(what.into())
    }

    /// Wrap this error with the name of the step or field that failed.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context layers removed.
    pub fn root(&self) -> &ConvertError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Self::MissingRequiredField(_) => ErrorKind::MissingRequiredField,
            Self::UnrecognizedFormat(_) => ErrorKind::UnrecognizedFormat,
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::TypeMismatch(_) => ErrorKind::TypeMismatch,
            Self::UnmappedCode { .. } => ErrorKind::UnmappedCode,
            Self::Xml(_) | Self::Context { .. } => ErrorKind::Xml,
        }
    }
}

/// Adds step context to `Result`s on their way up to the dispatcher.
pub(crate) trait ResultExt<T> {
    fn context(self, context: &str) -> Result<T, ConvertError>;
}

impl<T> ResultExt<T> for Result<T, ConvertError> {
    fn context(self, context: &str) -> Result<T, ConvertError> {
        self.map_err(|e| e.context(context))
    }
}
