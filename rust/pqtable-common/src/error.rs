use parquet::errors::ParquetError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_format(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn not_parquet(source: impl Into<String>, reason: impl Into<String>) -> Error {
        Error(
            ErrorKind::NotParquet {
                source_name: source.into(),
                reason: reason.into(),
            }
            .into(),
        )
    }

    pub fn malformed<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Malformed {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }

    /// Classifies an error raised by the parquet library. Failures of the
    /// underlying reader are I/O errors, everything else means damaged data.
    pub fn parquet(context: impl Into<String>, e: ParquetError) -> Error {
        match e {
            ParquetError::External(source) => match source.downcast::<std::io::Error>() {
                Ok(io) => Error::io(context, *io),
                Err(source) => Error(
                    ErrorKind::Malformed {
                        context: context.into(),
                        source,
                    }
                    .into(),
                ),
            },
            other => Error::malformed(context, other),
        }
    }

    pub fn flat_array_null(column: impl Into<String>) -> Error {
        Error(
            ErrorKind::FlatArrayNull {
                column: column.into(),
            }
            .into(),
        )
    }

    pub fn cache_build(column: impl Into<String>, source: Error) -> Error {
        Error(
            ErrorKind::CacheBuild {
                column: column.into(),
                source,
            }
            .into(),
        )
    }

    pub fn cancelled() -> Error {
        Error(ErrorKind::Cancelled.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    /// Returns `true` for errors caused by the file content rather than by
    /// the caller or the environment.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotParquet { .. }
                | ErrorKind::Malformed { .. }
                | ErrorKind::InvalidFormat { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind(), ErrorKind::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("'{source_name}' is not a parquet file: {reason}")]
    NotParquet { source_name: String, reason: String },

    #[error("malformed parquet data{}: {source}", in_context(.context))]
    Malformed {
        context: String,
        source: StdErrorBoxed,
    },

    #[error("invalid data for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("column '{column}': flat array encoding cannot hold null arrays or elements")]
    FlatArrayNull { column: String },

    #[error("failed to cache column '{column}': {source}")]
    CacheBuild { column: String, source: Error },

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error{}: {source}", in_context(.context))]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

impl From<ParquetError> for Error {
    fn from(e: ParquetError) -> Self {
        Error::parquet("", e)
    }
}

fn in_context(context: &str) -> String {
    if context.is_empty() {
        String::new()
    } else {
        format!(" ({context})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let e = Error::flat_array_null("tags");
        assert!(matches!(e.kind(), ErrorKind::FlatArrayNull { column } if column == "tags"));
        assert!(!e.is_format_error());

        let e: Error = parquet::errors::ParquetError::General("bad page".into()).into();
        assert!(e.is_format_error());
        assert!(e.to_string().contains("bad page"));

        assert!(!e.to_string().contains("()"));

        let e = Error::cache_build("x", Error::cancelled());
        match e.into_kind() {
            ErrorKind::CacheBuild { column, source } => {
                assert_eq!(column, "x");
                assert!(source.is_cancelled());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parquet_error_classification() {
        let read_failure = ParquetError::External(Box::new(std::io::Error::other("disk gone")));
        let e = Error::parquet("column chunk", read_failure);
        assert!(matches!(e.kind(), ErrorKind::Io { .. }));
        assert!(!e.is_format_error());
        assert_eq!(e.to_string(), "I/O error (column chunk): disk gone");

        let e: Error = ParquetError::External("not utf8".into()).into();
        assert!(e.is_format_error());

        let e: Error = ParquetError::EOF("truncated page".into()).into();
        assert!(matches!(e.kind(), ErrorKind::Malformed { .. }));
    }
}
