pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Fails with [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
/// unless `$cond` holds. `$name` names the offending argument.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $cond:expr) => {
        if !($cond) {
            return Err($crate::result::arg_check_failed(
                stringify!($name),
                stringify!($cond),
            ));
        }
    };
}

/// Like [`verify_arg!`], for conditions on data read from a file.
#[macro_export]
macro_rules! verify_data {
    ($name:expr, $cond:expr) => {
        if !($cond) {
            return Err($crate::result::data_check_failed(
                stringify!($name),
                stringify!($cond),
            ));
        }
    };
}

#[cold]
pub fn arg_check_failed(name: &str, condition: &str) -> crate::Error {
    crate::Error::invalid_arg(name, format!("expected {condition}"))
}

#[cold]
pub fn data_check_failed(element: &str, condition: &str) -> crate::Error {
    crate::Error::invalid_format(element, format!("expected {condition}"))
}

#[cfg(test)]
mod tests {
    use crate::{ErrorKind, Result};

    fn first_even(values: &[u32]) -> Result<u32> {
        verify_arg!(values, !values.is_empty());
        verify_data!(values, values[0] % 2 == 0);
        Ok(values[0])
    }

    #[test]
    fn test_verify_macros() {
        assert_eq!(first_even(&[4, 1]).unwrap(), 4);
        let err = first_even(&[]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { name, .. } if name == "values"));
        let err = first_even(&[3]).unwrap_err();
        assert!(err.is_format_error());
        assert!(err.to_string().contains("values[0] % 2 == 0"));
    }
}
