/// Unwraps a `Result` inside a function returning `Option<Result<T>>`,
/// returning `Some(Err(e))` on failure.
#[macro_export]
macro_rules! try_or_ret_some_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return Some(Err(err)),
        }
    };
}
