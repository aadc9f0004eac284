pub trait ResultOkLogExt<T, E> {
    /// Logs the error with the given call-site context and discards it.
    ///
    /// For fire-and-forget paths: a sink or notification failure must never
    /// unwind into supervisor logic.
    fn ok_log(self, context: &str) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self, context: &str) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{context}: {err}");
                None
            }
        }
    }
}
