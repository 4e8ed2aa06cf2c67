use log::warn;

/// Log a warning when a lookup comes back empty.
pub trait OptionLog {
    /// Emit `msg` as a warning if `self` is `None`.
    fn warn_none(self, msg: &str) -> Self;
}

impl<T> OptionLog for Option<T> {
    #[inline]
    fn warn_none(self, msg: &str) -> Self {
        self.or_else(|| {
            warn!("{msg}");

            None
        })
    }
}
