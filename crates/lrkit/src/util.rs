use std::fmt;

/// Wrap a formatting closure into a value implementing `Display`.
pub fn display_fn<F>(f: F) -> impl fmt::Display
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    struct Adapter<F>(F);

    impl<F> fmt::Display for Adapter<F>
    where
        F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.0)(f)
        }
    }

    Adapter(f)
}
