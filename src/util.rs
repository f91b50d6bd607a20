/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```should_panic
/// # use street_q::assert_interval;
/// let alpha = 2.0;
/// assert_interval!(alpha, 0.0, 1.0);
/// ```
/// This will panic with the message "Invalid value for \`alpha\`. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`. Must be in the interval [{}, {}].",
            stringify!($var),
            $a,
            $b,
        );
    };
}

/// Returns `true` if `value` lies in the closed interval `[a,b]`
pub(crate) fn in_interval(value: f32, a: f32, b: f32) -> bool {
    value >= a && value <= b
}
