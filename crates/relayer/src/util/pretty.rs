use core::fmt::{Debug, Display, Error as FmtError, Formatter};
use core::time::Duration;

/// Displays an optional value, or `None` when absent.
pub struct PrettyOption<'a, T>(pub &'a Option<T>);

impl<'a, T: Display> Display for PrettyOption<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match &self.0 {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "None"),
        }
    }
}

impl<'a, T: Display> Debug for PrettyOption<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        Display::fmt(self, f)
    }
}

pub struct PrettyDuration<'a>(pub &'a Duration);

impl Display for PrettyDuration<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{}ms", self.0.as_millis())
    }
}

/// Displays a slice as a bracketed, comma-separated list.
pub struct PrettySlice<'a, T>(pub &'a [T]);

impl<T: Display> Display for PrettySlice<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "[ ")?;
        let mut vec_iterator = self.0.iter().peekable();
        while let Some(element) = vec_iterator.next() {
            write!(f, "{element}")?;
            // If it is not the last element, add separator.
            if vec_iterator.peek().is_some() {
                write!(f, ", ")?;
            }
        }
        write!(f, " ]")
    }
}

impl<T: Display> Debug for PrettySlice<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn pretty_values() {
        assert_eq!(PrettyOption(&Some(3)).to_string(), "3");
        assert_eq!(PrettyOption::<u8>(&None).to_string(), "None");
        assert_eq!(PrettySlice(&[1, 2, 3]).to_string(), "[ 1, 2, 3 ]");
        assert_eq!(PrettySlice::<u8>(&[]).to_string(), "[  ]");
        assert_eq!(
            PrettyDuration(&Duration::from_millis(1500)).to_string(),
            "1500ms"
        );
    }
}
