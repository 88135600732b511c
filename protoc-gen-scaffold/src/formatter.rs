use colored::*;
use std::fmt::Display;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

/// An error with a short, highlighted headline.
pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}\n\n'{}'", msg.red().bold(), err))
    }
}

impl From<anyhow::Error> for FormattedString {
    fn from(err: anyhow::Error) -> Self {
        FormattedString(format!("{}\n\n{:#}", "Plugin failed:".red().bold(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_error_keeps_the_message() {
        colored::control::set_override(false);

        let formatted = FormattedString::from(GenericError("Generation failed:", "boom"));

        assert_eq!(formatted.0, "Generation failed:\n\n'boom'");
        assert_eq!(formatted.to_string(), "\nGeneration failed:\n\n'boom'\n");
    }

    #[test]
    fn test_anyhow_error_renders_the_whole_chain() {
        colored::control::set_override(false);

        let err = anyhow::anyhow!("unexpected end of input").context("Failed to decode request");
        let formatted = FormattedString::from(err);

        assert_eq!(
            formatted.0,
            "Plugin failed:\n\nFailed to decode request: unexpected end of input"
        );
    }
}
