//! Parsing of the operator's continue/stop answer.

/// Prompt shown after every turn.
pub const CONTINUE_PROMPT: &str = "Do you want to continue? (y/n): ";

/// The operator's answer to [`CONTINUE_PROMPT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueDecision {
    Continue,
    Stop,
}

/// Input that is neither accepted token. Recoverable: re-prompt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected 'y' or 'n', got {input:?}")]
pub struct MalformedContinueInput {
    pub input: String,
}

/// Parse one line of operator input.
///
/// Only the line terminator is removed. `y` and `n` match in either case;
/// anything else, including surrounding spaces, is malformed.
pub fn parse_decision(line: &str) -> Result<ContinueDecision, MalformedContinueInput> {
    let answer = line
        .strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line);

    if answer.eq_ignore_ascii_case("y") {
        Ok(ContinueDecision::Continue)
    } else if answer.eq_ignore_ascii_case("n") {
        Ok(ContinueDecision::Stop)
    } else {
        Err(MalformedContinueInput {
            input: answer.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_tokens() {
        assert_eq!(parse_decision("y"), Ok(ContinueDecision::Continue));
        assert_eq!(parse_decision("Y"), Ok(ContinueDecision::Continue));
        assert_eq!(parse_decision("n"), Ok(ContinueDecision::Stop));
        assert_eq!(parse_decision("N"), Ok(ContinueDecision::Stop));
    }

    #[test]
    fn test_line_terminators_are_stripped() {
        assert_eq!(parse_decision("y\n"), Ok(ContinueDecision::Continue));
        assert_eq!(parse_decision("N\r\n"), Ok(ContinueDecision::Stop));
    }

    #[test]
    fn test_trailing_space_is_malformed() {
        assert_eq!(
            parse_decision("Y "),
            Err(MalformedContinueInput {
                input: "Y ".to_string()
            })
        );
        assert!(parse_decision(" n\n").is_err());
    }

    #[test]
    fn test_other_input_is_malformed() {
        for input in ["", "\n", "yes", "no", "q", "yn", "\r"] {
            assert!(parse_decision(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_malformed_message() {
        let err = parse_decision("maybe").unwrap_err();
        assert_eq!(err.to_string(), "expected 'y' or 'n', got \"maybe\"");
    }
}
