use serde::de::DeserializeOwned;

use crate::utils::ChatError;

/// Parse a JSON reply, tolerating a surrounding Markdown code fence
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, ChatError> {
    let body = strip_code_fence(raw);
    serde_json::from_str(body).map_err(|err| {
        ChatError::MalformedUpstreamOutput(format!("{} (payload: {:.120})", err, body))
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Score {
        score: u8,
    }

    #[test]
    fn test_plain_json() {
        assert_eq!(parse_structured::<Score>(r#"{"score": 7}"#).unwrap(), Score { score: 7 });
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"score\": 4}\n```\n";
        assert_eq!(parse_structured::<Score>(raw).unwrap(), Score { score: 4 });
    }

    #[test]
    fn test_malformed_is_recoverable_error() {
        let err = parse_structured::<Score>("Sure! Here is your score: 9").unwrap_err();
        assert!(matches!(err, ChatError::MalformedUpstreamOutput(_)));
    }
}
