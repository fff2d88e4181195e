//! User-reference extraction.
//!
//! Questions may name the user they are about ("for user 5", "for user
//! jane@example.com") or refer to the caller ("my enrolled courses"). The
//! extractor tries the id patterns first, then the username patterns, then
//! the personal-keyword fallback. Id patterns overlap by design: the more
//! specific phrasings come before the bare `user N` catch-all, so declared
//! order is a correctness requirement.

use std::fmt;

use crate::validation::ValidationConfig;

/// The identity a question was inferred to target. Attached to the enriched
/// question sent to the generation backend and echoed in the formatted
/// response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserReference {
    UserId(i64),
    Username(String),
    Personal(i64),
}

impl fmt::Display for UserReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserId(id) => write!(f, "user_id {id}"),
            Self::Username(name) => write!(f, "username {name}"),
            Self::Personal(id) => write!(f, "personal {id}"),
        }
    }
}

pub fn extract_user_reference(config: &ValidationConfig, question: &str) -> Option<UserReference> {
    let question_lower = question.to_lowercase();

    for pattern in &config.user_id_patterns {
        if let Some(captures) = pattern.captures(&question_lower)
            && let Some(digits) = captures.get(1)
            && let Ok(id) = digits.as_str().parse::<i64>()
        {
            return Some(UserReference::UserId(id));
        }
    }

    for pattern in &config.username_patterns {
        if let Some(captures) = pattern.captures(&question_lower)
            && let Some(token) = captures.get(1)
        {
            let username = token.as_str();
            // A captured token only counts as a username when it looks like
            // an email address or is a known admin account; otherwise the
            // next pattern still gets a chance.
            if username.contains('@') || config.username_allow_list.contains(&username) {
                return Some(UserReference::Username(username.to_string()));
            }
        }
    }

    if config
        .personal_keywords
        .iter()
        .any(|kw| question_lower.contains(kw))
    {
        return Some(UserReference::Personal(config.default_user_id));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> ValidationConfig {
        match ValidationConfig::new() {
            Ok(config) => config,
            Err(e) => panic!("built-in patterns must compile: {e}"),
        }
    }

    fn extract(question: &str) -> Option<UserReference> {
        extract_user_reference(&config(), question)
    }

    #[test]
    fn extracts_numeric_user_ids() {
        assert_eq!(
            extract("show courses for user 5"),
            Some(UserReference::UserId(5))
        );
        assert_eq!(
            extract("progress for userid 12"),
            Some(UserReference::UserId(12))
        );
        assert_eq!(
            extract("Show grades for USER ID 7"),
            Some(UserReference::UserId(7))
        );
    }

    #[test]
    fn id_patterns_win_over_username_patterns() {
        // "user id 7" could be read as username "id" by the catch-all
        // username pattern; the id pass runs first.
        assert_eq!(
            extract("completion for user id 7"),
            Some(UserReference::UserId(7))
        );
    }

    #[test]
    fn extracts_email_usernames() {
        assert_eq!(
            extract("for user jane@x.com"),
            Some(UserReference::Username("jane@x.com".to_string()))
        );
    }

    #[test]
    fn extracts_allow_listed_usernames() {
        assert_eq!(
            extract("list progress for user humanadmin"),
            Some(UserReference::Username("humanadmin".to_string()))
        );
    }

    #[test]
    fn rejected_username_tokens_do_not_abort_extraction() {
        // "bob" is neither an email nor allow-listed, so every username
        // pattern is tried and extraction falls through to none.
        assert_eq!(extract("list courses for user bob"), None);
    }

    #[test]
    fn personal_keywords_fall_back_to_the_default_user() {
        assert_eq!(
            extract("my enrolled courses"),
            Some(UserReference::Personal(2))
        );
        assert_eq!(
            extract("what courses am i taking"),
            Some(UserReference::Personal(2))
        );
    }

    #[test]
    fn questions_without_a_reference_extract_nothing() {
        assert_eq!(extract("show all courses"), None);
    }

    #[test]
    fn renders_kind_and_value() {
        assert_eq!(UserReference::UserId(5).to_string(), "user_id 5");
        assert_eq!(
            UserReference::Username("jane@x.com".to_string()).to_string(),
            "username jane@x.com"
        );
        assert_eq!(UserReference::Personal(2).to_string(), "personal 2");
    }
}
