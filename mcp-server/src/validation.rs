//! Question validation pipeline.
//!
//! Questions pass through an ordered set of gates before any SQL generation
//! happens; the first failing gate wins and produces user-facing guidance
//! text. Ordering is part of the contract: the brevity gate and the domain
//! gate both test for domain keywords but with opposite polarity, so a short
//! domain-flavored question is "too vague" while a domain-free question of
//! any length is "unclear".

use regex::Regex;

/// Immutable validation and extraction tables, built once at startup and
/// passed by reference. Pattern lists are evaluated in declared order and
/// the first match wins.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub blocked_keywords: Vec<&'static str>,
    pub vague_patterns: Vec<Regex>,
    pub domain_keywords: Vec<&'static str>,
    pub user_id_patterns: Vec<Regex>,
    pub username_patterns: Vec<Regex>,
    pub username_allow_list: Vec<&'static str>,
    pub personal_keywords: Vec<&'static str>,
    pub default_user_id: i64,
}

const VAGUE_PATTERNS: &[&str] = &[
    r"^(hi|hello|hey|what|how|can you|please)$",
    r"^(help|info|information|status|test|check)$",
    r"^(users?|courses?|enrollments?|data|students?|learners?)$",
    r"^(show|list|find|get|count)$",
];

const USER_ID_PATTERNS: &[&str] = &[
    r"user\s*id\s*(\d+)",
    r"userid\s*(\d+)",
    r"for\s*user\s*(\d+)",
    r"user\s*(\d+)",
];

const USERNAME_PATTERNS: &[&str] = &[
    r"for\s*user\s*([a-zA-Z0-9@.\-_]+)",
    r"user\s*([a-zA-Z0-9@.\-_]+)",
    r"for\s*([a-zA-Z0-9@.\-_]+@[a-zA-Z0-9.\-_]+)",
    r"username\s*([a-zA-Z0-9@.\-_]+)",
];

impl ValidationConfig {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            min_length: 5,
            max_length: 500,
            blocked_keywords: vec![
                "drop", "delete", "truncate", "alter", "create", "insert", "update",
            ],
            vague_patterns: compile_all(VAGUE_PATTERNS)?,
            // Domain nouns and query verbs only. Interrogatives ("what",
            // "who") do not count as domain context on their own.
            domain_keywords: vec![
                "user",
                "course",
                "enrollment",
                "student",
                "learner",
                "totara",
                "lms",
                "show",
                "list",
                "find",
                "get",
                "count",
                "progress",
                "completion",
                "certificate",
                "grade",
                "activity",
            ],
            user_id_patterns: compile_all(USER_ID_PATTERNS)?,
            username_patterns: compile_all(USERNAME_PATTERNS)?,
            username_allow_list: vec!["humanadmin", "admin"],
            personal_keywords: vec![
                "my",
                "i am",
                "i'm",
                "me",
                "my courses",
                "my enrollments",
                "my progress",
                "my learning",
                "what am i",
                "what courses am i",
            ],
            default_user_id: 2,
        })
    }
}

fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    TooShort,
    TooLong,
    UnsafeOperation,
    TooVague,
    InsufficientContext,
    Unclear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Accepted,
    Rejected {
        reason: RejectReason,
        message: String,
    },
}

impl ValidationOutcome {
    fn rejected(reason: RejectReason, message: impl Into<String>) -> Self {
        Self::Rejected {
            reason,
            message: message.into(),
        }
    }
}

pub fn validate(config: &ValidationConfig, question: &str) -> ValidationOutcome {
    if question.is_empty() {
        return ValidationOutcome::rejected(
            RejectReason::InsufficientContext,
            "ERROR: Invalid Input - Please provide a valid question as text.",
        );
    }

    let question = question.trim();
    let question_lower = question.to_lowercase();

    let length = question.chars().count();
    if length < config.min_length {
        return ValidationOutcome::rejected(
            RejectReason::TooShort,
            format!(
                "ERROR: Question Too Short - Minimum {} chars. Example: 'Show me all active users'",
                config.min_length
            ),
        );
    }
    if length > config.max_length {
        return ValidationOutcome::rejected(
            RejectReason::TooLong,
            format!(
                "ERROR: Question Too Long - Maximum {} characters.",
                config.max_length
            ),
        );
    }

    // Deny-list, not a parser: any hit anywhere in the text rejects.
    if config
        .blocked_keywords
        .iter()
        .any(|kw| question_lower.contains(kw))
    {
        return ValidationOutcome::rejected(
            RejectReason::UnsafeOperation,
            "ERROR: Unsafe Operation - Only SELECT queries allowed.",
        );
    }

    if config
        .vague_patterns
        .iter()
        .any(|pattern| pattern.is_match(&question_lower))
    {
        return ValidationOutcome::rejected(
            RejectReason::TooVague,
            format!(
                "ERROR: Too Vague - \"{question}\" needs more context.\n\nExamples:\n\u{2022} \"users\" -> \"Show me all active users\"\n\u{2022} \"courses\" -> \"List all courses\"\n\u{2022} \"help\" -> \"Show enrollment help\""
            ),
        );
    }

    let has_domain_context = config
        .domain_keywords
        .iter()
        .any(|kw| question_lower.contains(kw));

    if question_lower.split_whitespace().count() < 3 && has_domain_context {
        return ValidationOutcome::rejected(
            RejectReason::TooVague,
            format!(
                "ERROR: Too Vague - \"{question}\" needs more context.\n\nTry: \"Show me all active users\" or \"List courses with enrollment counts\""
            ),
        );
    }

    if !has_domain_context {
        return ValidationOutcome::rejected(
            RejectReason::Unclear,
            "ERROR: Unclear Request - Question must relate to Totara LMS.\n\nExamples:\n\u{2022} \"Show me all active users\"\n\u{2022} \"List courses with enrollments\"",
        );
    }

    ValidationOutcome::Accepted
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

    fn reason_for(question: &str) -> RejectReason {
        match validate(&config(), question) {
            ValidationOutcome::Rejected { reason, .. } => reason,
            ValidationOutcome::Accepted => panic!("expected rejection for {question:?}"),
        }
    }

    #[test]
    fn empty_question_is_invalid_input() {
        let outcome = validate(&config(), "");
        let ValidationOutcome::Rejected { reason, message } = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(reason, RejectReason::InsufficientContext);
        assert!(message.starts_with("ERROR: Invalid Input"));
    }

    #[test]
    fn questions_below_min_length_are_too_short() {
        assert_eq!(reason_for("hi"), RejectReason::TooShort);
        assert_eq!(reason_for("use"), RejectReason::TooShort);
        // Whitespace does not count toward the length check.
        assert_eq!(reason_for("   hey    "), RejectReason::TooShort);
    }

    #[test]
    fn question_exactly_at_min_length_is_not_rejected_for_length() {
        // Five characters, one token with a domain keyword: rejected, but by
        // the brevity gate rather than the length gate.
        assert_eq!(reason_for("users"), RejectReason::TooVague);
    }

    #[test]
    fn questions_above_max_length_are_too_long() {
        let question = format!("show users {}", "x".repeat(600));
        assert_eq!(reason_for(&question), RejectReason::TooLong);
    }

    #[test]
    fn blocked_keywords_reject_regardless_of_other_content() {
        assert_eq!(
            reason_for("Show me all users then DROP the table"),
            RejectReason::UnsafeOperation
        );
        assert_eq!(
            reason_for("please delete old enrollments"),
            RejectReason::UnsafeOperation
        );
        // Substring match, not word-boundary-aware.
        assert_eq!(
            reason_for("show all updates for courses"),
            RejectReason::UnsafeOperation
        );
    }

    #[test]
    fn safety_gate_runs_before_vagueness() {
        assert_eq!(reason_for("truncate"), RejectReason::UnsafeOperation);
    }

    #[test]
    fn full_match_vague_patterns_reject() {
        // Only tokens at or above the minimum length can reach this gate;
        // shorter vague words like "show" are caught by the length check.
        for question in ["hello", "users", "count", "check"] {
            assert_eq!(reason_for(question), RejectReason::TooVague, "{question}");
        }
        // Case-insensitive via the lower-cased copy.
        assert_eq!(reason_for("HELLO"), RejectReason::TooVague);
    }

    #[test]
    fn short_domain_questions_hit_the_brevity_gate() {
        let outcome = validate(&config(), "show users");
        let ValidationOutcome::Rejected { reason, message } = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(reason, RejectReason::TooVague);
        // The brevity branch carries its own guidance text, distinct from
        // the full-match branch.
        assert!(message.contains("Try: \"Show me all active users\""));
    }

    #[test]
    fn domain_free_questions_are_unclear() {
        assert_eq!(reason_for("What's the weather?"), RejectReason::Unclear);
        assert_eq!(
            reason_for("tell me a joke about penguins"),
            RejectReason::Unclear
        );
    }

    #[test]
    fn specific_domain_questions_are_accepted() {
        for question in [
            "Show me all active users",
            "List courses with enrollment counts",
            "How many students completed the safety course?",
        ] {
            assert_eq!(
                validate(&config(), question),
                ValidationOutcome::Accepted,
                "{question}"
            );
        }
    }

    #[test]
    fn rejection_messages_carry_concrete_examples() {
        let ValidationOutcome::Rejected { message, .. } = validate(&config(), "courses") else {
            panic!("expected rejection");
        };
        assert!(message.contains("\"courses\" -> \"List all courses\""));
    }
}
