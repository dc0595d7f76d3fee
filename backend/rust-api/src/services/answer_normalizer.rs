//! Text normalization and equivalence for free-text math answers.
//!
//! Matching is purely textual: answers are canonicalized and compared, with a
//! small fixed set of alternative spellings. Expressions that need algebraic
//! simplification (`6x` vs `2*3x`) are not recognized as equal.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref MULTIPLICATION: Regex = Regex::new(r"[*×]").unwrap();
    static ref OPEN_PAREN_SPACE: Regex = Regex::new(r"\(\s+").unwrap();
    static ref CLOSE_PAREN_SPACE: Regex = Regex::new(r"\s+\)").unwrap();
    static ref PLUS_SPACE: Regex = Regex::new(r"\s*\+\s*").unwrap();
    static ref MINUS_SPACE: Regex = Regex::new(r"\s*-\s*").unwrap();
    static ref LEADING_NUMERATOR: Regex = Regex::new(r"([^/]+)/").unwrap();
    static ref NUMBER: Regex = Regex::new(r"\d+").unwrap();
    static ref MATH_SYMBOL: Regex = Regex::new(r"[a-zA-Z0-9+\-*/^()]").unwrap();
}

/// Canonical form of an answer. Passes run in a fixed order, each on the
/// output of the previous one.
pub fn normalize(answer: &str) -> String {
    let lowered = answer.to_lowercase();
    let trimmed = lowered.trim();
    let compact = WHITESPACE.replace_all(trimmed, "");
    let unmultiplied = MULTIPLICATION.replace_all(&compact, "");
    let divided = unmultiplied.replace('÷', "/");
    let powered = divided.replace("**", "^");
    let opened = OPEN_PAREN_SPACE.replace_all(&powered, "(");
    let closed = CLOSE_PAREN_SPACE.replace_all(&opened, ")");
    let plus = PLUS_SPACE.replace_all(&closed, "+");
    MINUS_SPACE.replace_all(&plus, "-").into_owned()
}

/// Alternative spellings of an already-normalized answer, itself included.
fn alternatives(normalized: &str) -> Vec<String> {
    let mut alternatives = vec![normalized.to_string()];

    if normalized.contains('/') {
        let with_parens = LEADING_NUMERATOR
            .replace(normalized, "($1)/")
            .into_owned();
        if with_parens != normalized {
            alternatives.push(with_parens);
        }
    }

    if normalized.contains("+c") {
        alternatives.push(normalized.replacen("+c", "+C", 1));
    }
    if normalized.contains("+C") {
        alternatives.push(normalized.replacen("+C", "+c", 1));
    }

    alternatives
}

/// Whether the learner's answer matches the canonical one.
///
/// The alternative set is checked in both directions so that a parenthesized
/// numerator matches whichever side carries the parentheses.
pub fn is_equivalent(user_answer: &str, correct_answer: &str) -> bool {
    let user = normalize(user_answer);
    let correct = normalize(correct_answer);

    if user == correct {
        return true;
    }

    alternatives(&correct).iter().any(|alt| *alt == user)
        || alternatives(&user).iter().any(|alt| *alt == correct)
}

/// Rejects blank input, input without any math character, and unbalanced
/// parentheses.
pub fn is_valid_expression(answer: &str) -> bool {
    let trimmed = answer.trim();

    if trimmed.is_empty() || !MATH_SYMBOL.is_match(trimmed) {
        return false;
    }

    let mut depth: i64 = 0;
    for ch in trimmed.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }

    depth == 0
}

/// Short targeted remark on why an answer is probably wrong.
pub fn answer_feedback(user_answer: &str, correct_answer: &str) -> Option<String> {
    let user = normalize(user_answer);
    let correct = normalize(correct_answer);

    if correct.contains("+c") && !user.contains("+c") {
        return Some(
            "Don't forget to add the constant of integration (+C) for indefinite integrals!"
                .to_string(),
        );
    }

    let user_numbers: Vec<&str> = NUMBER.find_iter(&user).map(|m| m.as_str()).collect();
    let correct_numbers: Vec<&str> = NUMBER.find_iter(&correct).map(|m| m.as_str()).collect();

    if !user_numbers.is_empty()
        && user_numbers.len() == correct_numbers.len()
        && user_numbers
            .iter()
            .zip(&correct_numbers)
            .any(|(user, correct)| user != correct)
    {
        return Some("Your structure looks right, but check your coefficients carefully.".to_string());
    }

    if user.matches('-').count() != correct.matches('-').count() {
        return Some("Check your signs - you may have a sign error.".to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_applies_all_passes() {
        assert_eq!(normalize("  2 * X  "), "2x");
        assert_eq!(normalize("6 × x ^ 2"), "6x^2");
        assert_eq!(normalize("x ÷ 2"), "x/2");
        assert_eq!(normalize("( x + 1 ) - 3"), "(x+1)-3");
        assert_eq!(normalize("X^2/2 + C"), "x^2/2+c");
    }

    #[test]
    fn double_star_is_consumed_by_multiplication_pass() {
        // `*` removal runs before the `**` pass, so the exponent marker is lost.
        assert_eq!(normalize("x**2"), "x2");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "",
            "   ",
            "2*x",
            "X ** 2 + C",
            "(x^2) / 2 + c",
            "3 × ( x - 1 ) ÷ 4",
            "-x^4",
            "\t6x\n",
            "sin(x) * cos(x)",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn multiplication_glyphs_are_ignored() {
        assert!(is_equivalent("2x", "2*x"));
        assert!(is_equivalent("2 × x", "2x"));
    }

    #[test]
    fn parenthesized_numerator_and_constant_case_match() {
        assert!(is_equivalent("x^2/2 + c", "(x^2)/2+C"));
        assert!(is_equivalent("(x^3)/3+C", "x^3/3 + c"));
    }

    #[test]
    fn no_algebraic_simplification() {
        assert!(!is_equivalent("6x", "2*3x"));
        assert!(!is_equivalent("x2", "2x^1"));
    }

    #[test]
    fn answer_is_equivalent_to_itself() {
        for answer in ["-12x^3", "x", "-x", "4", "x^2/2+C"] {
            assert!(is_equivalent(answer, answer));
        }
    }

    #[test]
    fn validates_expressions() {
        assert!(is_valid_expression("2x"));
        assert!(is_valid_expression("(x+1)^2"));
        assert!(!is_valid_expression(""));
        assert!(!is_valid_expression("   "));
        assert!(!is_valid_expression("???"));
        assert!(!is_valid_expression("(x+1"));
        assert!(!is_valid_expression(")x+1("));
    }

    #[test]
    fn feedback_points_at_common_slips() {
        assert_eq!(
            answer_feedback("x^2/2", "x^2/2 + C").as_deref(),
            Some("Don't forget to add the constant of integration (+C) for indefinite integrals!")
        );
        assert_eq!(
            answer_feedback("3x^2", "6x^2").as_deref(),
            Some("Your structure looks right, but check your coefficients carefully.")
        );
        assert_eq!(
            answer_feedback("x", "-x").as_deref(),
            Some("Check your signs - you may have a sign error.")
        );
        assert_eq!(answer_feedback("sin(x)", "cos(x)"), None);
    }
}
