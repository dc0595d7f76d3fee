use lazy_static::lazy_static;
use regex::Regex;

use crate::models::feedback::{ErrorAnalysis, ErrorType};

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
    static ref PLUS_CONSTANT: Regex = Regex::new(r"(?i)\s*\+\s*c").unwrap();
}

/// (function, derivative, sign the derivative carries)
const TRIG_PAIRS: [(&str, &str, &str); 2] = [("sin", "cos", ""), ("cos", "sin", "-")];

fn squash(text: &str) -> String {
    WHITESPACE_RUN
        .replace_all(&text.trim().to_lowercase(), " ")
        .into_owned()
}

fn analysis(error_type: ErrorType, explanation: &str, suggestion: &str) -> ErrorAnalysis {
    ErrorAnalysis {
        error_type,
        explanation: explanation.to_string(),
        suggestion: suggestion.to_string(),
    }
}

/// Guesses which common calculus slip produced a wrong answer.
///
/// Rules are checked in order and the first hit wins; anything unrecognized
/// is reported as a general mistake.
pub fn analyze_incorrect_answer(
    user_answer: &str,
    correct_answer: &str,
    question_text: &str,
) -> ErrorAnalysis {
    let user = squash(user_answer);
    let correct = squash(correct_answer);
    let question = question_text.to_lowercase();

    if user.replace('-', "") == correct.replace('-', "") {
        return analysis(
            ErrorType::SignError,
            "Your answer is close, but there's a sign error.",
            "Check the signs (+ or -) in your answer. Did you forget a negative sign, or add one where it shouldn't be?",
        );
    }

    if question.contains("integral")
        && correct.contains("+ c")
        && !user.contains('c')
        && user == PLUS_CONSTANT.replace_all(&correct, "")
    {
        return analysis(
            ErrorType::MissingConstant,
            "You're missing the constant of integration!",
            "For indefinite integrals, always add \"+ C\" to represent the family of antiderivatives.",
        );
    }

    if question.contains("derivative")
        && question_text.contains("x^")
        && user.contains('x') != correct.contains('x')
    {
        return analysis(
            ErrorType::PowerRuleIncomplete,
            "This looks like an incomplete application of the power rule.",
            "Remember: d/dx[x^n] = n·x^(n-1). Bring down the exponent as a coefficient AND reduce the exponent by 1.",
        );
    }

    for (func, deriv, sign) in TRIG_PAIRS {
        // An empty sign is always "contained", so only negative derivatives can trigger.
        if question.contains(&format!("derivative of {}", func))
            && correct.contains(&format!("{}{}", sign, deriv))
            && user.contains(deriv)
            && !user.contains(sign)
        {
            return ErrorAnalysis {
                error_type: ErrorType::TrigDerivativeSign,
                explanation: format!("The derivative of {}(x) needs a negative sign.", func),
                suggestion: format!(
                    "Remember: d/dx[{}(x)] = {}{}(x). The negative sign is important!",
                    func, sign, deriv
                ),
            };
        }
    }

    let looks_composite = question.contains("chain rule")
        || (question_text.contains('(') && question_text.contains(')'));
    if looks_composite && !user.contains('*') && correct.contains('*') {
        return analysis(
            ErrorType::ChainRuleMissing,
            "Did you forget to apply the chain rule?",
            "For composite functions, use the chain rule: multiply by the derivative of the inner function.",
        );
    }

    if question.contains("product rule") || question_text.contains('*') || question_text.contains('·')
    {
        return analysis(
            ErrorType::ProductRuleError,
            "Check your product rule application.",
            "Remember: (fg)' = f'g + fg'. You need BOTH terms: derivative of first times second, PLUS first times derivative of second.",
        );
    }

    if question.contains("quotient rule") || question_text.contains('/') {
        return analysis(
            ErrorType::QuotientRuleError,
            "Check your quotient rule application.",
            "Remember: (f/g)' = (f'g - fg')/g². Low d-high minus high d-low, all over low squared.",
        );
    }

    analysis(
        ErrorType::GeneralMistake,
        "That's not the correct answer.",
        "Review the relevant concept and try again, or view a hint for guidance.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_sign_error() {
        let result = analyze_incorrect_answer("6x", "-6x", "What is the derivative of -3x^2?");
        assert_eq!(result.error_type, ErrorType::SignError);
    }

    #[test]
    fn detects_missing_constant() {
        let result =
            analyze_incorrect_answer("x^2/2", "x^2/2 + C", "What is the integral of x?");
        assert_eq!(result.error_type, ErrorType::MissingConstant);
    }

    #[test]
    fn detects_incomplete_power_rule() {
        let result = analyze_incorrect_answer("4", "4x", "What is the derivative of 2x^2?");
        assert_eq!(result.error_type, ErrorType::PowerRuleIncomplete);
    }

    #[test]
    fn detects_trig_sign_only_for_negative_derivatives() {
        let cos = analyze_incorrect_answer("sin(x)", "-sin(x)", "What is the derivative of cos(x)?");
        // Equal up to minus signs, so the sign rule catches it first.
        assert_eq!(cos.error_type, ErrorType::SignError);

        let cos = analyze_incorrect_answer("sin x", "-sin(x)", "What is the derivative of cos(x)?");
        assert_eq!(cos.error_type, ErrorType::TrigDerivativeSign);
    }

    #[test]
    fn falls_back_to_rule_specific_and_general_feedback() {
        let chain = analyze_incorrect_answer("2(x+1)", "2*(x+1)*1", "Differentiate (x+1)^2");
        assert_eq!(chain.error_type, ErrorType::ChainRuleMissing);

        let quotient = analyze_incorrect_answer("1", "2", "Differentiate x/2 by the quotient rule");
        assert_eq!(quotient.error_type, ErrorType::QuotientRuleError);

        let general = analyze_incorrect_answer("5", "7", "What is lim x->2 of x+5?");
        assert_eq!(general.error_type, ErrorType::GeneralMistake);
    }
}
