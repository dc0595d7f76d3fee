use rand::Rng;

use crate::models::problem::Problem;

pub const DEFAULT_PROBLEM_COUNT: usize = 10;
pub const POWER_RULE_CONCEPT: &str = "power-rule";
pub const POWER_RULE_LESSON_TOPIC: &str = "Derivatives - Power Rule";
pub const POWER_RULE_LESSON_URL: &str =
    "https://www.whitman.edu/mathematics/multivariable/multivariable_13_Derivatives.html";

const COEFFICIENT_RANGE: std::ops::RangeInclusive<i32> = -4..=4;
const EXPONENT_RANGE: std::ops::RangeInclusive<u32> = 1..=5;

/// Generates `count` power-rule derivative problems for when no problem set
/// could be loaded.
pub fn generate_problems<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Problem> {
    (1..=count)
        .map(|i| {
            let mut coefficient = rng.random_range(COEFFICIENT_RANGE);
            if coefficient == 0 {
                coefficient = 1;
            }
            let exponent = rng.random_range(EXPONENT_RANGE);
            derivative_problem(i, coefficient, exponent)
        })
        .collect()
}

/// Builds the problem "d/dx of c·x^n" with its power-rule answer and hints.
pub fn derivative_problem(number: usize, coefficient: i32, exponent: u32) -> Problem {
    let term = format_term(coefficient, exponent);
    let answer = power_rule_answer(coefficient, exponent);

    let hints = vec![
        "Remember the power rule: d/dx[x^n] = n*x^(n-1)".to_string(),
        format!(
            "For {}, bring down the exponent {} and multiply by the coefficient, then reduce the exponent by 1",
            term, exponent
        ),
        format!("The derivative is {}", answer),
    ];

    Problem {
        id: format!("fallback_derivative_{}", number),
        question: format!("What is the derivative of {}?", term),
        answer,
        topic: None,
        concept_ids: vec![POWER_RULE_CONCEPT.to_string()],
        hints,
        solution_steps: Vec::new(),
        lesson_topic: Some(POWER_RULE_LESSON_TOPIC.to_string()),
        lesson_url: Some(POWER_RULE_LESSON_URL.to_string()),
    }
}

/// `c·x^n` as typed by a learner: a unit coefficient is dropped and an
/// exponent of one is omitted.
fn format_term(coefficient: i32, exponent: u32) -> String {
    let coefficient = match coefficient {
        1 => String::new(),
        -1 => "-".to_string(),
        c => c.to_string(),
    };
    let exponent = if exponent == 1 {
        String::new()
    } else {
        format!("^{}", exponent)
    };
    format!("{}x{}", coefficient, exponent)
}

pub fn power_rule_answer(coefficient: i32, exponent: u32) -> String {
    let answer_coefficient = coefficient * exponent as i32;
    match exponent.saturating_sub(1) {
        0 => answer_coefficient.to_string(),
        answer_exponent => format_term(answer_coefficient, answer_exponent),
    }
}
