use serde::{Deserialize, Deserializer, Serialize};

/// A single quiz problem as stored in `problems.json` or produced by the
/// fallback generator. Absent optional lists deserialize as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concept_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub solution_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_url: Option<String>,
}

impl Problem {
    pub fn primary_concept(&self) -> Option<&str> {
        self.concept_ids.first().map(String::as_str)
    }
}

/// Problem payloads come either wrapped (`{"problems": [...]}`) or as a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProblemPayload {
    Wrapped { problems: Vec<Problem> },
    Bare(Vec<Problem>),
}

impl ProblemPayload {
    pub fn into_problems(self) -> Vec<Problem> {
        match self {
            ProblemPayload::Wrapped { problems } => problems,
            ProblemPayload::Bare(problems) => problems,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProblemListResponse {
    pub problems: Vec<Problem>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wrapped_and_bare_payloads() {
        let wrapped: ProblemPayload = serde_json::from_str(
            r#"{"problems": [{"id": "p1", "question": "q", "answer": "a"}]}"#,
        )
        .unwrap();
        assert_eq!(wrapped.into_problems().len(), 1);

        let bare: ProblemPayload =
            serde_json::from_str(r#"[{"id": 7, "question": "q", "answer": "a"}]"#).unwrap();
        let problems = bare.into_problems();
        assert_eq!(problems[0].id, "7");
        assert!(problems[0].hints.is_empty());
        assert!(problems[0].primary_concept().is_none());
    }

    #[test]
    fn reads_camel_case_fields() {
        let problem: Problem = serde_json::from_str(
            r#"{
                "id": "d1",
                "question": "What is the derivative of x^2?",
                "answer": "2x",
                "conceptIds": ["power-rule", "derivatives"],
                "solutionSteps": ["Bring down the 2", "Reduce the exponent"],
                "lessonTopic": "Derivatives - Power Rule"
            }"#,
        )
        .unwrap();

        assert_eq!(problem.primary_concept(), Some("power-rule"));
        assert_eq!(problem.solution_steps.len(), 2);
        assert_eq!(
            problem.lesson_topic.as_deref(),
            Some("Derivatives - Power Rule")
        );
    }
}
