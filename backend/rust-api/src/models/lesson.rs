use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    #[serde(default)]
    pub concept_id: String,
    pub title: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub steps: Vec<LessonStep>,
    /// External reading for lessons that only point at reference material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonStep {
    #[serde(rename = "type")]
    pub kind: LessonStepKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStepKind {
    Explanation,
    Example,
    Practice,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LessonCatalog {
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl LessonCatalog {
    pub fn find_by_concept(&self, concept_id: &str) -> Option<&Lesson> {
        self.lessons
            .iter()
            .find(|lesson| lesson.concept_id == concept_id)
    }
}

pub const CALCULUS_TEXT_TITLE: &str = "Calculus Text";
pub const CALCULUS_TEXT_URL: &str = "/assets/calculus.txt";

impl Lesson {
    /// Lesson that only links to reading material, used by the help action.
    pub fn reference(concept_id: &str, title: Option<&str>, url: Option<&str>) -> Self {
        Self {
            id: format!("reference:{}", concept_id),
            concept_id: concept_id.to_string(),
            title: title.unwrap_or(CALCULUS_TEXT_TITLE).to_string(),
            short_description: String::new(),
            steps: Vec::new(),
            url: Some(url.unwrap_or(CALCULUS_TEXT_URL).to_string()),
        }
    }

    pub fn calculus_text() -> Self {
        Self::reference("", None, None)
    }
}
