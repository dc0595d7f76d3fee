use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub question_mistakes: BTreeMap<String, u32>,
    pub concept_mistakes: BTreeMap<String, u32>,
    pub hint_indices: BTreeMap<String, u32>,
    pub lessons_viewed: BTreeMap<String, bool>,
}

#[derive(Debug, Serialize)]
pub struct QuestionProgress {
    pub question_id: String,
    pub mistakes: u32,
    pub hint_index: u32,
}

#[derive(Debug, Serialize)]
pub struct ConceptProgress {
    pub concept_id: String,
    pub mistakes: u32,
    pub lesson_viewed: bool,
}
