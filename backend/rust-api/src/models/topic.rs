use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub lessons: Vec<TopicLesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicLesson {
    pub id: String,
    pub topic_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub questions: Vec<TopicQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    pub problem: String,
    pub solution: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    Input,
    TrueFalse,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopicCatalog {
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl TopicCatalog {
    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|topic| topic.id == topic_id)
    }

    pub fn lesson(&self, topic_id: &str, lesson_id: &str) -> Option<&TopicLesson> {
        self.topic(topic_id)?
            .lessons
            .iter()
            .find(|lesson| lesson.id == lesson_id)
    }
}
