use super::domain::{AssessmentId, CompetencyId, QuestionId, SectionId};
use super::engine::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_SCALE_MAX: u8 = 7;
const MAX_SCALE: u8 = 100;

/// Inclusive rating scale `1..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RatingScale {
    max: u8,
}

impl RatingScale {
    pub fn new(max: u8) -> Result<Self, EngineError> {
        if !(2..=MAX_SCALE).contains(&max) {
            return Err(EngineError::InvalidScale { max });
        }
        Ok(Self { max })
    }

    pub const fn min(self) -> u8 {
        1
    }

    pub const fn max(self) -> u8 {
        self.max
    }

    /// Width of the scale in rating points, e.g. 6.0 for 1–7.
    pub fn range(self) -> f64 {
        f64::from(self.max - 1)
    }

    pub fn contains(self, rating: i64) -> bool {
        rating >= i64::from(self.min()) && rating <= i64::from(self.max)
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self {
            max: DEFAULT_SCALE_MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
    pub id: CompetencyId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub section_id: SectionId,
    #[serde(default = "default_scale_max")]
    pub scale_max: u8,
    #[serde(default)]
    pub competencies: Vec<CompetencyId>,
}

fn default_scale_max() -> u8 {
    DEFAULT_SCALE_MAX
}

/// Wire shape of an assessment definition before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct DefinitionDocument {
    pub id: AssessmentId,
    #[serde(default)]
    pub title: String,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub competencies: Vec<Competency>,
    pub questions: Vec<Question>,
}

/// Validated, indexed assessment definition.
///
/// Questions, sections and competencies keep their declared order; that order
/// drives every ordered output the engine produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DefinitionDocument")]
pub struct AssessmentDefinition {
    id: AssessmentId,
    title: String,
    scale: RatingScale,
    sections: Vec<Section>,
    competencies: Vec<Competency>,
    questions: Vec<Question>,
    #[serde(skip)]
    question_index: HashMap<QuestionId, usize>,
    #[serde(skip)]
    competency_index: HashMap<CompetencyId, usize>,
}

impl AssessmentDefinition {
    pub fn new(
        id: AssessmentId,
        title: impl Into<String>,
        sections: Vec<Section>,
        competencies: Vec<Competency>,
        questions: Vec<Question>,
    ) -> Result<Self, EngineError> {
        let mut section_ids = HashSet::new();
        for section in &sections {
            if !section_ids.insert(section.id.clone()) {
                return Err(EngineError::DuplicateSection(section.id.clone()));
            }
        }

        let mut competency_index = HashMap::new();
        for (idx, competency) in competencies.iter().enumerate() {
            if competency_index.insert(competency.id.clone(), idx).is_some() {
                return Err(EngineError::DuplicateCompetency(competency.id.clone()));
            }
        }

        let scale = match questions.first() {
            Some(question) => RatingScale::new(question.scale_max)?,
            None => RatingScale::default(),
        };

        let mut question_index = HashMap::new();
        for (idx, question) in questions.iter().enumerate() {
            if question.scale_max != scale.max() {
                RatingScale::new(question.scale_max)?;
                return Err(EngineError::MixedScales {
                    question: question.id.clone(),
                    expected: scale.max(),
                    found: question.scale_max,
                });
            }
            if !section_ids.contains(&question.section_id) {
                return Err(EngineError::UnknownSection {
                    question: question.id.clone(),
                    section: question.section_id.clone(),
                });
            }
            if let Some(missing) = question
                .competencies
                .iter()
                .find(|competency| !competency_index.contains_key(*competency))
            {
                return Err(EngineError::UnknownCompetency {
                    question: question.id.clone(),
                    competency: missing.clone(),
                });
            }
            if question_index.insert(question.id.clone(), idx).is_some() {
                return Err(EngineError::DuplicateQuestion(question.id.clone()));
            }
        }

        Ok(Self {
            id,
            title: title.into(),
            scale,
            sections,
            competencies,
            questions,
            question_index,
            competency_index,
        })
    }

    pub fn id(&self) -> &AssessmentId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn scale(&self) -> RatingScale {
        self.scale
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn competencies(&self) -> &[Competency] {
        &self.competencies
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.question_position(id).map(|idx| &self.questions[idx])
    }

    pub fn question_position(&self, id: &QuestionId) -> Option<usize> {
        self.question_index.get(id).copied()
    }

    pub fn competency(&self, id: &CompetencyId) -> Option<&Competency> {
        self.competency_position(id).map(|idx| &self.competencies[idx])
    }

    pub fn competency_position(&self, id: &CompetencyId) -> Option<usize> {
        self.competency_index.get(id).copied()
    }

    pub fn questions_in_section<'a>(
        &'a self,
        section: &'a SectionId,
    ) -> impl Iterator<Item = (usize, &'a Question)> + 'a {
        self.questions
            .iter()
            .enumerate()
            .filter(move |(_, question)| &question.section_id == section)
    }
}

impl TryFrom<DefinitionDocument> for AssessmentDefinition {
    type Error = EngineError;

    fn try_from(document: DefinitionDocument) -> Result<Self, Self::Error> {
        Self::new(
            document.id,
            document.title,
            document.sections,
            document.competencies,
            document.questions,
        )
    }
}
