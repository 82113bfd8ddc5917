use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::{CatalogError, QuestionCatalog};
use crate::screening::domain::{AgeGroup, Question, QuestionId, Translated};
use crate::screening::validation::{validate_question, ValidationError};

/// Encoding of a question bank export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedFormat {
    Json,
    Csv,
}

impl SeedFormat {
    /// Picks the format from the file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
        {
            Some(ext) if ext == "csv" => SeedFormat::Csv,
            _ => SeedFormat::Json,
        }
    }
}

#[derive(Debug)]
pub enum CatalogSeedError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
    Invalid(ValidationError),
    DuplicateQuestion(QuestionId),
    Catalog(CatalogError),
}

impl fmt::Display for CatalogSeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSeedError::Io(err) => write!(f, "failed to read question seed: {err}"),
            CatalogSeedError::Json(err) => write!(f, "invalid question seed JSON: {err}"),
            CatalogSeedError::Csv(err) => write!(f, "invalid question seed CSV: {err}"),
            CatalogSeedError::Invalid(err) => write!(f, "invalid question in seed: {err}"),
            CatalogSeedError::DuplicateQuestion(id) => {
                write!(f, "question {id} appears more than once in seed")
            }
            CatalogSeedError::Catalog(err) => write!(f, "could not store seeded question: {err}"),
        }
    }
}

impl std::error::Error for CatalogSeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogSeedError::Io(err) => Some(err),
            CatalogSeedError::Json(err) => Some(err),
            CatalogSeedError::Csv(err) => Some(err),
            CatalogSeedError::Invalid(err) => Some(err),
            CatalogSeedError::Catalog(err) => Some(err),
            CatalogSeedError::DuplicateQuestion(_) => None,
        }
    }
}

impl From<std::io::Error> for CatalogSeedError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for CatalogSeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<csv::Error> for CatalogSeedError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<ValidationError> for CatalogSeedError {
    fn from(err: ValidationError) -> Self {
        Self::Invalid(err)
    }
}

impl From<CatalogError> for CatalogSeedError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err)
    }
}

/// Validated question bank loaded from a JSON or CSV export.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSeed {
    questions: Vec<Question>,
}

impl CatalogSeed {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogSeedError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, SeedFormat::from_path(path))
    }

    pub fn from_reader<R: Read>(reader: R, format: SeedFormat) -> Result<Self, CatalogSeedError> {
        let questions = match format {
            SeedFormat::Json => serde_json::from_reader::<_, Vec<SeedEntry>>(reader)?
                .into_iter()
                .map(Question::from)
                .collect(),
            SeedFormat::Csv => parse_rows(reader)?,
        };

        let mut seen = BTreeSet::new();
        for question in &questions {
            validate_question(question)?;
            if !seen.insert(question.id) {
                return Err(CatalogSeedError::DuplicateQuestion(question.id));
            }
        }

        Ok(Self { questions })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Inserts every seeded question, returning how many were stored.
    pub fn load_into<C: QuestionCatalog + ?Sized>(
        &self,
        catalog: &C,
    ) -> Result<usize, CatalogSeedError> {
        for question in &self.questions {
            catalog.insert(question.clone())?;
        }
        Ok(self.questions.len())
    }
}

fn parse_rows<R: Read>(reader: R) -> Result<Vec<Question>, CatalogSeedError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut questions = Vec::new();

    for record in csv_reader.deserialize::<QuestionRow>() {
        let row = record?;
        let weights = row
            .weights
            .iter()
            .map(|raw| {
                raw.parse::<f64>().map_err(|_| {
                    ValidationError::Malformed(format!(
                        "question {} has non-numeric weight '{raw}'",
                        row.id
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        questions.push(Question {
            id: QuestionId(row.id),
            category: row.category,
            age_groups: row.age_groups.into_iter().map(AgeGroup::new).collect(),
            text: Translated {
                en: row.question_en,
                hi: row.question_hi,
            },
            options: Translated {
                en: row.options_en,
                hi: row.options_hi,
            },
            weights,
        });
    }

    Ok(questions)
}

/// JSON seeds hold either the current question shape or the older flat export
/// (`questionId`, `question_en`, `weightage`, ...).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedEntry {
    Current(Question),
    Legacy(LegacyQuestion),
}

impl From<SeedEntry> for Question {
    fn from(entry: SeedEntry) -> Self {
        match entry {
            SeedEntry::Current(question) => question,
            SeedEntry::Legacy(legacy) => legacy.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LegacyQuestion {
    #[serde(rename = "questionId")]
    question_id: u32,
    category: String,
    #[serde(rename = "ageGroup")]
    age_group: Vec<String>,
    question_en: String,
    question_hi: String,
    options_en: Vec<String>,
    options_hi: Vec<String>,
    weightage: Vec<f64>,
}

impl From<LegacyQuestion> for Question {
    fn from(legacy: LegacyQuestion) -> Self {
        Question {
            id: QuestionId(legacy.question_id),
            category: legacy.category,
            age_groups: legacy.age_group.into_iter().map(AgeGroup::new).collect(),
            text: Translated {
                en: legacy.question_en,
                hi: legacy.question_hi,
            },
            options: Translated {
                en: legacy.options_en,
                hi: legacy.options_hi,
            },
            weights: legacy.weightage,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuestionRow {
    id: u32,
    category: String,
    #[serde(deserialize_with = "semicolon_list")]
    age_groups: Vec<String>,
    question_en: String,
    question_hi: String,
    #[serde(deserialize_with = "pipe_list")]
    options_en: Vec<String>,
    #[serde(deserialize_with = "pipe_list")]
    options_hi: Vec<String>,
    #[serde(deserialize_with = "pipe_list")]
    weights: Vec<String>,
}

fn split_cell<'de, D>(deserializer: D, separator: char) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    // Interior blanks are kept so validation can reject them.
    Ok(raw
        .split(separator)
        .map(|value| value.trim().to_string())
        .collect())
}

fn pipe_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    split_cell(deserializer, '|')
}

fn semicolon_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    split_cell(deserializer, ';')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const CSV_SEED: &str = "id,category,age_groups,question_en,question_hi,options_en,options_hi,weights\n\
1,Social Communication,2-5;6-12,Does your child respond to their name?,क्या आपका बच्चा अपने नाम पर प्रतिक्रिया देता है?,Always|Sometimes|Rarely|Never,हमेशा|कभी-कभी|शायद ही कभी|कभी नहीं,0|1|2|3\n\
2,Repetitive Behaviour,adult,Do you prefer fixed routines?,क्या आप निश्चित दिनचर्या पसंद करते हैं?,No|Somewhat|Yes,नहीं|कुछ हद तक|हाँ,0|2|4\n";

    #[test]
    fn parses_csv_rows_into_questions() {
        let seed = CatalogSeed::from_reader(Cursor::new(CSV_SEED), SeedFormat::Csv)
            .expect("seed parses");

        assert_eq!(seed.len(), 2);
        let first = &seed.questions()[0];
        assert_eq!(first.id, QuestionId(1));
        assert_eq!(first.weights, vec![0.0, 1.0, 2.0, 3.0]);
        assert!(first.applies_to(&AgeGroup::new("6-12")));
        assert_eq!(first.options.hi.len(), 4);
        assert_eq!(seed.questions()[1].max_weight(), 4.0);
    }

    #[test]
    fn parses_json_exports() {
        let json = r#"[{
            "id": 7,
            "category": "Sensory",
            "ageGroups": ["adult"],
            "text": { "en": "Are loud sounds distressing?", "hi": "क्या तेज़ आवाज़ें परेशान करती हैं?" },
            "options": { "en": ["No", "Yes"], "hi": ["नहीं", "हाँ"] },
            "weights": [0, 1]
        }]"#;

        let seed = CatalogSeed::from_reader(Cursor::new(json), SeedFormat::Json)
            .expect("seed parses");
        assert_eq!(seed.questions()[0].id, QuestionId(7));
        assert_eq!(seed.questions()[0].max_weight(), 1.0);
    }

    #[test]
    fn rejects_option_and_weight_mismatch() {
        let csv = "id,category,age_groups,question_en,question_hi,options_en,options_hi,weights\n\
3,Sensory,adult,Q,प्र,Yes|No,हाँ|नहीं,0|1|2\n";

        match CatalogSeed::from_reader(Cursor::new(csv), SeedFormat::Csv) {
            Err(CatalogSeedError::Invalid(ValidationError::OptionCountMismatch {
                question, ..
            })) => assert_eq!(question, QuestionId(3)),
            other => panic!("expected option mismatch, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let csv = "id,category,age_groups,question_en,question_hi,options_en,options_hi,weights\n\
4,Sensory,adult,Q,प्र,Yes|No,हाँ|नहीं,0|1\n\
4,Sensory,adult,Q,प्र,Yes|No,हाँ|नहीं,0|1\n";

        assert!(matches!(
            CatalogSeed::from_reader(Cursor::new(csv), SeedFormat::Csv),
            Err(CatalogSeedError::DuplicateQuestion(QuestionId(4)))
        ));
    }

    #[test]
    fn rejects_non_numeric_weights() {
        let csv = "id,category,age_groups,question_en,question_hi,options_en,options_hi,weights\n\
5,Sensory,adult,Q,प्र,Yes|No,हाँ|नहीं,0|high\n";

        assert!(matches!(
            CatalogSeed::from_reader(Cursor::new(csv), SeedFormat::Csv),
            Err(CatalogSeedError::Invalid(ValidationError::Malformed(_)))
        ));
    }

    #[test]
    fn blank_cells_inside_a_list_are_rejected() {
        let csv = "id,category,age_groups,question_en,question_hi,options_en,options_hi,weights\n\
6,Sensory,adult,Q,प्र,A||B,क||ख,0|1|2\n";

        match CatalogSeed::from_reader(Cursor::new(csv), SeedFormat::Csv) {
            Err(CatalogSeedError::Invalid(ValidationError::BlankOption { question, .. })) => {
                assert_eq!(question, QuestionId(6))
            }
            other => panic!("expected blank option rejection, got {other:?}"),
        }

        let csv = "id,category,age_groups,question_en,question_hi,options_en,options_hi,weights\n\
7,Sensory,adult,Q,प्र,A|B,क|ख,0||1\n";
        assert!(matches!(
            CatalogSeed::from_reader(Cursor::new(csv), SeedFormat::Csv),
            Err(CatalogSeedError::Invalid(ValidationError::Malformed(_)))
        ));
    }

    #[test]
    fn trailing_age_group_separator_is_rejected() {
        let csv = "id,category,age_groups,question_en,question_hi,options_en,options_hi,weights\n\
8,Sensory,2-5;,Q,प्र,A|B,क|ख,0|1\n";

        assert!(matches!(
            CatalogSeed::from_reader(Cursor::new(csv), SeedFormat::Csv),
            Err(CatalogSeedError::Invalid(ValidationError::MissingField("ageGroups")))
        ));
    }

    #[test]
    fn parses_legacy_json_exports() {
        let json = r#"[
            {
                "_id": "65f1c0a9e4b0a1b2c3d4e5f6",
                "questionId": 11,
                "question_en": "Does your child point to show interest?",
                "question_hi": "क्या आपका बच्चा रुचि दिखाने के लिए इशारा करता है?",
                "options_en": ["Often", "Rarely", "Never"],
                "options_hi": ["अक्सर", "शायद ही कभी", "कभी नहीं"],
                "weightage": [0, 1, 2],
                "ageGroup": ["2-5"],
                "category": "Social Communication",
                "__v": 0
            },
            {
                "id": 12,
                "category": "Sensory",
                "ageGroups": ["adult"],
                "text": { "en": "Are labels on clothing irritating?", "hi": "क्या कपड़ों के लेबल परेशान करते हैं?" },
                "options": { "en": ["No", "Yes"], "hi": ["नहीं", "हाँ"] },
                "weights": [0, 1]
            }
        ]"#;

        let seed = CatalogSeed::from_reader(Cursor::new(json), SeedFormat::Json)
            .expect("mixed seed parses");
        assert_eq!(seed.len(), 2);

        let legacy = &seed.questions()[0];
        assert_eq!(legacy.id, QuestionId(11));
        assert_eq!(legacy.weights, vec![0.0, 1.0, 2.0]);
        assert_eq!(legacy.options.hi[2], "कभी नहीं");
        assert!(legacy.applies_to(&AgeGroup::new("2-5")));
        assert_eq!(seed.questions()[1].id, QuestionId(12));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(SeedFormat::from_path(Path::new("questions.CSV")), SeedFormat::Csv);
        assert_eq!(SeedFormat::from_path(Path::new("questions.json")), SeedFormat::Json);
        assert_eq!(SeedFormat::from_path(Path::new("questions")), SeedFormat::Json);
    }
}
