use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use botpsych::error::AppError;
use botpsych::screening::{
    CatalogSeed, Language, Question, QuestionIndex, ResponseSet, ScoringOutcome, ValidationError,
};
use clap::Args;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Question bank export (.json or .csv)
    #[arg(long)]
    pub(crate) catalog: PathBuf,
    /// JSON object mapping question ids to selected option indices
    #[arg(long)]
    pub(crate) responses: PathBuf,
    /// Language used for question text in the report (en or hi)
    #[arg(long, default_value = "en", value_parser = parse_language)]
    pub(crate) language: Language,
}

fn parse_language(raw: &str) -> Result<Language, String> {
    Language::parse(raw).ok_or_else(|| format!("unsupported language '{raw}' (expected en or hi)"))
}

pub(crate) fn run_score_report(args: ScoreArgs) -> Result<(), AppError> {
    let seed = CatalogSeed::from_path(&args.catalog)?;
    let responses = load_responses(&args.responses)?;
    let outcome = QuestionIndex::new(seed.questions()).score(&responses)?;

    print!("{}", render_report(seed.questions(), &outcome, args.language));
    Ok(())
}

fn load_responses(path: &Path) -> Result<ResponseSet, AppError> {
    let file = std::fs::File::open(path)?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|err| {
        AppError::from(ValidationError::Malformed(format!(
            "{}: {err}",
            path.display()
        )))
    })
}

pub(crate) fn render_report(
    questions: &[Question],
    outcome: &ScoringOutcome,
    language: Language,
) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "Screening score report");

    for response in &outcome.responses {
        let question = questions.iter().find(|q| q.id == response.question_id);
        let prompt = question
            .map(|q| q.text.get(language).as_str())
            .unwrap_or("(question removed)");
        let answer = question
            .and_then(|q| q.options.get(language).get(response.option_index))
            .map(String::as_str)
            .unwrap_or("?");
        let _ = writeln!(
            report,
            "- [{}] {}: {} ({} of {})",
            response.question_id,
            prompt,
            answer,
            response.score,
            question.map(Question::max_weight).unwrap_or(0.0)
        );
    }

    let percent = outcome
        .percent()
        .map(|value| format!("{value:.1}%"))
        .unwrap_or_else(|| "n/a".to_string());
    let _ = writeln!(
        report,
        "Total {} / {} ({}) -> {} ({})",
        outcome.total_score,
        outcome.max_score,
        percent,
        outcome.risk_level.label(),
        outcome.risk_level.color()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use botpsych::screening::{QuestionId, SeedFormat};

    const CSV: &str = "id,category,age_groups,question_en,question_hi,options_en,options_hi,weights\n\
1,Social,2-5,Responds to name?,नाम पर प्रतिक्रिया?,Always|Sometimes|Rarely|Never,हमेशा|कभी-कभी|शायद ही|कभी नहीं,0|1|2|3\n\
2,Play,2-5;6-12,Lines up toys?,खिलौने कतार में?,No|Sometimes|Often,नहीं|कभी-कभी|अक्सर,0|2|4\n";

    fn questions() -> Vec<Question> {
        CatalogSeed::from_reader(CSV.as_bytes(), SeedFormat::Csv)
            .expect("csv seed parses")
            .into_questions()
    }

    #[test]
    fn report_lists_each_answer_and_the_risk_band() {
        let questions = questions();
        let responses: ResponseSet = [(QuestionId(1), 2), (QuestionId(2), 1)].into_iter().collect();
        let outcome = QuestionIndex::new(&questions)
            .score(&responses)
            .expect("scores");

        let report = render_report(&questions, &outcome, Language::En);
        assert!(report.contains("- [1] Responds to name?: Rarely (2 of 3)"));
        assert!(report.contains("- [2] Lines up toys?: Sometimes (2 of 4)"));
        assert!(report.contains("Total 4 / 7 (57.1%) -> Moderate Risk (yellow)"));
    }

    #[test]
    fn report_renders_hindi_text() {
        let questions = questions();
        let responses: ResponseSet = [(QuestionId(2), 2)].into_iter().collect();
        let outcome = QuestionIndex::new(&questions)
            .score(&responses)
            .expect("scores");

        let report = render_report(&questions, &outcome, Language::Hi);
        assert!(report.contains("खिलौने कतार में?: अक्सर"));
        assert!(report.contains("High Risk (red)"));
    }

    #[test]
    fn empty_response_file_is_not_applicable() {
        let questions = questions();
        let outcome = QuestionIndex::new(&questions)
            .score(&ResponseSet::new())
            .expect("scores");

        let report = render_report(&questions, &outcome, Language::En);
        assert!(report.contains("Total 0 / 0 (n/a) -> N/A (gray)"));
    }
}
