//! Free-text analysis detector.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::catalogue::{AnalysisModule, MethodCatalogue};
use crate::context::AnalysisContext;
use crate::dataset::TabularDataset;
use crate::error::Result;
use crate::profiler::{tokenize, DataType, DatasetCharacteristics, TextCorpusStats};
use crate::scoring::MethodAssessment;

use super::{assess_catalogue, Detector, DetectorServices};

/// Corpus statistics over every text column of a dataset, limited to the
/// rows the profile scanned.
///
/// Returns `None` when the profile has no text columns.
pub fn corpus_stats(
    dataset: &dyn TabularDataset,
    characteristics: &DatasetCharacteristics,
) -> Result<Option<TextCorpusStats>> {
    let text_fields: Vec<String> = characteristics
        .text_columns()
        .into_iter()
        .map(str::to_string)
        .collect();
    if text_fields.is_empty() {
        return Ok(None);
    }

    let mut documents = 0usize;
    let mut characters = 0usize;
    let mut tokens = 0usize;
    let mut vocabulary = HashSet::new();
    for field in &text_fields {
        for cell in dataset.column_values(field)?.take(characteristics.scanned_rows) {
            let Some(text) = cell.as_text() else {
                continue;
            };
            documents += 1;
            characters += text.chars().count();
            for token in tokenize(&text) {
                tokens += 1;
                vocabulary.insert(token);
            }
        }
    }

    let per_document = |total: usize| {
        if documents == 0 {
            0.0
        } else {
            total as f64 / documents as f64
        }
    };
    Ok(Some(TextCorpusStats {
        total_documents: documents,
        mean_length: per_document(characters),
        mean_word_count: per_document(tokens),
        vocabulary_size: vocabulary.len(),
        type_token_ratio: if tokens == 0 {
            0.0
        } else {
            vocabulary.len() as f64 / tokens as f64
        },
        text_fields,
    }))
}

/// Suggests sentiment, theme and content methods for free-text responses.
#[derive(Debug, Clone)]
pub struct QualitativeDetector {
    catalogue: Arc<MethodCatalogue>,
    services: DetectorServices,
}

impl Default for QualitativeDetector {
    fn default() -> Self {
        Self::new(DetectorServices::default())
    }
}

impl QualitativeDetector {
    pub fn new(services: DetectorServices) -> Self {
        Self {
            catalogue: Arc::new(MethodCatalogue::qualitative()),
            services,
        }
    }

    /// Why the corpus cannot support any qualitative method, if it cannot.
    fn corpus_gate(&self, ch: &DatasetCharacteristics) -> Option<String> {
        let min_length = self.services.policy.qualitative.min_mean_text_length;
        if !ch.has_text {
            return Some("no free-text columns detected".to_string());
        }
        let mean_length = ch.mean_text_length();
        if mean_length < min_length {
            return Some(format!(
                "mean text length {mean_length:.1} is below {min_length} characters"
            ));
        }
        None
    }

    fn decide(&self, method: &str, ch: &DatasetCharacteristics) -> MethodAssessment {
        let policy = &self.services.policy.qualitative;
        let documents = ch.text_document_count();

        match method {
            "sentiment_analysis" => {
                if documents >= policy.sentiment_confident_documents {
                    MethodAssessment::eligible(
                        method,
                        policy.sentiment_confident_score,
                        format!("{documents} respondents with free text support stable sentiment estimates"),
                    )
                } else {
                    MethodAssessment::eligible(
                        method,
                        policy.sentiment_score,
                        format!("free text present ({documents} respondents)"),
                    )
                }
            }
            "thematic_analysis" | "content_analysis" => {
                let min = policy.min_documents_for_themes;
                if documents < min {
                    MethodAssessment::ineligible(
                        method,
                        format!("corpus of {documents} documents (respondents with free text) is below the minimum of {min}"),
                    )
                } else {
                    let score = if method == "thematic_analysis" {
                        policy.thematic_score
                    } else {
                        policy.content_score
                    };
                    MethodAssessment::eligible(
                        method,
                        score,
                        format!("{documents} documents with mean length {:.0}", ch.mean_text_length()),
                    )
                }
            }
            "survey_analysis" => {
                let text_fields = ch.count(DataType::Text);
                let structured = ch.structured_columns().len();
                if structured == 0 {
                    MethodAssessment::ineligible(method, "no populated structured fields to relate the free text to")
                } else {
                    MethodAssessment::eligible(
                        method,
                        policy.survey_analysis_score,
                        format!("{text_fields} free-text fields alongside {structured} structured field(s)"),
                    )
                }
            }
            "keyword_extraction" => MethodAssessment::eligible(
                method,
                policy.keyword_score,
                format!("{documents} documents to mine for distinctive terms"),
            ),
            other => MethodAssessment::ineligible(other, "not assessed by the qualitative detector"),
        }
    }
}

impl Detector for QualitativeDetector {
    fn module(&self) -> AnalysisModule {
        AnalysisModule::Qualitative
    }

    fn get_method_requirements(&self) -> &MethodCatalogue {
        &self.catalogue
    }

    fn services(&self) -> &DetectorServices {
        &self.services
    }

    fn enrich(
        &self,
        dataset: &dyn TabularDataset,
        characteristics: &mut DatasetCharacteristics,
    ) -> Result<()> {
        characteristics.text_corpus = corpus_stats(dataset, characteristics)?;
        if let Some(corpus) = &characteristics.text_corpus {
            debug!(
                documents = corpus.total_documents,
                vocabulary = corpus.vocabulary_size,
                "Computed text corpus statistics"
            );
        }
        Ok(())
    }

    fn assess(
        &self,
        _dataset: &dyn TabularDataset,
        characteristics: &DatasetCharacteristics,
        _context: &AnalysisContext,
    ) -> Result<Vec<MethodAssessment>> {
        if let Some(reason) = self.corpus_gate(characteristics) {
            return Ok(self
                .catalogue
                .methods
                .iter()
                .map(|spec| MethodAssessment::ineligible(spec.name.as_str(), reason.clone()))
                .collect());
        }
        Ok(assess_catalogue(&self.catalogue, characteristics, |method| {
            self.decide(method, characteristics)
        }))
    }
}
