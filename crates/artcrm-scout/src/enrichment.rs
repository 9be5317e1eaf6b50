//! Model-assisted categorization of lead candidates.
//!
//! The model is asked for a venue subtype and a fit score in a line-oriented
//! format. Parsing is lenient: unrecognized lines are ignored and a failed
//! call leaves the candidate untouched.

use std::sync::LazyLock;

use artcrm_core::ModelBackend;
use regex::Regex;

use crate::model::LanguageModel;
use crate::types::{ConfidenceScore, LeadCandidate};

pub const ENRICHMENT_MAX_TOKENS: u32 = 500;

/// Subtypes the prompt offers. Replies outside this list are still accepted.
pub const SUBTYPE_VOCABULARY: [&str; 10] = [
    "upscale",
    "hippy",
    "commercial",
    "alternative",
    "contemporary",
    "traditional",
    "corporate",
    "indie",
    "boutique",
    "chain",
];

static SIGNED_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").expect("valid regex"));

/// Fields recognized in a model reply. `None` means the model gave no usable value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReply {
    pub subtype: Option<String>,
    pub fit_score: Option<ConfidenceScore>,
    pub confidence: Option<ConfidenceScore>,
    pub reasoning: Option<String>,
}

#[must_use]
pub fn build_prompt(candidate: &LeadCandidate) -> String {
    let mut context = vec![
        format!("Business name: {}", candidate.name),
        format!("Type: {}", candidate.category),
        format!("City: {}", candidate.city.as_deref().unwrap_or("unknown")),
    ];
    if let Some(website) = &candidate.website {
        context.push(format!("Website: {website}"));
    }
    if let Some(address) = &candidate.address {
        context.push(format!("Address: {address}"));
    }
    let context = context.join("\n");
    let vocabulary = SUBTYPE_VOCABULARY.join(", ");

    format!(
        "Analyze this business and provide categorization.

{context}

Based on the name, location, and any available details, determine:
1. SUBTYPE: What kind of venue is this? Options: {vocabulary}
2. FIT_SCORE: How well does this venue fit an artist showing paintings (watercolor, oil, acrylic, landscapes, cityscapes)? Score 0-100.
3. CONFIDENCE: How confident are you in this assessment? 0-100

Format as:
SUBTYPE: [your answer]
FIT_SCORE: [0-100]
CONFIDENCE: [0-100]
REASONING: [1-2 sentences]"
    )
}

/// Scans `reply` line by line for the `SUBTYPE`, `FIT_SCORE`, `CONFIDENCE`
/// and `REASONING` prefixes. Later lines win over earlier ones.
#[must_use]
pub fn parse_reply(reply: &str) -> EnrichmentReply {
    let mut parsed = EnrichmentReply::default();
    for line in reply.lines() {
        let line = line.trim_start();
        if let Some(value) = strip_label(line, "SUBTYPE:") {
            let subtype = value.trim().to_lowercase();
            parsed.subtype = (!subtype.is_empty() && subtype != "unknown").then_some(subtype);
        } else if let Some(value) = strip_label(line, "FIT_SCORE:") {
            parsed.fit_score = parse_score(value);
        } else if let Some(value) = strip_label(line, "CONFIDENCE:") {
            parsed.confidence = parse_score(value);
        } else if let Some(value) = strip_label(line, "REASONING:") {
            let reasoning = value.trim();
            parsed.reasoning = (!reasoning.is_empty()).then(|| reasoning.to_string());
        }
    }
    parsed
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    head.eq_ignore_ascii_case(label)
        .then(|| &line[label.len()..])
}

/// First integer in `value`, clamped to 0..=100. Runs too long for `i64`
/// clamp by sign.
fn parse_score(value: &str) -> Option<ConfidenceScore> {
    let digits = SIGNED_INTEGER.find(value)?.as_str();
    let number = digits.parse::<i64>().unwrap_or_else(|_| {
        if digits.starts_with('-') {
            i64::MIN
        } else {
            i64::MAX
        }
    });
    Some(ConfidenceScore::new(number))
}

/// Asks `model` to categorize `candidate` and folds the reply in.
///
/// Never fails: a backend error is logged and the candidate is returned
/// unchanged.
pub async fn enrich<M: LanguageModel>(
    mut candidate: LeadCandidate,
    model: &M,
    backend: ModelBackend,
) -> LeadCandidate {
    let prompt = build_prompt(&candidate);
    let reply = match model
        .generate(backend, &prompt, None, ENRICHMENT_MAX_TOKENS)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(
                name = %candidate.name,
                backend = %backend,
                error = %e,
                "enrichment failed; keeping candidate as discovered"
            );
            return candidate;
        }
    };

    let parsed = parse_reply(&reply);
    if let Some(subtype) = parsed.subtype {
        candidate.subtype = Some(subtype);
    }
    if let Some(fit_score) = parsed.fit_score {
        candidate.confidence_score = fit_score;
    }
    if parsed.reasoning.is_some() {
        candidate.reasoning = parsed.reasoning;
    }

    tracing::debug!(
        name = %candidate.name,
        subtype = ?candidate.subtype,
        confidence = %candidate.confidence_score,
        model_confidence = ?parsed.confidence.map(ConfidenceScore::get),
        "enriched candidate"
    );
    candidate
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use artcrm_core::Category;

    use super::*;
    use crate::error::ModelError;
    use crate::types::{SearchQuery, SourceKind};

    struct CannedModel {
        reply: Result<String, u16>,
        prompts: Mutex<Vec<(String, u32)>>,
    }

    impl CannedModel {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(503),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl LanguageModel for CannedModel {
        async fn generate(
            &self,
            _backend: ModelBackend,
            prompt: &str,
            _system: Option<&str>,
            max_tokens: u32,
        ) -> Result<String, ModelError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_tokens));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(ModelError::Status {
                    backend: "canned",
                    status: *status,
                    body: "unavailable".to_string(),
                }),
            }
        }
    }

    fn candidate() -> LeadCandidate {
        let query = SearchQuery {
            city: "Dresden".to_string(),
            country: "DE".to_string(),
            category: Category::Gallery,
            radius_km: 10.0,
        };
        LeadCandidate::new(Some("Galerie Ost"), &query, SourceKind::GooglePlaces)
    }

    #[test]
    fn parses_well_formed_reply() {
        let parsed = parse_reply(
            "SUBTYPE: Contemporary\nFIT_SCORE: 82\nCONFIDENCE: 60\nREASONING: Shows local painters.",
        );
        assert_eq!(parsed.subtype.as_deref(), Some("contemporary"));
        assert_eq!(parsed.fit_score, Some(ConfidenceScore::new(82)));
        assert_eq!(parsed.confidence, Some(ConfidenceScore::new(60)));
        assert_eq!(parsed.reasoning.as_deref(), Some("Shows local painters."));
    }

    #[test]
    fn labels_are_case_insensitive_and_indented() {
        let parsed = parse_reply("  subtype: indie\n\tFit_Score: 40/100");
        assert_eq!(parsed.subtype.as_deref(), Some("indie"));
        assert_eq!(parsed.fit_score, Some(ConfidenceScore::new(40)));
    }

    #[test]
    fn fit_score_is_clamped() {
        assert_eq!(parse_reply("FIT_SCORE: 150").fit_score, Some(ConfidenceScore::MAX));
        assert_eq!(parse_reply("FIT_SCORE: -10").fit_score, Some(ConfidenceScore::MIN));
    }

    #[test]
    fn overflowing_fit_score_clamps_by_sign() {
        let huge = "9".repeat(40);
        assert_eq!(
            parse_reply(&format!("FIT_SCORE: {huge}")).fit_score,
            Some(ConfidenceScore::MAX)
        );
        assert_eq!(
            parse_reply(&format!("FIT_SCORE: -{huge}")).fit_score,
            Some(ConfidenceScore::MIN)
        );
    }

    #[test]
    fn fit_score_without_digits_is_ignored() {
        assert_eq!(parse_reply("FIT_SCORE: high").fit_score, None);
    }

    #[test]
    fn unknown_or_empty_subtype_is_no_opinion() {
        assert_eq!(parse_reply("SUBTYPE: Unknown").subtype, None);
        assert_eq!(parse_reply("SUBTYPE:   ").subtype, None);
    }

    #[test]
    fn off_vocabulary_subtype_is_kept() {
        assert_eq!(
            parse_reply("SUBTYPE: Artist-Run").subtype.as_deref(),
            Some("artist-run")
        );
    }

    #[test]
    fn prompt_mentions_optional_fields_only_when_present() {
        let mut c = candidate();
        assert!(!build_prompt(&c).contains("Website:"));
        c.website = Some("https://galerie-ost.de".to_string());
        c.address = Some("Hauptstr. 1".to_string());
        let prompt = build_prompt(&c);
        assert!(prompt.contains("Business name: Galerie Ost"));
        assert!(prompt.contains("Type: gallery"));
        assert!(prompt.contains("City: Dresden"));
        assert!(prompt.contains("Website: https://galerie-ost.de"));
        assert!(prompt.contains("Address: Hauptstr. 1"));
        assert!(prompt.contains("boutique, chain"));
    }

    #[tokio::test]
    async fn enrich_applies_subtype_and_score() {
        let model = CannedModel::replying("SUBTYPE: boutique\nFIT_SCORE: 150\nREASONING: Small.");
        let enriched = enrich(candidate(), &model, ModelBackend::DeepseekChat).await;
        assert_eq!(enriched.subtype.as_deref(), Some("boutique"));
        assert_eq!(enriched.confidence_score, ConfidenceScore::MAX);
        assert_eq!(enriched.reasoning.as_deref(), Some("Small."));

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, ENRICHMENT_MAX_TOKENS);
    }

    #[tokio::test]
    async fn enrich_keeps_candidate_on_backend_error() {
        let before = candidate();
        let after = enrich(before.clone(), &CannedModel::failing(), ModelBackend::Claude).await;
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn enrich_keeps_baseline_on_unparseable_reply() {
        let model = CannedModel::replying("I cannot tell.");
        let enriched = enrich(candidate(), &model, ModelBackend::Claude).await;
        assert_eq!(enriched.confidence_score.get(), 90);
        assert_eq!(enriched.subtype, None);
    }
}
