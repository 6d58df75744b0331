//! Sequential QC pipeline.

use chrono::Utc;
use tracing::{debug, info};
use trailer_models::{Locale, QcReport, SafetyResult, SceneScript, StyleBible};

use crate::consistency::ConsistencyChecker;
use crate::rules::{LocaleTypography, QcRules};
use crate::safety::SafetyGate;
use crate::scoring::{QcDecision, Scorer};
use crate::typography::TypographyValidator;

/// Safety → Typography → Consistency → Scoring.
#[derive(Debug, Clone)]
pub struct QcPipeline {
    version: String,
    safety: SafetyGate,
    typography: TypographyValidator,
    consistency: ConsistencyChecker,
    scorer: Scorer,
}

impl Default for QcPipeline {
    fn default() -> Self {
        Self::new(QcRules::default())
    }
}

impl QcPipeline {
    pub fn new(rules: QcRules) -> Self {
        Self {
            version: rules.version,
            safety: SafetyGate::new(rules.safety),
            typography: TypographyValidator::new(rules.typography),
            consistency: ConsistencyChecker::new(rules.consistency),
            scorer: Scorer::new(rules.scoring),
        }
    }

    pub fn rules_version(&self) -> &str {
        &self.version
    }

    /// Run every gate over a set of scripts.
    ///
    /// A failed safety gate leaves typography and consistency unevaluated.
    pub fn evaluate(&self, scripts: &[SceneScript], style: &StyleBible, locale: Locale) -> QcReport {
        let safety = self.safety.check(scripts, locale);

        if !safety.status.is_pass() {
            info!(
                violations = safety.violations.len(),
                "Safety gate failed, skipping remaining QC gates"
            );
            let scoring = self.scorer.score(&safety, None, None);
            return QcReport {
                safety,
                typography: None,
                consistency: None,
                scoring,
                evaluated_at: Utc::now(),
            };
        }

        let typography = self.typography.validate(scripts, &style.typography, locale);
        let consistency = self.consistency.check(scripts, style);
        let scoring = self.scorer.score(&safety, Some(&typography), Some(&consistency));

        debug!(
            typography = typography.score,
            consistency = consistency.score,
            overall = scoring.overall_score,
            passed = scoring.status.is_pass(),
            "QC pipeline evaluated"
        );

        QcReport {
            safety,
            typography: Some(typography),
            consistency: Some(consistency),
            scoring,
            evaluated_at: Utc::now(),
        }
    }

    /// Safety gate alone, for scripts regenerated after media has started.
    pub fn check_safety(&self, scripts: &[SceneScript], locale: Locale) -> SafetyResult {
        self.safety.check(scripts, locale)
    }

    pub fn should_retry(&self, report: &QcReport, retry_count: u32) -> QcDecision {
        self.scorer.should_retry(report, retry_count)
    }

    pub fn max_retries(&self) -> u32 {
        self.scorer.max_retries()
    }

    /// Subtitle line limits scripts are written against.
    pub fn typography_limits(&self, locale: Locale) -> &LocaleTypography {
        self.typography.limits(locale)
    }
}
