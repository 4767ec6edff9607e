//! One calculation-and-request cycle
//!
//! PROFILE → LOCAL ESTIMATE → AGENT → PARSE → RECONCILE → REPORT
//!
//! The local estimate is the figure shown to the user. The agent explains
//! it and suggests products; its own figure is kept for comparison.

use crate::agent::InsuranceAgent;
use crate::audit::{profile_fingerprint, short_fingerprint};
use crate::config::{AdvisorConfig, Credentials};
use crate::coverage::calculate_coverage_at;
use crate::error::AdvisorError;
use crate::llm::OpenAiClient;
use crate::models::{AdvisorReport, AgentRequest, CoverageBreakdown, FinancialProfile};
use crate::recommendation::{parse_recommendation, reconcile};
use crate::tools::create_default_registry;
use crate::Result;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

pub const RECOMMENDATION_UNAVAILABLE: &str = "Recommendation unavailable, please retry.";

pub struct Advisor {
    agent: InsuranceAgent,
    discount_rate: f64,
    divergence_tolerance: f64,
}

impl Advisor {
    pub fn new(agent: InsuranceAgent, config: &AdvisorConfig) -> Self {
        Self {
            agent,
            discount_rate: config.discount_rate,
            divergence_tolerance: config.divergence_tolerance,
        }
    }

    /// Wire the OpenAI model and the default tools with one session's keys.
    pub fn with_credentials(config: &AdvisorConfig, credentials: Credentials) -> Result<Self> {
        let http = config.http_client()?;
        let tools = create_default_registry(http.clone(), &credentials, config);
        let model = OpenAiClient::new(http, credentials.openai_api_key, config);

        info!(model = %model.model(), tools = ?tools.list(), "Advisor initialized");

        let agent = InsuranceAgent::new(Box::new(model), tools, config.max_tool_rounds);
        Ok(Self::new(agent, config))
    }

    /// Local estimate only.
    pub fn estimate(&self, profile: &FinancialProfile) -> Result<CoverageBreakdown> {
        calculate_coverage_at(profile, self.discount_rate)
    }

    /// Full cycle. Only calculator errors propagate; anything that goes
    /// wrong with the agent degrades to a local-only report.
    pub async fn advise(&self, profile: &FinancialProfile) -> Result<AdvisorReport> {
        let fingerprint = profile_fingerprint(profile);
        let breakdown = self.estimate(profile)?;

        info!(
            profile = %short_fingerprint(&fingerprint),
            years = profile.income_replacement_years,
            "Local estimate computed"
        );

        let request = AgentRequest::from(profile);
        let recommendation = match self.agent.run(&request).await {
            Ok(outcome) => parse_recommendation(&outcome.content).map_err(AdvisorError::from),
            Err(e) => Err(e),
        };

        let (recommendation, agent_error) = match recommendation {
            Ok(rec) => (Some(rec), None),
            Err(e) => {
                warn!(
                    profile = %short_fingerprint(&fingerprint),
                    "Agent recommendation failed: {}",
                    e
                );
                (None, Some(RECOMMENDATION_UNAVAILABLE.to_string()))
            }
        };

        let reconciliation = reconcile(&breakdown, recommendation.as_ref(), self.divergence_tolerance);
        if !reconciliation.consistent {
            warn!(
                profile = %short_fingerprint(&fingerprint),
                divergence = ?reconciliation.divergence,
                "Agent figure diverges from local estimate"
            );
        }

        Ok(AdvisorReport {
            report_id: Uuid::new_v4(),
            profile_fingerprint: fingerprint,
            age: profile.age,
            location: profile.location.clone(),
            breakdown,
            recommendation,
            agent_error,
            reconciliation,
            generated_at: Utc::now(),
        })
    }
}
