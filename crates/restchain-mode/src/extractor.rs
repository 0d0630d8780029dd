//! Mode dashboard extractor
//!
//! Two dependent API calls joined together: the spaces API lists dashboard
//! groups for the organization, and the reports API lists dashboards per
//! space. Report runs, owners, charts and queries are separate extractions.

use restchain_core::{
    BasicCredential, Chain, ChainBuilder, ExecOptions, ExtractError, FailurePolicy, HttpTransport,
    JoinSpec, Record, Transport,
};

use crate::config::ModeConfig;
use crate::model::DashboardMetadata;

const SPACES_URL: &str = "https://app.mode.com/api/{organization}/spaces";
const SPACES_PATH: &str = "_embedded.spaces[*].[token,name,description]";

const REPORTS_URL: &str =
    "https://app.mode.com/api/{organization}/spaces/{dashboard_group_id}/reports";
const REPORTS_PATH: &str = "_embedded.reports[*].[token,name,description,created_at,updated_at]";

/// Build the spaces→reports chain for one organization.
pub fn build_chain(
    config: &ModeConfig,
    failure_policy: FailurePolicy,
) -> Result<Chain, ExtractError> {
    let seed = vec![Record::from_pairs([(
        "organization",
        config.organization.as_str(),
    )])?];

    let spaces = JoinSpec::new(
        SPACES_URL,
        SPACES_PATH,
        &[
            "dashboard_group_id",
            "dashboard_group",
            "dashboard_group_description",
        ],
    )?
    .param("filter", "all")?;

    // A space with no usable token means "no matches"; calling the reports
    // endpoint for it would be wasted work.
    let reports = JoinSpec::new(
        REPORTS_URL,
        REPORTS_PATH,
        &[
            "dashboard_id",
            "dashboard_name",
            "description",
            "report_created_at",
            "report_updated_at",
        ],
    )?
    .skip_if_absent(&["dashboard_group_id"]);

    log::debug!(
        "building spaces/reports chain for organization '{}'",
        config.organization
    );
    ChainBuilder::seed(seed)
        .join(spaces)
        .join(reports)
        .credential(BasicCredential {
            user: config.user_token.clone(),
            secret: config.password_token.clone(),
        })
        .failure_policy(failure_policy)
        .build()
}

/// Extracts core Mode dashboard metadata for one organization.
pub struct ModeDashboardExtractor<T: Transport = HttpTransport> {
    chain: Chain,
    transport: T,
}

impl ModeDashboardExtractor<HttpTransport> {
    pub fn new(config: &ModeConfig, failure_policy: FailurePolicy) -> anyhow::Result<Self> {
        Self::with_transport(config, HttpTransport::default(), failure_policy)
    }
}

impl<T: Transport> ModeDashboardExtractor<T> {
    pub fn with_transport(
        config: &ModeConfig,
        transport: T,
        failure_policy: FailurePolicy,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            chain: build_chain(config, failure_policy)?,
            transport,
        })
    }

    /// Lazily extract dashboards; each call re-runs the full chain.
    pub fn extract(
        &self,
        options: ExecOptions,
    ) -> impl Iterator<Item = anyhow::Result<DashboardMetadata>> + '_ {
        self.chain.execute(&self.transport, options).map(|result| {
            let record = result?;
            DashboardMetadata::from_record(&record)
        })
    }
}
