use chrono::{Datelike, NaiveDate};
use tracing::debug;

use eligibility_core::{
    service_type_name, Benefit, CostSharing, CoverageStatus, EligibilityRequest,
    EligibilityResponse, Gender, NetworkIndicator, PlanDescription,
};

use crate::rule::{CoverageIndicator, EligibilityRule};
use crate::store::RuleIndex;

/// Engine behavior toggles
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Report a member as active when no rule matched any requested code.
    /// Payers that would rather fail closed turn this off.
    pub unknown_defaults_to_active: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unknown_defaults_to_active: true,
        }
    }
}

/// Outcome of running one inquiry against a rule snapshot
#[derive(Debug, Clone)]
pub struct Determination {
    pub status: CoverageStatus,
    pub benefits: Vec<Benefit>,
    pub plan: Option<PlanDescription>,
    /// Requested codes no applicable rule was found for
    pub unmatched_codes: Vec<String>,
}

impl Determination {
    pub fn into_response(self, control_number: impl Into<String>) -> EligibilityResponse {
        EligibilityResponse {
            control_number: control_number.into(),
            status: self.status,
            plan: self.plan,
            benefits: self.benefits,
        }
    }
}

/// Age in whole years on a given day
fn age_on(date_of_birth: NaiveDate, on: NaiveDate) -> u8 {
    let mut years = on.year() - date_of_birth.year();
    if (on.month(), on.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    years.clamp(0, i32::from(u8::MAX)) as u8
}

fn first_applicable<'a>(
    candidates: &'a [EligibilityRule],
    period_start: NaiveDate,
    period_end: NaiveDate,
    age: Option<u8>,
    gender: Option<Gender>,
) -> Option<&'a EligibilityRule> {
    candidates.iter().find(|rule| {
        rule.active
            && rule.effective_on(period_start, period_end)
            && rule.admits_age(age)
            && rule.admits_gender(gender)
    })
}

fn pick_rule<'a>(
    index: &'a RuleIndex,
    plan_code: &str,
    code: &str,
    period_start: NaiveDate,
    period_end: NaiveDate,
    age: Option<u8>,
    gender: Option<Gender>,
) -> Option<&'a EligibilityRule> {
    let direct = first_applicable(
        index.candidates(plan_code, code),
        period_start,
        period_end,
        age,
        gender,
    );
    if direct.is_some() || plan_code == EligibilityRule::WILDCARD_PLAN {
        return direct;
    }
    first_applicable(
        index.candidates(EligibilityRule::WILDCARD_PLAN, code),
        period_start,
        period_end,
        age,
        gender,
    )
}

fn rule_benefit(code: &str, rule: &EligibilityRule, status: CoverageStatus) -> Benefit {
    let mut messages = Vec::new();
    if let Some(description) = &rule.description {
        messages.push(description.clone());
    }
    if rule.referral_required {
        messages.push("Referral required".to_string());
    }
    Benefit {
        service_type_code: code.to_string(),
        category_name: service_type_name(code),
        status,
        excluded: rule.coverage == CoverageIndicator::Excluded,
        network: NetworkIndicator::InNetwork,
        authorization_required: Some(rule.prior_auth_required),
        cost_sharing: Some(rule.in_network.clone()).filter(|sharing| !sharing.is_empty()),
        limit: rule.limit.clone().filter(|limit| !limit.is_empty()),
        messages,
    }
}

fn oon_benefit(
    code: &str,
    rule: &EligibilityRule,
    status: CoverageStatus,
    sharing: &CostSharing,
) -> Benefit {
    Benefit {
        service_type_code: code.to_string(),
        category_name: service_type_name(code),
        status,
        excluded: rule.coverage == CoverageIndicator::Excluded,
        network: NetworkIndicator::OutOfNetwork,
        authorization_required: Some(rule.prior_auth_required),
        cost_sharing: Some(sharing.clone()).filter(|sharing| !sharing.is_empty()),
        limit: None,
        messages: Vec::new(),
    }
}

fn unknown_benefit(code: &str) -> Benefit {
    Benefit {
        service_type_code: code.to_string(),
        category_name: service_type_name(code),
        status: CoverageStatus::Unknown,
        excluded: false,
        network: NetworkIndicator::InNetwork,
        authorization_required: None,
        cost_sharing: None,
        limit: None,
        messages: Vec::new(),
    }
}

/// Resolve an inquiry against a rule snapshot.
///
/// Each requested service-type code is resolved independently: the plan's
/// own bucket first, then the wildcard bucket; within a bucket the first
/// applicable rule in precedence order wins. The overall status is the most
/// permissive per-code status; an inquiry no rule matched at all reports
/// active or unknown per [`EngineConfig`].
pub fn determine(
    index: &RuleIndex,
    request: &EligibilityRequest,
    config: &EngineConfig,
    today: NaiveDate,
) -> Determination {
    let plan_code = request.effective_plan_code();
    let (period_start, period_end) = match request.service_date {
        Some(date) => (date.start(), date.end()),
        None => (today, today),
    };
    let (date_of_birth, gender) = request.subject_demographics();
    let age = date_of_birth.map(|dob| age_on(dob, period_start));

    let mut benefits = Vec::new();
    let mut statuses = Vec::new();
    let mut unmatched_codes = Vec::new();
    let mut plan_name: Option<String> = None;

    for code in &request.service_type_codes {
        match pick_rule(
            index,
            plan_code,
            code,
            period_start,
            period_end,
            age,
            gender,
        ) {
            Some(rule) => {
                let status = if rule.coverage.grants_coverage() {
                    CoverageStatus::Active
                } else {
                    CoverageStatus::Inactive
                };
                debug!(
                    code = %code,
                    rule_id = %rule.rule_id,
                    status = %status.as_str(),
                    "service type resolved"
                );
                statuses.push(status);
                if plan_name.is_none() {
                    plan_name = Some(rule.name.clone());
                }
                benefits.push(rule_benefit(code, rule, status));
                if let Some(sharing) = &rule.out_of_network {
                    benefits.push(oon_benefit(code, rule, status, sharing));
                }
            }
            None => {
                debug!(code = %code, plan = %plan_code, "no applicable rule");
                statuses.push(CoverageStatus::Unknown);
                unmatched_codes.push(code.clone());
                benefits.push(unknown_benefit(code));
            }
        }
    }

    let all_unknown = statuses
        .iter()
        .all(|status| *status == CoverageStatus::Unknown);
    let status = if all_unknown {
        if config.unknown_defaults_to_active {
            CoverageStatus::Active
        } else {
            CoverageStatus::Unknown
        }
    } else {
        CoverageStatus::most_permissive(statuses).unwrap_or(CoverageStatus::Unknown)
    };

    let plan = if request.plan_code.is_some() || plan_name.is_some() {
        Some(PlanDescription {
            plan_code: plan_code.to_string(),
            plan_name,
            group_number: None,
        })
    } else {
        None
    };

    Determination {
        status,
        benefits,
        plan,
        unmatched_codes,
    }
}
