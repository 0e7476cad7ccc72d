use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use eligibility_core::{BenefitLimit, CostSharing, Gender};

/// How a rule disposes of a requested service type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageIndicator {
    Covered,
    NotCovered,
    Limited,
    Excluded,
}

impl CoverageIndicator {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "covered" => Some(Self::Covered),
            "not_covered" => Some(Self::NotCovered),
            "limited" => Some(Self::Limited),
            "excluded" => Some(Self::Excluded),
            _ => None,
        }
    }

    /// Whether the member has usable coverage under this disposition
    pub fn grants_coverage(self) -> bool {
        matches!(self, Self::Covered | Self::Limited)
    }
}

/// One row of the rule set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityRule {
    pub rule_id: String,
    /// Display name, also used as the plan name on responses
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Plan bucket this rule belongs to; `"*"` applies to every plan
    pub plan_code: String,
    pub service_type_code: String,
    pub coverage: CoverageIndicator,
    #[serde(default)]
    pub prior_auth_required: bool,
    #[serde(default)]
    pub referral_required: bool,
    #[serde(default)]
    pub in_network: CostSharing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of_network: Option<CostSharing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<BenefitLimit>,
    /// Inclusive age restriction in years at the service date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u8>,
    /// Restriction set; `None` admits every gender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genders: Option<Vec<Gender>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_end: Option<NaiveDate>,
    /// Lower value wins
    pub priority: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl EligibilityRule {
    pub const WILDCARD_PLAN: &'static str = "*";

    /// Whether the rule's effective window overlaps the inclusive service
    /// period
    pub fn effective_on(&self, period_start: NaiveDate, period_end: NaiveDate) -> bool {
        if let Some(from) = self.effective_start {
            if period_end < from {
                return false;
            }
        }
        if let Some(to) = self.effective_end {
            if period_start > to {
                return false;
            }
        }
        true
    }

    /// Age restriction check. An unknown age always passes.
    pub fn admits_age(&self, age: Option<u8>) -> bool {
        let Some(age) = age else {
            return true;
        };
        if let Some(min) = self.min_age {
            if age < min {
                return false;
            }
        }
        if let Some(max) = self.max_age {
            if age > max {
                return false;
            }
        }
        true
    }

    /// Gender restriction check. An unknown gender always passes.
    pub fn admits_gender(&self, gender: Option<Gender>) -> bool {
        match (&self.genders, gender) {
            (Some(set), Some(gender)) => set.contains(&gender),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bare_rule() -> EligibilityRule {
        EligibilityRule {
            rule_id: "R1".into(),
            name: "Test Plan".into(),
            description: None,
            plan_code: "PPO_GOLD".into(),
            service_type_code: "30".into(),
            coverage: CoverageIndicator::Covered,
            prior_auth_required: false,
            referral_required: false,
            in_network: CostSharing::default(),
            out_of_network: None,
            limit: None,
            min_age: None,
            max_age: None,
            genders: None,
            effective_start: None,
            effective_end: None,
            priority: 100,
            active: true,
        }
    }

    #[test]
    fn effective_window_is_inclusive_and_overlap_based() {
        let mut rule = bare_rule();
        rule.effective_start = Some(date(2024, 1, 1));
        rule.effective_end = Some(date(2024, 12, 31));

        assert!(rule.effective_on(date(2024, 1, 1), date(2024, 1, 1)));
        assert!(rule.effective_on(date(2024, 12, 31), date(2024, 12, 31)));
        assert!(rule.effective_on(date(2023, 12, 1), date(2024, 1, 15)));
        assert!(!rule.effective_on(date(2023, 1, 1), date(2023, 12, 31)));
        assert!(!rule.effective_on(date(2025, 1, 1), date(2025, 1, 2)));
    }

    #[test]
    fn unbounded_window_admits_any_date() {
        let rule = bare_rule();
        assert!(rule.effective_on(date(1999, 1, 1), date(2099, 1, 1)));
    }

    #[test]
    fn age_restriction_admits_unknown_age() {
        let mut rule = bare_rule();
        rule.min_age = Some(18);
        rule.max_age = Some(64);

        assert!(rule.admits_age(None));
        assert!(rule.admits_age(Some(18)));
        assert!(rule.admits_age(Some(64)));
        assert!(!rule.admits_age(Some(17)));
        assert!(!rule.admits_age(Some(65)));
    }

    #[test]
    fn gender_restriction_admits_unknown_gender() {
        let mut rule = bare_rule();
        rule.genders = Some(vec![Gender::Female]);

        assert!(rule.admits_gender(None));
        assert!(rule.admits_gender(Some(Gender::Female)));
        assert!(!rule.admits_gender(Some(Gender::Male)));
    }

    #[test]
    fn coverage_token_parsing() {
        assert_eq!(
            CoverageIndicator::parse("covered"),
            Some(CoverageIndicator::Covered)
        );
        assert_eq!(
            CoverageIndicator::parse("not_covered"),
            Some(CoverageIndicator::NotCovered)
        );
        assert_eq!(CoverageIndicator::parse("sometimes"), None);
        assert!(CoverageIndicator::Limited.grants_coverage());
        assert!(!CoverageIndicator::Excluded.grants_coverage());
    }
}
