use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Coverage-eligibility inquiry in canonical form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityRequest {
    /// Trace/control number echoed back in the response
    pub control_number: String,
    pub payer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_npi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    pub subscriber: Subscriber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependent: Option<Dependent>,
    /// Plan/group identifier when the inquiry carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_date: Option<ServiceDate>,
    #[serde(default)]
    pub service_type_codes: Vec<String>,
}

impl EligibilityRequest {
    /// Plan bucket used for rule resolution: explicit plan code, else payer id
    pub fn effective_plan_code(&self) -> &str {
        self.plan_code.as_deref().unwrap_or(&self.payer_id)
    }

    /// The person the inquiry is about: the dependent when present, else the
    /// subscriber
    pub fn subject_demographics(&self) -> (Option<NaiveDate>, Option<Gender>) {
        match &self.dependent {
            Some(dep) => (dep.date_of_birth, dep.gender),
            None => (self.subscriber.date_of_birth, self.subscriber.gender),
        }
    }
}

/// Member the coverage is issued to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub member_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

/// Covered family member an inquiry can be about instead of the subscriber
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependent {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

/// Administrative gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    pub fn from_wire_code(code: &str) -> Option<Self> {
        match code {
            "M" | "m" => Some(Self::Male),
            "F" | "f" => Some(Self::Female),
            "U" | "u" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Unknown => "U",
        }
    }
}

/// Date or inclusive date range the inquiry applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceDate {
    Single(NaiveDate),
    Range { start: NaiveDate, end: NaiveDate },
}

impl ServiceDate {
    pub fn start(&self) -> NaiveDate {
        match self {
            Self::Single(date) => *date,
            Self::Range { start, .. } => *start,
        }
    }

    pub fn end(&self) -> NaiveDate {
        match self {
            Self::Single(date) => *date,
            Self::Range { end, .. } => *end,
        }
    }

    /// Canonical ISO rendering used in fingerprints and audit events
    pub fn normalized(&self) -> String {
        match self {
            Self::Single(date) => date.format("%Y-%m-%d").to_string(),
            Self::Range { start, end } => {
                format!("{}/{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
            }
        }
    }
}

/// Coverage status of a member or a single benefit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    Active,
    Inactive,
    Terminated,
    Pending,
    Unknown,
}

impl CoverageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Terminated => "terminated",
            Self::Pending => "pending",
            Self::Unknown => "unknown",
        }
    }

    /// Permissiveness rank used when folding per-benefit statuses into an
    /// overall status. Higher admits more.
    fn rank(self) -> u8 {
        match self {
            Self::Active => 4,
            Self::Pending => 3,
            Self::Inactive => 2,
            Self::Terminated => 1,
            Self::Unknown => 0,
        }
    }

    /// Most permissive status in the set, `None` for an empty set
    pub fn most_permissive<I>(statuses: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        statuses.into_iter().max_by_key(|status| status.rank())
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Network side a benefit entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkIndicator {
    InNetwork,
    OutOfNetwork,
}

impl NetworkIndicator {
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::InNetwork => "Y",
            Self::OutOfNetwork => "N",
        }
    }

    pub fn from_wire_code(code: &str) -> Option<Self> {
        match code {
            "Y" => Some(Self::InNetwork),
            "N" => Some(Self::OutOfNetwork),
            _ => None,
        }
    }
}

/// Cost-sharing amounts for one network side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSharing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinsurance_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deductible: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deductible_remaining: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of_pocket_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of_pocket_remaining: Option<f64>,
}

impl CostSharing {
    pub fn is_empty(&self) -> bool {
        self.copay.is_none()
            && self.coinsurance_percent.is_none()
            && self.deductible.is_none()
            && self.deductible_remaining.is_none()
            && self.out_of_pocket_max.is_none()
            && self.out_of_pocket_remaining.is_none()
    }
}

/// Quantity or dollar limitation attached to a benefit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenefitLimit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_period: Option<LimitPeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_period: Option<LimitPeriod>,
}

impl BenefitLimit {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.amount.is_none()
    }
}

/// Period a limitation or cost-share figure applies over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitPeriod {
    Day,
    Week,
    Month,
    Year,
    Lifetime,
}

impl LimitPeriod {
    /// X12 time-period qualifier for this period
    pub fn qualifier(&self) -> &'static str {
        match self {
            Self::Day => "7",
            Self::Week => "35",
            Self::Month => "34",
            Self::Year => "23",
            Self::Lifetime => "32",
        }
    }

    pub fn from_qualifier(code: &str) -> Option<Self> {
        match code {
            "7" => Some(Self::Day),
            "35" => Some(Self::Week),
            "34" => Some(Self::Month),
            "23" | "22" | "21" => Some(Self::Year),
            "32" => Some(Self::Lifetime),
            _ => None,
        }
    }
}

/// One benefit line of a determination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benefit {
    pub service_type_code: String,
    pub category_name: String,
    pub status: CoverageStatus,
    /// Coverage is contractually excluded rather than merely inactive
    #[serde(default)]
    pub excluded: bool,
    pub network: NetworkIndicator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_sharing: Option<CostSharing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<BenefitLimit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

/// Descriptive plan fields echoed in responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDescription {
    pub plan_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_number: Option<String>,
}

/// Determination result in canonical form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResponse {
    /// Control number echoed from the inquiry
    pub control_number: String,
    /// Overall status, the most permissive across benefit lines
    pub status: CoverageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanDescription>,
    #[serde(default)]
    pub benefits: Vec<Benefit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_permissive_prefers_active() {
        let overall = CoverageStatus::most_permissive([
            CoverageStatus::Inactive,
            CoverageStatus::Active,
            CoverageStatus::Unknown,
        ]);
        assert_eq!(overall, Some(CoverageStatus::Active));
    }

    #[test]
    fn most_permissive_ranks_inactive_above_unknown() {
        let overall = CoverageStatus::most_permissive([
            CoverageStatus::Unknown,
            CoverageStatus::Inactive,
        ]);
        assert_eq!(overall, Some(CoverageStatus::Inactive));
    }

    #[test]
    fn most_permissive_of_empty_set_is_none() {
        assert_eq!(CoverageStatus::most_permissive([]), None);
    }

    #[test]
    fn gender_wire_codes_round_trip() {
        for gender in [Gender::Male, Gender::Female, Gender::Unknown] {
            assert_eq!(Gender::from_wire_code(gender.wire_code()), Some(gender));
        }
        assert_eq!(Gender::from_wire_code("X"), None);
    }

    #[test]
    fn service_date_normalizes_single_and_range() {
        let single = ServiceDate::Single(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(single.normalized(), "2024-01-15");

        let range = ServiceDate::Range {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        };
        assert_eq!(range.normalized(), "2024-01-01/2024-01-31");
        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(range.end(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn service_date_serde_is_untagged() {
        let single: ServiceDate = serde_json::from_str("\"2024-03-02\"").unwrap();
        assert_eq!(
            single,
            ServiceDate::Single(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap())
        );

        let range: ServiceDate =
            serde_json::from_str(r#"{"start":"2024-03-01","end":"2024-03-31"}"#).unwrap();
        assert_eq!(range.normalized(), "2024-03-01/2024-03-31");
    }

    #[test]
    fn coverage_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CoverageStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::from_str::<CoverageStatus>("\"terminated\"").unwrap(),
            CoverageStatus::Terminated
        );
    }

    #[test]
    fn effective_plan_code_falls_back_to_payer() {
        let mut request = EligibilityRequest {
            control_number: "1".into(),
            payer_id: "PAYER01".into(),
            payer_name: None,
            provider_npi: None,
            provider_name: None,
            subscriber: Subscriber {
                member_id: "M1".into(),
                first_name: None,
                last_name: None,
                date_of_birth: None,
                gender: None,
            },
            dependent: None,
            plan_code: None,
            service_date: None,
            service_type_codes: vec![],
        };
        assert_eq!(request.effective_plan_code(), "PAYER01");
        request.plan_code = Some("PPO_GOLD".into());
        assert_eq!(request.effective_plan_code(), "PPO_GOLD");
    }
}
