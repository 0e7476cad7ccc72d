use serde::{Deserialize, Serialize};

// Wire models for the FHIR resources this gateway exchanges. Unknown fields
// are tolerated: FHIR resources routinely carry meta, text and extensions
// this gateway has no interest in.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn from_code(system: &str, code: &str, display: Option<&str>) -> Self {
        Self {
            coding: vec![Coding {
                system: Some(system.to_string()),
                code: Some(code.to_string()),
                display: display.map(str::to_string),
            }],
            text: display.map(str::to_string),
        }
    }

    /// First coding's code, falling back to the concept's text
    pub fn first_code(&self) -> Option<&str> {
        self.coding
            .iter()
            .find_map(|coding| coding.code.as_deref())
            .or(self.text.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn new(resource_type: &str, id: &str) -> Self {
        Self {
            reference: Some(format!("{resource_type}/{id}")),
            display: None,
        }
    }

    /// Logical id portion of a `<Type>/<id>` reference
    pub fn id(&self) -> Option<&str> {
        let reference = self.reference.as_deref()?.trim();
        if reference.is_empty() {
            return None;
        }
        let id = reference.rsplit('/').next().unwrap_or(reference);
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Money {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl Money {
    pub fn usd(value: f64) -> Self {
        Self {
            value: Some(value),
            currency: Some("USD".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Period {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extension {
    pub url: String,
    #[serde(
        rename = "valueBoolean",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub value_boolean: Option<bool>,
    #[serde(
        rename = "valueString",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub value_string: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageEligibilityRequest {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub purpose: Vec<String>,
    pub patient: Reference,
    #[serde(
        rename = "servicedDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub serviced_date: Option<String>,
    #[serde(
        rename = "servicedPeriod",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub serviced_period: Option<Period>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    pub insurer: Reference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insurance: Vec<RequestInsurance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<RequestItem>,
    /// Contained resources, typically a `Patient` carrying demographics
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contained: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestInsurance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focal: Option<bool>,
    pub coverage: Reference,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CodeableConcept>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageEligibilityResponse {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    pub id: String,
    pub status: String,
    pub purpose: Vec<String>,
    pub patient: Reference,
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Reference>,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    pub insurer: Reference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insurance: Vec<ResponseInsurance>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseInsurance {
    pub coverage: Reference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inforce: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<ResponseItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub benefit: Vec<ItemBenefit>,
    #[serde(
        rename = "authorizationRequired",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub authorization_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemBenefit {
    #[serde(rename = "type")]
    pub benefit_type: CodeableConcept,
    #[serde(
        rename = "allowedMoney",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub allowed_money: Option<Money>,
    #[serde(
        rename = "allowedUnsignedInt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub allowed_unsigned_int: Option<u64>,
    #[serde(rename = "usedMoney", default, skip_serializing_if = "Option::is_none")]
    pub used_money: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcome {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    pub issue: Vec<OperationOutcomeIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcomeIssue {
    pub severity: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}
