use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use eligibility_core::{
    Benefit, EligibilityRequest, EligibilityResponse, Gender, LimitPeriod, NetworkIndicator,
    ServiceDate, Subscriber,
};

use crate::categories::{to_category, to_service_type, BENEFIT_CATEGORY_SYSTEM};
use crate::error::{FhirError, FhirResult};
use crate::resources::{
    CodeableConcept, CoverageEligibilityRequest, CoverageEligibilityResponse, Extension,
    ItemBenefit, Money, OperationOutcome, OperationOutcomeIssue, Reference, ResponseInsurance,
    ResponseItem,
};

pub const REQUEST_RESOURCE_TYPE: &str = "CoverageEligibilityRequest";
pub const RESPONSE_RESOURCE_TYPE: &str = "CoverageEligibilityResponse";

pub const BENEFIT_TYPE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/benefit-type";
pub const BENEFIT_NETWORK_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/benefit-network";
pub const BENEFIT_UNIT_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/benefit-unit";
pub const BENEFIT_TERM_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/benefit-term";
pub const SERVICE_TYPE_SYSTEM: &str = "https://x12.org/codes/service-type-codes";

/// Extension flagging a category code the closed table could not translate
pub const UNTRANSLATED_CATEGORY_EXTENSION: &str =
    "https://covergate.dev/fhir/StructureDefinition/untranslated-category";

/// A canonical inquiry plus the category codes that passed through the
/// translation table unrecognized
#[derive(Debug, Clone)]
pub struct MappedInquiry {
    pub request: EligibilityRequest,
    pub translation_misses: Vec<String>,
}

/// Deserialize a `CoverageEligibilityRequest`, rejecting other resource
/// types before any shape validation runs
pub fn parse_request(value: serde_json::Value) -> FhirResult<CoverageEligibilityRequest> {
    let resource_type = value
        .get("resourceType")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if resource_type != REQUEST_RESOURCE_TYPE {
        return Err(FhirError::UnsupportedResourceType {
            expected: REQUEST_RESOURCE_TYPE,
            found: resource_type.to_string(),
        });
    }
    serde_json::from_value(value).map_err(|err| FhirError::InvalidResource(err.to_string()))
}

fn parse_fhir_date(raw: &str) -> FhirResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| FhirError::InvalidResource(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

fn parse_fhir_gender(raw: &str) -> Gender {
    match raw {
        "male" => Gender::Male,
        "female" => Gender::Female,
        _ => Gender::Unknown,
    }
}

struct ContainedDemographics {
    first_name: Option<String>,
    last_name: Option<String>,
    date_of_birth: Option<NaiveDate>,
    gender: Option<Gender>,
}

fn contained_patient_demographics(contained: &[serde_json::Value]) -> ContainedDemographics {
    for resource in contained {
        if resource.get("resourceType").and_then(|v| v.as_str()) != Some("Patient") {
            continue;
        }
        let name = resource.get("name").and_then(|v| v.get(0));
        return ContainedDemographics {
            first_name: name
                .and_then(|n| n.get("given"))
                .and_then(|v| v.get(0))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            last_name: name
                .and_then(|n| n.get("family"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            date_of_birth: resource
                .get("birthDate")
                .and_then(|v| v.as_str())
                .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()),
            gender: resource
                .get("gender")
                .and_then(|v| v.as_str())
                .map(parse_fhir_gender),
        };
    }
    ContainedDemographics {
        first_name: None,
        last_name: None,
        date_of_birth: None,
        gender: None,
    }
}

/// Map a FHIR request resource to the canonical inquiry.
///
/// Benefit categories run through the closed translation table; codes the
/// table does not know pass through unchanged and are reported in
/// `translation_misses`.
pub fn map_request(wire: CoverageEligibilityRequest) -> FhirResult<MappedInquiry> {
    let member_id = wire
        .patient
        .id()
        .ok_or(FhirError::MissingField("patient.reference"))?
        .to_string();
    let payer_id = wire
        .insurer
        .id()
        .ok_or(FhirError::MissingField("insurer.reference"))?
        .to_string();

    let service_date = match (&wire.serviced_date, &wire.serviced_period) {
        (Some(raw), _) => Some(ServiceDate::Single(parse_fhir_date(raw)?)),
        (None, Some(period)) => match (&period.start, &period.end) {
            (Some(start), Some(end)) => Some(ServiceDate::Range {
                start: parse_fhir_date(start)?,
                end: parse_fhir_date(end)?,
            }),
            (Some(start), None) => Some(ServiceDate::Single(parse_fhir_date(start)?)),
            _ => None,
        },
        (None, None) => None,
    };

    let mut service_type_codes = Vec::new();
    let mut translation_misses = Vec::new();
    for item in &wire.item {
        if let Some(code) = item.category.as_ref().and_then(CodeableConcept::first_code) {
            let translation = to_service_type(code);
            if !translation.translated {
                translation_misses.push(code.to_string());
            }
            service_type_codes.push(translation.code);
        }
    }

    let demographics = contained_patient_demographics(&wire.contained);
    let control_number = wire
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let request = EligibilityRequest {
        control_number,
        payer_id,
        payer_name: wire.insurer.display.clone(),
        provider_npi: wire.provider.as_ref().and_then(|p| p.id()).map(str::to_string),
        provider_name: wire.provider.as_ref().and_then(|p| p.display.clone()),
        subscriber: Subscriber {
            member_id,
            first_name: demographics.first_name,
            last_name: demographics.last_name,
            date_of_birth: demographics.date_of_birth,
            gender: demographics.gender,
        },
        dependent: None,
        plan_code: wire
            .insurance
            .first()
            .and_then(|insurance| insurance.coverage.id())
            .map(str::to_string),
        service_date,
        service_type_codes,
    };

    Ok(MappedInquiry {
        request,
        translation_misses,
    })
}

fn term_code(period: LimitPeriod) -> &'static str {
    match period {
        LimitPeriod::Day => "day",
        LimitPeriod::Week => "week",
        LimitPeriod::Month => "month",
        LimitPeriod::Year => "annual",
        LimitPeriod::Lifetime => "lifetime",
    }
}

fn benefit_entry(code: &str) -> CodeableConcept {
    CodeableConcept::from_code(BENEFIT_TYPE_SYSTEM, code, None)
}

fn response_item(benefit: &Benefit) -> ResponseItem {
    let translation = to_category(&benefit.service_type_code);
    let category = if translation.translated {
        CodeableConcept::from_code(
            BENEFIT_CATEGORY_SYSTEM,
            &translation.code,
            Some(&benefit.category_name),
        )
    } else {
        CodeableConcept::from_code(
            SERVICE_TYPE_SYSTEM,
            &translation.code,
            Some(&benefit.category_name),
        )
    };
    let extension = if translation.translated {
        vec![]
    } else {
        vec![Extension {
            url: UNTRANSLATED_CATEGORY_EXTENSION.to_string(),
            value_boolean: Some(true),
            value_string: None,
        }]
    };

    let mut entries = Vec::new();
    if let Some(sharing) = &benefit.cost_sharing {
        if let Some(copay) = sharing.copay {
            entries.push(ItemBenefit {
                benefit_type: benefit_entry("copay"),
                allowed_money: Some(Money::usd(copay)),
                allowed_unsigned_int: None,
                used_money: None,
            });
        }
        if let Some(percent) = sharing.coinsurance_percent {
            entries.push(ItemBenefit {
                benefit_type: benefit_entry("copay-percent"),
                allowed_money: None,
                allowed_unsigned_int: Some(percent.round() as u64),
                used_money: None,
            });
        }
        if let Some(deductible) = sharing.deductible {
            let used = sharing
                .deductible_remaining
                .map(|remaining| Money::usd((deductible - remaining).max(0.0)));
            entries.push(ItemBenefit {
                benefit_type: benefit_entry("deductible"),
                allowed_money: Some(Money::usd(deductible)),
                allowed_unsigned_int: None,
                used_money: used,
            });
        }
        if let Some(maximum) = sharing.out_of_pocket_max {
            let used = sharing
                .out_of_pocket_remaining
                .map(|remaining| Money::usd((maximum - remaining).max(0.0)));
            entries.push(ItemBenefit {
                benefit_type: benefit_entry("out-of-pocket-maximum"),
                allowed_money: Some(Money::usd(maximum)),
                allowed_unsigned_int: None,
                used_money: used,
            });
        }
    }
    let mut term = None;
    if let Some(limit) = &benefit.limit {
        if let Some(amount) = limit.amount {
            entries.push(ItemBenefit {
                benefit_type: benefit_entry("benefit"),
                allowed_money: Some(Money::usd(amount)),
                allowed_unsigned_int: None,
                used_money: None,
            });
            term = limit.amount_period;
        }
        if let Some(quantity) = limit.quantity {
            entries.push(ItemBenefit {
                benefit_type: benefit_entry("visit"),
                allowed_money: None,
                allowed_unsigned_int: Some(quantity.round() as u64),
                used_money: None,
            });
            term = term.or(limit.quantity_period);
        }
    }

    let network_code = match benefit.network {
        NetworkIndicator::InNetwork => "in",
        NetworkIndicator::OutOfNetwork => "out",
    };
    let description = if benefit.messages.is_empty() {
        None
    } else {
        Some(benefit.messages.join("; "))
    };

    ResponseItem {
        category: Some(category),
        excluded: benefit.excluded.then_some(true),
        name: Some(benefit.category_name.clone()),
        description,
        network: Some(CodeableConcept::from_code(
            BENEFIT_NETWORK_SYSTEM,
            network_code,
            None,
        )),
        unit: Some(CodeableConcept::from_code(
            BENEFIT_UNIT_SYSTEM,
            "individual",
            None,
        )),
        term: term.map(|period| {
            CodeableConcept::from_code(BENEFIT_TERM_SYSTEM, term_code(period), None)
        }),
        benefit: entries,
        authorization_required: benefit.authorization_required,
        extension,
    }
}

/// Render a canonical determination as a FHIR response resource
pub fn map_response(
    response: &EligibilityResponse,
    request: &EligibilityRequest,
    response_id: &str,
) -> CoverageEligibilityResponse {
    let coverage_id = response
        .plan
        .as_ref()
        .map(|plan| plan.plan_code.as_str())
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| request.effective_plan_code());

    CoverageEligibilityResponse {
        resource_type: RESPONSE_RESOURCE_TYPE.to_string(),
        id: response_id.to_string(),
        status: "active".to_string(),
        purpose: vec!["benefits".to_string()],
        patient: Reference::new("Patient", &request.subscriber.member_id),
        created: Utc::now().to_rfc3339(),
        request: Some(Reference::new(
            REQUEST_RESOURCE_TYPE,
            &response.control_number,
        )),
        outcome: "complete".to_string(),
        disposition: Some(format!("Coverage status: {}", response.status.as_str())),
        insurer: Reference::new("Organization", &request.payer_id),
        insurance: vec![ResponseInsurance {
            coverage: Reference::new("Coverage", coverage_id),
            inforce: Some(response.status.is_active()),
            item: response.benefits.iter().map(response_item).collect(),
        }],
    }
}

/// Build an `OperationOutcome` for a FHIR-surface error
pub fn operation_outcome(
    severity: &str,
    code: &str,
    diagnostics: impl Into<String>,
) -> OperationOutcome {
    OperationOutcome {
        resource_type: "OperationOutcome".to_string(),
        issue: vec![OperationOutcomeIssue {
            severity: severity.to_string(),
            code: code.to_string(),
            diagnostics: Some(diagnostics.into()),
        }],
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use eligibility_core::{CostSharing, CoverageStatus, PlanDescription};

    use super::*;

    fn sample_request_json() -> serde_json::Value {
        json!({
            "resourceType": "CoverageEligibilityRequest",
            "id": "elig-check-001",
            "status": "active",
            "purpose": ["benefits"],
            "patient": {"reference": "Patient/M12345"},
            "servicedDate": "2024-01-15",
            "created": "2024-01-15T09:30:00Z",
            "insurer": {"reference": "Organization/ACME01", "display": "ACME HEALTH"},
            "provider": {"reference": "PractitionerRole/1234567890"},
            "insurance": [{"focal": true, "coverage": {"reference": "Coverage/PPO_GOLD"}}],
            "item": [
                {"category": {"coding": [{"system": BENEFIT_CATEGORY_SYSTEM, "code": "medical"}]}},
                {"category": {"coding": [{"code": "acupuncture"}]}}
            ],
            "contained": [{
                "resourceType": "Patient",
                "id": "pat1",
                "name": [{"family": "DOE", "given": ["JANE"]}],
                "birthDate": "1985-03-22",
                "gender": "female"
            }]
        })
    }

    #[test]
    fn rejects_other_resource_types() {
        let err = parse_request(json!({"resourceType": "Patient"})).unwrap_err();
        assert!(matches!(
            err,
            FhirError::UnsupportedResourceType { found, .. } if found == "Patient"
        ));
    }

    #[test]
    fn maps_a_full_request() {
        let wire = parse_request(sample_request_json()).unwrap();
        let mapped = map_request(wire).unwrap();
        let request = &mapped.request;

        assert_eq!(request.control_number, "elig-check-001");
        assert_eq!(request.payer_id, "ACME01");
        assert_eq!(request.payer_name.as_deref(), Some("ACME HEALTH"));
        assert_eq!(request.provider_npi.as_deref(), Some("1234567890"));
        assert_eq!(request.subscriber.member_id, "M12345");
        assert_eq!(request.subscriber.last_name.as_deref(), Some("DOE"));
        assert_eq!(request.subscriber.gender, Some(Gender::Female));
        assert_eq!(
            request.subscriber.date_of_birth,
            NaiveDate::from_ymd_opt(1985, 3, 22)
        );
        assert_eq!(request.plan_code.as_deref(), Some("PPO_GOLD"));
        assert_eq!(
            request.service_date,
            Some(ServiceDate::Single(
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
            ))
        );
        // "medical" translates, "acupuncture" passes through flagged
        assert_eq!(request.service_type_codes, vec!["1", "acupuncture"]);
        assert_eq!(mapped.translation_misses, vec!["acupuncture"]);
    }

    #[test]
    fn serviced_period_maps_to_a_range() {
        let mut raw = sample_request_json();
        raw.as_object_mut().unwrap().remove("servicedDate");
        raw.as_object_mut().unwrap().insert(
            "servicedPeriod".into(),
            json!({"start": "2024-01-01", "end": "2024-01-31"}),
        );
        let mapped = map_request(parse_request(raw).unwrap()).unwrap();
        assert_eq!(
            mapped.request.service_date,
            Some(ServiceDate::Range {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            })
        );
    }

    #[test]
    fn invalid_serviced_date_is_rejected() {
        let mut raw = sample_request_json();
        raw.as_object_mut()
            .unwrap()
            .insert("servicedDate".into(), json!("01/15/2024"));
        let err = map_request(parse_request(raw).unwrap()).unwrap_err();
        assert!(matches!(err, FhirError::InvalidResource(_)));
    }

    #[test]
    fn missing_patient_reference_is_rejected() {
        let mut raw = sample_request_json();
        raw.as_object_mut()
            .unwrap()
            .insert("patient".into(), json!({"display": "Jane Doe"}));
        let err = map_request(parse_request(raw).unwrap()).unwrap_err();
        assert!(matches!(err, FhirError::MissingField("patient.reference")));
    }

    fn canonical_request() -> EligibilityRequest {
        let wire = parse_request(sample_request_json()).unwrap();
        map_request(wire).unwrap().request
    }

    #[test]
    fn maps_a_determination_to_a_response_resource() {
        let request = canonical_request();
        let response = EligibilityResponse {
            control_number: "elig-check-001".into(),
            status: CoverageStatus::Active,
            plan: Some(PlanDescription {
                plan_code: "PPO_GOLD".into(),
                plan_name: Some("GOLD PPO PLAN".into()),
                group_number: None,
            }),
            benefits: vec![
                Benefit {
                    service_type_code: "30".into(),
                    category_name: "Health Benefit Plan Coverage".into(),
                    status: CoverageStatus::Active,
                    excluded: false,
                    network: NetworkIndicator::InNetwork,
                    authorization_required: Some(false),
                    cost_sharing: Some(CostSharing {
                        copay: Some(25.0),
                        coinsurance_percent: Some(20.0),
                        deductible: Some(1500.0),
                        deductible_remaining: Some(500.0),
                        out_of_pocket_max: None,
                        out_of_pocket_remaining: None,
                    }),
                    limit: None,
                    messages: vec![],
                },
                Benefit {
                    service_type_code: "85".into(),
                    category_name: "AIDS".into(),
                    status: CoverageStatus::Active,
                    excluded: false,
                    network: NetworkIndicator::InNetwork,
                    authorization_required: Some(true),
                    cost_sharing: Some(CostSharing {
                        copay: Some(150.0),
                        ..CostSharing::default()
                    }),
                    limit: None,
                    messages: vec![],
                },
            ],
        };

        let resource = map_response(&response, &request, "resp-1");
        assert_eq!(resource.resource_type, RESPONSE_RESOURCE_TYPE);
        assert_eq!(resource.outcome, "complete");
        let insurance = &resource.insurance[0];
        assert_eq!(insurance.inforce, Some(true));
        assert_eq!(
            insurance.coverage.reference.as_deref(),
            Some("Coverage/PPO_GOLD")
        );

        let plan_item = &insurance.item[0];
        assert_eq!(
            plan_item.category.as_ref().unwrap().first_code(),
            Some("plan-coverage")
        );
        assert!(plan_item.extension.is_empty());
        let copay = &plan_item.benefit[0];
        assert_eq!(copay.benefit_type.first_code(), Some("copay"));
        assert_eq!(copay.allowed_money.as_ref().unwrap().value, Some(25.0));
        let deductible = &plan_item.benefit[2];
        assert_eq!(deductible.benefit_type.first_code(), Some("deductible"));
        assert_eq!(
            deductible.used_money.as_ref().unwrap().value,
            Some(1000.0)
        );

        // 85 has no category translation: passthrough plus the miss extension
        let aids_item = &insurance.item[1];
        assert_eq!(
            aids_item.category.as_ref().unwrap().first_code(),
            Some("85")
        );
        assert_eq!(aids_item.extension.len(), 1);
        assert_eq!(
            aids_item.extension[0].url,
            UNTRANSLATED_CATEGORY_EXTENSION
        );
        assert_eq!(aids_item.authorization_required, Some(true));
    }

    #[test]
    fn inactive_status_maps_to_not_inforce() {
        let request = canonical_request();
        let response = EligibilityResponse {
            control_number: "elig-check-001".into(),
            status: CoverageStatus::Inactive,
            plan: None,
            benefits: vec![],
        };
        let resource = map_response(&response, &request, "resp-2");
        assert_eq!(resource.insurance[0].inforce, Some(false));
        assert_eq!(
            resource.disposition.as_deref(),
            Some("Coverage status: inactive")
        );
    }

    #[test]
    fn operation_outcome_shape() {
        let outcome = operation_outcome("error", "invalid", "resourceType must be CoverageEligibilityRequest");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["resourceType"], "OperationOutcome");
        assert_eq!(value["issue"][0]["severity"], "error");
        assert_eq!(value["issue"][0]["code"], "invalid");
    }
}
