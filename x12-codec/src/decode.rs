use eligibility_core::{
    service_type_name, Benefit, BenefitLimit, CostSharing, CoverageStatus, Dependent,
    EligibilityRequest, EligibilityResponse, Gender, NetworkIndicator, PlanDescription, Subscriber,
};

use crate::error::{X12Error, X12Result};
use crate::segment::{
    parse_service_date, parse_wire_date, split_segments, validate_envelope, Delimiters, Segment,
};

pub const INQUIRY_TRANSACTION: &str = "270";
pub const RESPONSE_TRANSACTION: &str = "271";

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Decode a 270 inquiry into the canonical request.
///
/// Envelope validation runs first; a truncated or inconsistent interchange
/// never yields a partial request.
pub fn decode_request(input: &str) -> X12Result<EligibilityRequest> {
    let delims = Delimiters::detect(input);
    let segments = split_segments(input, &delims);
    let envelope = validate_envelope(&segments, INQUIRY_TRANSACTION)?;
    let transaction = segments
        .get(envelope.transaction_start..=envelope.transaction_end)
        .unwrap_or(&[]);

    let mut payer_id = None;
    let mut payer_name = None;
    let mut payer_seen = false;
    let mut provider_npi = None;
    let mut provider_name = None;
    let mut subscriber: Option<Subscriber> = None;
    let mut dependent: Option<Dependent> = None;
    let mut plan_code = None;
    let mut service_date = None;
    let mut service_type_codes: Vec<String> = Vec::new();
    let mut trace = None;
    let mut bht_reference = None;
    let mut hl_level = String::new();

    for segment in transaction {
        match segment.id.as_str() {
            "BHT" => bht_reference = non_empty(segment.element(3)),
            "HL" => hl_level = segment.element(3).to_string(),
            "TRN" => {
                if trace.is_none() {
                    trace = non_empty(segment.element(2));
                }
            }
            "NM1" => match segment.element(1) {
                "PR" => {
                    payer_seen = true;
                    payer_name = non_empty(segment.element(3));
                    payer_id = non_empty(segment.element(9));
                }
                "1P" | "2B" | "FA" => {
                    provider_name = non_empty(segment.element(3));
                    provider_npi = non_empty(segment.element(9));
                }
                "IL" => {
                    subscriber = Some(Subscriber {
                        member_id: segment.element(9).trim().to_string(),
                        first_name: non_empty(segment.element(4)),
                        last_name: non_empty(segment.element(3)),
                        date_of_birth: None,
                        gender: None,
                    });
                }
                "03" => {
                    dependent = Some(Dependent {
                        first_name: segment.element(4).trim().to_string(),
                        last_name: segment.element(3).trim().to_string(),
                        date_of_birth: None,
                        gender: None,
                    });
                }
                _ => {}
            },
            "DMG" => {
                let date_of_birth = match non_empty(segment.element(2)) {
                    Some(raw) => Some(parse_wire_date(&raw)?),
                    None => None,
                };
                let gender = Gender::from_wire_code(segment.element(3));
                if hl_level == "23" {
                    if let Some(dep) = dependent.as_mut() {
                        dep.date_of_birth = date_of_birth;
                        dep.gender = gender;
                    }
                } else if let Some(sub) = subscriber.as_mut() {
                    sub.date_of_birth = date_of_birth;
                    sub.gender = gender;
                }
            }
            "REF" => {
                if segment.element(1) == "18" && plan_code.is_none() {
                    plan_code = non_empty(segment.element(2));
                }
            }
            "DTP" => {
                if segment.element(1) == "291" {
                    service_date =
                        Some(parse_service_date(segment.element(2), segment.element(3))?);
                }
            }
            "EQ" => {
                for code in segment.element(1).split(delims.repetition) {
                    if let Some(code) = non_empty(code) {
                        service_type_codes.push(code);
                    }
                }
            }
            _ => {}
        }
    }

    if !payer_seen {
        return Err(X12Error::MissingSegment("NM1*PR"));
    }
    let payer_id = payer_id.ok_or(X12Error::MissingElement {
        segment: "NM1*PR",
        element: 9,
    })?;
    let subscriber = subscriber.ok_or(X12Error::MissingSegment("NM1*IL"))?;
    if subscriber.member_id.is_empty() {
        return Err(X12Error::MissingElement {
            segment: "NM1*IL",
            element: 9,
        });
    }

    let control_number = trace
        .or(bht_reference)
        .unwrap_or(envelope.transaction_control);

    Ok(EligibilityRequest {
        control_number,
        payer_id,
        payer_name,
        provider_npi,
        provider_name,
        subscriber,
        dependent,
        plan_code,
        service_date,
        service_type_codes,
    })
}

fn parse_money(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

fn status_for_eb_code(code: &str) -> Option<(CoverageStatus, bool)> {
    match code {
        "1" | "2" | "3" | "4" => Some((CoverageStatus::Active, false)),
        "5" | "7" | "8" => Some((CoverageStatus::Pending, false)),
        "6" => Some((CoverageStatus::Inactive, false)),
        "I" => Some((CoverageStatus::Inactive, true)),
        "U" | "V" | "W" => Some((CoverageStatus::Unknown, false)),
        _ => None,
    }
}

/// Decode a 271 response into the canonical model.
///
/// Cost-share and limitation EB rows are folded into the benefit opened by
/// the preceding status row; MSG segments attach to the same benefit.
pub fn decode_response(input: &str) -> X12Result<EligibilityResponse> {
    let delims = Delimiters::detect(input);
    let segments = split_segments(input, &delims);
    let envelope = validate_envelope(&segments, RESPONSE_TRANSACTION)?;
    let transaction = segments
        .get(envelope.transaction_start..=envelope.transaction_end)
        .unwrap_or(&[]);

    let mut trace = None;
    let mut bht_reference = None;
    let mut plan_code = None;
    let mut group_number = None;
    let mut plan_name = None;
    let mut benefits: Vec<Benefit> = Vec::new();
    let mut current: Option<Benefit> = None;

    for segment in transaction {
        match segment.id.as_str() {
            "BHT" => bht_reference = non_empty(segment.element(3)),
            "TRN" => {
                if trace.is_none() {
                    trace = non_empty(segment.element(2));
                }
            }
            "REF" => match segment.element(1) {
                "18" => plan_code = plan_code.or_else(|| non_empty(segment.element(2))),
                "6P" => group_number = group_number.or_else(|| non_empty(segment.element(2))),
                _ => {}
            },
            "EB" => {
                let info_code = segment.element(1);
                if let Some((status, excluded)) = status_for_eb_code(info_code) {
                    if let Some(done) = current.take() {
                        benefits.push(done);
                    }
                    let service_type_code = non_empty(segment.element(3))
                        .unwrap_or_else(|| eligibility_core::DEFAULT_SERVICE_TYPE.to_string());
                    if plan_name.is_none() {
                        plan_name = non_empty(segment.element(5));
                    }
                    current = Some(Benefit {
                        category_name: service_type_name(&service_type_code),
                        service_type_code,
                        status,
                        excluded,
                        network: NetworkIndicator::from_wire_code(segment.element(12))
                            .unwrap_or(NetworkIndicator::InNetwork),
                        authorization_required: match segment.element(11) {
                            "Y" => Some(true),
                            "N" => Some(false),
                            _ => None,
                        },
                        cost_sharing: None,
                        limit: None,
                        messages: Vec::new(),
                    });
                } else if let Some(benefit) = current.as_mut() {
                    apply_detail_row(benefit, info_code, segment);
                }
            }
            "MSG" => {
                if let Some(benefit) = current.as_mut() {
                    if let Some(text) = non_empty(segment.element(1)) {
                        benefit.messages.push(text);
                    }
                }
            }
            _ => {}
        }
    }
    if let Some(done) = current.take() {
        benefits.push(done);
    }

    let control_number = trace
        .or(bht_reference)
        .unwrap_or(envelope.transaction_control);
    let status = CoverageStatus::most_permissive(benefits.iter().map(|b| b.status))
        .unwrap_or(CoverageStatus::Unknown);
    let plan = if plan_code.is_some() || plan_name.is_some() || group_number.is_some() {
        Some(PlanDescription {
            plan_code: plan_code.unwrap_or_default(),
            plan_name,
            group_number,
        })
    } else {
        None
    };

    Ok(EligibilityResponse {
        control_number,
        status,
        plan,
        benefits,
    })
}

fn apply_detail_row(benefit: &mut Benefit, info_code: &str, segment: &Segment) {
    match info_code {
        "B" => {
            let sharing = benefit.cost_sharing.get_or_insert_with(CostSharing::default);
            sharing.copay = parse_money(segment.element(7));
        }
        "A" => {
            let sharing = benefit.cost_sharing.get_or_insert_with(CostSharing::default);
            sharing.coinsurance_percent = parse_money(segment.element(8)).map(|f| f * 100.0);
        }
        "C" => {
            let sharing = benefit.cost_sharing.get_or_insert_with(CostSharing::default);
            if segment.element(6) == "29" {
                sharing.deductible_remaining = parse_money(segment.element(7));
            } else {
                sharing.deductible = parse_money(segment.element(7));
            }
        }
        "G" => {
            let sharing = benefit.cost_sharing.get_or_insert_with(CostSharing::default);
            if segment.element(6) == "29" {
                sharing.out_of_pocket_remaining = parse_money(segment.element(7));
            } else {
                sharing.out_of_pocket_max = parse_money(segment.element(7));
            }
        }
        "F" => {
            let limit = benefit.limit.get_or_insert_with(BenefitLimit::default);
            let period = eligibility_core::LimitPeriod::from_qualifier(segment.element(6));
            if let Some(amount) = parse_money(segment.element(7)) {
                limit.amount = Some(amount);
                limit.amount_period = period;
            }
            if let Some(quantity) = parse_money(segment.element(10)) {
                limit.quantity = Some(quantity);
                limit.quantity_period = period;
            }
        }
        _ => {}
    }
}
