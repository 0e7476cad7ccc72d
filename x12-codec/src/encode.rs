use chrono::Utc;

use eligibility_core::{
    Benefit, CoverageStatus, EligibilityRequest, EligibilityResponse, DEFAULT_SERVICE_TYPE,
};

use crate::decode::{INQUIRY_TRANSACTION, RESPONSE_TRANSACTION};
use crate::error::{X12Error, X12Result};
use crate::segment::{format_service_date, format_wire_date};

const IMPLEMENTATION_GUIDE: &str = "005010X279A1";
/// EB01 `6` covers both inactive and terminated; terminated rows carry this
/// note so the distinction survives on the wire
const TERMINATED_MESSAGE: &str = "COVERAGE TERMINATED";

/// Interchange identity used when writing envelopes
#[derive(Debug, Clone)]
pub struct InterchangeConfig {
    pub sender_qualifier: String,
    pub sender_id: String,
    pub receiver_qualifier: String,
    pub receiver_id: String,
    /// `P` production, `T` test
    pub usage_indicator: String,
    pub control_number: u32,
}

impl Default for InterchangeConfig {
    fn default() -> Self {
        Self {
            sender_qualifier: "ZZ".to_string(),
            sender_id: "COVERGATE".to_string(),
            receiver_qualifier: "ZZ".to_string(),
            receiver_id: "PAYER".to_string(),
            usage_indicator: "P".to_string(),
            control_number: 1,
        }
    }
}

impl InterchangeConfig {
    /// Same identity with sender and receiver swapped, used when answering
    /// an inquiry
    pub fn mirrored(&self) -> Self {
        Self {
            sender_qualifier: self.receiver_qualifier.clone(),
            sender_id: self.receiver_id.clone(),
            receiver_qualifier: self.sender_qualifier.clone(),
            receiver_id: self.sender_id.clone(),
            usage_indicator: self.usage_indicator.clone(),
            control_number: self.control_number,
        }
    }
}

/// Render one segment, trimming trailing empty elements
fn seg(id: &str, elements: &[&str]) -> String {
    let mut parts: Vec<&str> = elements.to_vec();
    while parts.last() == Some(&"") {
        parts.pop();
    }
    if parts.is_empty() {
        id.to_string()
    } else {
        format!("{}*{}", id, parts.join("*"))
    }
}

fn money(amount: f64) -> String {
    format!("{amount:.2}")
}

fn percent_fraction(percent: f64) -> String {
    format!("{}", percent / 100.0)
}

/// Wrap transaction segments in ISA/GS/ST..SE/GE/IEA with a correct SE count
fn build_interchange(
    functional_code: &str,
    transaction_set: &str,
    body: Vec<String>,
    config: &InterchangeConfig,
) -> String {
    let now = Utc::now();
    let transaction_control = "0001";

    let isa = format!(
        "ISA*00*{:<10}*00*{:<10}*{}*{:<15}*{}*{:<15}*{}*{}*^*00501*{:09}*0*{}*:",
        "",
        "",
        config.sender_qualifier,
        config.sender_id,
        config.receiver_qualifier,
        config.receiver_id,
        now.format("%y%m%d"),
        now.format("%H%M"),
        config.control_number,
        config.usage_indicator,
    );
    let gs = seg(
        "GS",
        &[
            functional_code,
            config.sender_id.trim(),
            config.receiver_id.trim(),
            &now.format("%Y%m%d").to_string(),
            &now.format("%H%M").to_string(),
            &config.control_number.to_string(),
            "X",
            IMPLEMENTATION_GUIDE,
        ],
    );
    let st = seg(
        "ST",
        &[transaction_set, transaction_control, IMPLEMENTATION_GUIDE],
    );
    // ST + body + SE
    let segment_count = body.len() + 2;
    let se = seg("SE", &[&segment_count.to_string(), transaction_control]);
    let ge = seg("GE", &["1", &config.control_number.to_string()]);
    let iea = seg("IEA", &["1", &format!("{:09}", config.control_number)]);

    let mut segments = Vec::with_capacity(body.len() + 6);
    segments.push(isa);
    segments.push(gs);
    segments.push(st);
    segments.extend(body);
    segments.push(se);
    segments.push(ge);
    segments.push(iea);

    let mut out = segments.join("~");
    out.push('~');
    out
}

/// Serialize a canonical request as a 270 inquiry
pub fn encode_request(
    request: &EligibilityRequest,
    config: &InterchangeConfig,
) -> X12Result<String> {
    if request.subscriber.member_id.trim().is_empty() {
        return Err(X12Error::Encode("subscriber member id is required".into()));
    }
    if request.payer_id.trim().is_empty() {
        return Err(X12Error::Encode("payer id is required".into()));
    }

    let now = Utc::now();
    let date8 = now.format("%Y%m%d").to_string();
    let time4 = now.format("%H%M").to_string();
    let has_dependent = request.dependent.is_some();

    let mut body = Vec::new();
    body.push(seg(
        "BHT",
        &["0022", "13", &request.control_number, &date8, &time4],
    ));
    body.push(seg("HL", &["1", "", "20", "1"]));
    body.push(seg(
        "NM1",
        &[
            "PR",
            "2",
            request.payer_name.as_deref().unwrap_or(""),
            "",
            "",
            "",
            "",
            "PI",
            &request.payer_id,
        ],
    ));
    body.push(seg("HL", &["2", "1", "21", "1"]));
    body.push(seg(
        "NM1",
        &[
            "1P",
            "2",
            request.provider_name.as_deref().unwrap_or(""),
            "",
            "",
            "",
            "",
            "XX",
            request.provider_npi.as_deref().unwrap_or(""),
        ],
    ));
    body.push(seg(
        "HL",
        &["3", "2", "22", if has_dependent { "1" } else { "0" }],
    ));
    let originator = format!("9{}", config.sender_id.trim());
    body.push(seg("TRN", &["1", &request.control_number, &originator]));
    body.push(seg(
        "NM1",
        &[
            "IL",
            "1",
            request.subscriber.last_name.as_deref().unwrap_or(""),
            request.subscriber.first_name.as_deref().unwrap_or(""),
            "",
            "",
            "",
            "MI",
            &request.subscriber.member_id,
        ],
    ));
    if let Some(plan_code) = &request.plan_code {
        body.push(seg("REF", &["18", plan_code]));
    }
    push_dmg(
        &mut body,
        request.subscriber.date_of_birth,
        request.subscriber.gender,
    );

    // Service date and requested codes live in the loop the inquiry is about
    let mut service_segments = Vec::new();
    if let Some(date) = &request.service_date {
        let (qualifier, value) = format_service_date(date);
        service_segments.push(seg("DTP", &["291", qualifier, &value]));
    }
    for code in &request.service_type_codes {
        service_segments.push(seg("EQ", &[code]));
    }

    if let Some(dependent) = &request.dependent {
        body.push(seg("HL", &["4", "3", "23", "0"]));
        body.push(seg(
            "NM1",
            &["03", "1", &dependent.last_name, &dependent.first_name],
        ));
        push_dmg(&mut body, dependent.date_of_birth, dependent.gender);
    }
    body.extend(service_segments);

    Ok(build_interchange(
        "HS",
        INQUIRY_TRANSACTION,
        body,
        config,
    ))
}

fn push_dmg(
    body: &mut Vec<String>,
    date_of_birth: Option<chrono::NaiveDate>,
    gender: Option<eligibility_core::Gender>,
) {
    if date_of_birth.is_none() && gender.is_none() {
        return;
    }
    let dob8 = date_of_birth.map(format_wire_date).unwrap_or_default();
    let qualifier = if dob8.is_empty() { "" } else { "D8" };
    let gender_code = gender.map(|g| g.wire_code()).unwrap_or("");
    body.push(seg("DMG", &[qualifier, &dob8, gender_code]));
}

fn eb_status_code(benefit: &Benefit) -> &'static str {
    if benefit.excluded {
        return "I";
    }
    match benefit.status {
        CoverageStatus::Active => "1",
        CoverageStatus::Pending => "7",
        CoverageStatus::Inactive | CoverageStatus::Terminated => "6",
        CoverageStatus::Unknown => "U",
    }
}

/// Serialize a determination as a 271 response mirroring the inquiry
pub fn encode_response(
    response: &EligibilityResponse,
    request: &EligibilityRequest,
    config: &InterchangeConfig,
) -> X12Result<String> {
    let now = Utc::now();
    let date8 = now.format("%Y%m%d").to_string();
    let time4 = now.format("%H%M").to_string();
    let mirrored = config.mirrored();

    let mut body = Vec::new();
    body.push(seg(
        "BHT",
        &["0022", "11", &response.control_number, &date8, &time4],
    ));
    body.push(seg("HL", &["1", "", "20", "1"]));
    body.push(seg(
        "NM1",
        &[
            "PR",
            "2",
            request.payer_name.as_deref().unwrap_or(""),
            "",
            "",
            "",
            "",
            "PI",
            &request.payer_id,
        ],
    ));
    body.push(seg("HL", &["2", "1", "21", "1"]));
    body.push(seg(
        "NM1",
        &[
            "1P",
            "2",
            request.provider_name.as_deref().unwrap_or(""),
            "",
            "",
            "",
            "",
            "XX",
            request.provider_npi.as_deref().unwrap_or(""),
        ],
    ));
    body.push(seg("HL", &["3", "2", "22", "0"]));
    body.push(seg(
        "NM1",
        &[
            "IL",
            "1",
            request.subscriber.last_name.as_deref().unwrap_or(""),
            request.subscriber.first_name.as_deref().unwrap_or(""),
            "",
            "",
            "",
            "MI",
            &request.subscriber.member_id,
        ],
    ));
    let originator = format!("9{}", mirrored.sender_id.trim());
    body.push(seg("TRN", &["2", &response.control_number, &originator]));

    if let Some(plan) = &response.plan {
        if !plan.plan_code.is_empty() {
            body.push(seg("REF", &["18", &plan.plan_code]));
        }
        if let Some(group) = &plan.group_number {
            body.push(seg("REF", &["6P", group]));
        }
    }
    push_dmg(
        &mut body,
        request.subscriber.date_of_birth,
        request.subscriber.gender,
    );
    if let Some(date) = &request.service_date {
        let (qualifier, value) = format_service_date(date);
        body.push(seg("DTP", &["291", qualifier, &value]));
    }

    let plan_name = response
        .plan
        .as_ref()
        .and_then(|plan| plan.plan_name.as_deref())
        .unwrap_or("");

    if response.benefits.is_empty() {
        // Degenerate determination: a single plan-level status row
        let code = match response.status {
            CoverageStatus::Active => "1",
            CoverageStatus::Pending => "7",
            CoverageStatus::Inactive | CoverageStatus::Terminated => "6",
            CoverageStatus::Unknown => "U",
        };
        body.push(seg(
            "EB",
            &[code, "", DEFAULT_SERVICE_TYPE, "", plan_name],
        ));
        if response.status == CoverageStatus::Terminated {
            body.push(seg("MSG", &[TERMINATED_MESSAGE]));
        }
    }

    for (index, benefit) in response.benefits.iter().enumerate() {
        let stc = benefit.service_type_code.as_str();
        let auth = match benefit.authorization_required {
            Some(true) => "Y",
            Some(false) => "N",
            None => "",
        };
        let row_plan_name = if index == 0 { plan_name } else { "" };
        body.push(seg(
            "EB",
            &[
                eb_status_code(benefit),
                "",
                stc,
                "",
                row_plan_name,
                "",
                "",
                "",
                "",
                "",
                auth,
                benefit.network.wire_code(),
            ],
        ));

        if let Some(sharing) = &benefit.cost_sharing {
            if let Some(copay) = sharing.copay {
                body.push(seg("EB", &["B", "", stc, "", "", "27", &money(copay)]));
            }
            if let Some(pct) = sharing.coinsurance_percent {
                body.push(seg(
                    "EB",
                    &["A", "", stc, "", "", "27", "", &percent_fraction(pct)],
                ));
            }
            if let Some(deductible) = sharing.deductible {
                body.push(seg("EB", &["C", "", stc, "", "", "23", &money(deductible)]));
            }
            if let Some(remaining) = sharing.deductible_remaining {
                body.push(seg("EB", &["C", "", stc, "", "", "29", &money(remaining)]));
            }
            if let Some(oop) = sharing.out_of_pocket_max {
                body.push(seg("EB", &["G", "", stc, "", "", "23", &money(oop)]));
            }
            if let Some(remaining) = sharing.out_of_pocket_remaining {
                body.push(seg("EB", &["G", "", stc, "", "", "29", &money(remaining)]));
            }
        }
        if let Some(limit) = &benefit.limit {
            if let Some(amount) = limit.amount {
                let qualifier = limit.amount_period.map(|p| p.qualifier()).unwrap_or("");
                body.push(seg("EB", &["F", "", stc, "", "", qualifier, &money(amount)]));
            }
            if let Some(quantity) = limit.quantity {
                let qualifier = limit.quantity_period.map(|p| p.qualifier()).unwrap_or("");
                let qty = format!("{quantity}");
                body.push(seg(
                    "EB",
                    &["F", "", stc, "", "", qualifier, "", "", "VS", &qty],
                ));
            }
        }
        if benefit.status == CoverageStatus::Terminated {
            body.push(seg("MSG", &[TERMINATED_MESSAGE]));
        }
        for message in &benefit.messages {
            body.push(seg("MSG", &[message]));
        }
    }

    Ok(build_interchange(
        "HB",
        RESPONSE_TRANSACTION,
        body,
        &mirrored,
    ))
}
