/// Service-type code used when an inquiry names none: plan-level coverage
pub const DEFAULT_SERVICE_TYPE: &str = "30";

/// Human-readable category name for an X12 service-type code.
///
/// Codes outside the table render as `Service Type <code>` instead of being
/// rejected; payers keep extending this vocabulary.
pub fn service_type_name(code: &str) -> String {
    let name = match code {
        "1" => "Medical Care",
        "2" => "Surgical",
        "4" => "Diagnostic X-Ray",
        "5" => "Diagnostic Lab",
        "30" => "Health Benefit Plan Coverage",
        "33" => "Chiropractic",
        "35" => "Dental Care",
        "42" => "Home Health Care",
        "45" => "Hospice",
        "47" => "Hospital",
        "48" => "Hospital - Inpatient",
        "50" => "Hospital - Outpatient",
        "85" => "AIDS",
        "86" => "Emergency Services",
        "88" => "Pharmacy",
        "98" => "Professional (Physician) Visit - Office",
        "AL" => "Vision (Optometry)",
        "MH" => "Mental Health",
        "UC" => "Urgent Care",
        other => return format!("Service Type {other}"),
    };
    name.to_string()
}
