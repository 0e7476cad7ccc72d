/// Code system the benefit-category side of the table belongs to
pub const BENEFIT_CATEGORY_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/ex-benefitcategory";

/// Closed bidirectional table: benefit-category code to X12 service-type code
const CATEGORY_TABLE: &[(&str, &str)] = &[
    ("medical", "1"),
    ("surgical", "2"),
    ("plan-coverage", "30"),
    ("chiropractic", "33"),
    ("dental", "35"),
    ("hospital", "47"),
    ("hospital-inpatient", "48"),
    ("hospital-outpatient", "50"),
    ("emergency", "86"),
    ("pharmacy", "88"),
    ("professional-visit", "98"),
    ("vision", "AL"),
    ("mental-health", "MH"),
    ("urgent-care", "UC"),
];

/// Result of looking a code up in the closed table. A miss passes the code
/// through unchanged so callers can still route it, with `translated` false
/// so consumers can detect untranslated values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTranslation {
    pub code: String,
    pub translated: bool,
}

impl CategoryTranslation {
    fn hit(code: &str) -> Self {
        Self {
            code: code.to_string(),
            translated: true,
        }
    }

    fn passthrough(code: &str) -> Self {
        Self {
            code: code.to_string(),
            translated: false,
        }
    }
}

/// Benefit-category code to service-type code
pub fn to_service_type(category: &str) -> CategoryTranslation {
    CATEGORY_TABLE
        .iter()
        .find(|(cat, _)| *cat == category)
        .map(|(_, stc)| CategoryTranslation::hit(stc))
        .unwrap_or_else(|| CategoryTranslation::passthrough(category))
}

/// Service-type code to benefit-category code
pub fn to_category(service_type: &str) -> CategoryTranslation {
    CATEGORY_TABLE
        .iter()
        .find(|(_, stc)| *stc == service_type)
        .map(|(cat, _)| CategoryTranslation::hit(cat))
        .unwrap_or_else(|| CategoryTranslation::passthrough(service_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_bidirectional() {
        for (category, service_type) in CATEGORY_TABLE {
            let forward = to_service_type(category);
            assert!(forward.translated);
            assert_eq!(forward.code, *service_type);

            let back = to_category(&forward.code);
            assert!(back.translated);
            assert_eq!(back.code, *category);
        }
    }

    #[test]
    fn unknown_codes_pass_through_flagged() {
        let miss = to_service_type("acupuncture");
        assert!(!miss.translated);
        assert_eq!(miss.code, "acupuncture");

        let miss = to_category("ZZ");
        assert!(!miss.translated);
        assert_eq!(miss.code, "ZZ");
    }
}
