use sha2::{Digest, Sha256};

use crate::models::EligibilityRequest;

/// Deterministic cache key for a determination.
///
/// Hashes the canonical tuple (payer, subject, normalized service date,
/// sorted service-type codes). Two inquiries that differ only in code order
/// or surrounding whitespace produce the same fingerprint; a different
/// dependent, date or code set produces a different one.
pub fn fingerprint(request: &EligibilityRequest) -> String {
    let mut codes: Vec<String> = request
        .service_type_codes
        .iter()
        .map(|code| code.trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty())
        .collect();
    codes.sort();
    codes.dedup();

    let subject = match &request.dependent {
        Some(dep) => format!(
            "{}:{},{}",
            request.subscriber.member_id.trim(),
            dep.last_name.trim(),
            dep.first_name.trim()
        ),
        None => request.subscriber.member_id.trim().to_string(),
    };

    let service_date = request
        .service_date
        .as_ref()
        .map(|date| date.normalized())
        .unwrap_or_default();

    let canonical = format!(
        "{}|{}|{}|{}",
        request.payer_id.trim(),
        subject,
        service_date,
        codes.join(",")
    );

    hex::encode(Sha256::digest(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use super::*;
    use crate::models::{Dependent, ServiceDate, Subscriber};

    fn request(codes: &[&str]) -> EligibilityRequest {
        EligibilityRequest {
            control_number: "0001".into(),
            payer_id: "PAYER01".into(),
            payer_name: None,
            provider_npi: Some("1234567890".into()),
            provider_name: None,
            subscriber: Subscriber {
                member_id: "M12345".into(),
                first_name: Some("JANE".into()),
                last_name: Some("DOE".into()),
                date_of_birth: None,
                gender: None,
            },
            dependent: None,
            plan_code: Some("PPO_GOLD".into()),
            service_date: Some(ServiceDate::Single(
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            )),
            service_type_codes: codes.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn code_order_does_not_change_fingerprint() {
        assert_eq!(
            fingerprint(&request(&["30", "98", "AL"])),
            fingerprint(&request(&["AL", "30", "98"]))
        );
    }

    #[test]
    fn duplicate_codes_collapse() {
        assert_eq!(
            fingerprint(&request(&["30", "30", "98"])),
            fingerprint(&request(&["98", "30"]))
        );
    }

    #[test]
    fn different_codes_change_fingerprint() {
        assert_ne!(
            fingerprint(&request(&["30"])),
            fingerprint(&request(&["98"]))
        );
    }

    #[test]
    fn dependent_changes_fingerprint() {
        let base = request(&["30"]);
        let mut with_dep = request(&["30"]);
        with_dep.dependent = Some(Dependent {
            first_name: "TIM".into(),
            last_name: "DOE".into(),
            date_of_birth: None,
            gender: None,
        });
        assert_ne!(fingerprint(&base), fingerprint(&with_dep));
    }

    #[test]
    fn service_date_changes_fingerprint() {
        let base = request(&["30"]);
        let mut other_day = request(&["30"]);
        other_day.service_date = Some(ServiceDate::Single(
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
        ));
        assert_ne!(fingerprint(&base), fingerprint(&other_day));
    }

    #[test]
    fn missing_date_still_deterministic() {
        let mut a = request(&["30"]);
        let mut b = request(&["30"]);
        a.service_date = None;
        b.service_date = None;
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    proptest! {
        #[test]
        fn fingerprint_is_order_insensitive(mut codes in proptest::collection::vec("[0-9A-Z]{1,2}", 1..6)) {
            let forward = fingerprint(&request(&codes.iter().map(String::as_str).collect::<Vec<_>>()));
            codes.reverse();
            let reversed = fingerprint(&request(&codes.iter().map(String::as_str).collect::<Vec<_>>()));
            prop_assert_eq!(forward, reversed);
        }

        #[test]
        fn fingerprint_is_stable(codes in proptest::collection::vec("[0-9A-Z]{1,2}", 0..6)) {
            let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
            prop_assert_eq!(fingerprint(&request(&refs)), fingerprint(&request(&refs)));
        }
    }
}
