use chrono::NaiveDate;

use eligibility_core::ServiceDate;

use crate::error::{X12Error, X12Result};

/// Interchange delimiters. Decoding reads them from the ISA segment,
/// encoding always writes the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub segment: char,
    pub element: char,
    pub sub_element: char,
    pub repetition: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            segment: '~',
            element: '*',
            sub_element: ':',
            repetition: '^',
        }
    }
}

impl Delimiters {
    /// Detect delimiters from the raw interchange. The element separator is
    /// the character following the `ISA` tag; the repetition separator is
    /// ISA11 when it carries one. Segments are terminated by `~`.
    pub fn detect(input: &str) -> Self {
        let mut delims = Self::default();
        let trimmed = input.trim_start();
        if !trimmed.starts_with("ISA") {
            return delims;
        }
        if let Some(separator) = trimmed.chars().nth(3) {
            if !separator.is_ascii_alphanumeric() && separator != '~' {
                delims.element = separator;
            }
        }
        // ISA11: repetition separator in 5010 interchanges
        let isa = trimmed.split('~').next().unwrap_or(trimmed);
        if let Some(rep) = isa.split(delims.element).nth(11).and_then(|e| e.chars().next()) {
            if !rep.is_ascii_alphanumeric() {
                delims.repetition = rep;
            }
        }
        delims
    }
}

/// One parsed segment: tag plus positional elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: String,
    elements: Vec<String>,
}

impl Segment {
    pub fn parse(raw: &str, delims: &Delimiters) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let mut parts = raw.split(delims.element);
        let id = parts.next()?.trim().to_string();
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id,
            elements: parts.map(|part| part.trim().to_string()).collect(),
        })
    }

    /// Element by 1-based X12 position (`NM101` is `element(1)`); empty
    /// string when the position is absent
    pub fn element(&self, position: usize) -> &str {
        position
            .checked_sub(1)
            .and_then(|index| self.elements.get(index))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// True when the segment is `NM1` with the given entity identifier code
    pub fn is_nm1(&self, entity: &str) -> bool {
        self.id == "NM1" && self.element(1) == entity
    }
}

/// Split an interchange into segments, tolerating newlines between them
pub fn split_segments(input: &str, delims: &Delimiters) -> Vec<Segment> {
    input
        .split(delims.segment)
        .filter_map(|raw| Segment::parse(raw, delims))
        .collect()
}

/// Envelope control values extracted during validation
#[derive(Debug, Clone)]
pub struct Envelope {
    pub sender_id: String,
    pub receiver_id: String,
    pub interchange_control: String,
    pub group_control: String,
    pub transaction_control: String,
    /// Index range of the ST..SE transaction set (inclusive)
    pub transaction_start: usize,
    pub transaction_end: usize,
}

/// Validate the ISA/GS/ST..SE/GE/IEA envelope of a single-transaction
/// interchange and extract its control values.
///
/// Diagnostic codes are stable and surfaced to callers: ENV001 missing/short
/// ISA, ENV002 multiple ISA, ENV003 missing GS, ENV004 missing ST, ENV005
/// wrong transaction code, ENV007 missing SE, ENV008 segment-count mismatch,
/// ENV009 control-number mismatch, ENV010 missing GE, ENV011 missing IEA.
pub fn validate_envelope(segments: &[Segment], expected_set: &str) -> X12Result<Envelope> {
    let isa = match segments.first() {
        Some(segment) if segment.id == "ISA" => segment,
        _ => {
            return Err(X12Error::envelope(
                "ENV001",
                "ISA",
                "Missing ISA segment (Interchange Control Header)",
            ))
        }
    };
    if isa.element_count() < 16 {
        return Err(X12Error::envelope(
            "ENV001",
            "ISA",
            format!(
                "ISA segment has {} elements, 16 required",
                isa.element_count()
            ),
        ));
    }
    let isa_count = segments.iter().filter(|s| s.id == "ISA").count();
    if isa_count > 1 {
        return Err(X12Error::envelope(
            "ENV002",
            "ISA",
            format!("Multiple ISA segments found ({isa_count})"),
        ));
    }

    if !segments.iter().any(|s| s.id == "GS") {
        return Err(X12Error::envelope(
            "ENV003",
            "GS",
            "Missing GS segment (Functional Group Header)",
        ));
    }

    let (st_index, st) = match segments
        .iter()
        .enumerate()
        .find(|(_, segment)| segment.id == "ST")
    {
        Some(found) => found,
        None => {
            return Err(X12Error::envelope(
                "ENV004",
                "ST",
                "Missing ST segment (Transaction Set Header)",
            ))
        }
    };
    if st.element(1) != expected_set {
        return Err(X12Error::envelope(
            "ENV005",
            "ST",
            format!(
                "Invalid transaction code: expected '{expected_set}', found '{}'",
                st.element(1)
            ),
        ));
    }

    let (se_index, se) = match segments
        .iter()
        .enumerate()
        .skip(st_index)
        .find(|(_, segment)| segment.id == "SE")
    {
        Some(found) => found,
        None => {
            return Err(X12Error::envelope(
                "ENV007",
                "SE",
                "Missing SE segment (Transaction Set Trailer)",
            ))
        }
    };

    let actual_count = se_index - st_index + 1;
    let declared_count: usize = se.element(1).parse().unwrap_or(0);
    if declared_count != actual_count {
        return Err(X12Error::envelope(
            "ENV008",
            "SE",
            format!(
                "Transaction segment count mismatch: SE01 declares {declared_count}, found {actual_count}"
            ),
        ));
    }
    if se.element(2) != st.element(2) {
        return Err(X12Error::envelope(
            "ENV009",
            "SE",
            format!(
                "Transaction control number mismatch: ST02 '{}', SE02 '{}'",
                st.element(2),
                se.element(2)
            ),
        ));
    }

    if !segments.iter().any(|s| s.id == "GE") {
        return Err(X12Error::envelope(
            "ENV010",
            "GE",
            "Missing GE segment (Functional Group Trailer)",
        ));
    }
    if !segments.iter().any(|s| s.id == "IEA") {
        return Err(X12Error::envelope(
            "ENV011",
            "IEA",
            "Missing IEA segment (Interchange Control Trailer)",
        ));
    }

    let group_control = segments
        .iter()
        .find(|s| s.id == "GS")
        .map(|gs| gs.element(6).to_string())
        .unwrap_or_default();

    Ok(Envelope {
        sender_id: isa.element(6).trim().to_string(),
        receiver_id: isa.element(8).trim().to_string(),
        interchange_control: isa.element(13).to_string(),
        group_control,
        transaction_control: st.element(2).to_string(),
        transaction_start: st_index,
        transaction_end: se_index,
    })
}

/// Parse an 8-digit `CCYYMMDD` wire date
pub fn parse_wire_date(raw: &str) -> X12Result<NaiveDate> {
    if raw.len() != 8 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(X12Error::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d").map_err(|_| X12Error::InvalidDate(raw.to_string()))
}

pub fn format_wire_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parse a DTP value: `D8` single day or `RD8` `start-end` range
pub fn parse_service_date(qualifier: &str, raw: &str) -> X12Result<ServiceDate> {
    match qualifier {
        "RD8" => {
            let (start, end) = raw
                .split_once('-')
                .ok_or_else(|| X12Error::InvalidDate(raw.to_string()))?;
            Ok(ServiceDate::Range {
                start: parse_wire_date(start)?,
                end: parse_wire_date(end)?,
            })
        }
        _ => Ok(ServiceDate::Single(parse_wire_date(raw)?)),
    }
}

pub fn format_service_date(date: &ServiceDate) -> (&'static str, String) {
    match date {
        ServiceDate::Single(day) => ("D8", format_wire_date(*day)),
        ServiceDate::Range { start, end } => (
            "RD8",
            format!("{}-{}", format_wire_date(*start), format_wire_date(*end)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(raw: &str) -> Segment {
        Segment::parse(raw, &Delimiters::default()).unwrap()
    }

    fn minimal_270(st_control: &str, se_count: &str, se_control: &str) -> Vec<Segment> {
        let delims = Delimiters::default();
        let raw = format!(
            "ISA*00*          *00*          *ZZ*SENDER         *ZZ*RECEIVER       \
             *240115*1200*^*00501*000000001*0*P*:~\
             GS*HS*SENDER*RECEIVER*20240115*1200*1*X*005010X279A1~\
             ST*270*{st_control}*005010X279A1~\
             BHT*0022*13*TRACE1*20240115*1200~\
             SE*{se_count}*{se_control}~\
             GE*1*1~IEA*1*000000001~"
        );
        split_segments(&raw, &delims)
    }

    #[test]
    fn element_positions_are_one_based() {
        let nm1 = seg("NM1*IL*1*DOE*JANE****MI*M12345");
        assert_eq!(nm1.element(1), "IL");
        assert_eq!(nm1.element(3), "DOE");
        assert_eq!(nm1.element(9), "M12345");
        assert_eq!(nm1.element(42), "");
        assert!(nm1.is_nm1("IL"));
    }

    #[test]
    fn split_tolerates_newlines_between_segments() {
        let delims = Delimiters::default();
        let segments = split_segments("ST*270*0001~\nBHT*0022*13~\r\nSE*3*0001~", &delims);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].id, "BHT");
    }

    #[test]
    fn detects_nonstandard_element_separator() {
        let delims = Delimiters::detect("ISA|00|   ");
        assert_eq!(delims.element, '|');
        assert_eq!(delims.segment, '~');
    }

    #[test]
    fn missing_isa_is_env001() {
        let delims = Delimiters::default();
        let segments = split_segments("GS*HS*A*B~ST*270*0001~SE*2*0001~", &delims);
        let err = validate_envelope(&segments, "270").unwrap_err();
        assert_eq!(err.diagnostic_code(), "ENV001");
    }

    #[test]
    fn missing_gs_is_env003() {
        let mut segments = minimal_270("0001", "3", "0001");
        segments.retain(|s| s.id != "GS");
        let err = validate_envelope(&segments, "270").unwrap_err();
        assert_eq!(err.diagnostic_code(), "ENV003");
    }

    #[test]
    fn missing_st_is_env004() {
        let mut segments = minimal_270("0001", "3", "0001");
        segments.retain(|s| s.id != "ST");
        let err = validate_envelope(&segments, "270").unwrap_err();
        assert_eq!(err.diagnostic_code(), "ENV004");
    }

    #[test]
    fn wrong_transaction_code_is_env005() {
        let mut segments = minimal_270("0001", "3", "0001");
        let position = segments.iter().position(|s| s.id == "ST").unwrap();
        segments[position] = seg("ST*276*0001*005010X279A1");
        let err = validate_envelope(&segments, "270").unwrap_err();
        assert_eq!(err.diagnostic_code(), "ENV005");
    }

    #[test]
    fn missing_se_is_env007() {
        let mut segments = minimal_270("0001", "3", "0001");
        segments.retain(|s| s.id != "SE");
        let err = validate_envelope(&segments, "270").unwrap_err();
        assert_eq!(err.diagnostic_code(), "ENV007");
    }

    #[test]
    fn segment_count_mismatch_is_env008() {
        let segments = minimal_270("0001", "9", "0001");
        let err = validate_envelope(&segments, "270").unwrap_err();
        assert_eq!(err.diagnostic_code(), "ENV008");
    }

    #[test]
    fn control_number_mismatch_is_env009() {
        let segments = minimal_270("0001", "3", "0002");
        let err = validate_envelope(&segments, "270").unwrap_err();
        assert_eq!(err.diagnostic_code(), "ENV009");
    }

    #[test]
    fn valid_envelope_extracts_controls() {
        let segments = minimal_270("0001", "3", "0001");
        let envelope = validate_envelope(&segments, "270").unwrap();
        assert_eq!(envelope.sender_id, "SENDER");
        assert_eq!(envelope.receiver_id, "RECEIVER");
        assert_eq!(envelope.interchange_control, "000000001");
        assert_eq!(envelope.transaction_control, "0001");
        assert_eq!(envelope.transaction_end - envelope.transaction_start, 2);
    }

    #[test]
    fn wire_dates_parse_and_reject() {
        assert_eq!(
            parse_wire_date("20240115").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert!(parse_wire_date("2024115").is_err());
        assert!(parse_wire_date("20241340").is_err());
        assert!(parse_wire_date("2024011X").is_err());
    }

    #[test]
    fn service_date_range_round_trips() {
        let parsed = parse_service_date("RD8", "20240101-20240131").unwrap();
        let (qualifier, value) = format_service_date(&parsed);
        assert_eq!(qualifier, "RD8");
        assert_eq!(value, "20240101-20240131");
    }
}
