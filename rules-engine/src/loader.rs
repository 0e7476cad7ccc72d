use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{info, warn};

use eligibility_core::{BenefitLimit, CostSharing, Gender, LimitPeriod};

use crate::error::{RuleError, RuleResult};
use crate::rule::{CoverageIndicator, EligibilityRule};

/// Columns a rule file must carry; the rest are optional
pub const REQUIRED_COLUMNS: &[&str] = &[
    "rule_id",
    "plan_code",
    "service_type_code",
    "coverage",
    "priority",
];

/// One skipped row and the reason it was skipped
#[derive(Debug, Clone, Serialize)]
pub struct RowDiagnostic {
    /// 1-based line number in the source file, counting the header
    pub line: u64,
    pub reason: String,
}

/// Outcome of a rule load
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<RowDiagnostic>,
}

struct ColumnMap(HashMap<String, usize>);

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> RuleResult<Self> {
        let map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(index, header)| (header.trim().to_ascii_lowercase(), index))
            .collect();
        for required in REQUIRED_COLUMNS {
            if !map.contains_key(*required) {
                return Err(RuleError::RuleLoadError(format!(
                    "missing required column '{required}'"
                )));
            }
        }
        Ok(Self(map))
    }

    /// Trimmed cell value, `None` for an absent column or empty cell
    fn field<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.0
            .get(name)
            .and_then(|&index| record.get(index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn required(&self, record: &StringRecord, name: &str) -> Result<String, String> {
        self.field(record, name)
            .map(str::to_string)
            .ok_or_else(|| format!("missing required value '{name}'"))
    }

    fn parse<T: FromStr>(
        &self,
        record: &StringRecord,
        name: &str,
    ) -> Result<Option<T>, String> {
        match self.field(record, name) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| format!("invalid value '{raw}' in column '{name}'")),
        }
    }

    fn parse_bool(&self, record: &StringRecord, name: &str, default: bool) -> Result<bool, String> {
        match self.field(record, name) {
            None => Ok(default),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(true),
                "false" | "no" | "n" | "0" => Ok(false),
                other => Err(format!("invalid boolean '{other}' in column '{name}'")),
            },
        }
    }

    fn parse_date(&self, record: &StringRecord, name: &str) -> Result<Option<NaiveDate>, String> {
        match self.field(record, name) {
            None => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| format!("invalid date '{raw}' in column '{name}', expected YYYY-MM-DD")),
        }
    }

    fn parse_period(
        &self,
        record: &StringRecord,
        name: &str,
    ) -> Result<Option<LimitPeriod>, String> {
        match self.field(record, name) {
            None => Ok(None),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "day" => Ok(Some(LimitPeriod::Day)),
                "week" => Ok(Some(LimitPeriod::Week)),
                "month" => Ok(Some(LimitPeriod::Month)),
                "year" => Ok(Some(LimitPeriod::Year)),
                "lifetime" => Ok(Some(LimitPeriod::Lifetime)),
                other => Err(format!("invalid period '{other}' in column '{name}'")),
            },
        }
    }

    /// Pipe-separated gender codes, e.g. `F` or `M|F`
    fn parse_genders(
        &self,
        record: &StringRecord,
        name: &str,
    ) -> Result<Option<Vec<Gender>>, String> {
        match self.field(record, name) {
            None => Ok(None),
            Some(raw) => raw
                .split('|')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| {
                    Gender::from_wire_code(token)
                        .ok_or_else(|| format!("invalid gender '{token}' in column '{name}'"))
                })
                .collect::<Result<Vec<Gender>, String>>()
                .map(|genders| if genders.is_empty() { None } else { Some(genders) }),
        }
    }

    fn rule_from_record(&self, record: &StringRecord) -> Result<EligibilityRule, String> {
        let rule_id = self.required(record, "rule_id")?;
        let plan_code = self.required(record, "plan_code")?;
        let service_type_code = self.required(record, "service_type_code")?;
        let coverage_token = self.required(record, "coverage")?;
        let coverage = CoverageIndicator::parse(&coverage_token)
            .ok_or_else(|| format!("unknown coverage '{coverage_token}'"))?;
        let priority = self
            .parse::<i32>(record, "priority")?
            .ok_or("missing required value 'priority'")?;

        let in_network = CostSharing {
            copay: self.parse(record, "copay")?,
            coinsurance_percent: self.parse(record, "coinsurance_percent")?,
            deductible: self.parse(record, "deductible")?,
            deductible_remaining: self.parse(record, "deductible_remaining")?,
            out_of_pocket_max: self.parse(record, "out_of_pocket_max")?,
            out_of_pocket_remaining: self.parse(record, "out_of_pocket_remaining")?,
        };
        let out_of_network = CostSharing {
            copay: self.parse(record, "oon_copay")?,
            coinsurance_percent: self.parse(record, "oon_coinsurance_percent")?,
            deductible: self.parse(record, "oon_deductible")?,
            deductible_remaining: None,
            out_of_pocket_max: self.parse(record, "oon_out_of_pocket_max")?,
            out_of_pocket_remaining: None,
        };
        let limit = BenefitLimit {
            quantity: self.parse(record, "limit_quantity")?,
            quantity_period: self.parse_period(record, "limit_quantity_period")?,
            amount: self.parse(record, "limit_amount")?,
            amount_period: self.parse_period(record, "limit_amount_period")?,
        };

        Ok(EligibilityRule {
            rule_id,
            name: self
                .field(record, "name")
                .map(str::to_string)
                .unwrap_or_else(|| plan_code.clone()),
            description: self.field(record, "description").map(str::to_string),
            plan_code,
            service_type_code,
            coverage,
            prior_auth_required: self.parse_bool(record, "prior_auth_required", false)?,
            referral_required: self.parse_bool(record, "referral_required", false)?,
            in_network,
            out_of_network: Some(out_of_network).filter(|sharing| !sharing.is_empty()),
            limit: Some(limit).filter(|limit| !limit.is_empty()),
            min_age: self.parse(record, "min_age")?,
            max_age: self.parse(record, "max_age")?,
            genders: self.parse_genders(record, "genders")?,
            effective_start: self.parse_date(record, "effective_start")?,
            effective_end: self.parse_date(record, "effective_end")?,
            priority,
            active: self.parse_bool(record, "active", true)?,
        })
    }
}

/// Load rules from a CSV file.
///
/// Malformed rows are skipped and reported, never fatal. A file whose every
/// data row is malformed fails the load; a file with no data rows at all is
/// an empty rule set.
pub fn load_rules_from_path(
    path: impl AsRef<Path>,
) -> RuleResult<(Vec<EligibilityRule>, LoadReport)> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let columns = ColumnMap::resolve(&headers)?;

    let mut rules = Vec::new();
    let mut report = LoadReport::default();
    for (offset, record) in reader.records().enumerate() {
        // data rows start on line 2, after the header
        let line = offset as u64 + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(line, error = %err, "skipping unreadable rule row");
                report.skipped.push(RowDiagnostic {
                    line,
                    reason: format!("unreadable row: {err}"),
                });
                continue;
            }
        };
        match columns.rule_from_record(&record) {
            Ok(rule) => rules.push(rule),
            Err(reason) => {
                warn!(line, %reason, "skipping rule row");
                report.skipped.push(RowDiagnostic { line, reason });
            }
        }
    }
    report.loaded = rules.len();

    if rules.is_empty() {
        if report.skipped.is_empty() {
            return Err(RuleError::EmptyRuleSet);
        }
        return Err(RuleError::RuleLoadError(format!(
            "no valid rules in {} ({} rows skipped)",
            path.display(),
            report.skipped.len()
        )));
    }

    info!(
        path = %path.display(),
        loaded = report.loaded,
        skipped = report.skipped.len(),
        "rule set loaded"
    );
    Ok((rules, report))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const HEADER: &str = "rule_id,name,description,plan_code,service_type_code,coverage,priority,active,prior_auth_required,referral_required,effective_start,effective_end,min_age,max_age,genders,copay,coinsurance_percent,deductible,deductible_remaining,out_of_pocket_max,out_of_pocket_remaining,oon_copay,oon_coinsurance_percent,oon_deductible,oon_out_of_pocket_max,limit_quantity,limit_quantity_period,limit_amount,limit_amount_period";

    fn write_temp_csv(label: &str, rows: &[&str]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "covergate-rules-{}-{}.csv",
            label,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        path
    }

    #[test]
    fn loads_a_well_formed_file() {
        let path = write_temp_csv(
            "ok",
            &[
                "R1,Gold PPO,Primary care copay,PPO_GOLD,30,covered,100,true,false,false,2024-01-01,2024-12-31,,,,25,20,1500,500,6000,4200,50,40,3000,,,,,",
                "R2,Gold PPO,,PPO_GOLD,MH,limited,100,true,true,true,,,,,,40,,,,,,,,,,20,year,,",
                "R3,Fallback,,*,30,covered,900,true,false,false,,,,,,,,,,,,,,,,,,,",
            ],
        );
        let (rules, report) = load_rules_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(report.loaded, 3);
        assert!(report.skipped.is_empty());

        let first = &rules[0];
        assert_eq!(first.rule_id, "R1");
        assert_eq!(first.coverage, CoverageIndicator::Covered);
        assert_eq!(first.in_network.copay, Some(25.0));
        assert_eq!(first.in_network.deductible_remaining, Some(500.0));
        assert_eq!(
            first.out_of_network.as_ref().and_then(|oon| oon.copay),
            Some(50.0)
        );
        assert_eq!(
            first.effective_start,
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(first.description.as_deref(), Some("Primary care copay"));

        let second = &rules[1];
        assert!(second.prior_auth_required);
        assert_eq!(
            second.limit.as_ref().and_then(|limit| limit.quantity),
            Some(20.0)
        );
        assert_eq!(
            second.limit.as_ref().and_then(|limit| limit.quantity_period),
            Some(LimitPeriod::Year)
        );
        assert!(second.out_of_network.is_none());

        assert_eq!(rules[2].plan_code, EligibilityRule::WILDCARD_PLAN);
    }

    #[test]
    fn malformed_rows_are_skipped_with_line_numbers() {
        let path = write_temp_csv(
            "mixed",
            &[
                "R1,Gold PPO,,PPO_GOLD,30,covered,100,,,,,,,,,,,,,,,,,,,,,,",
                "R2,Gold PPO,,PPO_GOLD,30,sometimes,100,,,,,,,,,,,,,,,,,,,,,,",
                "R3,Gold PPO,,PPO_GOLD,30,covered,not-a-number,,,,,,,,,,,,,,,,,,,,,,",
                ",Gold PPO,,PPO_GOLD,30,covered,100,,,,,,,,,,,,,,,,,,,,,,",
            ],
        );
        let (rules, report) = load_rules_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(rules.len(), 1);
        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped.len(), 3);
        assert_eq!(report.skipped[0].line, 3);
        assert!(report.skipped[0].reason.contains("sometimes"));
        assert_eq!(report.skipped[1].line, 4);
        assert!(report.skipped[1].reason.contains("priority"));
        assert_eq!(report.skipped[2].line, 5);
        assert!(report.skipped[2].reason.contains("rule_id"));
    }

    #[test]
    fn missing_required_column_fails_the_load() {
        let path = std::env::temp_dir().join(format!(
            "covergate-rules-noheader-{}.csv",
            std::process::id()
        ));
        std::fs::write(&path, "rule_id,plan_code,coverage\nR1,PPO_GOLD,covered\n").unwrap();
        let err = load_rules_from_path(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, RuleError::RuleLoadError(_)));
        assert!(err.to_string().contains("service_type_code"));
    }

    #[test]
    fn all_rows_invalid_fails_the_load() {
        let path = write_temp_csv(
            "allbad",
            &["R1,,,PPO_GOLD,30,bogus,100,,,,,,,,,,,,,,,,,,,,,,"],
        );
        let err = load_rules_from_path(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, RuleError::RuleLoadError(_)));
    }

    #[test]
    fn header_only_file_is_an_empty_rule_set() {
        let path = write_temp_csv("empty", &[]);
        let err = load_rules_from_path(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, RuleError::EmptyRuleSet));
    }

    #[test]
    fn gender_tokens_parse_pipe_separated() {
        let path = write_temp_csv(
            "genders",
            &["R1,Maternity,,PPO_GOLD,*,covered,100,,,,,,,,F|M,,,,,,,,,,,,,,"],
        );
        let (rules, _) = load_rules_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(
            rules[0].genders,
            Some(vec![Gender::Female, Gender::Male])
        );
    }
}
