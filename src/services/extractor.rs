use regex::Regex;

use crate::models::job::{JobField, JobRecord};

/// One extraction rule: the field it fills, the pattern searched anywhere in
/// the message, and the capture group holding the value.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: JobField,
    pub pattern: &'static str,
    pub group: usize,
}

/// Extraction table for work-order messages.
///
/// Rules are independent of each other. Materials is the only multi-line
/// field: `(?s)` lets it run across lines up to the first blank line or the
/// end of the text.
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: JobField::JobId,
        pattern: r"JOB\s*:\s*(\S+)",
        group: 1,
    },
    FieldRule {
        field: JobField::Date,
        pattern: r":: Created\s*>>\s*(\d{2}-\w{3}-\d{2})",
        group: 1,
    },
    FieldRule {
        field: JobField::CmTeam,
        pattern: r"CM-(\w+)",
        group: 1,
    },
    FieldRule {
        field: JobField::Tel,
        pattern: r"Tel\s*:\s*(\d{10,13})",
        group: 1,
    },
    FieldRule {
        field: JobField::SequenceNo,
        pattern: r":: ใบงานที่\s*(\d+)",
        group: 1,
    },
    FieldRule {
        field: JobField::Priority,
        pattern: r":: priority\s*:\s*(\w+)",
        group: 1,
    },
    FieldRule {
        field: JobField::AssignTime,
        pattern: r":: Call Center C-Fiber Assign\s*>>\s*(\d{2}-\w{3}-\d{2} \d{2}[:.]\d{2})",
        group: 1,
    },
    FieldRule {
        field: JobField::AcceptTime,
        pattern: r":: Accept\s*:\s*(\d{2}[.:]\d{2})",
        group: 1,
    },
    FieldRule {
        field: JobField::NoAlarmTime,
        pattern: r":: No Alarm\s*:\s*(\d{2}[:.]\d{2})",
        group: 1,
    },
    FieldRule {
        field: JobField::DetailDown,
        pattern: r":: สาเหตุเสีย\s*:\s*(.+)",
        group: 1,
    },
    FieldRule {
        field: JobField::Zone,
        pattern: r"Zone\s*:\s*(\w+)",
        group: 1,
    },
    FieldRule {
        field: JobField::Materials,
        pattern: r"(?s):: รายการ Material ที่ใช้งาน\s*(.*?)(?:\n\s*\n|$)",
        group: 1,
    },
];

struct CompiledRule {
    field: JobField,
    regex: Regex,
    group: usize,
}

/// Pulls [`JobRecord`] fields out of free-text work-order messages.
pub struct FieldExtractor {
    rules: Vec<CompiledRule>,
}

impl FieldExtractor {
    /// Compile the default [`FIELD_RULES`] table.
    pub fn new() -> Result<Self, ExtractorError> {
        Self::with_rules(FIELD_RULES)
    }

    pub fn with_rules(rules: &[FieldRule]) -> Result<Self, ExtractorError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(rule.pattern)
                    .map(|regex| CompiledRule {
                        field: rule.field,
                        regex,
                        group: rule.group,
                    })
                    .map_err(|source| ExtractorError::Pattern {
                        field: rule.field,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    /// Apply every rule to `text`. Fields without a match stay `N/A`.
    pub fn extract(&self, text: &str) -> JobRecord {
        let mut record = JobRecord::default();
        for rule in &self.rules {
            let value = rule
                .regex
                .captures(text)
                .and_then(|caps| caps.get(rule.group))
                .map(|m| m.as_str().trim());

            if let Some(value) = value {
                record.set(rule.field, value);
            }
        }
        record
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    #[error("Invalid pattern for field '{field}': {source}")]
    Pattern {
        field: JobField,
        #[source]
        source: regex::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::NOT_AVAILABLE;

    const SAMPLE_MESSAGE: &str = "\
:: ใบงานที่ 17
JOB : J2024-0815
:: Created >> 14-Mar-24
CM-NORTH1
Tel : 0812345678
:: priority : High
:: Call Center C-Fiber Assign >> 14-Mar-24 09:15
:: Accept : 09.32
:: No Alarm : 11:05
:: สาเหตุเสีย : Fiber cut near pole 12
Zone : BKK3
:: รายการ Material ที่ใช้งาน
- Fiber cable 100 m
- Splice closure 1 pc

Reported by field team";

    fn extractor() -> FieldExtractor {
        FieldExtractor::new().expect("default rules compile")
    }

    #[test]
    fn test_extract_full_message() {
        let record = extractor().extract(SAMPLE_MESSAGE);

        assert_eq!(record.get(JobField::JobId), "J2024-0815");
        assert_eq!(record.get(JobField::Date), "14-Mar-24");
        assert_eq!(record.get(JobField::CmTeam), "NORTH1");
        assert_eq!(record.get(JobField::Tel), "0812345678");
        assert_eq!(record.get(JobField::SequenceNo), "17");
        assert_eq!(record.get(JobField::Priority), "High");
        assert_eq!(record.get(JobField::AssignTime), "14-Mar-24 09:15");
        assert_eq!(record.get(JobField::AcceptTime), "09.32");
        assert_eq!(record.get(JobField::NoAlarmTime), "11:05");
        assert_eq!(record.get(JobField::DetailDown), "Fiber cut near pole 12");
        assert_eq!(record.get(JobField::Zone), "BKK3");
        assert_eq!(
            record.get(JobField::Materials),
            "- Fiber cable 100 m\n- Splice closure 1 pc"
        );
    }

    #[test]
    fn test_job_id_and_date_only() {
        let record = extractor().extract("JOB : J1001\n:: Created >> 01-Jan-24");

        let mut expected = vec!["J1001".to_string(), "01-Jan-24".to_string()];
        expected.extend(std::iter::repeat(NOT_AVAILABLE.to_string()).take(10));
        assert_eq!(record.to_row(), expected);
    }

    #[test]
    fn test_no_job_id() {
        let record = extractor().extract("Tel : 0812345678\nZone : BKK1");
        assert_eq!(record.job_id(), None);
        assert_eq!(record.get(JobField::Tel), "0812345678");
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(extractor().extract(""), JobRecord::default());
    }

    #[test]
    fn test_pattern_is_searched_not_anchored() {
        let record = extractor().extract("please update JOB: J77 thanks");
        assert_eq!(record.job_id(), Some("J77"));
    }

    #[test]
    fn test_first_match_wins() {
        let record = extractor().extract("JOB : FIRST\nJOB : SECOND");
        assert_eq!(record.job_id(), Some("FIRST"));
    }

    #[test]
    fn test_tel_requires_ten_digits() {
        let record = extractor().extract("Tel : 12345");
        assert_eq!(record.get(JobField::Tel), NOT_AVAILABLE);
    }

    #[test]
    fn test_detail_stops_at_line_end() {
        let record = extractor().extract(":: สาเหตุเสีย : power outage\r\nZone : X1");
        assert_eq!(record.get(JobField::DetailDown), "power outage");
        assert_eq!(record.get(JobField::Zone), "X1");
    }

    #[test]
    fn test_materials_runs_to_end_of_text() {
        let record = extractor().extract(":: รายการ Material ที่ใช้งาน\n- connector 2 pcs\n- tape\n");
        assert_eq!(record.get(JobField::Materials), "- connector 2 pcs\n- tape");
    }

    #[test]
    fn test_materials_heading_without_items() {
        let record = extractor().extract(":: รายการ Material ที่ใช้งาน");
        assert_eq!(record.get(JobField::Materials), NOT_AVAILABLE);
    }

    #[test]
    fn test_assign_time_accepts_dot_separator() {
        let record = extractor().extract(":: Call Center C-Fiber Assign >> 02-Feb-24 18.40");
        assert_eq!(record.get(JobField::AssignTime), "02-Feb-24 18.40");
    }

    #[test]
    fn test_invalid_custom_rule_is_reported() {
        let rules = [FieldRule {
            field: JobField::Zone,
            pattern: r"Zone\s*:\s*(\w+",
            group: 1,
        }];
        let err = FieldExtractor::with_rules(&rules).err().expect("pattern should fail");
        assert!(err.to_string().contains("CM Zone"));
    }
}
