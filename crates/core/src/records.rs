//! Records returned by the legislative-records API.
//!
//! Field names follow the upstream JSON (`MatterId`, `MatterFile`, ...). Every
//! field is defaulted so a sparse upstream row still decodes.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::text;

/// A piece of legislation as stored upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Matter {
    pub matter_id: i64,
    pub matter_guid: String,
    pub matter_file: String,
    pub matter_name: String,
    pub matter_title: String,
    pub matter_type_name: String,
    pub matter_status_name: String,
    pub matter_body_name: String,
    pub matter_intro_date: Option<NaiveDateTime>,
    pub matter_agenda_date: Option<NaiveDateTime>,
    pub matter_passed_date: Option<NaiveDateTime>,
    pub matter_enactment_date: Option<NaiveDateTime>,
    pub matter_enactment_number: Option<String>,
    pub matter_version: String,
    pub matter_last_modified_utc: Option<NaiveDateTime>,
}

/// Sponsor row; one per sponsor per matter version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MatterSponsor {
    pub matter_sponsor_id: i64,
    pub matter_sponsor_matter_id: i64,
    pub matter_sponsor_matter_version: String,
    pub matter_sponsor_name_id: i64,
    pub matter_sponsor_name: String,
    pub matter_sponsor_sequence: i32,
}

/// One action in a matter's history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MatterHistory {
    pub matter_history_id: i64,
    pub matter_history_event_id: Option<i64>,
    pub matter_history_agenda_sequence: Option<i32>,
    pub matter_history_action_date: Option<NaiveDateTime>,
    pub matter_history_action_name: String,
    pub matter_history_action_text: Option<String>,
    pub matter_history_action_body_name: String,
    pub matter_history_passed_flag: Option<i32>,
    pub matter_history_passed_flag_name: Option<String>,
    pub matter_history_version: String,
    pub matter_history_tally: Option<String>,
}

impl MatterHistory {
    /// True when the action carries a pass/fail outcome, which means a
    /// roll-call exists for it.
    pub fn has_outcome(&self) -> bool {
        self.matter_history_passed_flag_name.as_deref().is_some_and(|name| !name.trim().is_empty())
    }
}

/// Roll-call vote cast by one person on one history item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Vote {
    pub vote_id: i64,
    pub vote_person_id: i64,
    pub vote_person_name: String,
    pub vote_value_name: String,
    pub vote_result: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MatterAttachment {
    pub matter_attachment_id: i64,
    pub matter_attachment_name: String,
    pub matter_attachment_hyperlink: String,
    pub matter_attachment_file_name: String,
    pub matter_attachment_last_modified_utc: Option<NaiveDateTime>,
}

/// Entry of the text-version list. `key` is the text id, `value` the
/// version label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MatterTextVersion {
    pub key: String,
    pub value: String,
}

/// Pick the most recent text version: the numerically highest text id.
pub fn latest_text_id(versions: &[MatterTextVersion]) -> Option<i64> {
    versions.iter().filter_map(|v| v.key.trim().parse::<i64>().ok()).max()
}

/// Full text of one version of a matter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MatterText {
    pub matter_text_id: i64,
    pub matter_text_version: String,
    pub matter_text_plain: Option<String>,
    pub matter_text_rtf: Option<String>,
}

impl MatterText {
    /// Plain text with normalized whitespace.
    pub fn simplified_text(&self) -> String {
        self.matter_text_plain.as_deref().map(text::simplify_plain).unwrap_or_default()
    }

    /// Minimal HTML rendering of the RTF body.
    pub fn simplified_rtf(&self) -> String {
        self.matter_text_rtf.as_deref().map(text::simplify_rtf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_matter() {
        let json = r#"{
            "MatterId": 68917,
            "MatterGuid": "2A9F7D8C",
            "MatterFile": "Int 1234-2020",
            "MatterName": "Bike lanes",
            "MatterTypeName": "Introduction",
            "MatterIntroDate": "2020-01-08T00:00:00",
            "MatterVersion": "A",
            "MatterLastModifiedUtc": "2020-03-01T16:23:56.747",
            "MatterUnknownField": true
        }"#;
        let matter: Matter = serde_json::from_str(json).unwrap();
        assert_eq!(matter.matter_id, 68917);
        assert_eq!(matter.matter_file, "Int 1234-2020");
        assert_eq!(matter.matter_version, "A");
        assert!(matter.matter_intro_date.is_some());
        assert!(matter.matter_passed_date.is_none());
        assert_eq!(matter.matter_title, "");
    }

    #[test]
    fn test_history_outcome() {
        let mut h = MatterHistory::default();
        assert!(!h.has_outcome());
        h.matter_history_passed_flag_name = Some(" ".into());
        assert!(!h.has_outcome());
        h.matter_history_passed_flag_name = Some("Pass".into());
        assert!(h.has_outcome());
    }

    #[test]
    fn test_latest_text_id() {
        let versions = vec![
            MatterTextVersion { key: "9".into(), value: "".into() },
            MatterTextVersion { key: "120".into(), value: "A".into() },
            MatterTextVersion { key: "junk".into(), value: "B".into() },
        ];
        assert_eq!(latest_text_id(&versions), Some(120));
        assert_eq!(latest_text_id(&[]), None);
    }
}
