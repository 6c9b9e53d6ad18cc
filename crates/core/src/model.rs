//! Assembled bill detail and snapshot document types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bill_id::BillId;
use crate::records::{Matter, MatterAttachment, MatterHistory, MatterSponsor, Vote as VoteRecord};

/// Contents of `build/last_sync.json`, written by the snapshot batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastSync {
    #[serde(rename = "LastRun")]
    pub last_run: DateTime<Utc>,
}

/// Fully assembled detail view of one bill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Legislation {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "GUID")]
    pub guid: String,
    pub file: String,
    pub name: String,
    pub title: String,
    pub type_name: String,
    pub status_name: String,
    pub body_name: String,
    pub intro_date: Option<NaiveDateTime>,
    pub agenda_date: Option<NaiveDateTime>,
    pub passed_date: Option<NaiveDateTime>,
    pub enactment_date: Option<NaiveDateTime>,
    pub enactment_number: Option<String>,
    pub version: String,
    pub last_modified: Option<NaiveDateTime>,
    pub sponsors: Vec<PersonReference>,
    pub history: Vec<History>,
    pub attachments: Vec<Attachment>,
    #[serde(rename = "TextID")]
    pub text_id: Option<i64>,
    pub text: String,
    #[serde(rename = "RTF")]
    pub rtf: String,
}

impl Legislation {
    /// Core fields copied from the upstream record; collections start empty.
    pub fn from_matter(m: Matter) -> Self {
        Self {
            id: m.matter_id,
            guid: m.matter_guid,
            file: m.matter_file,
            name: m.matter_name,
            title: m.matter_title,
            type_name: m.matter_type_name,
            status_name: m.matter_status_name,
            body_name: m.matter_body_name,
            intro_date: m.matter_intro_date,
            agenda_date: m.matter_agenda_date,
            passed_date: m.matter_passed_date,
            enactment_date: m.matter_enactment_date,
            enactment_number: m.matter_enactment_number,
            version: m.matter_version,
            last_modified: m.matter_last_modified_utc,
            ..Default::default()
        }
    }

    /// Path identifier derived from the file number, if it is well formed.
    pub fn bill_id(&self) -> Option<BillId> {
        BillId::from_file(&self.file).ok()
    }

    pub fn primary_sponsor(&self) -> Option<&PersonReference> {
        self.sponsors.first()
    }

    pub fn sponsored_by(&self, person_id: i64) -> bool {
        self.sponsors.iter().any(|s| s.id == person_id)
    }

    /// History entries that record a committee or council approval vote.
    pub fn votes(&self) -> impl Iterator<Item = &History> {
        self.history
            .iter()
            .filter(|h| matches!(h.action.as_str(), "Approved by Committee" | "Approved by Council"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PersonReference {
    #[serde(rename = "ID")]
    pub id: i64,
    pub full_name: String,
}

impl From<MatterSponsor> for PersonReference {
    fn from(s: MatterSponsor) -> Self {
        Self { id: s.matter_sponsor_name_id, full_name: s.matter_sponsor_name.trim().to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct History {
    #[serde(rename = "ID")]
    pub id: i64,
    pub date: Option<NaiveDateTime>,
    pub action: String,
    pub action_text: Option<String>,
    pub body_name: String,
    pub passed_flag: Option<i32>,
    pub passed_flag_name: String,
    #[serde(rename = "EventID")]
    pub event_id: Option<i64>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub votes: Vec<Vote>,
}

impl From<MatterHistory> for History {
    fn from(h: MatterHistory) -> Self {
        Self {
            id: h.matter_history_id,
            date: h.matter_history_action_date,
            action: h.matter_history_action_name,
            action_text: h.matter_history_action_text,
            body_name: h.matter_history_action_body_name,
            passed_flag: h.matter_history_passed_flag,
            passed_flag_name: h.matter_history_passed_flag_name.unwrap_or_default(),
            event_id: h.matter_history_event_id,
            version: h.matter_history_version,
            votes: Vec::new(),
        }
    }
}

impl History {
    fn tally(&self) -> (usize, usize, usize) {
        self.votes.iter().fold((0, 0, 0), |(ayes, nays, abstains), v| match v.vote.as_str() {
            "Affirmative" => (ayes + 1, nays, abstains),
            "Negative" => (ayes, nays + 1, abstains),
            "Abstain" => (ayes, nays, abstains + 1),
            _ => (ayes, nays, abstains),
        })
    }

    pub fn vote_passed(&self) -> bool {
        let (ayes, nays, _) = self.tally();
        ayes > nays
    }

    /// Tally formatted as `ayes:abstains:nays`.
    pub fn vote_summary(&self) -> String {
        let (ayes, nays, abstains) = self.tally();
        format!("{ayes}:{abstains}:{nays}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vote {
    #[serde(rename = "PersonID")]
    pub person_id: i64,
    pub full_name: String,
    pub vote: String,
    pub result: Option<i32>,
}

impl From<VoteRecord> for Vote {
    fn from(v: VoteRecord) -> Self {
        Self {
            person_id: v.vote_person_id,
            full_name: v.vote_person_name.trim().to_string(),
            vote: v.vote_value_name,
            result: v.vote_result,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
    pub link: String,
}

impl From<MatterAttachment> for Attachment {
    fn from(a: MatterAttachment) -> Self {
        Self { id: a.matter_attachment_id, name: a.matter_attachment_name, link: a.matter_attachment_hyperlink }
    }
}
