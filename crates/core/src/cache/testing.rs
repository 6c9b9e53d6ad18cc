//! In-memory collaborators for cache tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDateTime;

use crate::Error;
use crate::records::{Matter, MatterAttachment, MatterHistory, MatterSponsor, MatterText, MatterTextVersion, Vote};
use crate::source::{MatterFilter, ObjectSource, RecordApi};

#[derive(Default)]
struct Objects {
    bodies: HashMap<String, Bytes>,
    failures: HashMap<String, Error>,
    calls: HashMap<String, usize>,
    delay: Option<Duration>,
}

#[derive(Default)]
pub(crate) struct FakeObjectSource {
    state: Mutex<Objects>,
}

impl FakeObjectSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put(&self, key: &str, body: &str) {
        let mut state = self.state.lock().unwrap();
        state.failures.remove(key);
        state.bodies.insert(key.to_string(), Bytes::from(body.to_string()));
    }

    pub(crate) fn fail(&self, key: &str, err: Error) {
        self.state.lock().unwrap().failures.insert(key.to_string(), err);
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    pub(crate) fn calls(&self, key: &str) -> usize {
        self.state.lock().unwrap().calls.get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ObjectSource for FakeObjectSource {
    async fn open_object(&self, key: &str) -> Result<Bytes, Error> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            *state.calls.entry(key.to_string()).or_default() += 1;
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().unwrap();
        if let Some(err) = state.failures.get(key) {
            return Err(err.clone());
        }
        state.bodies.get(key).cloned().ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn describe(&self) -> String {
        "memory://fake".to_string()
    }
}

struct Records {
    matters: Vec<Matter>,
    sponsors: Vec<MatterSponsor>,
    histories: Vec<MatterHistory>,
    votes: Vec<Vote>,
    attachments: Vec<MatterAttachment>,
    versions: Vec<MatterTextVersion>,
    text: MatterText,
    url_base: String,
    failures: HashMap<&'static str, Error>,
    delays: HashMap<&'static str, Duration>,
    calls: HashMap<&'static str, usize>,
}

impl Default for Records {
    fn default() -> Self {
        Self {
            matters: Vec::new(),
            sponsors: Vec::new(),
            histories: Vec::new(),
            votes: vec![vote(1, "Jane Doe", "Affirmative"), vote(3, "John Roe", "Negative")],
            attachments: vec![MatterAttachment {
                matter_attachment_id: 77,
                matter_attachment_name: "Committee Report".into(),
                matter_attachment_hyperlink: "https://legistar.example/View.ashx?M=F&ID=77".into(),
                ..Default::default()
            }],
            versions: Vec::new(),
            text: MatterText::default(),
            url_base: "https://legistar.example/LegislationDetail.aspx?ID=".into(),
            failures: HashMap::new(),
            delays: HashMap::new(),
            calls: HashMap::new(),
        }
    }
}

/// Record API backed by fixed rows. Failures set with `fail_once` are
/// returned by the next call of that operation only.
#[derive(Default)]
pub(crate) struct FakeRecordApi {
    state: Mutex<Records>,
}

impl FakeRecordApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_matter(&self, matter: Matter) {
        self.state.lock().unwrap().matters.push(matter);
    }

    pub(crate) fn set_sponsors(&self, sponsors: Vec<MatterSponsor>) {
        self.state.lock().unwrap().sponsors = sponsors;
    }

    pub(crate) fn set_histories(&self, histories: Vec<MatterHistory>) {
        self.state.lock().unwrap().histories = histories;
    }

    pub(crate) fn set_versions(&self, versions: Vec<MatterTextVersion>) {
        self.state.lock().unwrap().versions = versions;
    }

    pub(crate) fn set_text(&self, text: MatterText) {
        self.state.lock().unwrap().text = text;
    }

    pub(crate) fn set_url_base(&self, base: &str) {
        self.state.lock().unwrap().url_base = base.to_string();
    }

    pub(crate) fn fail_once(&self, op: &'static str, err: Error) {
        self.state.lock().unwrap().failures.insert(op, err);
    }

    /// Make every later call of `op` sleep for `delay` before answering.
    pub(crate) fn set_delay(&self, op: &'static str, delay: Duration) {
        self.state.lock().unwrap().delays.insert(op, delay);
    }

    pub(crate) fn calls(&self, op: &str) -> usize {
        self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }

    async fn record<T>(&self, op: &'static str, read: impl FnOnce(&Records) -> T + Send) -> Result<T, Error> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            *state.calls.entry(op).or_default() += 1;
            state.delays.get(op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.failures.remove(op) {
            return Err(err);
        }
        Ok(read(&state))
    }
}

#[async_trait]
impl RecordApi for FakeRecordApi {
    async fn matters(&self, filter: &MatterFilter) -> Result<Vec<Matter>, Error> {
        self.record("matters", |s| {
            s.matters
                .iter()
                .filter(|m| m.matter_file == filter.file && m.matter_type_name == filter.type_name)
                .cloned()
                .collect()
        })
        .await
    }

    async fn matter_sponsors(&self, _matter_id: i64) -> Result<Vec<MatterSponsor>, Error> {
        self.record("matter_sponsors", |s| s.sponsors.clone()).await
    }

    async fn matter_histories(&self, _matter_id: i64) -> Result<Vec<MatterHistory>, Error> {
        self.record("matter_histories", |s| s.histories.clone()).await
    }

    async fn event_votes(&self, _history_id: i64) -> Result<Vec<Vote>, Error> {
        self.record("event_votes", |s| s.votes.clone()).await
    }

    async fn matter_attachments(&self, _matter_id: i64) -> Result<Vec<MatterAttachment>, Error> {
        self.record("matter_attachments", |s| s.attachments.clone()).await
    }

    async fn matter_text_versions(&self, _matter_id: i64) -> Result<Vec<MatterTextVersion>, Error> {
        self.record("matter_text_versions", |s| s.versions.clone()).await
    }

    async fn matter_text(&self, _matter_id: i64, _text_id: i64) -> Result<MatterText, Error> {
        self.record("matter_text", |s| s.text.clone()).await
    }

    async fn resolve_canonical_url(&self, matter_id: i64) -> Result<String, Error> {
        self.record("resolve_canonical_url", |s| format!("{}{matter_id}", s.url_base)).await
    }
}

pub(crate) fn matter(id: i64, file: &str, type_name: &str) -> Matter {
    Matter {
        matter_id: id,
        matter_guid: format!("GUID-{id}"),
        matter_file: file.to_string(),
        matter_name: format!("Matter {id}"),
        matter_type_name: type_name.to_string(),
        ..Default::default()
    }
}

pub(crate) fn sponsor(name_id: i64, name: &str, version: &str) -> MatterSponsor {
    MatterSponsor {
        matter_sponsor_name_id: name_id,
        matter_sponsor_name: name.to_string(),
        matter_sponsor_matter_version: version.to_string(),
        ..Default::default()
    }
}

pub(crate) fn history(id: i64, date: &str, action: &str, flag_name: Option<&str>) -> MatterHistory {
    MatterHistory {
        matter_history_id: id,
        matter_history_action_date: NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S").ok(),
        matter_history_action_name: action.to_string(),
        matter_history_passed_flag_name: flag_name.map(str::to_string),
        ..Default::default()
    }
}

fn vote(person_id: i64, name: &str, value: &str) -> Vote {
    Vote {
        vote_person_id: person_id,
        vote_person_name: name.to_string(),
        vote_value_name: value.to_string(),
        ..Default::default()
    }
}
