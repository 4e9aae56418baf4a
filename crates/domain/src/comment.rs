use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};

use crate::error::DomainError;
use crate::models::{CommentId, CommentRecord, ContentFormat, SectionKey, UserId};

pub type CustomDataMap = Map<String, Value>;

/// Custom data of a comment. Only one representation is live at a time;
/// reading one form converts in place.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomData {
    Raw(String),
    Decoded(CustomDataMap),
}

impl Default for CustomData {
    fn default() -> Self {
        CustomData::Raw(String::new())
    }
}

impl CustomData {
    pub fn decoded(&mut self) -> Result<&CustomDataMap, DomainError> {
        match *self {
            CustomData::Decoded(ref map) => Ok(map),
            CustomData::Raw(ref json) => {
                *self = CustomData::Decoded(decode(json)?);
                self.decoded()
            }
        }
    }

    pub fn encoded(&mut self) -> Result<&str, DomainError> {
        match *self {
            CustomData::Raw(ref json) => Ok(json),
            CustomData::Decoded(ref map) => {
                *self = CustomData::Raw(encode(map)?);
                self.encoded()
            }
        }
    }

    /// Decodes without touching the live representation.
    pub fn to_map(&self) -> Result<CustomDataMap, DomainError> {
        match self {
            CustomData::Raw(json) => decode(json),
            CustomData::Decoded(map) => Ok(map.clone()),
        }
    }

    pub fn to_json(&self) -> Result<String, DomainError> {
        match self {
            CustomData::Raw(json) => Ok(json.clone()),
            CustomData::Decoded(map) => encode(map),
        }
    }
}

fn decode(json: &str) -> Result<CustomDataMap, DomainError> {
    if json.trim().is_empty() {
        return Ok(Map::new());
    }
    Ok(serde_json::from_str(json)?)
}

fn encode(map: &CustomDataMap) -> Result<String, DomainError> {
    if map.is_empty() {
        return Ok(String::new());
    }
    Ok(serde_json::to_string(map)?)
}

/// Fields a caller supplies for a comment that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub format: ContentFormat,
    pub user_id: UserId,
    pub pseudonym: Option<String>,
    pub reply_to: Option<CommentId>,
    pub custom_data_json: String,
}

#[derive(Debug, Clone)]
pub struct Comment {
    id: Option<CommentId>,
    section: SectionKey,
    content: String,
    format: ContentFormat,
    user_created: UserId,
    user_modified: UserId,
    pseudonym: Option<String>,
    time_created: DateTime<Utc>,
    time_modified: DateTime<Utc>,
    reply_to: Option<CommentId>,
    replies: i64,
    upvotes: i64,
    custom_data: CustomData,
}

impl Comment {
    /// A comment that has not been saved yet. Counters start at zero.
    pub fn new(section: SectionKey, new: NewComment, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            section,
            content: new.content,
            format: new.format,
            user_created: new.user_id,
            user_modified: new.user_id,
            pseudonym: normalize_pseudonym(new.pseudonym.as_deref()),
            time_created: now,
            time_modified: now,
            reply_to: new.reply_to,
            replies: 0,
            upvotes: 0,
            custom_data: CustomData::Raw(new.custom_data_json),
        }
    }

    pub fn from_record(record: CommentRecord) -> Self {
        let section = record.section_key();
        Self {
            id: Some(record.id),
            section,
            content: record.content,
            format: record.format,
            user_created: record.user_id,
            user_modified: record.user_modified,
            pseudonym: normalize_pseudonym(record.pseudonym.as_deref()),
            time_created: record.time_created,
            time_modified: record.time_modified,
            reply_to: record.reply_to_id,
            replies: record.replies,
            upvotes: record.upvotes,
            custom_data: CustomData::Raw(record.custom_data),
        }
    }

    /// Snapshot for persistence. Encodes the custom data if it is held decoded.
    pub fn to_record(&mut self) -> Result<CommentRecord, DomainError> {
        let custom_data = self.custom_data.encoded()?.to_string();
        Ok(CommentRecord {
            id: self.id.unwrap_or_default(),
            context_id: self.section.context_id,
            component: self.section.component.clone(),
            area: self.section.area.clone(),
            item_id: self.section.item_id,
            content: self.content.clone(),
            format: self.format,
            user_id: self.user_created,
            user_modified: self.user_modified,
            pseudonym: self.pseudonym.clone(),
            time_created: self.time_created,
            time_modified: self.time_modified,
            reply_to_id: self.reply_to,
            replies: self.replies,
            upvotes: self.upvotes,
            custom_data,
        })
    }

    /// Called by the store once the row exists.
    pub fn mark_saved(&mut self, id: CommentId) {
        self.id = Some(id);
    }

    pub fn id(&self) -> Option<CommentId> {
        self.id
    }

    pub fn section(&self) -> &SectionKey {
        &self.section
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn format(&self) -> ContentFormat {
        self.format
    }

    /// `None` stands for the no-reply user: the author posted under a pseudonym.
    pub fn user_created_id(&self, reveal_identity: bool) -> Option<UserId> {
        if self.is_pseudonymous_author() && !reveal_identity {
            None
        } else {
            Some(self.user_created)
        }
    }

    /// The modifier is hidden only when it is the pseudonymous author.
    pub fn user_modified_id(&self, reveal_identity: bool) -> Option<UserId> {
        if self.is_pseudonymous_author()
            && self.user_modified == self.user_created
            && !reveal_identity
        {
            None
        } else {
            Some(self.user_modified)
        }
    }

    pub fn pseudonym(&self) -> Option<&str> {
        self.pseudonym.as_deref()
    }

    pub fn time_created(&self) -> DateTime<Utc> {
        self.time_created
    }

    pub fn time_modified(&self) -> DateTime<Utc> {
        self.time_modified
    }

    pub fn reply_to(&self) -> Option<CommentId> {
        self.reply_to
    }

    pub fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    pub fn replies(&self) -> i64 {
        self.replies
    }

    pub fn upvotes(&self) -> i64 {
        self.upvotes
    }

    pub fn is_pseudonymous_author(&self) -> bool {
        self.pseudonym.is_some()
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_created == user_id
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.time_created
    }

    pub fn custom_data(&mut self) -> Result<&CustomDataMap, DomainError> {
        self.custom_data.decoded()
    }

    pub fn custom_data_json(&mut self) -> Result<&str, DomainError> {
        self.custom_data.encoded()
    }

    /// Read-only view of the custom data, whichever form is live.
    pub fn custom_data_ref(&self) -> &CustomData {
        &self.custom_data
    }

    pub fn set_content(&mut self, content: impl Into<String>, format: ContentFormat) {
        self.content = content.into();
        self.format = format;
    }

    /// A pseudonym can be changed but never cleared once set.
    pub fn set_pseudonym(&mut self, pseudonym: &str) -> Result<(), DomainError> {
        match normalize_pseudonym(Some(pseudonym)) {
            Some(p) => {
                self.pseudonym = Some(p);
                Ok(())
            }
            None if self.is_pseudonymous_author() => Err(DomainError::CannotRemovePseudonym),
            None => Ok(()),
        }
    }

    pub fn set_custom_data(&mut self, data: CustomDataMap) {
        self.custom_data = CustomData::Decoded(data);
    }

    pub fn set_custom_data_json(&mut self, json: impl Into<String>) {
        self.custom_data = CustomData::Raw(json.into());
    }

    pub fn update_time_user(&mut self, user_id: UserId, time: Option<DateTime<Utc>>) {
        self.user_modified = user_id;
        self.time_modified = time.unwrap_or_else(Utc::now);
    }

    pub fn increment_upvotes(&mut self, delta: i64) {
        self.upvotes += delta;
    }
}

fn normalize_pseudonym(pseudonym: Option<&str>) -> Option<String> {
    pseudonym
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}
