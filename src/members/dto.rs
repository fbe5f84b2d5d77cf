use serde::{Deserialize, Serialize};

use super::repo_types::{Language, Topic};

/// `{id, name}` pair used for languages and topics in JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefJson {
    pub id: i64,
    pub name: String,
}

impl From<Language> for RefJson {
    fn from(l: Language) -> Self {
        Self { id: l.id, name: l.name }
    }
}

impl From<Topic> for RefJson {
    fn from(t: Topic) -> Self {
        Self { id: t.id, name: t.name }
    }
}

/// Serialized member aggregate. Never carries password material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberJson {
    pub id: i64,
    pub email: String,
    pub location: String,
    pub first_learn_date: String, // YYYY-MM-DD
    pub fav_language: RefJson,
    pub about: String,
    pub learn_new_interest: bool,
    pub interest_in_topics: Vec<RefJson>,
}

#[derive(Debug, Serialize)]
pub struct MemberEnvelope {
    pub member: MemberJson,
}

#[derive(Debug, Serialize)]
pub struct MembersEnvelope {
    pub members: Vec<MemberJson>,
}

/// Reference to a row by id; other keys (e.g. `name`) are ignored.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IdRef {
    pub id: i64,
}

/// JSON body accepted by create and edit. Every field is optional at the
/// decoding level so a missing one surfaces as `AppError::MissingField`.
#[derive(Debug, Default, Deserialize)]
pub struct MemberBody {
    pub email: Option<String>,
    pub password: Option<String>,
    pub location: Option<String>,
    pub first_learn_date: Option<String>,
    pub fav_language: Option<IdRef>,
    pub about: Option<String>,
    #[serde(default)]
    pub learn_new_interest: bool,
    pub interest_in_topics: Option<Vec<IdRef>>,
}
