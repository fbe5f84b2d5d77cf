use serde::Serialize;
use sqlx::FromRow;
use time::Date;

use super::password::PasswordHash;

/// Programming language, seeded reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Language {
    pub id: i64,
    pub name: String,
}

/// Topic a member can be interested in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Topic {
    pub id: i64,
    pub name: String,
}

/// Member row in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Member {
    pub id: i64,
    pub email: String,
    password_hash: PasswordHash, // write-only through set_password
    pub location: String,
    pub first_learn_date: Date,
    pub fav_language: i64,
    pub about: String,
    pub learn_new_interest: bool,
}

impl Member {
    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    pub fn set_password(&mut self, plain: &str) -> anyhow::Result<()> {
        self.password_hash = PasswordHash::from_plaintext(plain)?;
        Ok(())
    }

    pub(crate) fn from_new(id: i64, new: NewMember) -> Self {
        Self {
            id,
            email: new.email,
            password_hash: new.password_hash,
            location: new.location,
            first_learn_date: new.first_learn_date,
            fav_language: new.fav_language,
            about: new.about,
            learn_new_interest: new.learn_new_interest,
        }
    }
}

/// A member staged for insertion; the id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub email: String,
    pub password_hash: PasswordHash,
    pub location: String,
    pub first_learn_date: Date,
    pub fav_language: i64,
    pub about: String,
    pub learn_new_interest: bool,
}

/// One row of the member/topic association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRow)]
pub struct MemberTopic {
    pub member_id: i64,
    pub topic_id: i64,
}
