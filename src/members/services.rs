use time::{macros::format_description, Date};
use tracing::{debug, info};

use super::{
    dto::{MemberBody, MemberJson, RefJson},
    password::PasswordHash,
    repo::MemberRepo,
    repo_types::{Member, NewMember},
};
use crate::error::AppError;

/// Field values for a create or edit, after decoding but before any lookups.
#[derive(Debug, Clone)]
pub struct MemberInput {
    pub email: String,
    pub password: Option<String>,
    pub location: String,
    pub first_learn_date: Date,
    pub fav_language: i64,
    pub about: String,
    pub learn_new_interest: bool,
    pub topic_ids: Vec<i64>,
}

pub fn parse_date(s: &str) -> Result<Date, AppError> {
    let fmt = format_description!("[year]-[month]-[day]");
    Date::parse(s.trim(), fmt).map_err(|_| AppError::InvalidDate(s.to_string()))
}

pub fn format_date(d: Date) -> Result<String, AppError> {
    let fmt = format_description!("[year]-[month]-[day]");
    d.format(fmt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("format date: {e}")))
}

pub fn parse_id(field: &'static str, value: &str) -> Result<i64, AppError> {
    value.trim().parse::<i64>().map_err(|_| AppError::InvalidId {
        field,
        value: value.to_string(),
    })
}

impl MemberBody {
    /// Requires every field except `password`; no emptiness checks.
    pub fn into_input(self) -> Result<MemberInput, AppError> {
        let date = self
            .first_learn_date
            .ok_or(AppError::MissingField("first_learn_date"))?;
        Ok(MemberInput {
            email: self.email.ok_or(AppError::MissingField("email"))?,
            password: self.password,
            location: self.location.ok_or(AppError::MissingField("location"))?,
            first_learn_date: parse_date(&date)?,
            fav_language: self
                .fav_language
                .ok_or(AppError::MissingField("fav_language"))?
                .id,
            about: self.about.ok_or(AppError::MissingField("about"))?,
            learn_new_interest: self.learn_new_interest,
            topic_ids: self
                .interest_in_topics
                .ok_or(AppError::MissingField("interest_in_topics"))?
                .into_iter()
                .map(|r| r.id)
                .collect(),
        })
    }
}

/// Looks up every submitted topic id, keeping the first occurrence of duplicates.
async fn resolve_topics(repo: &dyn MemberRepo, ids: &[i64]) -> Result<Vec<i64>, AppError> {
    let mut resolved: Vec<i64> = Vec::with_capacity(ids.len());
    for &id in ids {
        if resolved.contains(&id) {
            continue;
        }
        repo.get_topic(id)
            .await?
            .ok_or(AppError::UnknownReference { kind: "topic", id })?;
        resolved.push(id);
    }
    Ok(resolved)
}

/// Creates a member when `existing` is `None`, otherwise edits it in place.
///
/// On edit the password is only replaced when a non-empty one is supplied,
/// and the topic links are replaced wholesale.
pub async fn save_member(
    repo: &dyn MemberRepo,
    existing: Option<Member>,
    input: MemberInput,
) -> Result<Member, AppError> {
    repo.get_language(input.fav_language)
        .await?
        .ok_or(AppError::UnknownReference {
            kind: "language",
            id: input.fav_language,
        })?;
    let topic_ids = resolve_topics(repo, &input.topic_ids).await?;

    match existing {
        Some(mut member) => {
            member.email = input.email;
            if let Some(plain) = input.password.as_deref().filter(|p| !p.is_empty()) {
                member.set_password(plain)?;
                debug!(member_id = member.id, "password replaced");
            }
            member.location = input.location;
            member.first_learn_date = input.first_learn_date;
            member.fav_language = input.fav_language;
            member.about = input.about;
            member.learn_new_interest = input.learn_new_interest;

            let saved = repo.update_member(&member, &topic_ids).await?;
            info!(member_id = saved.id, topics = topic_ids.len(), "member updated");
            Ok(saved)
        }
        None => {
            let plain = input.password.ok_or(AppError::MissingField("password"))?;
            let new = NewMember {
                email: input.email,
                password_hash: PasswordHash::from_plaintext(&plain)?,
                location: input.location,
                first_learn_date: input.first_learn_date,
                fav_language: input.fav_language,
                about: input.about,
                learn_new_interest: input.learn_new_interest,
            };
            let saved = repo.insert_member(new, &topic_ids).await?;
            info!(member_id = saved.id, topics = topic_ids.len(), "member created");
            Ok(saved)
        }
    }
}

/// Expands a member with its language and topics into the JSON shape.
pub async fn member_to_json(repo: &dyn MemberRepo, member: &Member) -> Result<MemberJson, AppError> {
    let language = repo
        .get_language(member.fav_language)
        .await?
        .ok_or(AppError::DanglingReference {
            kind: "language",
            id: member.fav_language,
        })?;
    let topics = repo.member_topics(member.id).await?;

    Ok(MemberJson {
        id: member.id,
        email: member.email.clone(),
        location: member.location.clone(),
        first_learn_date: format_date(member.first_learn_date)?,
        fav_language: language.into(),
        about: member.about.clone(),
        learn_new_interest: member.learn_new_interest,
        interest_in_topics: topics.into_iter().map(RefJson::from).collect(),
    })
}
