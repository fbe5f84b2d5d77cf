//! Url-encoded member form: decoding, field validation and HTML rendering.

use std::{collections::BTreeMap, fmt::Write};

use super::{
    repo_types::{Language, Member, Topic},
    services::{format_date, parse_date, parse_id, MemberInput},
};
use crate::error::AppError;

/// Field name → human readable message. Ordered so the page is stable.
pub type FieldErrors = BTreeMap<&'static str, &'static str>;

/// Raw form values as submitted (or as loaded from an existing member).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormValues {
    pub email: String,
    pub password: String,
    pub location: String,
    pub first_learn_date: String,
    pub fav_language: String,
    pub about: String,
    pub learn_new_interest: String,
    pub interest_in_topics: Vec<String>,
}

impl FormValues {
    /// Decodes an `application/x-www-form-urlencoded` body. Absent keys read as
    /// empty; `interest_in_topics` may repeat.
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut values = Self::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            let value = value.into_owned();
            match key.as_ref() {
                "email" => values.email = value,
                "password" => values.password = value,
                "location" => values.location = value,
                "first_learn_date" => values.first_learn_date = value,
                "fav_language" => values.fav_language = value,
                "about" => values.about = value,
                "learn_new_interest" => values.learn_new_interest = value,
                "interest_in_topics" => values.interest_in_topics.push(value),
                _ => {}
            }
        }
        values
    }

    /// Pre-fills the form from a stored member. The password stays blank.
    pub fn from_member(member: &Member, topics: &[Topic]) -> Result<Self, AppError> {
        Ok(Self {
            email: member.email.clone(),
            password: String::new(),
            location: member.location.clone(),
            first_learn_date: format_date(member.first_learn_date)?,
            fav_language: member.fav_language.to_string(),
            about: member.about.clone(),
            learn_new_interest: if member.learn_new_interest { "yes" } else { "no" }.to_string(),
            interest_in_topics: topics.iter().map(|t| t.id.to_string()).collect(),
        })
    }

    pub fn wants_to_learn(&self) -> bool {
        self.learn_new_interest == "yes"
    }

    /// Collects every empty field. Whitespace counts as a value. A password is
    /// only required when creating.
    pub fn validate(&self, editing: bool) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.email.is_empty() {
            errors.insert("email", "You must have an email address.");
        }
        if self.password.is_empty() && !editing {
            errors.insert("password", "You must have a password.");
        }
        if self.location.is_empty() {
            errors.insert("location", "You must have a location");
        }
        if self.first_learn_date.is_empty() {
            errors.insert("first_learn_date", "You must have first learn date.");
        }
        if self.fav_language.is_empty() {
            errors.insert("fav_language", "You must choose a favourite language.");
        }
        if self.about.is_empty() {
            errors.insert("about", "You must have an about section.");
        }
        if self.interest_in_topics.is_empty() {
            errors.insert("interest_in_topics", "You must choose at least one topic.");
        }
        errors
    }

    /// Converts validated values. Malformed dates and ids are request errors,
    /// not field errors.
    pub fn into_input(self) -> Result<MemberInput, AppError> {
        let learn_new_interest = self.wants_to_learn();
        let topic_ids = self
            .interest_in_topics
            .iter()
            .map(|v| parse_id("topic", v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MemberInput {
            first_learn_date: parse_date(&self.first_learn_date)?,
            fav_language: parse_id("language", &self.fav_language)?,
            email: self.email,
            password: Some(self.password).filter(|p| !p.is_empty()),
            location: self.location,
            about: self.about,
            learn_new_interest,
            topic_ids,
        })
    }
}

pub struct FormPage<'a> {
    pub member_id: Option<i64>,
    pub languages: &'a [Language],
    pub topics: &'a [Topic],
    pub values: &'a FormValues,
    pub errors: &'a FieldErrors,
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn field_error(out: &mut String, errors: &FieldErrors, field: &str) {
    if let Some(msg) = errors.get(field) {
        let _ = write!(out, r#"<p class="error" data-field="{field}">{}</p>"#, escape(msg));
    }
}

fn text_input(out: &mut String, page: &FormPage<'_>, name: &str, kind: &str, label: &str, value: &str) {
    let _ = write!(
        out,
        r#"<label for="{name}">{label}</label><input type="{kind}" id="{name}" name="{name}" value="{}">"#,
        escape(value)
    );
    field_error(out, page.errors, name);
}

pub fn render_form(page: &FormPage<'_>) -> String {
    let v = page.values;
    let (title, action) = match page.member_id {
        Some(id) => (format!("Edit member {id}"), format!("/{id}")),
        None => ("Register".to_string(), "/".to_string()),
    };

    let mut out = String::new();
    let _ = write!(
        out,
        r#"<!doctype html><html><head><meta charset="utf-8"><title>{title}</title></head><body><h1>{title}</h1><form method="POST" action="{action}">"#
    );

    text_input(&mut out, page, "email", "email", "Email", &v.email);
    text_input(&mut out, page, "password", "password", "Password", "");
    text_input(&mut out, page, "location", "text", "Location", &v.location);
    text_input(&mut out, page, "first_learn_date", "date", "First learned to code", &v.first_learn_date);

    out.push_str(r#"<label for="fav_language">Favourite language</label><select id="fav_language" name="fav_language">"#);
    for lang in page.languages {
        let selected = if v.fav_language == lang.id.to_string() { " selected" } else { "" };
        let _ = write!(out, r#"<option value="{}"{selected}>{}</option>"#, lang.id, escape(&lang.name));
    }
    out.push_str("</select>");
    field_error(&mut out, page.errors, "fav_language");

    let _ = write!(
        out,
        r#"<label for="about">About</label><textarea id="about" name="about">{}</textarea>"#,
        escape(&v.about)
    );
    field_error(&mut out, page.errors, "about");

    let (yes, no) = if v.wants_to_learn() { (" checked", "") } else { ("", " checked") };
    let _ = write!(
        out,
        r#"<fieldset><legend>Interested in learning something new?</legend><label><input type="radio" name="learn_new_interest" value="yes"{yes}> Yes</label><label><input type="radio" name="learn_new_interest" value="no"{no}> No</label></fieldset>"#
    );

    out.push_str("<fieldset><legend>Topics</legend>");
    for topic in page.topics {
        let id = topic.id.to_string();
        let checked = if v.interest_in_topics.contains(&id) { " checked" } else { "" };
        let _ = write!(
            out,
            r#"<label><input type="checkbox" name="interest_in_topics" value="{id}"{checked}> {}</label>"#,
            escape(&topic.name)
        );
    }
    out.push_str("</fieldset>");
    field_error(&mut out, page.errors, "interest_in_topics");

    out.push_str(r#"<button type="submit">Save</button></form></body></html>"#);
    out
}
