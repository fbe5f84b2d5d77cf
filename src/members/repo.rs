use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use super::repo_types::{Language, Member, MemberTopic, NewMember, Topic};
use crate::{db::PgStore, error::AppError};

/// Persistence capabilities the member screens rely on.
///
/// Writes that touch the association (`insert_member`, `update_member`,
/// `delete_member`) are atomic: either the row and all its topic links change,
/// or nothing does. `topic_ids` must already be de-duplicated.
#[async_trait]
pub trait MemberRepo: Send + Sync {
    async fn list_languages(&self) -> Result<Vec<Language>, AppError>;
    async fn get_language(&self, id: i64) -> Result<Option<Language>, AppError>;

    async fn list_topics(&self) -> Result<Vec<Topic>, AppError>;
    async fn get_topic(&self, id: i64) -> Result<Option<Topic>, AppError>;

    async fn list_members(&self) -> Result<Vec<Member>, AppError>;
    async fn get_member(&self, id: i64) -> Result<Option<Member>, AppError>;
    async fn insert_member(&self, new: NewMember, topic_ids: &[i64]) -> Result<Member, AppError>;
    async fn update_member(&self, member: &Member, topic_ids: &[i64]) -> Result<Member, AppError>;
    async fn delete_member(&self, id: i64) -> Result<bool, AppError>;

    /// Topics of a member, in the order they were linked.
    async fn member_topics(&self, member_id: i64) -> Result<Vec<Topic>, AppError>;
    /// Members linked to a topic, by member id.
    async fn topic_members(&self, topic_id: i64) -> Result<Vec<Member>, AppError>;
}

const MEMBER_COLUMNS: &str = "id, email, password_hash, location, first_learn_date, \
                              fav_language, about, learn_new_interest";

async fn insert_member_topics(
    conn: &mut PgConnection,
    links: &[MemberTopic],
) -> Result<(), AppError> {
    if links.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO member_topic (member_id, topic_id, position) ");
    qb.push_values(links.iter().enumerate(), |mut b, (pos, link)| {
        b.push_bind(link.member_id)
            .push_bind(link.topic_id)
            .push_bind(pos as i32);
    });
    qb.build()
        .execute(conn)
        .await
        .map_err(AppError::from_db)?;
    Ok(())
}

fn links(member_id: i64, topic_ids: &[i64]) -> Vec<MemberTopic> {
    topic_ids
        .iter()
        .map(|&topic_id| MemberTopic { member_id, topic_id })
        .collect()
}

#[async_trait]
impl MemberRepo for PgStore {
    async fn list_languages(&self) -> Result<Vec<Language>, AppError> {
        let rows = sqlx::query_as::<_, Language>("SELECT id, name FROM language ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_language(&self, id: i64) -> Result<Option<Language>, AppError> {
        let row = sqlx::query_as::<_, Language>("SELECT id, name FROM language WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, AppError> {
        let rows = sqlx::query_as::<_, Topic>("SELECT id, name FROM topic ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_topic(&self, id: i64) -> Result<Option<Topic>, AppError> {
        let row = sqlx::query_as::<_, Topic>("SELECT id, name FROM topic WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM member ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_member(&self, id: i64) -> Result<Option<Member>, AppError> {
        let row = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM member WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_member(&self, new: NewMember, topic_ids: &[i64]) -> Result<Member, AppError> {
        let mut tx = self.pool.begin().await?;

        let member = sqlx::query_as::<_, Member>(&format!(
            r#"
            INSERT INTO member (email, password_hash, location, first_learn_date,
                                fav_language, about, learn_new_interest)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.location)
        .bind(new.first_learn_date)
        .bind(new.fav_language)
        .bind(&new.about)
        .bind(new.learn_new_interest)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from_db)?;

        insert_member_topics(&mut tx, &links(member.id, topic_ids)).await?;
        tx.commit().await?;
        Ok(member)
    }

    async fn update_member(&self, member: &Member, topic_ids: &[i64]) -> Result<Member, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Member>(&format!(
            r#"
            UPDATE member
               SET email = $2, password_hash = $3, location = $4, first_learn_date = $5,
                   fav_language = $6, about = $7, learn_new_interest = $8
             WHERE id = $1
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(member.id)
        .bind(&member.email)
        .bind(member.password_hash())
        .bind(&member.location)
        .bind(member.first_learn_date)
        .bind(member.fav_language)
        .bind(&member.about)
        .bind(member.learn_new_interest)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from_db)?
        .ok_or(AppError::MemberNotFound(member.id))?;

        sqlx::query("DELETE FROM member_topic WHERE member_id = $1")
            .bind(member.id)
            .execute(&mut *tx)
            .await?;
        insert_member_topics(&mut tx, &links(member.id, topic_ids)).await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_member(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM member_topic WHERE member_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let res = sqlx::query("DELETE FROM member WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn member_topics(&self, member_id: i64) -> Result<Vec<Topic>, AppError> {
        let rows = sqlx::query_as::<_, Topic>(
            r#"
            SELECT t.id, t.name
              FROM member_topic mt
              JOIN topic t ON t.id = mt.topic_id
             WHERE mt.member_id = $1
             ORDER BY mt.position ASC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn topic_members(&self, topic_id: i64) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query_as::<_, Member>(
            r#"
            SELECT m.id, m.email, m.password_hash, m.location, m.first_learn_date,
                   m.fav_language, m.about, m.learn_new_interest
              FROM member_topic mt
              JOIN member m ON m.id = mt.member_id
             WHERE mt.topic_id = $1
             ORDER BY m.id ASC
            "#,
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_pair_member_with_each_topic() {
        let rows = links(7, &[3, 1]);
        assert_eq!(
            rows,
            vec![
                MemberTopic { member_id: 7, topic_id: 3 },
                MemberTopic { member_id: 7, topic_id: 1 },
            ]
        );
    }
}
