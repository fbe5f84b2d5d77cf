use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    members::{
        repo::MemberRepo,
        repo_types::{Language, Member, MemberTopic, NewMember, Topic},
    },
    orders::{
        repo::OrderRepo,
        repo_types::{Order, OrderProduct, Product, User},
    },
};

/// Reference rows seeded by `migrations/0002_seed.sql`, in id order.
pub const SEED_LANGUAGES: &[&str] = &["Python", "JavaScript", "Rust", "Go", "Java", "C#"];
pub const SEED_TOPICS: &[&str] = &[
    "Web Apps",
    "Mobile Apps",
    "APIs",
    "Data Science",
    "DevOps",
    "Games",
];

#[derive(Default)]
struct Tables {
    languages: BTreeMap<i64, Language>,
    topics: BTreeMap<i64, Topic>,
    members: BTreeMap<i64, Member>,
    member_topics: Vec<MemberTopic>,
    users: BTreeMap<i64, User>,
    orders: BTreeMap<i64, Order>,
    products: BTreeMap<i64, Product>,
    order_products: Vec<OrderProduct>,
    last_member_id: i64,
    last_user_id: i64,
    last_order_id: i64,
    last_product_id: i64,
}

impl Tables {
    fn check_member_refs(&self, fav_language: i64, topic_ids: &[i64]) -> Result<(), AppError> {
        if !self.languages.contains_key(&fav_language) {
            return Err(AppError::Integrity(format!(
                "member.fav_language references missing language {fav_language}"
            )));
        }
        let mut seen = HashSet::new();
        for id in topic_ids {
            if !self.topics.contains_key(id) {
                return Err(AppError::Integrity(format!(
                    "member_topic.topic_id references missing topic {id}"
                )));
            }
            if !seen.insert(*id) {
                return Err(AppError::Integrity(format!(
                    "duplicate member_topic pair for topic {id}"
                )));
            }
        }
        Ok(())
    }

    fn check_order_refs(&self, user_id: i64, product_ids: &[i64]) -> Result<(), AppError> {
        if !self.users.contains_key(&user_id) {
            return Err(AppError::Integrity(format!(
                "order.user_id references missing user {user_id}"
            )));
        }
        let mut seen = HashSet::new();
        for id in product_ids {
            if !self.products.contains_key(id) {
                return Err(AppError::Integrity(format!(
                    "order_product.product_id references missing product {id}"
                )));
            }
            if !seen.insert(*id) {
                return Err(AppError::Integrity(format!(
                    "duplicate order_product pair for product {id}"
                )));
            }
        }
        Ok(())
    }

    fn link_products(&mut self, order_id: i64, product_ids: &[i64]) {
        self.order_products
            .extend(product_ids.iter().map(|&product_id| OrderProduct { order_id, product_id }));
    }

    fn link_topics(&mut self, member_id: i64, topic_ids: &[i64]) {
        self.member_topics
            .extend(topic_ids.iter().map(|&topic_id| MemberTopic { member_id, topic_id }));
    }
}

/// Process-local store used by tests and `APP_STORE=memory`.
///
/// Enforces the same foreign-key and composite-key rules as the schema.
/// Each operation holds the lock for its whole duration, which makes it atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with the same languages and topics as the migrations.
    pub fn seeded() -> Self {
        let mut tables = Tables::default();
        for (i, name) in SEED_LANGUAGES.iter().enumerate() {
            let id = i as i64 + 1;
            tables.languages.insert(id, Language { id, name: name.to_string() });
        }
        for (i, name) in SEED_TOPICS.iter().enumerate() {
            let id = i as i64 + 1;
            tables.topics.insert(id, Topic { id, name: name.to_string() });
        }
        Self { tables: RwLock::new(tables) }
    }
}

#[async_trait]
impl MemberRepo for MemoryStore {
    async fn list_languages(&self) -> Result<Vec<Language>, AppError> {
        Ok(self.tables.read().await.languages.values().cloned().collect())
    }

    async fn get_language(&self, id: i64) -> Result<Option<Language>, AppError> {
        Ok(self.tables.read().await.languages.get(&id).cloned())
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, AppError> {
        Ok(self.tables.read().await.topics.values().cloned().collect())
    }

    async fn get_topic(&self, id: i64) -> Result<Option<Topic>, AppError> {
        Ok(self.tables.read().await.topics.get(&id).cloned())
    }

    async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        Ok(self.tables.read().await.members.values().cloned().collect())
    }

    async fn get_member(&self, id: i64) -> Result<Option<Member>, AppError> {
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    async fn insert_member(&self, new: NewMember, topic_ids: &[i64]) -> Result<Member, AppError> {
        let mut t = self.tables.write().await;
        t.check_member_refs(new.fav_language, topic_ids)?;

        t.last_member_id += 1;
        let member = Member::from_new(t.last_member_id, new);
        t.members.insert(member.id, member.clone());
        t.link_topics(member.id, topic_ids);
        Ok(member)
    }

    async fn update_member(&self, member: &Member, topic_ids: &[i64]) -> Result<Member, AppError> {
        let mut t = self.tables.write().await;
        if !t.members.contains_key(&member.id) {
            return Err(AppError::MemberNotFound(member.id));
        }
        t.check_member_refs(member.fav_language, topic_ids)?;

        t.members.insert(member.id, member.clone());
        t.member_topics.retain(|link| link.member_id != member.id);
        t.link_topics(member.id, topic_ids);
        Ok(member.clone())
    }

    async fn delete_member(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables.write().await;
        t.member_topics.retain(|link| link.member_id != id);
        Ok(t.members.remove(&id).is_some())
    }

    async fn member_topics(&self, member_id: i64) -> Result<Vec<Topic>, AppError> {
        let t = self.tables.read().await;
        Ok(t.member_topics
            .iter()
            .filter(|link| link.member_id == member_id)
            .filter_map(|link| t.topics.get(&link.topic_id).cloned())
            .collect())
    }

    async fn topic_members(&self, topic_id: i64) -> Result<Vec<Member>, AppError> {
        let t = self.tables.read().await;
        let mut members: Vec<Member> = t
            .member_topics
            .iter()
            .filter(|link| link.topic_id == topic_id)
            .filter_map(|link| t.members.get(&link.member_id).cloned())
            .collect();
        members.sort_by_key(|m| m.id);
        Ok(members)
    }
}

#[async_trait]
impl OrderRepo for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert_user(&self, name: &str, date_joined: OffsetDateTime) -> Result<User, AppError> {
        let mut t = self.tables.write().await;
        t.last_user_id += 1;
        let user = User { id: t.last_user_id, name: name.to_string(), date_joined };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: i64, name: &str) -> Result<Option<User>, AppError> {
        let mut t = self.tables.write().await;
        Ok(t.users.get_mut(&id).map(|user| {
            user.name = name.to_string();
            user.clone()
        }))
    }

    async fn delete_user(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables.write().await;
        if t.orders.values().any(|o| o.user_id == id) {
            return Err(AppError::Integrity(format!("orders still reference user {id}")));
        }
        Ok(t.users.remove(&id).is_some())
    }

    async fn user_orders(&self, user_id: i64) -> Result<Vec<Order>, AppError> {
        let t = self.tables.read().await;
        Ok(t.orders.values().filter(|o| o.user_id == user_id).cloned().collect())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        Ok(self.tables.read().await.orders.values().cloned().collect())
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>, AppError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn insert_order(
        &self,
        user_id: i64,
        total: i64,
        product_ids: &[i64],
    ) -> Result<Order, AppError> {
        let mut t = self.tables.write().await;
        t.check_order_refs(user_id, product_ids)?;

        t.last_order_id += 1;
        let order = Order { id: t.last_order_id, total, user_id };
        t.orders.insert(order.id, order.clone());
        t.link_products(order.id, product_ids);
        Ok(order)
    }

    async fn update_order(
        &self,
        id: i64,
        user_id: i64,
        total: i64,
        product_ids: &[i64],
    ) -> Result<Option<Order>, AppError> {
        let mut t = self.tables.write().await;
        if !t.orders.contains_key(&id) {
            return Ok(None);
        }
        t.check_order_refs(user_id, product_ids)?;

        let order = Order { id, total, user_id };
        t.orders.insert(id, order.clone());
        t.order_products.retain(|link| link.order_id != id);
        t.link_products(id, product_ids);
        Ok(Some(order))
    }

    async fn delete_order(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables.write().await;
        t.order_products.retain(|link| link.order_id != id);
        Ok(t.orders.remove(&id).is_some())
    }

    async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>, AppError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn insert_product(&self, name: &str) -> Result<Product, AppError> {
        let mut t = self.tables.write().await;
        t.last_product_id += 1;
        let product = Product { id: t.last_product_id, name: name.to_string() };
        t.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: i64, name: &str) -> Result<Option<Product>, AppError> {
        let mut t = self.tables.write().await;
        Ok(t.products.get_mut(&id).map(|product| {
            product.name = name.to_string();
            product.clone()
        }))
    }

    async fn delete_product(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables.write().await;
        t.order_products.retain(|link| link.product_id != id);
        Ok(t.products.remove(&id).is_some())
    }

    async fn order_products(&self, order_id: i64) -> Result<Vec<Product>, AppError> {
        let t = self.tables.read().await;
        Ok(t.order_products
            .iter()
            .filter(|link| link.order_id == order_id)
            .filter_map(|link| t.products.get(&link.product_id).cloned())
            .collect())
    }

    async fn product_orders(&self, product_id: i64) -> Result<Vec<Order>, AppError> {
        let t = self.tables.read().await;
        Ok(t.order_products
            .iter()
            .filter(|link| link.product_id == product_id)
            .filter_map(|link| t.orders.get(&link.order_id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::members::password::PasswordHash;

    fn new_member(fav_language: i64) -> NewMember {
        NewMember {
            email: "a@b.com".into(),
            password_hash: PasswordHash::raw("$argon2id$stub"),
            location: "NY".into(),
            first_learn_date: date!(2023 - 01 - 01),
            fav_language,
            about: "hi".into(),
            learn_new_interest: true,
        }
    }

    #[tokio::test]
    async fn seeded_reference_data_matches_seed_lists() {
        let store = MemoryStore::seeded();
        let langs = store.list_languages().await.unwrap();
        assert_eq!(langs.len(), SEED_LANGUAGES.len());
        assert_eq!(langs[0], Language { id: 1, name: "Python".into() });
        assert_eq!(store.get_topic(3).await.unwrap().unwrap().name, "APIs");
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_links_topics_in_order() {
        let store = MemoryStore::seeded();
        let a = store.insert_member(new_member(1), &[2, 1]).await.unwrap();
        let b = store.insert_member(new_member(1), &[]).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        let topics: Vec<i64> = store.member_topics(a.id).await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(topics, vec![2, 1]);
    }

    #[tokio::test]
    async fn rejects_missing_language_and_duplicate_pairs() {
        let store = MemoryStore::seeded();
        let err = store.insert_member(new_member(99), &[1]).await.unwrap_err();
        assert!(matches!(err, AppError::Integrity(_)));

        let err = store.insert_member(new_member(1), &[1, 1]).await.unwrap_err();
        assert!(matches!(err, AppError::Integrity(_)));
        assert!(store.list_members().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_links_and_delete_clears_them() {
        let store = MemoryStore::seeded();
        let m = store.insert_member(new_member(1), &[1, 2]).await.unwrap();
        store.update_member(&m, &[3]).await.unwrap();

        assert!(store.topic_members(1).await.unwrap().is_empty());
        assert_eq!(store.topic_members(3).await.unwrap().len(), 1);

        assert!(store.delete_member(m.id).await.unwrap());
        assert!(store.topic_members(3).await.unwrap().is_empty());
        assert!(!store.delete_member(m.id).await.unwrap());
    }

    #[tokio::test]
    async fn user_with_orders_cannot_be_deleted() {
        let store = MemoryStore::new();
        let user = store.insert_user("Python User", OffsetDateTime::UNIX_EPOCH).await.unwrap();
        let p = store.insert_product("First").await.unwrap();
        let order = store.insert_order(user.id, 99, &[p.id]).await.unwrap();

        assert_eq!(store.product_orders(p.id).await.unwrap(), vec![order]);
        let err = store.delete_user(user.id).await.unwrap_err();
        assert!(matches!(err, AppError::Integrity(_)));
    }

    #[tokio::test]
    async fn order_update_replaces_product_links() {
        let store = MemoryStore::new();
        let alice = store.insert_user("Alice", OffsetDateTime::UNIX_EPOCH).await.unwrap();
        let bob = store.insert_user("Bob", OffsetDateTime::UNIX_EPOCH).await.unwrap();
        let a = store.insert_product("A").await.unwrap();
        let b = store.insert_product("B").await.unwrap();
        let order = store.insert_order(alice.id, 10, &[a.id]).await.unwrap();

        let updated = store
            .update_order(order.id, bob.id, 25, &[b.id, a.id])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated, Order { id: order.id, total: 25, user_id: bob.id });
        let names: Vec<String> = store
            .order_products(order.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
        assert!(store.user_orders(alice.id).await.unwrap().is_empty());

        let err = store.update_order(order.id, 99, 1, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Integrity(_)));
        assert_eq!(store.update_order(42, bob.id, 1, &[]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_orders_and_products_clears_links() {
        let store = MemoryStore::new();
        let user = store.insert_user("Carol", OffsetDateTime::UNIX_EPOCH).await.unwrap();
        let a = store.insert_product("A").await.unwrap();
        let b = store.insert_product("B").await.unwrap();
        let first = store.insert_order(user.id, 1, &[a.id, b.id]).await.unwrap();
        let second = store.insert_order(user.id, 2, &[a.id]).await.unwrap();

        assert!(store.delete_product(a.id).await.unwrap());
        assert_eq!(store.order_products(first.id).await.unwrap(), vec![b.clone()]);
        assert!(store.order_products(second.id).await.unwrap().is_empty());
        assert!(!store.delete_product(a.id).await.unwrap());

        assert!(store.delete_order(first.id).await.unwrap());
        assert!(store.product_orders(b.id).await.unwrap().is_empty());
        assert_eq!(store.user_orders(user.id).await.unwrap(), vec![second]);

        let renamed = store.update_user(user.id, "Caroline").await.unwrap().unwrap();
        assert_eq!(renamed.name, "Caroline");
        assert_eq!(store.update_product(a.id, "gone").await.unwrap(), None);
    }
}
