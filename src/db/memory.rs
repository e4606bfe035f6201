use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::gear::GearStatus;

use super::{
    DatabaseError,
    models::{
        BlogComment, BlogPost, Event, Member, NewBlogComment, NewBlogPost, NewMember,
        PartySnapshot, Rsvp, RsvpStatus,
    },
};

#[derive(Default)]
struct Tables {
    members: BTreeMap<i64, Member>,
    gear: BTreeMap<i64, GearStatus>,
    events: HashMap<String, Event>,
    rsvps: BTreeMap<(String, i64), Rsvp>,
    posts: BTreeMap<i64, BlogPost>,
    comments: BTreeMap<i64, BlogComment>,
    party: Option<PartySnapshot>,
    next_member_id: i64,
    next_rsvp_id: i64,
    next_post_id: i64,
    next_comment_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// In-process backend selected with `memory://`. Keeps the same key and
/// reference rules as the SQL schemas.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ensure_unique_discord_id(
    tables: &Tables,
    discord_id: Option<&str>,
    except: Option<i64>,
) -> Result<(), DatabaseError> {
    let Some(discord_id) = discord_id else {
        return Ok(());
    };
    let taken = tables
        .members
        .values()
        .any(|m| m.discord_id.as_deref() == Some(discord_id) && Some(m.id) != except);
    if taken {
        return Err(DatabaseError::Conflict(format!(
            "discord id {discord_id} already linked to another member"
        )));
    }
    Ok(())
}

#[async_trait]
impl super::MemberStore for MemoryStore {
    async fn get_member(&self, id: i64) -> Result<Option<Member>, DatabaseError> {
        Ok(self.tables.read().members.get(&id).cloned())
    }

    async fn get_member_by_discord_id(
        &self,
        discord_id: &str,
    ) -> Result<Option<Member>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .members
            .values()
            .find(|m| m.discord_id.as_deref() == Some(discord_id))
            .cloned())
    }

    async fn list_members(&self) -> Result<Vec<Member>, DatabaseError> {
        Ok(self.tables.read().members.values().cloned().collect())
    }

    async fn create_member(&self, member: &NewMember) -> Result<Member, DatabaseError> {
        let mut tables = self.tables.write();
        ensure_unique_discord_id(&tables, member.discord_id.as_deref(), None)?;

        let now = Utc::now();
        let id = Tables::next_id(&mut tables.next_member_id);
        let created = Member {
            id,
            display_name: member.display_name.clone(),
            discord_id: member.discord_id.clone(),
            data_center: member.data_center.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.members.insert(id, created.clone());
        Ok(created)
    }

    async fn update_member(&self, id: i64, member: &NewMember) -> Result<Member, DatabaseError> {
        let mut tables = self.tables.write();
        ensure_unique_discord_id(&tables, member.discord_id.as_deref(), Some(id))?;

        let existing = tables
            .members
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("member {id}")))?;
        existing.display_name = member.display_name.clone();
        existing.discord_id = member.discord_id.clone();
        existing.data_center = member.data_center.clone();
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete_member(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write();
        let removed = tables.members.remove(&id).is_some();
        if removed {
            tables.gear.remove(&id);
            tables.rsvps.retain(|(_, member_id), _| *member_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl super::GearStore for MemoryStore {
    async fn get_gear_status(&self, member_id: i64) -> Result<Option<GearStatus>, DatabaseError> {
        Ok(self.tables.read().gear.get(&member_id).cloned())
    }

    async fn list_gear_statuses(&self) -> Result<Vec<GearStatus>, DatabaseError> {
        Ok(self.tables.read().gear.values().cloned().collect())
    }

    async fn save_gear_status(&self, status: &GearStatus) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write();
        if !tables.members.contains_key(&status.member_id) {
            return Err(DatabaseError::NotFound(format!(
                "member {}",
                status.member_id
            )));
        }
        tables.gear.insert(status.member_id, status.clone());
        Ok(())
    }
}

#[async_trait]
impl super::EventStore for MemoryStore {
    async fn get_event(&self, id: &str) -> Result<Option<Event>, DatabaseError> {
        Ok(self.tables.read().events.get(id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, DatabaseError> {
        let mut events: Vec<Event> = self.tables.read().events.values().cloned().collect();
        events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn upsert_event(&self, event: &Event) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write();
        let mut stored = event.clone();
        if let Some(existing) = tables.events.get(&event.id) {
            stored.created_at = existing.created_at;
        }
        tables.events.insert(stored.id.clone(), stored);
        Ok(())
    }

    async fn delete_event(&self, id: &str) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write();
        let removed = tables.events.remove(id).is_some();
        if removed {
            tables.rsvps.retain(|(event_id, _), _| event_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl super::RsvpStore for MemoryStore {
    async fn upsert_rsvp(
        &self,
        event_id: &str,
        member_id: i64,
        status: RsvpStatus,
    ) -> Result<Rsvp, DatabaseError> {
        let mut tables = self.tables.write();
        if !tables.events.contains_key(event_id) {
            return Err(DatabaseError::NotFound(format!("event {event_id}")));
        }
        if !tables.members.contains_key(&member_id) {
            return Err(DatabaseError::NotFound(format!("member {member_id}")));
        }

        let now = Utc::now();
        let key = (event_id.to_string(), member_id);
        if let Some(existing) = tables.rsvps.get_mut(&key) {
            existing.status = status;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = Tables::next_id(&mut tables.next_rsvp_id);
        let rsvp = Rsvp {
            id,
            event_id: event_id.to_string(),
            member_id,
            status,
            created_at: now,
            updated_at: now,
        };
        tables.rsvps.insert(key, rsvp.clone());
        Ok(rsvp)
    }

    async fn get_rsvp(
        &self,
        event_id: &str,
        member_id: i64,
    ) -> Result<Option<Rsvp>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .rsvps
            .get(&(event_id.to_string(), member_id))
            .cloned())
    }

    async fn list_rsvps_for_event(&self, event_id: &str) -> Result<Vec<Rsvp>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .rsvps
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn delete_rsvp(&self, event_id: &str, member_id: i64) -> Result<bool, DatabaseError> {
        Ok(self
            .tables
            .write()
            .rsvps
            .remove(&(event_id.to_string(), member_id))
            .is_some())
    }
}

#[async_trait]
impl super::PostStore for MemoryStore {
    async fn create_post(&self, post: &NewBlogPost) -> Result<BlogPost, DatabaseError> {
        let mut tables = self.tables.write();
        let id = Tables::next_id(&mut tables.next_post_id);
        let created = BlogPost {
            id,
            title: post.title.clone(),
            content: post.content.clone(),
            category: post.category.clone(),
            author_name: post.author_name.clone(),
            image_url: post.image_url.clone(),
            created_at: Utc::now(),
        };
        tables.posts.insert(id, created.clone());
        Ok(created)
    }

    async fn get_post(&self, id: i64) -> Result<Option<BlogPost>, DatabaseError> {
        Ok(self.tables.read().posts.get(&id).cloned())
    }

    async fn list_posts(&self) -> Result<Vec<BlogPost>, DatabaseError> {
        let mut posts: Vec<BlogPost> = self.tables.read().posts.values().cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn delete_post(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write();
        let removed = tables.posts.remove(&id).is_some();
        if removed {
            tables.comments.retain(|_, comment| comment.post_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl super::CommentStore for MemoryStore {
    async fn create_comment(
        &self,
        post_id: i64,
        comment: &NewBlogComment,
    ) -> Result<BlogComment, DatabaseError> {
        let mut tables = self.tables.write();
        if !tables.posts.contains_key(&post_id) {
            return Err(DatabaseError::NotFound(format!("post {post_id}")));
        }
        let id = Tables::next_id(&mut tables.next_comment_id);
        let created = BlogComment {
            id,
            post_id,
            content: comment.content.clone(),
            commenter_name: comment.commenter_name.clone(),
            created_at: Utc::now(),
        };
        tables.comments.insert(id, created.clone());
        Ok(created)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<BlogComment>, DatabaseError> {
        // BTreeMap order is insertion order since ids only grow.
        Ok(self
            .tables
            .read()
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl super::PartyStore for MemoryStore {
    async fn get_party_snapshot(&self) -> Result<Option<PartySnapshot>, DatabaseError> {
        Ok(self.tables.read().party.clone())
    }

    async fn save_party_snapshot(
        &self,
        data: &serde_json::Value,
    ) -> Result<PartySnapshot, DatabaseError> {
        let snapshot = PartySnapshot {
            data: data.clone(),
            updated_at: Utc::now(),
        };
        self.tables.write().party = Some(snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::MemoryStore;
    use crate::db::DatabaseError;
    use crate::db::{
        CommentStore, Event, EventStore, MemberStore, NewBlogComment, NewBlogPost, NewMember,
        PostStore, RsvpStatus, RsvpStore,
    };

    fn event(id: &str) -> Event {
        let now = Utc::now();
        Event {
            id: id.to_string(),
            title: "Savage prog".to_string(),
            description: String::new(),
            starts_at: now,
            ends_at: now + Duration::hours(2),
            location: None,
            max_participants: Some(8),
            party_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded() -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let member = store
            .create_member(&NewMember {
                display_name: "Alpha Tester".to_string(),
                discord_id: Some("111".to_string()),
                data_center: None,
            })
            .await
            .expect("create member");
        store.upsert_event(&event("abc-123")).await.expect("create event");
        (store, member.id)
    }

    #[tokio::test]
    async fn repeated_upsert_keeps_one_row_with_latest_status() {
        let (store, member_id) = seeded().await;

        let first = store
            .upsert_rsvp("abc-123", member_id, RsvpStatus::Maybe)
            .await
            .expect("first upsert");
        let second = store
            .upsert_rsvp("abc-123", member_id, RsvpStatus::Going)
            .await
            .expect("second upsert");

        assert_eq!(first.id, second.id);
        let rows = store.list_rsvps_for_event("abc-123").await.expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, RsvpStatus::Going);
    }

    #[tokio::test]
    async fn upsert_for_unknown_event_is_rejected() {
        let (store, member_id) = seeded().await;
        let err = store
            .upsert_rsvp("missing", member_id, RsvpStatus::Going)
            .await
            .expect_err("unknown event");
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn deleting_event_cascades_to_rsvps() {
        let (store, member_id) = seeded().await;
        store
            .upsert_rsvp("abc-123", member_id, RsvpStatus::Declined)
            .await
            .expect("upsert");

        assert!(store.delete_event("abc-123").await.expect("delete"));
        assert!(store.get_rsvp("abc-123", member_id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn discord_ids_are_unique_across_members() {
        let (store, _) = seeded().await;
        let err = store
            .create_member(&NewMember {
                display_name: "Impostor".to_string(),
                discord_id: Some("111".to_string()),
                data_center: None,
            })
            .await
            .expect_err("duplicate discord id");
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_post_cascades_to_comments() {
        let store = MemoryStore::new();
        let post = store
            .create_post(&NewBlogPost {
                title: "Week 3 clears".to_string(),
                content: "Two kills on the second floor.".to_string(),
                category: "progress".to_string(),
                author_name: "Alpha Tester".to_string(),
                image_url: None,
            })
            .await
            .expect("create post");
        store
            .create_comment(
                post.id,
                &NewBlogComment {
                    content: "gg".to_string(),
                    commenter_name: "Beta".to_string(),
                },
            )
            .await
            .expect("create comment");

        assert!(store.delete_post(post.id).await.expect("delete"));
        assert!(store.list_comments(post.id).await.expect("list").is_empty());

        let err = store
            .create_comment(post.id, &NewBlogComment::default())
            .await
            .expect_err("post is gone");
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }
}
