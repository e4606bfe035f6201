use async_trait::async_trait;

use super::DatabaseError;
use super::models::{
    BlogComment, BlogPost, Event, Member, NewBlogComment, NewBlogPost, NewMember, PartySnapshot,
    Rsvp, RsvpStatus,
};
use crate::gear::GearStatus;

#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn get_member(&self, id: i64) -> Result<Option<Member>, DatabaseError>;
    async fn get_member_by_discord_id(
        &self,
        discord_id: &str,
    ) -> Result<Option<Member>, DatabaseError>;
    async fn list_members(&self) -> Result<Vec<Member>, DatabaseError>;
    async fn create_member(&self, member: &NewMember) -> Result<Member, DatabaseError>;
    async fn update_member(&self, id: i64, member: &NewMember) -> Result<Member, DatabaseError>;
    async fn delete_member(&self, id: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait GearStore: Send + Sync {
    async fn get_gear_status(&self, member_id: i64) -> Result<Option<GearStatus>, DatabaseError>;
    async fn list_gear_statuses(&self) -> Result<Vec<GearStatus>, DatabaseError>;
    /// Replaces the whole snapshot for `status.member_id`.
    async fn save_gear_status(&self, status: &GearStatus) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_event(&self, id: &str) -> Result<Option<Event>, DatabaseError>;
    async fn list_events(&self) -> Result<Vec<Event>, DatabaseError>;
    /// Inserts or fully replaces the event with `event.id`.
    async fn upsert_event(&self, event: &Event) -> Result<(), DatabaseError>;
    async fn delete_event(&self, id: &str) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait RsvpStore: Send + Sync {
    /// Insert-or-update keyed on `(event_id, member_id)`; returns the stored row.
    async fn upsert_rsvp(
        &self,
        event_id: &str,
        member_id: i64,
        status: RsvpStatus,
    ) -> Result<Rsvp, DatabaseError>;
    async fn get_rsvp(&self, event_id: &str, member_id: i64)
    -> Result<Option<Rsvp>, DatabaseError>;
    async fn list_rsvps_for_event(&self, event_id: &str) -> Result<Vec<Rsvp>, DatabaseError>;
    async fn delete_rsvp(&self, event_id: &str, member_id: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, post: &NewBlogPost) -> Result<BlogPost, DatabaseError>;
    async fn get_post(&self, id: i64) -> Result<Option<BlogPost>, DatabaseError>;
    /// Newest first.
    async fn list_posts(&self) -> Result<Vec<BlogPost>, DatabaseError>;
    async fn delete_post(&self, id: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Fails with `NotFound` when `post_id` has no post.
    async fn create_comment(
        &self,
        post_id: i64,
        comment: &NewBlogComment,
    ) -> Result<BlogComment, DatabaseError>;
    /// Oldest first.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<BlogComment>, DatabaseError>;
}

#[async_trait]
pub trait PartyStore: Send + Sync {
    async fn get_party_snapshot(&self) -> Result<Option<PartySnapshot>, DatabaseError>;
    /// Replaces the whole board.
    async fn save_party_snapshot(
        &self,
        data: &serde_json::Value,
    ) -> Result<PartySnapshot, DatabaseError>;
}
