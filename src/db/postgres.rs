use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::db::manager::Pool;
use crate::db::schema::{
    blog_comments, blog_posts, event_rsvps, events, gear_statuses, members, party_snapshots,
};
use crate::gear::{GearSet, GearStatus};

use super::{
    models::{
        BlogComment, BlogPost, Event, Member, NewBlogComment, NewBlogPost, NewMember,
        PartySnapshot, Rsvp, RsvpStatus,
    },
    DatabaseError,
};

fn query_error(err: DieselError) -> DatabaseError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            DatabaseError::NotFound(info.message().to_string())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            DatabaseError::Conflict(info.message().to_string())
        }
        other => DatabaseError::Query(other.to_string()),
    }
}

async fn with_pool<T, F>(pool: &Pool, work: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, DatabaseError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        work(&mut conn)
    })
    .await?
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = members)]
struct DbMember {
    id: i64,
    display_name: String,
    discord_id: Option<String>,
    data_center: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbMember> for Member {
    fn from(value: DbMember) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name,
            discord_id: value.discord_id,
            data_center: value.data_center,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = members)]
struct NewMemberRow<'a> {
    display_name: &'a str,
    discord_id: Option<&'a str>,
    data_center: Option<&'a str>,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = members, treat_none_as_null = true)]
struct UpdateMemberRow<'a> {
    display_name: &'a str,
    discord_id: Option<&'a str>,
    data_center: Option<&'a str>,
    updated_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = gear_statuses)]
struct DbGearStatus {
    member_id: i64,
    gear: String,
    opt_in: bool,
}

impl DbGearStatus {
    fn into_gear_status(self) -> Result<GearStatus, DatabaseError> {
        let gear: GearSet = serde_json::from_str(&self.gear)?;
        Ok(GearStatus {
            member_id: self.member_id,
            opt_in: self.opt_in,
            gear,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = gear_statuses)]
struct GearStatusRow {
    member_id: i64,
    gear: String,
    opt_in: bool,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = events)]
struct DbEvent {
    id: String,
    title: String,
    description: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    location: Option<String>,
    max_participants: Option<i32>,
    party_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbEvent> for Event {
    fn from(value: DbEvent) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            starts_at: value.starts_at,
            ends_at: value.ends_at,
            location: value.location,
            max_participants: value.max_participants,
            party_id: value.party_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<&Event> for DbEvent {
    fn from(value: &Event) -> Self {
        Self {
            id: value.id.clone(),
            title: value.title.clone(),
            description: value.description.clone(),
            starts_at: value.starts_at,
            ends_at: value.ends_at,
            location: value.location.clone(),
            max_participants: value.max_participants,
            party_id: value.party_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = events, treat_none_as_null = true)]
struct ReplaceEventRow<'a> {
    title: &'a str,
    description: &'a str,
    starts_at: &'a DateTime<Utc>,
    ends_at: &'a DateTime<Utc>,
    location: Option<&'a str>,
    max_participants: Option<i32>,
    party_id: Option<i64>,
    updated_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = event_rsvps)]
struct DbRsvp {
    id: i64,
    event_id: String,
    member_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DbRsvp {
    fn into_rsvp(self) -> Result<Rsvp, DatabaseError> {
        Ok(Rsvp {
            id: self.id,
            status: self.status.parse::<RsvpStatus>()?,
            event_id: self.event_id,
            member_id: self.member_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = event_rsvps)]
struct NewRsvpRow<'a> {
    event_id: &'a str,
    member_id: i64,
    status: &'a str,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = blog_posts)]
struct DbBlogPost {
    id: i64,
    title: String,
    content: String,
    category: String,
    author_name: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<DbBlogPost> for BlogPost {
    fn from(value: DbBlogPost) -> Self {
        Self {
            id: value.id,
            title: value.title,
            content: value.content,
            category: value.category,
            author_name: value.author_name,
            image_url: value.image_url,
            created_at: value.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = blog_posts)]
struct NewBlogPostRow<'a> {
    title: &'a str,
    content: &'a str,
    category: &'a str,
    author_name: &'a str,
    image_url: Option<&'a str>,
    created_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = blog_comments)]
struct DbBlogComment {
    id: i64,
    post_id: i64,
    content: String,
    commenter_name: String,
    created_at: DateTime<Utc>,
}

impl From<DbBlogComment> for BlogComment {
    fn from(value: DbBlogComment) -> Self {
        Self {
            id: value.id,
            post_id: value.post_id,
            content: value.content,
            commenter_name: value.commenter_name,
            created_at: value.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = blog_comments)]
struct NewBlogCommentRow<'a> {
    post_id: i64,
    content: &'a str,
    commenter_name: &'a str,
    created_at: &'a DateTime<Utc>,
}

const PARTY_SNAPSHOT_ID: i64 = 1;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = party_snapshots)]
struct DbPartySnapshot {
    id: i64,
    data: String,
    updated_at: DateTime<Utc>,
}

impl DbPartySnapshot {
    fn into_party_snapshot(self) -> Result<PartySnapshot, DatabaseError> {
        Ok(PartySnapshot {
            data: serde_json::from_str(&self.data)?,
            updated_at: self.updated_at,
        })
    }
}

pub struct PostgresMemberStore {
    pool: Pool,
}

impl PostgresMemberStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::MemberStore for PostgresMemberStore {
    async fn get_member(&self, id: i64) -> Result<Option<Member>, DatabaseError> {
        with_pool(&self.pool, move |conn| {
            members::table
                .filter(members::id.eq(id))
                .select(DbMember::as_select())
                .first::<DbMember>(conn)
                .optional()
                .map(|m| m.map(Member::from))
                .map_err(query_error)
        })
        .await
    }

    async fn get_member_by_discord_id(
        &self,
        discord_id: &str,
    ) -> Result<Option<Member>, DatabaseError> {
        let discord_id = discord_id.to_string();
        with_pool(&self.pool, move |conn| {
            members::table
                .filter(members::discord_id.eq(discord_id))
                .select(DbMember::as_select())
                .first::<DbMember>(conn)
                .optional()
                .map(|m| m.map(Member::from))
                .map_err(query_error)
        })
        .await
    }

    async fn list_members(&self) -> Result<Vec<Member>, DatabaseError> {
        with_pool(&self.pool, |conn| {
            members::table
                .order(members::id.asc())
                .select(DbMember::as_select())
                .load::<DbMember>(conn)
                .map(|rows| rows.into_iter().map(Member::from).collect())
                .map_err(query_error)
        })
        .await
    }

    async fn create_member(&self, member: &NewMember) -> Result<Member, DatabaseError> {
        let member = member.clone();
        with_pool(&self.pool, move |conn| {
            let now = Utc::now();
            let row = NewMemberRow {
                display_name: &member.display_name,
                discord_id: member.discord_id.as_deref(),
                data_center: member.data_center.as_deref(),
                created_at: &now,
                updated_at: &now,
            };

            diesel::insert_into(members::table)
                .values(&row)
                .returning(DbMember::as_returning())
                .get_result::<DbMember>(conn)
                .map(Member::from)
                .map_err(query_error)
        })
        .await
    }

    async fn update_member(&self, id: i64, member: &NewMember) -> Result<Member, DatabaseError> {
        let member = member.clone();
        with_pool(&self.pool, move |conn| {
            let now = Utc::now();
            let changes = UpdateMemberRow {
                display_name: &member.display_name,
                discord_id: member.discord_id.as_deref(),
                data_center: member.data_center.as_deref(),
                updated_at: &now,
            };

            diesel::update(members::table.filter(members::id.eq(id)))
                .set(changes)
                .returning(DbMember::as_returning())
                .get_result::<DbMember>(conn)
                .optional()
                .map_err(query_error)?
                .map(Member::from)
                .ok_or_else(|| DatabaseError::NotFound(format!("member {id}")))
        })
        .await
    }

    async fn delete_member(&self, id: i64) -> Result<bool, DatabaseError> {
        with_pool(&self.pool, move |conn| {
            diesel::delete(members::table.filter(members::id.eq(id)))
                .execute(conn)
                .map(|count| count > 0)
                .map_err(query_error)
        })
        .await
    }
}

pub struct PostgresGearStore {
    pool: Pool,
}

impl PostgresGearStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::GearStore for PostgresGearStore {
    async fn get_gear_status(&self, member_id: i64) -> Result<Option<GearStatus>, DatabaseError> {
        with_pool(&self.pool, move |conn| {
            gear_statuses::table
                .filter(gear_statuses::member_id.eq(member_id))
                .select(DbGearStatus::as_select())
                .first::<DbGearStatus>(conn)
                .optional()
                .map_err(query_error)?
                .map(DbGearStatus::into_gear_status)
                .transpose()
        })
        .await
    }

    async fn list_gear_statuses(&self) -> Result<Vec<GearStatus>, DatabaseError> {
        with_pool(&self.pool, |conn| {
            let rows = gear_statuses::table
                .order(gear_statuses::member_id.asc())
                .select(DbGearStatus::as_select())
                .load::<DbGearStatus>(conn)
                .map_err(query_error)?;
            rows.into_iter().map(DbGearStatus::into_gear_status).collect()
        })
        .await
    }

    async fn save_gear_status(&self, status: &GearStatus) -> Result<(), DatabaseError> {
        let row = GearStatusRow {
            member_id: status.member_id,
            gear: serde_json::to_string(&status.gear)?,
            opt_in: status.opt_in,
            updated_at: Utc::now(),
        };
        with_pool(&self.pool, move |conn| {
            diesel::insert_into(gear_statuses::table)
                .values(&row)
                .on_conflict(gear_statuses::member_id)
                .do_update()
                .set((
                    gear_statuses::gear.eq(&row.gear),
                    gear_statuses::opt_in.eq(row.opt_in),
                    gear_statuses::updated_at.eq(row.updated_at),
                ))
                .execute(conn)
                .map(|_| ())
                .map_err(query_error)
        })
        .await
    }
}

pub struct PostgresEventStore {
    pool: Pool,
}

impl PostgresEventStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::EventStore for PostgresEventStore {
    async fn get_event(&self, id: &str) -> Result<Option<Event>, DatabaseError> {
        let id = id.to_string();
        with_pool(&self.pool, move |conn| {
            events::table
                .filter(events::id.eq(id))
                .select(DbEvent::as_select())
                .first::<DbEvent>(conn)
                .optional()
                .map(|e| e.map(Event::from))
                .map_err(query_error)
        })
        .await
    }

    async fn list_events(&self) -> Result<Vec<Event>, DatabaseError> {
        with_pool(&self.pool, |conn| {
            events::table
                .order(events::starts_at.asc())
                .select(DbEvent::as_select())
                .load::<DbEvent>(conn)
                .map(|rows| rows.into_iter().map(Event::from).collect())
                .map_err(query_error)
        })
        .await
    }

    async fn upsert_event(&self, event: &Event) -> Result<(), DatabaseError> {
        let event = event.clone();
        with_pool(&self.pool, move |conn| {
            let row = DbEvent::from(&event);
            let replacement = ReplaceEventRow {
                title: &event.title,
                description: &event.description,
                starts_at: &event.starts_at,
                ends_at: &event.ends_at,
                location: event.location.as_deref(),
                max_participants: event.max_participants,
                party_id: event.party_id,
                updated_at: &event.updated_at,
            };

            diesel::insert_into(events::table)
                .values(&row)
                .on_conflict(events::id)
                .do_update()
                .set(replacement)
                .execute(conn)
                .map(|_| ())
                .map_err(query_error)
        })
        .await
    }

    async fn delete_event(&self, id: &str) -> Result<bool, DatabaseError> {
        let id = id.to_string();
        with_pool(&self.pool, move |conn| {
            diesel::delete(events::table.filter(events::id.eq(id)))
                .execute(conn)
                .map(|count| count > 0)
                .map_err(query_error)
        })
        .await
    }
}

pub struct PostgresRsvpStore {
    pool: Pool,
}

impl PostgresRsvpStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::RsvpStore for PostgresRsvpStore {
    async fn upsert_rsvp(
        &self,
        event_id: &str,
        member_id: i64,
        status: RsvpStatus,
    ) -> Result<Rsvp, DatabaseError> {
        let event_id = event_id.to_string();
        with_pool(&self.pool, move |conn| {
            let now = Utc::now();
            let row = NewRsvpRow {
                event_id: &event_id,
                member_id,
                status: status.as_str(),
                created_at: &now,
                updated_at: &now,
            };

            diesel::insert_into(event_rsvps::table)
                .values(&row)
                .on_conflict((event_rsvps::event_id, event_rsvps::member_id))
                .do_update()
                .set((
                    event_rsvps::status.eq(status.as_str()),
                    event_rsvps::updated_at.eq(now),
                ))
                .returning(DbRsvp::as_returning())
                .get_result::<DbRsvp>(conn)
                .map_err(query_error)?
                .into_rsvp()
        })
        .await
    }

    async fn get_rsvp(
        &self,
        event_id: &str,
        member_id: i64,
    ) -> Result<Option<Rsvp>, DatabaseError> {
        let event_id = event_id.to_string();
        with_pool(&self.pool, move |conn| {
            event_rsvps::table
                .filter(event_rsvps::event_id.eq(event_id))
                .filter(event_rsvps::member_id.eq(member_id))
                .select(DbRsvp::as_select())
                .first::<DbRsvp>(conn)
                .optional()
                .map_err(query_error)?
                .map(DbRsvp::into_rsvp)
                .transpose()
        })
        .await
    }

    async fn list_rsvps_for_event(&self, event_id: &str) -> Result<Vec<Rsvp>, DatabaseError> {
        let event_id = event_id.to_string();
        with_pool(&self.pool, move |conn| {
            let rows = event_rsvps::table
                .filter(event_rsvps::event_id.eq(event_id))
                .order(event_rsvps::member_id.asc())
                .select(DbRsvp::as_select())
                .load::<DbRsvp>(conn)
                .map_err(query_error)?;
            rows.into_iter().map(DbRsvp::into_rsvp).collect()
        })
        .await
    }

    async fn delete_rsvp(&self, event_id: &str, member_id: i64) -> Result<bool, DatabaseError> {
        let event_id = event_id.to_string();
        with_pool(&self.pool, move |conn| {
            diesel::delete(
                event_rsvps::table
                    .filter(event_rsvps::event_id.eq(event_id))
                    .filter(event_rsvps::member_id.eq(member_id)),
            )
            .execute(conn)
            .map(|count| count > 0)
            .map_err(query_error)
        })
        .await
    }
}

pub struct PostgresPostStore {
    pool: Pool,
}

impl PostgresPostStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::PostStore for PostgresPostStore {
    async fn create_post(&self, post: &NewBlogPost) -> Result<BlogPost, DatabaseError> {
        let post = post.clone();
        with_pool(&self.pool, move |conn| {
            let now = Utc::now();
            let row = NewBlogPostRow {
                title: &post.title,
                content: &post.content,
                category: &post.category,
                author_name: &post.author_name,
                image_url: post.image_url.as_deref(),
                created_at: &now,
            };

            diesel::insert_into(blog_posts::table)
                .values(&row)
                .returning(DbBlogPost::as_returning())
                .get_result::<DbBlogPost>(conn)
                .map(BlogPost::from)
                .map_err(query_error)
        })
        .await
    }

    async fn get_post(&self, id: i64) -> Result<Option<BlogPost>, DatabaseError> {
        with_pool(&self.pool, move |conn| {
            blog_posts::table
                .filter(blog_posts::id.eq(id))
                .select(DbBlogPost::as_select())
                .first::<DbBlogPost>(conn)
                .optional()
                .map(|p| p.map(BlogPost::from))
                .map_err(query_error)
        })
        .await
    }

    async fn list_posts(&self) -> Result<Vec<BlogPost>, DatabaseError> {
        with_pool(&self.pool, |conn| {
            blog_posts::table
                .order((blog_posts::created_at.desc(), blog_posts::id.desc()))
                .select(DbBlogPost::as_select())
                .load::<DbBlogPost>(conn)
                .map(|rows| rows.into_iter().map(BlogPost::from).collect())
                .map_err(query_error)
        })
        .await
    }

    async fn delete_post(&self, id: i64) -> Result<bool, DatabaseError> {
        with_pool(&self.pool, move |conn| {
            diesel::delete(blog_posts::table.filter(blog_posts::id.eq(id)))
                .execute(conn)
                .map(|count| count > 0)
                .map_err(query_error)
        })
        .await
    }
}

pub struct PostgresCommentStore {
    pool: Pool,
}

impl PostgresCommentStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::CommentStore for PostgresCommentStore {
    async fn create_comment(
        &self,
        post_id: i64,
        comment: &NewBlogComment,
    ) -> Result<BlogComment, DatabaseError> {
        let comment = comment.clone();
        with_pool(&self.pool, move |conn| {
            let now = Utc::now();
            let row = NewBlogCommentRow {
                post_id,
                content: &comment.content,
                commenter_name: &comment.commenter_name,
                created_at: &now,
            };

            // A missing post surfaces as a foreign key violation, mapped to NotFound.
            diesel::insert_into(blog_comments::table)
                .values(&row)
                .returning(DbBlogComment::as_returning())
                .get_result::<DbBlogComment>(conn)
                .map(BlogComment::from)
                .map_err(query_error)
        })
        .await
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<BlogComment>, DatabaseError> {
        with_pool(&self.pool, move |conn| {
            blog_comments::table
                .filter(blog_comments::post_id.eq(post_id))
                .order((blog_comments::created_at.asc(), blog_comments::id.asc()))
                .select(DbBlogComment::as_select())
                .load::<DbBlogComment>(conn)
                .map(|rows| rows.into_iter().map(BlogComment::from).collect())
                .map_err(query_error)
        })
        .await
    }
}

pub struct PostgresPartyStore {
    pool: Pool,
}

impl PostgresPartyStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::PartyStore for PostgresPartyStore {
    async fn get_party_snapshot(&self) -> Result<Option<PartySnapshot>, DatabaseError> {
        with_pool(&self.pool, |conn| {
            party_snapshots::table
                .filter(party_snapshots::id.eq(PARTY_SNAPSHOT_ID))
                .select(DbPartySnapshot::as_select())
                .first::<DbPartySnapshot>(conn)
                .optional()
                .map_err(query_error)?
                .map(DbPartySnapshot::into_party_snapshot)
                .transpose()
        })
        .await
    }

    async fn save_party_snapshot(
        &self,
        data: &serde_json::Value,
    ) -> Result<PartySnapshot, DatabaseError> {
        let row = DbPartySnapshot {
            id: PARTY_SNAPSHOT_ID,
            data: serde_json::to_string(data)?,
            updated_at: Utc::now(),
        };
        with_pool(&self.pool, move |conn| {
            diesel::insert_into(party_snapshots::table)
                .values(&row)
                .on_conflict(party_snapshots::id)
                .do_update()
                .set((
                    party_snapshots::data.eq(&row.data),
                    party_snapshots::updated_at.eq(row.updated_at),
                ))
                .returning(DbPartySnapshot::as_returning())
                .get_result::<DbPartySnapshot>(conn)
                .map_err(query_error)?
                .into_party_snapshot()
        })
        .await
    }
}
