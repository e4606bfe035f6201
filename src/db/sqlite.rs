use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::BigInt;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::db::schema_sqlite::{
    blog_comments, blog_posts, event_rsvps, events, gear_statuses, members, party_snapshots,
};
use crate::gear::{GearSet, GearStatus};

use super::{
    DatabaseError,
    models::{
        BlogComment, BlogPost, Event, Member, NewBlogComment, NewBlogPost, NewMember,
        PartySnapshot, Rsvp, RsvpStatus,
    },
};

// Helper function to convert DateTime to ISO string for SQLite
fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// Helper function to parse ISO string to DateTime
fn string_to_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Query(format!("invalid datetime format: {}", e)))
}

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

pub(crate) fn establish_connection(path: &str) -> Result<SqliteConnection, DatabaseError> {
    let mut conn = SqliteConnection::establish(path)
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;
    // Cascades on member/event deletion depend on this per-connection pragma.
    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(&mut conn)
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;
    diesel::sql_query("PRAGMA busy_timeout = 5000")
        .execute(&mut conn)
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;
    Ok(conn)
}

async fn with_connection<T, F>(db_path: &Arc<String>, work: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteConnection) -> Result<T, DatabaseError> + Send + 'static,
{
    let db_path = db_path.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = establish_connection(&db_path)?;
        work(&mut conn)
    })
    .await?
}

fn last_insert_rowid(conn: &mut SqliteConnection) -> Result<i64, DatabaseError> {
    diesel::select(diesel::dsl::sql::<BigInt>("last_insert_rowid()"))
        .get_result::<i64>(conn)
        .map_err(query_error)
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = members)]
struct DbMember {
    id: i64,
    display_name: String,
    discord_id: Option<String>,
    data_center: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DbMember {
    fn to_member(&self) -> Result<Member, DatabaseError> {
        Ok(Member {
            id: self.id,
            display_name: self.display_name.clone(),
            discord_id: self.discord_id.clone(),
            data_center: self.data_center.clone(),
            created_at: string_to_datetime(&self.created_at)?,
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = members)]
struct NewMemberRow<'a> {
    display_name: &'a str,
    discord_id: Option<&'a str>,
    data_center: Option<&'a str>,
    created_at: String,
    updated_at: String,
}

#[derive(AsChangeset)]
#[diesel(table_name = members, treat_none_as_null = true)]
struct UpdateMemberRow<'a> {
    display_name: &'a str,
    discord_id: Option<&'a str>,
    data_center: Option<&'a str>,
    updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = gear_statuses)]
struct DbGearStatus {
    member_id: i64,
    gear: String,
    opt_in: bool,
    #[allow(dead_code)]
    updated_at: String,
}

impl DbGearStatus {
    fn to_gear_status(&self) -> Result<GearStatus, DatabaseError> {
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
    updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = events)]
struct DbEvent {
    id: String,
    title: String,
    description: String,
    starts_at: String,
    ends_at: String,
    location: Option<String>,
    max_participants: Option<i32>,
    party_id: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl DbEvent {
    fn to_event(&self) -> Result<Event, DatabaseError> {
        Ok(Event {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            starts_at: string_to_datetime(&self.starts_at)?,
            ends_at: string_to_datetime(&self.ends_at)?,
            location: self.location.clone(),
            max_participants: self.max_participants,
            party_id: self.party_id,
            created_at: string_to_datetime(&self.created_at)?,
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = events)]
struct EventRow<'a> {
    id: &'a str,
    title: &'a str,
    description: &'a str,
    starts_at: String,
    ends_at: String,
    location: Option<&'a str>,
    max_participants: Option<i32>,
    party_id: Option<i64>,
    created_at: String,
    updated_at: String,
}

#[derive(AsChangeset)]
#[diesel(table_name = events, treat_none_as_null = true)]
struct ReplaceEventRow<'a> {
    title: &'a str,
    description: &'a str,
    starts_at: String,
    ends_at: String,
    location: Option<&'a str>,
    max_participants: Option<i32>,
    party_id: Option<i64>,
    updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = event_rsvps)]
struct DbRsvp {
    id: i64,
    event_id: String,
    member_id: i64,
    status: String,
    created_at: String,
    updated_at: String,
}

impl DbRsvp {
    fn to_rsvp(&self) -> Result<Rsvp, DatabaseError> {
        Ok(Rsvp {
            id: self.id,
            event_id: self.event_id.clone(),
            member_id: self.member_id,
            status: self.status.parse::<RsvpStatus>()?,
            created_at: string_to_datetime(&self.created_at)?,
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = event_rsvps)]
struct NewRsvpRow<'a> {
    event_id: &'a str,
    member_id: i64,
    status: &'a str,
    created_at: String,
    updated_at: String,
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
    created_at: String,
}

impl DbBlogPost {
    fn to_blog_post(&self) -> Result<BlogPost, DatabaseError> {
        Ok(BlogPost {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
            author_name: self.author_name.clone(),
            image_url: self.image_url.clone(),
            created_at: string_to_datetime(&self.created_at)?,
        })
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
    created_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = blog_comments)]
struct DbBlogComment {
    id: i64,
    post_id: i64,
    content: String,
    commenter_name: String,
    created_at: String,
}

impl DbBlogComment {
    fn to_blog_comment(&self) -> Result<BlogComment, DatabaseError> {
        Ok(BlogComment {
            id: self.id,
            post_id: self.post_id,
            content: self.content.clone(),
            commenter_name: self.commenter_name.clone(),
            created_at: string_to_datetime(&self.created_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = blog_comments)]
struct NewBlogCommentRow<'a> {
    post_id: i64,
    content: &'a str,
    commenter_name: &'a str,
    created_at: String,
}

/// The board lives in a single row.
const PARTY_SNAPSHOT_ID: i64 = 1;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = party_snapshots)]
struct DbPartySnapshot {
    id: i64,
    data: String,
    updated_at: String,
}

impl DbPartySnapshot {
    fn to_party_snapshot(&self) -> Result<PartySnapshot, DatabaseError> {
        Ok(PartySnapshot {
            data: serde_json::from_str(&self.data)?,
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

fn load_member(conn: &mut SqliteConnection, member_id: i64) -> Result<Option<Member>, DatabaseError> {
    members::table
        .filter(members::id.eq(member_id))
        .select(DbMember::as_select())
        .first::<DbMember>(conn)
        .optional()
        .map_err(query_error)?
        .map(|m| m.to_member())
        .transpose()
}

pub struct SqliteMemberStore {
    db_path: Arc<String>,
}

impl SqliteMemberStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::MemberStore for SqliteMemberStore {
    async fn get_member(&self, id: i64) -> Result<Option<Member>, DatabaseError> {
        with_connection(&self.db_path, move |conn| load_member(conn, id)).await
    }

    async fn get_member_by_discord_id(
        &self,
        discord_id: &str,
    ) -> Result<Option<Member>, DatabaseError> {
        let discord_id = discord_id.to_string();
        with_connection(&self.db_path, move |conn| {
            members::table
                .filter(members::discord_id.eq(discord_id))
                .select(DbMember::as_select())
                .first::<DbMember>(conn)
                .optional()
                .map_err(query_error)?
                .map(|m| m.to_member())
                .transpose()
        })
        .await
    }

    async fn list_members(&self) -> Result<Vec<Member>, DatabaseError> {
        with_connection(&self.db_path, |conn| {
            let results = members::table
                .order(members::id.asc())
                .select(DbMember::as_select())
                .load::<DbMember>(conn)
                .map_err(query_error)?;
            results.into_iter().map(|m| m.to_member()).collect()
        })
        .await
    }

    async fn create_member(&self, member: &NewMember) -> Result<Member, DatabaseError> {
        let member = member.clone();
        with_connection(&self.db_path, move |conn| {
            let now = datetime_to_string(&Utc::now());
            let row = NewMemberRow {
                display_name: &member.display_name,
                discord_id: member.discord_id.as_deref(),
                data_center: member.data_center.as_deref(),
                created_at: now.clone(),
                updated_at: now,
            };

            diesel::insert_into(members::table)
                .values(&row)
                .execute(conn)
                .map_err(query_error)?;

            let id = last_insert_rowid(conn)?;
            load_member(conn, id)?
                .ok_or_else(|| DatabaseError::Query(format!("inserted member {id} vanished")))
        })
        .await
    }

    async fn update_member(&self, id: i64, member: &NewMember) -> Result<Member, DatabaseError> {
        let member = member.clone();
        with_connection(&self.db_path, move |conn| {
            let changes = UpdateMemberRow {
                display_name: &member.display_name,
                discord_id: member.discord_id.as_deref(),
                data_center: member.data_center.as_deref(),
                updated_at: datetime_to_string(&Utc::now()),
            };

            let updated = diesel::update(members::table.filter(members::id.eq(id)))
                .set(changes)
                .execute(conn)
                .map_err(query_error)?;
            if updated == 0 {
                return Err(DatabaseError::NotFound(format!("member {id}")));
            }

            load_member(conn, id)?
                .ok_or_else(|| DatabaseError::NotFound(format!("member {id}")))
        })
        .await
    }

    async fn delete_member(&self, id: i64) -> Result<bool, DatabaseError> {
        with_connection(&self.db_path, move |conn| {
            diesel::delete(members::table.filter(members::id.eq(id)))
                .execute(conn)
                .map(|count| count > 0)
                .map_err(query_error)
        })
        .await
    }
}

pub struct SqliteGearStore {
    db_path: Arc<String>,
}

impl SqliteGearStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::GearStore for SqliteGearStore {
    async fn get_gear_status(&self, member_id: i64) -> Result<Option<GearStatus>, DatabaseError> {
        with_connection(&self.db_path, move |conn| {
            gear_statuses::table
                .filter(gear_statuses::member_id.eq(member_id))
                .select(DbGearStatus::as_select())
                .first::<DbGearStatus>(conn)
                .optional()
                .map_err(query_error)?
                .map(|g| g.to_gear_status())
                .transpose()
        })
        .await
    }

    async fn list_gear_statuses(&self) -> Result<Vec<GearStatus>, DatabaseError> {
        with_connection(&self.db_path, |conn| {
            let results = gear_statuses::table
                .order(gear_statuses::member_id.asc())
                .select(DbGearStatus::as_select())
                .load::<DbGearStatus>(conn)
                .map_err(query_error)?;
            results.into_iter().map(|g| g.to_gear_status()).collect()
        })
        .await
    }

    async fn save_gear_status(&self, status: &GearStatus) -> Result<(), DatabaseError> {
        let row = GearStatusRow {
            member_id: status.member_id,
            gear: serde_json::to_string(&status.gear)?,
            opt_in: status.opt_in,
            updated_at: datetime_to_string(&Utc::now()),
        };
        with_connection(&self.db_path, move |conn| {
            diesel::insert_into(gear_statuses::table)
                .values(&row)
                .on_conflict(gear_statuses::member_id)
                .do_update()
                .set((
                    gear_statuses::gear.eq(&row.gear),
                    gear_statuses::opt_in.eq(row.opt_in),
                    gear_statuses::updated_at.eq(&row.updated_at),
                ))
                .execute(conn)
                .map(|_| ())
                .map_err(query_error)
        })
        .await
    }
}

pub struct SqliteEventStore {
    db_path: Arc<String>,
}

impl SqliteEventStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::EventStore for SqliteEventStore {
    async fn get_event(&self, id: &str) -> Result<Option<Event>, DatabaseError> {
        let id = id.to_string();
        with_connection(&self.db_path, move |conn| {
            events::table
                .filter(events::id.eq(id))
                .select(DbEvent::as_select())
                .first::<DbEvent>(conn)
                .optional()
                .map_err(query_error)?
                .map(|e| e.to_event())
                .transpose()
        })
        .await
    }

    async fn list_events(&self) -> Result<Vec<Event>, DatabaseError> {
        with_connection(&self.db_path, |conn| {
            let results = events::table
                .order(events::starts_at.asc())
                .select(DbEvent::as_select())
                .load::<DbEvent>(conn)
                .map_err(query_error)?;
            results.into_iter().map(|e| e.to_event()).collect()
        })
        .await
    }

    async fn upsert_event(&self, event: &Event) -> Result<(), DatabaseError> {
        let event = event.clone();
        with_connection(&self.db_path, move |conn| {
            let row = EventRow {
                id: &event.id,
                title: &event.title,
                description: &event.description,
                starts_at: datetime_to_string(&event.starts_at),
                ends_at: datetime_to_string(&event.ends_at),
                location: event.location.as_deref(),
                max_participants: event.max_participants,
                party_id: event.party_id,
                created_at: datetime_to_string(&event.created_at),
                updated_at: datetime_to_string(&event.updated_at),
            };
            let replacement = ReplaceEventRow {
                title: &event.title,
                description: &event.description,
                starts_at: datetime_to_string(&event.starts_at),
                ends_at: datetime_to_string(&event.ends_at),
                location: event.location.as_deref(),
                max_participants: event.max_participants,
                party_id: event.party_id,
                updated_at: datetime_to_string(&event.updated_at),
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
        with_connection(&self.db_path, move |conn| {
            diesel::delete(events::table.filter(events::id.eq(id)))
                .execute(conn)
                .map(|count| count > 0)
                .map_err(query_error)
        })
        .await
    }
}

fn load_rsvp(
    conn: &mut SqliteConnection,
    event: &str,
    member: i64,
) -> Result<Option<Rsvp>, DatabaseError> {
    event_rsvps::table
        .filter(event_rsvps::event_id.eq(event))
        .filter(event_rsvps::member_id.eq(member))
        .select(DbRsvp::as_select())
        .first::<DbRsvp>(conn)
        .optional()
        .map_err(query_error)?
        .map(|r| r.to_rsvp())
        .transpose()
}

pub struct SqliteRsvpStore {
    db_path: Arc<String>,
}

impl SqliteRsvpStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::RsvpStore for SqliteRsvpStore {
    async fn upsert_rsvp(
        &self,
        event_id: &str,
        member_id: i64,
        status: RsvpStatus,
    ) -> Result<Rsvp, DatabaseError> {
        let event_id = event_id.to_string();
        with_connection(&self.db_path, move |conn| {
            let now = datetime_to_string(&Utc::now());
            let row = NewRsvpRow {
                event_id: &event_id,
                member_id,
                status: status.as_str(),
                created_at: now.clone(),
                updated_at: now.clone(),
            };

            diesel::insert_into(event_rsvps::table)
                .values(&row)
                .on_conflict((event_rsvps::event_id, event_rsvps::member_id))
                .do_update()
                .set((
                    event_rsvps::status.eq(status.as_str()),
                    event_rsvps::updated_at.eq(&now),
                ))
                .execute(conn)
                .map_err(query_error)?;

            load_rsvp(conn, &event_id, member_id)?.ok_or_else(|| {
                DatabaseError::Query(format!(
                    "rsvp for event {event_id} member {member_id} missing after upsert"
                ))
            })
        })
        .await
    }

    async fn get_rsvp(
        &self,
        event_id: &str,
        member_id: i64,
    ) -> Result<Option<Rsvp>, DatabaseError> {
        let event_id = event_id.to_string();
        with_connection(&self.db_path, move |conn| {
            load_rsvp(conn, &event_id, member_id)
        })
        .await
    }

    async fn list_rsvps_for_event(&self, event_id: &str) -> Result<Vec<Rsvp>, DatabaseError> {
        let event_id = event_id.to_string();
        with_connection(&self.db_path, move |conn| {
            let results = event_rsvps::table
                .filter(event_rsvps::event_id.eq(event_id))
                .order(event_rsvps::member_id.asc())
                .select(DbRsvp::as_select())
                .load::<DbRsvp>(conn)
                .map_err(query_error)?;
            results.into_iter().map(|r| r.to_rsvp()).collect()
        })
        .await
    }

    async fn delete_rsvp(&self, event_id: &str, member_id: i64) -> Result<bool, DatabaseError> {
        let event_id = event_id.to_string();
        with_connection(&self.db_path, move |conn| {
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

fn load_post(conn: &mut SqliteConnection, post_id: i64) -> Result<Option<BlogPost>, DatabaseError> {
    blog_posts::table
        .filter(blog_posts::id.eq(post_id))
        .select(DbBlogPost::as_select())
        .first::<DbBlogPost>(conn)
        .optional()
        .map_err(query_error)?
        .map(|p| p.to_blog_post())
        .transpose()
}

pub struct SqlitePostStore {
    db_path: Arc<String>,
}

impl SqlitePostStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::PostStore for SqlitePostStore {
    async fn create_post(&self, post: &NewBlogPost) -> Result<BlogPost, DatabaseError> {
        let post = post.clone();
        with_connection(&self.db_path, move |conn| {
            let row = NewBlogPostRow {
                title: &post.title,
                content: &post.content,
                category: &post.category,
                author_name: &post.author_name,
                image_url: post.image_url.as_deref(),
                created_at: datetime_to_string(&Utc::now()),
            };

            diesel::insert_into(blog_posts::table)
                .values(&row)
                .execute(conn)
                .map_err(query_error)?;

            let id = last_insert_rowid(conn)?;
            load_post(conn, id)?
                .ok_or_else(|| DatabaseError::Query(format!("inserted post {id} vanished")))
        })
        .await
    }

    async fn get_post(&self, id: i64) -> Result<Option<BlogPost>, DatabaseError> {
        with_connection(&self.db_path, move |conn| load_post(conn, id)).await
    }

    async fn list_posts(&self) -> Result<Vec<BlogPost>, DatabaseError> {
        with_connection(&self.db_path, |conn| {
            let results = blog_posts::table
                .order((blog_posts::created_at.desc(), blog_posts::id.desc()))
                .select(DbBlogPost::as_select())
                .load::<DbBlogPost>(conn)
                .map_err(query_error)?;
            results.into_iter().map(|p| p.to_blog_post()).collect()
        })
        .await
    }

    async fn delete_post(&self, id: i64) -> Result<bool, DatabaseError> {
        with_connection(&self.db_path, move |conn| {
            diesel::delete(blog_posts::table.filter(blog_posts::id.eq(id)))
                .execute(conn)
                .map(|count| count > 0)
                .map_err(query_error)
        })
        .await
    }
}

pub struct SqliteCommentStore {
    db_path: Arc<String>,
}

impl SqliteCommentStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::CommentStore for SqliteCommentStore {
    async fn create_comment(
        &self,
        post_id: i64,
        comment: &NewBlogComment,
    ) -> Result<BlogComment, DatabaseError> {
        let comment = comment.clone();
        with_connection(&self.db_path, move |conn| {
            if load_post(conn, post_id)?.is_none() {
                return Err(DatabaseError::NotFound(format!("post {post_id}")));
            }
            let row = NewBlogCommentRow {
                post_id,
                content: &comment.content,
                commenter_name: &comment.commenter_name,
                created_at: datetime_to_string(&Utc::now()),
            };
            diesel::insert_into(blog_comments::table)
                .values(&row)
                .execute(conn)
                .map_err(query_error)?;

            let id = last_insert_rowid(conn)?;
            blog_comments::table
                .filter(blog_comments::id.eq(id))
                .select(DbBlogComment::as_select())
                .first::<DbBlogComment>(conn)
                .map_err(query_error)?
                .to_blog_comment()
        })
        .await
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<BlogComment>, DatabaseError> {
        with_connection(&self.db_path, move |conn| {
            let results = blog_comments::table
                .filter(blog_comments::post_id.eq(post_id))
                .order((blog_comments::created_at.asc(), blog_comments::id.asc()))
                .select(DbBlogComment::as_select())
                .load::<DbBlogComment>(conn)
                .map_err(query_error)?;
            results.into_iter().map(|c| c.to_blog_comment()).collect()
        })
        .await
    }
}

pub struct SqlitePartyStore {
    db_path: Arc<String>,
}

impl SqlitePartyStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::PartyStore for SqlitePartyStore {
    async fn get_party_snapshot(&self) -> Result<Option<PartySnapshot>, DatabaseError> {
        with_connection(&self.db_path, |conn| {
            party_snapshots::table
                .filter(party_snapshots::id.eq(PARTY_SNAPSHOT_ID))
                .select(DbPartySnapshot::as_select())
                .first::<DbPartySnapshot>(conn)
                .optional()
                .map_err(query_error)?
                .map(|p| p.to_party_snapshot())
                .transpose()
        })
        .await
    }

    async fn save_party_snapshot(
        &self,
        data: &serde_json::Value,
    ) -> Result<PartySnapshot, DatabaseError> {
        let now = Utc::now();
        let row = DbPartySnapshot {
            id: PARTY_SNAPSHOT_ID,
            data: serde_json::to_string(data)?,
            updated_at: datetime_to_string(&now),
        };
        with_connection(&self.db_path, move |conn| {
            diesel::insert_into(party_snapshots::table)
                .values(&row)
                .on_conflict(party_snapshots::id)
                .do_update()
                .set((
                    party_snapshots::data.eq(&row.data),
                    party_snapshots::updated_at.eq(&row.updated_at),
                ))
                .execute(conn)
                .map_err(query_error)?;
            row.to_party_snapshot()
        })
        .await
    }
}
