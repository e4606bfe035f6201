use crate::config::{DatabaseConfig as ConfigDatabaseConfig, DbType as ConfigDbType};
use crate::db::memory::MemoryStore;
use crate::db::{
    CommentStore, DatabaseError, EventStore, GearStore, MemberStore, PartyStore, PostStore,
    RsvpStore,
};
use std::sync::Arc;
use tracing::info;

#[cfg(feature = "postgres")]
use crate::db::postgres::{
    PostgresCommentStore, PostgresEventStore, PostgresGearStore, PostgresMemberStore,
    PostgresPartyStore, PostgresPostStore, PostgresRsvpStore,
};
#[cfg(feature = "postgres")]
use diesel::pg::PgConnection;
#[cfg(feature = "postgres")]
use diesel::r2d2::{self, ConnectionManager};
#[cfg(feature = "postgres")]
use diesel::RunQueryDsl;

#[cfg(feature = "postgres")]
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[cfg(feature = "sqlite")]
use crate::db::sqlite::{
    SqliteCommentStore, SqliteEventStore, SqliteGearStore, SqliteMemberStore, SqlitePartyStore,
    SqlitePostStore, SqliteRsvpStore,
};

#[derive(Clone)]
pub struct DatabaseManager {
    #[cfg(feature = "postgres")]
    postgres_pool: Option<Pool>,
    #[cfg(feature = "sqlite")]
    sqlite_path: Option<String>,
    member_store: Arc<dyn MemberStore>,
    gear_store: Arc<dyn GearStore>,
    event_store: Arc<dyn EventStore>,
    rsvp_store: Arc<dyn RsvpStore>,
    post_store: Arc<dyn PostStore>,
    comment_store: Arc<dyn CommentStore>,
    party_store: Arc<dyn PartyStore>,
    db_type: DbType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    Sqlite,
    Memory,
}

impl From<ConfigDbType> for DbType {
    fn from(value: ConfigDbType) -> Self {
        match value {
            ConfigDbType::Postgres => DbType::Postgres,
            ConfigDbType::Sqlite => DbType::Sqlite,
            ConfigDbType::Memory => DbType::Memory,
        }
    }
}

const SCHEMA_SQLITE: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS members (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        display_name TEXT NOT NULL,
        discord_id TEXT UNIQUE,
        data_center TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS gear_statuses (
        member_id INTEGER PRIMARY KEY REFERENCES members(id) ON DELETE CASCADE,
        gear TEXT NOT NULL DEFAULT '{}',
        opt_in BOOLEAN NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        starts_at TEXT NOT NULL,
        ends_at TEXT NOT NULL,
        location TEXT,
        max_participants INTEGER,
        party_id BIGINT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS event_rsvps (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
        status TEXT NOT NULL CHECK (status IN ('going', 'maybe', 'declined', 'invited')),
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE (event_id, member_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blog_posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT '',
        author_name TEXT NOT NULL,
        image_url TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blog_comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id INTEGER NOT NULL REFERENCES blog_posts(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        commenter_name TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS party_snapshots (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        data TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_members_discord_id ON members(discord_id)",
    "CREATE INDEX IF NOT EXISTS idx_events_starts_at ON events(starts_at)",
    "CREATE INDEX IF NOT EXISTS idx_event_rsvps_event_id ON event_rsvps(event_id)",
    "CREATE INDEX IF NOT EXISTS idx_blog_comments_post_id ON blog_comments(post_id)",
];

const SCHEMA_POSTGRES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS members (
        id BIGSERIAL PRIMARY KEY,
        display_name TEXT NOT NULL,
        discord_id TEXT UNIQUE,
        data_center TEXT,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS gear_statuses (
        member_id BIGINT PRIMARY KEY REFERENCES members(id) ON DELETE CASCADE,
        gear TEXT NOT NULL DEFAULT '{}',
        opt_in BOOLEAN NOT NULL DEFAULT FALSE,
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        starts_at TIMESTAMP WITH TIME ZONE NOT NULL,
        ends_at TIMESTAMP WITH TIME ZONE NOT NULL,
        location TEXT,
        max_participants INTEGER,
        party_id BIGINT,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS event_rsvps (
        id BIGSERIAL PRIMARY KEY,
        event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        member_id BIGINT NOT NULL REFERENCES members(id) ON DELETE CASCADE,
        status TEXT NOT NULL CHECK (status IN ('going', 'maybe', 'declined', 'invited')),
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        UNIQUE (event_id, member_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blog_posts (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT '',
        author_name TEXT NOT NULL,
        image_url TEXT,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blog_comments (
        id BIGSERIAL PRIMARY KEY,
        post_id BIGINT NOT NULL REFERENCES blog_posts(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        commenter_name TEXT NOT NULL,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS party_snapshots (
        id BIGINT PRIMARY KEY CHECK (id = 1),
        data TEXT NOT NULL,
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_members_discord_id ON members(discord_id)",
    "CREATE INDEX IF NOT EXISTS idx_events_starts_at ON events(starts_at)",
    "CREATE INDEX IF NOT EXISTS idx_event_rsvps_event_id ON event_rsvps(event_id)",
    "CREATE INDEX IF NOT EXISTS idx_blog_comments_post_id ON blog_comments(post_id)",
];

impl DatabaseManager {
    pub async fn new(config: &ConfigDatabaseConfig) -> Result<Self, DatabaseError> {
        let db_type = DbType::from(config.db_type());

        match db_type {
            DbType::Memory => Ok(Self::in_memory()),
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let connection_string = config.connection_string();
                let max_connections = config.max_connections();
                let min_connections = config.min_connections();

                let manager = ConnectionManager::<PgConnection>::new(connection_string);

                let builder = r2d2::Pool::builder()
                    .max_size(max_connections.unwrap_or(10))
                    .min_idle(Some(min_connections.unwrap_or(1)));

                let pool = builder
                    .build(manager)
                    .map_err(|e| DatabaseError::Connection(e.to_string()))?;

                Ok(Self {
                    member_store: Arc::new(PostgresMemberStore::new(pool.clone())),
                    gear_store: Arc::new(PostgresGearStore::new(pool.clone())),
                    event_store: Arc::new(PostgresEventStore::new(pool.clone())),
                    rsvp_store: Arc::new(PostgresRsvpStore::new(pool.clone())),
                    post_store: Arc::new(PostgresPostStore::new(pool.clone())),
                    comment_store: Arc::new(PostgresCommentStore::new(pool.clone())),
                    party_store: Arc::new(PostgresPartyStore::new(pool.clone())),
                    postgres_pool: Some(pool),
                    #[cfg(feature = "sqlite")]
                    sqlite_path: None,
                    db_type,
                })
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = config.sqlite_path().ok_or_else(|| {
                    DatabaseError::Connection("sqlite path is not configured".to_string())
                })?;
                let path_arc = Arc::new(path.clone());

                Ok(Self {
                    #[cfg(feature = "postgres")]
                    postgres_pool: None,
                    member_store: Arc::new(SqliteMemberStore::new(path_arc.clone())),
                    gear_store: Arc::new(SqliteGearStore::new(path_arc.clone())),
                    event_store: Arc::new(SqliteEventStore::new(path_arc.clone())),
                    rsvp_store: Arc::new(SqliteRsvpStore::new(path_arc.clone())),
                    post_store: Arc::new(SqlitePostStore::new(path_arc.clone())),
                    comment_store: Arc::new(SqliteCommentStore::new(path_arc.clone())),
                    party_store: Arc::new(SqlitePartyStore::new(path_arc)),
                    sqlite_path: Some(path),
                    db_type,
                })
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Connection(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Connection(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            #[cfg(feature = "postgres")]
            postgres_pool: None,
            #[cfg(feature = "sqlite")]
            sqlite_path: None,
            member_store: store.clone(),
            gear_store: store.clone(),
            event_store: store.clone(),
            rsvp_store: store.clone(),
            post_store: store.clone(),
            comment_store: store.clone(),
            party_store: store,
            db_type: DbType::Memory,
        }
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        match self.db_type {
            DbType::Memory => Ok(()),
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let pool = self.postgres_pool.as_ref().ok_or_else(|| {
                    DatabaseError::Migration("postgres pool is missing".to_string())
                })?;
                Self::migrate_postgres(pool).await
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = self.sqlite_path.as_ref().ok_or_else(|| {
                    DatabaseError::Migration("sqlite path is missing".to_string())
                })?;
                Self::migrate_sqlite(path).await
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Migration(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Migration(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    #[cfg(feature = "postgres")]
    async fn migrate_postgres(pool: &Pool) -> Result<(), DatabaseError> {
        let pool = pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            for statement in SCHEMA_POSTGRES {
                diesel::sql_query(*statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            info!("postgres schema is up to date");
            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    #[cfg(feature = "sqlite")]
    async fn migrate_sqlite(path: &str) -> Result<(), DatabaseError> {
        use diesel::RunQueryDsl;

        let path = path.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = crate::db::sqlite::establish_connection(&path)?;

            for statement in SCHEMA_SQLITE {
                diesel::sql_query(*statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            info!(path = %path, "sqlite schema is up to date");
            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    pub fn member_store(&self) -> Arc<dyn MemberStore> {
        self.member_store.clone()
    }

    pub fn gear_store(&self) -> Arc<dyn GearStore> {
        self.gear_store.clone()
    }

    pub fn event_store(&self) -> Arc<dyn EventStore> {
        self.event_store.clone()
    }

    pub fn rsvp_store(&self) -> Arc<dyn RsvpStore> {
        self.rsvp_store.clone()
    }

    pub fn post_store(&self) -> Arc<dyn PostStore> {
        self.post_store.clone()
    }

    pub fn comment_store(&self) -> Arc<dyn CommentStore> {
        self.comment_store.clone()
    }

    pub fn party_store(&self) -> Arc<dyn PartyStore> {
        self.party_store.clone()
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use chrono::{Duration, Utc};
    use tempfile::NamedTempFile;

    use super::DatabaseManager;
    use crate::config::DatabaseConfig;
    use crate::db::{Event, NewBlogComment, NewBlogPost, NewMember, RsvpStatus};
    use crate::gear::{GearSlot, GearStatus};

    fn sqlite_config(path: String) -> DatabaseConfig {
        DatabaseConfig {
            url: None,
            filename: Some(path),
            max_connections: Some(1),
            min_connections: Some(1),
        }
    }

    fn event(id: &str) -> Event {
        let now = Utc::now();
        Event {
            id: id.to_string(),
            title: "Party tonight".to_string(),
            description: "Weekly clear".to_string(),
            starts_at: now + Duration::hours(4),
            ends_at: now + Duration::hours(6),
            location: Some("Aether".to_string()),
            max_participants: Some(8),
            party_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn sqlite_rsvp_upsert_roundtrip() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let db_path = file.path().to_string_lossy().to_string();
        let config = sqlite_config(db_path);

        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");

        let member = manager
            .member_store()
            .create_member(&NewMember {
                display_name: "Answer Seeker".to_string(),
                discord_id: Some("4242".to_string()),
                data_center: Some("Mana".to_string()),
            })
            .await
            .expect("create member");
        manager
            .event_store()
            .upsert_event(&event("abc-123"))
            .await
            .expect("create event");

        let first = manager
            .rsvp_store()
            .upsert_rsvp("abc-123", member.id, RsvpStatus::Going)
            .await
            .expect("first upsert");
        let again = manager
            .rsvp_store()
            .upsert_rsvp("abc-123", member.id, RsvpStatus::Going)
            .await
            .expect("redelivered upsert");
        assert_eq!(first.id, again.id);

        manager
            .rsvp_store()
            .upsert_rsvp("abc-123", member.id, RsvpStatus::Declined)
            .await
            .expect("status change");

        let manager_reopened = DatabaseManager::new(&config).await.expect("db manager reopened");
        manager_reopened.migrate().await.expect("migrate reopened");

        let rows = manager_reopened
            .rsvp_store()
            .list_rsvps_for_event("abc-123")
            .await
            .expect("list rsvps");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].member_id, member.id);
        assert_eq!(rows[0].status, RsvpStatus::Declined);

        let resolved = manager_reopened
            .member_store()
            .get_member_by_discord_id("4242")
            .await
            .expect("lookup")
            .expect("member exists");
        assert_eq!(resolved.id, member.id);

        assert!(
            manager_reopened
                .member_store()
                .delete_member(member.id)
                .await
                .expect("delete member")
        );
        let after_delete = manager_reopened
            .rsvp_store()
            .get_rsvp("abc-123", member.id)
            .await
            .expect("query after delete");
        assert!(after_delete.is_none());
    }

    #[tokio::test]
    async fn sqlite_rsvp_for_unknown_event_reports_not_found() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let config = sqlite_config(file.path().to_string_lossy().to_string());
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");

        let member = manager
            .member_store()
            .create_member(&NewMember {
                display_name: "Lonely".to_string(),
                ..Default::default()
            })
            .await
            .expect("create member");

        let err = manager
            .rsvp_store()
            .upsert_rsvp("nope", member.id, RsvpStatus::Maybe)
            .await
            .expect_err("foreign key violation");
        assert!(matches!(err, crate::db::DatabaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn sqlite_ids_above_i32_range_do_not_alias_small_ids() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let config = sqlite_config(file.path().to_string_lossy().to_string());
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");

        let member = manager
            .member_store()
            .create_member(&NewMember {
                display_name: "First Member".to_string(),
                ..Default::default()
            })
            .await
            .expect("create member");
        assert_eq!(member.id, 1);
        manager
            .event_store()
            .upsert_event(&event("abc-123"))
            .await
            .expect("create event");

        let wide_id = (1_i64 << 32) + 1;
        let members = manager.member_store();
        assert!(members.get_member(wide_id).await.expect("get").is_none());
        assert!(!members.delete_member(wide_id).await.expect("delete"));
        assert!(members.get_member(member.id).await.expect("get").is_some());

        let err = manager
            .rsvp_store()
            .upsert_rsvp("abc-123", wide_id, RsvpStatus::Going)
            .await
            .expect_err("no such member");
        assert!(matches!(err, crate::db::DatabaseError::NotFound(_)));
        assert!(
            manager
                .rsvp_store()
                .list_rsvps_for_event("abc-123")
                .await
                .expect("list")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn sqlite_gear_snapshot_and_events_replace_in_place() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let config = sqlite_config(file.path().to_string_lossy().to_string());
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");

        let member = manager
            .member_store()
            .create_member(&NewMember {
                display_name: "Gear Check".to_string(),
                ..Default::default()
            })
            .await
            .expect("create member");

        let mut status = GearStatus::empty(member.id);
        status.toggle(GearSlot::Weapon);
        manager.gear_store().save_gear_status(&status).await.expect("save");
        status.toggle_opt_in();
        status.toggle(GearSlot::Ring);
        manager.gear_store().save_gear_status(&status).await.expect("resave");

        let stored = manager
            .gear_store()
            .get_gear_status(member.id)
            .await
            .expect("load")
            .expect("gear exists");
        assert_eq!(stored, status);
        assert_eq!(manager.gear_store().list_gear_statuses().await.expect("list").len(), 1);

        let mut raid = event("raid-night");
        manager.event_store().upsert_event(&raid).await.expect("insert event");
        raid.title = "Raid night (moved)".to_string();
        raid.location = None;
        manager.event_store().upsert_event(&raid).await.expect("replace event");

        let events = manager.event_store().list_events().await.expect("list events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Raid night (moved)");
        assert_eq!(events[0].location, None);

        let post = manager
            .post_store()
            .create_post(&NewBlogPost {
                title: "Patch notes".to_string(),
                content: "New tier released".to_string(),
                category: "news".to_string(),
                author_name: "Officer".to_string(),
                image_url: None,
            })
            .await
            .expect("create post");
        assert_eq!(
            manager.post_store().get_post(post.id).await.expect("get post").map(|p| p.title),
            Some("Patch notes".to_string())
        );
        assert!(manager.post_store().delete_post(post.id).await.expect("delete post"));
        assert!(manager.post_store().list_posts().await.expect("list posts").is_empty());
    }

    #[tokio::test]
    async fn sqlite_comments_follow_their_post_and_party_board_is_replaced() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let config = sqlite_config(file.path().to_string_lossy().to_string());
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");

        let post = manager
            .post_store()
            .create_post(&NewBlogPost {
                title: "Clear!".to_string(),
                content: "Finally down".to_string(),
                category: "progress".to_string(),
                author_name: "Officer".to_string(),
                image_url: None,
            })
            .await
            .expect("create post");

        let comments = manager.comment_store();
        for (name, text) in [("Beta", "first"), ("Gamma", "second")] {
            comments
                .create_comment(
                    post.id,
                    &NewBlogComment {
                        content: text.to_string(),
                        commenter_name: name.to_string(),
                    },
                )
                .await
                .expect("create comment");
        }
        let listed = comments.list_comments(post.id).await.expect("list comments");
        assert_eq!(
            listed.iter().map(|c| c.content.as_str()).collect::<Vec<_>>(),
            vec!["first", "second"]
        );

        let err = comments
            .create_comment(post.id + 1, &NewBlogComment::default())
            .await
            .expect_err("unknown post");
        assert!(matches!(err, crate::db::DatabaseError::NotFound(_)));

        assert!(manager.post_store().delete_post(post.id).await.expect("delete post"));
        assert!(comments.list_comments(post.id).await.expect("list").is_empty());

        let party = manager.party_store();
        assert!(party.get_party_snapshot().await.expect("empty board").is_none());
        party
            .save_party_snapshot(&serde_json::json!({"tank": ["Alpha"]}))
            .await
            .expect("save board");
        party
            .save_party_snapshot(&serde_json::json!({"healer": ["Beta"]}))
            .await
            .expect("replace board");
        let stored = party
            .get_party_snapshot()
            .await
            .expect("load board")
            .expect("board saved");
        assert_eq!(stored.data, serde_json::json!({"healer": ["Beta"]}));
    }
}
