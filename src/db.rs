pub use self::error::DatabaseError;
pub use self::manager::{DatabaseManager, DbType};
pub use self::models::{
    BlogComment, BlogPost, Event, Member, NewBlogComment, NewBlogPost, NewMember, PartySnapshot,
    Rsvp, RsvpStatus,
};
pub use self::stores::{
    CommentStore, EventStore, GearStore, MemberStore, PartyStore, PostStore, RsvpStore,
};

pub mod error;
pub mod manager;
pub mod memory;
pub mod models;
pub mod stores;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "postgres")]
pub mod schema;

#[cfg(feature = "sqlite")]
pub mod schema_sqlite;
#[cfg(feature = "sqlite")]
pub mod sqlite;
