// SQLite schema definitions
// Mirrors schema.rs with text timestamps. INTEGER keys are 64-bit in SQLite.

diesel::table! {
    members (id) {
        id -> BigInt,
        display_name -> Text,
        discord_id -> Nullable<Text>,
        data_center -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    gear_statuses (member_id) {
        member_id -> BigInt,
        gear -> Text,
        opt_in -> Bool,
        updated_at -> Text,
    }
}

diesel::table! {
    events (id) {
        id -> Text,
        title -> Text,
        description -> Text,
        starts_at -> Text,
        ends_at -> Text,
        location -> Nullable<Text>,
        max_participants -> Nullable<Integer>,
        party_id -> Nullable<BigInt>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    event_rsvps (id) {
        id -> BigInt,
        event_id -> Text,
        member_id -> BigInt,
        status -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    blog_posts (id) {
        id -> BigInt,
        title -> Text,
        content -> Text,
        category -> Text,
        author_name -> Text,
        image_url -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    blog_comments (id) {
        id -> BigInt,
        post_id -> BigInt,
        content -> Text,
        commenter_name -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    party_snapshots (id) {
        id -> BigInt,
        data -> Text,
        updated_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    members,
    gear_statuses,
    events,
    event_rsvps,
    blog_posts,
    blog_comments,
    party_snapshots,
);
