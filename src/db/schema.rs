diesel::table! {
    members (id) {
        id -> BigInt,
        display_name -> Text,
        discord_id -> Nullable<Text>,
        data_center -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    gear_statuses (member_id) {
        member_id -> BigInt,
        gear -> Text,
        opt_in -> Bool,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    events (id) {
        id -> Text,
        title -> Text,
        description -> Text,
        starts_at -> Timestamptz,
        ends_at -> Timestamptz,
        location -> Nullable<Text>,
        max_participants -> Nullable<Integer>,
        party_id -> Nullable<BigInt>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    event_rsvps (id) {
        id -> BigInt,
        event_id -> Text,
        member_id -> BigInt,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
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
        created_at -> Timestamptz,
    }
}

diesel::table! {
    blog_comments (id) {
        id -> BigInt,
        post_id -> BigInt,
        content -> Text,
        commenter_name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    party_snapshots (id) {
        id -> BigInt,
        data -> Text,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(event_rsvps -> events (event_id));
diesel::joinable!(blog_comments -> blog_posts (post_id));
diesel::joinable!(event_rsvps -> members (member_id));
diesel::joinable!(gear_statuses -> members (member_id));

diesel::allow_tables_to_appear_in_same_query!(
    members,
    gear_statuses,
    events,
    event_rsvps,
    blog_posts,
    blog_comments,
    party_snapshots,
);
