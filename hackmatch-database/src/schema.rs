// Kept in sync with migrations/2025-01-01-000000_init/up.sql by hand.

diesel::table! {
    users (id) {
        id -> Uuid,
        name -> Text,
        email -> Text,
        password_hash -> Text,
        bio -> Text,
        skills -> Array<Text>,
        interests -> Array<Text>,
        availability -> Text,
        github -> Text,
        linkedin -> Text,
        portfolio -> Text,
        role -> Text,
        experience -> Text,
        avatar -> Text,
        is_active -> Bool,
        revision -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    hackathons (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        organizer -> Text,
        start_date -> Timestamptz,
        end_date -> Timestamptz,
        registration_deadline -> Timestamptz,
        location -> Text,
        is_online -> Bool,
        website -> Text,
        max_team_size -> Int4,
        min_team_size -> Int4,
        categories -> Array<Text>,
        tags -> Array<Text>,
        prize -> Text,
        image -> Text,
        cancelled -> Bool,
        created_by -> Uuid,
        participants -> Array<Uuid>,
        teams -> Array<Uuid>,
        revision -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    teams (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        hackathon_id -> Nullable<Uuid>,
        leader -> Uuid,
        members -> Array<Uuid>,
        max_members -> Int4,
        skills_needed -> Array<Text>,
        requirements -> Text,
        tags -> Array<Text>,
        project_idea -> Text,
        admission -> Text,
        status -> Text,
        pending_requests -> Jsonb,
        revision -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    notifications (id) {
        id -> Uuid,
        user_id -> Uuid,
        kind -> Text,
        message -> Text,
        from_user -> Nullable<Uuid>,
        team_id -> Nullable<Uuid>,
        read -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    sessions (token_digest) {
        token_digest -> Text,
        user_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(users, hackathons, teams, notifications, sessions);
