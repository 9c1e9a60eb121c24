// Tables are created by `ProgressRepository::create_tables`; keep the two in sync.

diesel::table! {
    review_states (user_id, item_id) {
        user_id -> Integer,
        item_id -> Integer,
        ease_factor -> Double,
        interval_days -> Integer,
        repetitions -> Integer,
        next_review_at -> Timestamp,
        times_seen -> Integer,
        times_correct -> Integer,
        last_quality -> Nullable<Integer>,
        last_reviewed_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    vocabulary (item_id) {
        item_id -> Integer,
        tier -> Integer,
    }
}

diesel::joinable!(review_states -> vocabulary (item_id));

diesel::allow_tables_to_appear_in_same_query!(
    review_states,
    vocabulary,
);
