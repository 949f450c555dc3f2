//! Esquema Diesel (escrito a mano, equivalente a `diesel print-schema` sobre
//! las migraciones del crate).

diesel::table! {
    makes (id) {
        id -> Uuid,
        name -> Text,
        logo_url -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    models (id) {
        id -> Uuid,
        make_id -> Uuid,
        name -> Text,
        years -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    procedures (id) {
        id -> Uuid,
        model_id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        category -> Text,
        difficulty -> Text,
        time_minutes -> Nullable<Int4>,
        cost_min -> Nullable<Int4>,
        cost_max -> Nullable<Int4>,
        tools -> Jsonb,
        steps -> Jsonb,
        notes -> Jsonb,
        chip_type -> Nullable<Text>,
        pin_code -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    procedure_variants (id) {
        id -> Uuid,
        procedure_id -> Uuid,
        variant_name -> Text,
        hardware_type -> Nullable<Text>,
        notes -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tool_guides (id) {
        id -> Uuid,
        variant_id -> Uuid,
        tool_name -> Text,
        steps -> Jsonb,
        notes -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    linked_procedures (id) {
        id -> Uuid,
        procedure_id -> Uuid,
        linked_procedure_id -> Uuid,
        relationship -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    procedure_feedback (id) {
        id -> Uuid,
        procedure_id -> Uuid,
        variant_id -> Nullable<Uuid>,
        user_id -> Uuid,
        content -> Text,
        feedback_type -> Text,
        status -> Text,
        admin_notes -> Nullable<Text>,
        created_at -> Timestamptz,
        reviewed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    profiles (id) {
        id -> Uuid,
        email -> Nullable<Text>,
        full_name -> Nullable<Text>,
        avatar_url -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    user_roles (id) {
        id -> Uuid,
        user_id -> Uuid,
        role -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(models -> makes (make_id));
diesel::joinable!(procedures -> models (model_id));
diesel::joinable!(procedure_variants -> procedures (procedure_id));
diesel::joinable!(tool_guides -> procedure_variants (variant_id));
diesel::joinable!(procedure_feedback -> procedures (procedure_id));

diesel::allow_tables_to_appear_in_same_query!(
    makes,
    models,
    procedures,
    procedure_variants,
    tool_guides,
    linked_procedures,
    procedure_feedback,
    profiles,
    user_roles,
);
