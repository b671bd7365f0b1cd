//! Built-in tables of the child care center.

use super::types::{Catalog, ColumnDef, ColumnType, OnDelete, TableDef};

pub const USERS: &str = "users";
pub const STAFF: &str = "staff";
pub const CHILDREN: &str = "children";
pub const ATTENDANCE: &str = "attendance";
pub const HEALTH_RECORDS: &str = "health_records";
pub const ACTIVITIES: &str = "activities";
pub const BILLING: &str = "billing";

pub const ROLES: &[&str] = &["admin", "staff"];
pub const GENDERS: &[&str] = &["Male", "Female", "Other"];
pub const ATTENDANCE_STATUSES: &[&str] = &["present", "absent", "late", "excused"];
pub const BILLING_STATUSES: &[&str] = &["pending", "paid", "overdue", "cancelled"];

const PHONE_PATTERN: &str = r"^[0-9+()\-. ]{5,20}$";

pub fn catalog() -> Catalog {
    use ColumnType::*;

    Catalog {
        tables: vec![
            TableDef::new(USERS, None)
                .column(ColumnDef::new("username", Text).not_null().unique().min_length(3).max_length(50))
                .column(ColumnDef::new("email", Text).not_null().unique().format("email").max_length(255))
                .column(ColumnDef::new("full_name", Text).max_length(255))
                .column(ColumnDef::new("hashed_password", Text).not_null().sensitive())
                .column(ColumnDef::new("role", Text).not_null().default_sql("'staff'").allowed(ROLES))
                .column(ColumnDef::new("is_active", Boolean).not_null().default_sql("TRUE"))
                .check("users_role_check", "role IN ('admin', 'staff')"),
            TableDef::new(STAFF, Some("staff"))
                .column(ColumnDef::new("user_id", Integer).unique().references(USERS, OnDelete::SetNull))
                .column(ColumnDef::new("name", Text).not_null().min_length(1).max_length(255))
                .column(ColumnDef::new("email", Text).format("email").max_length(255))
                .column(ColumnDef::new("phone", Text).pattern(PHONE_PATTERN))
                .column(ColumnDef::new("position", Text).max_length(100))
                .column(ColumnDef::new("hire_date", Date))
                .column(ColumnDef::new("salary", Double).minimum(0.0))
                .admin_writes(),
            TableDef::new(CHILDREN, Some("children"))
                .column(ColumnDef::new("name", Text).not_null().min_length(1).max_length(255))
                .column(ColumnDef::new("dob", Date).not_null())
                .column(ColumnDef::new("gender", Text).not_null().allowed(GENDERS))
                .column(ColumnDef::new("parent_name", Text).not_null().min_length(1).max_length(255))
                .column(ColumnDef::new("parent_contact", Text).not_null().pattern(PHONE_PATTERN))
                .column(ColumnDef::new("address", Text))
                .column(ColumnDef::new("allergies", Text))
                .column(ColumnDef::new("medical_info", Text))
                .column(ColumnDef::new("staff_id", Integer).references(STAFF, OnDelete::SetNull)),
            TableDef::new(ATTENDANCE, Some("attendance"))
                .column(ColumnDef::new("child_id", Integer).not_null().references(CHILDREN, OnDelete::Cascade))
                .column(ColumnDef::new("date", Date).not_null())
                .column(ColumnDef::new("check_in", Time))
                .column(ColumnDef::new("check_out", Time))
                .column(ColumnDef::new("status", Text).not_null().default_sql("'present'").allowed(ATTENDANCE_STATUSES))
                .column(ColumnDef::new("notes", Text))
                .unique_together(&["child_id", "date"])
                .check(
                    "attendance_checkout_after_checkin",
                    "check_out IS NULL OR check_in IS NULL OR check_out >= check_in",
                ),
            TableDef::new(HEALTH_RECORDS, Some("health-records"))
                .column(ColumnDef::new("child_id", Integer).not_null().references(CHILDREN, OnDelete::Cascade))
                .column(ColumnDef::new("record_date", Date).not_null())
                .column(ColumnDef::new("record_type", Text).not_null().min_length(1).max_length(100))
                .column(ColumnDef::new("description", Text))
                .column(ColumnDef::new("doctor_name", Text).max_length(255))
                .column(ColumnDef::new("notes", Text)),
            TableDef::new(ACTIVITIES, Some("activities"))
                .column(ColumnDef::new("title", Text).not_null().min_length(1).max_length(255))
                .column(ColumnDef::new("description", Text))
                .column(ColumnDef::new("activity_date", Date).not_null())
                .column(ColumnDef::new("start_time", Time))
                .column(ColumnDef::new("end_time", Time))
                .column(ColumnDef::new("staff_id", Integer).references(STAFF, OnDelete::SetNull)),
            TableDef::new(BILLING, Some("billing"))
                .column(ColumnDef::new("child_id", Integer).not_null().references(CHILDREN, OnDelete::Cascade))
                .column(ColumnDef::new("amount", Double).not_null().minimum(0.0))
                .column(ColumnDef::new("due_date", Date).not_null())
                .column(ColumnDef::new("paid_date", Date))
                .column(ColumnDef::new("status", Text).not_null().default_sql("'pending'").allowed(BILLING_STATUSES))
                .column(ColumnDef::new("description", Text))
                .check("billing_amount_non_negative", "amount >= 0")
                .admin_writes(),
        ],
    }
}
