//! Database tests

use super::*;
use crate::classify::ErrorKind;
use crate::models::*;
use chrono::NaiveDate;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn new_expense(amount: f64, category: Category, day: &str) -> NewExpense {
    NewExpense {
        amount,
        category,
        note: None,
        date: date(day),
    }
}

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.list_expenses("alice", None, None).unwrap().is_empty());
    assert!(db.get_profile("alice").unwrap().is_none());
}

#[test]
fn test_schema_exists() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();

    let columns: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('expenses') WHERE name IN ('id', 'user_id', 'amount', 'category', 'note', 'date', 'created_at', 'updated_at')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(columns, 8, "expenses table should have 8 expected columns");

    let columns: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('profiles') WHERE name IN ('id', 'name', 'preferred_currency', 'created_at', 'updated_at')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(columns, 5, "profiles table should have 5 expected columns");
}

#[test]
fn test_expense_crud() {
    let db = Database::in_memory().unwrap();

    let mut input = new_expense(12.5, Category::FoodAndDining, "2024-03-01");
    input.note = Some("lunch".to_string());
    let created = db.insert_expense("alice", &input).unwrap();
    assert!(created.id > 0);
    assert_eq!(created.user_id, "alice");
    assert_eq!(created.amount, 12.5);
    assert_eq!(created.category, Category::FoodAndDining);
    assert_eq!(created.note.as_deref(), Some("lunch"));
    assert_eq!(created.date, date("2024-03-01"));

    let fetched = db.get_expense("alice", created.id).unwrap().unwrap();
    assert_eq!(fetched, created);

    let updated = db
        .update_expense("alice", created.id, &new_expense(20.0, Category::Travel, "2024-03-02"))
        .unwrap()
        .unwrap();
    assert_eq!(updated.amount, 20.0);
    assert_eq!(updated.category, Category::Travel);
    assert!(updated.note.is_none());

    assert!(db.delete_expense("alice", created.id).unwrap());
    assert!(db.get_expense("alice", created.id).unwrap().is_none());
    assert!(!db.delete_expense("alice", created.id).unwrap());
}

#[test]
fn test_expenses_are_owner_scoped() {
    let db = Database::in_memory().unwrap();

    let mine = db
        .insert_expense("alice", &new_expense(10.0, Category::Other, "2024-01-01"))
        .unwrap();
    db.insert_expense("bob", &new_expense(99.0, Category::Other, "2024-01-01"))
        .unwrap();

    assert_eq!(db.list_expenses("alice", None, None).unwrap().len(), 1);
    assert!(db.get_expense("bob", mine.id).unwrap().is_none());
    assert!(db
        .update_expense("bob", mine.id, &new_expense(1.0, Category::Other, "2024-01-01"))
        .unwrap()
        .is_none());
    assert!(!db.delete_expense("bob", mine.id).unwrap());

    // Untouched by the other user's attempts
    let still_mine = db.get_expense("alice", mine.id).unwrap().unwrap();
    assert_eq!(still_mine.amount, 10.0);
}

#[test]
fn test_list_expenses_orders_and_filters_by_date() {
    let db = Database::in_memory().unwrap();

    for (amount, day) in [(1.0, "2024-03-10"), (2.0, "2024-03-01"), (3.0, "2024-03-20"), (4.0, "2024-04-02")] {
        db.insert_expense("alice", &new_expense(amount, Category::Shopping, day))
            .unwrap();
    }

    let all = db.list_expenses("alice", None, None).unwrap();
    let days: Vec<String> = all.iter().map(|e| e.date.to_string()).collect();
    assert_eq!(days, vec!["2024-04-02", "2024-03-20", "2024-03-10", "2024-03-01"]);

    let march = db
        .list_expenses("alice", Some(date("2024-03-01")), Some(date("2024-03-20")))
        .unwrap();
    assert_eq!(march.len(), 3);

    let from_mid_march = db
        .list_expenses("alice", Some(date("2024-03-11")), None)
        .unwrap();
    assert_eq!(from_mid_march.len(), 2);

    let until_march_5 = db.list_expenses("alice", None, Some(date("2024-03-05"))).unwrap();
    assert_eq!(until_march_5.len(), 1);
    assert_eq!(until_march_5[0].amount, 2.0);
}

#[test]
fn test_check_constraints_reject_invalid_rows() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();

    let result = conn.execute(
        "INSERT INTO expenses (user_id, amount, category, date) VALUES ('alice', -1, 'Other', '2024-01-01')",
        [],
    );
    assert!(result.is_err());

    let result = conn.execute(
        "INSERT INTO expenses (user_id, amount, category, date) VALUES ('alice', 1, 'Groceries', '2024-01-01')",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn test_foreign_expense_ids() {
    let db = Database::in_memory().unwrap();
    let mine = db
        .insert_expense("alice", &new_expense(5.0, Category::Other, "2024-01-01"))
        .unwrap();
    let theirs = db
        .insert_expense("bob", &new_expense(5.0, Category::Other, "2024-01-01"))
        .unwrap();

    assert!(db.foreign_expense_ids("alice", &[mine.id]).unwrap().is_empty());
    assert_eq!(
        db.foreign_expense_ids("alice", &[mine.id, theirs.id, 9999]).unwrap(),
        vec![theirs.id, 9999]
    );
}

#[test]
fn test_profile_lifecycle() {
    let db = Database::in_memory().unwrap();

    let profile = db.get_or_create_profile("alice").unwrap();
    assert_eq!(profile.id, "alice");
    assert_eq!(profile.preferred_currency, DEFAULT_CURRENCY);
    assert!(profile.name.is_none());

    // Second access returns the same profile
    let again = db.get_or_create_profile("alice").unwrap();
    assert_eq!(again.created_at, profile.created_at);

    let update = ProfileUpdate {
        name: Some(Some("Alice".to_string())),
        preferred_currency: Some("EUR".to_string()),
    };
    let updated = db.update_profile("alice", &update).unwrap().unwrap();
    assert_eq!(updated.name.as_deref(), Some("Alice"));
    assert_eq!(updated.preferred_currency, "EUR");

    let clear_name = ProfileUpdate {
        name: Some(None),
        preferred_currency: None,
    };
    let cleared = db.update_profile("alice", &clear_name).unwrap().unwrap();
    assert!(cleared.name.is_none());
    assert_eq!(cleared.preferred_currency, "EUR");

    assert_eq!(db.delete_account("alice").unwrap(), 0);
    assert!(db.get_profile("alice").unwrap().is_none());
    assert!(db.update_profile("alice", &update).unwrap().is_none());
}

#[test]
fn test_duplicate_profile_classifies_as_validation() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();
    let insert = "INSERT INTO profiles (id, preferred_currency) VALUES ('alice', 'USD')";
    conn.execute(insert, []).unwrap();

    let err = crate::Error::from(conn.execute(insert, []).unwrap_err());
    let failure = err.classify();
    assert_eq!(failure.kind, ErrorKind::Validation);
    assert_eq!(failure.status_code, 400);
    assert!(!failure.retryable);
}

#[test]
fn test_concurrent_first_access_creates_one_profile() {
    let db = Database::in_memory().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            std::thread::spawn(move || db.get_or_create_profile("alice"))
        })
        .collect();

    for handle in handles {
        let profile = handle.join().unwrap().unwrap();
        assert_eq!(profile.id, "alice");
        assert_eq!(profile.preferred_currency, DEFAULT_CURRENCY);
    }

    let conn = db.conn().unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM profiles WHERE id = 'alice'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_get_or_create_keeps_existing_profile() {
    let db = Database::in_memory().unwrap();
    db.get_or_create_profile("alice").unwrap();
    let update = ProfileUpdate {
        name: Some(Some("Alice".to_string())),
        preferred_currency: Some("EUR".to_string()),
    };
    db.update_profile("alice", &update).unwrap();

    let profile = db.get_or_create_profile("alice").unwrap();
    assert_eq!(profile.name.as_deref(), Some("Alice"));
    assert_eq!(profile.preferred_currency, "EUR");
}

#[test]
fn test_delete_account_removes_expenses_and_profile() {
    let db = Database::in_memory().unwrap();
    db.get_or_create_profile("alice").unwrap();
    db.insert_expense("alice", &new_expense(5.0, Category::Other, "2024-01-01"))
        .unwrap();
    db.insert_expense("alice", &new_expense(6.0, Category::Travel, "2024-01-02"))
        .unwrap();
    db.insert_expense("bob", &new_expense(7.0, Category::Travel, "2024-01-02"))
        .unwrap();

    assert_eq!(db.delete_account("alice").unwrap(), 2);
    assert!(db.get_profile("alice").unwrap().is_none());
    assert!(db.list_expenses("alice", None, None).unwrap().is_empty());
    assert_eq!(db.list_expenses("bob", None, None).unwrap().len(), 1);
}
