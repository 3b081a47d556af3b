use rusqlite::{Connection, OptionalExtension};

use super::{USER_COLUMNS, user_from_row};
use crate::error::{Constraint, on_constraint};
use crate::models::{CredentialsRow, NewUser, UserRow};
use crate::{Database, Error, Result};

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let email_taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                [&user.email],
                |row| row.get(0),
            )?;
            if email_taken {
                return Err(Error::validation("A user with this email already exists"));
            }
            let username_taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                [&user.username],
                |row| row.get(0),
            )?;
            if username_taken {
                return Err(Error::validation("A user with this username already exists"));
            }

            conn.execute(
                "INSERT INTO users (email, username, first_name, last_name, password)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    &user.email,
                    &user.username,
                    &user.first_name,
                    &user.last_name,
                    &user.password_hash,
                ),
            )
            .map_err(|e| on_constraint(e, &[Constraint::Unique], "A user with these credentials already exists"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_credentials_by_email(&self, email: &str) -> Result<Option<CredentialsRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, email, password FROM users WHERE email = ?1",
                    [email],
                    |row| {
                        Ok(CredentialsRow {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            password: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_password_hash(&self, user_id: i64) -> Result<String> {
        self.with_conn(|conn| {
            conn.query_row("SELECT password FROM users WHERE id = ?1", [user_id], |row| row.get(0))
                .optional()?
                .ok_or(Error::NotFound("User"))
        })
    }

    pub fn set_password(&self, user_id: i64, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                rusqlite::params![password_hash, user_id],
            )?;
            if changed == 0 {
                return Err(Error::NotFound("User"));
            }
            Ok(())
        })
    }

    pub fn get_user(&self, user_id: i64, viewer: Option<i64>) -> Result<UserRow> {
        self.with_conn(|conn| query_user(conn, user_id, viewer)?.ok_or(Error::NotFound("User")))
    }

    /// One page of users ordered by id, plus the total user count.
    pub fn list_users(&self, viewer: Option<i64>, limit: i64, offset: i64) -> Result<(Vec<UserRow>, i64)> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users u ORDER BY u.id LIMIT ?2 OFFSET ?3",
                USER_COLUMNS
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![viewer, limit, offset], |row| user_from_row(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total))
        })
    }
}

pub(super) fn query_user(conn: &Connection, user_id: i64, viewer: Option<i64>) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM users u WHERE u.id = ?2", USER_COLUMNS),
            rusqlite::params![viewer, user_id],
            |row| user_from_row(row, 0),
        )
        .optional()?;
    Ok(row)
}

pub(super) fn user_exists(conn: &Connection, user_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

#[cfg(test)]
mod tests {
    use crate::testutil;
    use crate::{Error, models::NewUser};

    #[test]
    fn test_duplicate_email_rejected() {
        let db = testutil::open();
        testutil::user(&db, "alice");

        let err = db
            .create_user(&NewUser {
                email: "alice@example.com".into(),
                username: "other".into(),
                first_name: "A".into(),
                last_name: "B".into(),
                password_hash: "x".into(),
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("email")));
    }

    #[test]
    fn test_is_subscribed_relative_to_viewer() {
        let db = testutil::open();
        let alice = testutil::user(&db, "alice");
        let bob = testutil::user(&db, "bob");
        db.subscribe(alice, bob).unwrap();

        assert!(db.get_user(bob, Some(alice)).unwrap().is_subscribed);
        assert!(!db.get_user(bob, None).unwrap().is_subscribed);
        assert!(!db.get_user(alice, Some(bob)).unwrap().is_subscribed);
    }

    #[test]
    fn test_list_users_pages() {
        let db = testutil::open();
        for name in ["a", "b", "c"] {
            testutil::user(&db, name);
        }
        let (rows, total) = db.list_users(None, 2, 2).unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].username, "c");
    }

    #[test]
    fn test_unknown_user_not_found() {
        let db = testutil::open();
        assert!(matches!(db.get_user(42, None), Err(Error::NotFound("User"))));
    }
}
