use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                email       TEXT NOT NULL UNIQUE,
                username    TEXT NOT NULL UNIQUE,
                first_name  TEXT NOT NULL,
                last_name   TEXT NOT NULL,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE ingredients (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                name              TEXT NOT NULL,
                measurement_unit  TEXT NOT NULL,
                UNIQUE(name, measurement_unit)
            );

            CREATE TABLE tags (
                id     INTEGER PRIMARY KEY AUTOINCREMENT,
                name   TEXT NOT NULL UNIQUE,
                color  TEXT NOT NULL UNIQUE,
                slug   TEXT NOT NULL UNIQUE
            );

            CREATE TABLE recipes (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name          TEXT NOT NULL,
                text          TEXT NOT NULL,
                image         TEXT NOT NULL,
                cooking_time  INTEGER NOT NULL CHECK (cooking_time >= 1),
                pub_date      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_recipes_pub_date ON recipes(pub_date DESC);
            CREATE INDEX idx_recipes_author ON recipes(author_id);

            CREATE TABLE recipe_tags (
                recipe_id  INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                tag_id     INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (recipe_id, tag_id)
            );

            CREATE TABLE recipe_ingredients (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                recipe_id      INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                ingredient_id  INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
                amount         INTEGER NOT NULL CHECK (amount >= 1),
                UNIQUE(recipe_id, ingredient_id)
            );

            CREATE TABLE subscriptions (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                author_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE(user_id, author_id),
                CHECK (user_id <> author_id)
            );

            CREATE TABLE favorites (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                recipe_id  INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                UNIQUE(user_id, recipe_id)
            );

            CREATE TABLE shopping_cart (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                recipe_id  INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                UNIQUE(user_id, recipe_id)
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
