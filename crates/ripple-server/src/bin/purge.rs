//! Interactive administrative wipe: deletes all likes, posts and users in
//! one transaction, children first. Deliberately an offline tool, not an
//! HTTP route.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use ripple_db::Database;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let db_path: PathBuf = std::env::var("RIPPLE_DB_PATH")
        .unwrap_or_else(|_| "ripple.db".into())
        .into();

    print!("Are you sure you want to delete ALL data? Type 'DELETE ALL' to confirm: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;

    if answer.trim() != "DELETE ALL" {
        println!("Operation cancelled.");
        return Ok(());
    }

    let db = Database::open(&db_path)?;
    let (likes, posts, users) = db.purge_all()?;

    println!("Deleted {} post likes", likes);
    println!("Deleted {} posts", posts);
    println!("Deleted {} users", users);
    println!("All data deleted successfully!");

    Ok(())
}
