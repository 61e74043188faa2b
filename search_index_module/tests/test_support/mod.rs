#![allow(dead_code)]

pub fn require_supabase_db_url(test_name: &str) -> Option<String> {
    dotenvy::dotenv().ok();
    match std::env::var("SUPABASE_DB_URL") {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            eprintln!("Skipping {test_name}; SUPABASE_DB_URL not set.");
            None
        }
    }
}
