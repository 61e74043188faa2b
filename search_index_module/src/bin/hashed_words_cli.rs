//! Print the hashed words an email would be indexed under.
//!
//! Useful for checking what the search index stores for a message and for
//! computing query fingerprints by hand.

use search_index_module::{build_secret_store, EmailText, HashedWordExtractor, SearchIndexConfig};
use std::env;
use std::process::exit;

fn print_usage() {
    eprintln!(
        r##"Usage: hashed-words [--from=<address>] [--subject=<text>] [--body=<text>]

At least one of --from, --subject or --body is required.
Prints one hash per line, sorted.

Environment Variables:
  SEARCH_INDEX_STATE_DIR  - Directory for local state (default ~/.support_desk/state)
  SECRETS_BACKEND         - sqlite (default) or postgres
  SECRETS_DB_PATH         - SQLite secrets file (default <state>/secrets.db)
  SUPABASE_DB_URL         - Postgres URL when SECRETS_BACKEND=postgres
  HASH_WORDS_SECRET_NAME  - Secret name used for hashing (default hash-words)
"##
    );
}

fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{}=", flag);
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
        if arg == flag {
            return args.get(idx + 1).cloned();
        }
    }
    None
}

fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return;
    }

    let email = EmailText {
        from: parse_arg(&args, "--from"),
        subject: parse_arg(&args, "--subject"),
        body: parse_arg(&args, "--body"),
    };
    if email == EmailText::default() {
        print_usage();
        exit(1);
    }

    if let Err(err) = run(&email) {
        eprintln!("[hashed-words] {}", err);
        exit(2);
    }
}

fn run(email: &EmailText) -> Result<(), Box<dyn std::error::Error>> {
    let config = SearchIndexConfig::from_env()?;
    let secrets = build_secret_store(&config)?;
    let extractor = HashedWordExtractor::with_secret_name(secrets, &config.hash_words_secret_name);

    let mut hashed: Vec<String> = extractor.extract_hashed_words(email)?.into_iter().collect();
    hashed.sort();
    for word in hashed {
        println!("{}", word);
    }
    Ok(())
}
