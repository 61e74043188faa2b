//! Manage and look up saved replies from the command line.

use saved_replies_module::{
    SavedRepliesConfig, SavedReply, SavedReplyFinder, SavedReplyStore, SqliteSavedReplyStore,
};
use std::env;
use std::process::exit;
use std::sync::Arc;

fn print_usage() {
    eprintln!(
        r##"Usage: saved-replies <command> [args]

Commands:
  add <name> <content>   Create a saved reply
  list [--all]           List active replies, most used first (--all includes inactive)
  search <term>          Rank active replies by name
  find <term>            Print the single best reply for <term>
  use <id>               Print a reply and count it as used
  json <id>              Print a reply as JSON

Environment Variables:
  SEARCH_INDEX_STATE_DIR         - Directory for local state (default ~/.support_desk/state)
  SAVED_REPLIES_DB_PATH          - SQLite file (default <state>/saved_replies.db)
  SAVED_REPLIES_FUZZY_THRESHOLD  - Worst fuzzy score still accepted (default 0.4)
"##
    );
}

enum Command {
    Add { name: String, content: String },
    List { all: bool },
    Search(String),
    Find(String),
    Use(String),
    Json(String),
}

fn parse_command(args: &[String]) -> Option<Command> {
    let (command, rest) = args.split_first()?;
    match (command.as_str(), rest) {
        ("add", [name, content]) => Some(Command::Add {
            name: name.clone(),
            content: content.clone(),
        }),
        ("list", []) => Some(Command::List { all: false }),
        ("list", [flag]) if flag == "--all" => Some(Command::List { all: true }),
        ("search", [_, ..]) => Some(Command::Search(rest.join(" "))),
        ("find", [_, ..]) => Some(Command::Find(rest.join(" "))),
        ("use", [id]) => Some(Command::Use(id.clone())),
        ("json", [id]) => Some(Command::Json(id.clone())),
        _ => None,
    }
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

    let Some(command) = parse_command(&args) else {
        print_usage();
        exit(1);
    };

    if let Err(err) = run(command) {
        eprintln!("[saved-replies] {}", err);
        exit(2);
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let config = SavedRepliesConfig::from_env()?;
    let store = Arc::new(SqliteSavedReplyStore::new(&config.db_path)?);
    let finder = SavedReplyFinder::with_options(store.clone(), config.fuzzy_options());

    match command {
        Command::Add { name, content } => {
            let reply = store.create_reply(&name, &content)?;
            println!("{}", reply.id);
        }
        Command::List { all } => {
            let replies = if all {
                store.list_replies()?
            } else {
                store.list_active_replies()?
            };
            for reply in &replies {
                print_summary(reply);
            }
        }
        Command::Search(term) => {
            for scored in finder.search(&term)? {
                println!("{:.4}\t{}\t{}", scored.score, scored.reply.id, scored.reply.name);
            }
        }
        Command::Find(term) => match finder.find_best_match(&term)? {
            Some(reply) => print_reply(&reply),
            None => eprintln!("no saved reply matches '{}'", term),
        },
        Command::Use(id) => {
            let reply = finder.use_reply(&id)?;
            print_reply(&reply);
        }
        Command::Json(id) => match store.get_reply(&id)? {
            Some(reply) => println!("{}", serde_json::to_string_pretty(&reply)?),
            None => return Err(format!("saved reply not found: {}", id).into()),
        },
    }
    Ok(())
}

fn print_summary(reply: &SavedReply) {
    let status = if reply.is_active { "" } else { " (inactive)" };
    println!(
        "{}\t{}\tused {}x{}",
        reply.id, reply.name, reply.usage_count, status
    );
}

fn print_reply(reply: &SavedReply) {
    println!("# {}", reply.name);
    println!("{}", reply.content);
}
