//! The interactive line-oriented shell (§6.1), an external collaborator
//! around the Engine A public surface: not part of the core, but grounded
//! in the teacher's REPL-shaped `main.rs` and its `formatting.rs`
//! table-printing routine.

use ristretto_rs::db::DbHandle;
use ristretto_rs::row_sink::{materialize, RowSink};
use ristretto_rs::value::Value;
use std::io::{self, BufRead, Write};

struct PrintSink {
    printed_header: bool,
}

impl RowSink for PrintSink {
    fn accept(&mut self, names: &[String], values: &[Value]) {
        if !self.printed_header {
            println!("{}", names.join(" | "));
            self.printed_header = true;
        }
        let rendered: Vec<String> = values.iter().map(materialize).collect();
        println!("{}", rendered.join(" | "));
    }
}

fn is_query_statement(sql: &str) -> bool {
    let upper = sql.trim_start().to_ascii_uppercase();
    upper.starts_with("SELECT") || upper.starts_with("SHOW") || upper.starts_with("DESCRIBE") || upper.starts_with("DESC ")
}

fn main() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = std::env::args().nth(1).unwrap_or_else(|| ":memory:".to_string());
    let mut db = DbHandle::open(&path).with_context(|| format!("failed to open database {}", path))?;

    println!("ristretto-shell {} -- enter .help for usage", env!("CARGO_PKG_VERSION"));
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading from stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed {
            ".exit" => break,
            ".help" => {
                println!(".exit              leave the shell");
                println!(".help              show this message");
                println!(".version           print the crate version");
                println!("Anything else is run as SQL (CREATE TABLE, INSERT, SELECT, SHOW TABLES, DESCRIBE, SHOW CREATE TABLE).");
                continue;
            }
            ".version" => {
                println!("{}", env!("CARGO_PKG_VERSION"));
                continue;
            }
            _ => {}
        }

        if is_query_statement(trimmed) {
            let mut sink = PrintSink { printed_header: false };
            let code = db.query(trimmed, &mut sink);
            if code != ristretto_rs::ResultCode::Ok {
                eprintln!("error: {}", ristretto_rs::db::error_string(code));
            }
        } else {
            let code = db.exec(trimmed);
            if code != ristretto_rs::ResultCode::Ok {
                eprintln!("error: {}", ristretto_rs::db::error_string(code));
            }
        }
        io::stdout().flush().context("flushing stdout")?;
    }

    Ok(())
}
