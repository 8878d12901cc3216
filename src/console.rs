//! Interactive console for manually exercising the worker. Not part of
//! the production surface.

use crate::worker::Worker;
use palimpsest_crdt::OpId;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(worker: &Worker) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let mut parts = line.trim().split(',');
        match parts.next().unwrap_or_default() {
            "newSession" => {
                let session_id = worker.new_session();
                show(worker, &session_id);
            }
            "getSession" => match parts.next() {
                Some(session_id) => {
                    match worker.engine.fetch_session(&worker.registry, session_id).await {
                        Ok(()) => show(worker, session_id),
                        Err(error) => println!("{error}"),
                    }
                }
                None => println!("usage: getSession,<sessionID>"),
            },
            "addRight" => {
                let (Some(prev), Some(text), Some(session_id)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    println!("usage: addRight,<prevID>,<text>,<sessionID>");
                    continue;
                };
                match worker.engine.local_insert(session_id, OpId::new(prev), text) {
                    Ok(element) => {
                        println!("{} -> {}", element.id, element.text);
                        show(worker, session_id);
                    }
                    Err(error) => println!("{error}"),
                }
            }
            "exit" => return Ok(()),
            "" => {}
            other => println!("invalid command: {other}"),
        }
    }
}

fn prompt() -> std::io::Result<()> {
    print!("Worker> ");
    std::io::stdout().flush()
}

fn show(worker: &Worker, session_id: &str) {
    if let Some(text) = worker.store.text(session_id) {
        println!("SessionID: {session_id}");
        println!("Message: {text}");
    }
}
