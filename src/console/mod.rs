//! Terminal front-end
//!
//! The presentation collaborator for the session core: it renders whatever
//! the state holds and maps user actions onto `send`, `reset`, and
//! error-dismiss. It owns no transition logic of its own.

use std::sync::Arc;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

use crate::conversation::{Message, Sender, SessionState};
use crate::dispatch::{Dispatcher, SendOutcome};
use crate::gateway::TutorGateway;

const BANNER: &str = "Local Language Tutor";
const EMPTY_HINT: &str = "Start by typing a message below.";
const TYPING_INDICATOR: &str = "Tutor is typing...";
const HELP: &str = "Commands: /clear clears the chat, /dismiss hides the last error, /quit exits.";

pub struct Console<G> {
    dispatcher: Dispatcher<G>,
    state: Arc<Mutex<SessionState>>,
    rendered: usize,
}

impl<G: TutorGateway> Console<G> {
    pub fn new(dispatcher: Dispatcher<G>, state: Arc<Mutex<SessionState>>) -> Self {
        Self {
            dispatcher,
            state,
            rendered: 0,
        }
    }

    /// Read lines until stdin closes or the user quits. Each exchange runs
    /// to completion before the next line is read, which is what gates a
    /// second send while one is pending.
    pub async fn run(mut self) -> anyhow::Result<()> {
        println!("{}", BANNER);
        println!("{}", HELP);
        println!("{}", EMPTY_HINT);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            match line.trim() {
                "" => continue,
                "/quit" | "/exit" => break,
                "/clear" => {
                    self.state.lock().await.reset();
                    self.rendered = 0;
                    println!("{}", EMPTY_HINT);
                }
                "/dismiss" => {
                    self.state.lock().await.set_error(None);
                }
                _ => {
                    println!("{}", TYPING_INDICATOR);
                    let outcome = self.dispatcher.send(&self.state, &line).await;
                    if outcome == SendOutcome::Busy {
                        println!("The tutor is still answering, hang on.");
                    }
                    self.render_updates().await;
                }
            }
        }

        Ok(())
    }

    /// Print transcript entries added since the last render, then the error
    /// toast when one is standing.
    async fn render_updates(&mut self) {
        let state = self.state.lock().await;
        for message in &state.transcript()[self.rendered..] {
            println!("{}", format_entry(message));
        }
        self.rendered = state.transcript().len();

        if let Some(error) = state.last_error() {
            println!("⚠ {} (/dismiss to hide)", error);
        }
    }
}

fn format_entry(message: &Message) -> String {
    let label = match message.sender {
        Sender::User => "You",
        Sender::Bot => "Tutor",
    };
    let stamp = message.created_at.with_timezone(&Local).format("%H:%M");
    format!("[{}] {}: {}", stamp, label, message.text)
}
