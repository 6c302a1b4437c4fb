//! Line commands typed at the prompt.

use chrono::{DateTime, Utc};
use docdesk_core::{AnalysisTab, Msg};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Dispatch(Vec<Msg>),
    Login { email: String, password: String },
    Logout,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  reload                    fetch documents, projects and saved analyses
  select <doc-id>           toggle a document in the selection
  all                       select all ready documents, or clear the selection
  confirm                   open the analysis for the selection
  expand <project-id>       expand or collapse a project
  open <analysis-id>        reopen a saved analysis
  ask <question>            send a question about the open documents
  cancel                    cancel the running question
  retry <message-id>        retry a failed answer
  compare-retry             retry the document comparison
  tab <chat|comparison|patterns|contradictions>
  clear                     clear the conversation
  close                     close the analysis
  login <email> <password>
  logout
  help
  quit";

pub fn parse_command(line: &str, now: DateTime<Utc>) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let single = |msg: Msg| -> Result<Command, String> { Ok(Command::Dispatch(vec![msg])) };

    match verb {
        "" => Ok(Command::Dispatch(Vec::new())),
        "reload" => single(Msg::Started),
        "select" => single(Msg::SelectorToggled {
            document_id: required(rest, "document id")?,
        }),
        "all" => single(Msg::SelectorToggleAll),
        "confirm" => single(Msg::SelectionConfirmed),
        "expand" => single(Msg::ProjectToggled {
            project_id: required(rest, "project id")?,
        }),
        "open" => single(Msg::SavedAnalysisOpened {
            analysis_id: required(rest, "analysis id")?,
        }),
        "ask" => {
            let question = required(rest, "question")?;
            Ok(Command::Dispatch(vec![
                Msg::QueryInputChanged(question),
                Msg::QuerySubmitted { at: now },
            ]))
        }
        "cancel" => single(Msg::CancelClicked),
        "retry" => {
            let message_id = required(rest, "message id")?
                .parse()
                .map_err(|_| format!("not a message id: {rest}"))?;
            single(Msg::RetryClicked { message_id, at: now })
        }
        "compare-retry" => single(Msg::ComparisonRetryClicked),
        "tab" => single(Msg::TabSelected(parse_tab(rest)?)),
        "clear" => single(Msg::ClearConversation),
        "close" => single(Msg::AnalysisClosed),
        "login" => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(email), Some(password)) => Ok(Command::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                }),
                _ => Err("usage: login <email> <password>".to_string()),
            }
        }
        "logout" => Ok(Command::Logout),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command: {other} (try `help`)")),
    }
}

fn required(rest: &str, what: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("missing {what}"))
    } else {
        Ok(rest.to_string())
    }
}

fn parse_tab(name: &str) -> Result<AnalysisTab, String> {
    match name {
        "chat" => Ok(AnalysisTab::Chat),
        "comparison" => Ok(AnalysisTab::Comparison),
        "patterns" => Ok(AnalysisTab::Patterns),
        "contradictions" => Ok(AnalysisTab::Contradictions),
        other => Err(format!("unknown tab: {other}")),
    }
}
