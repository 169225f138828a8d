//! Subcommand execution and the interactive question loop.

use std::io::Write;
use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use tutor_core::types::{Citation, ContentKind};
use tutor_session::{ScanState, SessionError, SessionOrchestrator};

use crate::cli::{Command, HistoryAction, ScanSource};
use crate::render;

pub const REPL_HELP: &str = "Type a question, or:
  :jump N        open reference N of the last answer
  :pdf PATH      analyze a PDF in place of the current item
  :youtube URL   analyze a YouTube video in place of the current item
  :new           start over
  :quit          leave";

/// One line of input in the question loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Ask(String),
    Jump(usize),
    Pdf(PathBuf),
    Youtube(String),
    New,
    Help,
    Quit,
    Empty,
}

pub fn parse_line(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ReplCommand::Empty);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(ReplCommand::Ask(line.to_string()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match (name, arg) {
        ("quit" | "q", "") => Ok(ReplCommand::Quit),
        ("new", "") => Ok(ReplCommand::New),
        ("help" | "h", "") => Ok(ReplCommand::Help),
        ("jump", n) => n
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(ReplCommand::Jump)
            .ok_or_else(|| format!("Usage: :jump N (got '{}')", n)),
        ("pdf", path) if !path.is_empty() => Ok(ReplCommand::Pdf(PathBuf::from(path))),
        ("youtube" | "yt", url) if !url.is_empty() => Ok(ReplCommand::Youtube(url.to_string())),
        _ => Err(format!("Unknown command: {}", line)),
    }
}

/// Print the user-facing part of an error. Stale results print nothing.
pub fn report(err: &SessionError) {
    if let Some(message) = err.user_message() {
        eprintln!("error: {}", message);
    }
}

pub async fn run(
    session: &SessionOrchestrator,
    preview_chars: usize,
    command: Command,
) -> Result<(), SessionError> {
    let mut console = Console::new(session, preview_chars, BufReader::new(tokio::io::stdin()));
    console.execute(command).await
}

/// Terminal front end over one session.
pub struct Console<'a, R> {
    session: &'a SessionOrchestrator,
    preview_chars: usize,
    lines: Lines<R>,
    /// Transcript entries already printed.
    printed: usize,
    /// References of the most recent answer, numbered from 1.
    references: Vec<Citation>,
}

impl<'a, R: AsyncBufRead + Unpin> Console<'a, R> {
    pub fn new(session: &'a SessionOrchestrator, preview_chars: usize, input: R) -> Self {
        Self {
            session,
            preview_chars,
            lines: input.lines(),
            printed: 0,
            references: Vec::new(),
        }
    }

    pub async fn execute(&mut self, command: Command) -> Result<(), SessionError> {
        debug!(?command, "Running command");
        match command {
            Command::Scan { source } => {
                self.analyze(source).await?;
                self.repl().await
            }
            Command::Chapters { topic, level } => {
                let outline = self.session.generate_chapters(&topic, &level).await?;
                println!("{}", render::render_outline(&outline));
                Ok(())
            }
            Command::Resources {
                topic,
                level,
                chapter,
            } => {
                let bundle = self.session.expand_chapter(&topic, &level, &chapter).await?;
                self.print_inline_warning()?;
                println!("{}", render::render_bundle(&bundle));
                Ok(())
            }
            Command::Snapshot { topic, level } => {
                self.session.generate_chapters(&topic, &level).await?;
                let record = self.session.snapshot_outline().await?;
                println!("Saved {} ({} chapters)", record.id, record.chapter_count);
                println!("{}", render::render_outline(&record.outline()));
                Ok(())
            }
            Command::History { action } => self.history(action).await,
            Command::Documents => {
                let documents = self.session.list_documents().await?;
                println!("{}", render::render_documents(&documents));
                Ok(())
            }
            Command::Quiz {
                topic,
                level,
                chapter,
            } => {
                self.session.expand_chapter(&topic, &level, &chapter).await?;
                self.print_inline_warning()?;
                let quiz = self.session.generate_quiz().await?;
                println!("{}", render::render_quiz(&quiz));
                Ok(())
            }
        }
    }

    async fn history(&mut self, action: HistoryAction) -> Result<(), SessionError> {
        let records = self.session.load_history().await?;
        match action {
            HistoryAction::List => {
                println!("{}", render::render_history(&records));
            }
            HistoryAction::Show { id, chapter } => {
                let outline = self.session.select_from_history(&id)?;
                println!("{}", render::render_outline(&outline));
                if let Some(chapter) = chapter {
                    let bundle = self.session.click_chapter(&chapter).await?;
                    println!("{}", render::render_bundle(&bundle));
                }
            }
            HistoryAction::Delete { id, yes } => {
                let label = records
                    .iter()
                    .find(|r| r.id == id)
                    .map(|r| format!("{} ({})", r.topic, r.level))
                    .unwrap_or_else(|| id.clone());
                let confirmed = yes || self.confirm(&format!("Delete {}? [y/N] ", label)).await?;
                if self.session.delete_history(&id, confirmed).await? {
                    println!("Deleted {}.", id);
                } else {
                    println!("Cancelled.");
                }
            }
        }
        Ok(())
    }

    /// Question loop over the active item. Ends on `:quit` or end of input.
    pub async fn repl(&mut self) -> Result<(), SessionError> {
        println!("{}", REPL_HELP);
        loop {
            print!("> ");
            let _ = std::io::stdout().flush();
            let Some(line) = self.next_line().await? else {
                break;
            };
            let command = match parse_line(&line) {
                Ok(command) => command,
                Err(message) => {
                    eprintln!("{}", message);
                    continue;
                }
            };
            let outcome = match command {
                ReplCommand::Empty => Ok(()),
                ReplCommand::Help => {
                    println!("{}", REPL_HELP);
                    Ok(())
                }
                ReplCommand::Quit => break,
                ReplCommand::New => self.new_scan(),
                ReplCommand::Pdf(file) => self.analyze(ScanSource::Pdf { file }).await,
                ReplCommand::Youtube(url) => self.analyze(ScanSource::Youtube { url }).await,
                ReplCommand::Jump(n) => self.jump(n),
                ReplCommand::Ask(question) => self.ask(&question).await,
            };
            if let Err(err) = outcome {
                report(&err);
            }
        }
        Ok(())
    }

    async fn analyze(&mut self, source: ScanSource) -> Result<(), SessionError> {
        if self.session.snapshot()?.state == ScanState::Ready {
            debug!("Replacing the analyzed item");
            self.reset()?;
        }
        match source {
            ScanSource::Pdf { file } => {
                self.session.select_kind(ContentKind::Pdf)?;
                self.session.stage_file(file)?;
            }
            ScanSource::Youtube { url } => {
                self.session.select_kind(ContentKind::Youtube)?;
                self.session.stage_url(&url)?;
            }
        }
        println!("Analyzing...");
        if let Err(err) = self.session.submit().await {
            if self.session.snapshot()?.state == ScanState::Error {
                self.session.acknowledge_error()?;
            }
            return Err(err);
        }
        self.printed = 0;
        self.references.clear();
        self.print_new_messages()
    }

    async fn ask(&mut self, question: &str) -> Result<(), SessionError> {
        let result = self.session.ask(question).await;
        if let Ok(ref answer) = result {
            self.references = answer.references.clone();
        }
        self.print_new_messages()?;
        result.map(|_| ())
    }

    fn jump(&self, n: usize) -> Result<(), SessionError> {
        let citation = n
            .checked_sub(1)
            .and_then(|i| self.references.get(i))
            .ok_or_else(|| {
                SessionError::Validation(format!("No reference [{}] in the last answer.", n))
            })?;
        self.session.jump_to_citation(citation)?;
        if let Ok(link) = self.session.citation_link(citation) {
            println!("{}", link);
        }
        Ok(())
    }

    fn new_scan(&mut self) -> Result<(), SessionError> {
        self.reset()?;
        println!("Session cleared. Use :pdf PATH or :youtube URL to analyze something new.");
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SessionError> {
        self.session.new_scan()?;
        self.references.clear();
        self.printed = self.session.snapshot()?.messages.len();
        Ok(())
    }

    /// Print transcript entries added since the last call. The user's own
    /// questions are already on screen.
    fn print_new_messages(&mut self) -> Result<(), SessionError> {
        let messages = self.session.snapshot()?.messages;
        for message in messages.iter().skip(self.printed).filter(|m| !m.is_user()) {
            if let Some(text) = render::render_message(message, self.preview_chars) {
                println!("{}", text);
            }
        }
        self.printed = messages.len();
        Ok(())
    }

    fn print_inline_warning(&self) -> Result<(), SessionError> {
        if let Some(message) = self.session.snapshot()?.expander.error {
            eprintln!("warning: {}", message);
        }
        Ok(())
    }

    async fn confirm(&mut self, prompt: &str) -> Result<bool, SessionError> {
        print!("{}", prompt);
        let _ = std::io::stdout().flush();
        let answer = self.next_line().await?.unwrap_or_default();
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    async fn next_line(&mut self) -> Result<Option<String>, SessionError> {
        self.lines
            .next_line()
            .await
            .map_err(|e| SessionError::Internal(format!("failed to read input: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tutor_core::backend::{BackendError, HistoryStore, StaticCredentials, StudyBackend};
    use tutor_core::config::SessionConfig;
    use tutor_core::types::{
        Answer, ContentItem, Credentials, DocumentRecord, HistoryRecord, QuizQuestion, SourceRef,
        VideoLink, WebLink,
    };

    use crate::viewer::TerminalViewer;

    /// Backend that accepts every submission.
    struct AcceptingBackend;

    #[async_trait]
    impl StudyBackend for AcceptingBackend {
        async fn submit_pdf(
            &self,
            _creds: &Credentials,
            file: &Path,
        ) -> Result<ContentItem, BackendError> {
            Ok(ContentItem::new("pdf-1", ContentKind::Pdf, SourceRef::File(file.to_path_buf())))
        }

        async fn submit_youtube(
            &self,
            _creds: &Credentials,
            url: &str,
        ) -> Result<ContentItem, BackendError> {
            Ok(ContentItem::new("yt-1", ContentKind::Youtube, SourceRef::Url(url.to_string())))
        }

        async fn generate_chapters(
            &self,
            _creds: &Credentials,
            _topic: &str,
            _level: &str,
        ) -> Result<Vec<String>, BackendError> {
            Ok(Vec::new())
        }

        async fn fetch_videos(
            &self,
            _creds: &Credentials,
            _topic: &str,
            _level: &str,
            _chapter: &str,
        ) -> Result<Vec<VideoLink>, BackendError> {
            Ok(Vec::new())
        }

        async fn fetch_websites(
            &self,
            _creds: &Credentials,
            _topic: &str,
            _level: &str,
            _chapter: &str,
        ) -> Result<Vec<WebLink>, BackendError> {
            Ok(Vec::new())
        }

        async fn ask(
            &self,
            _creds: &Credentials,
            _content_id: &str,
            _question: &str,
        ) -> Result<Answer, BackendError> {
            Err(BackendError::Server("not scripted".to_string()))
        }

        async fn generate_quiz(
            &self,
            _creds: &Credentials,
            _videos: &[VideoLink],
        ) -> Result<Vec<QuizQuestion>, BackendError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl HistoryStore for AcceptingBackend {
        async fn list_history(
            &self,
            _creds: &Credentials,
        ) -> Result<Vec<HistoryRecord>, BackendError> {
            Ok(Vec::new())
        }

        async fn delete_history(&self, _creds: &Credentials, _id: &str) -> Result<(), BackendError> {
            Ok(())
        }

        async fn list_documents(
            &self,
            _creds: &Credentials,
        ) -> Result<Vec<DocumentRecord>, BackendError> {
            Ok(Vec::new())
        }
    }

    fn session() -> SessionOrchestrator {
        let backend = Arc::new(AcceptingBackend);
        SessionOrchestrator::new(
            backend.clone(),
            backend,
            Arc::new(TerminalViewer),
            Arc::new(StaticCredentials::default()),
            SessionConfig::default(),
        )
    }

    // =========================================================================
    // Console
    // =========================================================================

    #[tokio::test]
    async fn test_analyze_replaces_ready_item() {
        let session = session();
        let mut console = Console::new(&session, 80, &b""[..]);

        console
            .analyze(ScanSource::Youtube {
                url: "https://www.youtube.com/watch?v=abc123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.snapshot().unwrap().state, ScanState::Ready);

        console
            .analyze(ScanSource::Pdf {
                file: PathBuf::from("/tmp/notes.pdf"),
            })
            .await
            .unwrap();
        let snap = session.snapshot().unwrap();
        assert_eq!(snap.state, ScanState::Ready);
        assert_eq!(snap.content.map(|c| c.id), Some("pdf-1".to_string()));
    }

    #[tokio::test]
    async fn test_repl_pdf_after_scan() {
        let session = session();
        let input = ":youtube https://youtu.be/abc123\n:pdf /tmp/notes.pdf\n";
        let mut console = Console::new(&session, 80, input.as_bytes());

        console.repl().await.unwrap();
        let content = session.snapshot().unwrap().content.unwrap();
        assert_eq!(content.kind, ContentKind::Pdf);
    }

    // =========================================================================
    // Valid lines
    // =========================================================================

    #[test]
    fn test_plain_text_is_a_question() {
        assert_eq!(
            parse_line("  What is ATP? "),
            Ok(ReplCommand::Ask("What is ATP?".to_string()))
        );
        assert_eq!(parse_line("   "), Ok(ReplCommand::Empty));
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_line(":quit"), Ok(ReplCommand::Quit));
        assert_eq!(parse_line(":q"), Ok(ReplCommand::Quit));
        assert_eq!(parse_line(":new"), Ok(ReplCommand::New));
        assert_eq!(parse_line(":jump 3"), Ok(ReplCommand::Jump(3)));
        assert_eq!(
            parse_line(":pdf /tmp/notes.pdf"),
            Ok(ReplCommand::Pdf(PathBuf::from("/tmp/notes.pdf")))
        );
        assert_eq!(
            parse_line(":yt https://youtu.be/abc"),
            Ok(ReplCommand::Youtube("https://youtu.be/abc".to_string()))
        );
    }

    // =========================================================================
    // Invalid lines
    // =========================================================================

    #[test]
    fn test_jump_needs_positive_number() {
        assert!(parse_line(":jump").is_err());
        assert!(parse_line(":jump 0").is_err());
        assert!(parse_line(":jump two").is_err());
    }

    #[test]
    fn test_unknown_or_incomplete_command() {
        assert!(parse_line(":delete").is_err());
        assert!(parse_line(":pdf").is_err());
        assert!(parse_line(":new now").is_err());
    }
}
