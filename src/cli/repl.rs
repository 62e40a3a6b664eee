//! Interactive REPL for Tandem
//!
//! Wires the orchestration loop to a terminal: stdin lines become
//! actions, emitted events are printed and persisted. Typing a path to an
//! existing file ingests it for the current agent; any other line goes to
//! the current thread (starting one first if needed).

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::agent::{ActionStream, ForwardAppends, Orchestrator, Registry};
use crate::core::{Action, Config, Event, Result, TandemError, ThreadRef};
use crate::service::OpenAiService;
use crate::store::{FileStore, KvStore};

/// How the driver feeds actions to the loop
enum SourceMode {
    /// Read stdin until EOF or an exit command
    Interactive,
    /// Send one message to a fresh thread, then stop
    OneShot(String),
}

/// Interactive driver around the orchestration loop
pub struct Repl {
    config: Config,
    service: Arc<OpenAiService>,
    store: FileStore,
    agents: Arc<Registry<String>>,
    threads: Arc<Registry<ThreadRef>>,
    forward_appends: bool,
}

impl Repl {
    /// Create a REPL from configuration and an API key
    pub fn new(config: Config, api_key: impl Into<String>) -> Result<Self> {
        let service = Arc::new(OpenAiService::from_config(&config, api_key));
        let store = FileStore::open(config.store_path())?;

        Ok(Self {
            config,
            service,
            store,
            agents: Arc::new(Registry::new()),
            threads: Arc::new(Registry::new()),
            forward_appends: false,
        })
    }

    /// Forward appended messages to the service instead of dropping them
    pub fn with_forward_appends(mut self, forward: bool) -> Self {
        self.forward_appends = forward;
        self
    }

    /// Run the interactive session
    pub async fn run(self) -> Result<()> {
        self.print_banner();
        self.run_with(SourceMode::Interactive).await
    }

    /// Send a single message and exit once the conversation settles
    pub async fn run_message(self, text: impl Into<String>) -> Result<()> {
        self.run_with(SourceMode::OneShot(text.into())).await
    }

    async fn run_with(self, mode: SourceMode) -> Result<()> {
        let name = self.config.agent.name.clone();
        let saved_id = self.store.get(&format!("agents.{}.id", name)).await?;
        if saved_id.is_some() {
            debug!(name = %name, "found saved agent id");
        }
        let seed = Action::CreateAgent {
            agent_id: saved_id,
            name,
            instructions: self.config.instructions()?,
        };

        let (action_tx, action_rx) = mpsc::channel::<Action>(8);
        let (event_tx, mut event_rx) = mpsc::channel::<Event>(self.config.agent.event_buffer);

        let mut orchestrator = Orchestrator::new(
            Arc::clone(&self.service),
            self.config.clone(),
            event_tx,
        );
        if self.forward_appends {
            orchestrator = orchestrator.with_append_hook(ForwardAppends);
        }
        let actions: ActionStream = Box::pin(ReceiverStream::new(action_rx));
        let loop_task = tokio::spawn(orchestrator.run(actions));

        action_tx
            .send(seed)
            .await
            .map_err(|_| TandemError::work("orchestrator exited before seeding"))?;

        let input_task = match mode {
            SourceMode::Interactive => {
                Self::spawn_interactive(&self.agents, &self.threads, action_tx)
            }
            SourceMode::OneShot(text) => {
                Self::spawn_one_shot(&self.agents, &self.threads, action_tx, text)
            }
        };

        // Consume events until the loop finishes; each must be handled
        // before the loop proceeds past the channel's capacity
        let sink_result = {
            let mut result = Ok(());
            while let Some(event) = event_rx.recv().await {
                if let Err(e) = self.handle_event(event).await {
                    result = Err(e);
                    break;
                }
            }
            result
        };

        input_task.abort();
        if sink_result.is_err() {
            loop_task.abort();
        }

        let loop_result = loop_task.await;
        sink_result?;
        match loop_result {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(TandemError::work(format!(
                "orchestrator task panicked: {}",
                e
            ))),
        }
    }

    /// React to one emitted event: persist, publish, print
    async fn handle_event(&self, event: Event) -> Result<()> {
        match event {
            Event::AgentCreated { agent_id, name } | Event::AgentRetrieved { agent_id, name } => {
                self.store
                    .set(&format!("agents.{}.id", name), &agent_id)
                    .await?;
                println!("Agent '{}' ready ({})", name, agent_id);
                self.agents.insert(name, agent_id);
            }
            Event::ThreadCreated {
                agent_id,
                thread_id,
            } => {
                let thread = ThreadRef {
                    agent_id: agent_id.clone(),
                    thread_id: thread_id.clone(),
                };
                self.store
                    .set(
                        &format!("agents.{}.current_thread.id", agent_id),
                        &serde_json::to_string(&thread)?,
                    )
                    .await?;
                println!("(thread {} started)", thread_id);
                self.threads.insert(thread_id, thread);
            }
            Event::RunCreated { run_id, .. } => {
                debug!(run_id = %run_id, "run created");
            }
            Event::RunCompleted { run_id, .. } => {
                debug!(run_id = %run_id, "run completed");
            }
            Event::RunStatusUnknown { run_id, status, .. } => {
                eprintln!("Run {} stopped with status '{}'", run_id, status);
            }
            Event::MessageReceived { role, text, .. } => {
                println!("\n{}: {}\n", role, text);
            }
        }
        Ok(())
    }

    /// Turn stdin lines into actions until EOF or an exit command
    fn spawn_interactive(
        agents: &Arc<Registry<String>>,
        threads: &Arc<Registry<ThreadRef>>,
        tx: mpsc::Sender<Action>,
    ) -> JoinHandle<()> {
        let agents = Arc::clone(agents);
        let threads = Arc::clone(threads);

        tokio::spawn(async move {
            loop {
                let line = match read_line().await {
                    Some(line) => line,
                    None => break,
                };
                let line = line.trim().to_string();

                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }

                if Path::new(&line).is_file() {
                    let agent_id = agents.wait_current().await;
                    let action = Action::IngestFile {
                        agent_id,
                        path: line.into(),
                    };
                    if tx.send(action).await.is_err() {
                        break;
                    }
                    continue;
                }

                // Plain text goes to the current thread; start one first
                // if this session has none yet
                let agent_id = agents.wait_current().await;
                let thread = match threads.current() {
                    Some(thread) => thread,
                    None => {
                        if tx.send(Action::StartThread { agent_id }).await.is_err() {
                            break;
                        }
                        threads.wait_current().await
                    }
                };
                let action = Action::AppendMessage {
                    thread_id: thread.thread_id,
                    text: line,
                };
                if tx.send(action).await.is_err() {
                    break;
                }
            }
            // Dropping the sender ends the action stream; the loop
            // drains its outstanding work and exits
        })
    }

    /// Start a thread, send one message, and close the action stream
    fn spawn_one_shot(
        agents: &Arc<Registry<String>>,
        threads: &Arc<Registry<ThreadRef>>,
        tx: mpsc::Sender<Action>,
        text: String,
    ) -> JoinHandle<()> {
        let agents = Arc::clone(agents);
        let threads = Arc::clone(threads);

        tokio::spawn(async move {
            let agent_id = agents.wait_current().await;
            if tx.send(Action::StartThread { agent_id }).await.is_err() {
                return;
            }
            let thread = threads.wait_current().await;
            let _ = tx
                .send(Action::AppendMessage {
                    thread_id: thread.thread_id,
                    text,
                })
                .await;
        })
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!("Tandem - multiplexed assistant runtime");
        println!("──────────────────────────────────────");
        println!("Agent:   {}", self.config.agent.name);
        println!("Model:   {}", self.config.service.model);
        println!("Service: {}", self.config.service.base_url);
        println!();
        println!("Type a message, a path to a file to ingest, or 'exit'.");
        println!();
    }
}

/// Read one line from stdin on a blocking thread, prompting first
async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        print!("You: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(_) => None,
        }
    })
    .await
    .ok()
    .flatten()
}
