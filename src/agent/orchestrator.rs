//! Agent orchestrator
//!
//! The long-running loop that drives an assistant service through the
//! work multiplexer: it pulls actions from a source, starts the matching
//! service operations, polls runs until they settle, walks message
//! streams, and emits domain events for every observed occurrence.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::agent::hooks::{AppendHook, DropAppends};
use crate::core::{Action, Config, Event, Result, Run, RunStatus, TandemError, ThreadMessage};
use crate::service::{AssistantService, CreateAssistant, MessageCursor};
use crate::work::{ErrorPolicy, WorkSet};

/// A lazy sequence of actions for the loop to consume
pub type ActionStream = Pin<Box<dyn Stream<Item = Action> + Send>>;

/// Why a piece of multiplexed work was started.
///
/// Dispatch happens by exhaustive match on this union; the ids it carries
/// outlive individual operations and travel into the follow-up work they
/// trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkTag {
    /// Pull the next action from the source
    NextAction,
    /// Check on a run until it reaches a terminal status
    PollRun { thread_id: String, run_id: String },
    /// Walk the message stream of a thread
    ListMessages { thread_id: String },
}

/// Payload delivered when a tagged operation completes
pub enum Step {
    /// The next action, plus the source handed back for re-arming.
    /// `None` means the source is exhausted.
    Action {
        action: Option<Action>,
        rest: ActionStream,
    },
    /// A freshly fetched run status
    Run(Run),
    /// The next message from a cursor, handed back for re-arming.
    /// `None` means the stream has no further messages.
    Message {
        item: Option<ThreadMessage>,
        cursor: MessageCursor,
    },
}

/// The orchestration loop over one assistant service
pub struct Orchestrator<S> {
    /// Service every operation runs against
    service: Arc<S>,
    /// Configuration
    config: Config,
    /// Event channel to the sink; its capacity is the backpressure bound
    events: mpsc::Sender<Event>,
    /// Handler for appended messages
    append_hook: Box<dyn AppendHook>,
}

impl<S: AssistantService> Orchestrator<S> {
    /// Create an orchestrator with the default (dropping) append hook
    pub fn new(service: Arc<S>, config: Config, events: mpsc::Sender<Event>) -> Self {
        Self {
            service,
            config,
            events,
            append_hook: Box::new(DropAppends),
        }
    }

    /// Replace the append hook
    pub fn with_append_hook(mut self, hook: impl AppendHook + 'static) -> Self {
        self.append_hook = Box::new(hook);
        self
    }

    /// Drive the loop until the action source is exhausted and all
    /// outstanding work has drained, or until an operation fails.
    ///
    /// Failures propagate unmodified; the work set aborts whatever is
    /// still pending on the way out.
    pub async fn run(self, actions: ActionStream) -> Result<()> {
        let mut work: WorkSet<WorkTag, Step> = WorkSet::new(ErrorPolicy::Strict);
        Self::arm_pull(&mut work, actions);

        while let Some(completed) = work.join_next().await {
            let (tag, step) = completed?;
            self.dispatch(&mut work, tag, step).await?;
        }

        info!("orchestration loop drained");
        Ok(())
    }

    /// Route one completion to its branch
    async fn dispatch(
        &self,
        work: &mut WorkSet<WorkTag, Step>,
        tag: WorkTag,
        step: Step,
    ) -> Result<()> {
        match (tag, step) {
            (WorkTag::NextAction, Step::Action { action, rest }) => match action {
                Some(action) => {
                    // Re-arm the pull before any branch runs so the
                    // pipeline never stalls on a slow operation
                    Self::arm_pull(work, rest);
                    self.handle_action(work, action).await
                }
                None => {
                    debug!("action source exhausted; draining outstanding work");
                    Ok(())
                }
            },
            (WorkTag::PollRun { .. }, Step::Run(run)) => self.handle_run(work, run).await,
            (WorkTag::ListMessages { thread_id }, Step::Message { item, cursor }) => {
                self.handle_message(work, thread_id, item, cursor).await
            }
            (tag, _) => Err(TandemError::work(format!(
                "mismatched completion for {:?}",
                tag
            ))),
        }
    }

    /// Dispatch one pulled action
    async fn handle_action(&self, work: &mut WorkSet<WorkTag, Step>, action: Action) -> Result<()> {
        match action {
            Action::CreateAgent {
                agent_id,
                name,
                instructions,
            } => {
                let mut assistant = None;
                if let Some(id) = agent_id {
                    match self.service.retrieve_assistant(&id).await {
                        Ok(found) => {
                            self.emit(Event::AgentRetrieved {
                                agent_id: found.id.clone(),
                                name: name.clone(),
                            })
                            .await?;
                            assistant = Some(found);
                        }
                        Err(err) if err.is_not_found() => {
                            debug!(agent_id = %id, "saved agent id unknown to the service; creating");
                        }
                        Err(err) => return Err(err),
                    }
                }

                if assistant.is_none() {
                    let created = self
                        .service
                        .create_assistant(CreateAssistant {
                            name: name.clone(),
                            instructions,
                            model: self.config.service.model.clone(),
                        })
                        .await?;
                    self.emit(Event::AgentCreated {
                        agent_id: created.id,
                        name,
                    })
                    .await?;
                }
                Ok(())
            }

            Action::StartThread { agent_id } => {
                let run = self.service.create_thread_and_run(&agent_id).await?;
                self.emit(Event::ThreadCreated {
                    agent_id: agent_id.clone(),
                    thread_id: run.thread_id.clone(),
                })
                .await?;
                self.emit(Event::RunCreated {
                    agent_id,
                    thread_id: run.thread_id.clone(),
                    run_id: run.id.clone(),
                })
                .await?;
                self.arm_poll(work, run.thread_id, run.id, Duration::ZERO);
                Ok(())
            }

            Action::AppendMessage { thread_id, text } => {
                self.append_hook
                    .append(self.service.as_ref(), &thread_id, &text)
                    .await
            }

            Action::IngestFile { agent_id, path } => {
                // Upload runs to completion within this dispatch
                let bytes = tokio::fs::read(&path).await?;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_string());
                let file_id = self.service.upload_file(&filename, bytes).await?;
                let updated = self.service.attach_file(&agent_id, &file_id).await?;
                info!(
                    agent_id = %agent_id,
                    file_id = %file_id,
                    attached = updated.file_ids.len(),
                    "file ingested"
                );
                Ok(())
            }
        }
    }

    /// React to a fetched run status
    async fn handle_run(&self, work: &mut WorkSet<WorkTag, Step>, run: Run) -> Result<()> {
        match run.status {
            RunStatus::Completed => {
                self.emit(Event::RunCompleted {
                    agent_id: run.assistant_id,
                    thread_id: run.thread_id.clone(),
                    run_id: run.id,
                    status: run.status,
                })
                .await?;
                self.arm_list(work, MessageCursor::new(run.thread_id));
                Ok(())
            }
            RunStatus::InProgress => {
                self.arm_poll(work, run.thread_id, run.id, self.poll_interval());
                Ok(())
            }
            status => {
                // Not a state that settles on its own; report and give up
                self.emit(Event::RunStatusUnknown {
                    agent_id: run.assistant_id,
                    thread_id: run.thread_id,
                    run_id: run.id,
                    status,
                })
                .await
            }
        }
    }

    /// React to the next item from a message cursor
    async fn handle_message(
        &self,
        work: &mut WorkSet<WorkTag, Step>,
        thread_id: String,
        item: Option<ThreadMessage>,
        cursor: MessageCursor,
    ) -> Result<()> {
        match item {
            Some(message) => {
                self.arm_list(work, cursor);
                for text in message.text_parts() {
                    self.emit(Event::MessageReceived {
                        agent_id: message.assistant_id.clone().unwrap_or_default(),
                        thread_id: thread_id.clone(),
                        role: message.role.clone(),
                        text: text.to_string(),
                    })
                    .await?;
                }
                Ok(())
            }
            None => {
                debug!(thread_id = %thread_id, "message stream drained");
                Ok(())
            }
        }
    }

    /// Register a pull of the next action
    fn arm_pull(work: &mut WorkSet<WorkTag, Step>, mut actions: ActionStream) {
        work.spawn(WorkTag::NextAction, async move {
            let action = actions.next().await;
            Ok(Step::Action {
                action,
                rest: actions,
            })
        });
    }

    /// Register a run status check after the given delay
    fn arm_poll(
        &self,
        work: &mut WorkSet<WorkTag, Step>,
        thread_id: String,
        run_id: String,
        delay: Duration,
    ) {
        let service = Arc::clone(&self.service);
        let tag = WorkTag::PollRun {
            thread_id: thread_id.clone(),
            run_id: run_id.clone(),
        };
        work.spawn(tag, async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            let run = service.retrieve_run(&thread_id, &run_id).await?;
            Ok(Step::Run(run))
        });
    }

    /// Register the next advance of a message cursor
    fn arm_list(&self, work: &mut WorkSet<WorkTag, Step>, cursor: MessageCursor) {
        let service = Arc::clone(&self.service);
        let tag = WorkTag::ListMessages {
            thread_id: cursor.thread_id().to_string(),
        };
        work.spawn(tag, async move {
            let (item, cursor) = cursor.advance(service.as_ref()).await?;
            Ok(Step::Message { item, cursor })
        });
    }

    /// Deliver one event to the sink, waiting for capacity
    async fn emit(&self, event: Event) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| TandemError::EventChannelClosed)
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.agent.poll_interval_ms)
    }
}
