//! Headless runner implementation.

use std::io::{self, BufRead, Write};

use swarm_core::agent::Agent;
use swarm_core::config::AgentConfig;
use tracing::{debug, error, info, warn};

use crate::error::{HeadlessError, Result};
use crate::protocol::{Message, Response};

/// Totals for one `run` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Episodes started.
    pub episodes: u32,
    /// Steps answered across all episodes.
    pub steps: u64,
    /// Error lines written.
    pub errors: u32,
}

/// Drives one agent per episode from a line-oriented message stream.
pub struct HeadlessRunner {
    config: AgentConfig,
    agent: Option<Agent>,
    summary: RunSummary,
}

impl HeadlessRunner {
    /// Create a runner with the default agent config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AgentConfig::default())
    }

    /// Create a runner with a custom agent config.
    #[must_use]
    pub fn with_config(config: AgentConfig) -> Self {
        Self {
            config,
            agent: None,
            summary: RunSummary::default(),
        }
    }

    /// Whether an episode is in progress.
    #[must_use]
    pub fn in_episode(&self) -> bool {
        self.agent.is_some()
    }

    /// Run over stdin and stdout until stdin closes.
    pub fn run_stdio(&mut self) -> Result<RunSummary> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run(stdin.lock(), stdout.lock())
    }

    /// Process every line of `input`, writing responses to `output`.
    ///
    /// Only IO failures abort the loop. Malformed lines and agent errors are
    /// reported as `error` lines and the loop continues; a fatal agent error
    /// drops the current episode.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<RunSummary> {
        write_line(&mut output, &Response::ready())?;

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let response = match Message::from_json(&line) {
                Ok(message) => self.handle(message),
                Err(e) => Err(HeadlessError::from(e)),
            };
            let response = response.unwrap_or_else(|e| self.fail(&e));
            if let Some(response) = response {
                write_line(&mut output, &response)?;
            }
        }

        if let Some(agent) = self.agent.take() {
            warn!(ticks = agent.ticks(), "input closed mid-episode");
        }
        info!(
            episodes = self.summary.episodes,
            steps = self.summary.steps,
            errors = self.summary.errors,
            "session finished"
        );
        Ok(self.summary)
    }

    /// Apply one message. `None` means nothing to write.
    fn handle(&mut self, message: Message) -> Result<Option<Response>> {
        debug!(message = message.name(), "received");
        match message {
            Message::Start { map, snapshot } => {
                if let Some(previous) = self.agent.take() {
                    warn!(ticks = previous.ticks(), "start during episode; restarting");
                }
                let mut agent = Agent::new(self.config.clone())?;
                agent.on_start(map, &snapshot)?;
                self.agent = Some(agent);
                self.summary.episodes += 1;
                Ok(None)
            }
            Message::Step { snapshot } => {
                let agent = self
                    .agent
                    .as_mut()
                    .ok_or(swarm_core::error::AgentError::NotStarted)?;
                let commands = agent.step(&snapshot)?;
                self.summary.steps += 1;
                Ok(Some(Response::Commands {
                    tick: agent.ticks(),
                    game_loop: snapshot.game_loop,
                    commands,
                }))
            }
            Message::End => {
                let ticks = self.agent.take().map_or(0, |agent| agent.ticks());
                info!(ticks, "episode end");
                Ok(Some(Response::Done { ticks }))
            }
        }
    }

    fn fail(&mut self, e: &HeadlessError) -> Option<Response> {
        let fatal = e.is_fatal();
        if fatal {
            error!(error = %e, "episode aborted");
            self.agent = None;
        } else {
            warn!(error = %e, "message rejected");
        }
        self.summary.errors += 1;
        Some(Response::error(e.to_string(), fatal))
    }
}

impl Default for HeadlessRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn write_line<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}
