use crate::config::Config;
use crate::debounce::Debouncer;
use crate::focus_history::FocusHistory;
use crate::ipc::ControlCommand;
use crate::window_tree::find_focused;
use crate::wm_client::{RealWmClient, WmClient};
use crate::wm_ipc::{ChangeEvent, IpcError, WindowChange};
use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Owns the focus history. Every read and write of it happens on the single
/// dispatch loop in [`Daemon::run`].
pub struct Daemon<C: WmClient = RealWmClient> {
    client: C,
    config: Config,
    history: FocusHistory,
    /// `None` when permanence is disabled
    debouncer: Option<Debouncer>,
}

impl Daemon<RealWmClient> {
    /// Connect to the window manager and seed the history with the focused window
    pub async fn new(config: Config) -> Result<Self> {
        let client = RealWmClient::new(config.socket_source(), config.connect_timeout);
        Self::with_client(client, config).await
    }
}

impl<C: WmClient> Daemon<C> {
    /// Create a Daemon with a custom WmClient (for testing)
    pub async fn with_client(mut client: C, config: Config) -> Result<Self> {
        let tree = client
            .get_tree()
            .await
            .context("Failed to query the window tree")?;

        let focused = find_focused(&tree).map(|node| node.id);
        match focused {
            Some(id) => info!("Initially focused window: {}", id),
            None => info!("No window focused at startup"),
        }

        let history = FocusHistory::with_initial(config.history_capacity(), focused);
        debug!("Focus history holds up to {} windows", history.capacity());
        let debouncer = (!config.permanence.is_zero())
            .then(|| Debouncer::new(config.permanence, config.ignore_floating));

        Ok(Daemon {
            client,
            config,
            history,
            debouncer,
        })
    }

    /// Main event loop.
    ///
    /// Only returns on a fatal condition: the event listener gave up
    /// reconnecting (or stopped), or the control socket went away.
    pub async fn run(
        mut self,
        mut window_rx: mpsc::Receiver<ChangeEvent>,
        mut control_rx: mpsc::UnboundedReceiver<ControlCommand>,
        mut listener: JoinHandle<Result<(), IpcError>>,
    ) -> Result<()> {
        info!("Starting daemon event loop");

        loop {
            let deadline = self.debouncer.as_ref().and_then(Debouncer::deadline);

            tokio::select! {
                // Apply queued focus changes before navigating
                biased;

                Some(event) = window_rx.recv() => {
                    self.handle_window_event(event, Instant::now());
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush_debounced(Instant::now());
                }
                command = control_rx.recv() => match command {
                    Some(command) => self.handle_control_command(command).await,
                    None => return Err(anyhow!("Control socket server stopped")),
                },
                result = &mut listener => {
                    return match result {
                        Ok(Ok(())) => Err(anyhow!("Window event listener stopped")),
                        Ok(Err(e)) => Err(e).context("Lost the connection to the window manager"),
                        Err(e) => Err(e).context("Window event listener crashed"),
                    };
                }
            }
        }
    }

    /// Route a window event, through the debouncer when permanence is on
    fn handle_window_event(&mut self, event: ChangeEvent, now: Instant) {
        let Some(debouncer) = self.debouncer.as_mut() else {
            self.apply_window_event(event);
            return;
        };

        let expired = debouncer.take_expired(now);
        let immediate = debouncer.offer(event, now);

        if let Some(event) = expired {
            self.apply_window_event(event);
        }
        if let Some(event) = immediate {
            self.apply_window_event(event);
        }
    }

    fn flush_debounced(&mut self, now: Instant) {
        let expired = self
            .debouncer
            .as_mut()
            .and_then(|debouncer| debouncer.take_expired(now));
        if let Some(event) = expired {
            self.apply_window_event(event);
        }
    }

    fn apply_window_event(&mut self, event: ChangeEvent) {
        let window_id = event.container_id();

        match event.change {
            WindowChange::Close => {
                debug!("Window {} closed, removing from history", window_id);
                self.history.remove(window_id);
            }
            WindowChange::Focus => {
                if self.config.ignore_floating && event.is_floating() {
                    debug!("Ignoring focus of floating window {}", window_id);
                    return;
                }
                self.history.push(window_id);
                if self.config.unique {
                    self.history.dedupe();
                }
                debug!(
                    "Window {} focused, history: {:?} (cursor {}, last {})",
                    window_id,
                    self.history.entries(),
                    self.history.cursor(),
                    self.history.last_cursor()
                );
            }
            WindowChange::Other => {}
        }
    }

    async fn handle_control_command(&mut self, command: ControlCommand) {
        // A due focus change must land before we navigate from it
        self.flush_debounced(Instant::now());

        if self.history.is_empty() {
            debug!("Nothing to {} to: history is empty", command);
            return;
        }
        if !self.history.can_navigate() {
            debug!("Nothing to {} to: only one window in history", command);
            return;
        }

        let target = match command {
            ControlCommand::Last => self.history.visit_last(),
            ControlCommand::Next => self.history.visit_next(),
            ControlCommand::Prev => self.history.visit_previous(),
        };

        let Some(window_id) = target else {
            warn!("Could not determine a window for {}", command);
            return;
        };

        info!("{}: focusing window {}", command, window_id);
        if let Err(e) = self.client.focus_window(window_id).await {
            error!("Focus command failed: {}", e);
        }
    }
}
