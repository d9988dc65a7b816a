//! Session Orchestrator: runs one full exchange and always tears down.
//!
//! ```text
//! UNINIT -> AUTHENTICATED -> THREAD_READY -> RESPONDED -> CLOSED
//!    \___________\_______________\_____ FAILED ____________/
//! ```
//!
//! The first failed envelope short-circuits the remaining stages. A panic in
//! any stage is caught and reported as an unexpected fault. The browsing
//! context is closed exactly once on every path that opened it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use superai_browser::{BrowserLauncher, ChromeLauncher, Page};
use superai_core::{AutomationConfig, Envelope, Error, ErrorLog};
use tracing::{debug, error, info, warn};

use crate::auth::Authenticator;
use crate::harvest::ResponseHarvester;
use crate::maintenance::{ChatMaintenance, MaintenanceStep};
use crate::model::ModelSwitcher;
use crate::session::{Session, SessionState};
use crate::thread::{ThreadChoice, ThreadSelector};
use crate::transmit::MessageTransmitter;

pub struct Orchestrator {
    config: Arc<AutomationConfig>,
    launcher: Arc<dyn BrowserLauncher>,
    log: ErrorLog,
    history: Vec<SessionState>,
}

impl Orchestrator {
    pub fn new(config: Arc<AutomationConfig>, launcher: Arc<dyn BrowserLauncher>) -> Self {
        let log = ErrorLog::new(&config.error_log);
        Self {
            config,
            launcher,
            log,
            history: vec![SessionState::Uninit],
        }
    }

    pub fn with_error_log(mut self, log: ErrorLog) -> Self {
        self.log = log;
        self
    }

    /// Current state of the most recent run.
    pub fn state(&self) -> SessionState {
        self.history.last().copied().unwrap_or(SessionState::Uninit)
    }

    /// States visited by the most recent run, in order.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// Authenticate, pick the thread and model, send `message`, harvest the
    /// reply. The browsing context is released before returning.
    pub async fn send_message_and_get_response(
        &mut self,
        choice: ThreadChoice,
        model: &str,
        message: &str,
    ) -> Envelope {
        self.history = vec![SessionState::Uninit];
        let auth = self.authenticator();
        let page = match auth.open_context().await {
            Ok(page) => page,
            Err(e) => return self.abort(&e).with_prompt(message),
        };

        let outcome = AssertUnwindSafe(self.exchange(&auth, page.as_ref(), choice, model, message))
            .catch_unwind()
            .await;
        let envelope = self.settle_outcome(outcome).with_prompt(message);

        self.teardown(page.as_ref()).await;
        envelope
    }

    /// Delete every recent thread on a freshly authenticated page.
    pub async fn clear_recent_chats(&mut self) -> Envelope {
        self.run_maintenance(&[MaintenanceStep::ClearRecentChats]).await
    }

    /// Run `steps` in order on one authenticated page, stopping at the first
    /// failure. The envelope of the last step run is returned and the page
    /// is closed once afterwards.
    pub async fn run_maintenance(&mut self, steps: &[MaintenanceStep]) -> Envelope {
        self.history = vec![SessionState::Uninit];
        let auth = self.authenticator();
        let page = match auth.open_context().await {
            Ok(page) => page,
            Err(e) => return self.abort(&e),
        };

        let outcome = AssertUnwindSafe(self.maintain(&auth, page.as_ref(), steps))
            .catch_unwind()
            .await;
        let envelope = self.settle_outcome(outcome);

        self.teardown(page.as_ref()).await;
        envelope
    }

    async fn exchange(
        &mut self,
        auth: &Authenticator,
        page: &dyn Page,
        choice: ThreadChoice,
        model: &str,
        message: &str,
    ) -> Envelope {
        let env = auth.initialize(page, &self.config.credentials).await;
        if !self.advance(&env, SessionState::Authenticated) {
            return env;
        }

        let mut session = Session::new();
        let env = ThreadSelector::new(self.config.clone(), self.log.clone())
            .select_thread(page, &mut session, choice)
            .await;
        if !self.advance(&env, SessionState::ThreadReady) {
            return env;
        }

        let switcher = ModelSwitcher::new(self.config.clone(), self.log.clone());
        if self.config.prime_models {
            let env = switcher.prime(page, model).await;
            if !env.success {
                self.transition(SessionState::Failed);
                return env;
            }
        }

        let env = MessageTransmitter::new(self.config.clone(), switcher, self.log.clone())
            .send(page, &session, message, model)
            .await;
        if !env.success {
            self.transition(SessionState::Failed);
            return env;
        }

        let env = ResponseHarvester::new(self.config.clone(), self.log.clone())
            .harvest(page, &session, message)
            .await;
        self.advance(&env, SessionState::Responded);
        env
    }

    async fn maintain(
        &mut self,
        auth: &Authenticator,
        page: &dyn Page,
        steps: &[MaintenanceStep],
    ) -> Envelope {
        let mut env = auth.initialize(page, &self.config.credentials).await;
        if !self.advance(&env, SessionState::Authenticated) {
            return env;
        }
        let maintenance = ChatMaintenance::new(self.config.clone(), self.log.clone());
        for step in steps {
            debug!("Maintenance step {:?}", step);
            env = maintenance.run(page, step).await;
            if !env.success {
                self.transition(SessionState::Failed);
                return env;
            }
        }
        env
    }

    fn authenticator(&self) -> Authenticator {
        Authenticator::new(self.config.clone(), self.launcher.clone(), self.log.clone())
    }

    fn settle_outcome(&mut self, outcome: Result<Envelope, Box<dyn Any + Send>>) -> Envelope {
        match outcome {
            Ok(env) => env,
            Err(panic) => {
                let err = Error::Unexpected(panic_message(panic.as_ref()));
                error!("Stage panicked: {}", err);
                self.log.record("orchestrator", &err.to_string(), None);
                self.transition(SessionState::Failed);
                Envelope::from_error(None, &err)
            }
        }
    }

    /// No context was opened, so there is nothing to release.
    fn abort(&mut self, err: &Error) -> Envelope {
        self.transition(SessionState::Failed);
        self.transition(SessionState::Closed);
        Envelope::from_error(Some("Initialization error"), err)
    }

    async fn teardown(&mut self, page: &dyn Page) {
        tokio::time::sleep(self.config.timeouts.close_delay()).await;
        match page.close().await {
            Ok(()) => debug!("Browsing context closed"),
            Err(e) => {
                warn!("Close failed: {}", e);
                self.log.record("close", &e.to_string(), None);
            }
        }
        self.transition(SessionState::Closed);
    }

    /// Record `next` on success, `Failed` otherwise. Returns `env.success`.
    fn advance(&mut self, env: &Envelope, next: SessionState) -> bool {
        if env.success {
            self.transition(next);
        } else {
            self.transition(SessionState::Failed);
        }
        env.success
    }

    fn transition(&mut self, next: SessionState) {
        info!("{:?} -> {:?}", self.state(), next);
        self.history.push(next);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "stage panicked".to_string()
    }
}

/// One-shot entry point against a locally launched Chrome.
pub async fn send_message_and_get_response(
    config: AutomationConfig,
    choice: ThreadChoice,
    model: &str,
    message: &str,
) -> Envelope {
    let launcher = Arc::new(ChromeLauncher::new(config.browser.clone()));
    Orchestrator::new(Arc::new(config), launcher)
        .send_message_and_get_response(choice, model, message)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "stage panicked");
    }
}
