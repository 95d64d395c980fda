//! VPN on/off state machine
//!
//! States are `Off` (initial, not persisted) and `On`. A successful "on"
//! operation moves to `On`, a successful "off" operation moves to `Off`, and
//! a failed operation leaves the state where it was.
//!
//! Turning the VPN on while it is already on (or off while off) runs the
//! external operation again and reports its output; the state is then set
//! from that run's result as usual.
//!
//! Only one toggle may be in flight. A second request received meanwhile is
//! rejected with [`VpnPathsError::Busy`] rather than queued.

use crate::error::{Result, VpnPathsError};
use crate::store::VpnPath;
use crate::vpn::{Direction, OperationOutput, ToggleRunner, VpnState};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Drives the external toggle operation and tracks the resulting state
pub struct VpnController {
    /// External on/off collaborator
    runner: Arc<dyn ToggleRunner>,
    /// State after the last successful toggle
    state: RwLock<VpnState>,
    /// Held for the duration of a toggle
    in_flight: Mutex<()>,
}

impl VpnController {
    /// Create a controller in the `Off` state
    pub fn new(runner: Arc<dyn ToggleRunner>) -> Self {
        Self {
            runner,
            state: RwLock::new(VpnState::Off),
            in_flight: Mutex::new(()),
        }
    }

    /// Get the current state
    pub async fn state(&self) -> VpnState {
        *self.state.read().await
    }

    /// Whether the runner acts on the registered path list
    pub fn uses_paths(&self) -> bool {
        self.runner.uses_paths()
    }

    /// Run the "on" operation
    pub async fn turn_on(&self, paths: Vec<VpnPath>) -> Result<OperationOutput> {
        let (output, _) = self.toggle(Direction::On, paths).await?;
        Ok(output)
    }

    /// Run the "off" operation
    pub async fn turn_off(&self, paths: Vec<VpnPath>) -> Result<OperationOutput> {
        let (output, _) = self.toggle(Direction::Off, paths).await?;
        Ok(output)
    }

    /// Run the operation for `direction`
    ///
    /// The returned state is read before the in-flight guard is released, so
    /// it is the state this toggle left behind.
    pub async fn toggle(
        &self,
        direction: Direction,
        paths: Vec<VpnPath>,
    ) -> Result<(OperationOutput, VpnState)> {
        let _guard = self.in_flight.try_lock().map_err(|_| {
            VpnPathsError::Busy(format!(
                "Cannot turn VPN {}: another toggle is in progress",
                direction
            ))
        })?;

        let target = direction.target_state();
        let previous = self.state().await;
        if previous == target {
            info!("VPN already {}, running {} operation again", previous, direction);
        } else {
            info!("Turning VPN {}", direction);
        }

        let outcome = self.runner.run(direction, paths).await;

        let state = if outcome.success {
            *self.state.write().await = target;
            info!("VPN is now {}", target);
            target
        } else {
            warn!("VPN {} operation failed, state remains {}", direction, previous);
            previous
        };

        Ok((outcome.output, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vpn::{MockToggleRunner, ToggleOutcome};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn controller(runner: MockToggleRunner) -> VpnController {
        VpnController::new(Arc::new(runner))
    }

    #[tokio::test]
    async fn test_turn_on_success() {
        let mut runner = MockToggleRunner::new();
        runner
            .expect_run()
            .withf(|direction, _| *direction == Direction::On)
            .times(1)
            .returning(|_, _| ToggleOutcome::success("Connected"));

        let controller = controller(runner);
        assert_eq!(controller.state().await, VpnState::Off);

        let output = controller.turn_on(Vec::new()).await.unwrap();
        assert_eq!(output, "Connected");
        assert_eq!(controller.state().await, VpnState::On);
    }

    #[tokio::test]
    async fn test_turn_on_failure_keeps_state() {
        let mut runner = MockToggleRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_, _| ToggleOutcome::failure("auth failed\n"));

        let controller = controller(runner);
        let output = controller.turn_on(Vec::new()).await.unwrap();
        assert!(output.as_str().contains("auth failed"));
        assert_eq!(controller.state().await, VpnState::Off);
    }

    #[tokio::test]
    async fn test_on_then_off() {
        let mut runner = MockToggleRunner::new();
        runner
            .expect_run()
            .withf(|direction, _| *direction == Direction::On)
            .returning(|_, _| ToggleOutcome::success("up\n"));
        runner
            .expect_run()
            .withf(|direction, _| *direction == Direction::Off)
            .returning(|_, _| ToggleOutcome::success("down\n"));

        let controller = controller(runner);
        let on = controller.turn_on(Vec::new()).await.unwrap();
        let off = controller.turn_off(Vec::new()).await.unwrap();

        assert_ne!(on, off);
        assert_eq!(controller.state().await, VpnState::Off);
    }

    #[tokio::test]
    async fn test_self_transition_reruns_operation() {
        let mut runner = MockToggleRunner::new();
        runner
            .expect_run()
            .withf(|direction, _| *direction == Direction::Off)
            .times(2)
            .returning(|_, _| ToggleOutcome::success("not connected\n"));

        let controller = controller(runner);
        let first = controller.turn_off(Vec::new()).await.unwrap();
        let second = controller.turn_off(Vec::new()).await.unwrap();

        assert_eq!(first, "not connected\n");
        assert_eq!(second, "not connected\n");
        assert_eq!(controller.state().await, VpnState::Off);
    }

    #[tokio::test]
    async fn test_failed_off_keeps_on() {
        let mut runner = MockToggleRunner::new();
        runner
            .expect_run()
            .withf(|direction, _| *direction == Direction::On)
            .returning(|_, _| ToggleOutcome::success("Connected"));
        runner
            .expect_run()
            .withf(|direction, _| *direction == Direction::Off)
            .returning(|_, _| ToggleOutcome::failure("device busy"));

        let controller = controller(runner);
        controller.turn_on(Vec::new()).await.unwrap();
        controller.turn_off(Vec::new()).await.unwrap();
        assert_eq!(controller.state().await, VpnState::On);
    }

    #[tokio::test]
    async fn test_paths_are_passed_through() {
        let mut runner = MockToggleRunner::new();
        runner
            .expect_run()
            .withf(|_, paths| paths.len() == 1 && paths[0].as_str() == "/etc/wireguard/wg0.conf")
            .times(1)
            .returning(|_, _| ToggleOutcome::success(""));

        let controller = controller(runner);
        let paths = vec![VpnPath::new("/etc/wireguard/wg0.conf").unwrap()];
        controller.turn_on(paths).await.unwrap();
    }

    #[tokio::test]
    async fn test_toggle_reports_resulting_state() {
        let mut runner = MockToggleRunner::new();
        runner
            .expect_run()
            .withf(|direction, _| *direction == Direction::On)
            .times(1)
            .returning(|_, _| ToggleOutcome::success("Connected"));
        runner
            .expect_run()
            .withf(|direction, _| *direction == Direction::Off)
            .times(1)
            .returning(|_, _| ToggleOutcome::failure("device busy"));

        let controller = controller(runner);
        let (output, state) = controller.toggle(Direction::On, Vec::new()).await.unwrap();
        assert_eq!(output, "Connected");
        assert_eq!(state, VpnState::On);

        let (output, state) = controller.toggle(Direction::Off, Vec::new()).await.unwrap();
        assert_eq!(output, "device busy");
        assert_eq!(state, VpnState::On);
    }

    /// Runner that blocks until released
    struct GatedRunner {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl ToggleRunner for GatedRunner {
        async fn run(&self, _direction: Direction, _paths: Vec<VpnPath>) -> ToggleOutcome {
            self.started.notify_one();
            self.release.notified().await;
            ToggleOutcome::success("done")
        }

        fn uses_paths(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_second_toggle_while_in_flight_is_busy() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let controller = Arc::new(VpnController::new(Arc::new(GatedRunner {
            started: started.clone(),
            release: release.clone(),
        })));

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.turn_on(Vec::new()).await })
        };
        started.notified().await;

        let second = controller.turn_off(Vec::new()).await;
        assert!(matches!(second, Err(VpnPathsError::Busy(_))));

        release.notify_one();
        let output = first.await.unwrap().unwrap();
        assert_eq!(output, "done");
        assert_eq!(controller.state().await, VpnState::On);

        // Lock is released once the toggle completes
        release.notify_one();
        assert!(controller.turn_off(Vec::new()).await.is_ok());
        assert_eq!(controller.state().await, VpnState::Off);
    }
}
