//! The control loop
//!
//! One iteration, forever:
//!
//! ```text
//! ensure_connected ──► service ──► sample ──► publish ──► sleep
//!  (blocks, retries)   (relays)    (ADC)     (telemetry)
//! ```
//!
//! There is no shutdown path. Sampling happens after the reconnect check, so
//! nothing is sampled (or buffered) while the broker is unreachable.

use std::time::Duration;
use tracing::{info, warn};

use crate::mqtt::{BrokerLink, MqttSession};
use crate::relay::RelayDispatcher;
use crate::sensor::Sampler;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterationOutcome {
    Published,
    PublishFailed,
    SampleFailed,
}

pub struct ControlLoop<L: BrokerLink> {
    session: MqttSession<L>,
    dispatcher: RelayDispatcher,
    sampler: Sampler,
    publish_interval: Duration,
    iterations: u64,
}

impl<L: BrokerLink> ControlLoop<L> {
    pub fn new(
        session: MqttSession<L>,
        dispatcher: RelayDispatcher,
        sampler: Sampler,
        publish_interval: Duration,
    ) -> Self {
        Self {
            session,
            dispatcher,
            sampler,
            publish_interval,
            iterations: 0,
        }
    }

    pub fn session(&self) -> &MqttSession<L> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MqttSession<L> {
        &mut self.session
    }

    pub fn dispatcher(&self) -> &RelayDispatcher {
        &self.dispatcher
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub async fn run_iteration(&mut self) -> IterationOutcome {
        self.iterations += 1;

        self.session.ensure_connected().await;
        self.session.service(&mut self.dispatcher).await;

        let reading = match self.sampler.sample() {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Sensor sampling failed: {}", e);
                return IterationOutcome::SampleFailed;
            }
        };

        let payload = reading.to_payload();
        match self.session.publish_telemetry(&payload).await {
            Ok(()) => {
                info!(
                    "Data published: {} (sent {}, failed {})",
                    payload,
                    self.session.status().messages_sent,
                    self.session.status().publish_failures
                );
                IterationOutcome::Published
            }
            Err(e) => {
                warn!(
                    "Data publishing failed: {} ({} failures so far)",
                    e,
                    self.session.status().publish_failures
                );
                IterationOutcome::PublishFailed
            }
        }
    }

    /// Runs until the process is terminated.
    pub async fn run(mut self) {
        info!(
            "Starting control loop, publishing every {}ms to '{}'",
            self.publish_interval.as_millis(),
            self.session.sensor_topic()
        );
        loop {
            self.run_iteration().await;
            tokio::time::sleep(self.publish_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::testing::FakeLink;
    use crate::mqtt::{ConnectionState, InboundMessage, MqttConfig};
    use crate::relay::testing::{recording_bank, WriteLog};
    use crate::relay::{RelayChannel, RelayLevel};
    use crate::sensor::testing::FixedInput;
    use crate::sensor::SensorChannels;

    fn control_loop(link: FakeLink, input: FixedInput) -> (ControlLoop<FakeLink>, WriteLog) {
        let session = MqttSession::new(
            link,
            &MqttConfig::default(),
            Duration::from_secs(2),
            Duration::from_millis(100),
        );
        let (bank, log) = recording_bank();
        let sampler = Sampler::new(Box::new(input), SensorChannels::default());
        let control = ControlLoop::new(
            session,
            RelayDispatcher::new(bank),
            sampler,
            Duration::from_secs(5),
        );
        (control, log)
    }

    fn healthy_input() -> FixedInput {
        FixedInput::new([(0, 12), (1, 7), (2, 300)])
    }

    #[tokio::test(start_paused = true)]
    async fn iteration_connects_then_publishes_telemetry() {
        let (mut control, _log) = control_loop(FakeLink::failing(2), healthy_input());

        let outcome = control.run_iteration().await;

        assert_eq!(outcome, IterationOutcome::Published);
        assert_eq!(control.session().state(), ConnectionState::Connected);
        assert_eq!(control.session().link().attempts.len(), 3);
        assert_eq!(
            control.session().link().published,
            vec![(
                "esp32/sensordata".to_string(),
                br#"{"temperature": 12.00, "humidity": 7.00, "gas": 300.00}"#.to_vec()
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_command_is_applied_before_sampling() {
        let (mut control, log) = control_loop(FakeLink::default(), healthy_input());
        control
            .session_mut()
            .link_mut()
            .inbound
            .push_back(InboundMessage::new("home/automation/control", "RELAY2_ON"));

        control.run_iteration().await;

        assert_eq!(log.borrow().writes, vec![(22, RelayLevel::High)]);
        assert_eq!(
            control.dispatcher().bank().level(RelayChannel::Two),
            Some(RelayLevel::High)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sensor_failure_skips_publish_but_still_services() {
        let (mut control, log) = control_loop(FakeLink::default(), FixedInput::new([]));
        control
            .session_mut()
            .link_mut()
            .inbound
            .push_back(InboundMessage::new("home/automation/control", "RELAY4_OFF"));

        let outcome = control.run_iteration().await;

        assert_eq!(outcome, IterationOutcome::SampleFailed);
        assert!(control.session().link().published.is_empty());
        assert_eq!(log.borrow().writes, vec![(19, RelayLevel::Low)]);
    }

    #[tokio::test(start_paused = true)]
    async fn publish_failure_is_dropped_and_next_iteration_continues() {
        let (mut control, _log) = control_loop(FakeLink::default(), healthy_input());
        control.run_iteration().await;

        control.session_mut().link_mut().fail_publish = true;
        assert_eq!(control.run_iteration().await, IterationOutcome::PublishFailed);

        control.session_mut().link_mut().fail_publish = false;
        assert_eq!(control.run_iteration().await, IterationOutcome::Published);
        assert_eq!(control.session().link().published.len(), 2);
        assert_eq!(control.iterations(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_link_reconnects_before_next_sample() {
        let (mut control, _log) = control_loop(FakeLink::default(), healthy_input());
        control.run_iteration().await;

        control.session_mut().link_mut().alive = false;
        control.session_mut().link_mut().connect_failures = 1;
        let outcome = control.run_iteration().await;

        assert_eq!(outcome, IterationOutcome::Published);
        assert_eq!(control.session().link().attempts.len(), 3);
        assert_eq!(control.session().link().published.len(), 2);
    }
}
