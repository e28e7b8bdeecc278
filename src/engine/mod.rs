//! Connection controller: owns the decoder, the command scheduler and the
//! rate limiter, and publishes everything they produce to an [`EventSink`].

pub mod facade;
pub mod rate_limit;
pub mod scheduler;
pub mod session;
pub mod transport;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ControllerError;
use crate::tws::messages::error_code;
use crate::tws::{ApiError, Decoder, Event};

use facade::{Channel, EventSink};
use rate_limit::RateLimiter;
use scheduler::{Command, CommandScheduler};
use transport::{ConnectParams, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Core engine shared by the CLI and the async session.
///
/// Every method runs to completion before returning: inbound tokens are
/// decoded and published, queued commands are drained, and outbound sends
/// that fit the rate limit are written. Sends that do not fit wait for
/// [`Controller::flush_outbound`], which the session calls at
/// [`Controller::next_release`].
pub struct Controller {
    config: Config,
    state: ConnectionState,
    server_version: i32,
    decoder: Decoder,
    commands: CommandScheduler<Controller>,
    draining: bool,
    limiter: RateLimiter,
    transport: Box<dyn Transport>,
    sink: Box<dyn EventSink>,
}

impl Controller {
    pub fn new(config: Config, transport: Box<dyn Transport>, sink: Box<dyn EventSink>) -> Self {
        let limiter = RateLimiter::new(config.max_req_per_second);
        Self {
            config,
            state: ConnectionState::Disconnected,
            server_version: 0,
            decoder: Decoder::new(),
            commands: CommandScheduler::new(),
            draining: false,
            limiter,
            transport,
            sink,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Negotiated server version, 0 before the first connect.
    pub fn server_version(&self) -> i32 {
        self.server_version
    }

    // -- connection state machine --

    /// Connect using `client_id`, or the configured one.
    pub fn connect(&mut self, client_id: Option<i32>) -> Result<(), ControllerError> {
        if self.is_connected() {
            return Err(self.reject(ControllerError::AlreadyConnected));
        }

        let params = ConnectParams {
            host: self.config.host.clone(),
            port: self.config.port,
            client_id: client_id.unwrap_or(self.config.client_id),
        };
        match self.transport.connect(&params) {
            Ok(handshake) => {
                self.state = ConnectionState::Connected;
                self.server_version = handshake.server_version;
                info!(
                    host = %params.host,
                    port = params.port,
                    client_id = params.client_id,
                    server_version = handshake.server_version,
                    "connected"
                );
                self.emit_event(Event::Server {
                    version: handshake.server_version,
                    time: handshake.server_time,
                });
                self.emit_event(Event::Connected);
                self.resume();
                Ok(())
            }
            Err(e) => {
                error!(host = %params.host, port = params.port, "connect failed: {e:#}");
                Err(self.reject(ControllerError::ConnectFailed(format!("{e:#}"))))
            }
        }
    }

    pub fn disconnect(&mut self) -> Result<(), ControllerError> {
        if !self.is_connected() {
            return Err(self.reject(ControllerError::NotConnected));
        }

        self.transport.disconnect();
        self.state = ConnectionState::Disconnected;
        self.commands.pause();
        let dropped = self.limiter.drain_pending();
        if !dropped.is_empty() {
            warn!(dropped = dropped.len(), "pending sends dropped on disconnect");
        }
        for tokens in dropped {
            self.emit_error(
                format!(
                    "{} Pending request dropped: {}",
                    ControllerError::SendWhileDisconnected,
                    tokens.join(",")
                ),
                error_code::NOT_CONNECTED,
                error_code::NO_VALID_ID,
                None,
            );
        }
        self.decoder.clear();
        info!("disconnected");
        self.emit_event(Event::Disconnected);
        Ok(())
    }

    // -- command scheduling --

    /// Queue a command. Runs right away when the scheduler is running.
    pub fn schedule(&mut self, command: impl FnOnce(&mut Controller) + Send + 'static) {
        let command: Command<Controller> = Box::new(command);
        self.commands.schedule(command);
        self.drain_commands();
    }

    pub fn pause(&mut self) {
        self.commands.pause();
    }

    pub fn resume(&mut self) {
        self.commands.resume();
        self.drain_commands();
    }

    pub fn queued_commands(&self) -> usize {
        self.commands.len()
    }

    fn drain_commands(&mut self) {
        // Re-entrant calls from inside a command leave the work to the outer loop.
        if self.draining {
            return;
        }
        self.draining = true;
        while let Some(command) = self.commands.next_ready() {
            command(self);
        }
        self.draining = false;
    }

    // -- outbound --

    /// Send one encoded request. Goes out now, or once the rate limit allows.
    pub fn send(&mut self, tokens: Vec<String>) -> Result<(), ControllerError> {
        CommandScheduler::run_now(self, |c| c.enqueue_send(tokens))
    }

    fn enqueue_send(&mut self, tokens: Vec<String>) -> Result<(), ControllerError> {
        if !self.is_connected() {
            return Err(self.reject(ControllerError::SendWhileDisconnected));
        }
        self.limiter.submit(tokens);
        self.flush_outbound(Instant::now());
        Ok(())
    }

    /// Write every pending send the rate limit allows at `now`.
    pub fn flush_outbound(&mut self, now: Instant) {
        if !self.is_connected() {
            return;
        }
        for tokens in self.limiter.release(now) {
            self.write_to_transport(tokens);
        }
    }

    /// When pending sends next become eligible. `None` when nothing is waiting.
    pub fn next_release(&self, now: Instant) -> Option<Instant> {
        self.limiter.next_deadline(now)
    }

    pub fn pending_sends(&self) -> usize {
        self.limiter.pending_len()
    }

    fn write_to_transport(&mut self, tokens: Vec<String>) {
        match self.transport.send(&tokens) {
            Ok(()) => self.emit_event(Event::Sent { tokens }),
            Err(e) => {
                let err = ControllerError::SendFailed(format!("{e:#}"));
                error!("{err}");
                self.emit_error(err.to_string(), err.code(), error_code::NO_VALID_ID, None);
            }
        }
    }

    // -- inbound --

    /// Feed one framed message from the transport.
    pub fn on_message(&mut self, tokens: Vec<String>) {
        self.emit_event(Event::Received { tokens: tokens.clone() });
        self.decoder.enqueue_message(tokens);
        self.process_inbound();
    }

    /// Feed raw tokens from a legacy, unframed stream.
    pub fn on_tokens(&mut self, tokens: Vec<String>) {
        self.emit_event(Event::Received { tokens: tokens.clone() });
        self.decoder.enqueue_tokens(tokens);
        self.process_inbound();
    }

    fn process_inbound(&mut self) {
        let mut events = Vec::new();
        loop {
            let outcome = self.decoder.process(self.server_version, &mut events);
            for event in events.drain(..) {
                self.emit_event(event);
            }
            match outcome {
                Ok(()) => break,
                Err(e) => {
                    warn!("dropping malformed message: {e}");
                    self.emit_error(e.to_string(), error_code::BAD_MESSAGE, error_code::NO_VALID_ID, None);
                }
            }
        }
    }

    // -- publishing --

    /// Publish under the event's own name, under `result` unless it is a
    /// lifecycle or raw I/O event, and always under `all`.
    pub fn emit_event(&mut self, event: Event) {
        let name = event.name();
        debug!(event = %name, "emit");
        self.sink.publish(Channel::Event(name), &event);
        if !name.is_lifecycle() {
            self.sink.publish(Channel::Result, &event);
        }
        self.sink.publish(Channel::All, &event);
    }

    pub fn emit_error(
        &mut self,
        message: impl Into<String>,
        code: i32,
        req_id: i32,
        advanced_order_reject: Option<serde_json::Value>,
    ) {
        let mut err = ApiError::new(message, code, req_id);
        err.advanced_order_reject = advanced_order_reject;
        self.emit_event(Event::Error(err));
    }

    pub fn emit_info(&mut self, message: impl Into<String>, code: i32) {
        self.emit_event(Event::Info { message: message.into(), code });
    }

    /// Report a state-machine violation on the error channel and hand it back.
    fn reject(&mut self, err: ControllerError) -> ControllerError {
        warn!(code = err.code(), "{err}");
        self.emit_error(err.to_string(), err.code(), error_code::NO_VALID_ID, None);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::facade::Recorder;
    use super::transport::ReplayTransport;
    use super::*;
    use crate::tws::EventName;
    use rust_decimal_macros::dec;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn controller_with(transport: ReplayTransport) -> (Controller, Recorder) {
        let recorder = Recorder::new();
        let controller =
            Controller::new(Config::default(), Box::new(transport), Box::new(recorder.clone()));
        (controller, recorder)
    }

    fn controller() -> (Controller, Recorder) {
        controller_with(ReplayTransport::new(176))
    }

    fn errors(recorder: &Recorder) -> Vec<ApiError> {
        recorder
            .on(Channel::Event(EventName::Error))
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_connect_publishes_server_then_connected() {
        let (mut c, recorder) = controller();
        c.connect(None).unwrap();

        assert!(c.is_connected());
        assert_eq!(c.server_version(), 176);
        let names: Vec<EventName> = recorder.on(Channel::All).iter().map(Event::name).collect();
        assert_eq!(names, vec![EventName::Server, EventName::Connected]);
        assert!(recorder.on(Channel::Result).is_empty());
    }

    #[test]
    fn test_connect_twice_is_rejected() {
        let (mut c, recorder) = controller();
        c.connect(Some(3)).unwrap();
        let err = c.connect(None).unwrap_err();

        assert!(matches!(err, ControllerError::AlreadyConnected));
        assert!(c.is_connected());
        let errs = errors(&recorder);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, 501);
    }

    #[test]
    fn test_double_disconnect_errors_once() {
        let (mut c, recorder) = controller();
        c.connect(None).unwrap();
        c.disconnect().unwrap();
        let err = c.disconnect().unwrap_err();

        assert!(matches!(err, ControllerError::NotConnected));
        assert_eq!(c.state(), ConnectionState::Disconnected);
        assert_eq!(recorder.on(Channel::Event(EventName::Disconnected)).len(), 1);
        let errs = errors(&recorder);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, 504);
    }

    #[test]
    fn test_connect_failure_reports_connect_fail() {
        let (mut c, recorder) =
            controller_with(ReplayTransport::new(176).refuse_connections("no listener"));
        let err = c.connect(None).unwrap_err();

        assert!(matches!(err, ControllerError::ConnectFailed(_)));
        assert!(!c.is_connected());
        let errs = errors(&recorder);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, 502);
        assert!(errs[0].message.contains("no listener"));
    }

    #[test]
    fn test_send_while_disconnected() {
        let transport = ReplayTransport::new(176);
        let log = transport.sent_log();
        let (mut c, recorder) = controller_with(transport);

        let err = c.send(tokens(&["49", "1"])).unwrap_err();
        assert!(matches!(err, ControllerError::SendWhileDisconnected));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(errors(&recorder)[0].message, "Cannot send data when disconnected.");
    }

    #[test]
    fn test_send_reaches_transport_and_publishes_sent() {
        let transport = ReplayTransport::new(176);
        let log = transport.sent_log();
        let (mut c, recorder) = controller_with(transport);
        c.connect(None).unwrap();
        c.send(tokens(&["49", "1"])).unwrap();

        assert_eq!(log.lock().unwrap()[0].tokens, tokens(&["49", "1"]));
        assert_eq!(
            recorder.on(Channel::Event(EventName::Sent)),
            vec![Event::Sent { tokens: tokens(&["49", "1"]) }]
        );
    }

    #[test]
    fn test_failed_send_reports_fail_send() {
        let (mut c, recorder) =
            controller_with(ReplayTransport::new(176).fail_sends("broken pipe"));
        c.connect(None).unwrap();
        c.send(tokens(&["49", "1"])).unwrap();

        let errs = errors(&recorder);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, 509);
        assert!(recorder.on(Channel::Event(EventName::Sent)).is_empty());
    }

    #[test]
    fn test_commands_wait_for_connect_and_pause_on_disconnect() {
        let transport = ReplayTransport::new(176);
        let log = transport.sent_log();
        let (mut c, _recorder) = controller_with(transport);

        c.schedule(|c| c.send(tokens(&["49", "1"])).unwrap());
        c.schedule(|c| c.send(tokens(&["49", "2"])).unwrap());
        assert_eq!(c.queued_commands(), 2);
        assert!(log.lock().unwrap().is_empty());

        c.connect(None).unwrap();
        assert_eq!(c.queued_commands(), 0);

        c.disconnect().unwrap();
        c.schedule(|c| c.send(tokens(&["49", "3"])).unwrap());
        assert_eq!(c.queued_commands(), 1);

        c.connect(None).unwrap();
        let sent: Vec<String> = log.lock().unwrap().iter().map(|f| f.tokens[1].clone()).collect();
        assert_eq!(sent, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_command_scheduled_inside_command_keeps_fifo() {
        let transport = ReplayTransport::new(176);
        let log = transport.sent_log();
        let (mut c, _recorder) = controller_with(transport);

        c.schedule(|c| {
            c.schedule(|c| c.send(tokens(&["49", "3"])).unwrap());
            c.send(tokens(&["49", "1"])).unwrap();
        });
        c.schedule(|c| c.send(tokens(&["49", "2"])).unwrap());
        c.connect(None).unwrap();

        let sent: Vec<String> = log.lock().unwrap().iter().map(|f| f.tokens[1].clone()).collect();
        assert_eq!(sent, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_decoded_events_go_to_name_result_and_all() {
        let (mut c, recorder) = controller();
        c.connect(None).unwrap();
        recorder.clear();

        c.on_message(tokens(&["9", "1", "1001"]));

        assert_eq!(
            recorder.on(Channel::Event(EventName::NextValidId)),
            vec![Event::NextValidId { order_id: 1001 }]
        );
        assert_eq!(recorder.on(Channel::Result), vec![Event::NextValidId { order_id: 1001 }]);
        let all: Vec<EventName> = recorder.on(Channel::All).iter().map(Event::name).collect();
        assert_eq!(all, vec![EventName::Received, EventName::NextValidId]);
    }

    #[test]
    fn test_errors_skip_result_channel() {
        let (mut c, recorder) = controller();
        c.connect(None).unwrap();
        recorder.clear();

        c.on_message(tokens(&["4", "2", "7", "200", "No security definition", ""]));

        assert!(recorder.on(Channel::Result).is_empty());
        let errs = errors(&recorder);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].req_id, 7);
        assert_eq!(errs[0].code, 200);
    }

    #[test]
    fn test_malformed_number_becomes_bad_message() {
        let (mut c, recorder) = controller();
        c.connect(None).unwrap();
        recorder.clear();

        c.on_message(tokens(&["9", "1", "abc"]));
        c.on_message(tokens(&["9", "1", "5"]));

        let errs = errors(&recorder);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, 508);
        assert_eq!(recorder.on(Channel::Result), vec![Event::NextValidId { order_id: 5 }]);
    }

    #[test]
    fn test_legacy_tokens_wait_for_the_rest_of_a_message() {
        let (mut c, recorder) = controller();
        c.connect(None).unwrap();
        recorder.clear();

        c.on_tokens(tokens(&["2", "1", "101", "0"]));
        assert!(recorder.on(Channel::Result).is_empty());
        c.on_tokens(tokens(&["300"]));

        assert_eq!(
            recorder.on(Channel::Result),
            vec![Event::TickSize { ticker_id: 101, field: 0, size: Some(dec!(300)) }]
        );
    }

    #[test]
    fn test_disconnect_reports_each_unsent_request() {
        let transport = ReplayTransport::new(176);
        let log = transport.sent_log();
        let recorder = Recorder::new();
        let config = Config { max_req_per_second: 1, ..Config::default() };
        let mut c = Controller::new(config, Box::new(transport), Box::new(recorder.clone()));
        c.connect(None).unwrap();
        for i in 0..5 {
            let id = i.to_string();
            c.send(tokens(&["49", id.as_str()])).unwrap();
        }
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(c.pending_sends(), 4);

        c.disconnect().unwrap();

        assert_eq!(c.pending_sends(), 0);
        let errs = errors(&recorder);
        assert_eq!(errs.len(), 4);
        assert!(errs.iter().all(|e| e.code == 504 && e.req_id == -1));
        assert!(errs[0].message.ends_with("Pending request dropped: 49,1"));
        assert!(errs[3].message.ends_with("Pending request dropped: 49,4"));
        let all: Vec<EventName> = recorder.on(Channel::All).iter().map(Event::name).collect();
        assert_eq!(all.last(), Some(&EventName::Disconnected));
    }

    #[test]
    fn test_emit_info_goes_to_result() {
        let (mut c, recorder) = controller();
        c.emit_info("Market data farm connection is OK:usfarm", 2104);
        assert_eq!(recorder.on(Channel::Result).len(), 1);
        assert_eq!(recorder.on(Channel::Event(EventName::Info)).len(), 1);
    }
}
