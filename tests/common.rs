// tests/common.rs
#![allow(dead_code)] // Allow unused helpers across test binaries

use async_trait::async_trait;
use http::header::SET_COOKIE;
use http::{HeaderMap, HeaderValue};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use url::Url;

use vsphere_client::{
  operations, Client, ClientEvent, ConnectionConfig, ConnectionState, ITransport,
  ITransportFactory, InvokeReply, MonitorReceiver, SessionToken, TlsOptions, VimError,
};

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(250);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(2);

/// Fault body the service uses when it has invalidated a session.
pub const SESSION_EXPIRED_FAULT: &str = "The session is not authenticated.";

// Use std::sync::Once for one-time initialization
static TRACING_INIT: Once = Once::new();

// Setup function to initialize tracing. Level can be overridden with RUST_LOG.
pub fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    let default_filter = "vsphere_client=trace,info";
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
      .with_max_level(tracing::Level::TRACE)
      .with_env_filter(env_filter)
      .with_target(true)
      .with_line_number(true)
      .with_test_writer()
      .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber");
  });
}

pub fn test_config() -> ConnectionConfig {
  setup_tracing();
  ConnectionConfig::new("vcsa.test.local", "root", "s3cret!")
}

/// Scripted behavior and recordings shared across every transport the mock
/// factory creates, so scripts and logs survive reconnect handshakes.
#[derive(Default)]
pub struct MockState {
  /// `(operation, args)` for every invocation, across all transports, in
  /// invocation order.
  pub invoked: Mutex<Vec<(String, Value)>>,
  /// Tokens bound via `bind_security`, in binding order.
  pub bound_tokens: Mutex<Vec<String>>,
  /// Endpoints the factory was asked to connect to.
  pub endpoints: Mutex<Vec<String>>,
  /// TLS policies the factory was handed.
  pub tls_seen: Mutex<Vec<TlsOptions>>,
  /// Factory create calls, including failed ones.
  pub connect_attempts: AtomicU32,
  /// Transports actually handed out.
  pub transports_created: AtomicU32,
  /// Successful Login invocations.
  pub logins: AtomicU32,
  /// Artificial delay before the factory answers, to hold the client in
  /// `Connecting` long enough for commands to queue.
  pub connect_delay_ms: AtomicU64,
  /// Budget of factory-create failures (`u32::MAX` = always fail).
  pub fail_connects: AtomicU32,
  /// Budget of service-content retrieval failures.
  pub fail_content: AtomicU32,
  /// Budget of login rejections.
  pub fail_logins: AtomicU32,
  /// Per-operation budget of session-expiry faults served before success.
  pub expire_ops: Mutex<HashMap<String, u32>>,
  /// Per-operation budget of generic faults, with the fault body to serve.
  pub fault_ops: Mutex<HashMap<String, (u32, String)>>,
  /// Canned results per operation; operations without one get a generic
  /// `returnval`.
  pub results: Mutex<HashMap<String, Value>>,
}

impl MockState {
  pub fn expire_times(&self, operation: &str, times: u32) {
    self.expire_ops.lock().insert(operation.to_string(), times);
  }

  pub fn expire_always(&self, operation: &str) {
    self.expire_times(operation, u32::MAX);
  }

  pub fn fault_times(&self, operation: &str, times: u32, message: &str) {
    self
      .fault_ops
      .lock()
      .insert(operation.to_string(), (times, message.to_string()));
  }

  pub fn set_result(&self, operation: &str, result: Value) {
    self.results.lock().insert(operation.to_string(), result);
  }

  /// Operation names in invocation order.
  pub fn ops(&self) -> Vec<String> {
    self.invoked.lock().iter().map(|(op, _)| op.clone()).collect()
  }

  pub fn count_op(&self, operation: &str) -> usize {
    self.invoked.lock().iter().filter(|(op, _)| op == operation).count()
  }
}

/// Decrements a failure budget. `u32::MAX` means an inexhaustible budget.
fn take_budget(counter: &AtomicU32) -> bool {
  let mut current = counter.load(Ordering::SeqCst);
  loop {
    if current == 0 {
      return false;
    }
    if current == u32::MAX {
      return true;
    }
    match counter.compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst) {
      Ok(_) => return true,
      Err(actual) => current = actual,
    }
  }
}

fn take_scripted(map: &Mutex<HashMap<String, u32>>, operation: &str) -> bool {
  let mut guard = map.lock();
  match guard.get_mut(operation) {
    Some(remaining) if *remaining > 0 => {
      if *remaining != u32::MAX {
        *remaining -= 1;
      }
      true
    }
    _ => false,
  }
}

fn take_fault(map: &Mutex<HashMap<String, (u32, String)>>, operation: &str) -> Option<String> {
  let mut guard = map.lock();
  match guard.get_mut(operation) {
    Some((remaining, message)) if *remaining > 0 => {
      let message = message.clone();
      if *remaining != u32::MAX {
        *remaining -= 1;
      }
      Some(message)
    }
    _ => None,
  }
}

pub struct MockTransport {
  state: Arc<MockState>,
  token: Mutex<Option<SessionToken>>,
}

#[async_trait]
impl ITransport for MockTransport {
  async fn invoke(&self, operation: &str, args: &Value) -> Result<InvokeReply, VimError> {
    self
      .state
      .invoked
      .lock()
      .push((operation.to_string(), args.clone()));

    match operation {
      operations::RETRIEVE_SERVICE_CONTENT => {
        if take_budget(&self.state.fail_content) {
          return Err(VimError::Transport(
            "connection reset while retrieving service content".into(),
          ));
        }
        Ok(InvokeReply {
          result: json!({
            "returnval": {
              "sessionManager": "SessionManager",
              "rootFolder": "group-d1",
              "about": { "fullName": "Mock Virtual Center" },
            }
          }),
          raw: "<RetrieveServiceContentResponse/>".into(),
          headers: HeaderMap::new(),
        })
      }
      operations::LOGIN => {
        if take_budget(&self.state.fail_logins) {
          return Err(VimError::Fault {
            operation: operation.into(),
            message: "Cannot complete login due to an incorrect user name or password.".into(),
          });
        }
        let generation = self.state.logins.fetch_add(1, Ordering::SeqCst) + 1;
        let cookie = format!("vmware_soap_session=\"sess-{generation}\"; Path=/; HttpOnly; Secure");
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, HeaderValue::from_str(&cookie).unwrap());
        let user = args.get("userName").and_then(Value::as_str).unwrap_or_default();
        Ok(InvokeReply {
          result: json!({
            "returnval": { "userName": user, "fullName": "Mock Administrator" }
          }),
          raw: "<LoginResponse/>".into(),
          headers,
        })
      }
      operation => {
        if let Some(message) = take_fault(&self.state.fault_ops, operation) {
          return Err(VimError::Fault {
            operation: operation.into(),
            message,
          });
        }
        if take_scripted(&self.state.expire_ops, operation) {
          return Err(VimError::Fault {
            operation: operation.into(),
            message: SESSION_EXPIRED_FAULT.into(),
          });
        }
        // An unbound transport has no session; the service would reject the
        // call the same way it rejects an expired one.
        if self.token.lock().is_none() {
          return Err(VimError::Fault {
            operation: operation.into(),
            message: SESSION_EXPIRED_FAULT.into(),
          });
        }
        let result = self
          .state
          .results
          .lock()
          .get(operation)
          .cloned()
          .unwrap_or_else(|| json!({ "returnval": { "operation": operation } }));
        Ok(InvokeReply {
          result,
          raw: format!("<{operation}Response/>"),
          headers: HeaderMap::new(),
        })
      }
    }
  }

  fn bind_security(&self, token: SessionToken) {
    self.state.bound_tokens.lock().push(token.as_str().to_string());
    *self.token.lock() = Some(token);
  }
}

pub struct MockFactory {
  state: Arc<MockState>,
}

impl MockFactory {
  pub fn new(state: Arc<MockState>) -> Self {
    Self { state }
  }
}

#[async_trait]
impl ITransportFactory for MockFactory {
  async fn create(
    &self,
    endpoint: &Url,
    tls: &TlsOptions,
  ) -> Result<Arc<dyn ITransport>, VimError> {
    self.state.connect_attempts.fetch_add(1, Ordering::SeqCst);
    self.state.endpoints.lock().push(endpoint.to_string());
    self.state.tls_seen.lock().push(*tls);

    let delay = self.state.connect_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
      tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if take_budget(&self.state.fail_connects) {
      return Err(VimError::Transport(format!("connection to {endpoint} refused")));
    }
    self.state.transports_created.fetch_add(1, Ordering::SeqCst);
    Ok(Arc::new(MockTransport {
      state: self.state.clone(),
      token: Mutex::new(None),
    }))
  }
}

pub fn mock_client_with(state: Arc<MockState>) -> Client {
  Client::connect(test_config(), Arc::new(MockFactory::new(state))).expect("client creation failed")
}

pub fn mock_client() -> (Client, Arc<MockState>) {
  let state = Arc::new(MockState::default());
  (mock_client_with(state.clone()), state)
}

/// Polls the client until it reaches the wanted state, panicking after
/// `LONG_TIMEOUT`.
pub async fn wait_for_state(client: &Client, want: ConnectionState) {
  let deadline = tokio::time::Instant::now() + LONG_TIMEOUT;
  loop {
    if client.state().await.expect("status query failed") == want {
      return;
    }
    if tokio::time::Instant::now() > deadline {
      panic!("timed out waiting for state {:?}", want);
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
  }
}

/// Polls an arbitrary condition, panicking after `LONG_TIMEOUT`.
pub async fn wait_for(mut check: impl FnMut() -> bool, what: &str) {
  let deadline = tokio::time::Instant::now() + LONG_TIMEOUT;
  while !check() {
    if tokio::time::Instant::now() > deadline {
      panic!("timed out waiting for {what}");
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
  }
}

/// Reads monitor events until one matches, panicking on timeout or channel
/// closure.
pub async fn wait_for_monitor_event(
  monitor_rx: &MonitorReceiver,
  check_event: impl Fn(&ClientEvent) -> bool,
) -> ClientEvent {
  let deadline = tokio::time::Instant::now() + LONG_TIMEOUT;
  loop {
    let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
    if remaining.is_zero() {
      panic!("timed out waiting for monitor event");
    }
    match tokio::time::timeout(remaining, monitor_rx.recv()).await {
      Ok(Ok(event)) => {
        if check_event(&event) {
          return event;
        }
      }
      Ok(Err(_)) => panic!("monitor channel closed unexpectedly"),
      Err(_) => panic!("timed out waiting for monitor event"),
    }
  }
}
