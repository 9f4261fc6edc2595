use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::ports::{FrameConnection, StreamConnector, StreamObserver};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ReconnectPending,
}

#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    pub url: String,
    pub reconnect_delay: Duration,
}

impl StreamClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), reconnect_delay: DEFAULT_RECONNECT_DELAY }
    }
}

/// Cierra el paso a los callbacks. Mientras un callback corre se mantiene el
/// cerrojo, así `shut` espera a que termine y ninguno empieza después.
struct CallbackGate {
    open: Mutex<bool>,
}

impl CallbackGate {
    fn new() -> Self {
        Self { open: Mutex::new(true) }
    }

    fn call(&self, f: impl FnOnce()) {
        let open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        if *open {
            f();
        }
    }

    fn shut(&self) {
        *self.open.lock().unwrap_or_else(|e| e.into_inner()) = false;
    }
}

/// Cliente del stream de la cámara con reconexión a intervalo fijo.
///
/// Una sola tarea recorre `Connecting → Connected → ReconnectPending →
/// Connecting …` hasta que se cierra el [`StreamHandle`]. No hay límite de
/// reintentos ni crecimiento del intervalo.
pub struct ReconnectingStreamClient {
    connector: Arc<dyn StreamConnector>,
    observer: Arc<dyn StreamObserver>,
    config: StreamClientConfig,
}

impl ReconnectingStreamClient {
    pub fn new(
        connector: Arc<dyn StreamConnector>,
        observer: Arc<dyn StreamObserver>,
        config: StreamClientConfig,
    ) -> Self {
        Self { connector, observer, config }
    }

    /// Lanza la tarea. Necesita un runtime de Tokio activo.
    pub fn start(self) -> StreamHandle {
        let gate = Arc::new(CallbackGate::new());
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let task = tokio::spawn(self.run(gate.clone(), stop_rx, state_tx));
        StreamHandle { gate, stop: stop_tx, state: state_rx, task: Some(task) }
    }

    async fn run(
        self,
        gate: Arc<CallbackGate>,
        mut stop: watch::Receiver<bool>,
        state: watch::Sender<ConnectionState>,
    ) {
        let url = self.config.url.clone();
        loop {
            if *stop.borrow() {
                break;
            }
            state.send_replace(ConnectionState::Connecting);
            debug!("Conectando a {url}");

            let attempt = tokio::select! {
                biased;
                _ = stop.changed() => break,
                r = self.connector.connect(&url) => r,
            };

            match attempt {
                Ok(mut conn) => {
                    state.send_replace(ConnectionState::Connected);
                    info!("Stream conectado: {url}");
                    gate.call(|| self.observer.on_open());
                    if self.pump(&gate, &mut stop, conn.as_mut()).await {
                        conn.close().await;
                        break;
                    }
                }
                Err(e) => warn!("No se pudo conectar a {url}: {e}"),
            }

            state.send_replace(ConnectionState::ReconnectPending);
            gate.call(|| self.observer.on_close());
            info!("Stream desconectado, reintento en {:?}", self.config.reconnect_delay);

            tokio::select! {
                biased;
                _ = stop.changed() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
        state.send_replace(ConnectionState::Disconnected);
        debug!("Cliente de stream detenido");
    }

    /// Reparte mensajes hasta que la conexión cae. Devuelve `true` si se pidió
    /// parar. Un error de transporte cierra la conexión y sigue el camino de cierre.
    async fn pump(
        &self,
        gate: &CallbackGate,
        stop: &mut watch::Receiver<bool>,
        conn: &mut dyn FrameConnection,
    ) -> bool {
        loop {
            let next = tokio::select! {
                biased;
                _ = stop.changed() => return true,
                n = conn.next_frame() => n,
            };
            match next {
                Some(Ok(payload)) => gate.call(|| {
                    if let Err(e) = self.observer.on_frame(payload) {
                        warn!("Error procesando mensaje: {e}");
                    }
                }),
                Some(Err(e)) => {
                    warn!("Error de WebSocket: {e}");
                    conn.close().await;
                    return false;
                }
                None => return false,
            }
        }
    }
}

/// Devuelto por [`ReconnectingStreamClient::start`]. Cerrarlo (o soltarlo)
/// cancela la reconexión pendiente y la conexión viva.
pub struct StreamHandle {
    gate: Arc<CallbackGate>,
    stop: watch::Sender<bool>,
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Idempotente. Al volver, ningún callback está en curso ni empezará.
    pub fn close(&self) {
        self.gate.shut();
        self.stop.send_replace(true);
    }

    /// Cierra y espera a que la tarea termine.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{DomainError, DomainResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Cada conexión entrega `frames` mensajes y después el servidor cierra.
    struct FakeConnector {
        attempts: AtomicUsize,
        frames: usize,
        fail_first: usize,
        transport_error: bool,
    }

    impl FakeConnector {
        fn closing_immediately() -> Self {
            Self { attempts: AtomicUsize::new(0), frames: 0, fail_first: 0, transport_error: false }
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    struct FakeConnection {
        queue: VecDeque<DomainResult<String>>,
    }

    #[async_trait]
    impl FrameConnection for FakeConnection {
        async fn next_frame(&mut self) -> Option<DomainResult<String>> {
            self.queue.pop_front()
        }

        async fn close(&mut self) {
            self.queue.clear();
        }
    }

    #[async_trait]
    impl StreamConnector for FakeConnector {
        async fn connect(&self, _url: &str) -> DomainResult<Box<dyn FrameConnection>> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(DomainError::OperationFailed("connection refused".into()));
            }
            let mut queue: VecDeque<_> = (0..self.frames).map(|i| Ok(format!("frame-{i}"))).collect();
            if self.transport_error {
                queue.push_back(Err(DomainError::OperationFailed("reset".into())));
                queue.push_back(Ok("after-error".into()));
            }
            Ok(Box::new(FakeConnection { queue }))
        }
    }

    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<String>>,
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    impl Recorder {
        fn counts(&self) -> (usize, usize, usize) {
            (
                self.frames.lock().unwrap().len(),
                self.opens.load(Ordering::SeqCst),
                self.closes.load(Ordering::SeqCst),
            )
        }
    }

    impl StreamObserver for Recorder {
        fn on_frame(&self, payload: String) -> DomainResult<()> {
            self.frames.lock().unwrap().push(payload);
            Ok(())
        }

        fn on_open(&self) {
            self.opens.fetch_add(1, Ordering::SeqCst);
        }

        fn on_close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn client(connector: Arc<FakeConnector>, observer: Arc<Recorder>) -> ReconnectingStreamClient {
        ReconnectingStreamClient::new(connector, observer, StreamClientConfig::new("ws://camera/ws/camera"))
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_exactly_once_per_delay() {
        let connector = Arc::new(FakeConnector::closing_immediately());
        let recorder = Arc::new(Recorder::default());
        let handle = client(connector.clone(), recorder.clone()).start();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(connector.attempts(), 1);
        assert_eq!(handle.state(), ConnectionState::ReconnectPending);

        for n in 2..=6 {
            tokio::time::sleep(DEFAULT_RECONNECT_DELAY).await;
            assert_eq!(connector.attempts(), n);
            assert_eq!(recorder.counts(), (0, n, n));
        }
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_callbacks_after_close() {
        let connector = Arc::new(FakeConnector::closing_immediately());
        let recorder = Arc::new(Recorder::default());
        let handle = client(connector.clone(), recorder.clone()).start();

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.close();
        handle.close();
        let before = (connector.attempts(), recorder.counts());

        tokio::time::sleep(DEFAULT_RECONNECT_DELAY * 5).await;
        assert_eq!((connector.attempts(), recorder.counts()), before);
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_client() {
        let connector = Arc::new(FakeConnector::closing_immediately());
        let recorder = Arc::new(Recorder::default());
        drop(client(connector.clone(), recorder.clone()).start());

        tokio::time::sleep(DEFAULT_RECONNECT_DELAY * 3).await;
        assert!(connector.attempts() <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn frames_reach_the_observer() {
        let connector = Arc::new(FakeConnector { frames: 3, ..FakeConnector::closing_immediately() });
        let recorder = Arc::new(Recorder::default());
        let handle = client(connector, recorder.clone()).start();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*recorder.frames.lock().unwrap(), vec!["frame-0", "frame-1", "frame-2"]);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_takes_the_close_path() {
        let connector = Arc::new(FakeConnector {
            frames: 1,
            transport_error: true,
            ..FakeConnector::closing_immediately()
        });
        let recorder = Arc::new(Recorder::default());
        let handle = client(connector.clone(), recorder.clone()).start();

        tokio::time::sleep(Duration::from_millis(10)).await;
        // el mensaje posterior al error no se entrega
        assert_eq!(recorder.counts(), (1, 1, 1));
        tokio::time::sleep(DEFAULT_RECONNECT_DELAY).await;
        assert_eq!(connector.attempts(), 2);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_is_retried() {
        let connector = Arc::new(FakeConnector { fail_first: 2, ..FakeConnector::closing_immediately() });
        let recorder = Arc::new(Recorder::default());
        let handle = client(connector.clone(), recorder.clone()).start();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(recorder.counts(), (0, 0, 1));
        tokio::time::sleep(DEFAULT_RECONNECT_DELAY * 2).await;
        assert_eq!(connector.attempts(), 3);
        assert_eq!(recorder.counts(), (0, 1, 3));
        handle.shutdown().await;
    }
}
