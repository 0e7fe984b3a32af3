//! Fire-and-forget UDP sender.
//!
//! `send` hands the datagram to a bounded queue drained by a single writer
//! task and returns immediately. Each datagram is attempted once; failures
//! are logged, counted and passed to the failure callback.

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::error::SendError;

/// 送信先 (host, port)。起動時に固定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// 名前解決は1回だけ。最初に得られたアドレスを使う
    pub async fn resolve(&self) -> io::Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address for {}:{}", self.host, self.port),
                )
            })
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// データグラムの送出先。テストでは失敗を注入する
pub trait Transport: Send + Sync + 'static {
    fn send_datagram<'a>(
        &'a self,
        buf: &'a [u8],
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a;
}

impl Transport for UdpSocket {
    fn send_datagram<'a>(
        &'a self,
        buf: &'a [u8],
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
        self.send(buf)
    }
}

/// 失敗1件につき1回呼ばれる
pub type FailureCallback = Arc<dyn Fn(&SendError) + Send + Sync>;

/// ログ出力のみで何もしないコールバック
pub fn ignore_failures() -> FailureCallback {
    Arc::new(|_| {})
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    sent: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendStats {
    pub submitted: u64,
    pub sent: u64,
    pub failed: u64,
}

fn report(counters: &Counters, on_failure: &FailureCallback, err: SendError) {
    counters.failed.fetch_add(1, Ordering::Relaxed);
    log::warn!("UDP send error: {}", err);
    on_failure(&err);
}

async fn run_writer<T: Transport>(
    transport: T,
    mut rx: mpsc::Receiver<Vec<u8>>,
    counters: Arc<Counters>,
    on_failure: FailureCallback,
) {
    while let Some(datagram) = rx.recv().await {
        match transport.send_datagram(&datagram).await {
            Ok(n) => {
                counters.sent.fetch_add(1, Ordering::Relaxed);
                log::trace!("sent {} bytes", n);
            }
            Err(e) => report(&counters, &on_failure, SendError::Io(e)),
        }
    }
    log::debug!("UDP writer stopped");
}

pub struct UdpSender {
    tx: mpsc::Sender<Vec<u8>>,
    counters: Arc<Counters>,
    on_failure: FailureCallback,
    writer: JoinHandle<()>,
}

impl UdpSender {
    /// 送信先を解決してソケットを接続し、書き込みタスクを起動
    pub async fn connect(
        endpoint: &Endpoint,
        queue_depth: usize,
        on_failure: FailureCallback,
    ) -> Result<Self, SendError> {
        let target = endpoint.resolve().await?;
        let local_ip = if target.is_ipv4() {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        };
        let socket = UdpSocket::bind(SocketAddr::new(local_ip, 0)).await?;
        socket.connect(target).await?;
        log::info!("UDP sender {} -> {} ({})", socket.local_addr()?, target, endpoint);
        Ok(Self::with_transport(socket, queue_depth, on_failure))
    }

    /// tokioランタイム内で呼ぶこと
    pub fn with_transport<T: Transport>(
        transport: T,
        queue_depth: usize,
        on_failure: FailureCallback,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let counters = Arc::new(Counters::default());
        let writer = tokio::spawn(run_writer(
            transport,
            rx,
            Arc::clone(&counters),
            Arc::clone(&on_failure),
        ));
        Self {
            tx,
            counters,
            on_failure,
            writer,
        }
    }

    /// ブロックしない。キュー満杯・停止済みは失敗として報告して捨てる
    pub fn send(&self, datagram: Vec<u8>) {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        match self.tx.try_send(datagram) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => report(&self.counters, &self.on_failure, SendError::QueueFull),
            Err(TrySendError::Closed(_)) => report(&self.counters, &self.on_failure, SendError::Closed),
        }
    }

    pub fn stats(&self) -> SendStats {
        SendStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            sent: self.counters.sent.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// キューに残った分を送り切ってから停止
    pub async fn close(self) -> SendStats {
        let Self {
            tx,
            counters,
            writer,
            ..
        } = self;
        drop(tx);
        if let Err(e) = writer.await {
            log::warn!("UDP writer task failed: {}", e);
        }
        SendStats {
            submitted: counters.submitted.load(Ordering::Relaxed),
            sent: counters.sent.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;
    use std::time::Duration;

    struct Refusing;

    impl Transport for Refusing {
        fn send_datagram<'a>(
            &'a self,
            _buf: &'a [u8],
        ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
            async { Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")) }
        }
    }

    /// 偶数番目だけ失敗する
    #[derive(Default)]
    struct Flaky {
        calls: AtomicU64,
        delivered: Mutex<Vec<Vec<u8>>>,
    }

    impl Transport for Arc<Flaky> {
        fn send_datagram<'a>(
            &'a self,
            buf: &'a [u8],
        ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
            async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n % 2 == 0 {
                    return Err(io::Error::new(io::ErrorKind::Other, "unreachable"));
                }
                self.delivered.lock().unwrap().push(buf.to_vec());
                Ok(buf.len())
            }
        }
    }

    fn counting_callback() -> (FailureCallback, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&count);
        let cb: FailureCallback = Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (cb, count)
    }

    #[tokio::test]
    async fn test_failure_reported_once_per_datagram() {
        let (cb, count) = counting_callback();
        let sender = UdpSender::with_transport(Refusing, 16, cb);
        for i in 0..5u8 {
            sender.send(vec![i]);
        }
        let stats = sender.close().await;
        assert_eq!(count.load(Ordering::SeqCst), 5);
        assert_eq!(stats, SendStats { submitted: 5, sent: 0, failed: 5 });
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_later_sends() {
        let (cb, count) = counting_callback();
        let flaky = Arc::new(Flaky::default());
        let sender = UdpSender::with_transport(Arc::clone(&flaky), 16, cb);
        for i in 0..4u8 {
            sender.send(vec![i]);
        }
        let stats = sender.close().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(stats.sent, 2);
        assert_eq!(*flaky.delivered.lock().unwrap(), vec![vec![1u8], vec![3u8]]);
    }

    #[tokio::test]
    async fn test_queue_full_is_reported() {
        struct Stalled(Arc<Notify>);
        impl Transport for Stalled {
            fn send_datagram<'a>(
                &'a self,
                _buf: &'a [u8],
            ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
                self.0.notify_one();
                std::future::pending()
            }
        }

        let (cb, count) = counting_callback();
        let picked_up = Arc::new(Notify::new());
        let sender = UdpSender::with_transport(Stalled(Arc::clone(&picked_up)), 1, cb);
        // 書き込みタスクが1件目を抱えて止まるまで待つ
        sender.send(vec![0]);
        picked_up.notified().await;
        sender.send(vec![1]);
        sender.send(vec![2]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(sender.stats().failed, 1);
        assert_eq!(sender.stats().submitted, 3);
    }

    #[tokio::test]
    async fn test_loopback_delivery() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let sender = UdpSender::connect(&Endpoint::new("127.0.0.1", port), 8, ignore_failures())
            .await
            .unwrap();
        sender.send(b"hello".to_vec());

        let mut buf = [0u8; 64];
        let n = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(sender.close().await.sent, 1);
    }

    #[tokio::test]
    async fn test_connect_unresolvable_host() {
        let result = UdpSender::connect(
            &Endpoint::new("host.invalid", 12345),
            8,
            ignore_failures(),
        )
        .await;
        assert!(matches!(result, Err(SendError::Io(_))));
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::new("192.168.4.22", 12345).to_string(), "192.168.4.22:12345");
    }
}
