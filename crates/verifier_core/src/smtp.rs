//! SMTP mailbox probing
//!
//! Drives a short SMTP conversation against the recipient's primary MX to
//! decide whether a mailbox is deliverable, then probes a recipient that
//! cannot exist to detect catch-all configurations. The conversation is an
//! explicit state machine: one TCP connection, one recipient, no reuse.
//! The whole conversation runs under a single overall deadline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::debug;

use crate::dns::DnsResolver;
use crate::VerifyError;

/// Grace period for the best-effort QUIT on exit paths where the overall
/// deadline may already have expired.
const QUIT_GRACE: Duration = Duration::from_millis(500);

/// Reply codes that definitively mean the mailbox does not exist.
const MAILBOX_REJECTION_CODES: &[u16] = &[550, 551, 553, 501, 504, 511, 554];

static PROBE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// States of the SMTP conversation, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpStage {
    Connect,
    Greeting,
    Helo,
    MailFrom,
    RcptTo,
    CatchAllCheck,
    Quit,
}

impl SmtpStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Helo => "helo",
            Self::MailFrom => "mail_from",
            Self::RcptTo => "rcpt_to",
            Self::CatchAllCheck => "catch_all_check",
            Self::Quit => "quit",
        }
    }
}

/// One entry in the per-verification stage log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageLog {
    pub stage: SmtpStage,
    /// Milliseconds since the Unix epoch.
    pub start_time: u64,
    pub end_time: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

/// Callback invoked with each stage log entry as it is recorded.
pub type StageObserver = Arc<dyn Fn(&StageLog) + Send + Sync>;

/// Terminal deliverability classification of a completed conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deliverability {
    /// The MX accepted the recipient and rejected the catch-all probe.
    Mailbox,
    /// The MX accepted both the recipient and a recipient that cannot exist.
    CatchAll,
}

/// Result of one probe: the MX that was spoken to, the terminal
/// disposition, and the stage log.
#[derive(Debug)]
pub struct SmtpProbeOutcome {
    pub mx_record: Option<String>,
    pub disposition: Result<Deliverability, VerifyError>,
    pub logs: Vec<StageLog>,
}

/// Drives the per-mailbox SMTP state machine against a chosen MX host.
pub struct SmtpVerifier {
    helo_domain: String,
    mail_from: String,
    overall_timeout: Duration,
    port: u16,
    observer: Option<StageObserver>,
}

impl SmtpVerifier {
    pub fn new(helo_domain: impl Into<String>, overall_timeout: Duration, port: u16) -> Self {
        let helo_domain = helo_domain.into();
        let mail_from = format!("verify@{}", helo_domain);
        Self {
            helo_domain,
            mail_from,
            overall_timeout,
            port,
            observer: None,
        }
    }

    /// Subscribe a consumer to stage events as they happen.
    pub fn with_observer(mut self, observer: StageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Resolve the primary MX for `domain` and run the conversation for
    /// `email` against it.
    ///
    /// MX resolution failures surface in the disposition and are logged as
    /// a failed connect stage, so the log is never empty.
    pub async fn verify(
        &self,
        resolver: &DnsResolver,
        email: &str,
        domain: &str,
    ) -> SmtpProbeOutcome {
        let mut logs = Vec::new();

        let hosts = match resolver.lookup_mx(domain).await {
            Ok(hosts) => hosts,
            Err(err) => {
                let start = now_ms();
                self.push_log(&mut logs, SmtpStage::Connect, start, false, Some(&err), None, None);
                return SmtpProbeOutcome {
                    mx_record: None,
                    disposition: Err(err),
                    logs,
                };
            }
        };

        // lookup_mx never returns an empty set.
        let primary = hosts[0].exchange.clone();
        let disposition = self.converse(&primary, email, domain, &mut logs).await;

        SmtpProbeOutcome {
            mx_record: Some(primary),
            disposition,
            logs,
        }
    }

    /// Run the full conversation against one MX host.
    ///
    /// Stage `k+1` is only entered after a successful reply for stage `k`;
    /// the socket is dropped exactly once on every exit path, after a
    /// best-effort QUIT.
    pub(crate) async fn converse(
        &self,
        mx_host: &str,
        email: &str,
        domain: &str,
        logs: &mut Vec<StageLog>,
    ) -> Result<Deliverability, VerifyError> {
        let deadline = Instant::now() + self.overall_timeout;

        // CONNECT
        let start = now_ms();
        let stream = match timeout_at(deadline, TcpStream::connect((mx_host, self.port))).await {
            Ok(Ok(stream)) => {
                self.push_log(logs, SmtpStage::Connect, start, true, None, None, None);
                stream
            }
            Ok(Err(err)) => {
                let err = VerifyError::Connection(err.to_string());
                self.push_log(logs, SmtpStage::Connect, start, false, Some(&err), None, None);
                return Err(err);
            }
            Err(_) => {
                let err = VerifyError::Timeout;
                self.push_log(logs, SmtpStage::Connect, start, false, Some(&err), None, None);
                return Err(err);
            }
        };

        let mut conn = SmtpConnection::new(stream, deadline);

        // GREETING: the peer speaks first.
        let start = now_ms();
        let banner = match conn.read_reply().await {
            Ok(reply) => reply,
            Err(err) => {
                self.push_log(logs, SmtpStage::Greeting, start, false, Some(&err), None, None);
                self.quit(&mut conn, logs).await;
                return Err(err);
            }
        };
        if banner.code != 220 {
            let err = VerifyError::Greeting(banner.text());
            self.push_log(
                logs,
                SmtpStage::Greeting,
                start,
                false,
                Some(&err),
                None,
                Some(banner.text()),
            );
            self.quit(&mut conn, logs).await;
            return Err(err);
        }
        self.push_log(
            logs,
            SmtpStage::Greeting,
            start,
            true,
            None,
            None,
            Some(banner.text()),
        );

        // HELO
        let request = format!("HELO {}", self.helo_domain);
        self.command_stage(&mut conn, logs, SmtpStage::Helo, &request, VerifyError::Helo)
            .await?;

        // MAIL FROM
        let request = format!("MAIL FROM:<{}>", self.mail_from);
        self.command_stage(&mut conn, logs, SmtpStage::MailFrom, &request, VerifyError::MailFrom)
            .await?;

        // RCPT TO
        let request = format!("RCPT TO:<{}>", email);
        let start = now_ms();
        let reply = match self.exchange(&mut conn, &request).await {
            Ok(reply) => reply,
            Err(err) => {
                self.push_log(
                    logs,
                    SmtpStage::RcptTo,
                    start,
                    false,
                    Some(&err),
                    Some(request),
                    None,
                );
                self.quit(&mut conn, logs).await;
                return Err(err);
            }
        };
        if reply.code != 250 {
            let err = if mailbox_rejected(&reply) {
                VerifyError::MailboxNotFound
            } else {
                VerifyError::RcptTo(reply.text())
            };
            self.push_log(
                logs,
                SmtpStage::RcptTo,
                start,
                false,
                Some(&err),
                Some(request),
                Some(reply.text()),
            );
            self.quit(&mut conn, logs).await;
            return Err(err);
        }
        self.push_log(
            logs,
            SmtpStage::RcptTo,
            start,
            true,
            None,
            Some(request),
            Some(reply.text()),
        );

        // CATCH_ALL_CHECK: probe a recipient that is practically certain
        // not to exist. Any reply terminates the conversation.
        let request = format!("RCPT TO:<{}@{}>", probe_local_part(), domain);
        let start = now_ms();
        let disposition = match self.exchange(&mut conn, &request).await {
            Ok(reply) => {
                let detected = reply.code == 250;
                self.push_log(
                    logs,
                    SmtpStage::CatchAllCheck,
                    start,
                    true,
                    None,
                    Some(request),
                    Some(reply.text()),
                );
                if detected {
                    Ok(Deliverability::CatchAll)
                } else {
                    Ok(Deliverability::Mailbox)
                }
            }
            Err(err) => {
                self.push_log(
                    logs,
                    SmtpStage::CatchAllCheck,
                    start,
                    false,
                    Some(&err),
                    Some(request),
                    None,
                );
                Err(err)
            }
        };

        self.quit(&mut conn, logs).await;
        disposition
    }

    /// Send one command, read the reply and log the stage.
    ///
    /// A reply other than `250` is wrapped in the stage-specific error via
    /// `reject`; QUIT is attempted before the error propagates.
    async fn command_stage(
        &self,
        conn: &mut SmtpConnection,
        logs: &mut Vec<StageLog>,
        stage: SmtpStage,
        request: &str,
        reject: impl FnOnce(String) -> VerifyError,
    ) -> Result<SmtpReply, VerifyError> {
        let start = now_ms();
        let reply = match self.exchange(conn, request).await {
            Ok(reply) => reply,
            Err(err) => {
                self.push_log(
                    logs,
                    stage,
                    start,
                    false,
                    Some(&err),
                    Some(request.to_string()),
                    None,
                );
                self.quit(conn, logs).await;
                return Err(err);
            }
        };

        if reply.code == 250 {
            self.push_log(
                logs,
                stage,
                start,
                true,
                None,
                Some(request.to_string()),
                Some(reply.text()),
            );
            Ok(reply)
        } else {
            let err = reject(reply.text());
            self.push_log(
                logs,
                stage,
                start,
                false,
                Some(&err),
                Some(request.to_string()),
                Some(reply.text()),
            );
            self.quit(conn, logs).await;
            Err(err)
        }
    }

    async fn exchange(
        &self,
        conn: &mut SmtpConnection,
        request: &str,
    ) -> Result<SmtpReply, VerifyError> {
        conn.send_line(request).await?;
        conn.read_reply().await
    }

    /// Best-effort QUIT, independent of the overall deadline.
    async fn quit(&self, conn: &mut SmtpConnection, logs: &mut Vec<StageLog>) {
        let start = now_ms();
        let sent = timeout(QUIT_GRACE, conn.stream.write_all(b"QUIT\r\n")).await;
        let success = matches!(sent, Ok(Ok(())));
        self.push_log(
            logs,
            SmtpStage::Quit,
            start,
            success,
            None,
            Some("QUIT".to_string()),
            None,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn push_log(
        &self,
        logs: &mut Vec<StageLog>,
        stage: SmtpStage,
        start_time: u64,
        success: bool,
        error: Option<&VerifyError>,
        request: Option<String>,
        response: Option<String>,
    ) {
        let entry = StageLog {
            stage,
            start_time,
            end_time: now_ms(),
            success,
            error: error.map(|e| e.tag().to_string()),
            request,
            response,
        };
        debug!(
            stage = stage.as_str(),
            success,
            error = entry.error.as_deref(),
            "smtp stage completed"
        );
        if let Some(observer) = &self.observer {
            observer(&entry);
        }
        logs.push(entry);
    }
}

/// One SMTP reply, possibly assembled from multi-line continuations.
#[derive(Debug, Clone)]
struct SmtpReply {
    code: u16,
    lines: Vec<String>,
}

impl SmtpReply {
    fn text(&self) -> String {
        format!("{} {}", self.code, self.lines.join(" "))
            .trim_end()
            .to_string()
    }
}

fn mailbox_rejected(reply: &SmtpReply) -> bool {
    MAILBOX_REJECTION_CODES.contains(&reply.code)
        || reply
            .lines
            .iter()
            .any(|line| line.to_ascii_lowercase().contains("does not exist"))
}

/// The TCP connection plus the read buffer and the conversation deadline.
struct SmtpConnection {
    stream: TcpStream,
    buffer: Vec<u8>,
    deadline: Instant,
}

impl SmtpConnection {
    fn new(stream: TcpStream, deadline: Instant) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            deadline,
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), VerifyError> {
        let mut data = line.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        match timeout_at(self.deadline, self.stream.write_all(&data)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(VerifyError::Connection(err.to_string())),
            Err(_) => Err(VerifyError::Timeout),
        }
    }

    /// Read lines until the final line of the reply (code not followed by
    /// `-`) has been observed.
    async fn read_reply(&mut self) -> Result<SmtpReply, VerifyError> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.len() < 3 {
                return Err(VerifyError::Unknown(format!("malformed reply: {line:?}")));
            }
            let code = line[..3]
                .parse::<u16>()
                .map_err(|_| VerifyError::Unknown(format!("malformed reply code: {line:?}")))?;
            let is_last = line.as_bytes().get(3) != Some(&b'-');
            let text = if line.len() > 4 {
                line[4..].to_string()
            } else {
                String::new()
            };
            lines.push(text);
            if is_last {
                return Ok(SmtpReply { code, lines });
            }
        }
    }

    async fn read_line(&mut self) -> Result<String, VerifyError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                while matches!(line.last(), Some(b'\n') | Some(b'\r')) {
                    line.pop();
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }

            let mut buf = [0u8; 512];
            let read = match timeout_at(self.deadline, self.stream.read(&mut buf)).await {
                Ok(Ok(read)) => read,
                Ok(Err(err)) => return Err(VerifyError::Connection(err.to_string())),
                Err(_) => return Err(VerifyError::Timeout),
            };
            if read == 0 {
                return Err(VerifyError::Unknown("connection closed by peer".to_string()));
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }
}

/// Local part for the catch-all probe: a short literal prefix, a
/// process-wide monotonic counter, and random alphanumeric noise.
fn probe_local_part() -> String {
    let sequence = PROBE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let noise: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("test{}{}", sequence, noise)
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    /// Scripted replies for one mock MX conversation. Replies must be
    /// full lines including CRLF.
    struct MockMx {
        banner: &'static str,
        helo: &'static str,
        mail_from: &'static str,
        rcpt_to: &'static str,
        probe: &'static str,
    }

    impl MockMx {
        fn accepting(rcpt_to: &'static str, probe: &'static str) -> Self {
            Self {
                banner: "220 mx.test ESMTP ready\r\n",
                helo: "250 mx.test\r\n",
                mail_from: "250 2.1.0 sender ok\r\n",
                rcpt_to,
                probe,
            }
        }
    }

    async fn spawn_mock(script: MockMx) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            if write.write_all(script.banner.as_bytes()).await.is_err() {
                return;
            }
            let mut rcpt_count = 0usize;
            while let Ok(Some(line)) = lines.next_line().await {
                let upper = line.to_ascii_uppercase();
                let reply = if upper.starts_with("HELO") {
                    script.helo
                } else if upper.starts_with("MAIL FROM") {
                    script.mail_from
                } else if upper.starts_with("RCPT TO") {
                    rcpt_count += 1;
                    if rcpt_count == 1 {
                        script.rcpt_to
                    } else {
                        script.probe
                    }
                } else if upper.starts_with("QUIT") {
                    let _ = write.write_all(b"221 2.0.0 bye\r\n").await;
                    return;
                } else {
                    "500 5.5.1 unrecognized command\r\n"
                };
                if write.write_all(reply.as_bytes()).await.is_err() {
                    return;
                }
            }
        });
        port
    }

    fn verifier(port: u16) -> SmtpVerifier {
        SmtpVerifier::new("verify.local", Duration::from_secs(5), port)
    }

    async fn run(script: MockMx) -> (Result<Deliverability, VerifyError>, Vec<StageLog>) {
        let port = spawn_mock(script).await;
        let mut logs = Vec::new();
        let disposition = verifier(port)
            .converse("127.0.0.1", "user@example.com", "example.com", &mut logs)
            .await;
        (disposition, logs)
    }

    #[tokio::test]
    async fn accepted_recipient_with_rejected_probe_is_deliverable() {
        let (disposition, logs) = run(MockMx::accepting(
            "250 2.1.5 recipient ok\r\n",
            "550 5.1.1 no such user\r\n",
        ))
        .await;

        assert_eq!(disposition.unwrap(), Deliverability::Mailbox);
        let stages: Vec<SmtpStage> = logs.iter().map(|l| l.stage).collect();
        assert_eq!(
            stages,
            vec![
                SmtpStage::Connect,
                SmtpStage::Greeting,
                SmtpStage::Helo,
                SmtpStage::MailFrom,
                SmtpStage::RcptTo,
                SmtpStage::CatchAllCheck,
                SmtpStage::Quit,
            ]
        );
        assert!(logs.iter().all(|l| l.success));
    }

    #[tokio::test]
    async fn probe_accepted_means_catch_all() {
        let (disposition, _) = run(MockMx::accepting(
            "250 2.1.5 recipient ok\r\n",
            "250 2.1.5 recipient ok\r\n",
        ))
        .await;

        assert_eq!(disposition.unwrap(), Deliverability::CatchAll);
    }

    #[tokio::test]
    async fn rejected_recipient_is_mailbox_not_found() {
        let (disposition, logs) = run(MockMx::accepting(
            "550 5.1.1 user unknown\r\n",
            "550 5.1.1 no such user\r\n",
        ))
        .await;

        assert!(matches!(disposition, Err(VerifyError::MailboxNotFound)));
        // QUIT is still attempted on the failure path.
        assert_eq!(logs.last().unwrap().stage, SmtpStage::Quit);
        let rcpt = logs.iter().find(|l| l.stage == SmtpStage::RcptTo).unwrap();
        assert!(!rcpt.success);
        assert_eq!(rcpt.error.as_deref(), Some("mailbox_not_found"));
    }

    #[tokio::test]
    async fn does_not_exist_text_maps_to_mailbox_not_found() {
        let (disposition, _) = run(MockMx::accepting(
            "450 4.2.1 mailbox does not exist\r\n",
            "550 5.1.1 no such user\r\n",
        ))
        .await;

        assert!(matches!(disposition, Err(VerifyError::MailboxNotFound)));
    }

    #[tokio::test]
    async fn transient_rcpt_failure_is_rcpt_to_error() {
        let (disposition, _) = run(MockMx::accepting(
            "451 4.7.1 greylisted, try again later\r\n",
            "550 5.1.1 no such user\r\n",
        ))
        .await;

        match disposition {
            Err(VerifyError::RcptTo(text)) => assert!(text.contains("greylisted")),
            other => panic!("expected RcptTo error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn helo_rejection_is_helo_error() {
        let (disposition, _) = run(MockMx {
            banner: "220 mx.test ESMTP ready\r\n",
            helo: "502 5.5.2 command not implemented\r\n",
            mail_from: "250 ok\r\n",
            rcpt_to: "250 ok\r\n",
            probe: "250 ok\r\n",
        })
        .await;

        assert!(matches!(disposition, Err(VerifyError::Helo(_))));
    }

    #[tokio::test]
    async fn non_220_banner_is_greeting_error() {
        let (disposition, _) = run(MockMx {
            banner: "554 5.7.1 not accepting mail\r\n",
            helo: "250 ok\r\n",
            mail_from: "250 ok\r\n",
            rcpt_to: "250 ok\r\n",
            probe: "250 ok\r\n",
        })
        .await;

        assert!(matches!(disposition, Err(VerifyError::Greeting(_))));
    }

    #[tokio::test]
    async fn multi_line_replies_are_assembled() {
        let (disposition, _) = run(MockMx {
            banner: "220-mx.test welcomes you\r\n220 mx.test ESMTP ready\r\n",
            helo: "250-mx.test\r\n250-SIZE 52428800\r\n250 HELP\r\n",
            mail_from: "250 2.1.0 sender ok\r\n",
            rcpt_to: "250 2.1.5 recipient ok\r\n",
            probe: "550 5.1.1 no such user\r\n",
        })
        .await;

        assert_eq!(disposition.unwrap(), Deliverability::Mailbox);
    }

    #[tokio::test]
    async fn black_hole_peer_times_out_within_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            // Accept and hold the connection without ever writing a banner.
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let verifier = SmtpVerifier::new("verify.local", Duration::from_millis(300), port);
        let started = Instant::now();
        let mut logs = Vec::new();
        let disposition = verifier
            .converse("127.0.0.1", "user@example.com", "example.com", &mut logs)
            .await;

        assert!(matches!(disposition, Err(VerifyError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(2));
        let greeting = logs.iter().find(|l| l.stage == SmtpStage::Greeting).unwrap();
        assert_eq!(greeting.error.as_deref(), Some("timeout_error"));
    }

    #[tokio::test]
    async fn observer_sees_stage_events_in_order() {
        let seen: Arc<Mutex<Vec<SmtpStage>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let port = spawn_mock(MockMx::accepting(
            "250 2.1.5 recipient ok\r\n",
            "550 5.1.1 no such user\r\n",
        ))
        .await;

        let verifier = SmtpVerifier::new("verify.local", Duration::from_secs(5), port)
            .with_observer(Arc::new(move |entry: &StageLog| {
                sink.lock().unwrap().push(entry.stage);
            }));
        let mut logs = Vec::new();
        verifier
            .converse("127.0.0.1", "user@example.com", "example.com", &mut logs)
            .await
            .unwrap();

        let observed = seen.lock().unwrap().clone();
        let logged: Vec<SmtpStage> = logs.iter().map(|l| l.stage).collect();
        assert_eq!(observed, logged);
    }

    #[tokio::test]
    async fn connection_refused_is_connection_error() {
        // Bind then drop to obtain a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut logs = Vec::new();
        let disposition = verifier(port)
            .converse("127.0.0.1", "user@example.com", "example.com", &mut logs)
            .await;

        assert!(matches!(disposition, Err(VerifyError::Connection(_))));
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].stage, SmtpStage::Connect);
        assert!(!logs[0].success);
    }

    #[test]
    fn probe_local_parts_are_unique_and_prefixed() {
        let first = probe_local_part();
        let second = probe_local_part();
        assert!(first.starts_with("test"));
        assert!(second.starts_with("test"));
        assert_ne!(first, second);
    }

    #[test]
    fn reply_text_joins_code_and_lines() {
        let reply = SmtpReply {
            code: 250,
            lines: vec!["mx.test".to_string(), "HELP".to_string()],
        };
        assert_eq!(reply.text(), "250 mx.test HELP");
    }
}
